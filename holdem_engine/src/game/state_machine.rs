//! Table state and the hand lifecycle.
//!
//! A [`TableState`] moves `waiting → preflop → flop → turn → river →
//! showdown → waiting`. Starting a hand, closing betting rounds, early
//! termination and showdown payout live here; validating and applying a
//! single player action lives in [`super::betting`].

use log::{debug, error, info};
use rand::{CryptoRng, Rng};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use super::{
    constants,
    entities::{
        Blinds, Card, Chips, Deck, HandOutcome, PlayerId, PlayerInfo, Phase, Seat, SeatIndex,
        SeatStatus, Winner,
    },
    functional::{argmax, eval},
};

#[derive(Debug, Eq, Error, PartialEq)]
pub enum StartError {
    #[error("hand already in progress")]
    HandInProgress,
    #[error("need 2+ players with chips")]
    NotEnoughPlayers,
}

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum JoinError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("table_full")]
    TableFull,
}

/// The seat currently allowed to act.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Turn {
    pub seat: SeatIndex,
    /// Bumped every time any seat gets the turn.
    pub seq: u64,
    pub deadline: Instant,
}

#[derive(Debug)]
pub struct TableState {
    pub seats: Vec<Seat>,
    pub community: Vec<Card>,
    pub pot: Chips,
    pub phase: Phase,
    pub dealer: Option<SeatIndex>,
    pub blinds: Blinds,
    pub current_max_bet: Chips,
    pub min_raise: Chips,
    pub turn: Option<Turn>,
    pub turn_timeout: Duration,
    pub hand_id: u64,
    pub last_outcome: Option<HandOutcome>,
    turn_seq: u64,
    deck: Deck,
    completed: Vec<HandOutcome>,
}

impl TableState {
    #[must_use]
    pub fn new(max_seats: usize, blinds: Blinds, turn_timeout: Duration) -> Self {
        let max_seats = max_seats.clamp(constants::MIN_SEATS, constants::MAX_SEATS);
        let turn_timeout = turn_timeout.min(Duration::from_secs(constants::MAX_TURN_TIMEOUT_SECS));
        Self {
            seats: (0..max_seats).map(|_| Seat::empty()).collect(),
            community: Vec::with_capacity(constants::BOARD_SIZE),
            pot: 0,
            phase: Phase::Waiting,
            dealer: None,
            min_raise: blinds.big,
            blinds,
            current_max_bet: 0,
            turn: None,
            turn_timeout,
            hand_id: 0,
            last_outcome: None,
            turn_seq: 0,
            deck: Deck::build(),
            completed: Vec::new(),
        }
    }

    // === Seating ===

    #[must_use]
    pub fn find_seat(&self, player_id: &PlayerId) -> Option<SeatIndex> {
        self.seats
            .iter()
            .position(|s| s.player_id() == Some(player_id))
    }

    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_occupied()).count()
    }

    /// Seats willing to play the next hand.
    #[must_use]
    pub fn willing_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_willing()).count()
    }

    /// Seat a player in the first empty seat with `chips`. A player already
    /// seated keeps their seat and stack.
    pub fn seat_player(&mut self, player: PlayerInfo, chips: Chips) -> Result<SeatIndex, JoinError> {
        if let Some(idx) = self.find_seat(&player.id) {
            let seat = &mut self.seats[idx];
            seat.leaving = false;
            if let Some(occupant) = seat.occupant.as_mut() {
                occupant.name = player.name;
                occupant.avatar = player.avatar;
            }
            return Ok(idx);
        }
        let idx = self
            .seats
            .iter()
            .position(|s| !s.is_occupied())
            .ok_or(JoinError::TableFull)?;
        // The pot and every stack are summed in `Chips`.
        if self.chips_in_play().checked_add(chips).is_none() {
            return Err(JoinError::TableFull);
        }
        self.seats[idx].seat(player, chips);
        Ok(idx)
    }

    /// Remove a player. Mid-hand their seat folds at once and empties when
    /// the hand ends; otherwise it empties immediately.
    pub fn leave(&mut self, player_id: &PlayerId) -> Option<SeatIndex> {
        let idx = self.find_seat(player_id)?;
        if !self.hand_in_progress() || !self.seats[idx].in_hand() {
            self.seats[idx].vacate();
            return Some(idx);
        }

        let seat = &mut self.seats[idx];
        seat.leaving = true;
        seat.status = SeatStatus::Folded;
        seat.acted = true;
        debug!("Seat {idx} folded on leave during hand {}", self.hand_id);

        let was_on_turn = self.turn.is_some_and(|t| t.seat == idx);
        if was_on_turn {
            self.turn = None;
        }
        if was_on_turn || self.contenders() <= 1 {
            self.progress(idx);
        }
        Some(idx)
    }

    // === Queries ===

    #[must_use]
    pub fn hand_in_progress(&self) -> bool {
        self.phase.is_street()
    }

    /// Seats still competing for the pot.
    #[must_use]
    pub fn contenders(&self) -> usize {
        self.seats.iter().filter(|s| s.in_hand()).count()
    }

    /// Every chip at the table: stacks plus the pot.
    #[must_use]
    pub fn chips_in_play(&self) -> Chips {
        self.pot + self.seats.iter().map(|s| s.chips).sum::<Chips>()
    }

    #[must_use]
    pub fn remaining_ms(&self, now: Instant) -> Option<u64> {
        self.turn.map(|t| {
            let left = t.deadline.saturating_duration_since(now);
            u64::try_from(left.as_millis()).unwrap_or(u64::MAX)
        })
    }

    /// Hands finished since the last call, oldest first.
    pub fn take_completed(&mut self) -> Vec<HandOutcome> {
        std::mem::take(&mut self.completed)
    }

    /// Next seat clockwise after `from` (wrapping, `from` itself last)
    /// matching `pred`.
    pub(crate) fn next_seat_where(
        &self,
        from: SeatIndex,
        pred: impl Fn(&Seat) -> bool,
    ) -> Option<SeatIndex> {
        let n = self.seats.len();
        (1..=n)
            .map(|offset| (from + offset) % n)
            .find(|&idx| pred(&self.seats[idx]))
    }

    // === Hand lifecycle ===

    /// Start a hand with a freshly shuffled deck.
    pub fn start_hand(&mut self) -> Result<(), StartError> {
        self.start_hand_with(&mut rand::rng())
    }

    pub fn start_hand_with<R: Rng + CryptoRng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<(), StartError> {
        if self.hand_in_progress() {
            return Err(StartError::HandInProgress);
        }
        if self.willing_count() < constants::MIN_SEATS {
            return Err(StartError::NotEnoughPlayers);
        }

        for seat in &mut self.seats {
            seat.reset_for_hand();
        }
        self.community.clear();
        self.last_outcome = None;
        self.pot = 0;
        self.deck = Deck::build_with(rng);
        self.hand_id += 1;
        self.phase = Phase::Preflop;
        self.current_max_bet = 0;
        self.min_raise = self.blinds.big;
        self.turn = None;

        let n = self.seats.len();
        let dealer = self
            .next_seat_where(self.dealer.unwrap_or(n - 1), Seat::can_act)
            .ok_or(StartError::NotEnoughPlayers)?;
        self.dealer = Some(dealer);

        for _ in 0..constants::HOLE_CARDS {
            let mut idx = dealer;
            for _ in 0..n {
                idx = (idx + 1) % n;
                if self.seats[idx].can_act() {
                    let card = self.deck.draw();
                    self.seats[idx].hole.push(card);
                }
            }
        }

        let sb = self
            .next_seat_where(dealer, Seat::can_act)
            .ok_or(StartError::NotEnoughPlayers)?;
        let bb = self
            .next_seat_where(sb, Seat::can_act)
            .ok_or(StartError::NotEnoughPlayers)?;
        let (small, big) = (self.blinds.small, self.blinds.big);
        self.pot += self.seats[sb].commit(small);
        self.pot += self.seats[bb].commit(big);
        self.current_max_bet = self.seats[sb].current_bet.max(self.seats[bb].current_bet);
        self.seats[bb].acted = true;

        info!(
            "Hand {} started: dealer seat {dealer}, blinds {} (seats {sb}/{bb})",
            self.hand_id, self.blinds
        );
        self.progress(bb);
        Ok(())
    }

    /// Hand the turn to `seat` with a fresh deadline.
    pub(crate) fn give_turn(&mut self, seat: SeatIndex) {
        self.turn_seq += 1;
        self.turn = Some(Turn {
            seat,
            seq: self.turn_seq,
            deadline: Instant::now() + self.turn_timeout,
        });
    }

    /// Every active seat has matched the street and acted, or at most one
    /// active seat remains and it owes nothing.
    #[must_use]
    pub fn round_closed(&self) -> bool {
        let max = self.current_max_bet;
        let active: Vec<&Seat> = self.seats.iter().filter(|s| s.can_act()).collect();
        if active.len() <= 1 && active.iter().all(|s| s.owes(max) == 0) {
            return true;
        }
        active.iter().all(|s| s.acted && s.owes(max) == 0)
    }

    /// Settle whatever follows a mutation at seat `from`: end the hand,
    /// close the round (dealing further streets as needed) or pass the turn.
    pub(crate) fn progress(&mut self, from: SeatIndex) {
        let mut from = from;
        loop {
            if self.contenders() <= 1 {
                self.end_by_fold();
                return;
            }
            if !self.round_closed() {
                let max = self.current_max_bet;
                if let Some(next) =
                    self.next_seat_where(from, |s| s.can_act() && (!s.acted || s.owes(max) > 0))
                {
                    self.give_turn(next);
                    return;
                }
            }
            match self.phase.next_street() {
                Some((street, count)) => {
                    self.deal_street(street, count);
                    from = self.dealer.unwrap_or(0);
                }
                None => {
                    self.showdown();
                    return;
                }
            }
        }
    }

    fn deal_street(&mut self, street: Phase, count: usize) {
        for seat in &mut self.seats {
            seat.current_bet = 0;
            seat.acted = false;
        }
        self.current_max_bet = 0;
        self.min_raise = self.blinds.big;
        self.turn = None;
        self.phase = street;
        for _ in 0..count {
            let card = self.deck.draw();
            self.community.push(card);
        }
        debug!("Hand {} dealt {street}", self.hand_id);
    }

    fn end_by_fold(&mut self) {
        let pot = self.pot;
        let Some(idx) = self.seats.iter().position(Seat::in_hand) else {
            error!("Hand {} ended with no contender; pot of {pot} unpaid", self.hand_id);
            self.finish(Vec::new());
            return;
        };
        self.seats[idx].chips += pot;
        let winner = Winner {
            seat: idx,
            player_id: self.seats[idx]
                .player_id()
                .cloned()
                .unwrap_or_else(|| PlayerId::new("")),
            amount: pot,
            category: None,
        };
        info!("Hand {} won uncontested by seat {idx} (${pot})", self.hand_id);
        self.finish(vec![winner]);
    }

    fn showdown(&mut self) {
        self.phase = Phase::Showdown;
        self.turn = None;

        let contenders: Vec<SeatIndex> = self
            .seats
            .iter()
            .enumerate()
            .filter(|(_, s)| s.in_hand() && !s.hole.is_empty())
            .map(|(idx, _)| idx)
            .collect();
        let scores: Vec<_> = contenders
            .iter()
            .map(|&idx| {
                let mut cards = self.seats[idx].hole.clone();
                cards.extend_from_slice(&self.community);
                eval(&cards)
            })
            .collect();

        // Winners in clockwise order starting left of the dealer.
        let n = self.seats.len();
        let dealer = self.dealer.unwrap_or(0);
        let mut best: Vec<usize> = argmax(&scores);
        best.sort_by_key(|&i| (contenders[i] + n - dealer - 1) % n);

        let pot = self.pot;
        let Some(count) = Chips::try_from(best.len()).ok().filter(|&c| c > 0) else {
            error!("Hand {} reached showdown with no contender", self.hand_id);
            self.finish(Vec::new());
            return;
        };
        let share = pot / count;
        let mut remainder = pot % count;

        let mut winners = Vec::with_capacity(best.len());
        for i in best {
            let idx = contenders[i];
            let mut amount = share;
            if remainder > 0 {
                amount += 1;
                remainder -= 1;
            }
            self.seats[idx].chips += amount;
            winners.push(Winner {
                seat: idx,
                player_id: self.seats[idx]
                    .player_id()
                    .cloned()
                    .unwrap_or_else(|| PlayerId::new("")),
                amount,
                category: Some(scores[i].rank.label().to_string()),
            });
        }
        info!(
            "Hand {} showdown: {} winner(s) split ${pot}",
            self.hand_id,
            winners.len()
        );
        self.finish(winners);
    }

    fn finish(&mut self, winners: Vec<Winner>) {
        let outcome = HandOutcome {
            hand_id: self.hand_id,
            pot: self.pot,
            community: self.community.clone(),
            winners,
        };
        self.pot = 0;
        self.turn = None;
        self.current_max_bet = 0;
        self.min_raise = self.blinds.big;
        self.phase = Phase::Waiting;
        for seat in &mut self.seats {
            seat.current_bet = 0;
            seat.acted = false;
            seat.hole.clear();
            if seat.leaving {
                seat.vacate();
            }
        }
        self.last_outcome = Some(outcome.clone());
        self.completed.push(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{
        entities::{PlayerAction, Suit},
        functional::parse_cards,
    };
    use rand::{SeedableRng, rngs::StdRng};

    fn table(players: usize, stack: Chips) -> TableState {
        let mut state = TableState::new(
            6,
            Blinds { small: 25, big: 50 },
            Duration::from_secs(20),
        );
        for i in 0..players {
            state
                .seat_player(PlayerInfo::new(&format!("p{i}"), &format!("Player {i}")), stack)
                .unwrap();
        }
        state
    }

    fn id(i: usize) -> PlayerId {
        PlayerId::new(&format!("p{i}"))
    }

    fn on_turn(state: &TableState) -> PlayerId {
        let seat = state.turn.unwrap().seat;
        state.seats[seat].player_id().unwrap().clone()
    }

    // === Seating Tests ===

    #[tokio::test]
    async fn test_seat_player_fills_first_empty_seat() {
        let mut state = table(2, 1000);
        assert_eq!(state.occupied_count(), 2);
        let idx = state.seat_player(PlayerInfo::new("p9", "Nine"), 1000).unwrap();
        assert_eq!(idx, 2);
    }

    #[tokio::test]
    async fn test_seat_player_rejoin_keeps_seat() {
        let mut state = table(2, 1000);
        let idx = state.seat_player(PlayerInfo::new("p1", "Renamed"), 5).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(state.seats[1].chips, 1000);
        assert_eq!(state.occupied_count(), 2);
    }

    #[tokio::test]
    async fn test_full_table_rejects_join() {
        let mut state = table(6, 1000);
        assert_eq!(
            state.seat_player(PlayerInfo::new("late", "Late"), 1000),
            Err(JoinError::TableFull)
        );
    }

    #[tokio::test]
    async fn test_join_that_overflows_table_chips_is_rejected() {
        let mut state = table(1, Chips::MAX - 10);
        assert_eq!(
            state.seat_player(PlayerInfo::new("rich", "Rich"), 11),
            Err(JoinError::TableFull)
        );
        assert_eq!(state.occupied_count(), 1);
        assert!(state.seat_player(PlayerInfo::new("ok", "Ok"), 10).is_ok());
    }

    #[test]
    fn test_turn_timeout_is_capped() {
        let state = TableState::new(2, Blinds { small: 1, big: 2 }, Duration::from_secs(u64::MAX));
        assert_eq!(
            state.turn_timeout,
            Duration::from_secs(constants::MAX_TURN_TIMEOUT_SECS)
        );
    }

    // === Start Tests ===

    #[tokio::test]
    async fn test_start_needs_two_willing_seats() {
        let mut state = table(1, 1000);
        assert_eq!(state.start_hand(), Err(StartError::NotEnoughPlayers));
        assert_eq!(state.phase, Phase::Waiting);
    }

    #[tokio::test]
    async fn test_start_posts_blinds_and_deals() {
        let mut state = table(3, 1000);
        state.start_hand_with(&mut StdRng::seed_from_u64(1)).unwrap();

        assert_eq!(state.phase, Phase::Preflop);
        assert_eq!(state.hand_id, 1);
        assert_eq!(state.dealer, Some(0));
        assert_eq!(state.seats[1].current_bet, 25);
        assert_eq!(state.seats[2].current_bet, 50);
        assert!(state.seats[2].acted);
        assert_eq!(state.pot, 75);
        assert_eq!(state.current_max_bet, 50);
        assert_eq!(state.min_raise, 50);
        assert_eq!(state.turn.unwrap().seat, 0);
        for seat in state.seats.iter().take(3) {
            assert_eq!(seat.hole.len(), 2);
        }
        assert_eq!(state.start_hand(), Err(StartError::HandInProgress));
    }

    #[tokio::test]
    async fn test_dealer_rotates_between_hands() {
        let mut state = table(3, 1000);
        state.start_hand().unwrap();
        state.apply_action(&on_turn(&state), PlayerAction::Fold).unwrap();
        state.apply_action(&on_turn(&state), PlayerAction::Fold).unwrap();
        assert_eq!(state.phase, Phase::Waiting);

        state.start_hand().unwrap();
        assert_eq!(state.dealer, Some(1));
    }

    #[tokio::test]
    async fn test_short_blind_goes_all_in() {
        let mut state = table(2, 1000);
        state.seats[0].chips = 30;
        state.start_hand().unwrap();
        // Heads-up: dealer 0, small blind 1, big blind 0.
        assert_eq!(state.seats[0].status, SeatStatus::AllIn);
        assert_eq!(state.seats[0].current_bet, 30);
        assert_eq!(state.current_max_bet, 30);
    }

    // === Termination Tests ===

    #[tokio::test]
    async fn test_fold_out_pays_whole_pot() {
        let mut state = table(2, 1000);
        state.start_hand().unwrap();
        let before = state.chips_in_play();
        let folder = on_turn(&state);
        state.apply_action(&folder, PlayerAction::Fold).unwrap();

        assert_eq!(state.phase, Phase::Waiting);
        assert_eq!(state.pot, 0);
        assert_eq!(state.chips_in_play(), before);
        let outcome = state.last_outcome.clone().unwrap();
        assert_eq!(outcome.winners.len(), 1);
        assert_eq!(outcome.winners[0].amount, 75);
        assert!(outcome.winners[0].category.is_none());
        assert!(outcome.community.is_empty());
        assert_eq!(state.take_completed().len(), 1);
        assert!(state.take_completed().is_empty());
    }

    #[tokio::test]
    async fn test_all_in_runs_out_the_board() {
        let mut state = table(2, 1000);
        state.start_hand().unwrap();
        let first = on_turn(&state);
        state.apply_action(&first, PlayerAction::Raise(1000)).unwrap();
        let second = on_turn(&state);
        state.apply_action(&second, PlayerAction::Call).unwrap();

        assert_eq!(state.phase, Phase::Waiting);
        let outcome = state.last_outcome.clone().unwrap();
        assert_eq!(outcome.community.len(), 5);
        assert_eq!(outcome.pot, 2000);
        assert_eq!(state.chips_in_play(), 2000);
        assert!(outcome.winners.iter().all(|w| w.category.is_some()));
    }

    #[tokio::test]
    async fn test_leave_mid_hand_folds_and_vacates_after() {
        let mut state = table(3, 1000);
        state.start_hand().unwrap();
        // Seat 1 (small blind) is not on turn.
        assert_eq!(state.leave(&id(1)), Some(1));
        assert_eq!(state.seats[1].status, SeatStatus::Folded);
        assert!(state.seats[1].is_occupied());

        state.apply_action(&on_turn(&state), PlayerAction::Fold).unwrap();
        assert_eq!(state.phase, Phase::Waiting);
        assert!(!state.seats[1].is_occupied());
        assert_eq!(state.chips_in_play(), 3000);
    }

    #[tokio::test]
    async fn test_leave_between_hands_vacates_immediately() {
        let mut state = table(2, 1000);
        assert_eq!(state.leave(&id(0)), Some(0));
        assert_eq!(state.occupied_count(), 1);
        assert_eq!(state.leave(&id(0)), None);
    }

    #[tokio::test]
    async fn test_leave_on_turn_passes_turn() {
        let mut state = table(3, 1000);
        state.start_hand().unwrap();
        let seq = state.turn.unwrap().seq;
        let leaver = on_turn(&state);
        state.leave(&leaver).unwrap();
        let turn = state.turn.unwrap();
        assert!(turn.seq > seq);
        assert_ne!(on_turn(&state), leaver);
    }

    // === Showdown Tests ===

    #[tokio::test]
    async fn test_split_pot_gives_odd_chip_left_of_dealer() {
        let mut state = table(3, 1000);
        state.start_hand().unwrap();
        // Force a board that plays for everybody.
        state.seats[0].hole = vec![Card(2, Suit::Heart), Card(3, Suit::Heart)];
        state.seats[1].hole = vec![Card(2, Suit::Club), Card(3, Suit::Diamond)];
        state.seats[2].status = SeatStatus::Folded;
        state.pot = 101;
        state.community = parse_cards("AS KS QS JS TS").unwrap();
        state.phase = Phase::River;
        state.showdown();

        let outcome = state.last_outcome.clone().unwrap();
        assert_eq!(outcome.winners.len(), 2);
        // Dealer is seat 0, so seat 1 is first in line for the odd chip.
        assert_eq!(outcome.winners[0].seat, 1);
        assert_eq!(outcome.winners[0].amount, 51);
        assert_eq!(outcome.winners[1].seat, 0);
        assert_eq!(outcome.winners[1].amount, 50);
        assert_eq!(
            outcome.winners[0].category.as_deref(),
            Some("Straight Flush")
        );
    }
}
