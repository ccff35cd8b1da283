//! Single entry point for player and timer actions.

use log::debug;
use thiserror::Error;

use super::{
    entities::{Chips, PlayerAction, PlayerId, SeatStatus},
    state_machine::TableState,
};

/// Why an action was refused. Nothing is mutated when one of these is
/// returned.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum ActionError {
    #[error("no hand in progress")]
    NoHandInProgress,
    #[error("player is not seated")]
    UnknownPlayer,
    #[error("not your turn")]
    NotYourTurn,
    #[error("seat is not active")]
    SeatNotActive,
    #[error("can't check facing a bet of ${to_call}")]
    CannotCheck { to_call: Chips },
    #[error("raise to ${total} is below the minimum of ${min_total}")]
    RaiseTooSmall { total: Chips, min_total: Chips },
    #[error("action moves no chips")]
    NothingToPay,
}

impl TableState {
    /// Validate and apply one action for `player_id`, then advance the turn,
    /// the street or the hand.
    pub fn apply_action(
        &mut self,
        player_id: &PlayerId,
        action: PlayerAction,
    ) -> Result<(), ActionError> {
        if !self.hand_in_progress() {
            return Err(ActionError::NoHandInProgress);
        }
        let idx = self
            .find_seat(player_id)
            .ok_or(ActionError::UnknownPlayer)?;
        if self.turn.map(|t| t.seat) != Some(idx) {
            return Err(ActionError::NotYourTurn);
        }
        if self.seats[idx].status != SeatStatus::Active {
            return Err(ActionError::SeatNotActive);
        }

        let max = self.current_max_bet;
        let seat = &self.seats[idx];
        let to_call = seat.owes(max);

        // Validate everything before touching state.
        let raise_to = match action {
            PlayerAction::Check if to_call > 0 => {
                return Err(ActionError::CannotCheck { to_call });
            }
            PlayerAction::Raise(total) => {
                let min_total = max.saturating_add(self.min_raise);
                let all_in_total = seat.current_bet + seat.chips;
                let total = if all_in_total < min_total {
                    // Short stacks may only shove.
                    if total < all_in_total {
                        return Err(ActionError::RaiseTooSmall { total, min_total: all_in_total });
                    }
                    all_in_total
                } else if total < min_total {
                    return Err(ActionError::RaiseTooSmall { total, min_total });
                } else {
                    total.min(all_in_total)
                };
                if total <= seat.current_bet {
                    return Err(ActionError::NothingToPay);
                }
                Some(total)
            }
            _ => None,
        };

        let seat = &mut self.seats[idx];
        match action {
            PlayerAction::Fold => {
                seat.status = SeatStatus::Folded;
            }
            PlayerAction::Check => {}
            PlayerAction::Call => {
                self.pot += seat.commit(to_call);
            }
            PlayerAction::Raise(_) => {
                let total = raise_to.unwrap_or(max);
                self.pot += seat.commit(total - seat.current_bet);
            }
        }
        seat.acted = true;
        let new_bet = seat.current_bet;
        debug!("Hand {}: seat {idx} {action}", self.hand_id);

        if new_bet > max {
            self.min_raise = self.min_raise.max(new_bet - max);
            self.current_max_bet = new_bet;
            for (other, s) in self.seats.iter_mut().enumerate() {
                if other != idx && s.status == SeatStatus::Active {
                    s.acted = false;
                }
            }
        }

        self.turn = None;
        self.progress(idx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Blinds, Phase, PlayerInfo};
    use std::time::Duration;

    fn heads_up(stacks: [Chips; 2]) -> TableState {
        let mut state = TableState::new(2, Blinds { small: 25, big: 50 }, Duration::from_secs(20));
        for (i, chips) in stacks.into_iter().enumerate() {
            state
                .seat_player(PlayerInfo::new(&format!("p{i}"), ""), chips)
                .unwrap();
        }
        state.start_hand().unwrap();
        state
    }

    fn id(i: usize) -> PlayerId {
        PlayerId::new(&format!("p{i}"))
    }

    // Heads-up: dealer seat 0, small blind seat 1, big blind seat 0, seat 1
    // acts first.

    #[tokio::test]
    async fn test_out_of_turn_rejected() {
        let mut state = heads_up([1000, 1000]);
        let pot = state.pot;
        assert_eq!(
            state.apply_action(&id(0), PlayerAction::Call),
            Err(ActionError::NotYourTurn)
        );
        assert_eq!(state.pot, pot);
    }

    #[tokio::test]
    async fn test_unknown_player_rejected() {
        let mut state = heads_up([1000, 1000]);
        assert_eq!(
            state.apply_action(&PlayerId::new("ghost"), PlayerAction::Fold),
            Err(ActionError::UnknownPlayer)
        );
    }

    #[tokio::test]
    async fn test_check_facing_bet_rejected() {
        let mut state = heads_up([1000, 1000]);
        assert_eq!(
            state.apply_action(&id(1), PlayerAction::Check),
            Err(ActionError::CannotCheck { to_call: 25 })
        );
        assert_eq!(state.turn.unwrap().seat, 1);
    }

    #[tokio::test]
    async fn test_under_raise_rejected() {
        let mut state = heads_up([1000, 1000]);
        assert_eq!(
            state.apply_action(&id(1), PlayerAction::Raise(80)),
            Err(ActionError::RaiseTooSmall { total: 80, min_total: 100 })
        );
        assert_eq!(state.seats[1].current_bet, 25);
    }

    #[tokio::test]
    async fn test_short_stack_raise_becomes_all_in() {
        let mut state = heads_up([1000, 90]);
        // Seat 1 can reach 90 in total, short of the 100 minimum.
        state.apply_action(&id(1), PlayerAction::Raise(90)).unwrap();
        assert_eq!(state.seats[1].status, SeatStatus::AllIn);
        assert_eq!(state.current_max_bet, 90);
        assert_eq!(state.min_raise, 50);
        assert_eq!(state.turn.unwrap().seat, 0);
    }

    #[tokio::test]
    async fn test_raise_clears_others_acted_and_sets_min_raise() {
        let mut state = heads_up([1000, 1000]);
        state.apply_action(&id(1), PlayerAction::Raise(200)).unwrap();
        assert_eq!(state.current_max_bet, 200);
        assert_eq!(state.min_raise, 150);
        assert!(!state.seats[0].acted);
        assert!(state.seats[1].acted);
        assert_eq!(state.pot, 250);

        // Re-raise must be at least 200 + 150.
        assert_eq!(
            state.apply_action(&id(0), PlayerAction::Raise(300)),
            Err(ActionError::RaiseTooSmall { total: 300, min_total: 350 })
        );
        state.apply_action(&id(0), PlayerAction::Raise(350)).unwrap();
        assert_eq!(state.current_max_bet, 350);
        assert_eq!(state.min_raise, 150);
    }

    #[tokio::test]
    async fn test_call_closes_preflop_and_deals_flop() {
        let mut state = heads_up([1000, 1000]);
        state.apply_action(&id(1), PlayerAction::Call).unwrap();
        // Big blind already counts as acted.
        assert_eq!(state.phase, Phase::Flop);
        assert_eq!(state.community.len(), 3);
        assert_eq!(state.current_max_bet, 0);
        assert_eq!(state.pot, 100);
        // First to act post-flop is left of the dealer.
        assert_eq!(state.turn.unwrap().seat, 1);
    }

    #[tokio::test]
    async fn test_check_around_reaches_showdown() {
        let mut state = heads_up([1000, 1000]);
        state.apply_action(&id(1), PlayerAction::Call).unwrap();
        for _ in 0..3 {
            state.apply_action(&id(1), PlayerAction::Check).unwrap();
            state.apply_action(&id(0), PlayerAction::Check).unwrap();
        }
        assert_eq!(state.phase, Phase::Waiting);
        assert_eq!(state.chips_in_play(), 2000);
        let outcome = state.last_outcome.clone().unwrap();
        assert_eq!(outcome.pot, 100);
        assert_eq!(outcome.winners.iter().map(|w| w.amount).sum::<Chips>(), 100);
    }

    #[tokio::test]
    async fn test_no_action_between_hands() {
        let mut state = heads_up([1000, 1000]);
        state.apply_action(&id(1), PlayerAction::Fold).unwrap();
        assert_eq!(
            state.apply_action(&id(0), PlayerAction::Check),
            Err(ActionError::NoHandInProgress)
        );
    }

    #[tokio::test]
    async fn test_each_turn_bumps_sequence() {
        let mut state = heads_up([1000, 1000]);
        let first = state.turn.unwrap().seq;
        state.apply_action(&id(1), PlayerAction::Raise(100)).unwrap();
        assert!(state.turn.unwrap().seq > first);
    }
}
