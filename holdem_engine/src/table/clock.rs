//! Turn clock: forces a default action when a seat runs out of time.
//!
//! The clock owns no task. The table actor asks for the pending
//! [`TurnTicket`], sleeps until its deadline inside its `select!` loop and
//! hands the ticket back to [`fire`]. Any action taken in the meantime
//! bumps the turn sequence, which makes the old ticket stale.

use log::debug;
use tokio::time::Instant;

use crate::game::{
    betting::ActionError,
    entities::{PlayerAction, PlayerId, SeatIndex},
    state_machine::TableState,
};

/// Identifies one specific turn.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TurnTicket {
    pub hand_id: u64,
    pub seat: SeatIndex,
    pub seq: u64,
    pub deadline: Instant,
}

/// The turn currently waiting on a seat, if any.
#[must_use]
pub fn ticket(state: &TableState) -> Option<TurnTicket> {
    if !state.hand_in_progress() {
        return None;
    }
    state.turn.map(|turn| TurnTicket {
        hand_id: state.hand_id,
        seat: turn.seat,
        seq: turn.seq,
        deadline: turn.deadline,
    })
}

/// Fold when the seat owes chips, check otherwise.
#[must_use]
pub fn default_action(state: &TableState, seat: SeatIndex) -> PlayerAction {
    if state.seats[seat].owes(state.current_max_bet) > 0 {
        PlayerAction::Fold
    } else {
        PlayerAction::Check
    }
}

/// Outcome of an expired deadline.
#[derive(Debug, Eq, PartialEq)]
pub enum Expiry {
    /// The default action was applied for this player.
    Applied {
        player_id: PlayerId,
        action: PlayerAction,
    },
    /// The ticket no longer matches the pending turn.
    Stale,
    /// The action went through the normal path and was refused.
    Rejected(ActionError),
}

/// Apply the default action for `ticket` if that exact turn is still
/// pending.
pub fn fire(state: &mut TableState, ticket: TurnTicket) -> Expiry {
    if self::ticket(state).map(|t| (t.hand_id, t.seq)) != Some((ticket.hand_id, ticket.seq)) {
        debug!("Ignoring stale turn deadline for seat {}", ticket.seat);
        return Expiry::Stale;
    }
    let Some(player_id) = state.seats[ticket.seat].player_id().cloned() else {
        return Expiry::Stale;
    };
    let action = default_action(state, ticket.seat);
    debug!(
        "Turn clock expired for seat {} in hand {}: {action}",
        ticket.seat, ticket.hand_id
    );
    match state.apply_action(&player_id, action) {
        Ok(()) => Expiry::Applied { player_id, action },
        Err(e) => Expiry::Rejected(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Blinds, Chips, Phase, PlayerInfo, SeatStatus};
    use std::time::Duration;

    fn heads_up() -> TableState {
        let mut state = TableState::new(2, Blinds { small: 25, big: 50 }, Duration::from_secs(20));
        state.seat_player(PlayerInfo::new("a", "A"), 1000).unwrap();
        state.seat_player(PlayerInfo::new("b", "B"), 1000).unwrap();
        state.start_hand().unwrap();
        state
    }

    #[tokio::test(start_paused = true)]
    async fn test_owing_seat_is_folded() {
        let mut state = heads_up();
        let t = ticket(&state).unwrap();
        assert_eq!(t.seat, 1);
        assert_eq!(t.deadline, Instant::now() + Duration::from_secs(20));
        let stack: Chips = state.seats[1].chips;

        let expiry = fire(&mut state, t);
        assert_eq!(
            expiry,
            Expiry::Applied {
                player_id: PlayerId::new("b"),
                action: PlayerAction::Fold
            }
        );
        assert_eq!(state.seats[1].status, SeatStatus::Folded);
        assert_eq!(state.seats[1].chips, stack);
    }

    #[tokio::test]
    async fn test_seat_owing_nothing_checks() {
        let mut state = heads_up();
        state.apply_action(&PlayerId::new("b"), PlayerAction::Call).unwrap();
        assert_eq!(state.phase, Phase::Flop);
        let t = ticket(&state).unwrap();
        assert_eq!(default_action(&state, t.seat), PlayerAction::Check);
        assert!(matches!(fire(&mut state, t), Expiry::Applied { .. }));
        assert_eq!(state.phase, Phase::Flop);
    }

    #[tokio::test]
    async fn test_superseded_ticket_is_stale() {
        let mut state = heads_up();
        let old = ticket(&state).unwrap();
        state.apply_action(&PlayerId::new("b"), PlayerAction::Raise(100)).unwrap();
        let pot = state.pot;
        assert_eq!(fire(&mut state, old), Expiry::Stale);
        assert_eq!(state.pot, pot);
    }

    #[tokio::test]
    async fn test_no_ticket_between_hands() {
        let mut state = heads_up();
        state.apply_action(&PlayerId::new("b"), PlayerAction::Fold).unwrap();
        assert!(ticket(&state).is_none());
    }
}
