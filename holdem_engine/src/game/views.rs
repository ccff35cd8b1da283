//! Public and private projections of a [`TableState`].
//!
//! The public view goes to every connection and never carries a hole card's
//! face. The private view carries one player's own hole cards.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::{
    entities::{Card, Chips, Phase, PlayerId, SeatIndex, SeatStatus, Winner},
    state_machine::TableState,
};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CardView {
    Hidden { hidden: bool },
    Face { rank: String, suit: String },
}

impl CardView {
    #[must_use]
    pub fn hidden() -> Self {
        Self::Hidden { hidden: true }
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        matches!(self, Self::Hidden { .. })
    }
}

impl From<&Card> for CardView {
    fn from(card: &Card) -> Self {
        Self::Face {
            rank: card.rank_label(),
            suit: card.1.to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSeatView {
    pub seat: SeatIndex,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
    pub name: String,
    pub avatar: String,
    pub chips: Chips,
    pub status: SeatStatus,
    pub current_bet: Chips,
    pub acted: bool,
    pub cards: Vec<CardView>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicTableView {
    pub players: Vec<PublicSeatView>,
    pub community_cards: Vec<CardView>,
    pub pot: Chips,
    pub phase: Phase,
    pub current_seat: Option<SeatIndex>,
    pub current_max_bet: Chips,
    pub min_raise: Chips,
    pub hand_id: u64,
    pub dealer_seat: Option<SeatIndex>,
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub winners: Vec<Winner>,
    pub remaining_ms: Option<u64>,
}

impl TableState {
    /// Snapshot safe to send to anyone at the table.
    #[must_use]
    pub fn public_view(&self, now: Instant) -> PublicTableView {
        let players = self
            .seats
            .iter()
            .enumerate()
            .map(|(seat, s)| PublicSeatView {
                seat,
                player_id: s.player_id().cloned(),
                name: s.occupant.as_ref().map(|p| p.name.clone()).unwrap_or_default(),
                avatar: s
                    .occupant
                    .as_ref()
                    .map(|p| p.avatar.clone())
                    .unwrap_or_default(),
                chips: s.chips,
                status: s.status,
                current_bet: s.current_bet,
                acted: s.acted,
                cards: s.hole.iter().map(|_| CardView::hidden()).collect(),
            })
            .collect();

        PublicTableView {
            players,
            community_cards: self.community.iter().map(CardView::from).collect(),
            pot: self.pot,
            phase: self.phase,
            current_seat: self.turn.map(|t| t.seat),
            current_max_bet: self.current_max_bet,
            min_raise: self.min_raise,
            hand_id: self.hand_id,
            dealer_seat: self.dealer,
            small_blind: self.blinds.small,
            big_blind: self.blinds.big,
            winners: self
                .last_outcome
                .as_ref()
                .map(|o| o.winners.clone())
                .unwrap_or_default(),
            remaining_ms: self.remaining_ms(now),
        }
    }

    /// `player_id`'s own hole cards; empty between hands or when not seated.
    #[must_use]
    pub fn private_view(&self, player_id: &PlayerId) -> Vec<CardView> {
        self.find_seat(player_id)
            .map(|idx| self.seats[idx].hole.iter().map(CardView::from).collect())
            .unwrap_or_default()
    }
}
