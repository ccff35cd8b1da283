use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::game::{
    entities::{Chips, PlayerAction, PlayerId, PlayerInfo, SeatIndex},
    views::{CardView, PublicTableView},
};

/// Error message sent when a private table refuses a join.
pub const ERR_UNAUTHORIZED: &str = "unauthorized";
/// Error message sent when no seat is free.
pub const ERR_TABLE_FULL: &str = "table_full";
/// Error message sent for JSON that doesn't parse as a [`ClientMessage`].
pub const ERR_BAD_MESSAGE: &str = "bad_message";

/// Identifies one transport connection for its whole lifetime.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Action names as they appear on the wire.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Fold,
    Check,
    Call,
    Raise,
}

/// A message from a client connection.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Take a seat (or rebind an existing one) at the table.
    JoinTable {
        player: PlayerInfo,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        invite_token: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
    LeaveTable {
        player_id: PlayerId,
    },
    PlayerAction {
        player_id: PlayerId,
        action: ActionKind,
        /// Total bet-to for a raise.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<Chips>,
    },
    /// The sender is always the player bound to the connection, whatever
    /// `player_id` says.
    Chat {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_id: Option<PlayerId>,
        message: String,
    },
    StartHand,
}

impl ClientMessage {
    /// Build a [`PlayerAction`] from its wire parts. A raise without an
    /// amount is meaningless and yields `None`.
    #[must_use]
    pub fn to_action(kind: ActionKind, amount: Option<Chips>) -> Option<PlayerAction> {
        match kind {
            ActionKind::Fold => Some(PlayerAction::Fold),
            ActionKind::Check => Some(PlayerAction::Check),
            ActionKind::Call => Some(PlayerAction::Call),
            ActionKind::Raise => amount.map(PlayerAction::Raise),
        }
    }
}

/// A message to a client connection.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Welcome {
        connection_id: ConnectionId,
    },
    /// Public snapshot; hole cards are always hidden.
    State {
        table: Box<PublicTableView>,
    },
    /// The bound player's own hole cards; empty between hands.
    HoleCards {
        player_id: PlayerId,
        cards: Vec<CardView>,
    },
    PlayerJoined {
        player: PlayerInfo,
        seat: SeatIndex,
    },
    PlayerLeft {
        player_id: PlayerId,
    },
    Chat {
        #[serde(skip_serializing_if = "Option::is_none")]
        player_id: Option<PlayerId>,
        message: String,
        /// Unix milliseconds.
        at: i64,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Welcome { .. } => "welcome",
            Self::State { .. } => "state",
            Self::HoleCards { .. } => "hole_cards",
            Self::PlayerJoined { .. } => "player_joined",
            Self::PlayerLeft { .. } => "player_left",
            Self::Chat { .. } => "chat",
            Self::Error { .. } => "error",
        };
        write!(f, "{repr}")
    }
}
