//! Table actor message types.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use super::TableId;
use crate::{
    game::{
        entities::{Chips, Phase, PlayerAction, PlayerId, PlayerInfo},
        views::PublicTableView,
    },
    net::{ClientMessage, ConnectionId, ServerMessage},
};

/// Messages that can be sent to a TableActor
#[derive(Debug)]
pub enum TableMessage {
    /// A transport connection opened; `outbox` carries everything the
    /// table sends to it.
    Connect {
        connection_id: ConnectionId,
        outbox: mpsc::Sender<ServerMessage>,
    },

    /// The connection closed. The seat, if any, stays; the turn clock acts
    /// for it.
    Disconnect { connection_id: ConnectionId },

    /// Take a seat, or rebind an existing seat to this connection
    Join {
        connection_id: ConnectionId,
        player: PlayerInfo,
        invite_token: Option<String>,
        password: Option<String>,
    },

    /// Result of a password check run off the actor for an earlier `Join`.
    /// Only the actor itself sends this.
    Admitted {
        connection_id: ConnectionId,
        player: PlayerInfo,
        granted: bool,
    },

    /// Leave the table
    Leave {
        connection_id: ConnectionId,
        player_id: PlayerId,
    },

    /// Player action (fold, check, call, raise)
    Action {
        connection_id: ConnectionId,
        player_id: PlayerId,
        action: PlayerAction,
    },

    /// Chat line, attributed to the player bound to the connection
    Chat {
        connection_id: ConnectionId,
        message: String,
    },

    /// Manual start when auto-start didn't kick in
    StartHand { connection_id: ConnectionId },

    /// Current public snapshot
    GetSnapshot {
        response: oneshot::Sender<PublicTableView>,
    },

    /// Lobby summary
    GetSummary {
        response: oneshot::Sender<TableSummary>,
    },

    /// Stop the actor
    Close { response: oneshot::Sender<()> },
}

impl TableMessage {
    /// Translate a parsed client message. A raise without an amount has no
    /// meaning and yields `None`.
    #[must_use]
    pub fn from_client(connection_id: ConnectionId, message: ClientMessage) -> Option<Self> {
        let message = match message {
            ClientMessage::JoinTable {
                player,
                invite_token,
                password,
            } => Self::Join {
                connection_id,
                player,
                invite_token,
                password,
            },
            ClientMessage::LeaveTable { player_id } => Self::Leave {
                connection_id,
                player_id,
            },
            ClientMessage::PlayerAction {
                player_id,
                action,
                amount,
            } => Self::Action {
                connection_id,
                player_id,
                action: ClientMessage::to_action(action, amount)?,
            },
            ClientMessage::Chat { message, .. } => Self::Chat {
                connection_id,
                message,
            },
            ClientMessage::StartHand => Self::StartHand { connection_id },
        };
        Some(message)
    }
}

/// Table summary for lobby listings
#[derive(Debug, Clone, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    pub table_id: TableId,
    pub is_private: bool,
    pub seated: usize,
    pub max_seats: usize,
    pub connections: usize,
    pub phase: Phase,
    pub hand_id: u64,
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub pot: Chips,
}
