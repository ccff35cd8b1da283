//! Per-table connection registry.
//!
//! Each connection has an outbox and, once it joins, a bound player id.
//! Sends never block the table actor: a full outbox drops the message and a
//! closed one unregisters the connection.

use log::{debug, warn};
use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{
    game::entities::PlayerId,
    net::{ConnectionId, ServerMessage},
};

#[derive(Debug)]
struct Session {
    player_id: Option<PlayerId>,
    outbox: mpsc::Sender<ServerMessage>,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ConnectionId, Session>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, connection_id: ConnectionId, outbox: mpsc::Sender<ServerMessage>) {
        self.sessions.insert(
            connection_id,
            Session {
                player_id: None,
                outbox,
            },
        );
    }

    /// Drop a connection, returning the player it was bound to.
    pub fn unregister(&mut self, connection_id: &ConnectionId) -> Option<PlayerId> {
        self.sessions
            .remove(connection_id)
            .and_then(|s| s.player_id)
    }

    /// Bind `connection_id` to `player_id`. Returns `false` for an unknown
    /// connection.
    pub fn bind(&mut self, connection_id: &ConnectionId, player_id: PlayerId) -> bool {
        match self.sessions.get_mut(connection_id) {
            Some(session) => {
                session.player_id = Some(player_id);
                true
            }
            None => false,
        }
    }

    /// Clear the binding of every connection bound to `player_id`.
    pub fn unbind_player(&mut self, player_id: &PlayerId) {
        for session in self.sessions.values_mut() {
            if session.player_id.as_ref() == Some(player_id) {
                session.player_id = None;
            }
        }
    }

    #[must_use]
    pub fn bound_player(&self, connection_id: &ConnectionId) -> Option<&PlayerId> {
        self.sessions
            .get(connection_id)
            .and_then(|s| s.player_id.as_ref())
    }

    #[must_use]
    pub fn is_registered(&self, connection_id: &ConnectionId) -> bool {
        self.sessions.contains_key(connection_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Send to a single connection.
    pub fn send_to(&mut self, connection_id: &ConnectionId, message: ServerMessage) {
        let Some(session) = self.sessions.get(connection_id) else {
            return;
        };
        if !deliver(connection_id, session, message) {
            self.sessions.remove(connection_id);
        }
    }

    /// Send the same message to every connection.
    pub fn broadcast(&mut self, message: &ServerMessage) {
        self.sessions
            .retain(|connection_id, session| deliver(connection_id, session, message.clone()));
    }

    /// Send each bound connection the message `render` builds for its
    /// player. Unbound connections get nothing.
    pub fn send_to_bound(&mut self, mut render: impl FnMut(&PlayerId) -> ServerMessage) {
        self.sessions.retain(|connection_id, session| match &session.player_id {
            Some(player_id) => deliver(connection_id, session, render(player_id)),
            None => true,
        });
    }
}

/// Returns whether the session should stay registered.
fn deliver(connection_id: &ConnectionId, session: &Session, message: ServerMessage) -> bool {
    match session.outbox.try_send(message) {
        Ok(()) => true,
        Err(TrySendError::Full(message)) => {
            warn!("Connection {connection_id} outbox full, dropping {message}");
            true
        }
        Err(TrySendError::Closed(_)) => {
            debug!("Connection {connection_id} closed, unregistering");
            false
        }
    }
}
