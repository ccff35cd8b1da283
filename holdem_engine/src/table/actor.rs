//! Table actor implementation with async message handling.
//!
//! One actor owns one [`TableState`]. Every inbound event is handled in
//! arrival order inside a single `select!` loop, alongside the turn-clock
//! deadline and the next-hand timer.

use chrono::Utc;
use log::{debug, error, info};
use std::sync::Arc;
use tokio::{
    sync::{mpsc, oneshot},
    time::{Instant, sleep_until},
};

use super::{
    TableId,
    access::{self, AccessPolicy, Admission},
    clock::{self, Expiry, TurnTicket},
    config::TableConfig,
    errors::TableError,
    messages::{TableMessage, TableSummary},
    sessions::SessionRegistry,
};
use crate::{
    db::{HandRecord, HandRepository},
    game::{
        entities::{PlayerAction, PlayerId, PlayerInfo},
        state_machine::{JoinError, TableState},
        views::PublicTableView,
    },
    net::{ConnectionId, ServerMessage},
};

/// Table actor handle for sending messages
#[derive(Clone, Debug)]
pub struct TableHandle {
    sender: mpsc::Sender<TableMessage>,
    table_id: TableId,
}

impl TableHandle {
    /// Create a new table handle
    pub fn new(sender: mpsc::Sender<TableMessage>, table_id: TableId) -> Self {
        Self { sender, table_id }
    }

    /// Get table ID
    pub fn table_id(&self) -> &TableId {
        &self.table_id
    }

    /// Whether the actor has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send a message to the table
    pub async fn send(&self, message: TableMessage) -> Result<(), TableError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| TableError::Closed(self.table_id.clone()))
    }

    /// Current public snapshot
    pub async fn snapshot(&self) -> Result<PublicTableView, TableError> {
        let (response, rx) = oneshot::channel();
        self.send(TableMessage::GetSnapshot { response }).await?;
        rx.await.map_err(|_| TableError::Closed(self.table_id.clone()))
    }

    /// Lobby summary
    pub async fn summary(&self) -> Result<TableSummary, TableError> {
        let (response, rx) = oneshot::channel();
        self.send(TableMessage::GetSummary { response }).await?;
        rx.await.map_err(|_| TableError::Closed(self.table_id.clone()))
    }

    /// Stop the actor and wait for it to acknowledge
    pub async fn close(&self) -> Result<(), TableError> {
        let (response, rx) = oneshot::channel();
        self.send(TableMessage::Close { response }).await?;
        rx.await.map_err(|_| TableError::Closed(self.table_id.clone()))
    }
}

/// Table actor managing a single poker table
pub struct TableActor {
    /// Table ID
    id: TableId,

    /// Table configuration
    config: TableConfig,

    /// Who may sit down
    policy: AccessPolicy,

    /// Authoritative game state
    state: TableState,

    /// Connections watching this table
    sessions: SessionRegistry,

    /// Message inbox
    inbox: mpsc::Receiver<TableMessage>,

    /// Where finished hands go
    hands: Arc<dyn HandRepository>,

    /// When the next hand should be dealt
    next_hand_at: Option<Instant>,

    /// Own inbox, for results of work done off the actor
    loopback: mpsc::WeakSender<TableMessage>,

    /// Is table closed
    is_closed: bool,
}

impl TableActor {
    /// Create a new table actor and its handle
    pub fn new(
        id: TableId,
        config: TableConfig,
        policy: AccessPolicy,
        hands: Arc<dyn HandRepository>,
    ) -> (Self, TableHandle) {
        let (sender, inbox) = mpsc::channel(config.inbox_capacity.max(1));
        let state = TableState::new(config.max_seats, config.blinds(), config.turn_timeout());

        let actor = Self {
            id: id.clone(),
            config,
            policy,
            state,
            sessions: SessionRegistry::new(),
            inbox,
            hands,
            next_hand_at: None,
            loopback: sender.downgrade(),
            is_closed: false,
        };

        let handle = TableHandle::new(sender, id);

        (actor, handle)
    }

    /// Run the table actor event loop
    pub async fn run(mut self) {
        info!(
            "Table {} starting ({} seats, blinds {})",
            self.id, self.config.max_seats, self.state.blinds
        );

        loop {
            let ticket = clock::ticket(&self.state);
            let next_hand_at = self.next_hand_at;

            tokio::select! {
                message = self.inbox.recv() => match message {
                    Some(message) => self.handle_message(message),
                    None => break,
                },

                () = wake_at(ticket.map(|t| t.deadline)) => {
                    if let Some(ticket) = ticket {
                        self.on_turn_expired(ticket);
                    }
                }

                () = wake_at(next_hand_at) => {
                    self.next_hand_at = None;
                    self.start_if_ready();
                }
            }

            if self.is_closed {
                break;
            }
        }

        info!("Table {} closed", self.id);
    }

    /// Handle a table message
    fn handle_message(&mut self, message: TableMessage) {
        match message {
            TableMessage::Connect {
                connection_id,
                outbox,
            } => self.handle_connect(connection_id, outbox),

            TableMessage::Disconnect { connection_id } => {
                if let Some(player_id) = self.sessions.unregister(&connection_id) {
                    debug!(
                        "Table {}: connection {connection_id} of {player_id} closed",
                        self.id
                    );
                }
            }

            TableMessage::Join {
                connection_id,
                player,
                invite_token,
                password,
            } => self.handle_join(connection_id, player, invite_token, password),

            TableMessage::Admitted {
                connection_id,
                player,
                granted,
            } => {
                if !self.sessions.is_registered(&connection_id) {
                    return;
                }
                if granted {
                    self.seat(connection_id, player);
                } else {
                    self.refuse(connection_id, &player.id);
                }
            }

            TableMessage::Leave {
                connection_id,
                player_id,
            } => self.handle_leave(connection_id, player_id),

            TableMessage::Action {
                connection_id,
                player_id,
                action,
            } => self.handle_action(connection_id, player_id, action),

            TableMessage::Chat {
                connection_id,
                message,
            } => {
                if !self.sessions.is_registered(&connection_id) {
                    return;
                }
                let player_id = self.sessions.bound_player(&connection_id).cloned();
                self.sessions.broadcast(&ServerMessage::Chat {
                    player_id,
                    message,
                    at: Utc::now().timestamp_millis(),
                });
            }

            TableMessage::StartHand { connection_id } => {
                debug!(
                    "Table {}: manual start requested by {connection_id}",
                    self.id
                );
                if !self.state.hand_in_progress() {
                    self.next_hand_at = None;
                    self.start_if_ready();
                }
            }

            TableMessage::GetSnapshot { response } => {
                let _ = response.send(self.state.public_view(Instant::now()));
            }

            TableMessage::GetSummary { response } => {
                let _ = response.send(self.summary());
            }

            TableMessage::Close { response } => {
                self.is_closed = true;
                let _ = response.send(());
            }
        }
    }

    fn handle_connect(&mut self, connection_id: ConnectionId, outbox: mpsc::Sender<ServerMessage>) {
        self.sessions.register(connection_id, outbox);
        self.sessions
            .send_to(&connection_id, ServerMessage::Welcome { connection_id });
        let table = Box::new(self.state.public_view(Instant::now()));
        self.sessions
            .send_to(&connection_id, ServerMessage::State { table });
        debug!(
            "Table {}: connection {connection_id} registered ({} open)",
            self.id,
            self.sessions.len()
        );
    }

    fn handle_join(
        &mut self,
        connection_id: ConnectionId,
        player: PlayerInfo,
        invite_token: Option<String>,
        password: Option<String>,
    ) {
        if !self.sessions.is_registered(&connection_id) {
            debug!("Table {}: join from unknown connection {connection_id}", self.id);
            return;
        }

        match self
            .policy
            .screen(password.as_deref(), invite_token.as_deref())
        {
            Admission::Granted => self.seat(connection_id, player),
            Admission::Denied => self.refuse(connection_id, &player.id),
            Admission::VerifyPassword { password, hash } => {
                self.verify_off_actor(connection_id, player, password, hash);
            }
        }
    }

    /// Run the Argon2 check on the blocking pool and feed the verdict back
    /// through the inbox, so play continues meanwhile.
    fn verify_off_actor(
        &self,
        connection_id: ConnectionId,
        player: PlayerInfo,
        password: String,
        hash: String,
    ) {
        let loopback = self.loopback.clone();
        let table_id = self.id.clone();
        tokio::spawn(async move {
            let granted =
                tokio::task::spawn_blocking(move || access::verify_password(&password, &hash))
                    .await
                    .unwrap_or_else(|e| {
                        error!("Table {table_id}: password check failed: {e}");
                        false
                    });
            if let Some(inbox) = loopback.upgrade() {
                let _ = inbox
                    .send(TableMessage::Admitted {
                        connection_id,
                        player,
                        granted,
                    })
                    .await;
            }
        });
    }

    fn refuse(&mut self, connection_id: ConnectionId, player_id: &PlayerId) {
        info!("Table {}: refused join for {player_id}", self.id);
        self.sessions
            .send_to(&connection_id, ServerMessage::error(JoinError::Unauthorized.to_string()));
    }

    fn seat(&mut self, connection_id: ConnectionId, player: PlayerInfo) {
        let player = player.sanitized();
        let newly_seated = self.state.find_seat(&player.id).is_none();
        match self
            .state
            .seat_player(player.clone(), self.config.starting_stack)
        {
            Ok(seat) => {
                self.sessions.unbind_player(&player.id);
                self.sessions.bind(&connection_id, player.id.clone());
                if newly_seated {
                    info!("Table {}: {} sat down in seat {seat}", self.id, player.id);
                    self.sessions
                        .broadcast(&ServerMessage::PlayerJoined { player, seat });
                }
                let started = self.next_hand_at.is_none() && self.start_if_ready();
                if !started {
                    self.publish();
                }
            }
            Err(e) => {
                debug!("Table {}: join for {} failed: {e}", self.id, player.id);
                self.sessions
                    .send_to(&connection_id, ServerMessage::error(e.to_string()));
            }
        }
    }

    fn handle_leave(&mut self, connection_id: ConnectionId, player_id: PlayerId) {
        if !self.is_bound_to(&connection_id, &player_id) {
            debug!(
                "Table {}: leave for {player_id} from unbound connection {connection_id}",
                self.id
            );
            return;
        }
        if self.state.leave(&player_id).is_none() {
            return;
        }
        info!("Table {}: {player_id} left", self.id);
        self.sessions.unbind_player(&player_id);
        self.sessions
            .broadcast(&ServerMessage::PlayerLeft { player_id });
        self.publish();
    }

    fn handle_action(&mut self, connection_id: ConnectionId, player_id: PlayerId, action: PlayerAction) {
        if !self.is_bound_to(&connection_id, &player_id) {
            debug!(
                "Table {}: {action} for {player_id} from unbound connection {connection_id}",
                self.id
            );
            return;
        }
        match self.state.apply_action(&player_id, action) {
            Ok(()) => self.publish(),
            Err(e) => debug!("Table {}: ignored {action} from {player_id}: {e}", self.id),
        }
    }

    fn on_turn_expired(&mut self, ticket: TurnTicket) {
        match clock::fire(&mut self.state, ticket) {
            Expiry::Applied { player_id, action } => {
                debug!("Table {}: timed out {player_id}, auto {action}", self.id);
                self.publish();
            }
            Expiry::Stale => {}
            Expiry::Rejected(e) => {
                debug!("Table {}: timeout action rejected: {e}", self.id);
            }
        }
    }

    /// Deal a hand when nothing is running and enough seats are willing.
    /// Start a hand if the table can, publishing it. Returns whether one
    /// started.
    fn start_if_ready(&mut self) -> bool {
        if self.state.hand_in_progress() {
            return false;
        }
        match self.state.start_hand() {
            Ok(()) => {
                self.publish();
                true
            }
            Err(e) => {
                debug!("Table {}: not starting: {e}", self.id);
                false
            }
        }
    }

    fn is_bound_to(&self, connection_id: &ConnectionId, player_id: &PlayerId) -> bool {
        self.sessions.bound_player(connection_id) == Some(player_id)
    }

    /// Persist finished hands, arm the next-hand timer and push fresh
    /// projections to every connection.
    fn publish(&mut self) {
        self.flush_completed();

        let table = Box::new(self.state.public_view(Instant::now()));
        self.sessions.broadcast(&ServerMessage::State { table });

        let state = &self.state;
        self.sessions
            .send_to_bound(|player_id| ServerMessage::HoleCards {
                player_id: player_id.clone(),
                cards: state.private_view(player_id),
            });
    }

    fn flush_completed(&mut self) {
        let outcomes = self.state.take_completed();
        if outcomes.is_empty() {
            return;
        }

        for outcome in &outcomes {
            let record = HandRecord::from_outcome(&self.id, outcome, Utc::now());
            let hands = Arc::clone(&self.hands);
            let table_id = self.id.clone();
            tokio::spawn(async move {
                if let Err(e) = hands.record_hand(&record).await {
                    error!(
                        "Table {table_id}: failed to record hand {}: {e}",
                        record.hand_id
                    );
                }
            });
        }

        if let Some(delay) = self.config.next_hand_delay() {
            self.next_hand_at = Some(Instant::now() + delay);
        }
    }

    fn summary(&self) -> TableSummary {
        TableSummary {
            table_id: self.id.clone(),
            is_private: self.policy.is_private(),
            seated: self.state.occupied_count(),
            max_seats: self.state.seats.len(),
            connections: self.sessions.len(),
            phase: self.state.phase,
            hand_id: self.state.hand_id,
            small_blind: self.state.blinds.small,
            big_blind: self.state.blinds.big,
            pot: self.state.pot,
        }
    }
}

/// Resolves at `deadline`, or never when there is none.
async fn wake_at(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
