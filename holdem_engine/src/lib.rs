//! # Hold'em Engine
//!
//! Authoritative server-side engine for multiplayer Texas Hold'em tables.
//!
//! The engine owns the only correct copy of each table's state: it deals
//! from a cryptographically shuffled deck, enforces betting rules, runs a
//! per-seat turn clock, evaluates hands and settles the pot. Clients only
//! ever see a public projection plus their own hole cards.
//!
//! ## Core Modules
//!
//! - [`game`]: cards, hand evaluation, table state and the betting engine
//! - [`table`]: one async actor per table, access control, sessions and the
//!   table manager
//! - [`net`]: JSON wire protocol spoken over any ordered transport
//! - [`db`]: hand-history persistence
//!
//! ## Example
//!
//! ```
//! use holdem_engine::game::{entities::Blinds, TableState};
//! use holdem_engine::game::entities::{PlayerAction, PlayerInfo};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut table = TableState::new(6, Blinds { small: 25, big: 50 }, Duration::from_secs(20));
//! table.seat_player(PlayerInfo::new("alice", "Alice"), 5000).unwrap();
//! table.seat_player(PlayerInfo::new("bob", "Bob"), 5000).unwrap();
//! table.start_hand().unwrap();
//! assert_eq!(table.pot, 75);
//! # }
//! ```

/// Hand-history persistence.
pub mod db;

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    ActionError, JoinError, StartError, TableState,
    constants,
    entities::{self, Card, Chips, PlayerAction, PlayerId, PlayerInfo},
    functional,
};

/// Wire protocol shared by the table actor and transports.
pub mod net;
pub use net::{ClientMessage, ConnectionId, ServerMessage, messages};

/// Table actors and their manager.
pub mod table;
pub use table::{TableConfig, TableError, TableHandle, TableManager};
