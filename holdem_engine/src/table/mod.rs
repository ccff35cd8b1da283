//! Table module: one async actor per table plus the manager that spawns them.
//!
//! ## Architecture
//!
//! Each table runs in its own Tokio task with a bounded mpsc inbox. The
//! actor exclusively owns the table's [`TableState`](crate::game::TableState);
//! connections, the turn clock and the next-hand timer all feed the same
//! loop, so no locks guard game state. The [`TableManager`] keeps handles
//! for discovery and shutdown.
//!
//! ## Example
//!
//! ```no_run
//! use holdem_engine::db::InMemoryHandRepository;
//! use holdem_engine::table::{TableConfig, TableManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = TableManager::new(Arc::new(InMemoryHandRepository::new()));
//!     let created = manager
//!         .create_table(TableConfig::default(), false, None)
//!         .await
//!         .unwrap();
//!     let handle = manager.get_table(&created.table_id).await.unwrap();
//!     let snapshot = handle.snapshot().await.unwrap();
//!     println!("{} seats", snapshot.players.len());
//! }
//! ```

pub mod access;
pub mod actor;
pub mod clock;
pub mod config;
pub mod errors;
pub mod manager;
pub mod messages;
pub mod sessions;

/// Short hex identifier of a table.
pub type TableId = String;

pub use access::{AccessPolicy, Admission};
pub use actor::{TableActor, TableHandle};
pub use config::TableConfig;
pub use errors::TableError;
pub use manager::{CreatedTable, TableManager};
pub use messages::{TableMessage, TableSummary};
pub use sessions::SessionRegistry;
