//! Hold'em game core: cards, hand evaluation, table state and betting.
//!
//! Everything here is synchronous and owned by a single table actor; see
//! [`crate::table`] for the task that drives it.

pub mod betting;
pub mod constants;
pub mod entities;
pub mod functional;
pub mod state_machine;
pub mod views;

pub use betting::ActionError;
pub use state_machine::{JoinError, StartError, TableState, Turn};
pub use views::{CardView, PublicSeatView, PublicTableView};
