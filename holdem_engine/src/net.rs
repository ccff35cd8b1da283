//! Wire protocol shared by the table actor and any transport.
//!
//! Messages are JSON objects discriminated by a `type` field with camelCase
//! field names.

/// Client and server message types.
pub mod messages;

pub use messages::{ActionKind, ClientMessage, ConnectionId, ServerMessage};
