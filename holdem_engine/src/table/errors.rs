//! Table error types.

use thiserror::Error;

use super::TableId;

/// Table lifecycle errors
#[derive(Debug, Error)]
pub enum TableError {
    /// Configuration rejected by `TableConfig::validate`
    #[error("Invalid table config: {0}")]
    InvalidConfig(String),

    /// No table with this id
    #[error("Table {0} not found")]
    NotFound(TableId),

    /// The table actor has stopped
    #[error("Table {0} is closed")]
    Closed(TableId),

    /// Password hashing failed while creating a private table
    #[error("Failed to hash table password: {0}")]
    PasswordHash(String),
}
