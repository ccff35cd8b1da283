//! Database query timeout helpers
//!
//! Keeps a slow store from holding persistence tasks forever.

use std::time::Duration;
use tokio::time::timeout;

use super::repository::HistoryError;

/// Default timeout for database queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Execute a query with timeout
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> Result<T, HistoryError>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(HistoryError::Database(e)),
        Err(_) => Err(HistoryError::Timeout(duration)),
    }
}

/// Execute a query with the default timeout
pub async fn with_default_timeout<F, T>(future: F) -> Result<T, HistoryError>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}
