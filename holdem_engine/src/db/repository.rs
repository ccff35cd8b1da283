//! Hand-history repository.
//!
//! Finished hands are handed to a [`HandRepository`] by the table actor.
//! [`PgHandRepository`] writes them to Postgres; [`InMemoryHandRepository`]
//! keeps them in process for tests and database-less runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::{
    collections::{HashMap, VecDeque},
    time::Duration,
};
use thiserror::Error;
use tokio::sync::RwLock;

use super::timeouts::with_default_timeout;
use crate::game::{
    entities::{Chips, HandOutcome, Winner},
    views::CardView,
};

/// Default number of hands returned by a history query.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Largest number of hands a history query returns.
pub const MAX_HISTORY_LIMIT: usize = 100;

/// Hand-history errors
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),
}

pub type HistoryResult<T> = Result<T, HistoryError>;

/// Persisted summary of one finished hand.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandRecord {
    pub table_id: String,
    pub hand_id: u64,
    pub completed_at: DateTime<Utc>,
    pub pot: Chips,
    pub community_cards: Vec<CardView>,
    pub winners: Vec<Winner>,
}

impl HandRecord {
    pub fn from_outcome(table_id: &str, outcome: &HandOutcome, completed_at: DateTime<Utc>) -> Self {
        Self {
            table_id: table_id.to_string(),
            hand_id: outcome.hand_id,
            completed_at,
            pot: outcome.pot,
            community_cards: outcome.community.iter().map(CardView::from).collect(),
            winners: outcome.winners.clone(),
        }
    }
}

/// Storage for finished hands.
#[async_trait]
pub trait HandRepository: Send + Sync {
    /// Persist one finished hand
    async fn record_hand(&self, record: &HandRecord) -> HistoryResult<()>;

    /// Most recent hands for a table, newest first, at most
    /// [`MAX_HISTORY_LIMIT`]
    async fn recent_hands(&self, table_id: &str, limit: usize) -> HistoryResult<Vec<HandRecord>>;
}

/// PostgreSQL implementation
pub struct PgHandRepository {
    pool: PgPool,
}

impl PgHandRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `hands` table if it doesn't exist yet.
    pub async fn ensure_schema(&self) -> HistoryResult<()> {
        with_default_timeout(
            sqlx::query(
                "CREATE TABLE IF NOT EXISTS hands (
                    id BIGSERIAL PRIMARY KEY,
                    table_id TEXT NOT NULL,
                    hand_id BIGINT NOT NULL,
                    completed_at TIMESTAMPTZ NOT NULL,
                    pot BIGINT NOT NULL,
                    community_cards TEXT NOT NULL,
                    winners TEXT NOT NULL
                )",
            )
            .execute(&self.pool),
        )
        .await?;
        with_default_timeout(
            sqlx::query(
                "CREATE INDEX IF NOT EXISTS hands_table_id_idx ON hands (table_id, id DESC)",
            )
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl HandRepository for PgHandRepository {
    async fn record_hand(&self, record: &HandRecord) -> HistoryResult<()> {
        let community = serde_json::to_string(&record.community_cards)?;
        let winners = serde_json::to_string(&record.winners)?;
        with_default_timeout(
            sqlx::query(
                "INSERT INTO hands (table_id, hand_id, completed_at, pot, community_cards, winners)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(&record.table_id)
            .bind(i64::try_from(record.hand_id).unwrap_or(i64::MAX))
            .bind(record.completed_at)
            .bind(i64::from(record.pot))
            .bind(community)
            .bind(winners)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn recent_hands(&self, table_id: &str, limit: usize) -> HistoryResult<Vec<HandRecord>> {
        let limit = limit.min(MAX_HISTORY_LIMIT) as i64;
        let rows = with_default_timeout(
            sqlx::query(
                "SELECT table_id, hand_id, completed_at, pot, community_cards, winners
                 FROM hands WHERE table_id = $1 ORDER BY id DESC LIMIT $2",
            )
            .bind(table_id)
            .bind(limit)
            .fetch_all(&self.pool),
        )
        .await?;

        rows.into_iter()
            .map(|r| -> HistoryResult<HandRecord> {
                Ok(HandRecord {
                    table_id: r.try_get("table_id")?,
                    hand_id: u64::try_from(r.try_get::<i64, _>("hand_id")?).unwrap_or_default(),
                    completed_at: r.try_get("completed_at")?,
                    pot: Chips::try_from(r.try_get::<i64, _>("pot")?).unwrap_or_default(),
                    community_cards: serde_json::from_str(&r.try_get::<String, _>("community_cards")?)?,
                    winners: serde_json::from_str(&r.try_get::<String, _>("winners")?)?,
                })
            })
            .collect()
    }
}

/// In-process implementation. Keeps the newest [`MAX_HISTORY_LIMIT`]
/// hands of each table.
#[derive(Default)]
pub struct InMemoryHandRepository {
    hands: RwLock<HashMap<String, VecDeque<HandRecord>>>,
}

impl InMemoryHandRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.hands.read().await.values().map(VecDeque::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl HandRepository for InMemoryHandRepository {
    async fn record_hand(&self, record: &HandRecord) -> HistoryResult<()> {
        let mut hands = self.hands.write().await;
        let table = hands.entry(record.table_id.clone()).or_default();
        table.push_back(record.clone());
        while table.len() > MAX_HISTORY_LIMIT {
            table.pop_front();
        }
        Ok(())
    }

    async fn recent_hands(&self, table_id: &str, limit: usize) -> HistoryResult<Vec<HandRecord>> {
        let hands = self.hands.read().await;
        Ok(hands
            .get(table_id)
            .map(|table| {
                table
                    .iter()
                    .rev()
                    .take(limit.min(MAX_HISTORY_LIMIT))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default())
    }
}
