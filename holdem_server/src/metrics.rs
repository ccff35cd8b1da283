//! Prometheus metrics for monitoring table and connection health.
//!
//! Metrics are exposed in Prometheus text format on a separate listener
//! (`METRICS_BIND`) for scraping by monitoring systems.
//!
//! # Metrics Categories
//!
//! - **WebSocket Metrics**: Connections opened, active, messages received, bad messages
//! - **Game Metrics**: Tables created, hands played, pot sizes
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use async_trait::async_trait;
use holdem_engine::db::{HandRecord, HandRepository, HistoryResult};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::{net::SocketAddr, sync::Arc, time::Instant};

use crate::logging;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

/// A WebSocket connection was accepted.
pub fn websocket_connection_opened() {
    metrics::counter!("websocket_connections_total").increment(1);
    metrics::gauge!("websocket_connections_active").increment(1.0);
}

/// A WebSocket connection closed.
pub fn websocket_connection_closed() {
    metrics::gauge!("websocket_connections_active").decrement(1.0);
}

/// Increment WebSocket messages received counter.
pub fn websocket_messages_received() {
    metrics::counter!("websocket_messages_received").increment(1);
}

/// A frame that didn't parse as a client message.
pub fn bad_messages_total() {
    metrics::counter!("bad_messages_total").increment(1);
}

// ============================================================================
// Game Metrics
// ============================================================================

/// Increment tables created counter.
pub fn tables_created_total(is_private: bool) {
    metrics::counter!("tables_created_total",
        "private" => is_private.to_string()
    )
    .increment(1);
}

/// Increment hands played counter.
pub fn hands_played_total() {
    metrics::counter!("hands_played_total").increment(1);
}

/// Record pot size distribution.
pub fn pot_size_chips(size: u32) {
    metrics::histogram!("pot_size_chips").record(f64::from(size));
}

/// Hand repository that records game metrics for every stored hand.
pub struct MeteredHandRepository {
    inner: Arc<dyn HandRepository>,
}

impl MeteredHandRepository {
    pub fn new(inner: Arc<dyn HandRepository>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl HandRepository for MeteredHandRepository {
    async fn record_hand(&self, record: &HandRecord) -> HistoryResult<()> {
        hands_played_total();
        pot_size_chips(record.pot);

        let start = Instant::now();
        let result = self.inner.record_hand(record).await;
        let elapsed = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        logging::log_performance("record_hand", elapsed, Some(&record.table_id));
        result
    }

    async fn recent_hands(&self, table_id: &str, limit: usize) -> HistoryResult<Vec<HandRecord>> {
        self.inner.recent_hands(table_id, limit).await
    }
}
