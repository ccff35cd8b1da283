//! Table manager for spawning and managing multiple table actors.

use log::{info, warn};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    TableId,
    access::AccessPolicy,
    actor::{TableActor, TableHandle},
    config::TableConfig,
    errors::TableError,
    messages::TableSummary,
};
use crate::db::HandRepository;

/// Length of generated table ids (hex characters).
pub const TABLE_ID_LEN: usize = 8;

/// Result of creating a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTable {
    pub table_id: TableId,
    pub is_private: bool,
    /// Shareable token; only private tables get one
    pub invite_token: Option<String>,
}

/// Table manager for managing multiple table instances
pub struct TableManager {
    /// Where every table's finished hands go
    hands: Arc<dyn HandRepository>,

    /// Active table handles
    tables: Arc<RwLock<HashMap<TableId, TableHandle>>>,
}

impl TableManager {
    /// Create a new table manager
    pub fn new(hands: Arc<dyn HandRepository>) -> Self {
        Self {
            hands,
            tables: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create and spawn a new table
    ///
    /// A private table is guarded by `password` (when given) and by the
    /// invite token returned in [`CreatedTable`].
    pub async fn create_table(
        &self,
        config: TableConfig,
        is_private: bool,
        password: Option<&str>,
    ) -> Result<CreatedTable, TableError> {
        config.validate()?;

        let (policy, invite_token) = if is_private {
            let (policy, token) = AccessPolicy::private(password)?;
            (policy, Some(token))
        } else {
            (AccessPolicy::public(), None)
        };

        let mut tables = self.tables.write().await;
        let table_id = loop {
            let id = generate_table_id();
            if !tables.contains_key(&id) {
                break id;
            }
        };

        let (actor, handle) =
            TableActor::new(table_id.clone(), config, policy, Arc::clone(&self.hands));
        tables.insert(table_id.clone(), handle);
        drop(tables);

        tokio::spawn(actor.run());

        info!("Created and spawned table {table_id} (private: {is_private})");
        Ok(CreatedTable {
            table_id,
            is_private,
            invite_token,
        })
    }

    /// Get a table handle by ID
    pub async fn get_table(&self, table_id: &str) -> Option<TableHandle> {
        let tables = self.tables.read().await;
        tables.get(table_id).cloned()
    }

    /// Summaries of every live table, sorted by id
    pub async fn list_tables(&self) -> Vec<TableSummary> {
        let handles: Vec<TableHandle> = self.tables.read().await.values().cloned().collect();

        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.summary().await {
                Ok(summary) => summaries.push(summary),
                Err(e) => warn!("Skipping table in listing: {e}"),
            }
        }
        summaries.sort_by(|a, b| a.table_id.cmp(&b.table_id));
        summaries
    }

    /// Stop a table and forget it
    pub async fn close_table(&self, table_id: &str) -> Result<(), TableError> {
        let handle = self
            .tables
            .write()
            .await
            .remove(table_id)
            .ok_or_else(|| TableError::NotFound(table_id.to_string()))?;

        // An actor that already stopped is as good as closed.
        if let Err(e) = handle.close().await {
            warn!("Closing table {table_id}: {e}");
        }
        info!("Closed table {table_id}");
        Ok(())
    }

    /// Number of tables
    pub async fn table_count(&self) -> usize {
        self.tables.read().await.len()
    }
}

fn generate_table_id() -> TableId {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(TABLE_ID_LEN);
    id
}
