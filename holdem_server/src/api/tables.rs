//! Table management API handlers.
//!
//! - Creating public or private tables
//! - Listing all live tables with seat counts and blind levels
//! - Getting the public snapshot of a specific table
//!
//! Seating and play happen over the WebSocket, not here.
//!
//! # Examples
//!
//! Create a private table:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/tables \
//!   -H "Content-Type: application/json" \
//!   -d '{"isPrivate": true, "password": "hunter2"}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use holdem_engine::{
    game::PublicTableView,
    table::{TableConfig, TableError, TableSummary},
};
use log::{error, info};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState, api_error};
use crate::{config::ws_url, metrics};

/// Body of `POST /api/v1/tables`. Every field is optional; table settings
/// fall back to the server defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateTableRequest {
    pub is_private: bool,
    pub password: Option<String>,
    pub small_blind: Option<u32>,
    pub big_blind: Option<u32>,
    pub starting_stack: Option<u32>,
    pub max_seats: Option<usize>,
    pub turn_timeout_secs: Option<u64>,
}

impl CreateTableRequest {
    fn table_config(&self, defaults: &TableConfig) -> TableConfig {
        TableConfig {
            small_blind: self.small_blind.unwrap_or(defaults.small_blind),
            big_blind: self.big_blind.unwrap_or(defaults.big_blind),
            starting_stack: self.starting_stack.unwrap_or(defaults.starting_stack),
            max_seats: self.max_seats.unwrap_or(defaults.max_seats),
            turn_timeout_secs: self.turn_timeout_secs.unwrap_or(defaults.turn_timeout_secs),
            ..defaults.clone()
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableResponse {
    pub ok: bool,
    pub table_id: String,
    pub is_private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
}

/// Create a table.
///
/// A private table answers with an invite token; share it, or the password,
/// with the players who may sit down. An empty body creates a public table
/// with the server defaults.
///
/// # Response
///
/// Returns `201 Created`:
/// ```json
/// {
///   "ok": true,
///   "tableId": "3f9c2a1b",
///   "isPrivate": true,
///   "inviteToken": "b4e01c9d77a2f3e5",
///   "wsUrl": "wss://poker.example/ws/3f9c2a1b"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Table settings out of range
/// - `500 Internal Server Error`: Password hashing failed
pub async fn create_table(
    State(state): State<AppState>,
    body: Option<Json<CreateTableRequest>>,
) -> Result<(StatusCode, Json<CreateTableResponse>), ApiError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let config = request.table_config(&state.table_defaults);
    let password = request
        .password
        .as_deref()
        .filter(|p| request.is_private && !p.is_empty());

    let created = state
        .table_manager
        .create_table(config, request.is_private, password)
        .await
        .map_err(|e| match e {
            TableError::InvalidConfig(reason) => api_error(StatusCode::BAD_REQUEST, reason),
            other => {
                error!("Failed to create table: {other}");
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to create table")
            }
        })?;

    metrics::tables_created_total(created.is_private);
    info!(
        "Table {} created over HTTP (private: {})",
        created.table_id, created.is_private
    );

    let ws_url = ws_url(state.ws_base.as_deref(), &created.table_id);
    Ok((
        StatusCode::CREATED,
        Json(CreateTableResponse {
            ok: true,
            table_id: created.table_id,
            is_private: created.is_private,
            invite_token: created.invite_token,
            ws_url,
        }),
    ))
}

/// List all live tables.
///
/// # Response
///
/// Returns `200 OK` with an array of table summaries:
/// ```json
/// [
///   {
///     "tableId": "3f9c2a1b",
///     "isPrivate": false,
///     "seated": 4,
///     "maxSeats": 9,
///     "connections": 6,
///     "phase": "flop",
///     "handId": 12,
///     "smallBlind": 25,
///     "bigBlind": 50,
///     "pot": 300
///   }
/// ]
/// ```
pub async fn list_tables(State(state): State<AppState>) -> Json<Vec<TableSummary>> {
    Json(state.table_manager.list_tables().await)
}

/// Get the public snapshot of a table. Hole cards are never included.
///
/// # Errors
///
/// - `404 Not Found`: Table doesn't exist or has closed
pub async fn get_table(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
) -> Result<Json<PublicTableView>, ApiError> {
    let not_found = || api_error(StatusCode::NOT_FOUND, format!("table {table_id} not found"));

    let handle = state
        .table_manager
        .get_table(&table_id)
        .await
        .ok_or_else(not_found)?;
    let view = handle.snapshot().await.map_err(|_| not_found())?;
    Ok(Json(view))
}
