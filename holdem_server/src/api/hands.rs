//! Hand history and evaluator self-check handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use holdem_engine::{
    db::{DEFAULT_HISTORY_LIMIT, HandRecord, MAX_HISTORY_LIMIT},
    functional::{self, FixtureResult},
};
use log::error;
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState, api_error};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandsQuery {
    pub table_id: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct HandsResponse {
    pub ok: bool,
    pub hands: Vec<HandRecord>,
}

#[derive(Debug, Serialize)]
pub struct SelfcheckResponse {
    pub ok: bool,
    pub cases: Vec<FixtureResult>,
}

/// Most recent finished hands of one table, newest first.
///
/// `limit` defaults to 20 and is capped at 100.
///
/// # Errors
///
/// - `400 Bad Request`: `tableId` missing
/// - `500 Internal Server Error`: History store unavailable
pub async fn recent_hands(
    State(state): State<AppState>,
    Query(query): Query<HandsQuery>,
) -> Result<Json<HandsResponse>, ApiError> {
    let Some(table_id) = query.table_id.filter(|id| !id.is_empty()) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "tableId required"));
    };
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);

    let hands = state
        .hands
        .recent_hands(&table_id, limit)
        .await
        .map_err(|e| {
            error!("Failed to load hands for table {table_id}: {e}");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "history unavailable")
        })?;

    Ok(Json(HandsResponse { ok: true, hands }))
}

/// Evaluate the canonical fixture hands.
pub async fn selfcheck() -> Json<SelfcheckResponse> {
    let cases = functional::fixtures();
    let ok = cases.iter().all(|c| c.ok);
    Json(SelfcheckResponse { ok, cases })
}
