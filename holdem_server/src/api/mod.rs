//! HTTP/WebSocket API for the table server.
//!
//! # Architecture
//!
//! The API is built with:
//! - **Axum**: Async web framework for HTTP/WebSocket
//! - **Tower**: CORS middleware
//! - **Actor Model**: Table state managed by dedicated actor tasks
//!
//! # Modules
//!
//! - [`tables`]: Table creation, lobby listing, snapshots
//! - [`hands`]: Hand history and the evaluator self-check
//! - [`websocket`]: Real-time bidirectional play
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                          - Health check
//! GET  /ws/{table_id}                   - WebSocket connection to a table
//! POST /api/v1/tables                   - Create a table
//! GET  /api/v1/tables                   - List tables
//! GET  /api/v1/tables/{table_id}        - Public snapshot of a table
//! GET  /api/v1/hands?tableId=&limit=    - Recent finished hands
//! GET  /api/v1/selfcheck                - Evaluator fixture results
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use holdem_engine::{db::InMemoryHandRepository, table::{TableConfig, TableManager}};
//! use holdem_server::api::{create_router, AppState};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let hands = Arc::new(InMemoryHandRepository::new());
//! let state = AppState::new(Arc::new(TableManager::new(hands.clone())), hands, TableConfig::default());
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod hands;
pub mod tables;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Json},
    routing::get,
};
use holdem_engine::{
    db::{Database, HandRepository},
    table::{TableConfig, TableManager},
};
use log::warn;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers and WebSocket connections.
///
/// This state is cloned for each request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    /// Spawns table actors and hands out their handles
    pub table_manager: Arc<TableManager>,
    /// Where finished hands are read back from
    pub hands: Arc<dyn HandRepository>,
    /// Settings for tables created over HTTP
    pub table_defaults: TableConfig,
    /// Public WebSocket base for `wsUrl`
    pub ws_base: Option<String>,
    /// Allowed CORS origin; permissive when unset
    pub cors_origin: Option<String>,
    /// Present when hand history lives in Postgres
    pub database: Option<Database>,
}

impl AppState {
    pub fn new(
        table_manager: Arc<TableManager>,
        hands: Arc<dyn HandRepository>,
        table_defaults: TableConfig,
    ) -> Self {
        Self {
            table_manager,
            hands,
            table_defaults,
            ws_base: None,
            cors_origin: None,
            database: None,
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            ok: false,
            error: error.into(),
        }),
    )
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.cors_origin.as_deref());

    // API v1 routes (versioned for future evolution)
    let v1_routes = Router::new()
        .route(
            "/tables",
            get(tables::list_tables).post(tables::create_table),
        )
        .route("/tables/{table_id}", get(tables::get_table))
        .route("/hands", get(hands::recent_hands))
        .route("/selfcheck", get(hands::selfcheck));

    Router::new()
        .route("/health", get(health_check))
        .route("/ws/{table_id}", get(websocket::websocket_handler))
        .nest("/api/v1", v1_routes)
        .layer(cors)
        .with_state(state)
}

/// CORS for `origin`, or any origin when unset.
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let Some(origin) = origin else {
        return CorsLayer::permissive();
    };
    match HeaderValue::from_str(origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        Err(e) => {
            warn!("Ignoring invalid CORS_ORIGIN {origin:?}: {e}");
            CorsLayer::permissive()
        }
    }
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when healthy, or `503 Service Unavailable` when the
/// configured database doesn't answer.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match &state.database {
        Some(db) => Some(db.health_check().await.is_ok()),
        None => None,
    };
    let healthy = db_healthy.unwrap_or(true);
    let table_count = state.table_manager.table_count().await;

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "ok": healthy,
        "status": if healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "tables": table_count,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
