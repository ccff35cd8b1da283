//! Multi-table hold'em server using the async actor model.
//!
//! Every table runs in its own actor spawned by the `TableManager`; this
//! binary loads configuration, picks a hand-history store and serves the
//! HTTP/WebSocket API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use ctrlc::set_handler;
use holdem_engine::{
    db::{Database, HandRepository, InMemoryHandRepository},
    table::TableManager,
};
use holdem_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging,
    metrics::{self, MeteredHandRepository},
};
use log::{error, info, warn};
use pico_args::Arguments;

const HELP: &str = "\
Run a multi-table Texas Hold'em server

USAGE:
  holdem_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --db-url     URL         Hand-history database       [default: env DATABASE_URL, in memory when unset]
  --tables     N           Number of tables to create  [default: env MAX_TABLES or 1]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  TABLE_SMALL_BLIND        Small blind for new tables
  TABLE_BIG_BLIND          Big blind for new tables
  TABLE_STARTING_STACK     Chips given to each new seat
  TABLE_MAX_SEATS          Seats per table (2-23)
  TURN_TIMEOUT_SECS        Seconds before the clock acts for a seat
  NEXT_HAND_DELAY_SECS     Pause between hands, or \"off\"
  WS_BASE                  Public WebSocket base for wsUrl (e.g., wss://poker.example)
  CORS_ORIGIN              Allowed browser origin  [default: any]
  METRICS_BIND             Prometheus listener (e.g., 127.0.0.1:9000)
  RUST_LOG                 Log filter  [default: info]
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    num_tables: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        num_tables: pargs.opt_value_from_str("--tables")?,
    };

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url, args.num_tables)?;
    config.validate()?;
    info!("Starting multi-table hold'em server at {}", config.bind);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr)
            .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter on {addr}: {e}"))?;
        info!("Prometheus metrics on http://{addr}/metrics");
    }

    // Hand history: Postgres when configured, memory otherwise
    let (database, store): (Option<Database>, Arc<dyn HandRepository>) = match &config.database {
        Some(db_config) => {
            info!("Connecting to database");
            let db = Database::new(db_config)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {e}"))?;
            let repo = db
                .hand_repository()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to prepare hand history: {e}"))?;
            info!("Database connected successfully");
            let repo: Arc<dyn HandRepository> = Arc::new(repo);
            (Some(db), repo)
        }
        None => {
            warn!("DATABASE_URL not set; hand history is kept in memory");
            let repo: Arc<dyn HandRepository> = Arc::new(InMemoryHandRepository::new());
            (None, repo)
        }
    };
    let hands: Arc<dyn HandRepository> = Arc::new(MeteredHandRepository::new(store));

    let table_manager = Arc::new(TableManager::new(hands.clone()));

    info!("Creating {} initial table(s)...", config.num_tables);
    for i in 0..config.num_tables {
        match table_manager
            .create_table(config.table_defaults.clone(), false, None)
            .await
        {
            Ok(created) => {
                metrics::tables_created_total(false);
                info!("Created table {} with ID {}", i + 1, created.table_id);
            }
            Err(e) => {
                error!("Failed to create table {}: {e}", i + 1);
            }
        }
    }

    let tables = table_manager.list_tables().await;
    info!("Server ready with {} active table(s)", tables.len());
    for table in &tables {
        info!(
            "  - {} - {}/{} seated, blinds: {}/{}{}",
            table.table_id,
            table.seated,
            table.max_seats,
            table.small_blind,
            table.big_blind,
            config
                .ws_url(&table.table_id)
                .map(|url| format!(", {url}"))
                .unwrap_or_default()
        );
    }

    // Create API state
    let api_state = AppState {
        ws_base: config.ws_base.clone(),
        cors_origin: config.cors_origin.clone(),
        database,
        ..AppState::new(table_manager, hands, config.table_defaults.clone())
    };

    // Create router
    let app = api::create_router(api_state);

    // Start HTTP server
    info!("Starting HTTP/WebSocket server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {e}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {e}"))?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for CTRL+C: {e}");
        std::future::pending::<()>().await;
    }
}
