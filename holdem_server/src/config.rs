//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use holdem_engine::{
    db::DatabaseConfig,
    table::{TableConfig, TableError},
};
use std::{net::SocketAddr, str::FromStr};

/// Default listen address
pub const DEFAULT_BIND: &str = "127.0.0.1:6969";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration; hand history stays in memory without one
    pub database: Option<DatabaseConfig>,
    /// Configuration for tables created at startup and over HTTP
    pub table_defaults: TableConfig,
    /// Number of public tables to create on startup
    pub num_tables: usize,
    /// Allowed CORS origin; any origin when unset
    pub cors_origin: Option<String>,
    /// Public WebSocket base used to build `wsUrl` in create responses
    pub ws_base: Option<String>,
    /// Prometheus scrape listener
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `num_tables_override` - Optional number of tables override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but can't be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        num_tables_override: Option<usize>,
    ) -> Result<Self, ConfigError> {
        Self::from_lookup(
            |key| std::env::var(key).ok(),
            bind_override,
            database_url_override,
            num_tables_override,
        )
    }

    /// Same as [`ServerConfig::from_env`] with variables read through `lookup`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        num_tables_override: Option<usize>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_var(&lookup, "SERVER_BIND")?.unwrap_or(default_bind()),
        };

        // Database configuration
        let database = database_url_override
            .or_else(|| lookup("DATABASE_URL"))
            .filter(|url| !url.trim().is_empty())
            .map(|database_url| -> Result<DatabaseConfig, ConfigError> {
                let defaults = DatabaseConfig::with_url(database_url);
                Ok(DatabaseConfig {
                    max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS")?
                        .unwrap_or(defaults.max_connections),
                    min_connections: parse_var(&lookup, "DB_MIN_CONNECTIONS")?
                        .unwrap_or(defaults.min_connections),
                    connection_timeout_secs: parse_var(&lookup, "DB_CONNECTION_TIMEOUT_SECS")?
                        .unwrap_or(defaults.connection_timeout_secs),
                    idle_timeout_secs: parse_var(&lookup, "DB_IDLE_TIMEOUT_SECS")?
                        .unwrap_or(defaults.idle_timeout_secs),
                    max_lifetime_secs: parse_var(&lookup, "DB_MAX_LIFETIME_SECS")?
                        .unwrap_or(defaults.max_lifetime_secs),
                    ..defaults
                })
            })
            .transpose()?;

        // Table defaults
        let defaults = TableConfig::default();
        let next_hand_delay_secs = match lookup("NEXT_HAND_DELAY_SECS") {
            None => defaults.next_hand_delay_secs,
            Some(v) if v.eq_ignore_ascii_case("off") => None,
            Some(v) => Some(v.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "NEXT_HAND_DELAY_SECS".to_string(),
                reason: format!("expected seconds or \"off\", got {v:?}"),
            })?),
        };
        let table_defaults = TableConfig {
            small_blind: parse_var(&lookup, "TABLE_SMALL_BLIND")?.unwrap_or(defaults.small_blind),
            big_blind: parse_var(&lookup, "TABLE_BIG_BLIND")?.unwrap_or(defaults.big_blind),
            starting_stack: parse_var(&lookup, "TABLE_STARTING_STACK")?
                .unwrap_or(defaults.starting_stack),
            max_seats: parse_var(&lookup, "TABLE_MAX_SEATS")?.unwrap_or(defaults.max_seats),
            turn_timeout_secs: parse_var(&lookup, "TURN_TIMEOUT_SECS")?
                .unwrap_or(defaults.turn_timeout_secs),
            next_hand_delay_secs,
            ..defaults
        };

        // Number of tables
        let num_tables = match num_tables_override {
            Some(n) => n,
            None => parse_var(&lookup, "MAX_TABLES")?.unwrap_or(1),
        };

        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(ServerConfig {
            bind,
            database,
            table_defaults,
            num_tables,
            cors_origin: non_empty("CORS_ORIGIN").filter(|v| v != "*"),
            ws_base: non_empty("WS_BASE").map(|v| v.trim_end_matches('/').to_string()),
            metrics_bind: parse_var(&lookup, "METRICS_BIND")?,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.table_defaults
            .validate()
            .map_err(|e| ConfigError::Invalid {
                var: "TABLE_*".to_string(),
                reason: match e {
                    TableError::InvalidConfig(reason) => reason,
                    other => other.to_string(),
                },
            })?;

        if self.table_defaults.turn_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "TURN_TIMEOUT_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if let Some(db) = &self.database
            && db.min_connections > db.max_connections
        {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!("Must not exceed DB_MAX_CONNECTIONS ({})", db.max_connections),
            });
        }

        Ok(())
    }

    /// Public WebSocket URL for a table, when a base is configured.
    pub fn ws_url(&self, table_id: &str) -> Option<String> {
        ws_url(self.ws_base.as_deref(), table_id)
    }
}

/// `{base}/ws/{table_id}` for a configured base.
pub fn ws_url(base: Option<&str>, table_id: &str) -> Option<String> {
    base.map(|base| format!("{}/ws/{table_id}", base.trim_end_matches('/')))
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6969))
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse a variable when present; a present but malformed value is an error.
fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|v| {
            v.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("{e} (got {v:?})"),
            })
        })
        .transpose()
}
