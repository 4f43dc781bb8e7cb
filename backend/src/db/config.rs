//! Postgres connection settings and environment variable handling.

use std::env;

/// Bound parameters per inserted satellite row (`scenario_id` plus eleven fields).
pub const SATELLITE_BINDS_PER_ROW: usize = 12;

/// Largest multi-row insert that fits the 65535 parameter limit of the
/// Postgres wire protocol.
pub const MAX_BULK_INSERT_ROWS: usize = u16::MAX as usize / SATELLITE_BINDS_PER_ROW;

/// Default number of satellite rows sent in one multi-row insert.
pub const DEFAULT_BULK_INSERT_ROWS: usize = 5000;

/// Clamp a configured chunk size to `1..=MAX_BULK_INSERT_ROWS`.
pub fn clamp_bulk_insert_rows(rows: usize) -> usize {
    rows.clamp(1, MAX_BULK_INSERT_ROWS)
}

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Rows per multi-row satellite insert during ingestion
    pub bulk_insert_chunk_rows: usize,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            bulk_insert_chunk_rows: DEFAULT_BULK_INSERT_ROWS,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
    /// - `PG_POOL_MAX`: Maximum pool size (default: 10)
    /// - `PG_POOL_MIN`: Minimum pool size (default: 1)
    /// - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
    /// - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
    /// - `PG_BULK_INSERT_ROWS`: Rows per multi-row insert (default: 5000, at most 5461)
    ///
    /// Unparseable optional values fall back to their defaults.
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL")
            .or_else(|_| env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let defaults = Self::default();
        let bulk_insert_chunk_rows = clamp_bulk_insert_rows(env_or(
            "PG_BULK_INSERT_ROWS",
            defaults.bulk_insert_chunk_rows,
        ));

        Ok(Self {
            database_url,
            max_pool_size: env_or("PG_POOL_MAX", defaults.max_pool_size),
            min_pool_size: env_or("PG_POOL_MIN", defaults.min_pool_size),
            connection_timeout_sec: env_or("PG_CONN_TIMEOUT_SEC", defaults.connection_timeout_sec),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", defaults.idle_timeout_sec),
            bulk_insert_chunk_rows,
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}
