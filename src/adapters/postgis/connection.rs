//! Postgres connection pool management.

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::domain::models::DatabaseConfig;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to create pool: {0}")]
    PoolCreationFailed(#[source] sqlx::Error),
    #[error("Invalid database URL")]
    InvalidDatabaseUrl,
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),
    #[error("PostGIS extension is not installed")]
    PostgisMissing,
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&DatabaseConfig> for PoolConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            acquire_timeout: Duration::from_secs(config.acquire_timeout_secs),
            ..Self::default()
        }
    }
}

/// Open a lazily-connecting pool. Nothing touches the network until the
/// first query, so a bad host surfaces as a query error inside the job.
pub fn create_pool(database_url: &str, config: Option<PoolConfig>) -> Result<PgPool, ConnectionError> {
    let config = config.unwrap_or_default();

    // The URL may carry a password; keep it out of the error.
    let connect_options =
        PgConnectOptions::from_str(database_url).map_err(|_| ConnectionError::InvalidDatabaseUrl)?;

    Ok(PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_lazy_with(connect_options))
}

/// Check connectivity and that PostGIS is available.
pub async fn verify_connection(pool: &PgPool) -> Result<(), ConnectionError> {
    let version: Option<String> = sqlx::query_scalar(
        "SELECT extversion FROM pg_extension WHERE extname = 'postgis'",
    )
    .fetch_optional(pool)
    .await
    .map_err(ConnectionError::ConnectionFailed)?;

    version.map(|_| ()).ok_or(ConnectionError::PostgisMissing)
}
