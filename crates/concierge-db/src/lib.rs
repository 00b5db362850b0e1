use std::sync::Arc;
use std::time::Duration;

use concierge_core::AppConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

pub mod memory;
pub mod pg;
pub mod stores;

pub use memory::MemoryStore;
pub use pg::PgStore;
pub use stores::{CacheStore, CuratedStore, LeaseStore, RunStore, SearchLogStore, UpsertSummary};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/concierge-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    /// A stored value could not be mapped back onto a domain type.
    #[error("corrupt {column} value: {value}")]
    Corrupt { column: &'static str, value: String },
    #[error("failed to encode {context}: {source}")]
    Encode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    // The _sqlx_migrations table may not exist yet on a fresh database.
    let applied_before: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    MIGRATOR.run(pool).await?;

    let applied_after: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    let delta = (applied_after - applied_before).max(0);
    Ok(usize::try_from(delta).unwrap_or(0))
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Every store the pipeline needs, behind trait objects so callers can run
/// against Postgres or the in-memory implementation.
#[derive(Clone)]
pub struct Stores {
    pub cache: Arc<dyn CacheStore>,
    pub curated: Arc<dyn CuratedStore>,
    pub runs: Arc<dyn RunStore>,
    pub search_logs: Arc<dyn SearchLogStore>,
    pub leases: Arc<dyn LeaseStore>,
}

impl Stores {
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self::from_shared(Arc::new(PgStore::new(pool)))
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_shared(Arc::new(MemoryStore::new()))
    }

    /// Use one value for every store.
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: CacheStore + CuratedStore + RunStore + SearchLogStore + LeaseStore + 'static,
    {
        Self {
            cache: store.clone(),
            curated: store.clone(),
            runs: store.clone(),
            search_logs: store.clone(),
            leases: store,
        }
    }
}
