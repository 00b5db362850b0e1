//! Postgres implementations of the store traits.

mod cache;
mod curated;
mod leases;
mod runs;
mod search_logs;

use sqlx::PgPool;

pub use runs::SeedRunRow;

/// Postgres-backed store. Cheap to clone; the pool is shared.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Counters are `BIGINT`; values past `i64::MAX` saturate.
pub(crate) fn to_db_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Negative counters (never written by this crate) read back as zero.
pub(crate) fn from_db_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
