//! Storage interfaces used by the sync pipeline.
//!
//! Each trait is implemented by [`crate::PgStore`] and
//! [`crate::MemoryStore`] with the same semantics, so pipeline tests run
//! against memory and production runs against Postgres.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use concierge_core::{CacheEntry, CuratedHotelRecord, HotelEnrichment, SearchLog, SeedRun};
use uuid::Uuid;

use crate::DbError;

/// Raw key/TTL cache rows. Freshness is decided by the caller.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get_entry(&self, key: &str) -> Result<Option<CacheEntry>, DbError>;

    /// Replace the entry for `entry.key`. Last write wins.
    async fn put_entry(&self, entry: &CacheEntry) -> Result<(), DbError>;
}

/// How many rows an upsert created versus merged into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: u64,
    pub updated: u64,
}

impl UpsertSummary {
    #[must_use]
    pub fn total(self) -> u64 {
        self.inserted + self.updated
    }

    pub fn add(&mut self, other: UpsertSummary) {
        self.inserted += other.inserted;
        self.updated += other.updated;
    }
}

#[async_trait]
pub trait CuratedStore: Send + Sync {
    /// Merge `hotels` into the curated set keyed by `hotel_id`.
    ///
    /// Existing rows keep `seeded_at` and any enrichment field the incoming
    /// record leaves empty. Ids repeated within one call count once as
    /// inserted and then as updated.
    async fn upsert_hotels(&self, hotels: &[CuratedHotelRecord]) -> Result<UpsertSummary, DbError>;

    /// Merge detail fields into existing rows. Returns rows touched.
    async fn apply_enrichment(
        &self,
        details: &[HotelEnrichment],
        now: DateTime<Utc>,
    ) -> Result<u64, DbError>;

    /// The subset of `hotel_ids` that are stored without a hero image,
    /// ordered by id.
    async fn ids_missing_hero_image(&self, hotel_ids: &[String]) -> Result<Vec<String>, DbError>;

    /// Keyset page ordered by `hotel_id`, starting after `after`.
    async fn list_hotels(
        &self,
        limit: u32,
        after: Option<&str>,
    ) -> Result<Vec<CuratedHotelRecord>, DbError>;

    async fn count_hotels(&self) -> Result<u64, DbError>;
}

#[async_trait]
pub trait RunStore: Send + Sync {
    async fn insert_run(&self, run: &SeedRun) -> Result<(), DbError>;

    /// Overwrite the stored run with `run`.
    ///
    /// # Errors
    ///
    /// [`DbError::NotFound`] if the run was never inserted.
    async fn save_run(&self, run: &SeedRun) -> Result<(), DbError>;

    async fn get_run(&self, run_id: Uuid) -> Result<Option<SeedRun>, DbError>;

    /// Most recently created `queued`/`running` run.
    async fn latest_active_run(&self) -> Result<Option<SeedRun>, DbError>;

    /// Newest first.
    async fn list_runs(&self, limit: u32) -> Result<Vec<SeedRun>, DbError>;
}

#[async_trait]
pub trait SearchLogStore: Send + Sync {
    async fn insert_search_log(&self, log: &SearchLog) -> Result<(), DbError>;
}

/// Named leases with an expiry, used as a cross-process mutex with cooldown.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Take `name` for `holder` until `now + ttl`.
    ///
    /// Succeeds only when no lease exists or the existing one has expired
    /// at `now`. The check and the write are one atomic step.
    async fn try_acquire_lease(
        &self,
        name: &str,
        holder: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<bool, DbError>;

    /// Drop the lease if `holder` still owns it.
    async fn release_lease(&self, name: &str, holder: &str) -> Result<(), DbError>;
}
