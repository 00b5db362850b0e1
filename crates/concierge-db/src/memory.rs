//! In-process store with the same semantics as [`crate::PgStore`].
//!
//! Used by tests and by the CLI's `--in-memory` mode. State lives behind a
//! single mutex that is never held across an await point.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use concierge_core::{CacheEntry, CuratedHotelRecord, HotelEnrichment, SearchLog, SeedRun};
use uuid::Uuid;

use crate::stores::{
    CacheStore, CuratedStore, LeaseStore, RunStore, SearchLogStore, UpsertSummary,
};
use crate::DbError;

#[derive(Debug, Default)]
struct State {
    cache: HashMap<String, CacheEntry>,
    hotels: BTreeMap<String, CuratedHotelRecord>,
    runs: HashMap<Uuid, SeedRun>,
    search_logs: Vec<SearchLog>,
    leases: HashMap<String, (String, DateTime<Utc>)>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Poisoning is ignored; a panicking test must not wedge the others.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Snapshot of recorded search logs, oldest first.
    #[must_use]
    pub fn search_logs(&self) -> Vec<SearchLog> {
        self.lock().search_logs.clone()
    }

    /// Snapshot of one curated hotel.
    #[must_use]
    pub fn hotel(&self, hotel_id: &str) -> Option<CuratedHotelRecord> {
        self.lock().hotels.get(hotel_id).cloned()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get_entry(&self, key: &str) -> Result<Option<CacheEntry>, DbError> {
        Ok(self.lock().cache.get(key).cloned())
    }

    async fn put_entry(&self, entry: &CacheEntry) -> Result<(), DbError> {
        self.lock().cache.insert(entry.key.clone(), entry.clone());
        Ok(())
    }
}

#[async_trait]
impl CuratedStore for MemoryStore {
    async fn upsert_hotels(&self, hotels: &[CuratedHotelRecord]) -> Result<UpsertSummary, DbError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let mut summary = UpsertSummary::default();
        for incoming in hotels {
            match state.hotels.get_mut(&incoming.hotel_id) {
                Some(existing) => {
                    let seeded_at = existing.seeded_at;
                    let hero_image = incoming.hero_image.clone().or(existing.hero_image.take());
                    let description = incoming.description.clone().or(existing.description.take());
                    let facility_count = incoming.facility_count.or(existing.facility_count);
                    *existing = CuratedHotelRecord {
                        hero_image,
                        description,
                        facility_count,
                        seeded_at,
                        ..incoming.clone()
                    };
                    summary.updated += 1;
                }
                None => {
                    state
                        .hotels
                        .insert(incoming.hotel_id.clone(), incoming.clone());
                    summary.inserted += 1;
                }
            }
        }
        Ok(summary)
    }

    async fn apply_enrichment(
        &self,
        details: &[HotelEnrichment],
        now: DateTime<Utc>,
    ) -> Result<u64, DbError> {
        let mut state = self.lock();
        let mut touched = 0;
        for detail in details.iter().filter(|d| !d.is_empty()) {
            if let Some(hotel) = state.hotels.get_mut(&detail.hotel_id) {
                if detail.hero_image.is_some() {
                    hotel.hero_image.clone_from(&detail.hero_image);
                }
                if detail.description.is_some() {
                    hotel.description.clone_from(&detail.description);
                }
                if detail.facility_count.is_some() {
                    hotel.facility_count = detail.facility_count;
                }
                hotel.updated_at = now;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn ids_missing_hero_image(&self, hotel_ids: &[String]) -> Result<Vec<String>, DbError> {
        let state = self.lock();
        let mut ids: Vec<String> = hotel_ids
            .iter()
            .filter(|id| {
                state
                    .hotels
                    .get(id.as_str())
                    .is_some_and(|h| h.hero_image.as_deref().is_none_or(str::is_empty))
            })
            .cloned()
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn list_hotels(
        &self,
        limit: u32,
        after: Option<&str>,
    ) -> Result<Vec<CuratedHotelRecord>, DbError> {
        let state = self.lock();
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let page = match after {
            Some(cursor) => state
                .hotels
                .range::<str, _>((
                    std::ops::Bound::Excluded(cursor),
                    std::ops::Bound::Unbounded,
                ))
                .take(limit)
                .map(|(_, h)| h.clone())
                .collect(),
            None => state.hotels.values().take(limit).cloned().collect(),
        };
        Ok(page)
    }

    async fn count_hotels(&self) -> Result<u64, DbError> {
        Ok(self.lock().hotels.len() as u64)
    }
}

#[async_trait]
impl RunStore for MemoryStore {
    async fn insert_run(&self, run: &SeedRun) -> Result<(), DbError> {
        self.lock().runs.insert(run.run_id, run.clone());
        Ok(())
    }

    async fn save_run(&self, run: &SeedRun) -> Result<(), DbError> {
        let mut state = self.lock();
        let slot = state.runs.get_mut(&run.run_id).ok_or(DbError::NotFound)?;
        *slot = run.clone();
        Ok(())
    }

    async fn get_run(&self, run_id: Uuid) -> Result<Option<SeedRun>, DbError> {
        Ok(self.lock().runs.get(&run_id).cloned())
    }

    async fn latest_active_run(&self) -> Result<Option<SeedRun>, DbError> {
        Ok(self
            .lock()
            .runs
            .values()
            .filter(|r| r.is_active())
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn list_runs(&self, limit: u32) -> Result<Vec<SeedRun>, DbError> {
        let state = self.lock();
        let mut runs: Vec<SeedRun> = state.runs.values().cloned().collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        runs.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(runs)
    }
}

#[async_trait]
impl SearchLogStore for MemoryStore {
    async fn insert_search_log(&self, log: &SearchLog) -> Result<(), DbError> {
        self.lock().search_logs.push(log.clone());
        Ok(())
    }
}

#[async_trait]
impl LeaseStore for MemoryStore {
    async fn try_acquire_lease(
        &self,
        name: &str,
        holder: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<bool, DbError> {
        let mut state = self.lock();
        if let Some((_, expires_at)) = state.leases.get(name) {
            if *expires_at > now {
                return Ok(false);
            }
        }
        state
            .leases
            .insert(name.to_string(), (holder.to_string(), now + ttl));
        Ok(true)
    }

    async fn release_lease(&self, name: &str, holder: &str) -> Result<(), DbError> {
        let mut state = self.lock();
        if state.leases.get(name).is_some_and(|(h, _)| h == holder) {
            state.leases.remove(name);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
