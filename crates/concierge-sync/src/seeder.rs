//! Curation seeding: buffered and streaming paths, both recorded on a
//! [`SeedRun`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concierge_core::{
    AppConfig, CatalogRecord, Clock, CuratedHotelRecord, CurationProfile, HotelEnrichment, SeedRun,
    SeedStage,
};
use concierge_db::{Stores, UpsertSummary};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::cache::{Cache, Freshness};
use crate::error::SyncError;
use crate::filter::filter_and_group;
use crate::ingest::{IngestObserver, IngestProgress, StoreSink, StreamIngestor, StreamOptions};
use crate::sampling::sample_groups;
use crate::vendor::HotelVendor;

pub const CATALOG_CACHE_KEY: &str = "vendor:catalog";
const DETAILS_CACHE_PREFIX: &str = "vendor:details:";
const WRITE_CHUNK: usize = 100;
const ENRICH_CHUNK: usize = 10;

pub const MODE_BUFFERED: &str = "buffered";
pub const MODE_STREAMING: &str = "streaming";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSettings {
    pub catalog_ttl_hours: u32,
    pub details_ttl_hours: u32,
    /// Wall-clock budget for the buffered path.
    pub budget_ms: u64,
    /// Hard limit for the streaming path.
    pub hard_timeout_ms: u64,
}

impl SeedSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            catalog_ttl_hours: config.catalog_cache_ttl_hours,
            details_ttl_hours: config.details_cache_ttl_hours,
            budget_ms: config.seed_budget_ms,
            hard_timeout_ms: config.seed_hard_timeout_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedOptions {
    /// Skip the fresh-cache read of the catalog.
    pub bypass_cache: bool,
    pub enrich_details: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedMode {
    Buffered(SeedOptions),
    Streaming,
}

impl SeedMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SeedMode::Buffered(_) => MODE_BUFFERED,
            SeedMode::Streaming => MODE_STREAMING,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeedReport {
    pub run_id: Uuid,
    pub seeded: u64,
    pub inserted: u64,
    pub updated: u64,
    pub per_group_counts: BTreeMap<String, u64>,
    pub enriched: u64,
    pub aborted_early: bool,
}

impl SeedReport {
    fn from_run(run: &SeedRun, enriched: u64) -> Self {
        Self {
            run_id: run.run_id,
            seeded: run.seeded_count,
            inserted: run.inserted_count,
            updated: run.updated_count,
            per_group_counts: run.per_group_counts.clone(),
            enriched,
            aborted_early: run.aborted_early,
        }
    }
}

#[derive(Deserialize)]
struct CatalogPayload {
    hotels: Vec<CatalogRecord>,
}

#[derive(Deserialize)]
struct DetailsPayload {
    details: Vec<HotelEnrichment>,
}

pub struct Seeder {
    vendor: Arc<dyn HotelVendor>,
    stores: Stores,
    cache: Cache,
    clock: Arc<dyn Clock>,
    profile: CurationProfile,
    settings: SeedSettings,
}

impl Seeder {
    #[must_use]
    pub fn new(
        vendor: Arc<dyn HotelVendor>,
        stores: Stores,
        clock: Arc<dyn Clock>,
        profile: CurationProfile,
        settings: SeedSettings,
    ) -> Self {
        let cache = Cache::new(Arc::clone(&stores.cache), Arc::clone(&clock));
        Self {
            vendor,
            stores,
            cache,
            clock,
            profile,
            settings,
        }
    }

    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Insert a `queued` run for `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Db`] if the run cannot be stored.
    pub async fn create_run(&self, mode: SeedMode) -> Result<SeedRun, SyncError> {
        let run = SeedRun::queued(mode.as_str(), self.clock.now());
        self.stores.runs.insert_run(&run).await?;
        Ok(run)
    }

    /// Create a run and execute it to completion.
    ///
    /// # Errors
    ///
    /// See [`Seeder::execute`].
    pub async fn seed(&self, mode: SeedMode) -> Result<SeedReport, SyncError> {
        let run = self.create_run(mode).await?;
        self.execute(run, mode).await
    }

    /// Execute an already created run. Failures are recorded on the run
    /// before being returned.
    ///
    /// # Errors
    ///
    /// Returns the first vendor, store, payload or budget failure.
    pub async fn execute(&self, run: SeedRun, mode: SeedMode) -> Result<SeedReport, SyncError> {
        let run_id = run.run_id;
        tracing::info!(%run_id, mode = mode.as_str(), "seed run started");
        let result = match mode {
            SeedMode::Buffered(options) => self.run_buffered(run, options).await,
            SeedMode::Streaming => self.run_streaming(run).await,
        };
        match &result {
            Ok(report) => tracing::info!(
                %run_id,
                seeded = report.seeded,
                inserted = report.inserted,
                updated = report.updated,
                enriched = report.enriched,
                aborted_early = report.aborted_early,
                "seed run finished"
            ),
            Err(e) => tracing::error!(%run_id, code = e.code(), error = %e, "seed run failed"),
        }
        result
    }

    async fn save(&self, run: &SeedRun) -> Result<(), SyncError> {
        self.stores.runs.save_run(run).await?;
        Ok(())
    }

    /// Record `error` on the run; a failed save is logged, not returned.
    async fn record_failure(&self, run: &mut SeedRun, error: &SyncError) {
        run.fail(error.to_run_error(), self.clock.now());
        if let Err(e) = self.stores.runs.save_run(run).await {
            tracing::error!(run_id = %run.run_id, error = %e, "failed to record seed failure");
        }
    }

    async fn run_buffered(
        &self,
        mut run: SeedRun,
        options: SeedOptions,
    ) -> Result<SeedReport, SyncError> {
        let budget = Budget::start(self.clock.now(), self.settings.budget_ms);
        let mut enriched = 0;
        match self
            .buffered_stages(&mut run, options, &budget, &mut enriched)
            .await
        {
            Ok(()) => {
                run.finish(self.clock.now());
                self.save(&run).await?;
                Ok(SeedReport::from_run(&run, enriched))
            }
            Err(e) => {
                self.record_failure(&mut run, &e).await;
                Err(e)
            }
        }
    }

    async fn enter(&self, run: &mut SeedRun, stage: SeedStage) -> Result<(), SyncError> {
        run.enter(stage, self.clock.now());
        tracing::info!(run_id = %run.run_id, stage = stage.as_str(), "seed stage");
        self.save(run).await
    }

    async fn buffered_stages(
        &self,
        run: &mut SeedRun,
        options: SeedOptions,
        budget: &Budget,
        enriched: &mut u64,
    ) -> Result<(), SyncError> {
        self.enter(run, SeedStage::Fetching).await?;
        let records = self.load_catalog(options.bypass_cache).await?;
        budget.check(self.clock.now(), SeedStage::Fetching)?;

        self.enter(run, SeedStage::Filtering).await?;
        let total = records.len() as u64;
        let grouped = filter_and_group(records, &self.profile);
        tracing::debug!(stats = ?grouped.stats, "catalog filtered");
        let tagged: BTreeMap<String, Vec<(String, CatalogRecord)>> = grouped
            .groups
            .into_iter()
            .map(|(key, members)| {
                let members = members.into_iter().map(|r| (key.clone(), r)).collect();
                (key, members)
            })
            .collect();
        let selected = sample_groups(
            tagged,
            self.clock.today(),
            self.profile.limit_per_group,
            self.profile.limit_total,
        );
        run.total = Some(total);
        run.processed = total;
        run.per_group_counts = BTreeMap::new();
        for (group, _) in &selected {
            *run.per_group_counts.entry(group.clone()).or_insert(0) += 1;
        }
        self.save(run).await?;
        budget.check(self.clock.now(), SeedStage::Filtering)?;

        self.enter(run, SeedStage::Writing).await?;
        let ids: Vec<String> = selected.iter().map(|(_, r)| r.hotel_id.clone()).collect();
        let mut summary = UpsertSummary::default();
        let hotels: Vec<CatalogRecord> = selected.into_iter().map(|(_, r)| r).collect();
        for chunk in hotels.chunks(WRITE_CHUNK) {
            let now = self.clock.now();
            let batch: Vec<CuratedHotelRecord> = chunk
                .iter()
                .cloned()
                .map(|r| CuratedHotelRecord::from_catalog(r, MODE_BUFFERED, now))
                .collect();
            summary.add(self.stores.curated.upsert_hotels(&batch).await?);
            apply_summary(run, summary, self.clock.now());
            self.save(run).await?;
            budget.check(self.clock.now(), SeedStage::Writing)?;
        }

        if options.enrich_details && !ids.is_empty() {
            self.enter(run, SeedStage::Enriching).await?;
            *enriched = self.enrich(&ids, budget).await?;
        }
        Ok(())
    }

    async fn load_catalog(&self, bypass: bool) -> Result<Vec<CatalogRecord>, SyncError> {
        let vendor = Arc::clone(&self.vendor);
        let cached = self
            .cache
            .read_through(
                CATALOG_CACHE_KEY,
                self.settings.catalog_ttl_hours,
                bypass,
                || async move {
                    let hotels = vendor.fetch_catalog().await?;
                    Ok(json!({ "hotels": hotels }))
                },
            )
            .await?;
        if cached.freshness == Freshness::Stale {
            tracing::warn!(cached_at = %cached.cached_at, "seeding from stale catalog");
        }
        let payload: CatalogPayload =
            serde_json::from_value(cached.payload).map_err(|source| SyncError::Payload {
                context: "cached catalog",
                source,
            })?;
        Ok(payload.hotels)
    }

    /// Fetch details for selected hotels lacking a hero image and merge
    /// them in. A failed chunk is logged and skipped.
    async fn enrich(&self, ids: &[String], budget: &Budget) -> Result<u64, SyncError> {
        let missing = self.stores.curated.ids_missing_hero_image(ids).await?;
        let mut touched = 0;
        for chunk in missing.chunks(ENRICH_CHUNK) {
            match self.fetch_details(chunk).await {
                Ok(details) => {
                    touched += self
                        .stores
                        .curated
                        .apply_enrichment(&details, self.clock.now())
                        .await?;
                }
                Err(e) => {
                    tracing::warn!(
                        chunk_size = chunk.len(),
                        code = e.code(),
                        error = %e,
                        "detail enrichment chunk failed; skipping"
                    );
                }
            }
            budget.check(self.clock.now(), SeedStage::Enriching)?;
        }
        Ok(touched)
    }

    async fn fetch_details(
        &self,
        ids: &[String],
    ) -> Result<Vec<HotelEnrichment>, SyncError> {
        let key = format!("{DETAILS_CACHE_PREFIX}{}", ids.join(","));
        let vendor = Arc::clone(&self.vendor);
        let owned = ids.to_vec();
        let cached = self
            .cache
            .read_through(&key, self.settings.details_ttl_hours, false, || async move {
                let details = vendor.hotel_details(&owned).await?;
                Ok(json!({ "details": details }))
            })
            .await?;
        let payload: DetailsPayload =
            serde_json::from_value(cached.payload).map_err(|source| SyncError::Payload {
                context: "cached hotel details",
                source,
            })?;
        Ok(payload.details)
    }

    async fn run_streaming(&self, run: SeedRun) -> Result<SeedReport, SyncError> {
        let options = StreamOptions::new(
            self.profile.country_set(),
            self.profile.stream.per_group_limit,
            self.profile.stream.overall_limit,
            Duration::from_millis(self.settings.hard_timeout_ms),
        );
        let sink = StoreSink::new(
            Arc::clone(&self.stores.curated),
            Arc::clone(&self.clock),
            MODE_STREAMING,
        );
        let progress = RunProgress {
            stores: self.stores.clone(),
            clock: Arc::clone(&self.clock),
            run: Mutex::new(run),
        };
        let result = StreamIngestor::new(Arc::clone(&self.vendor))
            .run(&options, &sink, &progress)
            .await;
        let mut run = progress.run.into_inner();
        match result {
            Ok(report) => {
                run.processed = report.processed;
                run.per_group_counts = report.per_group_counts;
                run.aborted_early = report.aborted_early;
                apply_summary(&mut run, report.upserts, self.clock.now());
                run.finish(self.clock.now());
                self.save(&run).await?;
                Ok(SeedReport::from_run(&run, 0))
            }
            Err(e) => {
                self.record_failure(&mut run, &e).await;
                Err(e)
            }
        }
    }
}

fn apply_summary(run: &mut SeedRun, summary: UpsertSummary, now: DateTime<Utc>) {
    run.seeded_count = summary.total();
    run.inserted_count = summary.inserted;
    run.updated_count = summary.updated;
    run.updated_at = now;
}

/// Mirrors ingest progress onto the stored run.
struct RunProgress {
    stores: Stores,
    clock: Arc<dyn Clock>,
    run: Mutex<SeedRun>,
}

#[async_trait]
impl IngestObserver for RunProgress {
    async fn on_progress(&self, progress: &IngestProgress) {
        let mut run = self.run.lock().await;
        let now = self.clock.now();
        if run.stage != progress.stage {
            tracing::info!(run_id = %run.run_id, stage = progress.stage.as_str(), "seed stage");
        }
        run.enter(progress.stage, now);
        run.processed = progress.processed;
        run.per_group_counts.clone_from(&progress.per_group_counts);
        apply_summary(&mut run, progress.upserts, now);
        if let Err(e) = self.stores.runs.save_run(&run).await {
            tracing::warn!(run_id = %run.run_id, error = %e, "failed to save seed progress");
        }
    }
}

/// Wall-clock budget measured on the injected clock.
struct Budget {
    deadline: DateTime<Utc>,
    budget_ms: u64,
}

impl Budget {
    fn start(now: DateTime<Utc>, budget_ms: u64) -> Self {
        let deadline = i64::try_from(budget_ms)
            .ok()
            .and_then(chrono::Duration::try_milliseconds)
            .and_then(|budget| now.checked_add_signed(budget))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            deadline,
            budget_ms,
        }
    }

    fn check(&self, now: DateTime<Utc>, stage: SeedStage) -> Result<(), SyncError> {
        if now > self.deadline {
            return Err(SyncError::SeedTimeout {
                stage: stage.as_str(),
                budget_ms: self.budget_ms,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "seeder_test.rs"]
mod tests;
