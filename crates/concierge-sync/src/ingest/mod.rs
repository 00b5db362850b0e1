//! Streaming catalog ingestion under a hard wall-clock limit.
//!
//! Records flow from the vendor stream through [`Acceptance`] into a
//! [`Batcher`], and full batches are committed through a [`CommitSink`].
//! Reaching the overall cap or the time limit ends the run early; pending
//! records are flushed and the result reports `aborted_early` instead of
//! failing.

mod acceptance;
mod batch;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use concierge_core::{CatalogRecord, Clock, CuratedHotelRecord, SeedStage};
use concierge_db::{CuratedStore, UpsertSummary};
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;

pub use acceptance::{Acceptance, Rejection};
pub use batch::{Batcher, DEFAULT_BATCH_SIZE, FIRST_BATCH_SIZE};

use crate::error::SyncError;
use crate::vendor::HotelVendor;

/// Upper bound on the gap between the read deadline and the hard limit.
const MAX_SAFETY_MARGIN: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct StreamOptions {
    pub allowed_groups: HashSet<String>,
    pub per_group_limit: usize,
    pub overall_limit: usize,
    pub hard_timeout: Duration,
    pub first_batch: usize,
    pub batch_size: usize,
    /// How long to wait for the parser thread after cancelling it.
    pub close_grace: Duration,
}

impl StreamOptions {
    #[must_use]
    pub fn new(
        allowed_groups: HashSet<String>,
        per_group_limit: usize,
        overall_limit: usize,
        hard_timeout: Duration,
    ) -> Self {
        Self {
            allowed_groups,
            per_group_limit,
            overall_limit,
            hard_timeout,
            first_batch: FIRST_BATCH_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            close_grace: Duration::from_millis(250),
        }
    }

    /// Reading stops this long before the hard limit so the final flush
    /// has time to land.
    fn safety_margin(&self) -> Duration {
        (self.hard_timeout / 10).min(MAX_SAFETY_MARGIN)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    OverallCap,
    HardTimeout,
}

impl AbortReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AbortReason::OverallCap => "overall_cap",
            AbortReason::HardTimeout => "hard_timeout",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// Records read from the stream.
    pub processed: u64,
    /// Records committed.
    pub seeded: u64,
    pub upserts: UpsertSummary,
    pub per_group_counts: BTreeMap<String, u64>,
    pub aborted_early: bool,
    pub abort_reason: Option<AbortReason>,
}

/// Progress reported at stage transitions and after each commit.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestProgress {
    pub stage: SeedStage,
    pub processed: u64,
    pub seeded: u64,
    pub upserts: UpsertSummary,
    pub per_group_counts: BTreeMap<String, u64>,
}

/// Destination for accepted batches.
#[async_trait]
pub trait CommitSink: Send + Sync {
    async fn commit(&self, batch: Vec<CatalogRecord>) -> Result<UpsertSummary, SyncError>;
}

#[async_trait]
pub trait IngestObserver: Send + Sync {
    async fn on_progress(&self, progress: &IngestProgress);
}

/// Observer that ignores progress.
pub struct NoProgress;

#[async_trait]
impl IngestObserver for NoProgress {
    async fn on_progress(&self, _progress: &IngestProgress) {}
}

/// Commits batches as curated hotels.
pub struct StoreSink {
    store: Arc<dyn CuratedStore>,
    clock: Arc<dyn Clock>,
    source: String,
}

impl StoreSink {
    #[must_use]
    pub fn new(store: Arc<dyn CuratedStore>, clock: Arc<dyn Clock>, source: &str) -> Self {
        Self {
            store,
            clock,
            source: source.to_string(),
        }
    }
}

#[async_trait]
impl CommitSink for StoreSink {
    async fn commit(&self, batch: Vec<CatalogRecord>) -> Result<UpsertSummary, SyncError> {
        let now = self.clock.now();
        let hotels: Vec<CuratedHotelRecord> = batch
            .into_iter()
            .map(|r| CuratedHotelRecord::from_catalog(r, &self.source, now))
            .collect();
        Ok(self.store.upsert_hotels(&hotels).await?)
    }
}

pub struct StreamIngestor {
    vendor: Arc<dyn HotelVendor>,
}

struct RunState {
    acceptance: Acceptance,
    batcher: Batcher<CatalogRecord>,
    report: IngestReport,
}

impl RunState {
    fn progress(&self, stage: SeedStage) -> IngestProgress {
        IngestProgress {
            stage,
            processed: self.report.processed,
            seeded: self.report.seeded,
            upserts: self.report.upserts,
            per_group_counts: self.acceptance.counts().clone(),
        }
    }

    fn abort(&mut self, reason: AbortReason) {
        if !self.report.aborted_early {
            self.report.aborted_early = true;
            self.report.abort_reason = Some(reason);
        }
    }
}

impl StreamIngestor {
    #[must_use]
    pub fn new(vendor: Arc<dyn HotelVendor>) -> Self {
        Self { vendor }
    }

    /// Stream the catalog into `sink`.
    ///
    /// A hard timeout yields `Ok` with `aborted_early` set. Commits still in
    /// flight at the hard limit are abandoned rather than awaited.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the stream cannot be opened, the body cannot
    /// be decoded or parsed, or a commit fails. Records accepted before a
    /// mid-stream failure are flushed first.
    pub async fn run(
        &self,
        options: &StreamOptions,
        sink: &dyn CommitSink,
        observer: &dyn IngestObserver,
    ) -> Result<IngestReport, SyncError> {
        let started = Instant::now();
        let hard_deadline = started + options.hard_timeout;
        let read_deadline = hard_deadline
            .checked_sub(options.safety_margin())
            .unwrap_or(started);

        let cancel = CancellationToken::new();
        let timer = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep_until(hard_deadline).await;
                cancel.cancel();
            })
        };
        let result = self
            .drive(options, sink, observer, &cancel, read_deadline, hard_deadline)
            .await;
        timer.abort();

        if let Ok(report) = &result {
            tracing::info!(
                processed = report.processed,
                seeded = report.seeded,
                inserted = report.upserts.inserted,
                updated = report.upserts.updated,
                aborted_early = report.aborted_early,
                reason = report.abort_reason.map(AbortReason::as_str),
                elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "catalog stream ingestion finished"
            );
        }
        result
    }

    async fn drive(
        &self,
        options: &StreamOptions,
        sink: &dyn CommitSink,
        observer: &dyn IngestObserver,
        cancel: &CancellationToken,
        read_deadline: Instant,
        hard_deadline: Instant,
    ) -> Result<IngestReport, SyncError> {
        let mut state = RunState {
            acceptance: Acceptance::new(
                options.allowed_groups.clone(),
                options.per_group_limit,
                options.overall_limit,
            ),
            batcher: Batcher::new(options.first_batch, options.batch_size),
            report: IngestReport::default(),
        };

        observer.on_progress(&state.progress(SeedStage::Fetching)).await;
        let mut stream = match timeout_at(hard_deadline, self.vendor.open_catalog(cancel.clone()))
            .await
        {
            Ok(opened) => opened?,
            Err(_) => {
                tracing::warn!("catalog stream did not open before the hard timeout");
                state.abort(AbortReason::HardTimeout);
                return Ok(state.report);
            }
        };
        observer.on_progress(&state.progress(SeedStage::Streaming)).await;

        let mut failure = None;
        loop {
            let record = match timeout_at(read_deadline, stream.next()).await {
                Err(_) => {
                    tracing::warn!(
                        processed = state.report.processed,
                        "hard timeout reached; stopping catalog stream"
                    );
                    state.abort(AbortReason::HardTimeout);
                    break;
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => {
                    failure = Some(e);
                    break;
                }
                Ok(Some(Ok(record))) => record,
            };
            state.report.processed += 1;

            match state.acceptance.admit(&record) {
                Ok(_) => {
                    if let Some(batch) = state.batcher.push(record) {
                        if !commit(&mut state, sink, batch, hard_deadline).await? {
                            break;
                        }
                        observer.on_progress(&state.progress(SeedStage::Streaming)).await;
                    }
                }
                Err(reason) => {
                    tracing::trace!(hotel_id = %record.hotel_id, ?reason, "record rejected");
                }
            }
            if state.acceptance.is_saturated() {
                tracing::info!(
                    accepted = state.acceptance.accepted(),
                    "overall cap reached; closing catalog stream"
                );
                state.abort(AbortReason::OverallCap);
                break;
            }
        }

        // Leave at least half of what remains before the hard limit for the
        // final flush.
        let remaining = hard_deadline.saturating_duration_since(Instant::now());
        let grace = options.close_grace.min(remaining / 2);
        if let Some(stats) = stream.close(grace).await {
            tracing::debug!(
                emitted = stats.emitted,
                skipped = stats.skipped,
                "catalog parser stopped"
            );
        }

        if let Some(batch) = state.batcher.drain() {
            observer.on_progress(&state.progress(SeedStage::Writing)).await;
            commit(&mut state, sink, batch, hard_deadline).await?;
        }
        state.report.per_group_counts = state.acceptance.counts().clone();
        observer.on_progress(&state.progress(SeedStage::Writing)).await;

        match failure {
            Some(e) => Err(e.into()),
            None => Ok(state.report),
        }
    }
}

/// Commit one batch. Returns `false` when the hard limit cut it off.
async fn commit(
    state: &mut RunState,
    sink: &dyn CommitSink,
    batch: Vec<CatalogRecord>,
    hard_deadline: Instant,
) -> Result<bool, SyncError> {
    let size = batch.len();
    match timeout_at(hard_deadline, sink.commit(batch)).await {
        Ok(summary) => {
            let summary = summary?;
            state.report.upserts.add(summary);
            state.report.seeded += summary.total();
            tracing::debug!(
                size,
                inserted = summary.inserted,
                updated = summary.updated,
                "committed batch"
            );
            Ok(true)
        }
        Err(_) => {
            tracing::warn!(size, "commit abandoned at hard timeout");
            state.abort(AbortReason::HardTimeout);
            Ok(false)
        }
    }
}

#[cfg(test)]
#[path = "ingest_test.rs"]
mod tests;
