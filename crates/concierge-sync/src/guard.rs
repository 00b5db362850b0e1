//! Single-flight seeding trigger.
//!
//! A trigger is suppressed while another run is queued or running, or while
//! the seed lease taken by the previous trigger is still inside its
//! cooldown. The lease lives in the shared store, so the guard holds across
//! processes.

use std::sync::Arc;

use chrono::Duration;
use concierge_core::{AppConfig, Clock, RunError};
use concierge_db::Stores;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::SyncError;
use crate::seeder::{SeedMode, SeedReport, Seeder};

pub const SEED_LEASE: &str = "curation-seed";

/// Active runs not updated for this long are treated as abandoned.
const DEFAULT_STALE_AFTER_MINUTES: i64 = 30;
const MAX_COOLDOWN_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuppressReason {
    ActiveRun(Uuid),
    Cooldown,
}

impl SuppressReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SuppressReason::ActiveRun(_) => "active_run",
            SuppressReason::Cooldown => "cooldown",
        }
    }
}

pub enum TriggerOutcome {
    Started {
        run_id: Uuid,
        task: JoinHandle<Result<SeedReport, SyncError>>,
    },
    Suppressed(SuppressReason),
}

impl std::fmt::Debug for TriggerOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerOutcome::Started { run_id, .. } => {
                f.debug_struct("Started").field("run_id", run_id).finish()
            }
            TriggerOutcome::Suppressed(reason) => {
                f.debug_tuple("Suppressed").field(reason).finish()
            }
        }
    }
}

pub struct SeedTrigger {
    seeder: Arc<Seeder>,
    stores: Stores,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
    stale_after: Duration,
    holder: String,
}

impl SeedTrigger {
    #[must_use]
    pub fn new(seeder: Arc<Seeder>, stores: Stores, cooldown: Duration) -> Self {
        let clock = Arc::clone(seeder.clock());
        Self {
            seeder,
            stores,
            clock,
            cooldown,
            stale_after: Duration::minutes(DEFAULT_STALE_AFTER_MINUTES),
            holder: format!("{}-{}", std::process::id(), Uuid::new_v4()),
        }
    }

    #[must_use]
    pub fn from_app_config(seeder: Arc<Seeder>, stores: Stores, config: &AppConfig) -> Self {
        let secs = config.seed_cooldown_secs.min(MAX_COOLDOWN_SECS);
        let cooldown = Duration::seconds(i64::try_from(secs).unwrap_or_default());
        Self::new(seeder, stores, cooldown)
    }

    #[must_use]
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Start a background seed unless one is in flight or cooling down.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Db`] if the run or lease stores fail.
    pub async fn trigger(&self, mode: SeedMode) -> Result<TriggerOutcome, SyncError> {
        let now = self.clock.now();
        if let Some(mut active) = self.stores.runs.latest_active_run().await? {
            if now - active.updated_at < self.stale_after {
                tracing::info!(run_id = %active.run_id, "seed trigger suppressed: run in flight");
                return Ok(TriggerOutcome::Suppressed(SuppressReason::ActiveRun(
                    active.run_id,
                )));
            }
            tracing::warn!(
                run_id = %active.run_id,
                stage = active.stage.as_str(),
                last_update = %active.updated_at,
                "marking stalled seed run as abandoned"
            );
            active.fail(
                RunError {
                    code: "abandoned".to_string(),
                    message: "run stopped reporting progress".to_string(),
                    upstream_status: None,
                },
                now,
            );
            self.stores.runs.save_run(&active).await?;
        }

        let acquired = self
            .stores
            .leases
            .try_acquire_lease(SEED_LEASE, &self.holder, now, self.cooldown)
            .await?;
        if !acquired {
            tracing::info!("seed trigger suppressed: cooldown lease held");
            return Ok(TriggerOutcome::Suppressed(SuppressReason::Cooldown));
        }

        let run = match self.seeder.create_run(mode).await {
            Ok(run) => run,
            Err(e) => {
                // No run exists to show for the lease, so give it back.
                if let Err(release_err) = self
                    .stores
                    .leases
                    .release_lease(SEED_LEASE, &self.holder)
                    .await
                {
                    tracing::warn!(error = %release_err, "failed to release seed lease");
                }
                return Err(e);
            }
        };
        let run_id = run.run_id;
        let seeder = Arc::clone(&self.seeder);
        let task = tokio::spawn(async move { seeder.execute(run, mode).await });
        tracing::info!(%run_id, mode = mode.as_str(), "seed run triggered");
        Ok(TriggerOutcome::Started { run_id, task })
    }
}
