//! Background job scheduler.
//!
//! Registers the daily rotation job. The buffered path samples the catalog
//! with a seed derived from the calendar date, so each day's run picks a
//! different curated set.

use std::sync::Arc;

use concierge_sync::{SeedMode, SeedOptions, SeedTrigger, TriggerOutcome};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Every day at 03:15 UTC.
const ROTATION_SCHEDULE: &str = "0 15 3 * * *";

/// Streaming keeps the first records in document order, which never rotates.
const ROTATION_MODE: SeedMode = SeedMode::Buffered(SeedOptions {
    bypass_cache: true,
    enrich_details: false,
});

/// Builds and starts the background job scheduler.
///
/// The returned handle must be kept alive for the lifetime of the process.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(trigger: Arc<SeedTrigger>) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_rotation_job(&scheduler, trigger).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_rotation_job(
    scheduler: &JobScheduler,
    trigger: Arc<SeedTrigger>,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(ROTATION_SCHEDULE, move |_uuid, _lock| {
        let trigger = Arc::clone(&trigger);
        Box::pin(async move {
            run_rotation(&trigger).await;
        })
    })?;
    scheduler.add(job).await?;
    Ok(())
}

async fn run_rotation(trigger: &SeedTrigger) {
    tracing::info!("scheduler: starting daily curation rotation");
    match trigger.trigger(ROTATION_MODE).await {
        Ok(TriggerOutcome::Started { run_id, task }) => match task.await {
            Ok(Ok(report)) => tracing::info!(
                %run_id,
                seeded = report.seeded,
                inserted = report.inserted,
                updated = report.updated,
                aborted_early = report.aborted_early,
                "scheduler: rotation complete"
            ),
            Ok(Err(e)) => {
                tracing::error!(%run_id, code = e.code(), error = %e, "scheduler: rotation failed");
            }
            Err(e) => tracing::error!(%run_id, error = %e, "scheduler: rotation task panicked"),
        },
        Ok(TriggerOutcome::Suppressed(reason)) => {
            tracing::info!(reason = reason.as_str(), "scheduler: rotation skipped");
        }
        Err(e) => tracing::error!(error = %e, "scheduler: could not trigger rotation"),
    }
}
