use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Running,
    Done,
    Error,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Done => "done",
            RunStatus::Error => "error",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "queued" => Some(RunStatus::Queued),
            "running" => Some(RunStatus::Running),
            "done" => Some(RunStatus::Done),
            "error" => Some(RunStatus::Error),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Done | RunStatus::Error)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress stage of a seeding run.
///
/// The buffered path moves `fetching → filtering → writing → enriching`;
/// the streaming path moves `fetching → streaming → writing`. Both end in
/// `done` or `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedStage {
    Queued,
    Fetching,
    Filtering,
    Streaming,
    Writing,
    Enriching,
    Done,
    Error,
}

impl SeedStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SeedStage::Queued => "queued",
            SeedStage::Fetching => "fetching",
            SeedStage::Filtering => "filtering",
            SeedStage::Streaming => "streaming",
            SeedStage::Writing => "writing",
            SeedStage::Enriching => "enriching",
            SeedStage::Done => "done",
            SeedStage::Error => "error",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "queued" => Some(SeedStage::Queued),
            "fetching" => Some(SeedStage::Fetching),
            "filtering" => Some(SeedStage::Filtering),
            "streaming" => Some(SeedStage::Streaming),
            "writing" => Some(SeedStage::Writing),
            "enriching" => Some(SeedStage::Enriching),
            "done" => Some(SeedStage::Done),
            "error" => Some(SeedStage::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for SeedStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure details recorded on a run for operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    pub code: String,
    pub message: String,
    pub upstream_status: Option<u16>,
}

/// Persisted progress record for one seeding pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedRun {
    pub run_id: Uuid,
    /// `buffered` or `streaming`.
    pub mode: String,
    pub status: RunStatus,
    pub stage: SeedStage,
    pub processed: u64,
    pub total: Option<u64>,
    pub per_group_counts: BTreeMap<String, u64>,
    pub seeded_count: u64,
    pub inserted_count: u64,
    pub updated_count: u64,
    pub aborted_early: bool,
    pub last_error: Option<RunError>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SeedRun {
    #[must_use]
    pub fn queued(mode: &str, now: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode: mode.to_string(),
            status: RunStatus::Queued,
            stage: SeedStage::Queued,
            processed: 0,
            total: None,
            per_group_counts: BTreeMap::new(),
            seeded_count: 0,
            inserted_count: 0,
            updated_count: 0,
            aborted_early: false,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Move into `stage`, marking the run as running.
    pub fn enter(&mut self, stage: SeedStage, now: DateTime<Utc>) {
        self.status = RunStatus::Running;
        self.stage = stage;
        self.updated_at = now;
    }

    pub fn finish(&mut self, now: DateTime<Utc>) {
        self.status = RunStatus::Done;
        self.stage = SeedStage::Done;
        self.updated_at = now;
    }

    pub fn fail(&mut self, error: RunError, now: DateTime<Utc>) {
        self.status = RunStatus::Error;
        self.stage = SeedStage::Error;
        self.last_error = Some(error);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_reaches_terminal_states() {
        let now = Utc::now();
        let mut run = SeedRun::queued("buffered", now);
        assert!(run.is_active());
        assert_eq!(run.status, RunStatus::Queued);

        run.enter(SeedStage::Fetching, now);
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.is_active());

        run.finish(now);
        assert_eq!(run.stage, SeedStage::Done);
        assert!(!run.is_active());
    }

    #[test]
    fn fail_records_error() {
        let now = Utc::now();
        let mut run = SeedRun::queued("streaming", now);
        run.fail(
            RunError {
                code: "server_error".into(),
                message: "vendor returned 502".into(),
                upstream_status: Some(502),
            },
            now,
        );
        assert_eq!(run.status, RunStatus::Error);
        assert_eq!(run.last_error.as_ref().unwrap().upstream_status, Some(502));
    }

    #[test]
    fn status_and_stage_round_trip_through_strings() {
        for status in [
            RunStatus::Queued,
            RunStatus::Running,
            RunStatus::Done,
            RunStatus::Error,
        ] {
            assert_eq!(RunStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SeedStage::parse("enriching"), Some(SeedStage::Enriching));
        assert_eq!(SeedStage::parse("bogus"), None);
    }
}
