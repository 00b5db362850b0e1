use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One room in a vendor search request.
///
/// The vendor requires `age.len() == chd`; see the search orchestrator for
/// the normalization that enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRequest {
    #[serde(default = "default_adults")]
    pub adt: u32,
    #[serde(default)]
    pub chd: u32,
    #[serde(default)]
    pub age: Vec<u32>,
}

fn default_adults() -> u32 {
    1
}

/// Diagnostics for one nationality attempt inside a search sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchAttempt {
    pub nationality_code: String,
    pub upstream_status: Option<u16>,
    pub error_code: Option<String>,
    pub result_count: usize,
    pub elapsed_ms: u64,
}

/// Diagnostic summary of one search orchestration, persisted off the
/// response path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchLog {
    pub id: Uuid,
    pub hotel_ids: Vec<String>,
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
    pub room_count: usize,
    pub requested_nationality: String,
    /// Nationality of the attempt that produced the final outcome.
    pub used_nationality: Option<String>,
    pub fallback_hit: bool,
    pub attempts: Vec<SearchAttempt>,
    pub result_count: usize,
    pub error_code: Option<String>,
    pub created_at: DateTime<Utc>,
}
