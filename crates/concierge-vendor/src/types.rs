use chrono::NaiveDate;
use concierge_core::RoomRequest;
use serde::{Deserialize, Serialize};

/// A vendor availability search, already normalized by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub hotel_ids: Vec<String>,
    #[serde(rename = "checkIn")]
    pub checkin: NaiveDate,
    #[serde(rename = "checkOut")]
    pub checkout: NaiveDate,
    pub rooms: Vec<RoomRequest>,
    pub nationality: String,
    /// Vendor-side processing timeout in seconds. Also used as the client
    /// timeout hint (capped by configuration).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Normalized search result.
///
/// `token` authorizes follow-up availability/booking calls and is only
/// meaningful when `hotels` is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub token: Option<String>,
    pub count: usize,
    pub hotels: Vec<serde_json::Value>,
}

impl SearchResponse {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}
