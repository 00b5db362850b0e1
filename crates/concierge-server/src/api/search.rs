use axum::{extract::State, Extension, Json};
use chrono::NaiveDate;
use concierge_core::{RoomRequest, SearchAttempt};
use concierge_sync::{SearchOutcome, SearchParams};
use concierge_vendor::SearchResponse;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

const DEFAULT_NATIONALITY: &str = "US";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SearchBody {
    hotel_ids: Vec<String>,
    checkin: NaiveDate,
    checkout: NaiveDate,
    #[serde(default)]
    rooms: Vec<RoomRequest>,
    #[serde(default)]
    nationality: Option<String>,
    /// Vendor-side timeout hint in seconds.
    #[serde(default)]
    timeout: Option<u64>,
    #[serde(default)]
    sweep: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SearchData {
    #[serde(flatten)]
    response: SearchResponse,
    used_nationality: String,
    fallback_hit: bool,
    attempts: Vec<SearchAttempt>,
}

impl From<SearchOutcome> for SearchData {
    fn from(outcome: SearchOutcome) -> Self {
        Self {
            response: outcome.response,
            used_nationality: outcome.used_nationality,
            fallback_hit: outcome.fallback_hit,
            attempts: outcome.fallback_tried,
        }
    }
}

impl SearchBody {
    fn into_params(self) -> Result<SearchParams, &'static str> {
        let hotel_ids: Vec<String> = self
            .hotel_ids
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        if hotel_ids.is_empty() {
            return Err("hotelIds must contain at least one id");
        }
        if self.checkout <= self.checkin {
            return Err("checkout must be after checkin");
        }
        if self.rooms.is_empty() {
            return Err("rooms must contain at least one room");
        }
        let nationality = self
            .nationality
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_NATIONALITY.to_string());
        Ok(SearchParams {
            hotel_ids,
            checkin: self.checkin,
            checkout: self.checkout,
            rooms: self.rooms,
            nationality,
            timeout_secs: self.timeout,
            sweep: self.sweep,
        })
    }
}

pub(super) async fn search_hotels(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SearchBody>,
) -> Result<Json<ApiResponse<SearchData>>, ApiError> {
    let params = body
        .into_params()
        .map_err(|msg| ApiError::new(req_id.0.clone(), "validation_error", msg))?;

    match state.search.search(params).await {
        Ok(outcome) => Ok(Json(ApiResponse::new(outcome.into(), req_id.0))),
        Err(e) => {
            tracing::warn!(code = e.code(), attempts = e.attempts.len(), "search failed");
            Err(ApiError::new(req_id.0, e.code(), e.source.to_string())
                .with_upstream_status(e.source.upstream_status()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: serde_json::Value) -> SearchBody {
        serde_json::from_value(value).expect("valid body")
    }

    #[test]
    fn defaults_nationality_and_trims_ids() {
        let params = body(json!({
            "hotelIds": [" H1 ", ""],
            "checkin": "2026-11-02",
            "checkout": "2026-11-05",
            "rooms": [{"adt": 2, "chd": 0, "age": []}]
        }))
        .into_params()
        .unwrap();
        assert_eq!(params.hotel_ids, vec!["H1"]);
        assert_eq!(params.nationality, "US");
        assert_eq!(params.sweep, None);
    }

    #[test]
    fn rejects_inverted_dates() {
        let err = body(json!({
            "hotelIds": ["H1"],
            "checkin": "2026-11-05",
            "checkout": "2026-11-05",
            "rooms": [{"adt": 1, "chd": 0, "age": []}]
        }))
        .into_params()
        .unwrap_err();
        assert!(err.contains("checkout"));
    }

    #[test]
    fn rejects_missing_rooms() {
        let err = body(json!({
            "hotelIds": ["H1"],
            "checkin": "2026-11-02",
            "checkout": "2026-11-05"
        }))
        .into_params()
        .unwrap_err();
        assert!(err.contains("rooms"));
    }
}
