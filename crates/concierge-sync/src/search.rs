//! Search orchestration with the nationality fallback sweep.
//!
//! Attempts run strictly in sequence. An attempt that returns hotels, or
//! fails with a real error, ends the sweep; an empty "no results" answer
//! moves on to the next nationality.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use concierge_core::{Clock, RoomRequest, SearchAttempt, SearchLog};
use concierge_db::SearchLogStore;
use concierge_vendor::{SearchRequest, SearchResponse, VendorError};
use thiserror::Error;
use uuid::Uuid;

use crate::rooms::normalize_rooms;
use crate::vendor::HotelVendor;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub hotel_ids: Vec<String>,
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
    pub rooms: Vec<RoomRequest>,
    pub nationality: String,
    /// Vendor-side timeout hint in seconds.
    pub timeout_secs: Option<u64>,
    /// Overrides the orchestrator's default sweep setting.
    pub sweep: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub response: SearchResponse,
    /// Nationality of the attempt that produced `response`.
    pub used_nationality: String,
    /// Hotels came back for a nationality other than the requested one.
    pub fallback_hit: bool,
    /// Every attempt made, in order.
    pub fallback_tried: Vec<SearchAttempt>,
}

/// A sweep stopped by a definitive vendor error.
#[derive(Debug, Error)]
#[error("search failed after {} attempt(s): {source}", attempts.len())]
pub struct SearchError {
    #[source]
    pub source: VendorError,
    pub attempts: Vec<SearchAttempt>,
}

impl SearchError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.source.code()
    }
}

pub struct SearchOrchestrator {
    vendor: Arc<dyn HotelVendor>,
    logs: Arc<dyn SearchLogStore>,
    clock: Arc<dyn Clock>,
    sweep_enabled: bool,
    fallbacks: Vec<String>,
}

impl SearchOrchestrator {
    #[must_use]
    pub fn new(
        vendor: Arc<dyn HotelVendor>,
        logs: Arc<dyn SearchLogStore>,
        clock: Arc<dyn Clock>,
        sweep_enabled: bool,
        fallbacks: Vec<String>,
    ) -> Self {
        Self {
            vendor,
            logs,
            clock,
            sweep_enabled,
            fallbacks,
        }
    }

    /// Nationalities to try: the requested one, then the fallbacks in
    /// order, upper-cased with duplicates removed.
    fn sweep_order(&self, requested: &str, sweep: bool) -> Vec<String> {
        let mut order = vec![normalize_code(requested)];
        if sweep {
            for code in &self.fallbacks {
                let code = normalize_code(code);
                if !code.is_empty() && !order.contains(&code) {
                    order.push(code);
                }
            }
        }
        order
    }

    /// Run one orchestrated search.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] with the attempts made so far when an attempt
    /// fails with anything other than an empty result.
    pub async fn search(&self, params: SearchParams) -> Result<SearchOutcome, SearchError> {
        let sweep = params.sweep.unwrap_or(self.sweep_enabled);
        let requested = normalize_code(&params.nationality);
        let order = self.sweep_order(&requested, sweep);
        let rooms = normalize_rooms(&params.rooms);

        let mut attempts = Vec::with_capacity(order.len());
        let mut last: Option<(String, SearchResponse)> = None;

        for nationality in order {
            let request = SearchRequest {
                hotel_ids: params.hotel_ids.clone(),
                checkin: params.checkin,
                checkout: params.checkout,
                rooms: rooms.clone(),
                nationality: nationality.clone(),
                timeout: params.timeout_secs,
            };
            let started = Instant::now();
            let result = self.vendor.search(&request).await;
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            match result {
                Ok(response) => {
                    attempts.push(SearchAttempt {
                        nationality_code: nationality.clone(),
                        upstream_status: Some(200),
                        error_code: None,
                        result_count: response.count,
                        elapsed_ms,
                    });
                    let found = response.count > 0;
                    last = Some((nationality, response));
                    if found {
                        break;
                    }
                    tracing::debug!(
                        nationality = %request.nationality,
                        "no results; trying next nationality"
                    );
                }
                Err(source) => {
                    attempts.push(SearchAttempt {
                        nationality_code: nationality.clone(),
                        upstream_status: source.upstream_status(),
                        error_code: Some(source.code().to_string()),
                        result_count: 0,
                        elapsed_ms,
                    });
                    tracing::warn!(
                        nationality = %nationality,
                        code = source.code(),
                        error = %source,
                        "search attempt failed; stopping sweep"
                    );
                    self.record(
                        &params,
                        &requested,
                        Some(&nationality),
                        &attempts,
                        0,
                        Some(&source),
                    );
                    return Err(SearchError { source, attempts });
                }
            }
        }

        let (used_nationality, response) =
            last.unwrap_or_else(|| (requested.clone(), SearchResponse::empty()));
        let fallback_hit = response.count > 0 && used_nationality != requested;
        if fallback_hit {
            tracing::info!(
                requested = %requested,
                used = %used_nationality,
                attempts = attempts.len(),
                "search succeeded on fallback nationality"
            );
        }
        self.record(
            &params,
            &requested,
            Some(&used_nationality),
            &attempts,
            response.count,
            None,
        );
        Ok(SearchOutcome {
            response,
            used_nationality,
            fallback_hit,
            fallback_tried: attempts,
        })
    }

    /// Persist a diagnostics summary without blocking the caller.
    fn record(
        &self,
        params: &SearchParams,
        requested: &str,
        used: Option<&str>,
        attempts: &[SearchAttempt],
        result_count: usize,
        error: Option<&VendorError>,
    ) {
        let used_nationality = used.map(str::to_string);
        let log = SearchLog {
            id: Uuid::new_v4(),
            hotel_ids: params.hotel_ids.clone(),
            checkin: params.checkin,
            checkout: params.checkout,
            room_count: params.rooms.len(),
            requested_nationality: requested.to_string(),
            fallback_hit: result_count > 0 && used_nationality.as_deref() != Some(requested),
            used_nationality,
            attempts: attempts.to_vec(),
            result_count,
            error_code: error.map(|e| e.code().to_string()),
            created_at: self.clock.now(),
        };
        let logs = Arc::clone(&self.logs);
        tokio::spawn(async move {
            if let Err(e) = logs.insert_search_log(&log).await {
                tracing::warn!(search_id = %log.id, error = %e, "failed to persist search log");
            }
        });
    }
}

fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

#[cfg(test)]
#[path = "search_test.rs"]
mod tests;
