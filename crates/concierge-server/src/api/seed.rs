//! Operator routes: start a seed and read run state.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use concierge_core::SeedRun;
use concierge_sync::{SeedMode, SeedOptions, TriggerOutcome};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, map_sync_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(super) enum ModeParam {
    Buffered,
    #[default]
    Streaming,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct SeedBody {
    mode: ModeParam,
    bypass_cache: bool,
    enrich: bool,
}

impl SeedBody {
    fn mode(&self) -> SeedMode {
        match self.mode {
            ModeParam::Buffered => SeedMode::Buffered(SeedOptions {
                bypass_cache: self.bypass_cache,
                enrich_details: self.enrich,
            }),
            ModeParam::Streaming => SeedMode::Streaming,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TriggerData {
    started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
}

/// `202` with the new run id, or `409` naming why the trigger was suppressed.
pub(super) async fn trigger_seed(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Option<Json<SeedBody>>,
) -> Result<(StatusCode, Json<ApiResponse<TriggerData>>), ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let outcome = state
        .trigger
        .trigger(body.mode())
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    let (status, data) = match outcome {
        TriggerOutcome::Started { run_id, .. } => (
            StatusCode::ACCEPTED,
            TriggerData {
                started: true,
                run_id: Some(run_id),
                reason: None,
            },
        ),
        TriggerOutcome::Suppressed(reason) => (
            StatusCode::CONFLICT,
            TriggerData {
                started: false,
                run_id: None,
                reason: Some(reason.as_str()),
            },
        ),
    };
    Ok((status, Json(ApiResponse::new(data, req_id.0))))
}

#[derive(Debug, Deserialize)]
pub(super) struct RunsQuery {
    pub limit: Option<u32>,
}

pub(super) async fn list_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<ApiResponse<Vec<SeedRun>>>, ApiError> {
    let limit = query.limit.unwrap_or(20).clamp(1, 200);
    let runs = state
        .stores
        .runs
        .list_runs(limit)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse::new(runs, req_id.0)))
}

pub(super) async fn get_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<ApiResponse<SeedRun>>, ApiError> {
    let run = state
        .stores
        .runs
        .get_run(run_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("seed run {run_id} not found"),
            )
        })?;
    Ok(Json(ApiResponse::new(run, req_id.0)))
}
