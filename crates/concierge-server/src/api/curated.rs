use axum::{
    extract::{Query, State},
    Extension, Json,
};
use concierge_sync::CuratedPage;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_sync_error, ApiError, ApiResponse, AppState};

const DEFAULT_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
pub(super) struct CuratedQuery {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

/// Keyset page of the curated set. An empty first page starts a background
/// seed; the response then reports `seeding` with its stage.
pub(super) async fn list_curated(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CuratedQuery>,
) -> Result<Json<ApiResponse<CuratedPage>>, ApiError> {
    let page = state
        .curated
        .list(query.limit.unwrap_or(DEFAULT_LIMIT), query.cursor.as_deref())
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse::new(page, req_id.0)))
}
