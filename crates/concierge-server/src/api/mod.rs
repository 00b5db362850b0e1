mod curated;
mod search;
mod seed;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use concierge_db::Stores;
use concierge_sync::{CuratedReader, SearchOrchestrator, SeedTrigger, SyncError};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{request_id, require_bearer_auth, AuthState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub search: Arc<SearchOrchestrator>,
    pub curated: Arc<CuratedReader>,
    pub trigger: Arc<SeedTrigger>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                upstream_status: None,
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    #[must_use]
    pub fn with_upstream_status(mut self, status: Option<u16>) -> Self {
        self.error.upstream_status = status;
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "timeout" | "seed_timeout" => StatusCode::GATEWAY_TIMEOUT,
            "auth_error" | "server_error" | "network_error" | "decode_error"
            | "decompression_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &concierge_db::DbError) -> ApiError {
    tracing::error!(error = %error, "store query failed");
    ApiError::new(request_id, "internal_error", "store query failed")
}

pub(super) fn map_sync_error(request_id: String, error: &SyncError) -> ApiError {
    match error {
        SyncError::Db(e) => map_db_error(request_id, e),
        other => {
            tracing::warn!(error = %other, code = other.code(), "pipeline call failed");
            ApiError::new(request_id, other.code(), other.to_string())
                .with_upstream_status(other.upstream_status())
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn operator_router(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/seed", post(seed::trigger_seed))
        .route("/api/v1/seed/runs", get(seed::list_runs))
        .route("/api/v1/seed/runs/{run_id}", get(seed::get_run))
        .layer(axum::middleware::from_fn_with_state(
            auth,
            require_bearer_auth,
        ))
}

pub fn build_app(state: AppState, auth: AuthState) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/search", post(search::search_hotels))
        .route("/api/v1/curated", get(curated::list_curated));

    Router::new()
        .merge(public_routes)
        .merge(operator_router(auth))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    match state.stores.runs.list_runs(1).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ApiResponse::new(
                HealthData {
                    status: "ok",
                    database: "ok",
                },
                req_id.0,
            )),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::new(
                    HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    req_id.0,
                )),
            )
        }
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
