use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use subtle::ConstantTimeEq;
use uuid::Uuid;

const API_KEYS_VAR: &str = "CONCIERGE_API_KEYS";

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Bearer-token settings for the operator routes.
#[derive(Clone)]
pub struct AuthState {
    api_keys: Arc<Vec<String>>,
    pub enabled: bool,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("api_keys", &format_args!("[{} redacted]", self.api_keys.len()))
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl AuthState {
    /// Reads `CONCIERGE_API_KEYS` (comma-separated bearer tokens).
    ///
    /// In development, missing keys disable auth. Elsewhere they fail startup.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var(API_KEYS_VAR).unwrap_or_default();
        Self::from_raw(&raw, is_development)
    }

    fn from_raw(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let keys: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect();

        if keys.is_empty() {
            if is_development {
                tracing::warn!("{API_KEYS_VAR} not set; operator routes are unauthenticated");
                return Ok(Self::disabled());
            }
            anyhow::bail!("{API_KEYS_VAR} is required outside development");
        }

        Ok(Self::with_keys(keys))
    }

    #[must_use]
    pub fn with_keys(keys: Vec<String>) -> Self {
        Self {
            api_keys: Arc::new(keys),
            enabled: true,
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self {
            api_keys: Arc::new(Vec::new()),
            enabled: false,
        }
    }

    fn allows(&self, token: &str) -> bool {
        // Every key is compared so timing does not reveal which one matched.
        self.api_keys
            .iter()
            .fold(false, |found, key| {
                found | bool::from(key.as_bytes().ct_eq(token.as_bytes()))
            })
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

/// Uses the incoming `x-request-id` header or a fresh `UUIDv4`, stores it as
/// a [`RequestId`] extension and echoes it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware enforcing Bearer token auth when enabled.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    match extract_bearer_token(req.headers().get(AUTHORIZATION)) {
        Some(token) if auth.allows(token) => next.run(req).await,
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(MiddlewareErrorBody {
                error: MiddlewareError {
                    code: "unauthorized",
                    message: "missing or invalid bearer token",
                },
            }),
        )
            .into_response(),
    }
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}
