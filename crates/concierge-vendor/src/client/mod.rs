//! HTTP gateway to the hotel-inventory vendor.
//!
//! Every call carries the service credential as HTTP Basic auth. The
//! short-lived search token is attached only on the availability/booking
//! family of paths (see [`paths::accepts_token`]). Calls marked safe are
//! retried on transient failures; everything else is tried once.

pub mod paths;
mod stream;

use std::time::Duration;

use concierge_core::{CatalogRecord, HotelEnrichment, VendorSettings};
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, CONTENT_ENCODING};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde_json::Value;

use crate::codec::ContentEncoding;
use crate::error::VendorError;
use crate::retry::retry_with_backoff;
use crate::shapes;
use crate::types::{SearchRequest, SearchResponse};

/// Header carrying the search token on follow-up calls.
pub const TOKEN_HEADER: &str = "Token";

/// Encodings the vendor may apply to response bodies.
const ACCEPTED_ENCODINGS: &str = "gzip, deflate";

/// Per-call options for [`VendorClient::request`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
    pub token: Option<String>,
    pub timeout_ms: Option<u64>,
    /// Whether the call is an idempotent read that may be retried.
    /// Defaults to `true` for `GET` and `false` otherwise.
    pub safe: Option<bool>,
}

impl RequestOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    #[must_use]
    pub fn safe(mut self, safe: bool) -> Self {
        self.safe = Some(safe);
        self
    }
}

/// Client for the vendor REST API.
pub struct VendorClient {
    client: Client,
    base_url: Url,
    username: String,
    password: String,
    default_timeout_ms: u64,
    max_timeout_ms: u64,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl std::fmt::Debug for VendorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendorClient")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("default_timeout_ms", &self.default_timeout_ms)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl VendorClient {
    /// Builds a client from vendor settings.
    ///
    /// No total request timeout is set on the underlying client: buffered
    /// calls set one per request, and the catalog stream is bounded by its
    /// caller.
    ///
    /// # Errors
    ///
    /// Returns [`VendorError::Config`] when credentials are missing or the
    /// base URL is invalid, and [`VendorError::Http`] if the `reqwest`
    /// client cannot be constructed.
    pub fn new(settings: &VendorSettings) -> Result<Self, VendorError> {
        let username = settings
            .username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| VendorError::Config("vendor username is not configured".to_string()))?;
        let password = settings
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| VendorError::Config("vendor password is not configured".to_string()))?;

        // Exactly one trailing slash so `Url::join` appends to the base path.
        let normalised = format!("{}/", settings.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| {
            VendorError::Config(format!("invalid vendor base URL '{}': {e}", settings.base_url))
        })?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(settings.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            base_url,
            username: username.to_owned(),
            password: password.to_owned(),
            default_timeout_ms: settings.default_timeout_ms,
            max_timeout_ms: settings.max_timeout_ms.max(settings.default_timeout_ms),
            max_retries: settings.max_retries,
            backoff_base_ms: settings.backoff_base_ms,
        })
    }

    /// Issues one vendor call and returns the decoded JSON payload.
    ///
    /// A `200` carrying a "no results" domain code is returned as the
    /// normalized empty payload (see [`shapes::empty_result`]).
    ///
    /// # Errors
    ///
    /// Returns a classified [`VendorError`]; safe calls have already been
    /// retried on transient failures.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Value, VendorError> {
        let safe = options.safe.unwrap_or(method == Method::GET);
        let timeout = Duration::from_millis(self.resolve_timeout_ms(&options));
        let token = scoped_token(path, options.token.as_deref());
        let url = self.url(path)?;

        let attempt = || {
            let method = method.clone();
            let url = url.clone();
            let options = &options;
            async move {
                self.send_once(method, url, path, options, token, timeout)
                    .await
            }
        };

        if safe {
            retry_with_backoff(self.max_retries, self.backoff_base_ms, attempt).await
        } else {
            attempt().await
        }
    }

    /// Runs an availability search.
    ///
    /// The search call never carries a token; the response token (if any)
    /// authorizes follow-up availability/booking calls.
    ///
    /// # Errors
    ///
    /// See [`VendorClient::request`]. A body matching no search shape is a
    /// [`VendorError::Deserialize`].
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, VendorError> {
        let body = serde_json::to_value(request).map_err(|e| VendorError::Deserialize {
            context: "search request".to_string(),
            source: e,
        })?;
        // Searches are read-only on the vendor side.
        let payload = self
            .request(
                Method::POST,
                paths::SEARCH,
                RequestOptions::new().json(body).safe(true),
            )
            .await?;
        shapes::parse_search(payload)
    }

    /// Fetches and decodes the whole catalog in one buffered response.
    ///
    /// # Errors
    ///
    /// See [`VendorClient::request`].
    pub async fn fetch_catalog(&self) -> Result<Vec<CatalogRecord>, VendorError> {
        let payload = self
            .request(
                Method::GET,
                paths::CATALOG,
                RequestOptions::new().timeout_ms(self.max_timeout_ms),
            )
            .await?;
        let records = shapes::parse_catalog(payload);
        tracing::debug!(records = records.len(), "fetched buffered catalog");
        Ok(records)
    }

    /// Fetches detail fields for a chunk of hotels.
    ///
    /// # Errors
    ///
    /// See [`VendorClient::request`].
    pub async fn hotel_details(
        &self,
        hotel_ids: &[String],
    ) -> Result<Vec<HotelEnrichment>, VendorError> {
        if hotel_ids.is_empty() {
            return Ok(Vec::new());
        }
        let payload = self
            .request(
                Method::GET,
                paths::DETAILS,
                RequestOptions::new().query("hotelIds", hotel_ids.join(",")),
            )
            .await?;
        Ok(shapes::parse_details(payload))
    }

    /// Timeout for one call: explicit value, then the payload's `timeout`
    /// hint (seconds, capped at the configured maximum), then the default.
    pub(crate) fn resolve_timeout_ms(&self, options: &RequestOptions) -> u64 {
        if let Some(ms) = options.timeout_ms.filter(|ms| *ms > 0) {
            return ms;
        }
        let hint_secs = options
            .body
            .as_ref()
            .and_then(|b| b.get("timeout"))
            .and_then(|t| t.as_f64().or_else(|| t.as_str()?.trim().parse().ok()))
            .filter(|secs| secs.is_finite() && *secs > 0.0);
        match hint_secs {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Some(secs) => ((secs * 1000.0).ceil() as u64).min(self.max_timeout_ms),
            None => self.default_timeout_ms,
        }
    }

    /// Joins `path` onto the base URL, keeping any base path prefix.
    pub(crate) fn url(&self, path: &str) -> Result<Url, VendorError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| VendorError::Config(format!("invalid vendor path '{path}': {e}")))
    }

    /// Request with credentials and content negotiation applied.
    fn authorized(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, "application/json")
            .header(ACCEPT_ENCODING, ACCEPTED_ENCODINGS)
    }

    async fn send_once(
        &self,
        method: Method,
        url: Url,
        path: &str,
        options: &RequestOptions,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<Value, VendorError> {
        let mut builder = self.authorized(method, url).timeout(timeout);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(body) = &options.body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.header(TOKEN_HEADER, token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(e, path))?;
        let status = response.status();
        let encoding = ContentEncoding::from_header(
            response
                .headers()
                .get(CONTENT_ENCODING)
                .and_then(|v| v.to_str().ok()),
        );
        let raw = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, path))?;

        if !status.is_success() {
            // Error bodies are best-effort; fall back to the raw bytes.
            let body = encoding
                .ok()
                .and_then(|enc| enc.decode_bytes(&raw).ok())
                .unwrap_or_else(|| raw.to_vec());
            return Err(VendorError::from_status(
                status.as_u16(),
                path,
                &String::from_utf8_lossy(&body),
            ));
        }

        let body = encoding?.decode_bytes(&raw)?;
        let value: Value =
            serde_json::from_slice(&body).map_err(|e| VendorError::Deserialize {
                context: format!("{path} response"),
                source: e,
            })?;

        if let Some(empty) = shapes::check_domain_status(path, &value)? {
            return Ok(empty);
        }
        Ok(value)
    }
}

/// The token to send on `path`, if any. Tokens offered for other paths are
/// dropped.
fn scoped_token<'a>(path: &str, token: Option<&'a str>) -> Option<&'a str> {
    let token = token.filter(|t| !t.is_empty())?;
    if paths::accepts_token(path) {
        Some(token)
    } else {
        tracing::warn!(path, "dropping search token offered for a non-token path");
        None
    }
}

/// Client-side timeouts become [`VendorError::Timeout`] with no status.
pub(crate) fn transport_error(err: reqwest::Error, path: &str) -> VendorError {
    if err.is_timeout() {
        VendorError::Timeout {
            status: None,
            path: path.to_owned(),
        }
    } else {
        VendorError::Http(err)
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
