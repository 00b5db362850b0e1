use thiserror::Error;

/// Classified failures from the hotel-inventory vendor.
///
/// [`VendorError::code`] maps every variant onto the stable taxonomy that is
/// recorded on seed runs and surfaced to API callers.
#[derive(Debug, Error)]
pub enum VendorError {
    /// Missing or unusable gateway configuration. Raised at construction,
    /// never per request.
    #[error("vendor configuration error: {0}")]
    Config(String),

    #[error("vendor rejected credentials ({status}) for {path}")]
    Auth { status: u16, path: String },

    #[error("vendor rejected request to {path} ({status}): {message}")]
    BadRequest {
        status: u16,
        path: String,
        message: String,
    },

    #[error("vendor resource not found: {path}")]
    NotFound { path: String },

    /// `status` is `Some(408)` when the vendor timed out, `None` when the
    /// client gave up waiting.
    #[error("vendor request to {path} timed out")]
    Timeout { status: Option<u16>, path: String },

    #[error("vendor server error {status} from {path}")]
    Server { status: u16, path: String },

    /// A `200` response carrying a domain-level error code other than
    /// "no results".
    #[error("vendor error {code} from {path}: {message}")]
    Api {
        code: String,
        path: String,
        message: String,
    },

    /// Transport failure with no HTTP status (connection reset, DNS, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode {encoding} response body: {message}")]
    Decompression { encoding: String, message: String },
}

impl VendorError {
    /// Stable machine-readable classification.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            VendorError::Config(_) => "config_error",
            VendorError::Auth { .. } => "auth_error",
            VendorError::BadRequest { .. } | VendorError::Api { .. } => "bad_request",
            VendorError::NotFound { .. } => "not_found",
            VendorError::Timeout { .. } => "timeout",
            VendorError::Server { .. } => "server_error",
            VendorError::Http(_) => "network_error",
            VendorError::Deserialize { .. } => "decode_error",
            VendorError::Decompression { .. } => "decompression_error",
        }
    }

    /// HTTP status returned by the vendor, when there was one.
    #[must_use]
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            VendorError::Auth { status, .. }
            | VendorError::BadRequest { status, .. }
            | VendorError::Server { status, .. } => Some(*status),
            VendorError::NotFound { .. } => Some(404),
            VendorError::Timeout { status, .. } => *status,
            VendorError::Api { .. } => Some(200),
            VendorError::Http(e) => e.status().map(|s| s.as_u16()),
            VendorError::Config(_)
            | VendorError::Deserialize { .. }
            | VendorError::Decompression { .. } => None,
        }
    }

    /// Map a non-success HTTP status onto the taxonomy.
    pub(crate) fn from_status(status: u16, path: &str, body: &str) -> Self {
        let path = path.to_owned();
        match status {
            401 | 403 => VendorError::Auth { status, path },
            404 => VendorError::NotFound { path },
            408 => VendorError::Timeout {
                status: Some(status),
                path,
            },
            500..=599 => VendorError::Server { status, path },
            _ => VendorError::BadRequest {
                status,
                path,
                message: summarize_body(body),
            },
        }
    }
}

/// First line of an error body, truncated for logs and run records.
fn summarize_body(body: &str) -> String {
    const MAX_CHARS: usize = 200;
    let line = body.lines().next().unwrap_or("").trim();
    if line.chars().count() > MAX_CHARS {
        let truncated: String = line.chars().take(MAX_CHARS).collect();
        format!("{truncated}…")
    } else if line.is_empty() {
        "empty response body".to_string()
    } else {
        line.to_string()
    }
}
