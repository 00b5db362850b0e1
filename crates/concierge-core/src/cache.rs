use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A cached vendor payload keyed by logical request path.
///
/// An entry is fresh while `now < cached_at + ttl_hours`. Expired entries are
/// kept so callers can fall back to them explicitly when the origin fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub payload: serde_json::Value,
    pub cached_at: DateTime<Utc>,
    pub ttl_hours: u32,
}

impl CacheEntry {
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.cached_at + Duration::hours(i64::from(self.ttl_hours))
    }

    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }
}
