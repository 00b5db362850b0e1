//! TTL cache semantics over a [`CacheStore`], including the explicit
//! stale-read fallback used when the origin fails.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use concierge_core::{CacheEntry, Clock};
use concierge_db::{CacheStore, DbError};
use concierge_vendor::VendorError;
use serde_json::{json, Value};

/// A cache read.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    pub payload: Value,
    pub cached_at: DateTime<Utc>,
    pub expired: bool,
}

/// Where a read-through payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Served from a cache entry still inside its TTL.
    Fresh,
    /// Fetched from the vendor on this call.
    Origin,
    /// Expired entry served because the vendor call failed.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cached {
    pub payload: Value,
    pub freshness: Freshness,
    pub cached_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
}

impl Cache {
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Read `key`. Expired entries are returned only when `allow_expired`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store read fails.
    pub async fn get(&self, key: &str, allow_expired: bool) -> Result<Option<CacheHit>, DbError> {
        let Some(entry) = self.store.get_entry(key).await? else {
            return Ok(None);
        };
        let expired = !entry.is_fresh(self.clock.now());
        if expired && !allow_expired {
            return Ok(None);
        }
        Ok(Some(CacheHit {
            payload: entry.payload,
            cached_at: entry.cached_at,
            expired,
        }))
    }

    /// Store `payload` under `key`, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store write fails.
    pub async fn set(&self, key: &str, payload: Value, ttl_hours: u32) -> Result<(), DbError> {
        let entry = CacheEntry {
            key: key.to_string(),
            payload,
            cached_at: self.clock.now(),
            ttl_hours,
        };
        self.store.put_entry(&entry).await
    }

    /// Serve a fresh entry, otherwise call `fetch` and cache its result.
    ///
    /// With `bypass` the fresh read is skipped but the result is still
    /// written. If `fetch` fails and an expired entry exists, that entry is
    /// returned tagged by [`mark_stale`]. Cache store failures are logged and
    /// never mask a vendor result.
    ///
    /// # Errors
    ///
    /// Returns the vendor error when the fetch fails and nothing is cached.
    pub async fn read_through<F, Fut>(
        &self,
        key: &str,
        ttl_hours: u32,
        bypass: bool,
        fetch: F,
    ) -> Result<Cached, VendorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, VendorError>>,
    {
        if !bypass {
            match self.get(key, false).await {
                Ok(Some(hit)) => {
                    tracing::debug!(key, cached_at = %hit.cached_at, "cache hit");
                    return Ok(Cached {
                        payload: hit.payload,
                        freshness: Freshness::Fresh,
                        cached_at: hit.cached_at,
                    });
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(key, error = %e, "cache read failed; going to origin"),
            }
        }

        match fetch().await {
            Ok(payload) => {
                let fetched_at = self.clock.now();
                if let Err(e) = self.set(key, payload.clone(), ttl_hours).await {
                    tracing::warn!(key, error = %e, "cache write failed");
                }
                Ok(Cached {
                    payload,
                    freshness: Freshness::Origin,
                    cached_at: fetched_at,
                })
            }
            Err(origin) => match self.get(key, true).await {
                Ok(Some(hit)) => {
                    tracing::warn!(
                        key,
                        error = %origin,
                        cached_at = %hit.cached_at,
                        "origin failed; serving stale cache entry"
                    );
                    Ok(Cached {
                        payload: mark_stale(hit.payload),
                        freshness: Freshness::Stale,
                        cached_at: hit.cached_at,
                    })
                }
                Ok(None) => Err(origin),
                Err(e) => {
                    tracing::warn!(key, error = %e, "stale cache read failed");
                    Err(origin)
                }
            },
        }
    }
}

/// Tag a payload as a stale cache fallback: `{...payload, stale: true,
/// source: "cache"}`. Non-object payloads are wrapped under `data`.
#[must_use]
pub fn mark_stale(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) => {
            map.insert("stale".to_string(), Value::Bool(true));
            map.insert("source".to_string(), Value::String("cache".to_string()));
            Value::Object(map)
        }
        other => json!({"data": other, "stale": true, "source": "cache"}),
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
