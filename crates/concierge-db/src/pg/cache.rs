use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concierge_core::CacheEntry;

use super::PgStore;
use crate::stores::CacheStore;
use crate::DbError;

#[derive(Debug, sqlx::FromRow)]
struct CacheRow {
    key: String,
    payload: serde_json::Value,
    cached_at: DateTime<Utc>,
    ttl_hours: i32,
}

#[async_trait]
impl CacheStore for PgStore {
    async fn get_entry(&self, key: &str) -> Result<Option<CacheEntry>, DbError> {
        let row = sqlx::query_as::<_, CacheRow>(
            "SELECT key, payload, cached_at, ttl_hours FROM vendor_cache WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| CacheEntry {
            key: r.key,
            payload: r.payload,
            cached_at: r.cached_at,
            ttl_hours: u32::try_from(r.ttl_hours).unwrap_or(0),
        }))
    }

    async fn put_entry(&self, entry: &CacheEntry) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO vendor_cache (key, payload, cached_at, ttl_hours) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (key) DO UPDATE SET \
               payload = EXCLUDED.payload, \
               cached_at = EXCLUDED.cached_at, \
               ttl_hours = EXCLUDED.ttl_hours",
        )
        .bind(&entry.key)
        .bind(&entry.payload)
        .bind(entry.cached_at)
        .bind(i32::try_from(entry.ttl_hours).unwrap_or(i32::MAX))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
