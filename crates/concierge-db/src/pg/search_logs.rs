use async_trait::async_trait;
use concierge_core::SearchLog;
use sqlx::types::Json;

use super::PgStore;
use crate::stores::SearchLogStore;
use crate::DbError;

#[async_trait]
impl SearchLogStore for PgStore {
    async fn insert_search_log(&self, log: &SearchLog) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO search_logs \
               (id, hotel_ids, checkin, checkout, room_count, requested_nationality, \
                used_nationality, fallback_hit, attempts, result_count, error_code, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(log.id)
        .bind(&log.hotel_ids)
        .bind(log.checkin)
        .bind(log.checkout)
        .bind(i32::try_from(log.room_count).unwrap_or(i32::MAX))
        .bind(&log.requested_nationality)
        .bind(&log.used_nationality)
        .bind(log.fallback_hit)
        .bind(Json(&log.attempts))
        .bind(i32::try_from(log.result_count).unwrap_or(i32::MAX))
        .bind(&log.error_code)
        .bind(log.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
