use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::PgStore;
use crate::stores::LeaseStore;
use crate::DbError;

#[async_trait]
impl LeaseStore for PgStore {
    async fn try_acquire_lease(
        &self,
        name: &str,
        holder: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<bool, DbError> {
        // The conditional DO UPDATE makes check-and-take a single statement:
        // a live lease yields no row.
        let acquired = sqlx::query_scalar::<_, String>(
            "INSERT INTO seed_leases (name, holder, expires_at) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (name) DO UPDATE SET \
               holder = EXCLUDED.holder, \
               expires_at = EXCLUDED.expires_at \
             WHERE seed_leases.expires_at <= $4 \
             RETURNING name",
        )
        .bind(name)
        .bind(holder)
        .bind(now + ttl)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(acquired.is_some())
    }

    async fn release_lease(&self, name: &str, holder: &str) -> Result<(), DbError> {
        sqlx::query("DELETE FROM seed_leases WHERE name = $1 AND holder = $2")
            .bind(name)
            .bind(holder)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
