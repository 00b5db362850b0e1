use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concierge_core::{RunError, RunStatus, SeedRun, SeedStage};
use sqlx::types::Json;
use uuid::Uuid;

use super::{from_db_count, to_db_count, PgStore};
use crate::stores::RunStore;
use crate::DbError;

/// A row from the `seed_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SeedRunRow {
    pub run_id: Uuid,
    pub mode: String,
    pub status: String,
    pub stage: String,
    pub processed: i64,
    pub total: Option<i64>,
    pub per_group_counts: Json<BTreeMap<String, u64>>,
    pub seeded_count: i64,
    pub inserted_count: i64,
    pub updated_count: i64,
    pub aborted_early: bool,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub upstream_status: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SeedRunRow> for SeedRun {
    type Error = DbError;

    fn try_from(row: SeedRunRow) -> Result<Self, Self::Error> {
        let status = RunStatus::parse(&row.status).ok_or_else(|| DbError::Corrupt {
            column: "seed_runs.status",
            value: row.status.clone(),
        })?;
        let stage = SeedStage::parse(&row.stage).ok_or_else(|| DbError::Corrupt {
            column: "seed_runs.stage",
            value: row.stage.clone(),
        })?;
        let last_error = row.error_code.map(|code| RunError {
            code,
            message: row.error_message.unwrap_or_default(),
            upstream_status: row.upstream_status.and_then(|s| u16::try_from(s).ok()),
        });
        Ok(SeedRun {
            run_id: row.run_id,
            mode: row.mode,
            status,
            stage,
            processed: from_db_count(row.processed),
            total: row.total.map(from_db_count),
            per_group_counts: row.per_group_counts.0,
            seeded_count: from_db_count(row.seeded_count),
            inserted_count: from_db_count(row.inserted_count),
            updated_count: from_db_count(row.updated_count),
            aborted_early: row.aborted_early,
            last_error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = "run_id, mode, status, stage, processed, total, per_group_counts, \
     seeded_count, inserted_count, updated_count, aborted_early, error_code, error_message, \
     upstream_status, created_at, updated_at";

#[async_trait]
impl RunStore for PgStore {
    async fn insert_run(&self, run: &SeedRun) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO seed_runs \
               (run_id, mode, status, stage, processed, total, per_group_counts, \
                seeded_count, inserted_count, updated_count, aborted_early, \
                error_code, error_message, upstream_status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(run.run_id)
        .bind(&run.mode)
        .bind(run.status.as_str())
        .bind(run.stage.as_str())
        .bind(to_db_count(run.processed))
        .bind(run.total.map(to_db_count))
        .bind(Json(&run.per_group_counts))
        .bind(to_db_count(run.seeded_count))
        .bind(to_db_count(run.inserted_count))
        .bind(to_db_count(run.updated_count))
        .bind(run.aborted_early)
        .bind(run.last_error.as_ref().map(|e| e.code.as_str()))
        .bind(run.last_error.as_ref().map(|e| e.message.as_str()))
        .bind(
            run.last_error
                .as_ref()
                .and_then(|e| e.upstream_status)
                .map(i32::from),
        )
        .bind(run.created_at)
        .bind(run.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_run(&self, run: &SeedRun) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE seed_runs SET \
               status = $2, stage = $3, processed = $4, total = $5, per_group_counts = $6, \
               seeded_count = $7, inserted_count = $8, updated_count = $9, aborted_early = $10, \
               error_code = $11, error_message = $12, upstream_status = $13, updated_at = $14 \
             WHERE run_id = $1",
        )
        .bind(run.run_id)
        .bind(run.status.as_str())
        .bind(run.stage.as_str())
        .bind(to_db_count(run.processed))
        .bind(run.total.map(to_db_count))
        .bind(Json(&run.per_group_counts))
        .bind(to_db_count(run.seeded_count))
        .bind(to_db_count(run.inserted_count))
        .bind(to_db_count(run.updated_count))
        .bind(run.aborted_early)
        .bind(run.last_error.as_ref().map(|e| e.code.as_str()))
        .bind(run.last_error.as_ref().map(|e| e.message.as_str()))
        .bind(
            run.last_error
                .as_ref()
                .and_then(|e| e.upstream_status)
                .map(i32::from),
        )
        .bind(run.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn get_run(&self, run_id: Uuid) -> Result<Option<SeedRun>, DbError> {
        let row = sqlx::query_as::<_, SeedRunRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM seed_runs WHERE run_id = $1"
        ))
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(SeedRun::try_from).transpose()
    }

    async fn latest_active_run(&self) -> Result<Option<SeedRun>, DbError> {
        let row = sqlx::query_as::<_, SeedRunRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM seed_runs \
             WHERE status IN ('queued', 'running') \
             ORDER BY created_at DESC \
             LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        row.map(SeedRun::try_from).transpose()
    }

    async fn list_runs(&self, limit: u32) -> Result<Vec<SeedRun>, DbError> {
        let rows = sqlx::query_as::<_, SeedRunRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM seed_runs ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(SeedRun::try_from).collect()
    }
}
