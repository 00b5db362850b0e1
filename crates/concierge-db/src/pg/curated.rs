use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concierge_core::{CuratedHotelRecord, HotelEnrichment};

use super::{from_db_count, PgStore};
use crate::stores::{CuratedStore, UpsertSummary};
use crate::DbError;

/// A row from the `curated_hotels` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct CuratedHotelRow {
    hotel_id: String,
    name: String,
    city: Option<String>,
    country: Option<String>,
    star_rating: Option<f64>,
    lat: Option<f64>,
    lng: Option<f64>,
    address: Option<String>,
    hero_image: Option<String>,
    description: Option<String>,
    facility_count: Option<i32>,
    source: String,
    seeded_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CuratedHotelRow> for CuratedHotelRecord {
    fn from(row: CuratedHotelRow) -> Self {
        Self {
            hotel_id: row.hotel_id,
            name: row.name,
            city: row.city,
            country: row.country,
            star_rating: row.star_rating,
            lat: row.lat,
            lng: row.lng,
            address: row.address,
            hero_image: row.hero_image,
            description: row.description,
            facility_count: row.facility_count,
            source: row.source,
            seeded_at: row.seeded_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_COLUMNS: &str = "hotel_id, name, city, country, star_rating, lat, lng, address, \
     hero_image, description, facility_count, source, seeded_at, updated_at";

#[async_trait]
impl CuratedStore for PgStore {
    async fn upsert_hotels(&self, hotels: &[CuratedHotelRecord]) -> Result<UpsertSummary, DbError> {
        let mut summary = UpsertSummary::default();
        if hotels.is_empty() {
            return Ok(summary);
        }

        let mut tx = self.pool.begin().await?;
        for hotel in hotels {
            // `xmax = 0` holds only for a freshly inserted tuple.
            let inserted: bool = sqlx::query_scalar(
                "INSERT INTO curated_hotels \
                   (hotel_id, name, city, country, star_rating, lat, lng, address, \
                    hero_image, description, facility_count, source, seeded_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
                 ON CONFLICT (hotel_id) DO UPDATE SET \
                   name = EXCLUDED.name, \
                   city = EXCLUDED.city, \
                   country = EXCLUDED.country, \
                   star_rating = EXCLUDED.star_rating, \
                   lat = EXCLUDED.lat, \
                   lng = EXCLUDED.lng, \
                   address = EXCLUDED.address, \
                   hero_image = COALESCE(EXCLUDED.hero_image, curated_hotels.hero_image), \
                   description = COALESCE(EXCLUDED.description, curated_hotels.description), \
                   facility_count = COALESCE(EXCLUDED.facility_count, curated_hotels.facility_count), \
                   source = EXCLUDED.source, \
                   updated_at = EXCLUDED.updated_at \
                 RETURNING (xmax = 0) AS inserted",
            )
            .bind(&hotel.hotel_id)
            .bind(&hotel.name)
            .bind(&hotel.city)
            .bind(&hotel.country)
            .bind(hotel.star_rating)
            .bind(hotel.lat)
            .bind(hotel.lng)
            .bind(&hotel.address)
            .bind(&hotel.hero_image)
            .bind(&hotel.description)
            .bind(hotel.facility_count)
            .bind(&hotel.source)
            .bind(hotel.seeded_at)
            .bind(hotel.updated_at)
            .fetch_one(&mut *tx)
            .await?;

            if inserted {
                summary.inserted += 1;
            } else {
                summary.updated += 1;
            }
        }
        tx.commit().await?;

        Ok(summary)
    }

    async fn apply_enrichment(
        &self,
        details: &[HotelEnrichment],
        now: DateTime<Utc>,
    ) -> Result<u64, DbError> {
        let mut touched = 0u64;
        let mut tx = self.pool.begin().await?;
        for detail in details.iter().filter(|d| !d.is_empty()) {
            let result = sqlx::query(
                "UPDATE curated_hotels SET \
                   hero_image = COALESCE($2, hero_image), \
                   description = COALESCE($3, description), \
                   facility_count = COALESCE($4, facility_count), \
                   updated_at = $5 \
                 WHERE hotel_id = $1",
            )
            .bind(&detail.hotel_id)
            .bind(&detail.hero_image)
            .bind(&detail.description)
            .bind(detail.facility_count)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            touched += result.rows_affected();
        }
        tx.commit().await?;
        Ok(touched)
    }

    async fn ids_missing_hero_image(&self, hotel_ids: &[String]) -> Result<Vec<String>, DbError> {
        if hotel_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT hotel_id FROM curated_hotels \
             WHERE hotel_id = ANY($1) AND (hero_image IS NULL OR hero_image = '') \
             ORDER BY hotel_id",
        )
        .bind(hotel_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn list_hotels(
        &self,
        limit: u32,
        after: Option<&str>,
    ) -> Result<Vec<CuratedHotelRecord>, DbError> {
        let rows = sqlx::query_as::<_, CuratedHotelRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM curated_hotels \
             WHERE ($2::TEXT IS NULL OR hotel_id > $2) \
             ORDER BY hotel_id \
             LIMIT $1"
        ))
        .bind(i64::from(limit))
        .bind(after)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CuratedHotelRecord::from).collect())
    }

    async fn count_hotels(&self) -> Result<u64, DbError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM curated_hotels")
            .fetch_one(&self.pool)
            .await?;
        Ok(from_db_count(count))
    }
}
