use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One hotel entry from the vendor catalog.
///
/// Produced transiently while reading the catalog; never stored as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub hotel_id: String,
    pub name: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub star_rating: Option<f64>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub address: Option<String>,
}

impl CatalogRecord {
    #[must_use]
    pub fn has_coordinates(&self) -> bool {
        matches!((self.lat, self.lng), (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite())
    }

    /// Upper-cased ISO country code, if present.
    #[must_use]
    pub fn country_code(&self) -> Option<String> {
        self.country
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_ascii_uppercase)
    }
}

/// A hotel in the curated set, keyed by `hotel_id`.
///
/// Writes are merges: re-seeding an existing id refreshes the catalog fields
/// and `updated_at` without touching `seeded_at` or enrichment fields the
/// new write does not carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuratedHotelRecord {
    pub hotel_id: String,
    pub name: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub star_rating: Option<f64>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub address: Option<String>,
    pub hero_image: Option<String>,
    pub description: Option<String>,
    pub facility_count: Option<i32>,
    pub source: String,
    pub seeded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CuratedHotelRecord {
    #[must_use]
    pub fn from_catalog(record: CatalogRecord, source: &str, now: DateTime<Utc>) -> Self {
        let country = record.country_code();
        Self {
            hotel_id: record.hotel_id,
            name: record.name,
            city: record.city,
            country,
            star_rating: record.star_rating,
            lat: record.lat,
            lng: record.lng,
            address: record.address,
            hero_image: None,
            description: None,
            facility_count: None,
            source: source.to_string(),
            seeded_at: now,
            updated_at: now,
        }
    }
}

/// Detail fields merged into a curated hotel by the enrichment pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotelEnrichment {
    pub hotel_id: String,
    pub hero_image: Option<String>,
    pub description: Option<String>,
    pub facility_count: Option<i32>,
}

impl HotelEnrichment {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hero_image.is_none() && self.description.is_none() && self.facility_count.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_code_is_trimmed_and_uppercased() {
        let record = CatalogRecord {
            hotel_id: "H1".into(),
            country: Some(" ae ".into()),
            ..CatalogRecord::default()
        };
        assert_eq!(record.country_code().as_deref(), Some("AE"));
    }

    #[test]
    fn has_coordinates_requires_both_finite() {
        let mut record = CatalogRecord {
            hotel_id: "H1".into(),
            lat: Some(25.2),
            ..CatalogRecord::default()
        };
        assert!(!record.has_coordinates());
        record.lng = Some(f64::NAN);
        assert!(!record.has_coordinates());
        record.lng = Some(55.3);
        assert!(record.has_coordinates());
    }
}
