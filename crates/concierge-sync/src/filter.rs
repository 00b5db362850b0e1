//! Catalog filtering and grouping for the buffered seeding path.

use std::collections::{BTreeMap, HashSet};

use concierge_core::{CatalogRecord, CurationProfile};

/// Why records were dropped, for the run log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub total: usize,
    pub kept: usize,
    pub missing_id: usize,
    pub duplicate: usize,
    pub country: usize,
    pub rating: usize,
    pub coordinates: usize,
    pub unmatched_city: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Grouped {
    pub groups: BTreeMap<String, Vec<CatalogRecord>>,
    pub stats: FilterStats,
}

/// Apply the profile's filters and group survivors.
///
/// With target cities configured, records are grouped under the first
/// target whose name or alias matches and unmatched records are dropped.
/// Without targets, records are grouped by country code.
#[must_use]
pub fn filter_and_group(records: Vec<CatalogRecord>, profile: &CurationProfile) -> Grouped {
    let countries = profile.country_set();
    let mut seen = HashSet::new();
    let mut out = Grouped::default();

    for record in records {
        out.stats.total += 1;
        if record.hotel_id.trim().is_empty() {
            out.stats.missing_id += 1;
            continue;
        }
        let Some(country) = record.country_code().filter(|c| countries.contains(c)) else {
            out.stats.country += 1;
            continue;
        };
        if let Some(min) = profile.min_star_rating {
            if record.star_rating.is_none_or(|stars| stars < min) {
                out.stats.rating += 1;
                continue;
            }
        }
        if profile.require_coordinates && !record.has_coordinates() {
            out.stats.coordinates += 1;
            continue;
        }

        let group = if profile.target_cities.is_empty() {
            country.clone()
        } else {
            let city = record.city.as_deref().unwrap_or_default();
            match profile
                .target_cities
                .iter()
                .find(|t| t.matches(city, Some(&country)))
            {
                Some(target) => target.key(),
                None => {
                    out.stats.unmatched_city += 1;
                    continue;
                }
            }
        };
        if !seen.insert(record.hotel_id.clone()) {
            out.stats.duplicate += 1;
            continue;
        }
        out.stats.kept += 1;
        out.groups.entry(group).or_default().push(record);
    }
    out
}
