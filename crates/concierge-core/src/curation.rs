use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A city the curated set should cover, matched against catalog records by
/// normalized name (or any alias).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetCity {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl TargetCity {
    /// Stable group key for sampling: the normalized primary name.
    #[must_use]
    pub fn key(&self) -> String {
        normalize_place(&self.name)
    }

    /// Whether a record's city (and optionally country) matches this target.
    #[must_use]
    pub fn matches(&self, city: &str, country: Option<&str>) -> bool {
        if let (Some(expected), Some(actual)) = (self.country.as_deref(), country) {
            if !expected.eq_ignore_ascii_case(actual.trim()) {
                return false;
            }
        }
        let city = normalize_place(city);
        if city.is_empty() {
            return false;
        }
        city == self.key() || self.aliases.iter().any(|a| normalize_place(a) == city)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamLimits {
    pub per_group_limit: usize,
    pub overall_limit: usize,
}

impl Default for StreamLimits {
    fn default() -> Self {
        Self {
            per_group_limit: 50,
            overall_limit: 500,
        }
    }
}

/// Filters and limits that shape the curated hotel set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurationProfile {
    pub allowed_countries: Vec<String>,
    #[serde(default)]
    pub target_cities: Vec<TargetCity>,
    #[serde(default)]
    pub min_star_rating: Option<f64>,
    #[serde(default)]
    pub require_coordinates: bool,
    pub limit_per_group: usize,
    pub limit_total: usize,
    #[serde(default)]
    pub stream: StreamLimits,
}

impl CurationProfile {
    /// Upper-cased allowed country codes.
    #[must_use]
    pub fn country_set(&self) -> HashSet<String> {
        self.allowed_countries
            .iter()
            .map(|c| c.trim().to_ascii_uppercase())
            .collect()
    }
}

/// Lower-cases, strips punctuation and collapses whitespace so that
/// `"New  York-City"` and `"new york city"` compare equal.
#[must_use]
pub fn normalize_place(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Load and validate the curation profile from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_curation(path: &Path) -> Result<CurationProfile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CurationFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let profile: CurationProfile = serde_yaml::from_str(&content)?;
    validate_curation(&profile)?;
    Ok(profile)
}

fn validate_curation(profile: &CurationProfile) -> Result<(), ConfigError> {
    if profile.allowed_countries.is_empty() {
        return Err(ConfigError::Validation(
            "allowed_countries must list at least one country code".to_string(),
        ));
    }

    for code in &profile.allowed_countries {
        let code = code.trim();
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::Validation(format!(
                "invalid country code '{code}'; expected ISO 3166-1 alpha-2"
            )));
        }
    }

    if profile.limit_per_group == 0 || profile.limit_total == 0 {
        return Err(ConfigError::Validation(
            "limit_per_group and limit_total must be greater than zero".to_string(),
        ));
    }

    if profile.stream.per_group_limit == 0 || profile.stream.overall_limit == 0 {
        return Err(ConfigError::Validation(
            "stream limits must be greater than zero".to_string(),
        ));
    }

    if let Some(min) = profile.min_star_rating {
        if !(0.0..=5.0).contains(&min) {
            return Err(ConfigError::Validation(format!(
                "min_star_rating {min} is outside 0..=5"
            )));
        }
    }

    let mut seen = HashSet::new();
    for city in &profile.target_cities {
        let key = city.key();
        if key.is_empty() {
            return Err(ConfigError::Validation(
                "target city name must be non-empty".to_string(),
            ));
        }
        if !seen.insert(key.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate target city: '{}'",
                city.name
            )));
        }
    }

    Ok(())
}
