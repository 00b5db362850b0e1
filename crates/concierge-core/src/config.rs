use crate::app_config::{AppConfig, Environment, VendorSettings};
use crate::ConfigError;

const DEFAULT_FALLBACK_NATIONALITIES: &str = "US,GB,DE,FR,AE";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Load configuration for runs that use the in-memory store.
///
/// Same as [`load_app_config`] except that a missing `DATABASE_URL` is
/// accepted and left empty.
///
/// # Errors
///
/// Returns `ConfigError` if values that are present are invalid.
pub fn load_app_config_in_memory() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    build_app_config(without_database(|key| std::env::var(key)))
}

fn without_database<F>(lookup: F) -> impl Fn(&str) -> Result<String, std::env::VarError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    move |key| match lookup(key) {
        Err(_) if key == "DATABASE_URL" => Ok(String::new()),
        other => other,
    }
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
        }
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("CONCIERGE_ENV", "development"))?;
    let bind_addr = parse_addr("CONCIERGE_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("CONCIERGE_LOG_LEVEL", "info");
    let curation_path = PathBuf::from(or_default(
        "CONCIERGE_CURATION_PATH",
        "./config/curation.yaml",
    ));

    let vendor = VendorSettings {
        base_url: or_default("CONCIERGE_VENDOR_BASE_URL", "https://api.hotel-vendor.example/v1"),
        username: optional("CONCIERGE_VENDOR_USERNAME"),
        password: optional("CONCIERGE_VENDOR_PASSWORD"),
        default_timeout_ms: parse_u64("CONCIERGE_VENDOR_TIMEOUT_MS", "30000")?,
        max_timeout_ms: parse_u64("CONCIERGE_VENDOR_MAX_TIMEOUT_MS", "60000")?,
        max_retries: parse_u32("CONCIERGE_VENDOR_MAX_RETRIES", "2")?,
        backoff_base_ms: parse_u64("CONCIERGE_VENDOR_BACKOFF_BASE_MS", "500")?,
        user_agent: or_default("CONCIERGE_VENDOR_USER_AGENT", "concierge-sync/0.1"),
    };

    if vendor.max_timeout_ms < vendor.default_timeout_ms {
        return Err(invalid(
            "CONCIERGE_VENDOR_MAX_TIMEOUT_MS",
            format!(
                "must be >= CONCIERGE_VENDOR_TIMEOUT_MS ({})",
                vendor.default_timeout_ms
            ),
        ));
    }

    let db_max_connections = parse_u32("CONCIERGE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("CONCIERGE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("CONCIERGE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let search_sweep_enabled = parse_bool("CONCIERGE_SEARCH_SWEEP", "true")?;
    let search_fallback_nationalities = parse_code_list(&or_default(
        "CONCIERGE_SEARCH_FALLBACK_NATIONALITIES",
        DEFAULT_FALLBACK_NATIONALITIES,
    ));

    let catalog_cache_ttl_hours = parse_u32("CONCIERGE_CATALOG_CACHE_TTL_HOURS", "24")?;
    let details_cache_ttl_hours = parse_u32("CONCIERGE_DETAILS_CACHE_TTL_HOURS", "168")?;

    let seed_hard_timeout_ms = parse_u64("CONCIERGE_SEED_HARD_TIMEOUT_MS", "240000")?;
    let seed_budget_ms = parse_u64("CONCIERGE_SEED_BUDGET_MS", "240000")?;
    let seed_cooldown_secs = parse_u64("CONCIERGE_SEED_COOLDOWN_SECS", "900")?;

    if seed_hard_timeout_ms == 0 {
        return Err(invalid(
            "CONCIERGE_SEED_HARD_TIMEOUT_MS",
            "must be greater than zero".to_string(),
        ));
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        curation_path,
        vendor,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        search_sweep_enabled,
        search_fallback_nationalities,
        catalog_cache_ttl_hours,
        details_cache_ttl_hours,
        seed_hard_timeout_ms,
        seed_budget_ms,
        seed_cooldown_secs,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CONCIERGE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

/// Split a comma-separated list of ISO codes, upper-casing and dropping blanks.
fn parse_code_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_ascii_uppercase)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
