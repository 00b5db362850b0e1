use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Connection and policy settings for the hotel-inventory vendor.
///
/// Credentials are optional here so that commands which never touch the
/// vendor (migrations, curated reads) can run without them. The gateway
/// refuses to construct when either is missing.
#[derive(Clone)]
pub struct VendorSettings {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub default_timeout_ms: u64,
    pub max_timeout_ms: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub user_agent: String,
}

impl std::fmt::Debug for VendorSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendorSettings")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .field("default_timeout_ms", &self.default_timeout_ms)
            .field("max_timeout_ms", &self.max_timeout_ms)
            .field("max_retries", &self.max_retries)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub curation_path: PathBuf,
    pub vendor: VendorSettings,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub search_sweep_enabled: bool,
    pub search_fallback_nationalities: Vec<String>,
    pub catalog_cache_ttl_hours: u32,
    pub details_cache_ttl_hours: u32,
    pub seed_hard_timeout_ms: u64,
    pub seed_budget_ms: u64,
    pub seed_cooldown_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("curation_path", &self.curation_path)
            .field("database_url", &"[redacted]")
            .field("vendor", &self.vendor)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("search_sweep_enabled", &self.search_sweep_enabled)
            .field(
                "search_fallback_nationalities",
                &self.search_fallback_nationalities,
            )
            .field("catalog_cache_ttl_hours", &self.catalog_cache_ttl_hours)
            .field("details_cache_ttl_hours", &self.details_cache_ttl_hours)
            .field("seed_hard_timeout_ms", &self.seed_hard_timeout_ms)
            .field("seed_budget_ms", &self.seed_budget_ms)
            .field("seed_cooldown_secs", &self.seed_cooldown_secs)
            .finish()
    }
}
