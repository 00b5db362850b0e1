pub mod app_config;
pub mod cache;
pub mod clock;
pub mod config;
pub mod curation;
pub mod hotels;
pub mod runs;
pub mod search;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, VendorSettings};
pub use cache::CacheEntry;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{load_app_config, load_app_config_from_env, load_app_config_in_memory};
pub use curation::{load_curation, normalize_place, CurationProfile, StreamLimits, TargetCity};
pub use hotels::{CatalogRecord, CuratedHotelRecord, HotelEnrichment};
pub use runs::{RunError, RunStatus, SeedRun, SeedStage};
pub use search::{RoomRequest, SearchAttempt, SearchLog};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read curation profile at {path}: {source}")]
    CurationFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse curation profile: {0}")]
    CurationFileParse(#[from] serde_yaml::Error),

    #[error("curation profile validation failed: {0}")]
    Validation(String),
}
