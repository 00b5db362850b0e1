use concierge_core::RunError;
use concierge_db::DbError;
use concierge_vendor::{CatalogError, VendorError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Vendor(#[from] VendorError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("store error: {0}")]
    Db(#[from] DbError),

    /// The buffered seeding path ran past its wall-clock budget.
    #[error("seeding exceeded its {budget_ms} ms budget during {stage}")]
    SeedTimeout { stage: &'static str, budget_ms: u64 },

    /// A cached or vendor payload did not have the expected shape.
    #[error("invalid {context} payload: {source}")]
    Payload {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl SyncError {
    /// Stable machine-readable classification.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::Vendor(e) => e.code(),
            SyncError::Catalog(e) => e.code(),
            SyncError::Db(_) => "store_error",
            SyncError::SeedTimeout { .. } => "seed_timeout",
            SyncError::Payload { .. } => "decode_error",
        }
    }

    #[must_use]
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            SyncError::Vendor(e) => e.upstream_status(),
            _ => None,
        }
    }

    /// The error as recorded on a seed run.
    #[must_use]
    pub fn to_run_error(&self) -> RunError {
        RunError {
            code: self.code().to_string(),
            message: self.to_string(),
            upstream_status: self.upstream_status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_error_carries_code_and_status() {
        let err = SyncError::from(VendorError::Server {
            status: 503,
            path: "/hotels".to_string(),
        });
        let recorded = err.to_run_error();
        assert_eq!(recorded.code, "server_error");
        assert_eq!(recorded.upstream_status, Some(503));
    }

    #[test]
    fn seed_timeout_has_its_own_code() {
        let err = SyncError::SeedTimeout {
            stage: "writing",
            budget_ms: 1_000,
        };
        assert_eq!(err.code(), "seed_timeout");
        assert!(err.to_string().contains("writing"));
    }
}
