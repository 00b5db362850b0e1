//! Retry with exponential back-off and jitter for vendor calls.
//!
//! Only calls the caller marks as safe (idempotent reads) go through
//! [`retry_with_backoff`]. Transient failures are retried; every 4xx and
//! every malformed payload is returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::VendorError;

/// Returns `true` for errors worth retrying after a back-off delay.
///
/// Retriable: transport failures with no status, client-side timeouts, and
/// 5xx responses. Everything carrying a 4xx status (including 408) and all
/// decode failures are final.
pub(crate) fn is_retriable(err: &VendorError) -> bool {
    match err {
        VendorError::Http(e) => e.status().is_none_or(|s| s.is_server_error()),
        VendorError::Timeout { status, .. } => status.is_none(),
        VendorError::Server { .. } => true,
        VendorError::Config(_)
        | VendorError::Auth { .. }
        | VendorError::BadRequest { .. }
        | VendorError::NotFound { .. }
        | VendorError::Api { .. }
        | VendorError::Deserialize { .. }
        | VendorError::Decompression { .. } => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// The delay before retry `n` is `backoff_base_ms × 2^(n-1)` with ±25 % jitter,
/// capped at 30 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, VendorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, VendorError>>,
{
    const MAX_DELAY_MS: u64 = 30_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    code = err.code(),
                    error = %err,
                    "vendor transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn server_error() -> VendorError {
        VendorError::Server {
            status: 503,
            path: "/search".to_owned(),
        }
    }

    #[test]
    fn four_xx_is_not_retriable() {
        assert!(!is_retriable(&VendorError::Auth {
            status: 401,
            path: "/search".into()
        }));
        assert!(!is_retriable(&VendorError::NotFound {
            path: "/hotels".into()
        }));
        assert!(!is_retriable(&VendorError::Timeout {
            status: Some(408),
            path: "/search".into()
        }));
    }

    #[test]
    fn client_timeout_and_5xx_are_retriable() {
        assert!(is_retriable(&server_error()));
        assert!(is_retriable(&VendorError::Timeout {
            status: None,
            path: "/search".into()
        }));
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt < 3 {
                    Err(server_error())
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(server_error())
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(VendorError::Server { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_bad_request() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(VendorError::BadRequest {
                    status: 400,
                    path: "/search".into(),
                    message: "bad dates".into(),
                })
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1, "4xx must not be retried");
        assert!(matches!(result, Err(VendorError::BadRequest { .. })));
    }
}
