//! Incremental catalog reading.
//!
//! [`CatalogStream::spawn`] runs the blocking pull parser on the blocking
//! thread pool and hands records to async code over a bounded channel, so a
//! slow consumer applies back-pressure all the way to the socket and memory
//! stays bounded by the channel capacity plus one record.

mod fields;
mod reader;

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use concierge_core::CatalogRecord;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::codec::ContentEncoding;
use reader::CatalogReader;

pub(crate) use fields::RecordFields;

/// Records buffered between the parser thread and the consumer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to decode {encoding} catalog stream: {message}")]
    Decompression { encoding: String, message: String },

    #[error("catalog stream transport failed: {0}")]
    Transport(String),

    #[error("malformed catalog JSON: {0}")]
    Json(String),
}

impl CatalogError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::Decompression { .. } => "decompression_error",
            CatalogError::Transport(_) => "network_error",
            CatalogError::Json(_) => "decode_error",
        }
    }
}

/// Counters reported by the parser thread when it exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    pub emitted: u64,
    pub skipped: u64,
}

/// A lazy, finite, non-restartable sequence of catalog records.
pub struct CatalogStream {
    rx: mpsc::Receiver<Result<CatalogRecord, CatalogError>>,
    handle: JoinHandle<ReaderStats>,
    cancel: CancellationToken,
}

impl CatalogStream {
    /// Start parsing `source` (encoded as `encoding`) on the blocking pool.
    ///
    /// `cancel` is observed between records; the HTTP layer also wires it to
    /// the byte source so a cancelled stream stops even mid-read.
    pub fn spawn<R>(
        source: R,
        encoding: ContentEncoding,
        capacity: usize,
        cancel: CancellationToken,
    ) -> Self
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker_cancel = cancel.clone();
        let handle = tokio::task::spawn_blocking(move || {
            parse_into_channel(source, encoding, &tx, &worker_cancel)
        });
        Self { rx, handle, cancel }
    }

    /// Next record in source order, or `None` once the catalog array ends.
    pub async fn next(&mut self) -> Option<Result<CatalogRecord, CatalogError>> {
        self.rx.recv().await
    }

    /// Signal the parser (and the byte source) to stop.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop the parser and wait up to `grace` for its thread to exit.
    ///
    /// Returns `None` if the thread is still blocked after `grace`; it is
    /// detached and will exit on its next read or send.
    pub async fn close(self, grace: Duration) -> Option<ReaderStats> {
        self.cancel.cancel();
        drop(self.rx);
        match tokio::time::timeout(grace, self.handle).await {
            Ok(Ok(stats)) => Some(stats),
            Ok(Err(join_err)) => {
                tracing::error!(error = %join_err, "catalog parser thread panicked");
                None
            }
            Err(_) => {
                tracing::warn!(
                    grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                    "catalog parser did not stop within grace period; detaching"
                );
                None
            }
        }
    }
}

/// Records read errors at one layer of the source stack.
struct Tracked<R> {
    inner: R,
    failed: Arc<AtomicBool>,
}

impl<R: Read> Read for Tracked<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf).inspect_err(|_| {
            self.failed.store(true, Ordering::SeqCst);
        })
    }
}

fn parse_into_channel<R: Read + Send + 'static>(
    source: R,
    encoding: ContentEncoding,
    tx: &mpsc::Sender<Result<CatalogRecord, CatalogError>>,
    cancel: &CancellationToken,
) -> ReaderStats {
    let mut stats = ReaderStats::default();
    let transport_failed = Arc::new(AtomicBool::new(false));
    let decode_failed = Arc::new(AtomicBool::new(false));

    let raw = Tracked {
        inner: source,
        failed: Arc::clone(&transport_failed),
    };
    let decoded = match encoding.decoder(raw) {
        Ok(decoded) => decoded,
        Err(e) => {
            let err = if transport_failed.load(Ordering::SeqCst) {
                CatalogError::Transport(e.to_string())
            } else {
                CatalogError::Decompression {
                    encoding: encoding.as_str().to_string(),
                    message: e.to_string(),
                }
            };
            let _ = tx.blocking_send(Err(err));
            return stats;
        }
    };
    let mut reader = CatalogReader::new(Tracked {
        inner: decoded,
        failed: Arc::clone(&decode_failed),
    });

    loop {
        if cancel.is_cancelled() {
            break;
        }
        match reader.next_record() {
            Ok(Some(record)) => {
                stats.emitted += 1;
                if tx.blocking_send(Ok(record)).is_err() {
                    // Consumer hung up: cap reached or timed out.
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                if cancel.is_cancelled() {
                    break;
                }
                let err = if transport_failed.load(Ordering::SeqCst) {
                    CatalogError::Transport(e.to_string())
                } else if decode_failed.load(Ordering::SeqCst)
                    && encoding != ContentEncoding::Identity
                {
                    CatalogError::Decompression {
                        encoding: encoding.as_str().to_string(),
                        message: e.to_string(),
                    }
                } else {
                    CatalogError::Json(e.to_string())
                };
                let _ = tx.blocking_send(Err(err));
                break;
            }
        }
    }

    stats.skipped = reader.skipped();
    stats
}
