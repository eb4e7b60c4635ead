//! Fire-and-forget access-log ingestion
//!
//! The request path hands a descriptor to [`AccessLogIngestor::log`] and
//! moves on; persistence happens on a bounded pool of writer tasks. The
//! caller can never fail and never blocks: when the queue is full the record
//! is dropped with a warning.

use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::config::IngestionConfig;
use crate::models::CreateAccessLog;
use crate::repositories::AccessLogRepository;

/// Handle for scheduling access-log writes.
///
/// Cloning is cheap; all clones feed the same queue. Writers drain the queue
/// and exit once every handle has been dropped.
#[derive(Clone)]
pub struct AccessLogIngestor {
    tx: mpsc::Sender<CreateAccessLog>,
}

impl AccessLogIngestor {
    /// Start the writer pool and return the producer handle.
    pub fn new(pool: PgPool, config: &IngestionConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_depth);
        let rx = Arc::new(Mutex::new(rx));

        for worker in 0..config.workers {
            let rx = Arc::clone(&rx);
            let pool = pool.clone();
            tokio::spawn(async move {
                loop {
                    // Lock only long enough to pop one record
                    let record = rx.lock().await.recv().await;
                    match record {
                        Some(record) => {
                            if let Err(e) = AccessLogRepository::insert(&pool, record).await {
                                warn!(worker, error = %e, "Failed to persist access log record");
                            }
                        }
                        None => break,
                    }
                }
                debug!(worker, "Access log writer stopped");
            });
        }

        Self { tx }
    }

    /// Build an ingestor over a caller-supplied queue, without spawning
    /// writers. Lets tests observe exactly what would be persisted.
    #[cfg(test)]
    pub(crate) fn with_sender(tx: mpsc::Sender<CreateAccessLog>) -> Self {
        Self { tx }
    }

    /// Record one request.
    ///
    /// Applies the field-length caps and schedules the write. Returns
    /// immediately in every case; storage trouble and queue overflow are
    /// logged, never surfaced.
    pub fn log(&self, descriptor: CreateAccessLog) {
        let record = descriptor.truncated();

        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(record)) => {
                warn!(
                    method = %record.method,
                    path = %record.path,
                    "Access log queue full, dropping record"
                );
            }
            Err(mpsc::error::TrySendError::Closed(record)) => {
                warn!(
                    method = %record.method,
                    path = %record.path,
                    "Access log writers stopped, dropping record"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::access_log::{PATH_MAX_BYTES, URL_MAX_BYTES};

    #[tokio::test]
    async fn test_log_truncates_before_enqueue() {
        let (tx, mut rx) = mpsc::channel(4);
        let ingestor = AccessLogIngestor { tx };

        ingestor.log(CreateAccessLog::new("GET", "x".repeat(9000), "p".repeat(9000)));

        let queued = rx.recv().await.unwrap();
        assert_eq!(queued.url.len(), URL_MAX_BYTES);
        assert_eq!(queued.path.len(), PATH_MAX_BYTES);
    }

    #[tokio::test]
    async fn test_log_never_fails_on_full_queue() {
        let (tx, _rx) = mpsc::channel(1);
        let ingestor = AccessLogIngestor { tx };

        // Second record overflows the queue; both calls return normally.
        ingestor.log(CreateAccessLog::new("GET", "/a", "/a"));
        ingestor.log(CreateAccessLog::new("GET", "/b", "/b"));
    }

    #[tokio::test]
    async fn test_log_never_fails_when_writers_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let ingestor = AccessLogIngestor { tx };

        ingestor.log(CreateAccessLog::new("POST", "/orders", "/orders"));
    }
}
