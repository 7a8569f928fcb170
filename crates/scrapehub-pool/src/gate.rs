//! Global concurrency gate bounding in-flight portal operations.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::debug;

use scrapehub_core::config::gate::GateConfig;
use scrapehub_core::error::AppError;
use scrapehub_core::result::AppResult;
use scrapehub_core::types::GateStats;

#[derive(Debug, Default)]
struct GateCounters {
    active: AtomicUsize,
    queued: AtomicUsize,
    total: AtomicU64,
    failed: AtomicU64,
}

/// Admission ticket for one portal operation.
///
/// Held for the full supervised execution; dropping it frees the slot.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    counters: Arc<GateCounters>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Semaphore-bounded admission control over portal operations.
///
/// Callers beyond `max_concurrent` queue rather than fail, bounded by
/// the acquire timeout.
#[derive(Debug)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    acquire_timeout: Duration,
    max_concurrent: usize,
    counters: Arc<GateCounters>,
}

impl ConcurrencyGate {
    /// Create a gate from configuration.
    pub fn new(config: &GateConfig) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            acquire_timeout: Duration::from_secs(config.acquire_timeout_seconds),
            max_concurrent: config.max_concurrent,
            counters: Arc::new(GateCounters::default()),
        }
    }

    /// Wait for an admission slot.
    ///
    /// Returns [`ErrorKind::GateTimeout`](scrapehub_core::error::ErrorKind::GateTimeout)
    /// when no slot frees up within the acquire timeout.
    pub async fn acquire(&self) -> AppResult<GatePermit> {
        self.counters.queued.fetch_add(1, Ordering::SeqCst);
        let acquired = timeout(
            self.acquire_timeout,
            self.semaphore.clone().acquire_owned(),
        )
        .await;
        self.counters.queued.fetch_sub(1, Ordering::SeqCst);

        match acquired {
            Err(_) => Err(AppError::gate_timeout(format!(
                "No gate slot freed within {}s",
                self.acquire_timeout.as_secs()
            ))),
            Ok(Err(_)) => Err(AppError::internal("Gate semaphore closed")),
            Ok(Ok(permit)) => {
                self.counters.active.fetch_add(1, Ordering::SeqCst);
                self.counters.total.fetch_add(1, Ordering::SeqCst);
                debug!(
                    active = self.counters.active.load(Ordering::SeqCst),
                    "Gate slot acquired"
                );
                Ok(GatePermit {
                    _permit: permit,
                    counters: self.counters.clone(),
                })
            }
        }
    }

    /// Count one admitted operation as failed.
    pub fn record_failure(&self) {
        self.counters.failed.fetch_add(1, Ordering::SeqCst);
    }

    /// Point-in-time gate counters.
    pub fn stats(&self) -> GateStats {
        let total = self.counters.total.load(Ordering::SeqCst);
        let failed = self.counters.failed.load(Ordering::SeqCst);
        let success_rate = if total > 0 {
            (total - failed.min(total)) as f64 / total as f64 * 100.0
        } else {
            100.0
        };

        GateStats {
            max_concurrent: self.max_concurrent,
            active: self.counters.active.load(Ordering::SeqCst),
            queued: self.counters.queued.load(Ordering::SeqCst),
            total,
            failed,
            success_rate,
        }
    }
}
