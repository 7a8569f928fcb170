//! Worker pool configuration.

use serde::{Deserialize, Serialize};

/// Task worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker pool is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of independent worker loops.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Seconds to wait for in-flight tasks to drain on shutdown.
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            worker_count: default_worker_count(),
            drain_timeout_seconds: default_drain_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_worker_count() -> usize {
    4
}

fn default_drain_timeout() -> u64 {
    30
}
