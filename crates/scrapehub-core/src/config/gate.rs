//! Concurrency gate configuration.

use serde::{Deserialize, Serialize};

/// Global concurrency gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Maximum number of operations in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Seconds a caller may wait for a slot before timing out.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            acquire_timeout_seconds: default_acquire_timeout(),
        }
    }
}

fn default_max_concurrent() -> usize {
    10
}

fn default_acquire_timeout() -> u64 {
    60
}
