//! Retry/fallback supervisor configuration.

use serde::{Deserialize, Serialize};

/// Supervisor configuration for executing operations over pooled sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Attempts per execution before the failure is propagated.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Execution timeout in seconds for a single operation attempt.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_seconds: u64,
    /// Base backoff in milliseconds after an unclassified failure (grows per attempt).
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            operation_timeout_seconds: default_operation_timeout(),
            backoff_base_ms: default_backoff_base(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_operation_timeout() -> u64 {
    300
}

fn default_backoff_base() -> u64 {
    500
}
