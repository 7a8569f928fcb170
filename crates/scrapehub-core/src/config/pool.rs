//! Session pool configuration.

use serde::{Deserialize, Serialize};

/// Portal session pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of live portal sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Absolute session lifetime in minutes, regardless of activity.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_minutes: u64,
    /// Idle timeout in minutes before a session is considered stale.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_minutes: u64,
    /// Idle minutes after which maintenance soft-refreshes a still-valid session.
    #[serde(default = "default_refresh_after_idle")]
    pub refresh_after_idle_minutes: u64,
    /// Interval in seconds between maintenance sweeps.
    #[serde(default = "default_maintenance_interval")]
    pub maintenance_interval_seconds: u64,
    /// Attempts to create a session before giving up on a lease.
    #[serde(default = "default_create_retries")]
    pub create_retries: u32,
    /// Base delay in milliseconds between creation attempts (grows per attempt).
    #[serde(default = "default_create_retry_delay")]
    pub create_retry_delay_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            session_ttl_minutes: default_session_ttl(),
            idle_timeout_minutes: default_idle_timeout(),
            refresh_after_idle_minutes: default_refresh_after_idle(),
            maintenance_interval_seconds: default_maintenance_interval(),
            create_retries: default_create_retries(),
            create_retry_delay_ms: default_create_retry_delay(),
        }
    }
}

fn default_max_sessions() -> usize {
    10
}

fn default_session_ttl() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    10
}

fn default_refresh_after_idle() -> u64 {
    5
}

fn default_maintenance_interval() -> u64 {
    60
}

fn default_create_retries() -> u32 {
    3
}

fn default_create_retry_delay() -> u64 {
    5000
}
