//! Task store configuration.

use serde::{Deserialize, Serialize};

/// Top-level task store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store provider type: `"redis"` or `"memory"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Seconds a worker blocks waiting for a task before re-checking shutdown.
    #[serde(default = "default_claim_wait")]
    pub claim_wait_seconds: u64,
    /// Default maximum attempts for submitted tasks.
    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: u32,
    /// Seconds a claimed task may sit in processing before the reaper reclaims it.
    #[serde(default = "default_orphan_timeout")]
    pub orphan_timeout_seconds: u64,
    /// Hours a terminal task record is retained before the cleanup sweep drops it.
    #[serde(default = "default_result_retention")]
    pub result_retention_hours: u64,
    /// Redis-specific store configuration.
    #[serde(default)]
    pub redis: RedisStoreConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            claim_wait_seconds: default_claim_wait(),
            default_max_attempts: default_max_attempts(),
            orphan_timeout_seconds: default_orphan_timeout(),
            result_retention_hours: default_result_retention(),
            redis: RedisStoreConfig::default(),
        }
    }
}

/// Redis store backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisStoreConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Key prefix for all ScrapeHub store keys.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_provider() -> String {
    "redis".to_string()
}

fn default_claim_wait() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_orphan_timeout() -> u64 {
    600
}

fn default_result_retention() -> u64 {
    24
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "scrapehub:".to_string()
}
