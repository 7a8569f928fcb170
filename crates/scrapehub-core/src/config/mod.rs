//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod gate;
pub mod logging;
pub mod pool;
pub mod portal;
pub mod store;
pub mod supervisor;
pub mod worker;

use serde::{Deserialize, Serialize};

use self::gate::GateConfig;
use self::logging::LoggingConfig;
use self::pool::PoolConfig;
use self::portal::PortalConfig;
use self::store::StoreConfig;
use self::supervisor::SupervisorConfig;
use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Portal connection and credential settings.
    pub portal: PortalConfig,
    /// Session pool settings.
    #[serde(default)]
    pub pool: PoolConfig,
    /// Concurrency gate settings.
    #[serde(default)]
    pub gate: GateConfig,
    /// Retry/fallback supervisor settings.
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    /// Durable task store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Worker pool settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `SCRAPEHUB_`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("SCRAPEHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}
