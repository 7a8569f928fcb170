//! Portal connection configuration.

use serde::{Deserialize, Serialize};

/// External portal connection and credential configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Base URL of the portal.
    pub base_url: String,
    /// Login username.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Path of the login form relative to the base URL.
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Path probed to confirm the session is still logged in.
    #[serde(default = "default_probe_path")]
    pub probe_path: String,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_probe_path() -> String {
    "/".to_string()
}

fn default_request_timeout() -> u64 {
    30
}
