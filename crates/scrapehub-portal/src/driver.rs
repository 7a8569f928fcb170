//! `reqwest`-backed portal driver.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use scrapehub_core::config::portal::PortalConfig;
use scrapehub_core::error::{AppError, ErrorKind};
use scrapehub_core::result::AppResult;
use scrapehub_core::traits::driver::{PortalDriver, ProbeOutcome};

/// Join a portal path onto the configured base URL.
fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

/// Per-session portal state: one HTTP client with its own cookie jar.
///
/// The portal issues session cookies at login, so sharing a client
/// between sessions would share logins. Each handle gets a private jar.
#[derive(Debug)]
pub struct PortalHandle {
    client: reqwest::Client,
    base_url: String,
    login_path: String,
}

impl PortalHandle {
    /// HTTP client bound to this session's cookie jar.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Absolute URL for a portal path.
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Whether a response landed on the login page after redirects.
    pub fn landed_on_login(&self, response: &reqwest::Response) -> bool {
        response.url().path() == self.login_path
    }
}

/// HTTP implementation of [`PortalDriver`].
///
/// Logging in POSTs credentials to the login path; the portal answers
/// with session cookies the handle's jar captures. Probing GETs the
/// probe path and classifies the outcome from transport errors, auth
/// statuses and redirects back to the login page.
pub struct HttpPortalDriver {
    config: PortalConfig,
}

impl fmt::Debug for HttpPortalDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpPortalDriver")
            .field("base_url", &self.config.base_url)
            .field("username", &self.config.username)
            .field("password", &"***")
            .finish()
    }
}

impl HttpPortalDriver {
    /// Create a driver from portal configuration.
    pub fn new(config: PortalConfig) -> Self {
        Self { config }
    }

    fn classify_response(&self, handle: &PortalHandle, response: &reqwest::Response) -> ProbeOutcome {
        if handle.landed_on_login(response) {
            return ProbeOutcome::LoggedOut;
        }
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProbeOutcome::LoggedOut,
            status if status.is_success() => ProbeOutcome::Healthy,
            _ => ProbeOutcome::Dead,
        }
    }
}

#[async_trait]
impl PortalDriver for HttpPortalDriver {
    type Handle = PortalHandle;

    async fn connect(&self) -> AppResult<Self::Handle> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(self.config.request_timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::ExternalService,
                    format!("Failed to build portal HTTP client: {e}"),
                    e,
                )
            })?;

        Ok(PortalHandle {
            client,
            base_url: self.config.base_url.clone(),
            login_path: self.config.login_path.clone(),
        })
    }

    async fn login(&self, handle: &Self::Handle) -> AppResult<()> {
        let login_url = handle.url(&self.config.login_path);
        let response = handle
            .client
            .post(&login_url)
            .json(&serde_json::json!({
                "username": self.config.username,
                "password": self.config.password,
            }))
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::ExternalService,
                    format!("Portal login request failed: {e}"),
                    e,
                )
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::authentication(
                format!("Portal rejected credentials for '{}'", self.config.username),
            )),
            status if status.is_success() => {
                debug!(username = %self.config.username, "Portal login succeeded");
                Ok(())
            }
            status => Err(AppError::external_service(format!(
                "Portal login returned HTTP {status}"
            ))),
        }
    }

    async fn probe(&self, handle: &Self::Handle) -> ProbeOutcome {
        let probe_url = handle.url(&self.config.probe_path);
        match handle.client.get(&probe_url).send().await {
            Ok(response) => self.classify_response(handle, &response),
            Err(e) => {
                debug!(error = %e, "Portal probe transport failure");
                ProbeOutcome::Dead
            }
        }
    }

    async fn refresh(&self, handle: &Self::Handle) -> AppResult<()> {
        let probe_url = handle.url(&self.config.probe_path);
        let response = handle.client.get(&probe_url).send().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::ResourceUnhealthy,
                format!("Portal keep-alive request failed: {e}"),
                e,
            )
        })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::resource_unhealthy(format!(
                "Portal keep-alive returned HTTP {}",
                response.status()
            )))
        }
    }

    async fn teardown(&self, _handle: &Self::Handle) {
        // The portal holds no server-side state worth releasing beyond the
        // session cookie, which expires on its own.
        debug!("Portal handle dropped");
    }
}
