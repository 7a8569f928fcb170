//! Built-in portal operations.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tracing::debug;

use scrapehub_core::traits::operation::{Operation, OperationError};

use crate::driver::{HttpPortalDriver, PortalHandle};

/// Fetch a single portal page and return its raw body.
///
/// Payload: `{"path": "/some/portal/path"}`. The result carries the HTTP
/// status, content type and body; JSON bodies are returned parsed so
/// downstream consumers do not double-decode.
#[derive(Debug, Default)]
pub struct RawFetchOperation;

impl RawFetchOperation {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Operation<HttpPortalDriver> for RawFetchOperation {
    fn name(&self) -> &str {
        "raw_fetch"
    }

    async fn execute(
        &self,
        handle: &PortalHandle,
        payload: &Value,
    ) -> Result<Value, OperationError> {
        let path = payload
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                OperationError::Fatal("raw_fetch payload requires a string 'path'".to_string())
            })?;

        let url = handle.url(path);
        debug!(%url, "Fetching portal page");

        let response = handle.client().get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                OperationError::Transient(format!("Portal request timed out: {e}"))
            } else if e.is_connect() {
                OperationError::HandleLost(format!("Portal connection failed: {e}"))
            } else {
                OperationError::Transient(format!("Portal request failed: {e}"))
            }
        })?;

        if handle.landed_on_login(&response) {
            return Err(OperationError::LoggedOut(format!(
                "Portal redirected '{path}' to the login page"
            )));
        }

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(OperationError::LoggedOut(format!(
                    "Portal returned HTTP {status} for '{path}'"
                )));
            }
            s if s.is_server_error() => {
                return Err(OperationError::Transient(format!(
                    "Portal returned HTTP {status} for '{path}'"
                )));
            }
            s if s.is_client_error() => {
                return Err(OperationError::Fatal(format!(
                    "Portal returned HTTP {status} for '{path}'"
                )));
            }
            _ => {}
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let body = response
            .text()
            .await
            .map_err(|e| OperationError::Transient(format!("Failed to read portal body: {e}")))?;

        let body_value = if content_type.starts_with("application/json") {
            serde_json::from_str(&body).map_err(|e| {
                OperationError::Transient(format!("Portal returned malformed JSON: {e}"))
            })?
        } else {
            Value::String(body)
        };

        Ok(json!({
            "path": path,
            "status": status.as_u16(),
            "content_type": content_type,
            "body": body_value,
        }))
    }
}
