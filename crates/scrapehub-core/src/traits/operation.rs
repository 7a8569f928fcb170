//! Operation trait — the contract extraction logic implements to run
//! against a pooled portal session.

use async_trait::async_trait;
use serde_json::Value;

use crate::traits::driver::PortalDriver;

/// Error from executing an operation against a portal session.
///
/// The variants are the fixed failure classification the supervisor's
/// remedy chain dispatches on. Anything that is not `Fatal` is retryable
/// at the task level.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// The portal no longer accepts the session's login.
    #[error("portal session logged out: {0}")]
    LoggedOut(String),

    /// The underlying handle is gone (connection dropped, context closed).
    #[error("portal handle lost: {0}")]
    HandleLost(String),

    /// Transient failure — a retry on a healthy session may succeed.
    #[error("transient operation failure: {0}")]
    Transient(String),

    /// Permanent failure — retrying cannot help.
    #[error("fatal operation failure: {0}")]
    Fatal(String),
}

impl OperationError {
    /// Whether the failure short-circuits the retry loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// Trait for extraction operation implementations.
///
/// Implementations receive a live portal handle and an opaque JSON
/// payload, and return an opaque JSON result. The pool machinery makes
/// no assumptions about what the operation does with the handle.
#[async_trait]
pub trait Operation<D: PortalDriver>: Send + Sync + std::fmt::Debug {
    /// Get the operation name tasks are dispatched by.
    fn name(&self) -> &str;

    /// Execute the operation against a leased portal handle.
    async fn execute(&self, handle: &D::Handle, payload: &Value) -> Result<Value, OperationError>;
}
