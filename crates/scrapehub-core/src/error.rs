//! Unified application error types for ScrapeHub.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// No portal session could be leased (pool exhausted or creation failed).
    ResourceUnavailable,
    /// A leased portal session turned out to be broken.
    ResourceUnhealthy,
    /// Portal authentication failed (login rejected, session dropped).
    Authentication,
    /// An extraction operation failed against a healthy session.
    Operation,
    /// Waiting for a concurrency gate slot timed out.
    GateTimeout,
    /// An extraction operation exceeded its execution timeout.
    OperationTimeout,
    /// A task was abandoned mid-processing and reclaimed.
    Orphaned,
    /// A task store error occurred.
    Store,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An external service error occurred.
    ExternalService,
    /// An internal server error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceUnavailable => write!(f, "RESOURCE_UNAVAILABLE"),
            Self::ResourceUnhealthy => write!(f, "RESOURCE_UNHEALTHY"),
            Self::Authentication => write!(f, "AUTHENTICATION"),
            Self::Operation => write!(f, "OPERATION"),
            Self::GateTimeout => write!(f, "GATE_TIMEOUT"),
            Self::OperationTimeout => write!(f, "OPERATION_TIMEOUT"),
            Self::Orphaned => write!(f, "ORPHANED"),
            Self::Store => write!(f, "STORE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::ExternalService => write!(f, "EXTERNAL_SERVICE"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout ScrapeHub.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls. This provides a single error type for
/// the entire application boundary.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a resource-unavailable error.
    pub fn resource_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceUnavailable, message)
    }

    /// Create a resource-unhealthy error.
    pub fn resource_unhealthy(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceUnhealthy, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    /// Create an operation error.
    pub fn operation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Operation, message)
    }

    /// Create a gate-timeout error.
    pub fn gate_timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::GateTimeout, message)
    }

    /// Create an operation-timeout error.
    pub fn operation_timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OperationTimeout, message)
    }

    /// Create an orphaned-task error.
    pub fn orphaned(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Orphaned, message)
    }

    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Store, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an external-service error.
    pub fn external_service(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExternalService, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
