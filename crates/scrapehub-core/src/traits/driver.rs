//! Portal driver trait — the seam between the session pool and the
//! portal automation layer.
//!
//! The pool never talks to the portal directly. Everything it needs
//! (building a handle, logging in, liveness probing, keep-alive,
//! teardown) goes through a [`PortalDriver`] implementation.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::result::AppResult;

/// Outcome of probing a portal handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The handle responds and the portal still accepts its login.
    Healthy,
    /// The handle responds but the portal has dropped the login.
    LoggedOut,
    /// The handle no longer responds at all.
    Dead,
}

/// Driver for one external portal.
///
/// `Handle` is the opaque per-session state (HTTP client with cookie jar,
/// browser context, etc.). The pool owns handles but never inspects them.
#[async_trait]
pub trait PortalDriver: Send + Sync + 'static {
    /// Opaque per-session portal state.
    type Handle: Send + Sync + Debug + 'static;

    /// Build a fresh, unauthenticated handle.
    async fn connect(&self) -> AppResult<Self::Handle>;

    /// Authenticate the handle against the portal.
    async fn login(&self, handle: &Self::Handle) -> AppResult<()>;

    /// Check whether the handle is still usable and logged in.
    async fn probe(&self, handle: &Self::Handle) -> ProbeOutcome;

    /// Lightweight keep-alive touch on an idle handle.
    async fn refresh(&self, handle: &Self::Handle) -> AppResult<()>;

    /// Release any remote state held by the handle.
    ///
    /// Errors are swallowed by implementations; a handle being torn down
    /// is already considered gone.
    async fn teardown(&self, handle: &Self::Handle);
}
