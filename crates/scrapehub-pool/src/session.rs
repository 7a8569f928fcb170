//! Pooled portal session.

use chrono::{DateTime, Utc};

use scrapehub_core::traits::driver::PortalDriver;
use scrapehub_core::types::SessionId;

/// A live portal session held by the pool.
///
/// Sessions are handed out behind an `Arc`; mutable bookkeeping
/// (busy flag, idle timestamps, login state) stays inside the pool so
/// a leased session is plain shared data.
#[derive(Debug)]
pub struct Session<D: PortalDriver> {
    /// Unique session identifier.
    pub id: SessionId,
    /// Opaque portal state built by the driver.
    pub handle: D::Handle,
    /// When the session was created, for absolute TTL checks.
    pub created_at: DateTime<Utc>,
}
