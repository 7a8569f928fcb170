//! Bounded pool of portal sessions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use scrapehub_core::config::pool::PoolConfig;
use scrapehub_core::traits::driver::{PortalDriver, ProbeOutcome};
use scrapehub_core::types::{PoolStats, SessionId};

use crate::session::Session;

/// Per-session bookkeeping kept inside the pool.
#[derive(Debug)]
struct Slot<D: PortalDriver> {
    session: Arc<Session<D>>,
    busy: bool,
    last_used: DateTime<Utc>,
    authenticated: bool,
}

/// Bounded pool of portal sessions.
///
/// A session is either available or leased to exactly one caller. All
/// lease/release/evict state changes happen inside a single mutex
/// critical section, so two callers can never hold the same session.
#[derive(Debug)]
pub struct SessionPool<D: PortalDriver> {
    driver: Arc<D>,
    config: PoolConfig,
    slots: Mutex<HashMap<SessionId, Slot<D>>>,
}

impl<D: PortalDriver> SessionPool<D> {
    /// Create an empty pool over the given driver.
    pub fn new(driver: Arc<D>, config: PoolConfig) -> Self {
        Self {
            driver,
            config,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Lease a session for exclusive use.
    ///
    /// Reuses a healthy idle session when one exists, otherwise creates
    /// a new one while under `max_sessions`. Returns `None` when the
    /// pool is exhausted or creation keeps failing; a creation failure
    /// does not count against the cap.
    pub async fn lease(&self) -> Option<Arc<Session<D>>> {
        let mut slots = self.slots.lock().await;
        let now = Utc::now();

        // Retire idle sessions past their TTLs before considering reuse.
        let expired: Vec<SessionId> = slots
            .iter()
            .filter(|(_, slot)| !slot.busy && self.is_expired(slot, now))
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            if let Some(slot) = slots.remove(&id) {
                debug!(session_id = %id, "Evicting expired session");
                self.driver.teardown(&slot.session.handle).await;
            }
        }

        // Reuse an idle session the driver still considers alive.
        loop {
            let Some(id) = slots
                .iter()
                .find(|(_, slot)| !slot.busy)
                .map(|(id, _)| *id)
            else {
                break;
            };
            let Some(session) = slots.get(&id).map(|slot| slot.session.clone()) else {
                break;
            };

            match self.driver.probe(&session.handle).await {
                ProbeOutcome::Healthy => {
                    if let Some(slot) = slots.get_mut(&id) {
                        slot.busy = true;
                        slot.last_used = now;
                    }
                    debug!(session_id = %id, "Leased existing session");
                    return Some(session);
                }
                ProbeOutcome::LoggedOut => {
                    // Still alive, the supervisor will log in again.
                    if let Some(slot) = slots.get_mut(&id) {
                        slot.busy = true;
                        slot.last_used = now;
                        slot.authenticated = false;
                    }
                    debug!(session_id = %id, "Leased existing session pending re-login");
                    return Some(session);
                }
                ProbeOutcome::Dead => {
                    if let Some(slot) = slots.remove(&id) {
                        warn!(session_id = %id, "Evicting dead session");
                        self.driver.teardown(&slot.session.handle).await;
                    }
                }
            }
        }

        if slots.len() >= self.config.max_sessions {
            debug!(
                max_sessions = self.config.max_sessions,
                "Session pool exhausted"
            );
            return None;
        }

        let handle = self.create_handle().await?;
        let session = Arc::new(Session {
            id: SessionId::new(),
            handle,
            created_at: now,
        });
        slots.insert(
            session.id,
            Slot {
                session: session.clone(),
                busy: true,
                last_used: now,
                authenticated: false,
            },
        );
        info!(session_id = %session.id, total = slots.len(), "Created new session");
        Some(session)
    }

    /// Return a leased session to the pool without re-validation.
    pub async fn release(&self, id: SessionId) {
        let mut slots = self.slots.lock().await;
        match slots.get_mut(&id) {
            Some(slot) => {
                slot.busy = false;
                slot.last_used = Utc::now();
                debug!(session_id = %id, "Session released");
            }
            None => warn!(session_id = %id, "Attempted to release unknown session"),
        }
    }

    /// Tear a session down and remove its slot.
    pub async fn evict(&self, id: SessionId) {
        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.remove(&id) {
            info!(session_id = %id, "Session evicted");
            self.driver.teardown(&slot.session.handle).await;
        }
    }

    /// Evict a session and build a fresh authenticated replacement.
    ///
    /// The hard-recreate remedy: the new session is leased to the
    /// caller already logged in. Returns `None` when creation or login
    /// fails.
    pub async fn replace(&self, id: SessionId) -> Option<Arc<Session<D>>> {
        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.remove(&id) {
            debug!(session_id = %id, "Evicting session for replacement");
            self.driver.teardown(&slot.session.handle).await;
        }

        let handle = self.create_handle().await?;
        if let Err(e) = self.driver.login(&handle).await {
            warn!(error = %e, "Login failed for replacement session");
            self.driver.teardown(&handle).await;
            return None;
        }

        let now = Utc::now();
        let session = Arc::new(Session {
            id: SessionId::new(),
            handle,
            created_at: now,
        });
        slots.insert(
            session.id,
            Slot {
                session: session.clone(),
                busy: true,
                last_used: now,
                authenticated: true,
            },
        );
        info!(old_session_id = %id, session_id = %session.id, "Session replaced");
        Some(session)
    }

    /// Record whether the session's login is currently valid.
    pub async fn mark_authenticated(&self, id: SessionId, authenticated: bool) {
        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.get_mut(&id) {
            slot.authenticated = authenticated;
        }
    }

    /// Check whether the session's login is currently believed valid.
    pub async fn is_authenticated(&self, id: SessionId) -> bool {
        let slots = self.slots.lock().await;
        slots.get(&id).map(|slot| slot.authenticated).unwrap_or(false)
    }

    /// Stamp the session as recently used.
    pub async fn touch(&self, id: SessionId) {
        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.get_mut(&id) {
            slot.last_used = Utc::now();
        }
    }

    /// One maintenance sweep: evict idle sessions past their TTLs or
    /// dead per the driver, keep-alive refresh the rest once they have
    /// been idle past the refresh threshold.
    pub async fn run_maintenance(&self) {
        let mut slots = self.slots.lock().await;
        let now = Utc::now();
        let refresh_after =
            Duration::from_secs(self.config.refresh_after_idle_minutes * 60);

        let idle_ids: Vec<SessionId> = slots
            .iter()
            .filter(|(_, slot)| !slot.busy)
            .map(|(id, _)| *id)
            .collect();

        for id in idle_ids {
            let Some(slot) = slots.get(&id) else { continue };

            if self.is_expired(slot, now) {
                let session = slot.session.clone();
                slots.remove(&id);
                info!(session_id = %id, "Maintenance evicted expired session");
                self.driver.teardown(&session.handle).await;
                continue;
            }

            let idle = (now - slot.last_used).to_std().unwrap_or_default();
            if idle < refresh_after {
                continue;
            }

            let session = slot.session.clone();
            match self.driver.probe(&session.handle).await {
                ProbeOutcome::Dead => {
                    slots.remove(&id);
                    warn!(session_id = %id, "Maintenance evicted dead session");
                    self.driver.teardown(&session.handle).await;
                }
                ProbeOutcome::LoggedOut => {
                    if let Some(slot) = slots.get_mut(&id) {
                        slot.authenticated = false;
                    }
                }
                ProbeOutcome::Healthy => match self.driver.refresh(&session.handle).await {
                    Ok(()) => {
                        if let Some(slot) = slots.get_mut(&id) {
                            slot.last_used = now;
                        }
                        debug!(session_id = %id, "Refreshed idle session");
                    }
                    Err(e) => {
                        slots.remove(&id);
                        warn!(session_id = %id, error = %e, "Refresh failed, evicting session");
                        self.driver.teardown(&session.handle).await;
                    }
                },
            }
        }
    }

    /// Point-in-time pool counters.
    pub async fn stats(&self) -> PoolStats {
        let slots = self.slots.lock().await;
        let busy = slots.values().filter(|slot| slot.busy).count();
        let authenticated = slots.values().filter(|slot| slot.authenticated).count();
        PoolStats {
            max_sessions: self.config.max_sessions,
            total: slots.len(),
            busy,
            available: slots.len() - busy,
            authenticated,
        }
    }

    /// Tear down every session.
    pub async fn shutdown(&self) {
        let mut slots = self.slots.lock().await;
        let sessions = slots.len();
        for (_, slot) in slots.drain() {
            self.driver.teardown(&slot.session.handle).await;
        }
        info!(sessions, "Session pool shut down");
    }

    async fn create_handle(&self) -> Option<D::Handle> {
        let retries = self.config.create_retries.max(1);
        for attempt in 1..=retries {
            match self.driver.connect().await {
                Ok(handle) => return Some(handle),
                Err(e) => {
                    warn!(attempt, error = %e, "Session creation failed");
                    if attempt < retries {
                        let pause = Duration::from_millis(
                            self.config.create_retry_delay_ms * u64::from(attempt),
                        );
                        tokio::time::sleep(pause).await;
                    }
                }
            }
        }
        None
    }

    fn is_expired(&self, slot: &Slot<D>, now: DateTime<Utc>) -> bool {
        let age = (now - slot.session.created_at).to_std().unwrap_or_default();
        let idle = (now - slot.last_used).to_std().unwrap_or_default();
        age >= Duration::from_secs(self.config.session_ttl_minutes * 60)
            || idle >= Duration::from_secs(self.config.idle_timeout_minutes * 60)
    }
}
