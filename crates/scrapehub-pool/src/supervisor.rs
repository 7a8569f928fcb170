//! Retry supervisor running operations against leased sessions.
//!
//! Failure handling applies the cheapest remedy first: re-login on the
//! same handle, hard recreate via the pool, soft refresh with backoff.
//! Fatal operation errors short-circuit the loop.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, warn};

use scrapehub_core::config::supervisor::SupervisorConfig;
use scrapehub_core::error::AppError;
use scrapehub_core::result::AppResult;
use scrapehub_core::traits::driver::{PortalDriver, ProbeOutcome};
use scrapehub_core::traits::operation::{Operation, OperationError};

use crate::gate::ConcurrencyGate;
use crate::manager::SessionPool;
use crate::session::Session;

/// Supervised executor for portal operations.
///
/// Owns the full lifecycle of one execution: gate admission, session
/// lease, authentication, the retry loop, and final release.
#[derive(Debug)]
pub struct Supervisor<D: PortalDriver> {
    driver: Arc<D>,
    pool: Arc<SessionPool<D>>,
    gate: Arc<ConcurrencyGate>,
    config: SupervisorConfig,
}

impl<D: PortalDriver> Supervisor<D> {
    /// Create a supervisor over a pool and gate.
    pub fn new(
        driver: Arc<D>,
        pool: Arc<SessionPool<D>>,
        gate: Arc<ConcurrencyGate>,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            driver,
            pool,
            gate,
            config,
        }
    }

    /// The session pool this supervisor leases from.
    pub fn pool(&self) -> &SessionPool<D> {
        &self.pool
    }

    /// The concurrency gate this supervisor admits through.
    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Run an operation under gate admission, session supervision and
    /// the retry loop.
    ///
    /// The gate permit is held for the whole execution, remedies
    /// included, so admission counts in-flight work rather than raw
    /// portal calls.
    pub async fn execute(&self, operation: &dyn Operation<D>, payload: &Value) -> AppResult<Value> {
        let permit = match self.gate.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                self.gate.record_failure();
                return Err(e);
            }
        };

        let result = self.run_supervised(operation, payload).await;
        if result.is_err() {
            self.gate.record_failure();
        }
        drop(permit);
        result
    }

    async fn run_supervised(
        &self,
        operation: &dyn Operation<D>,
        payload: &Value,
    ) -> AppResult<Value> {
        let Some(mut session) = self.pool.lease().await else {
            return Err(AppError::resource_unavailable("No portal session available"));
        };

        let op_timeout = Duration::from_secs(self.config.operation_timeout_seconds);
        let mut last_err = AppError::operation(format!(
            "Operation '{}' did not run",
            operation.name()
        ));

        for attempt in 1..=self.config.max_retries.max(1) {
            if !self.pool.is_authenticated(session.id).await {
                match self.driver.login(&session.handle).await {
                    Ok(()) => {
                        self.pool.mark_authenticated(session.id, true).await;
                        self.pool.touch(session.id).await;
                    }
                    Err(e) => {
                        warn!(session_id = %session.id, attempt, error = %e, "Login failed");
                        last_err = e;
                        // Repeating the login on this handle is unlikely to
                        // go differently; recreate and try the fresh login.
                        match self.pool.replace(session.id).await {
                            Some(fresh) => session = fresh,
                            None => {
                                return Err(AppError::authentication(
                                    "Could not establish an authenticated session",
                                ));
                            }
                        }
                        continue;
                    }
                }
            }

            match timeout(op_timeout, operation.execute(&session.handle, payload)).await {
                Ok(Ok(value)) => {
                    self.pool.release(session.id).await;
                    return Ok(value);
                }
                Ok(Err(OperationError::Fatal(message))) => {
                    warn!(
                        operation = operation.name(),
                        attempt, message, "Operation failed fatally"
                    );
                    self.pool.release(session.id).await;
                    return Err(AppError::operation(message));
                }
                Ok(Err(op_err)) => {
                    warn!(
                        operation = operation.name(),
                        attempt,
                        error = %op_err,
                        "Operation attempt failed"
                    );
                    last_err = AppError::operation(op_err.to_string());
                    match op_err {
                        OperationError::LoggedOut(_) => {
                            self.pool.mark_authenticated(session.id, false).await;
                        }
                        OperationError::HandleLost(_) => {
                            match self.pool.replace(session.id).await {
                                Some(fresh) => session = fresh,
                                None => {
                                    return Err(AppError::resource_unavailable(
                                        "Could not replace a dead session",
                                    ));
                                }
                            }
                        }
                        _ => self.apply_transient_remedy(&mut session, attempt).await?,
                    }
                }
                Err(_) => {
                    warn!(
                        operation = operation.name(),
                        attempt,
                        timeout_seconds = op_timeout.as_secs(),
                        "Operation attempt timed out"
                    );
                    last_err = AppError::operation_timeout(format!(
                        "Operation '{}' exceeded {}s",
                        operation.name(),
                        op_timeout.as_secs()
                    ));
                    self.apply_transient_remedy(&mut session, attempt).await?;
                }
            }
        }

        // Retries exhausted: evict the session if it no longer responds,
        // otherwise hand it back.
        match self.driver.probe(&session.handle).await {
            ProbeOutcome::Dead => self.pool.evict(session.id).await,
            _ => self.pool.release(session.id).await,
        }
        Err(last_err)
    }

    /// Remedy for failures with no clear classification: confirm the
    /// session state with a probe, then soft refresh and back off.
    async fn apply_transient_remedy(
        &self,
        session: &mut Arc<Session<D>>,
        attempt: u32,
    ) -> AppResult<()> {
        match self.driver.probe(&session.handle).await {
            ProbeOutcome::LoggedOut => {
                self.pool.mark_authenticated(session.id, false).await;
            }
            ProbeOutcome::Dead => match self.pool.replace(session.id).await {
                Some(fresh) => *session = fresh,
                None => {
                    return Err(AppError::resource_unavailable(
                        "Could not replace a dead session",
                    ));
                }
            },
            ProbeOutcome::Healthy => {
                if let Err(e) = self.driver.refresh(&session.handle).await {
                    debug!(error = %e, "Soft refresh failed");
                }
                let backoff =
                    Duration::from_millis(self.config.backoff_base_ms * u64::from(attempt));
                if !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                }
            }
        }
        Ok(())
    }
}
