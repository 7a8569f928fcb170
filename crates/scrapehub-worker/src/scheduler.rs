//! Cron scheduler for periodic maintenance.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing::{debug, error, info};

use scrapehub_core::config::pool::PoolConfig;
use scrapehub_core::error::AppError;
use scrapehub_core::result::AppResult;
use scrapehub_core::traits::driver::PortalDriver;
use scrapehub_pool::SessionPool;

use crate::queue::TaskQueue;

/// Orphan reaper cadence: every 5 minutes.
const ORPHAN_REAP_CRON: &str = "0 */5 * * * *";

/// Result retention cleanup: daily at 3 AM.
const RESULT_CLEANUP_CRON: &str = "0 0 3 * * *";

/// Six-field cron expression firing every `seconds`.
///
/// Intervals of a minute or more are rounded up to whole minutes, since
/// the seconds field only reaches 59.
fn interval_cron(seconds: u64) -> String {
    if seconds < 60 {
        format!("*/{seconds} * * * * *")
    } else {
        format!("0 */{} * * * *", seconds.div_ceil(60))
    }
}

/// Cron-driven maintenance: pool sweep, orphan reaper, result cleanup.
pub struct CronScheduler<D: PortalDriver> {
    scheduler: JobScheduler,
    pool: Arc<SessionPool<D>>,
    queue: Arc<TaskQueue>,
}

impl<D: PortalDriver> std::fmt::Debug for CronScheduler<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl<D: PortalDriver> CronScheduler<D> {
    /// Create a scheduler over the pool and queue.
    pub async fn new(pool: Arc<SessionPool<D>>, queue: Arc<TaskQueue>) -> AppResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            pool,
            queue,
        })
    }

    /// Register all maintenance jobs.
    pub async fn register_default_tasks(&self, pool_config: &PoolConfig) -> AppResult<()> {
        self.register_pool_maintenance(pool_config.maintenance_interval_seconds)
            .await?;
        self.register_orphan_reaper().await?;
        self.register_result_cleanup().await?;

        info!("All scheduled tasks registered");
        Ok(())
    }

    /// Start firing registered jobs.
    pub async fn start(&self) -> AppResult<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        info!("Cron scheduler started");
        Ok(())
    }

    /// Stop the scheduler.
    pub async fn shutdown(&mut self) -> AppResult<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        info!("Cron scheduler shut down");
        Ok(())
    }

    /// Pool maintenance sweep at the configured interval.
    async fn register_pool_maintenance(&self, interval_seconds: u64) -> AppResult<()> {
        let pool = Arc::clone(&self.pool);
        let cron = interval_cron(interval_seconds);
        let job = CronJob::new_async(cron.as_str(), move |_uuid, _lock| {
            let pool = Arc::clone(&pool);
            Box::pin(async move {
                debug!("Running pool maintenance sweep");
                pool.run_maintenance().await;
            })
        })
        .map_err(|e| {
            AppError::internal(format!("Failed to create pool_maintenance schedule: {e}"))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add pool_maintenance schedule: {e}"))
        })?;

        info!(interval_seconds, "Registered: pool_maintenance");
        Ok(())
    }

    /// Orphan reaper — requeues tasks stuck in processing.
    async fn register_orphan_reaper(&self) -> AppResult<()> {
        let queue = Arc::clone(&self.queue);
        let job = CronJob::new_async(ORPHAN_REAP_CRON, move |_uuid, _lock| {
            let queue = Arc::clone(&queue);
            Box::pin(async move {
                match queue.clear_orphans().await {
                    Ok(0) => debug!("Orphan reap found nothing to reclaim"),
                    Ok(count) => info!(count, "Reclaimed orphaned tasks"),
                    Err(e) => error!(error = %e, "Orphan reap failed"),
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create orphan_reap schedule: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add orphan_reap schedule: {e}")))?;

        info!("Registered: orphan_reap (every 5min)");
        Ok(())
    }

    /// Retention cleanup — drops old terminal task records.
    async fn register_result_cleanup(&self) -> AppResult<()> {
        let queue = Arc::clone(&self.queue);
        let job = CronJob::new_async(RESULT_CLEANUP_CRON, move |_uuid, _lock| {
            let queue = Arc::clone(&queue);
            Box::pin(async move {
                match queue.clear_old_results().await {
                    Ok(count) => info!(count, "Result retention cleanup finished"),
                    Err(e) => error!(error = %e, "Result retention cleanup failed"),
                }
            })
        })
        .map_err(|e| {
            AppError::internal(format!("Failed to create result_cleanup schedule: {e}"))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add result_cleanup schedule: {e}"))
        })?;

        info!("Registered: result_cleanup (daily at 3AM)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_cron_sub_minute() {
        assert_eq!(interval_cron(15), "*/15 * * * * *");
        assert_eq!(interval_cron(45), "*/45 * * * * *");
    }

    #[test]
    fn test_interval_cron_whole_minutes() {
        assert_eq!(interval_cron(60), "0 */1 * * * *");
        assert_eq!(interval_cron(300), "0 */5 * * * *");
    }

    #[test]
    fn test_interval_cron_rounds_up_to_whole_minutes() {
        assert_eq!(interval_cron(90), "0 */2 * * * *");
    }
}
