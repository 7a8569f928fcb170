//! Task queue facade over the durable store.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use scrapehub_core::config::store::StoreConfig;
use scrapehub_core::result::AppResult;
use scrapehub_core::types::{QueueStats, TaskId};
use scrapehub_entity::task::{Task, TaskStatusView};
use scrapehub_store::TaskStore;

/// Submission and lifecycle interface over the task store.
///
/// Thin wrapper that carries the queue tunables (claim wait, default
/// attempt budget, orphan and retention windows) so callers never pass
/// raw durations around.
#[derive(Clone)]
pub struct TaskQueue {
    store: Arc<dyn TaskStore>,
    claim_wait: Duration,
    default_max_attempts: u32,
    orphan_timeout: Duration,
    result_retention: Duration,
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("claim_wait", &self.claim_wait)
            .field("default_max_attempts", &self.default_max_attempts)
            .finish()
    }
}

impl TaskQueue {
    /// Create a queue facade from the store and its configuration.
    pub fn new(store: Arc<dyn TaskStore>, config: &StoreConfig) -> Self {
        Self {
            store,
            claim_wait: Duration::from_secs(config.claim_wait_seconds),
            default_max_attempts: config.default_max_attempts,
            orphan_timeout: Duration::from_secs(config.orphan_timeout_seconds),
            result_retention: Duration::from_secs(config.result_retention_hours * 3600),
        }
    }

    /// Submit a new task with the default attempt budget.
    ///
    /// Submission never blocks and never rejects; queue depth shows up
    /// as latency, not errors.
    pub async fn submit(&self, operation: &str, payload: Value) -> AppResult<TaskId> {
        let task = self
            .store
            .enqueue(operation, payload, self.default_max_attempts)
            .await?;

        debug!(task_id = %task.id, operation = %task.operation, "Task submitted");
        Ok(task.id)
    }

    /// Submit a new task with an explicit attempt budget.
    pub async fn submit_with_attempts(
        &self,
        operation: &str,
        payload: Value,
        max_attempts: u32,
    ) -> AppResult<Task> {
        let task = self.store.enqueue(operation, payload, max_attempts).await?;

        debug!(
            task_id = %task.id,
            operation = %task.operation,
            max_attempts,
            "Task submitted"
        );
        Ok(task)
    }

    /// Claim the oldest pending task, blocking up to the configured wait.
    pub async fn claim(&self, worker_id: &str) -> AppResult<Option<Task>> {
        let claimed = self.store.claim(worker_id, self.claim_wait).await?;

        if let Some(task) = &claimed {
            debug!(
                task_id = %task.id,
                operation = %task.operation,
                worker = %worker_id,
                "Task claimed"
            );
        }
        Ok(claimed)
    }

    /// Mark a task completed with its result.
    pub async fn complete(&self, id: TaskId, result: Value) -> AppResult<()> {
        self.store.complete(id, result).await?;
        debug!(task_id = %id, "Task completed");
        Ok(())
    }

    /// Record a failed attempt; the store requeues or finalizes.
    pub async fn fail(&self, id: TaskId, error: &str) -> AppResult<()> {
        self.store.fail(id, error).await?;
        debug!(task_id = %id, error, "Task attempt failed");
        Ok(())
    }

    /// Current status view of a task.
    pub async fn status(&self, id: TaskId) -> AppResult<Option<TaskStatusView>> {
        self.store.status(id).await
    }

    /// Queue position of a task (`0` processing, `-1` absent/terminal).
    pub async fn position(&self, id: TaskId) -> AppResult<i64> {
        self.store.position(id).await
    }

    /// Counters over the pending queue, processing set and results.
    pub async fn stats(&self) -> AppResult<QueueStats> {
        self.store.queue_stats().await
    }

    /// Reclaim tasks stuck in processing beyond the orphan timeout.
    pub async fn clear_orphans(&self) -> AppResult<u64> {
        self.store.clear_orphans(self.orphan_timeout).await
    }

    /// Drop terminal records older than the retention window.
    pub async fn clear_old_results(&self) -> AppResult<u64> {
        self.store.clear_old_results(self.result_retention).await
    }

    /// Check store connectivity.
    pub async fn ping(&self) -> AppResult<bool> {
        self.store.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrapehub_entity::task::TaskStatus;
    use scrapehub_store::memory::MemoryTaskStore;
    use serde_json::json;

    fn queue() -> TaskQueue {
        let config = StoreConfig {
            claim_wait_seconds: 1,
            default_max_attempts: 3,
            ..StoreConfig::default()
        };
        TaskQueue::new(Arc::new(MemoryTaskStore::new()), &config)
    }

    #[tokio::test]
    async fn test_submit_uses_default_attempt_budget() {
        let queue = queue();
        let id = queue
            .submit("raw_fetch", json!({"path": "/a"}))
            .await
            .expect("submit");

        let view = queue.status(id).await.expect("status").expect("record");
        assert_eq!(view.status, TaskStatus::Pending);
        assert_eq!(view.attempts, 0);
    }

    #[tokio::test]
    async fn test_claim_complete_round_trip() {
        let queue = queue();
        let id = queue
            .submit("raw_fetch", json!({"path": "/a"}))
            .await
            .expect("submit");

        let task = queue.claim("worker-1").await.expect("claim").expect("task");
        assert_eq!(task.id, id);

        queue
            .complete(id, json!({"ok": true}))
            .await
            .expect("complete");
        let view = queue.status(id).await.expect("status").expect("record");
        assert_eq!(view.status, TaskStatus::Completed);
    }
}
