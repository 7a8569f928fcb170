//! In-memory task store for tests and single-node runs.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, Notify};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use scrapehub_core::error::AppError;
use scrapehub_core::result::AppResult;
use scrapehub_core::types::{QueueStats, TaskId};
use scrapehub_entity::task::{Task, TaskStatus, TaskStatusView};

use crate::traits::TaskStore;

/// In-memory task store.
///
/// Pending IDs sit in a deque guarded by a single mutex; full records
/// live in a concurrent map. Claimants park on a [`Notify`] so a
/// blocking claim wakes as soon as work arrives.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    /// Pending task IDs, oldest at the front.
    pending: Mutex<VecDeque<TaskId>>,
    /// Full task records, including terminal ones awaiting cleanup.
    records: DashMap<TaskId, Task>,
    /// Wakes parked claimants when a task is enqueued or requeued.
    notify: Notify,
}

impl MemoryTaskStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn try_claim(&self, worker_id: &str) -> Option<Task> {
        loop {
            let id = self.pending.lock().await.pop_front()?;

            // Record cleaned up while the id still sat in the queue.
            let Some(mut entry) = self.records.get_mut(&id) else {
                continue;
            };

            let claimed = {
                let task = entry.value_mut();
                task.status = TaskStatus::Processing;
                task.attempts += 1;
                task.started_at = Some(Utc::now());
                task.worker_id = Some(worker_id.to_string());
                task.clone()
            };
            drop(entry);

            debug!(task_id = %id, worker_id, attempt = claimed.attempts, "Task claimed");
            return Some(claimed);
        }
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn enqueue(
        &self,
        operation: &str,
        payload: serde_json::Value,
        max_attempts: u32,
    ) -> AppResult<Task> {
        let task = Task::new(operation, payload, max_attempts);
        self.records.insert(task.id, task.clone());
        self.pending.lock().await.push_back(task.id);
        self.notify.notify_one();

        debug!(task_id = %task.id, operation, "Task enqueued");
        Ok(task)
    }

    async fn claim(&self, worker_id: &str, wait: Duration) -> AppResult<Option<Task>> {
        let deadline = Instant::now() + wait;

        loop {
            // Register for a wakeup before checking the queue so an
            // enqueue between the check and the park is not missed.
            let notified = self.notify.notified();

            if let Some(task) = self.try_claim(worker_id).await {
                return Ok(Some(task));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            if timeout_at(deadline, notified).await.is_err() {
                return Ok(self.try_claim(worker_id).await);
            }
        }
    }

    async fn complete(&self, id: TaskId, result: serde_json::Value) -> AppResult<()> {
        let mut entry = self
            .records
            .get_mut(&id)
            .ok_or_else(|| AppError::store(format!("Unknown task: {id}")))?;
        let task = entry.value_mut();

        task.status = TaskStatus::Completed;
        task.result = Some(result);
        task.error = None;
        task.completed_at = Some(Utc::now());

        debug!(task_id = %id, attempts = task.attempts, "Task completed");
        Ok(())
    }

    async fn fail(&self, id: TaskId, error: &str) -> AppResult<()> {
        let requeue = {
            let mut entry = self
                .records
                .get_mut(&id)
                .ok_or_else(|| AppError::store(format!("Unknown task: {id}")))?;
            let task = entry.value_mut();

            task.error = Some(error.to_string());
            if task.attempts < task.max_attempts {
                task.status = TaskStatus::Pending;
                task.worker_id = None;
                task.started_at = None;
                debug!(
                    task_id = %id,
                    attempt = task.attempts,
                    max_attempts = task.max_attempts,
                    "Task requeued after failure"
                );
                true
            } else {
                task.status = TaskStatus::Failed;
                task.completed_at = Some(Utc::now());
                warn!(task_id = %id, attempts = task.attempts, error, "Task failed permanently");
                false
            }
        };

        if requeue {
            self.pending.lock().await.push_back(id);
            self.notify.notify_one();
        }
        Ok(())
    }

    async fn status(&self, id: TaskId) -> AppResult<Option<TaskStatusView>> {
        Ok(self
            .records
            .get(&id)
            .map(|entry| TaskStatusView::from(entry.value())))
    }

    async fn position(&self, id: TaskId) -> AppResult<i64> {
        let Some(status) = self.records.get(&id).map(|e| e.value().status) else {
            return Ok(-1);
        };

        match status {
            TaskStatus::Processing => Ok(0),
            TaskStatus::Pending => {
                let pending = self.pending.lock().await;
                Ok(pending
                    .iter()
                    .position(|queued| *queued == id)
                    .map(|i| i as i64 + 1)
                    .unwrap_or(-1))
            }
            _ => Ok(-1),
        }
    }

    async fn queue_stats(&self) -> AppResult<QueueStats> {
        let pending = self.pending.lock().await.len() as u64;
        let mut processing = 0u64;
        let mut total_results = 0u64;
        for entry in self.records.iter() {
            match entry.value().status {
                TaskStatus::Processing => processing += 1,
                TaskStatus::Completed | TaskStatus::Failed => total_results += 1,
                TaskStatus::Pending => {}
            }
        }

        Ok(QueueStats {
            pending,
            processing,
            total_results,
        })
    }

    async fn clear_orphans(&self, older_than: Duration) -> AppResult<u64> {
        let now = Utc::now();
        let mut requeued = Vec::new();
        let mut reclaimed = 0u64;

        for mut entry in self.records.iter_mut() {
            let task = entry.value_mut();
            if task.status != TaskStatus::Processing {
                continue;
            }
            let stuck = task
                .started_at
                .map(|t| (now - t).to_std().unwrap_or_default() >= older_than)
                .unwrap_or(true);
            if !stuck {
                continue;
            }

            task.error = Some("Reclaimed from unresponsive worker".to_string());
            if task.attempts < task.max_attempts {
                task.status = TaskStatus::Pending;
                task.worker_id = None;
                task.started_at = None;
                requeued.push(task.id);
            } else {
                task.status = TaskStatus::Failed;
                task.completed_at = Some(now);
            }
            reclaimed += 1;
        }

        if !requeued.is_empty() {
            let mut pending = self.pending.lock().await;
            for id in requeued {
                pending.push_back(id);
                self.notify.notify_one();
            }
        }

        if reclaimed > 0 {
            info!(reclaimed, "Reclaimed orphaned tasks");
        }
        Ok(reclaimed)
    }

    async fn clear_old_results(&self, older_than: Duration) -> AppResult<u64> {
        let now = Utc::now();
        let before = self.records.len();

        self.records.retain(|_, task| {
            let expired = task.status.is_terminal()
                && task
                    .completed_at
                    .map(|t| (now - t).to_std().unwrap_or_default() >= older_than)
                    .unwrap_or(false);
            !expired
        });

        let removed = (before - self.records.len()) as u64;
        if removed > 0 {
            info!(removed, "Deleted old task results");
        }
        Ok(removed)
    }

    async fn ping(&self) -> AppResult<bool> {
        Ok(true)
    }
}
