//! Task store abstraction implemented by each queue backend.

use std::time::Duration;

use async_trait::async_trait;

use scrapehub_core::result::AppResult;
use scrapehub_core::types::{QueueStats, TaskId};
use scrapehub_entity::task::{Task, TaskStatusView};

/// Persistent task queue backing the worker fleet.
///
/// Implementations must guarantee that a pending task is handed to at
/// most one claimant, and that terminal records stay readable until
/// retention cleanup removes them.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Append a new pending task to the queue.
    ///
    /// Submission never blocks on queue depth; the task is accepted
    /// and waits its turn.
    async fn enqueue(
        &self,
        operation: &str,
        payload: serde_json::Value,
        max_attempts: u32,
    ) -> AppResult<Task>;

    /// Claim the oldest pending task, blocking up to `wait`.
    ///
    /// On success the task is atomically moved to the processing set,
    /// marked [`Processing`](scrapehub_entity::task::TaskStatus::Processing),
    /// its attempt counter incremented and `started_at`/`worker_id`
    /// stamped. Returns `None` when the wait elapses with no work.
    async fn claim(&self, worker_id: &str, wait: Duration) -> AppResult<Option<Task>>;

    /// Record a successful result and mark the task completed.
    async fn complete(&self, id: TaskId, result: serde_json::Value) -> AppResult<()>;

    /// Record a failed attempt.
    ///
    /// The task is requeued at the back of the queue while attempts
    /// remain, otherwise it is marked failed with `error` preserved.
    async fn fail(&self, id: TaskId, error: &str) -> AppResult<()>;

    /// Read the current status view of a task, if the record exists.
    async fn status(&self, id: TaskId) -> AppResult<Option<TaskStatusView>>;

    /// Queue position of a task: `0` while processing, 1-based index
    /// while pending, `-1` when absent or already terminal.
    async fn position(&self, id: TaskId) -> AppResult<i64>;

    /// Counters over the pending queue, processing set and stored results.
    async fn queue_stats(&self) -> AppResult<QueueStats>;

    /// Reclaim tasks stuck in processing longer than `older_than`.
    ///
    /// Reclaimed tasks are requeued while attempts remain, otherwise
    /// failed. Returns the number of tasks reclaimed.
    async fn clear_orphans(&self, older_than: Duration) -> AppResult<u64>;

    /// Delete terminal task records older than `older_than`.
    /// Returns the number of records removed.
    async fn clear_old_results(&self, older_than: Duration) -> AppResult<u64>;

    /// Check backend connectivity.
    async fn ping(&self) -> AppResult<bool>;
}
