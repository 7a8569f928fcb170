//! Redis task store implementation.
//!
//! Pending tasks live in a list: enqueue pushes left, claim moves the
//! rightmost (oldest) entry onto the processing list in one `BLMOVE`,
//! so a task can only ever be handed to a single claimant. Full task
//! records are stored as JSON strings under their own keys.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Direction};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use scrapehub_core::error::{AppError, ErrorKind};
use scrapehub_core::result::AppResult;
use scrapehub_core::types::{QueueStats, TaskId};
use scrapehub_entity::task::{Task, TaskStatus, TaskStatusView};

use crate::keys;
use crate::traits::TaskStore;

use super::client::RedisClient;

/// Redis-backed task store.
#[derive(Debug, Clone)]
pub struct RedisTaskStore {
    /// Redis client.
    client: RedisClient,
}

impl RedisTaskStore {
    /// Create a new Redis task store.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Map a Redis error to an AppError.
    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::Store, format!("Redis error: {e}"), e)
    }

    fn pending_key(&self) -> String {
        self.client.prefixed_key(&keys::pending_queue())
    }

    fn processing_key(&self) -> String {
        self.client.prefixed_key(&keys::processing_queue())
    }

    fn task_key(&self, id: TaskId) -> String {
        self.client.prefixed_key(&keys::task_record(id))
    }

    async fn load_task(
        &self,
        conn: &mut ConnectionManager,
        id: TaskId,
    ) -> AppResult<Option<Task>> {
        let raw: Option<String> = conn.get(self.task_key(id)).await.map_err(Self::map_err)?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save_task(&self, conn: &mut ConnectionManager, task: &Task) -> AppResult<()> {
        let json = serde_json::to_string(task)?;
        let _: () = conn
            .set(self.task_key(task.id), json)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn remove_from_processing(
        &self,
        conn: &mut ConnectionManager,
        id: TaskId,
    ) -> AppResult<()> {
        let _: () = conn
            .lrem(self.processing_key(), 1, id.to_string())
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for RedisTaskStore {
    async fn enqueue(
        &self,
        operation: &str,
        payload: serde_json::Value,
        max_attempts: u32,
    ) -> AppResult<Task> {
        let task = Task::new(operation, payload, max_attempts);
        let mut conn = self.client.conn_mut();

        self.save_task(&mut conn, &task).await?;
        let _: () = conn
            .lpush(self.pending_key(), task.id.to_string())
            .await
            .map_err(Self::map_err)?;

        debug!(task_id = %task.id, operation, "Task enqueued");
        Ok(task)
    }

    async fn claim(&self, worker_id: &str, wait: Duration) -> AppResult<Option<Task>> {
        let pending = self.pending_key();
        let processing = self.processing_key();
        let mut conn = self.client.conn_mut();
        let deadline = Instant::now() + wait;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());

            // BLMOVE with timeout 0 blocks forever, so fall back to a
            // non-blocking LMOVE once the wait is exhausted.
            let raw_id: Option<String> = if remaining.is_zero() {
                redis::cmd("LMOVE")
                    .arg(&pending)
                    .arg(&processing)
                    .arg("RIGHT")
                    .arg("LEFT")
                    .query_async(&mut conn)
                    .await
                    .map_err(Self::map_err)?
            } else {
                conn.blmove(
                    &pending,
                    &processing,
                    Direction::Right,
                    Direction::Left,
                    remaining.as_secs_f64(),
                )
                .await
                .map_err(Self::map_err)?
            };

            let Some(raw_id) = raw_id else {
                return Ok(None);
            };

            let task_id: TaskId = raw_id
                .parse()
                .map_err(|e| AppError::store(format!("Malformed task id in queue: {e}")))?;

            match self.load_task(&mut conn, task_id).await? {
                Some(mut task) => {
                    task.status = TaskStatus::Processing;
                    task.attempts += 1;
                    task.started_at = Some(Utc::now());
                    task.worker_id = Some(worker_id.to_string());
                    self.save_task(&mut conn, &task).await?;

                    debug!(task_id = %task_id, worker_id, attempt = task.attempts, "Task claimed");
                    return Ok(Some(task));
                }
                None => {
                    // Record was cleaned up while the id still sat in
                    // the queue. Drop the stale id and keep waiting.
                    warn!(task_id = %task_id, "Dropping stale queue entry");
                    self.remove_from_processing(&mut conn, task_id).await?;
                }
            }
        }
    }

    async fn complete(&self, id: TaskId, result: serde_json::Value) -> AppResult<()> {
        let mut conn = self.client.conn_mut();
        let mut task = self
            .load_task(&mut conn, id)
            .await?
            .ok_or_else(|| AppError::store(format!("Unknown task: {id}")))?;

        task.status = TaskStatus::Completed;
        task.result = Some(result);
        task.error = None;
        task.completed_at = Some(Utc::now());
        self.save_task(&mut conn, &task).await?;
        self.remove_from_processing(&mut conn, id).await?;

        debug!(task_id = %id, attempts = task.attempts, "Task completed");
        Ok(())
    }

    async fn fail(&self, id: TaskId, error: &str) -> AppResult<()> {
        let mut conn = self.client.conn_mut();
        let mut task = self
            .load_task(&mut conn, id)
            .await?
            .ok_or_else(|| AppError::store(format!("Unknown task: {id}")))?;

        task.error = Some(error.to_string());
        self.remove_from_processing(&mut conn, id).await?;

        if task.attempts < task.max_attempts {
            task.status = TaskStatus::Pending;
            task.worker_id = None;
            task.started_at = None;
            self.save_task(&mut conn, &task).await?;
            let _: () = conn
                .lpush(self.pending_key(), id.to_string())
                .await
                .map_err(Self::map_err)?;

            debug!(
                task_id = %id,
                attempt = task.attempts,
                max_attempts = task.max_attempts,
                "Task requeued after failure"
            );
        } else {
            task.status = TaskStatus::Failed;
            task.completed_at = Some(Utc::now());
            self.save_task(&mut conn, &task).await?;

            warn!(task_id = %id, attempts = task.attempts, error, "Task failed permanently");
        }
        Ok(())
    }

    async fn status(&self, id: TaskId) -> AppResult<Option<TaskStatusView>> {
        let mut conn = self.client.conn_mut();
        Ok(self
            .load_task(&mut conn, id)
            .await?
            .map(|task| TaskStatusView::from(&task)))
    }

    async fn position(&self, id: TaskId) -> AppResult<i64> {
        let mut conn = self.client.conn_mut();
        let Some(task) = self.load_task(&mut conn, id).await? else {
            return Ok(-1);
        };

        match task.status {
            TaskStatus::Processing => Ok(0),
            TaskStatus::Pending => {
                let pending = self.pending_key();
                let idx: Option<i64> = redis::cmd("LPOS")
                    .arg(&pending)
                    .arg(id.to_string())
                    .query_async(&mut conn)
                    .await
                    .map_err(Self::map_err)?;

                match idx {
                    Some(i) => {
                        // Claim pops from the right, so the queue
                        // position counts from the right end.
                        let len: i64 = conn.llen(&pending).await.map_err(Self::map_err)?;
                        Ok(len - i)
                    }
                    None => Ok(-1),
                }
            }
            _ => Ok(-1),
        }
    }

    async fn queue_stats(&self) -> AppResult<QueueStats> {
        let mut conn = self.client.conn_mut();
        let pending: u64 = conn
            .llen(self.pending_key())
            .await
            .map_err(Self::map_err)?;
        let processing: u64 = conn
            .llen(self.processing_key())
            .await
            .map_err(Self::map_err)?;

        let record_keys: Vec<String> = redis::cmd("KEYS")
            .arg(self.client.prefixed_key(&keys::task_pattern()))
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        let total_results = (record_keys.len() as u64).saturating_sub(pending + processing);

        Ok(QueueStats {
            pending,
            processing,
            total_results,
        })
    }

    async fn clear_orphans(&self, older_than: Duration) -> AppResult<u64> {
        let mut conn = self.client.conn_mut();
        let claimed: Vec<String> = conn
            .lrange(self.processing_key(), 0, -1)
            .await
            .map_err(Self::map_err)?;

        let now = Utc::now();
        let mut reclaimed = 0u64;

        for raw_id in claimed {
            let Ok(task_id) = raw_id.parse::<TaskId>() else {
                let _: () = conn
                    .lrem(self.processing_key(), 1, &raw_id)
                    .await
                    .map_err(Self::map_err)?;
                continue;
            };

            let Some(mut task) = self.load_task(&mut conn, task_id).await? else {
                self.remove_from_processing(&mut conn, task_id).await?;
                continue;
            };

            if task.status != TaskStatus::Processing {
                self.remove_from_processing(&mut conn, task_id).await?;
                continue;
            }

            let stuck = task
                .started_at
                .map(|t| (now - t).to_std().unwrap_or_default() >= older_than)
                .unwrap_or(true);
            if !stuck {
                continue;
            }

            self.remove_from_processing(&mut conn, task_id).await?;
            task.error = Some("Reclaimed from unresponsive worker".to_string());

            if task.attempts < task.max_attempts {
                task.status = TaskStatus::Pending;
                task.worker_id = None;
                task.started_at = None;
                self.save_task(&mut conn, &task).await?;
                let _: () = conn
                    .lpush(self.pending_key(), task_id.to_string())
                    .await
                    .map_err(Self::map_err)?;
            } else {
                task.status = TaskStatus::Failed;
                task.completed_at = Some(now);
                self.save_task(&mut conn, &task).await?;
            }
            reclaimed += 1;
        }

        if reclaimed > 0 {
            info!(reclaimed, "Reclaimed orphaned tasks");
        }
        Ok(reclaimed)
    }

    async fn clear_old_results(&self, older_than: Duration) -> AppResult<u64> {
        let mut conn = self.client.conn_mut();
        let record_keys: Vec<String> = redis::cmd("KEYS")
            .arg(self.client.prefixed_key(&keys::task_pattern()))
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;

        let now = Utc::now();
        let mut removed = 0u64;

        for key in record_keys {
            let raw: Option<String> = conn.get(&key).await.map_err(Self::map_err)?;
            let Some(json) = raw else { continue };
            let Ok(task) = serde_json::from_str::<Task>(&json) else {
                continue;
            };

            let expired = task.status.is_terminal()
                && task
                    .completed_at
                    .map(|t| (now - t).to_std().unwrap_or_default() >= older_than)
                    .unwrap_or(false);
            if expired {
                let _: () = conn.del(&key).await.map_err(Self::map_err)?;
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, "Deleted old task results");
        }
        Ok(removed)
    }

    async fn ping(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }
}
