//! Store manager that dispatches to the configured backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use scrapehub_core::config::store::StoreConfig;
use scrapehub_core::error::AppError;
use scrapehub_core::result::AppResult;
use scrapehub_core::types::{QueueStats, TaskId};
use scrapehub_entity::task::{Task, TaskStatusView};

use crate::traits::TaskStore;

/// Store manager that wraps the configured task store backend.
///
/// The backend is selected at construction time based on configuration.
#[derive(Clone)]
pub struct StoreManager {
    /// The inner task store.
    inner: Arc<dyn TaskStore>,
}

impl StoreManager {
    /// Create a new store manager from configuration.
    pub async fn new(config: &StoreConfig) -> AppResult<Self> {
        let inner: Arc<dyn TaskStore> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis task store");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Arc::new(crate::redis::RedisTaskStore::new(client))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory task store");
                Arc::new(crate::memory::MemoryTaskStore::new())
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown store provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a store manager from an existing store (for testing).
    pub fn from_store(store: Arc<dyn TaskStore>) -> Self {
        Self { inner: store }
    }

    /// Get a reference to the inner store.
    pub fn store(&self) -> &dyn TaskStore {
        self.inner.as_ref()
    }
}

#[async_trait]
impl TaskStore for StoreManager {
    async fn enqueue(
        &self,
        operation: &str,
        payload: serde_json::Value,
        max_attempts: u32,
    ) -> AppResult<Task> {
        self.inner.enqueue(operation, payload, max_attempts).await
    }

    async fn claim(&self, worker_id: &str, wait: Duration) -> AppResult<Option<Task>> {
        self.inner.claim(worker_id, wait).await
    }

    async fn complete(&self, id: TaskId, result: serde_json::Value) -> AppResult<()> {
        self.inner.complete(id, result).await
    }

    async fn fail(&self, id: TaskId, error: &str) -> AppResult<()> {
        self.inner.fail(id, error).await
    }

    async fn status(&self, id: TaskId) -> AppResult<Option<TaskStatusView>> {
        self.inner.status(id).await
    }

    async fn position(&self, id: TaskId) -> AppResult<i64> {
        self.inner.position(id).await
    }

    async fn queue_stats(&self) -> AppResult<QueueStats> {
        self.inner.queue_stats().await
    }

    async fn clear_orphans(&self, older_than: Duration) -> AppResult<u64> {
        self.inner.clear_orphans(older_than).await
    }

    async fn clear_old_results(&self, older_than: Duration) -> AppResult<u64> {
        self.inner.clear_old_results(older_than).await
    }

    async fn ping(&self) -> AppResult<bool> {
        self.inner.ping().await
    }
}
