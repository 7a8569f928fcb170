//! Worker runner — independent claim/execute loops over the task queue.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{error, info, warn};
use uuid::Uuid;

use scrapehub_core::config::worker::WorkerConfig;
use scrapehub_core::traits::driver::PortalDriver;
use scrapehub_entity::task::Task;
use scrapehub_pool::Supervisor;

use crate::executor::OperationRegistry;
use crate::queue::TaskQueue;

/// Pause after a store error before re-entering the claim loop.
const CLAIM_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Spawns and drains the fleet of worker loops.
///
/// Each loop claims one task at a time; parallelism comes from
/// `worker_count` loops, while the gate inside the supervisor bounds
/// in-flight portal operations globally.
#[derive(Debug)]
pub struct WorkerRunner<D: PortalDriver> {
    queue: Arc<TaskQueue>,
    supervisor: Arc<Supervisor<D>>,
    registry: Arc<OperationRegistry<D>>,
    config: WorkerConfig,
}

impl<D: PortalDriver> WorkerRunner<D> {
    /// Create a runner over the queue, supervisor and registry.
    pub fn new(
        queue: Arc<TaskQueue>,
        supervisor: Arc<Supervisor<D>>,
        registry: Arc<OperationRegistry<D>>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            supervisor,
            registry,
            config,
        }
    }

    /// Run the worker fleet until the cancel signal flips to `true`,
    /// then wait up to the drain timeout for in-flight tasks.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        if !self.config.enabled {
            info!("Worker pool disabled by configuration");
            return;
        }

        info!(
            worker_count = self.config.worker_count,
            "Starting worker loops"
        );

        let mut handles = Vec::with_capacity(self.config.worker_count);
        for _ in 0..self.config.worker_count {
            let worker_id = format!("worker-{}", &Uuid::new_v4().to_string()[..8]);
            let queue = Arc::clone(&self.queue);
            let supervisor = Arc::clone(&self.supervisor);
            let registry = Arc::clone(&self.registry);
            let cancel = cancel.clone();

            handles.push(tokio::spawn(worker_loop(
                queue, supervisor, registry, worker_id, cancel,
            )));
        }

        // Wait for shutdown, then give in-flight tasks a bounded window.
        while !*cancel.borrow() {
            if cancel.changed().await.is_err() {
                break;
            }
        }

        info!("Waiting for in-flight tasks to drain");
        let drain = Duration::from_secs(self.config.drain_timeout_seconds);
        if timeout(drain, join_all(&mut handles)).await.is_err() {
            warn!(
                drain_timeout_seconds = self.config.drain_timeout_seconds,
                "Drain timeout elapsed with workers still busy"
            );
            for handle in &handles {
                handle.abort();
            }
        }

        info!("Worker fleet stopped");
    }
}

async fn worker_loop<D: PortalDriver>(
    queue: Arc<TaskQueue>,
    supervisor: Arc<Supervisor<D>>,
    registry: Arc<OperationRegistry<D>>,
    worker_id: String,
    mut cancel: watch::Receiver<bool>,
) {
    info!(worker = %worker_id, "Worker loop started");

    loop {
        if *cancel.borrow() {
            break;
        }

        tokio::select! {
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    break;
                }
            }
            claimed = queue.claim(&worker_id) => {
                match claimed {
                    Ok(Some(task)) => {
                        process_task(&queue, &supervisor, &registry, task).await;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        error!(worker = %worker_id, error = %e, "Claim failed");
                        tokio::time::sleep(CLAIM_ERROR_BACKOFF).await;
                    }
                }
            }
        }
    }

    info!(worker = %worker_id, "Worker loop stopped");
}

async fn process_task<D: PortalDriver>(
    queue: &TaskQueue,
    supervisor: &Supervisor<D>,
    registry: &OperationRegistry<D>,
    task: Task,
) {
    info!(
        task_id = %task.id,
        operation = %task.operation,
        attempt = task.attempts,
        max_attempts = task.max_attempts,
        "Processing task"
    );

    let Some(operation) = registry.get(&task.operation) else {
        let message = format!("No operation registered for '{}'", task.operation);
        error!(task_id = %task.id, "{message}");
        if let Err(e) = queue.fail(task.id, &message).await {
            error!(task_id = %task.id, error = %e, "Failed to record task failure");
        }
        return;
    };

    match supervisor.execute(operation.as_ref(), &task.payload).await {
        Ok(result) => {
            if let Err(e) = queue.complete(task.id, result).await {
                error!(task_id = %task.id, error = %e, "Failed to record task completion");
            } else {
                info!(task_id = %task.id, "Task completed");
            }
        }
        Err(err) => {
            warn!(task_id = %task.id, error = %err, "Task attempt failed");
            if let Err(e) = queue.fail(task.id, &err.to_string()).await {
                error!(task_id = %task.id, error = %e, "Failed to record task failure");
            }
        }
    }
}
