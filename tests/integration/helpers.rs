//! Shared test helpers for integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::watch;

use scrapehub_core::config::gate::GateConfig;
use scrapehub_core::config::pool::PoolConfig;
use scrapehub_core::config::store::StoreConfig;
use scrapehub_core::config::supervisor::SupervisorConfig;
use scrapehub_core::config::worker::WorkerConfig;
use scrapehub_core::result::AppResult;
use scrapehub_core::traits::driver::{PortalDriver, ProbeOutcome};
use scrapehub_core::traits::operation::{Operation, OperationError};
use scrapehub_core::types::TaskId;
use scrapehub_entity::task::TaskStatusView;
use scrapehub_pool::{ConcurrencyGate, SessionPool, Supervisor};
use scrapehub_store::memory::MemoryTaskStore;
use scrapehub_worker::{OperationRegistry, TaskQueue, WorkerRunner};

/// Portal driver double with scriptable probe outcomes and call counters.
#[derive(Debug, Default)]
pub struct StubPortal {
    next_handle: AtomicU32,
    pub logins: AtomicUsize,
    pub teardowns: AtomicUsize,
    outcomes: StdMutex<HashMap<u32, ProbeOutcome>>,
}

impl StubPortal {
    /// Script the probe outcome for a specific handle.
    pub fn set_outcome(&self, handle: u32, outcome: ProbeOutcome) {
        self.outcomes
            .lock()
            .expect("outcomes lock")
            .insert(handle, outcome);
    }
}

#[async_trait]
impl PortalDriver for StubPortal {
    type Handle = u32;

    async fn connect(&self) -> AppResult<u32> {
        Ok(self.next_handle.fetch_add(1, Ordering::SeqCst))
    }

    async fn login(&self, _handle: &u32) -> AppResult<()> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn probe(&self, handle: &u32) -> ProbeOutcome {
        self.outcomes
            .lock()
            .expect("outcomes lock")
            .get(handle)
            .copied()
            .unwrap_or(ProbeOutcome::Healthy)
    }

    async fn refresh(&self, _handle: &u32) -> AppResult<()> {
        Ok(())
    }

    async fn teardown(&self, _handle: &u32) {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Operation that pops scripted results in order, then keeps succeeding.
#[derive(Debug)]
pub struct ScriptedOperation {
    script: StdMutex<VecDeque<Result<Value, OperationError>>>,
    pub calls: AtomicUsize,
}

impl ScriptedOperation {
    pub fn new(script: Vec<Result<Value, OperationError>>) -> Self {
        Self {
            script: StdMutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Operation<StubPortal> for ScriptedOperation {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn execute(&self, _handle: &u32, _payload: &Value) -> Result<Value, OperationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Ok(json!({"ok": true})))
    }
}

/// Operation that always fails with a transient error.
#[derive(Debug, Default)]
pub struct FailingOperation;

#[async_trait]
impl Operation<StubPortal> for FailingOperation {
    fn name(&self) -> &str {
        "failing"
    }

    async fn execute(&self, _handle: &u32, _payload: &Value) -> Result<Value, OperationError> {
        Err(OperationError::Transient(
            "portal returned HTTP 502".to_string(),
        ))
    }
}

/// Operation that blocks until released, recording peak concurrency.
#[derive(Debug)]
pub struct BlockingOperation {
    release: watch::Receiver<bool>,
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
}

impl BlockingOperation {
    /// Create the operation and the sender that releases all blocked calls.
    pub fn new() -> (Self, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        let op = Self {
            release: rx,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        (op, tx)
    }
}

#[async_trait]
impl Operation<StubPortal> for BlockingOperation {
    fn name(&self) -> &str {
        "blocking"
    }

    async fn execute(&self, _handle: &u32, _payload: &Value) -> Result<Value, OperationError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);

        let mut release = self.release.clone();
        while !*release.borrow() {
            if release.changed().await.is_err() {
                break;
            }
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(json!({"released": true}))
    }
}

/// Tunables for a test stack. Defaults keep tests fast and deterministic.
pub struct StackOptions {
    pub max_sessions: usize,
    pub idle_timeout_minutes: u64,
    pub max_concurrent: usize,
    pub acquire_timeout_seconds: u64,
    pub max_retries: u32,
    pub claim_wait_seconds: u64,
    pub default_max_attempts: u32,
    pub orphan_timeout_seconds: u64,
    pub worker_count: usize,
}

impl Default for StackOptions {
    fn default() -> Self {
        Self {
            max_sessions: 4,
            idle_timeout_minutes: 10,
            max_concurrent: 4,
            acquire_timeout_seconds: 30,
            max_retries: 1,
            claim_wait_seconds: 1,
            default_max_attempts: 3,
            orphan_timeout_seconds: 600,
            worker_count: 2,
        }
    }
}

/// Full service stack over the in-memory store and the stub portal.
pub struct TestStack {
    pub driver: Arc<StubPortal>,
    pub pool: Arc<SessionPool<StubPortal>>,
    pub gate: Arc<ConcurrencyGate>,
    pub supervisor: Arc<Supervisor<StubPortal>>,
    pub queue: Arc<TaskQueue>,
    worker_count: usize,
}

impl TestStack {
    /// Create a stack with the default options.
    pub fn new() -> Self {
        Self::with(StackOptions::default())
    }

    /// Create a stack with explicit options.
    pub fn with(options: StackOptions) -> Self {
        let driver = Arc::new(StubPortal::default());

        let pool = Arc::new(SessionPool::new(
            Arc::clone(&driver),
            PoolConfig {
                max_sessions: options.max_sessions,
                idle_timeout_minutes: options.idle_timeout_minutes,
                create_retries: 1,
                create_retry_delay_ms: 0,
                ..PoolConfig::default()
            },
        ));
        let gate = Arc::new(ConcurrencyGate::new(&GateConfig {
            max_concurrent: options.max_concurrent,
            acquire_timeout_seconds: options.acquire_timeout_seconds,
        }));
        let supervisor = Arc::new(Supervisor::new(
            Arc::clone(&driver),
            Arc::clone(&pool),
            Arc::clone(&gate),
            SupervisorConfig {
                max_retries: options.max_retries,
                operation_timeout_seconds: 30,
                backoff_base_ms: 0,
            },
        ));

        let store_config = StoreConfig {
            claim_wait_seconds: options.claim_wait_seconds,
            default_max_attempts: options.default_max_attempts,
            orphan_timeout_seconds: options.orphan_timeout_seconds,
            ..StoreConfig::default()
        };
        let queue = Arc::new(TaskQueue::new(
            Arc::new(MemoryTaskStore::new()),
            &store_config,
        ));

        Self {
            driver,
            pool,
            gate,
            supervisor,
            queue,
            worker_count: options.worker_count,
        }
    }

    /// Spawn a worker fleet over the stack.
    ///
    /// Returns the shutdown sender and the fleet's join handle; send
    /// `true` and await the handle to drain.
    pub fn start_workers(
        &self,
        registry: OperationRegistry<StubPortal>,
    ) -> (watch::Sender<bool>, tokio::task::JoinHandle<()>) {
        let runner = WorkerRunner::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.supervisor),
            Arc::new(registry),
            WorkerConfig {
                enabled: true,
                worker_count: self.worker_count,
                drain_timeout_seconds: 5,
            },
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { runner.run(shutdown_rx).await });
        (shutdown_tx, handle)
    }

    /// Poll a task until it reaches a terminal status.
    pub async fn wait_for_terminal(&self, id: TaskId) -> TaskStatusView {
        for _ in 0..250 {
            let view = self
                .queue
                .status(id)
                .await
                .expect("status")
                .expect("record");
            if view.status.is_terminal() {
                return view;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("task never reached a terminal status");
    }
}
