//! ScrapeHub Server — Resilient Portal Extraction Service
//!
//! Main entry point that wires all crates together and starts the
//! worker daemon.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use scrapehub_core::config::AppConfig;
use scrapehub_core::error::AppError;
use scrapehub_pool::{ConcurrencyGate, SessionPool, Supervisor};
use scrapehub_portal::{HttpPortalDriver, RawFetchOperation};
use scrapehub_store::{StoreManager, TaskStore};
use scrapehub_worker::{CronScheduler, OperationRegistry, TaskQueue, WorkerRunner};

#[tokio::main]
async fn main() {
    let env = std::env::var("SCRAPEHUB_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main daemon run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting ScrapeHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Task store ───────────────────────────────────────
    tracing::info!("Initializing task store (provider: {})...", config.store.provider);
    let store = StoreManager::new(&config.store).await?;
    if !store.ping().await? {
        return Err(AppError::store("Task store did not answer ping"));
    }
    tracing::info!("Task store ready");

    let queue = Arc::new(TaskQueue::new(Arc::new(store), &config.store));

    // ── Step 2: Portal driver ────────────────────────────────────
    tracing::info!("Initializing portal driver for {}...", config.portal.base_url);
    let driver = Arc::new(HttpPortalDriver::new(config.portal.clone()));

    // ── Step 3: Session pool + concurrency gate ──────────────────
    let pool = Arc::new(SessionPool::new(Arc::clone(&driver), config.pool.clone()));
    let gate = Arc::new(ConcurrencyGate::new(&config.gate));
    tracing::info!(
        max_sessions = config.pool.max_sessions,
        max_concurrent = config.gate.max_concurrent,
        "Session pool and gate ready"
    );

    // ── Step 4: Supervisor ───────────────────────────────────────
    let supervisor = Arc::new(Supervisor::new(
        Arc::clone(&driver),
        Arc::clone(&pool),
        Arc::clone(&gate),
        config.supervisor.clone(),
    ));

    // ── Step 5: Operation registry ───────────────────────────────
    let mut registry = OperationRegistry::new();
    registry.register(Arc::new(RawFetchOperation::new()));
    let registry = Arc::new(registry);

    // ── Step 6: Shutdown channel ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 7: Worker fleet ─────────────────────────────────────
    let worker_handle = if config.worker.enabled {
        tracing::info!("Starting worker fleet...");
        let runner = WorkerRunner::new(
            Arc::clone(&queue),
            Arc::clone(&supervisor),
            Arc::clone(&registry),
            config.worker.clone(),
        );

        let worker_cancel = shutdown_rx.clone();
        let handle = tokio::spawn(async move {
            runner.run(worker_cancel).await;
        });

        tracing::info!("Worker fleet started");
        Some(handle)
    } else {
        tracing::info!("Worker fleet disabled");
        None
    };

    // ── Step 8: Cron scheduler ───────────────────────────────────
    let mut scheduler = CronScheduler::new(Arc::clone(&pool), Arc::clone(&queue)).await?;
    scheduler.register_default_tasks(&config.pool).await?;
    scheduler.start().await?;

    tracing::info!("ScrapeHub is running");

    // ── Step 9: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    let _ = shutdown_tx.send(true);

    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!("Scheduler shutdown failed: {e}");
    }

    if let Some(handle) = worker_handle {
        let drain = Duration::from_secs(config.worker.drain_timeout_seconds + 5);
        let _ = tokio::time::timeout(drain, handle).await;
    }

    pool.shutdown().await;

    tracing::info!("ScrapeHub shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
