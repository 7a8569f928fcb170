//! # scrapehub-worker
//!
//! The task-processing side of ScrapeHub: a queue facade over the
//! durable store, the operation registry workers dispatch through, the
//! worker loops themselves, and the cron scheduler that drives pool
//! maintenance, the orphan reaper and result retention cleanup.

pub mod executor;
pub mod queue;
pub mod runner;
pub mod scheduler;

pub use executor::OperationRegistry;
pub use queue::TaskQueue;
pub use runner::WorkerRunner;
pub use scheduler::CronScheduler;
