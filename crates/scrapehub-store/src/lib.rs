//! # scrapehub-store
//!
//! Task queue persistence for ScrapeHub. Supports two backends:
//!
//! - **redis-backend**: durable queue using the [redis](https://crates.io/crates/redis) crate
//! - **memory**: in-process queue for tests and single-node runs
//!
//! The backend is selected at runtime based on configuration.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;
pub mod traits;

pub use provider::StoreManager;
pub use traits::TaskStore;
