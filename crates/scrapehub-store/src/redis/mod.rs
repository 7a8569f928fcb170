//! Redis-backed task queue.

pub mod client;
pub mod store;

pub use client::RedisClient;
pub use store::RedisTaskStore;
