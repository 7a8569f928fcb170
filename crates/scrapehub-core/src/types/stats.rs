//! Snapshot types reported by the pool, gate, and task store.

use serde::{Deserialize, Serialize};

/// Point-in-time view of the session pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStats {
    /// Configured upper bound on live sessions.
    pub max_sessions: usize,
    /// Sessions currently held by the pool (busy + available).
    pub total: usize,
    /// Sessions leased to a caller right now.
    pub busy: usize,
    /// Healthy sessions ready to be leased.
    pub available: usize,
    /// Sessions whose login is currently believed valid.
    pub authenticated: usize,
}

/// Point-in-time view of the concurrency gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateStats {
    /// Configured cap on concurrently admitted operations.
    pub max_concurrent: usize,
    /// Operations currently inside the gate.
    pub active: usize,
    /// Callers currently waiting for a slot.
    pub queued: usize,
    /// Operations admitted since startup.
    pub total: u64,
    /// Admitted operations that ended in failure.
    pub failed: u64,
    /// Percentage of admitted operations that succeeded.
    pub success_rate: f64,
}

/// Point-in-time view of the durable task queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    /// Tasks waiting to be claimed.
    pub pending: u64,
    /// Tasks currently claimed by a worker.
    pub processing: u64,
    /// Terminal task records currently retained.
    pub total_results: u64,
}
