//! Key builders for all ScrapeHub queue entries.
//!
//! Centralising key construction prevents typos and makes it easy
//! to find every key the application uses. The configured key prefix
//! is applied by the Redis client, not here.

use scrapehub_core::types::TaskId;

/// List of pending task IDs. Enqueue pushes left, claim pops right.
pub fn pending_queue() -> String {
    "queue:pending".to_string()
}

/// List of task IDs currently claimed by workers.
pub fn processing_queue() -> String {
    "queue:processing".to_string()
}

/// Full task record, stored as a JSON string.
pub fn task_record(id: TaskId) -> String {
    format!("task:{id}")
}

/// Pattern matching every task record.
pub fn task_pattern() -> String {
    "task:*".to_string()
}
