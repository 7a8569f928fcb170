//! Task entity model.

use chrono::{DateTime, Utc};
use scrapehub_core::types::TaskId;
use serde::{Deserialize, Serialize};

use super::status::TaskStatus;

/// A submitted extraction task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// Operation name (e.g., `"fetch_case"`, `"raw_fetch"`).
    pub operation: String,
    /// Operation-specific payload (JSON).
    pub payload: serde_json::Value,
    /// Current task status.
    pub status: TaskStatus,
    /// Number of execution attempts so far.
    pub attempts: u32,
    /// Maximum allowed attempts.
    pub max_attempts: u32,
    /// Result data on completion (JSON).
    pub result: Option<serde_json::Value>,
    /// Error message on failure.
    pub error: Option<String>,
    /// Worker ID that claimed the task.
    pub worker_id: Option<String>,
    /// When the task was submitted.
    pub created_at: DateTime<Utc>,
    /// When the task was last claimed for execution.
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new pending task.
    pub fn new(operation: impl Into<String>, payload: serde_json::Value, max_attempts: u32) -> Self {
        Self {
            id: TaskId::new(),
            operation: operation.into(),
            payload,
            status: TaskStatus::Pending,
            attempts: 0,
            max_attempts,
            result: None,
            error: None,
            worker_id: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Check if the task has attempts remaining.
    pub fn can_retry(&self) -> bool {
        !self.status.is_terminal() && self.attempts < self.max_attempts
    }
}

/// Client-facing view of a task's progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusView {
    /// Current status.
    pub status: TaskStatus,
    /// Result data, present once completed.
    pub result: Option<serde_json::Value>,
    /// Error message, present once failed.
    pub error: Option<String>,
    /// Attempts made so far.
    pub attempts: u32,
}

impl From<&Task> for TaskStatusView {
    fn from(task: &Task) -> Self {
        Self {
            status: task.status,
            result: task.result.clone(),
            error: task.error.clone(),
            attempts: task.attempts,
        }
    }
}
