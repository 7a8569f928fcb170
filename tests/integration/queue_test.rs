//! Integration tests for task queue claim and lifecycle semantics.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde_json::json;

use scrapehub_entity::task::TaskStatus;

use crate::helpers::{StackOptions, TestStack};

#[tokio::test]
async fn test_concurrent_claims_never_share_a_task() {
    let stack = TestStack::with(StackOptions {
        claim_wait_seconds: 0,
        ..StackOptions::default()
    });

    let mut submitted = HashSet::new();
    for i in 0..20 {
        let id = stack
            .queue
            .submit("raw_fetch", json!({"path": format!("/case/{i}")}))
            .await
            .expect("submit");
        submitted.insert(id);
    }

    // Eight claimants race over the queue until it runs dry.
    let claimed = Arc::new(Mutex::new(Vec::new()));
    let mut claimants = Vec::new();
    for worker in 0..8 {
        let queue = Arc::clone(&stack.queue);
        let claimed = Arc::clone(&claimed);
        claimants.push(tokio::spawn(async move {
            let worker_id = format!("worker-{worker}");
            while let Some(task) = queue.claim(&worker_id).await.expect("claim") {
                claimed.lock().expect("claimed lock").push(task.id);
            }
        }));
    }
    for claimant in claimants {
        claimant.await.expect("claimant");
    }

    // Every task claimed exactly once.
    let claimed = claimed.lock().expect("claimed lock");
    assert_eq!(claimed.len(), 20);
    let unique: HashSet<_> = claimed.iter().copied().collect();
    assert_eq!(unique, submitted);
}

#[tokio::test]
async fn test_terminal_status_reads_are_stable() {
    let stack = TestStack::with(StackOptions {
        claim_wait_seconds: 0,
        ..StackOptions::default()
    });

    let id = stack
        .queue
        .submit("raw_fetch", json!({"path": "/consulta"}))
        .await
        .expect("submit");
    let task = stack.queue.claim("worker-1").await.expect("claim").expect("task");
    stack
        .queue
        .complete(task.id, json!({"rows": 2}))
        .await
        .expect("complete");

    // Reads after the terminal transition all see the same record.
    let first = stack.queue.status(id).await.expect("status").expect("record");
    let second = stack.queue.status(id).await.expect("status").expect("record");
    assert_eq!(first.status, TaskStatus::Completed);
    assert_eq!(second.status, TaskStatus::Completed);
    assert_eq!(first.result, second.result);
    assert_eq!(first.attempts, second.attempts);
    assert_eq!(stack.queue.position(id).await.expect("position"), -1);

    // A terminal task never comes back out of the queue.
    assert!(stack.queue.claim("worker-2").await.expect("claim").is_none());
}

#[tokio::test]
async fn test_orphaned_task_is_reclaimed() {
    let stack = TestStack::with(StackOptions {
        claim_wait_seconds: 0,
        orphan_timeout_seconds: 0,
        ..StackOptions::default()
    });

    let id = stack
        .queue
        .submit("raw_fetch", json!({"path": "/consulta"}))
        .await
        .expect("submit");

    // A worker claims the task and then disappears.
    stack.queue.claim("worker-dead").await.expect("claim").expect("task");
    assert_eq!(stack.queue.position(id).await.expect("position"), 0);

    assert_eq!(stack.queue.clear_orphans().await.expect("reap"), 1);

    let view = stack.queue.status(id).await.expect("status").expect("record");
    assert_eq!(view.status, TaskStatus::Pending);

    // Another worker picks the reclaimed task up for a second attempt.
    let task = stack
        .queue
        .claim("worker-live")
        .await
        .expect("claim")
        .expect("task");
    assert_eq!(task.id, id);
    assert_eq!(task.attempts, 2);
    assert_eq!(task.worker_id.as_deref(), Some("worker-live"));
}
