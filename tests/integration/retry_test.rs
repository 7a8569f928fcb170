//! Integration tests for the retry pipeline, submission to terminal status.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use serde_json::json;

use scrapehub_core::traits::operation::{Operation, OperationError};
use scrapehub_entity::task::TaskStatus;
use scrapehub_worker::OperationRegistry;

use crate::helpers::{FailingOperation, ScriptedOperation, StackOptions, StubPortal, TestStack};

#[tokio::test]
async fn test_task_retries_until_success() {
    let stack = TestStack::with(StackOptions {
        worker_count: 1,
        ..StackOptions::default()
    });

    // Two transient failures, then a result.
    let op = Arc::new(ScriptedOperation::new(vec![
        Err(OperationError::Transient("portal timed out".to_string())),
        Err(OperationError::Transient("portal timed out again".to_string())),
        Ok(json!({"rows": 7})),
    ]));
    let mut registry = OperationRegistry::<StubPortal>::new();
    let registered: Arc<dyn Operation<StubPortal>> = op.clone();
    registry.register(registered);

    let (shutdown_tx, fleet) = stack.start_workers(registry);

    let task = stack
        .queue
        .submit_with_attempts("scripted", json!({"path": "/case/1"}), 3)
        .await
        .expect("submit");
    let view = stack.wait_for_terminal(task.id).await;

    assert_eq!(view.status, TaskStatus::Completed);
    assert_eq!(view.attempts, 3);
    assert_eq!(view.result, Some(json!({"rows": 7})));
    assert!(view.error.is_none());
    assert_eq!(op.calls.load(Ordering::SeqCst), 3);

    shutdown_tx.send(true).expect("signal");
    fleet.await.expect("fleet");
}

#[tokio::test]
async fn test_task_fails_after_attempt_budget() {
    let stack = TestStack::new();

    let mut registry = OperationRegistry::<StubPortal>::new();
    registry.register(Arc::new(FailingOperation));

    let (shutdown_tx, fleet) = stack.start_workers(registry);

    let task = stack
        .queue
        .submit_with_attempts("failing", json!({"path": "/case/2"}), 2)
        .await
        .expect("submit");
    let view = stack.wait_for_terminal(task.id).await;

    // Exactly the attempt budget, no more.
    assert_eq!(view.status, TaskStatus::Failed);
    assert_eq!(view.attempts, 2);
    assert!(view.result.is_none());
    assert!(
        view.error
            .expect("error recorded")
            .contains("portal returned HTTP 502")
    );

    shutdown_tx.send(true).expect("signal");
    fleet.await.expect("fleet");
}

#[tokio::test]
async fn test_fleet_works_through_a_batch() {
    let stack = TestStack::with(StackOptions {
        worker_count: 4,
        ..StackOptions::default()
    });

    let mut registry = OperationRegistry::<StubPortal>::new();
    registry.register(Arc::new(ScriptedOperation::new(Vec::new())));

    let (shutdown_tx, fleet) = stack.start_workers(registry);

    let mut ids = Vec::new();
    for i in 0..12 {
        let id = stack
            .queue
            .submit("scripted", json!({"index": i}))
            .await
            .expect("submit");
        ids.push(id);
    }

    for id in ids {
        let view = stack.wait_for_terminal(id).await;
        assert_eq!(view.status, TaskStatus::Completed);
        assert_eq!(view.attempts, 1);
    }

    let stats = stack.queue.stats().await.expect("stats");
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.processing, 0);
    assert_eq!(stats.total_results, 12);

    shutdown_tx.send(true).expect("signal");
    fleet.await.expect("fleet");
}
