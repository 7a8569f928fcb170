//! Integration tests for gate admission under a saturated worker fleet.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::json;

use scrapehub_core::traits::operation::Operation;
use scrapehub_entity::task::TaskStatus;
use scrapehub_worker::OperationRegistry;

use crate::helpers::{BlockingOperation, StackOptions, StubPortal, TestStack};

#[tokio::test]
async fn test_gate_bounds_in_flight_operations() {
    let stack = TestStack::with(StackOptions {
        max_sessions: 10,
        max_concurrent: 6,
        worker_count: 10,
        ..StackOptions::default()
    });

    let (op, release) = BlockingOperation::new();
    let op = Arc::new(op);
    let mut registry = OperationRegistry::<StubPortal>::new();
    let registered: Arc<dyn Operation<StubPortal>> = op.clone();
    registry.register(registered);

    let (shutdown_tx, fleet) = stack.start_workers(registry);

    let mut ids = Vec::new();
    for i in 0..10 {
        let id = stack
            .queue
            .submit("blocking", json!({"index": i}))
            .await
            .expect("submit");
        ids.push(id);
    }

    // Six operations hold gate slots, the other four wait at the gate.
    let mut saturated = false;
    for _ in 0..250 {
        let stats = stack.gate.stats();
        if stats.active == 6 && stats.queued == 4 {
            saturated = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(saturated, "gate never reached 6 active / 4 queued");

    release.send(true).expect("release");

    for id in ids {
        let view = stack.wait_for_terminal(id).await;
        assert_eq!(view.status, TaskStatus::Completed);
    }

    assert!(op.peak.load(Ordering::SeqCst) <= 6);
    let stats = stack.gate.stats();
    assert_eq!(stats.total, 10);
    assert_eq!(stats.active, 0);
    assert_eq!(stats.failed, 0);

    shutdown_tx.send(true).expect("signal");
    fleet.await.expect("fleet");
}
