//! Integration tests for session pool exclusivity and lifecycle.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scrapehub_core::traits::driver::ProbeOutcome;

use crate::helpers::{StackOptions, TestStack};

#[tokio::test]
async fn test_lease_exclusive_under_contention() {
    let stack = TestStack::with(StackOptions {
        max_sessions: 3,
        ..StackOptions::default()
    });

    let held = Arc::new(Mutex::new(HashSet::new()));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut leasers = Vec::new();
    for _ in 0..12 {
        let pool = Arc::clone(&stack.pool);
        let held = Arc::clone(&held);
        let peak = Arc::clone(&peak);
        leasers.push(tokio::spawn(async move {
            loop {
                let Some(session) = pool.lease().await else {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    continue;
                };
                {
                    let mut held = held.lock().expect("held lock");
                    assert!(held.insert(session.id), "session handed to two callers");
                    peak.fetch_max(held.len(), Ordering::SeqCst);
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
                held.lock().expect("held lock").remove(&session.id);
                pool.release(session.id).await;
                break;
            }
        }));
    }
    for leaser in leasers {
        leaser.await.expect("leaser");
    }

    assert!(peak.load(Ordering::SeqCst) <= 3);
    let stats = stack.pool.stats().await;
    assert_eq!(stats.busy, 0);
    assert!(stats.total <= 3);
}

#[tokio::test]
async fn test_lease_beyond_cap_returns_none() {
    let stack = TestStack::with(StackOptions {
        max_sessions: 2,
        ..StackOptions::default()
    });

    let a = stack.pool.lease().await.expect("first session");
    let b = stack.pool.lease().await.expect("second session");
    assert_ne!(a.id, b.id);

    // Both slots busy, the pool refuses rather than over-allocating.
    assert!(stack.pool.lease().await.is_none());

    // Releasing a slot makes leasing work again.
    stack.pool.release(a.id).await;
    assert!(stack.pool.lease().await.is_some());
}

#[tokio::test]
async fn test_dead_session_evicted_on_lease() {
    let stack = TestStack::with(StackOptions {
        max_sessions: 1,
        ..StackOptions::default()
    });

    let first = stack.pool.lease().await.expect("session");
    stack.driver.set_outcome(first.handle, ProbeOutcome::Dead);
    stack.pool.release(first.id).await;

    // The pool probes before reuse and replaces the dead session.
    let second = stack.pool.lease().await.expect("replacement");
    assert_ne!(first.id, second.id);
    assert_eq!(stack.driver.teardowns.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_idle_session_replaced_after_timeout() {
    let stack = TestStack::with(StackOptions {
        max_sessions: 1,
        idle_timeout_minutes: 0,
        ..StackOptions::default()
    });

    let first = stack.pool.lease().await.expect("session");
    stack.pool.release(first.id).await;

    // Zero idle timeout: the released session expires immediately and
    // the next lease gets a brand new one.
    let second = stack.pool.lease().await.expect("fresh session");
    assert_ne!(first.id, second.id);
    assert_eq!(stack.driver.teardowns.load(Ordering::SeqCst), 1);
}
