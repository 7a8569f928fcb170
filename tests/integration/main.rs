//! Integration tests for the full service stack.
//!
//! Each suite wires the real pool, gate, supervisor and worker fleet
//! over the in-memory store and a stub portal driver from `helpers`.

mod helpers;

mod gate_test;
mod queue_test;
mod retry_test;
mod session_test;
