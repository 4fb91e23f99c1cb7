//! Shared helpers for integration tests.

use sys2::{Session, SessionConfig};

/// Default session: exact substrate, symbolic priority, Core packs loaded.
pub fn session() -> Session {
    Session::open(SessionConfig::default()).expect("session open")
}

pub fn session_with(strategy: &str, priority: &str) -> Session {
    Session::open(SessionConfig {
        strategy: strategy.to_string(),
        reasoning_priority: priority.to_string(),
        ..SessionConfig::default()
    })
    .expect("session open")
}

/// Learn and assert the batch committed.
pub fn learn_ok(session: &mut Session, text: &str) {
    let result = session.learn(text);
    assert!(
        result.success,
        "learn failed: errors={:?} rejected={:?}",
        result.errors, result.rejected
    );
}

/// Single binding of the only hole across all answers, in result order.
pub fn hole_values(session: &mut Session, pattern: &str, hole: &str) -> Vec<String> {
    session
        .query(pattern)
        .all_results
        .iter()
        .map(|a| a.bindings[hole].clone())
        .collect()
}
