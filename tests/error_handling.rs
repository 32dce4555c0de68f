//! Sad path tests: every failure ends its cycle quietly, leaves the
//! displayed state alone and shows up on the event channel.

mod common;

use common::{logins, TestEnv};
use hubscout::api::{Slot, UserRecord};
use hubscout::error::CycleError;
use hubscout::services::{ControllerEvent, ResultSource};
use std::sync::atomic::Ordering;

/// Runs a successful "abc" search so there is state to preserve.
async fn with_abc_results(env: &mut TestEnv) {
    env.remote.script_search("abc", &["abc1"]);
    env.remote.script_user("abc1", 3);
    env.controller.on_input("abc");
    env.next_terminal().await;
    assert_eq!(logins(&env.state()), vec!["abc1"]);
}

fn suppressed(event: ControllerEvent) -> std::sync::Arc<CycleError> {
    match event {
        ControllerEvent::Suppressed { error, .. } => error,
        other => panic!("expected suppressed cycle, got {other:?}"),
    }
}

// ============================================================================
// Remote failures
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_coarse_search_failure_keeps_previous_results() {
    let mut env = TestEnv::new();
    with_abc_results(&mut env).await;

    env.remote.script_search_failure("xyz");
    env.controller.on_input("xyz");
    let error = suppressed(env.next_terminal().await);

    assert!(matches!(*error, CycleError::Search { ref query, .. } if query == "xyz"));
    assert_eq!(error.code(), "DECODE_ERROR");
    assert_eq!(logins(&env.state()), vec!["abc1"]);
    assert!(env.cache.peek("xyz").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_check_failure_aborts_before_search() {
    let mut env = TestEnv::new();
    env.remote.fail_rate_limit();
    env.remote.script_search("abc", &["abc1"]);

    env.controller.on_input("abc");
    let error = suppressed(env.next_terminal().await);

    assert!(matches!(*error, CycleError::RateLimitCheck(_)));
    assert_eq!(env.remote.search_calls.load(Ordering::SeqCst), 0);
    assert!(env.state().results.is_empty());
    assert!(!env.state().no_results_found);
}

#[tokio::test(start_paused = true)]
async fn test_no_retry_after_failure() {
    let mut env = TestEnv::new();
    env.remote.script_search_failure("abc");

    env.controller.on_input("abc");
    env.next_terminal().await;
    tokio::time::sleep(std::time::Duration::from_secs(30)).await;

    assert_eq!(env.remote.search_calls.load(Ordering::SeqCst), 1);
    assert_eq!(env.remote.rate_calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Cache failures
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_cache_read_failure_aborts_cycle() {
    let mut env = TestEnv::new();
    env.cache.fail_reads.store(true, Ordering::SeqCst);
    env.remote.script_search("abc", &["abc1"]);

    env.controller.on_input("abc");
    let error = suppressed(env.next_terminal().await);

    assert!(matches!(*error, CycleError::CacheRead { .. }));
    assert_eq!(env.remote.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cache_write_failure_still_emits() {
    let mut env = TestEnv::new();
    env.cache.fail_writes.store(true, Ordering::SeqCst);
    env.remote.script_search("abc", &["abc1"]);
    env.remote.script_user("abc1", 3);

    env.controller.on_input("abc");
    let first = env.next_terminal().await;
    let error = suppressed(first);
    assert!(matches!(*error, CycleError::CacheWrite { .. }));

    let second = env.next_terminal().await;
    assert!(matches!(
        second,
        ControllerEvent::Emitted {
            source: ResultSource::Remote,
            ..
        }
    ));
    assert_eq!(
        env.state().results,
        vec![Slot::from(UserRecord::new("abc1", 3))]
    );
    assert_eq!(env.cache.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_cache_entry_falls_back_to_remote() {
    let mut env = TestEnv::new();
    env.cache.seed("abc", "{not json");
    env.remote.script_search("abc", &["abc1"]);
    env.remote.script_user("abc1", 3);

    env.controller.on_input("abc");
    let event = env.next_terminal().await;

    assert!(matches!(
        event,
        ControllerEvent::Emitted {
            source: ResultSource::Remote,
            ..
        }
    ));
    assert_eq!(logins(&env.state()), vec!["abc1"]);
    // The broken entry is never rewritten
    assert_eq!(env.cache.peek("abc").as_deref(), Some("{not json"));
}

#[tokio::test(start_paused = true)]
async fn test_suppressed_errors_without_subscribers_are_dropped() {
    let env = TestEnv::new();
    env.remote.script_search_failure("abc");

    // No receivers left on the event channel
    let controller = env.controller.clone();
    drop(env.events);
    controller.on_input("abc");
    tokio::time::sleep(std::time::Duration::from_secs(5)).await;

    assert_eq!(env.remote.search_calls.load(Ordering::SeqCst), 1);
    assert!(controller.snapshot().results.is_empty());
}
