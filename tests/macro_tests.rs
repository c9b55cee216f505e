//! Integration tests for the `#[testkit_expect::test]` macro.

#![cfg(feature = "macros")]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use testkit_expect::clock::MockClock;
use testkit_expect::prelude::*;

/// Plain functions become ordinary tests.
#[testkit_expect::test]
fn test_basic_sync() {
    expect_value(2 + 2).to(equal(4));
}

/// Async functions run on a tokio runtime.
#[testkit_expect::test]
async fn test_basic_async() {
    let expectation = expect_async(|| async { 4 }).to(equal(4)).await;
    assert_eq!(expectation.status(), ExpectationStatus::Passed);
}

/// Polling defaults are overridden for the test body.
#[testkit_expect::test(timeout_ms = 50, poll_interval_ms = 5)]
fn test_scoped_polling_defaults() {
    let defaults = PollingDefaults::current();
    assert_eq!(defaults.timeout(), Duration::from_millis(50));
    assert_eq!(defaults.poll_interval(), Duration::from_millis(5));

    let polls = Arc::new(AtomicUsize::new(0));
    let counter = polls.clone();
    expect(move || counter.fetch_add(1, Ordering::SeqCst)).to_never(equal(usize::MAX));
    assert!(polls.load(Ordering::SeqCst) > 1);
}

/// Scoped defaults also apply to async test bodies.
#[testkit_expect::test(timeout_ms = 30)]
async fn test_scoped_defaults_async() {
    assert_eq!(PollingDefaults::current().timeout(), Duration::from_millis(30));
}

/// A `MockClock` parameter is injected.
#[testkit_expect::test]
fn test_with_clock(clock: MockClock) {
    assert_eq!(clock.now(), Duration::ZERO);

    clock.advance(Duration::from_secs(10));
    assert_eq!(clock.now(), Duration::from_secs(10));
}

/// The injected clock can start later than zero.
#[testkit_expect::test(start_time_ms = 1500)]
async fn test_start_time(clock: MockClock) {
    assert_eq!(clock.now(), Duration::from_millis(1500));
}

/// An auto-advancing clock makes polling timeouts instant.
#[testkit_expect::test(auto_advance = true, timeout_ms = 200)]
fn test_virtual_time_polling(clock: MockClock) {
    assert!(clock.is_auto_advancing());

    let poller = Poller::current().with_clock(clock.clone());
    let expectation = expect(|| 1).using(poller).to_never(equal(0));

    assert_eq!(expectation.status(), ExpectationStatus::Passed);
    assert!(clock.now() >= Duration::from_millis(200));
}

/// The multi-threaded flavor is accepted.
#[testkit_expect::test(flavor = "multi_thread")]
async fn test_multi_thread_flavor() {
    let handle = tokio::spawn(async { 21 * 2 });
    let answer = handle.await.unwrap();
    expect_value(answer).to(equal(42));
}

/// Tests may still return a `Result`.
#[testkit_expect::test]
fn test_result_return() -> testkit_expect::Result<()> {
    let value = require_value(3).to(be_greater_than(2))?;
    assert_eq!(value, 3);
    Ok(())
}
