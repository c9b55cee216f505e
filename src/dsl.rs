//! Free-function entry points.
//!
//! Every function here is `#[track_caller]`, so failures point at the line
//! that called `expect(...)` or `require(...)`.

use std::future::Future;
use std::time::Duration;

use crate::error::Result;
use crate::expectation::{report, AsyncExpectation, SyncExpectation};
use crate::expression::{Actual, AsyncExpression, Expression};
use crate::location::SourceLocation;
use crate::matcher::be_some;
use crate::message::FailureMessage;
use crate::polling::{Done, Poller, PollingDefaults};
use crate::requirement::{AsyncRequirement, SyncRequirement};

/// Expect something of the value `f` returns.
///
/// The closure runs at most once per plain expectation, and once per tick
/// when polling.
#[track_caller]
pub fn expect<T, F>(f: F) -> SyncExpectation<T>
where
    T: Actual,
    F: Fn() -> T + Send + Sync + 'static,
{
    SyncExpectation::new(Expression::new(f, SourceLocation::caller()))
}

/// Expect something of an already computed value.
///
/// Such an expectation cannot poll.
#[track_caller]
pub fn expect_value<T: Actual>(value: T) -> SyncExpectation<T> {
    SyncExpectation::new(Expression::from_value(value, SourceLocation::caller()))
}

/// Expect something of a value that may be missing.
#[track_caller]
pub fn expect_option<T, F>(f: F) -> SyncExpectation<T>
where
    T: Actual,
    F: Fn() -> Option<T> + Send + Sync + 'static,
{
    SyncExpectation::new(Expression::optional(f, SourceLocation::caller()))
}

/// Expect something of a computation that may fail.
///
/// An `Err` is reported as `unexpected error thrown: <..>` unless the
/// matcher handles errors itself, like [`succeed`](crate::matcher::succeed).
#[track_caller]
pub fn expect_result<T, E, F>(f: F) -> SyncExpectation<T>
where
    T: Actual,
    E: std::error::Error + Send + Sync + 'static,
    F: Fn() -> std::result::Result<T, E> + Send + Sync + 'static,
{
    SyncExpectation::new(Expression::fallible(f, SourceLocation::caller()))
}

/// Expect something of the value a future resolves to.
#[track_caller]
pub fn expect_async<T, F, Fut>(f: F) -> AsyncExpectation<T>
where
    T: Actual,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    AsyncExpectation::new(AsyncExpression::new(f, SourceLocation::caller()))
}

/// Expect something of a future that may fail.
#[track_caller]
pub fn expect_async_result<T, E, F, Fut>(f: F) -> AsyncExpectation<T>
where
    T: Actual,
    E: std::error::Error + Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
{
    AsyncExpectation::new(AsyncExpression::fallible(f, SourceLocation::caller()))
}

/// Require something of the value `f` returns.
#[track_caller]
pub fn require<T, F>(f: F) -> SyncRequirement<T>
where
    T: Actual,
    F: Fn() -> T + Send + Sync + 'static,
{
    SyncRequirement::new(Expression::new(f, SourceLocation::caller()))
}

/// Require something of an already computed value.
#[track_caller]
pub fn require_value<T: Actual>(value: T) -> SyncRequirement<T> {
    SyncRequirement::new(Expression::from_value(value, SourceLocation::caller()))
}

/// Require something of a value that may be missing.
#[track_caller]
pub fn require_option<T, F>(f: F) -> SyncRequirement<T>
where
    T: Actual,
    F: Fn() -> Option<T> + Send + Sync + 'static,
{
    SyncRequirement::new(Expression::optional(f, SourceLocation::caller()))
}

/// Require something of a computation that may fail.
#[track_caller]
pub fn require_result<T, E, F>(f: F) -> SyncRequirement<T>
where
    T: Actual,
    E: std::error::Error + Send + Sync + 'static,
    F: Fn() -> std::result::Result<T, E> + Send + Sync + 'static,
{
    SyncRequirement::new(Expression::fallible(f, SourceLocation::caller()))
}

/// Require something of the value a future resolves to.
#[track_caller]
pub fn require_async<T, F, Fut>(f: F) -> AsyncRequirement<T>
where
    T: Actual,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    AsyncRequirement::new(AsyncExpression::new(f, SourceLocation::caller()))
}

/// Require `f` to return a value, and return it.
///
/// # Errors
///
/// Returns [`Error::RequireFailed`](crate::Error::RequireFailed) when `f`
/// returns `None`.
///
/// # Example
///
/// ```rust
/// use testkit_expect::prelude::*;
///
/// let first = unwrap(|| vec![3, 4].first().copied()).unwrap();
/// assert_eq!(first, 3);
/// ```
#[track_caller]
pub fn unwrap<T, F>(f: F) -> Result<T>
where
    T: Actual,
    F: Fn() -> Option<T> + Send + Sync + 'static,
{
    require_option(f).to(be_some())
}

/// Poll `f` until it returns a value, and return it.
///
/// # Errors
///
/// Returns an error when `f` keeps returning `None` until the timeout.
#[track_caller]
pub fn poll_unwrap<T, F>(f: F) -> Result<T>
where
    T: Actual,
    F: Fn() -> Option<T> + Send + Sync + 'static,
{
    require_option(f).to_eventually(be_some())
}

/// Report an unconditional failure.
#[track_caller]
pub fn fail(message: impl Into<String>) {
    report(
        false,
        &FailureMessage::with_string(message),
        &SourceLocation::caller(),
    );
}

fn waiting_poller(timeout: Duration) -> Poller {
    Poller::new(PollingDefaults::current().with_timeout(timeout))
}

/// Run `action` and block until it calls [`Done::call`], failing after
/// `timeout`.
///
/// ```rust
/// use std::time::Duration;
/// use testkit_expect::prelude::*;
///
/// wait_until(Duration::from_secs(1), |done| {
///     std::thread::spawn(move || done.call());
/// });
/// ```
#[track_caller]
pub fn wait_until<F>(timeout: Duration, action: F) -> bool
where
    F: FnOnce(Done),
{
    waiting_poller(timeout).wait_until(action)
}

/// [`wait_until`] with an action that may fail.
#[track_caller]
pub fn try_wait_until<F, E>(timeout: Duration, action: F) -> bool
where
    F: FnOnce(Done) -> std::result::Result<(), E>,
    E: std::error::Error + Send + Sync + 'static,
{
    waiting_poller(timeout).try_wait_until(action)
}

/// Run `action` and await until it calls [`Done::call`], failing after
/// `timeout`.
#[track_caller]
pub fn wait_until_async<F, Fut>(timeout: Duration, action: F) -> impl Future<Output = bool>
where
    F: FnOnce(Done) -> Fut,
    Fut: Future<Output = ()>,
{
    waiting_poller(timeout).wait_until_async(action)
}

/// Expect something of a value computed once, here.
///
/// ```rust
/// use testkit_expect::prelude::*;
///
/// let items = vec!["a", "b"];
/// expect!(items.len()).to(equal(2));
/// ```
#[macro_export]
macro_rules! expect {
    ($value:expr $(,)?) => {
        $crate::expect_value($value)
    };
}

/// Require something of a value computed once, here.
#[macro_export]
macro_rules! require {
    ($value:expr $(,)?) => {
        $crate::require_value($value)
    };
}
