//! The blocking expectation front end.

use std::time::Duration;

use super::{execute, report, AsyncExpectation, ExpectationStatus, Verdict};
use crate::expression::{Actual, Expression};
use crate::location::SourceLocation;
use crate::matcher::{Blocking, Matcher, Polarity};
use crate::polling::{require_closure, MatchStyle, Poller};

/// An expectation on a blocking [`Expression`].
///
/// Every method consumes and returns the expectation, so verdicts chain:
///
/// ```rust
/// use testkit_expect::prelude::*;
///
/// let status = expect(|| vec![1, 2, 3])
///     .to(have_count(3))
///     .to_not(be_empty())
///     .status();
/// assert_eq!(status, ExpectationStatus::Passed);
/// ```
#[derive(Debug)]
#[must_use = "expectations do nothing until a matcher is applied"]
pub struct SyncExpectation<T> {
    expression: Expression<T>,
    status: ExpectationStatus,
    poller: Option<Poller>,
}

impl<T: Actual> SyncExpectation<T> {
    /// Wrap an expression.
    pub fn new(expression: Expression<T>) -> Self {
        Self {
            expression,
            status: ExpectationStatus::Pending,
            poller: None,
        }
    }

    /// The expression under test.
    pub fn expression(&self) -> &Expression<T> {
        &self.expression
    }

    /// The verdicts reached so far.
    pub fn status(&self) -> ExpectationStatus {
        self.status
    }

    /// Where the expectation was declared.
    pub fn location(&self) -> SourceLocation {
        self.expression.location()
    }

    /// Poll with `poller` instead of one built from the current defaults.
    pub fn using(mut self, poller: Poller) -> Self {
        self.poller = Some(poller);
        self
    }

    /// Poll with the given timeout and interval.
    pub fn within(self, timeout: Duration, poll_interval: Duration) -> Self {
        let poller = self.poller().within(timeout, poll_interval);
        self.using(poller)
    }

    /// Move the expectation into the cooperative regime.
    pub fn into_async(self) -> AsyncExpectation<T> {
        let mut expectation = AsyncExpectation::new(self.expression.to_async());
        if let Some(poller) = self.poller {
            expectation = expectation.using(poller);
        }
        expectation
    }

    fn poller(&self) -> Poller {
        self.poller.clone().unwrap_or_else(Poller::current)
    }

    fn verify(mut self, verdict: Verdict) -> Self {
        self.status = self.status.applying(verdict.passed);
        report(verdict.passed, &verdict.message, &self.expression.location());
        self
    }

    fn judge<M: Matcher<T>>(self, matcher: M, polarity: Polarity, to: &str, description: Option<&str>) -> Self {
        let expression = &self.expression;
        let verdict = execute(expression, polarity, to, description, true, || {
            matcher.satisfies(expression)
        });
        self.verify(verdict)
    }

    /// Expect the matcher to match.
    pub fn to<M: Matcher<T>>(self, matcher: M) -> Self {
        self.judge(matcher, Polarity::ToMatch, "to", None)
    }

    /// Expect the matcher to match, with a description shown on failure.
    pub fn to_with<M: Matcher<T>>(self, matcher: M, description: &str) -> Self {
        self.judge(matcher, Polarity::ToMatch, "to", Some(description))
    }

    /// Expect the matcher not to match.
    pub fn to_not<M: Matcher<T>>(self, matcher: M) -> Self {
        self.judge(matcher, Polarity::ToNotMatch, "to not", None)
    }

    /// Expect the matcher not to match, with a description shown on failure.
    pub fn to_not_with<M: Matcher<T>>(self, matcher: M, description: &str) -> Self {
        self.judge(matcher, Polarity::ToNotMatch, "to not", Some(description))
    }

    /// Alias for [`to_not`](Self::to_not).
    pub fn not_to<M: Matcher<T>>(self, matcher: M) -> Self {
        self.to_not(matcher)
    }

    fn poll<M: Matcher<T>>(self, matcher: M, fn_name: &str, to: &str, polarity: Polarity, style: MatchStyle) -> Self {
        require_closure(self.expression.is_closure(), fn_name);
        let poller = self.poller();
        let expression = &self.expression;
        let verdict = execute(expression, polarity, to, None, false, || {
            Ok(poller
                .poll_matcher_blocking(fn_name, expression, &matcher, polarity, style)
                .result)
        });
        self.verify(verdict)
    }

    /// Poll until the matcher matches, blocking the calling thread.
    ///
    /// # Panics
    ///
    /// Panics if the expression was not built from a closure, or if another
    /// poll is running on this thread.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    /// use testkit_expect::prelude::*;
    ///
    /// let reads = Arc::new(AtomicUsize::new(0));
    /// let counter = reads.clone();
    /// expect(move || counter.fetch_add(1, Ordering::SeqCst)).to_eventually(equal(3));
    /// ```
    pub fn to_eventually<M: Matcher<T>>(self, matcher: M) -> Self {
        self.poll(
            matcher,
            "expect(...).to_eventually(...)",
            "to eventually",
            Polarity::ToMatch,
            MatchStyle::Eventually,
        )
    }

    /// Poll until the matcher stops matching.
    pub fn to_eventually_not<M: Matcher<T>>(self, matcher: M) -> Self {
        self.poll(
            matcher,
            "expect(...).to_eventually_not(...)",
            "to eventually not",
            Polarity::ToNotMatch,
            MatchStyle::Eventually,
        )
    }

    /// Poll until the timeout, failing if the matcher ever matches.
    pub fn to_never<M: Matcher<T>>(self, matcher: M) -> Self {
        self.poll(
            matcher,
            "expect(...).to_never(...)",
            "to never",
            Polarity::ToNotMatch,
            MatchStyle::Never,
        )
    }

    /// Poll until the timeout, failing if the matcher ever stops matching.
    pub fn to_always<M: Matcher<T>>(self, matcher: M) -> Self {
        self.poll(
            matcher,
            "expect(...).to_always(...)",
            "to always",
            Polarity::ToMatch,
            MatchStyle::Always,
        )
    }

    /// [`to_eventually`](Self::to_eventually) with explicit timing.
    pub fn to_eventually_within<M: Matcher<T>>(self, matcher: M, timeout: Duration, poll_interval: Duration) -> Self {
        self.within(timeout, poll_interval).to_eventually(matcher)
    }

    /// [`to_eventually_not`](Self::to_eventually_not) with explicit timing.
    pub fn to_eventually_not_within<M: Matcher<T>>(
        self,
        matcher: M,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        self.within(timeout, poll_interval).to_eventually_not(matcher)
    }

    /// [`to_never`](Self::to_never) with explicit timing.
    pub fn to_never_within<M: Matcher<T>>(self, matcher: M, timeout: Duration, poll_interval: Duration) -> Self {
        self.within(timeout, poll_interval).to_never(matcher)
    }

    /// [`to_always`](Self::to_always) with explicit timing.
    pub fn to_always_within<M: Matcher<T>>(self, matcher: M, timeout: Duration, poll_interval: Duration) -> Self {
        self.within(timeout, poll_interval).to_always(matcher)
    }

    async fn poll_async<M: Matcher<T>>(
        self,
        matcher: M,
        fn_name: &str,
        to: &str,
        polarity: Polarity,
        style: MatchStyle,
    ) -> Self {
        require_closure(self.expression.is_closure(), fn_name);
        let status = self.status;
        let mut expectation = AsyncExpectation::new(self.expression.without_caching().to_async())
            .using(self.poller());
        expectation = expectation
            .poll(Blocking(matcher), fn_name, to, polarity, style)
            .await;
        Self {
            status: status.applying(expectation.status() == ExpectationStatus::Passed),
            ..self
        }
    }

    /// Cooperative [`to_eventually`](Self::to_eventually): awaits between
    /// ticks instead of blocking the thread.
    pub async fn to_eventually_async<M: Matcher<T>>(self, matcher: M) -> Self {
        self.poll_async(
            matcher,
            "expect(...).to_eventually_async(...)",
            "to eventually",
            Polarity::ToMatch,
            MatchStyle::Eventually,
        )
        .await
    }

    /// Cooperative [`to_eventually_not`](Self::to_eventually_not).
    pub async fn to_eventually_not_async<M: Matcher<T>>(self, matcher: M) -> Self {
        self.poll_async(
            matcher,
            "expect(...).to_eventually_not_async(...)",
            "to eventually not",
            Polarity::ToNotMatch,
            MatchStyle::Eventually,
        )
        .await
    }

    /// Cooperative [`to_never`](Self::to_never).
    pub async fn to_never_async<M: Matcher<T>>(self, matcher: M) -> Self {
        self.poll_async(
            matcher,
            "expect(...).to_never_async(...)",
            "to never",
            Polarity::ToNotMatch,
            MatchStyle::Never,
        )
        .await
    }

    /// Cooperative [`to_always`](Self::to_always).
    pub async fn to_always_async<M: Matcher<T>>(self, matcher: M) -> Self {
        self.poll_async(
            matcher,
            "expect(...).to_always_async(...)",
            "to always",
            Polarity::ToMatch,
            MatchStyle::Always,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::expectation::{with_assertion_handler, AssertionRecorder};
    use crate::matcher::{always_fail, be_greater_than, equal, not};
    use crate::polling::PollingDefaults;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn here() -> SourceLocation {
        SourceLocation::new(file!(), line!(), 1)
    }

    fn closure<T: Actual>(f: impl Fn() -> T + Send + Sync + 'static) -> SyncExpectation<T> {
        SyncExpectation::new(Expression::new(f, here()).with_closure_flag(true))
    }

    fn virtual_poller(timeout: Duration) -> Poller {
        Poller::new(PollingDefaults::new().with_timeout(timeout)).with_clock(MockClock::auto_advancing())
    }

    #[test]
    fn test_status_tracks_verdicts() {
        let recorder = AssertionRecorder::new();
        with_assertion_handler(recorder.clone(), || {
            let passed = closure(|| 3).to(equal(3)).to(be_greater_than(1));
            assert_eq!(passed.status(), ExpectationStatus::Passed);

            let mixed = closure(|| 3).to(equal(3)).to_not(equal(3));
            assert_eq!(mixed.status(), ExpectationStatus::Mixed);
        });
        assert_eq!(recorder.failures(), vec!["expected to not equal <3>, got <3>".to_string()]);
    }

    #[test]
    fn test_negated_fail_still_fails() {
        let recorder = AssertionRecorder::new();
        let status = with_assertion_handler(recorder.clone(), || {
            closure(|| 1).to(not(always_fail())).status()
        });
        assert_eq!(status, ExpectationStatus::Failed);
    }

    #[test]
    fn test_closure_is_evaluated_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        closure(move || counter.fetch_add(1, Ordering::SeqCst))
            .to(equal(0))
            .to(not(equal(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_to_eventually_counts_up() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let status = closure(move || counter.fetch_add(1, Ordering::SeqCst) + 1)
            .using(virtual_poller(Duration::from_secs(1)))
            .to_eventually(equal(3))
            .status();
        assert_eq!(status, ExpectationStatus::Passed);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_to_eventually_timeout_message() {
        let recorder = AssertionRecorder::new();
        with_assertion_handler(recorder.clone(), || {
            closure(|| 1)
                .using(virtual_poller(Duration::from_millis(100)))
                .to_eventually(equal(2));
        });
        let failures = recorder.failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].starts_with("expected to eventually equal <2>, got <1>"));
        assert!(failures[0].contains("timed out"));
    }

    #[test]
    fn test_to_never_and_to_always() {
        let recorder = AssertionRecorder::new();
        with_assertion_handler(recorder.clone(), || {
            closure(|| 1)
                .using(virtual_poller(Duration::from_millis(200)))
                .to_never(equal(0))
                .to_always(equal(1));
            closure(|| 1)
                .using(virtual_poller(Duration::from_millis(200)))
                .to_never(equal(1));
        });
        assert_eq!(recorder.failures(), vec!["expected to never equal <1>, got <1>".to_string()]);
    }

    #[test]
    #[should_panic(expected = "requires an explicit closure")]
    fn test_polling_a_value_panics() {
        SyncExpectation::new(Expression::from_value(1, here())).to_eventually(equal(1));
    }

    #[test]
    fn test_cooperative_polling_from_sync_expectation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let status = futures::executor::block_on(
            closure(move || counter.fetch_add(1, Ordering::SeqCst))
                .using(virtual_poller(Duration::from_secs(1)))
                .to_eventually_async(equal(4)),
        )
        .status();
        assert_eq!(status, ExpectationStatus::Passed);
    }
}
