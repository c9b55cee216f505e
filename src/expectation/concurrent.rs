//! The cooperative expectation front end.

use std::time::Duration;

use super::{execute_async, report, ExpectationStatus, Verdict};
use crate::expression::{Actual, AsyncExpression};
use crate::location::SourceLocation;
use crate::matcher::{AsyncMatcher, Blocking, Matcher, Polarity};
use crate::polling::{require_closure, MatchStyle, Poller};

/// An expectation on an [`AsyncExpression`].
///
/// Blocking matchers are accepted everywhere; methods ending in `_async`
/// take an [`AsyncMatcher`] instead.
///
/// ```rust
/// use testkit_expect::prelude::*;
///
/// # futures::executor::block_on(async {
/// expect_async(|| async { "ready".to_string() })
///     .to(contain_substring("ead"))
///     .await
///     .to_not(be_empty())
///     .await;
/// # });
/// ```
#[derive(Debug)]
#[must_use = "expectations do nothing until a matcher is applied"]
pub struct AsyncExpectation<T> {
    expression: AsyncExpression<T>,
    status: ExpectationStatus,
    poller: Option<Poller>,
}

impl<T: Actual> AsyncExpectation<T> {
    /// Wrap an expression.
    pub fn new(expression: AsyncExpression<T>) -> Self {
        Self {
            expression,
            status: ExpectationStatus::Pending,
            poller: None,
        }
    }

    /// The expression under test.
    pub fn expression(&self) -> &AsyncExpression<T> {
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

    fn poller(&self) -> Poller {
        self.poller.clone().unwrap_or_else(Poller::current)
    }

    fn verify(mut self, verdict: Verdict) -> Self {
        self.status = self.status.applying(verdict.passed);
        report(verdict.passed, &verdict.message, &self.expression.location());
        self
    }

    async fn judge<M: AsyncMatcher<T>>(
        self,
        matcher: M,
        polarity: Polarity,
        to: &str,
        description: Option<&str>,
    ) -> Self {
        let expression = &self.expression;
        let verdict = execute_async(
            expression,
            polarity,
            to,
            description,
            true,
            matcher.satisfies(expression),
        )
        .await;
        self.verify(verdict)
    }

    /// Expect the matcher to match.
    pub async fn to<M: Matcher<T>>(self, matcher: M) -> Self {
        self.judge(Blocking(matcher), Polarity::ToMatch, "to", None).await
    }

    /// Expect the matcher to match, with a description shown on failure.
    pub async fn to_with<M: Matcher<T>>(self, matcher: M, description: &str) -> Self {
        self.judge(Blocking(matcher), Polarity::ToMatch, "to", Some(description))
            .await
    }

    /// Expect the matcher not to match.
    pub async fn to_not<M: Matcher<T>>(self, matcher: M) -> Self {
        self.judge(Blocking(matcher), Polarity::ToNotMatch, "to not", None)
            .await
    }

    /// Expect the matcher not to match, with a description shown on failure.
    pub async fn to_not_with<M: Matcher<T>>(self, matcher: M, description: &str) -> Self {
        self.judge(Blocking(matcher), Polarity::ToNotMatch, "to not", Some(description))
            .await
    }

    /// Alias for [`to_not`](Self::to_not).
    pub async fn not_to<M: Matcher<T>>(self, matcher: M) -> Self {
        self.to_not(matcher).await
    }

    /// Expect the async matcher to match.
    pub async fn to_async<M: AsyncMatcher<T>>(self, matcher: M) -> Self {
        self.judge(matcher, Polarity::ToMatch, "to", None).await
    }

    /// Expect the async matcher not to match.
    pub async fn to_not_async<M: AsyncMatcher<T>>(self, matcher: M) -> Self {
        self.judge(matcher, Polarity::ToNotMatch, "to not", None).await
    }

    pub(crate) async fn poll<M: AsyncMatcher<T>>(
        self,
        matcher: M,
        fn_name: &str,
        to: &str,
        polarity: Polarity,
        style: MatchStyle,
    ) -> Self {
        require_closure(self.expression.is_closure(), fn_name);
        let poller = self.poller();
        let expression = &self.expression;
        let polled = async {
            Ok(poller
                .poll_matcher(fn_name, expression, &matcher, polarity, style)
                .await
                .result)
        };
        let verdict = execute_async(expression, polarity, to, None, false, polled).await;
        self.verify(verdict)
    }

    /// Poll until the matcher matches.
    ///
    /// # Panics
    ///
    /// Panics if the expression was not built from a closure.
    pub async fn to_eventually<M: Matcher<T>>(self, matcher: M) -> Self {
        self.to_eventually_async(Blocking(matcher)).await
    }

    /// Poll until the matcher stops matching.
    pub async fn to_eventually_not<M: Matcher<T>>(self, matcher: M) -> Self {
        self.to_eventually_not_async(Blocking(matcher)).await
    }

    /// Poll until the timeout, failing if the matcher ever matches.
    pub async fn to_never<M: Matcher<T>>(self, matcher: M) -> Self {
        self.to_never_async(Blocking(matcher)).await
    }

    /// Poll until the timeout, failing if the matcher ever stops matching.
    pub async fn to_always<M: Matcher<T>>(self, matcher: M) -> Self {
        self.to_always_async(Blocking(matcher)).await
    }

    /// [`to_eventually`](Self::to_eventually) with explicit timing.
    pub async fn to_eventually_within<M: Matcher<T>>(
        self,
        matcher: M,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        self.within(timeout, poll_interval).to_eventually(matcher).await
    }

    /// [`to_eventually_not`](Self::to_eventually_not) with explicit timing.
    pub async fn to_eventually_not_within<M: Matcher<T>>(
        self,
        matcher: M,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        self.within(timeout, poll_interval)
            .to_eventually_not(matcher)
            .await
    }

    /// [`to_never`](Self::to_never) with explicit timing.
    pub async fn to_never_within<M: Matcher<T>>(
        self,
        matcher: M,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        self.within(timeout, poll_interval).to_never(matcher).await
    }

    /// [`to_always`](Self::to_always) with explicit timing.
    pub async fn to_always_within<M: Matcher<T>>(
        self,
        matcher: M,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        self.within(timeout, poll_interval).to_always(matcher).await
    }

    /// Poll until the async matcher matches.
    pub async fn to_eventually_async<M: AsyncMatcher<T>>(self, matcher: M) -> Self {
        self.poll(
            matcher,
            "expect(...).to_eventually(...)",
            "to eventually",
            Polarity::ToMatch,
            MatchStyle::Eventually,
        )
        .await
    }

    /// Poll until the async matcher stops matching.
    pub async fn to_eventually_not_async<M: AsyncMatcher<T>>(self, matcher: M) -> Self {
        self.poll(
            matcher,
            "expect(...).to_eventually_not(...)",
            "to eventually not",
            Polarity::ToNotMatch,
            MatchStyle::Eventually,
        )
        .await
    }

    /// Poll until the timeout, failing if the async matcher ever matches.
    pub async fn to_never_async<M: AsyncMatcher<T>>(self, matcher: M) -> Self {
        self.poll(
            matcher,
            "expect(...).to_never(...)",
            "to never",
            Polarity::ToNotMatch,
            MatchStyle::Never,
        )
        .await
    }

    /// Poll until the timeout, failing if the async matcher ever stops
    /// matching.
    pub async fn to_always_async<M: AsyncMatcher<T>>(self, matcher: M) -> Self {
        self.poll(
            matcher,
            "expect(...).to_always(...)",
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
    use crate::matcher::{async_matcher, equal, MatcherResult};
    use crate::message::Message;
    use crate::polling::PollingDefaults;
    use futures::executor::block_on;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn here() -> SourceLocation {
        SourceLocation::new(file!(), line!(), 1)
    }

    fn virtual_poller() -> Poller {
        Poller::new(PollingDefaults::new().with_timeout(Duration::from_millis(100)))
            .with_clock(MockClock::auto_advancing())
    }

    fn counter_expectation(calls: &Arc<AtomicUsize>) -> AsyncExpectation<usize> {
        let calls = calls.clone();
        AsyncExpectation::new(
            AsyncExpression::new(
                move || {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { n }
                },
                here(),
            )
            .with_closure_flag(true),
        )
        .using(virtual_poller())
    }

    #[test]
    fn test_to_and_to_not() {
        let recorder = AssertionRecorder::new();
        let status = with_assertion_handler(recorder.clone(), || {
            block_on(async {
                AsyncExpectation::new(AsyncExpression::new(|| async { 7 }, here()))
                    .to(equal(7))
                    .await
                    .to_not(equal(7))
                    .await
                    .status()
            })
        });
        assert_eq!(status, ExpectationStatus::Mixed);
        assert_eq!(recorder.failures(), vec!["expected to not equal <7>, got <7>".to_string()]);
    }

    #[test]
    fn test_to_eventually() {
        let calls = Arc::new(AtomicUsize::new(0));
        let status = block_on(counter_expectation(&calls).to_eventually(equal(3))).status();
        assert_eq!(status, ExpectationStatus::Passed);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_to_eventually_with_async_matcher() {
        let calls = Arc::new(AtomicUsize::new(0));
        let at_least_two = async_matcher(|actual: AsyncExpression<usize>| async move {
            let value = actual.evaluate().await?.unwrap_or(0);
            Ok(MatcherResult::from_bool(
                value >= 2,
                Message::expected_actual_value_to("be at least 2"),
            ))
        });
        let status = block_on(counter_expectation(&calls).to_eventually_async(at_least_two)).status();
        assert_eq!(status, ExpectationStatus::Passed);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_to_never_times_out_and_passes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let status = block_on(counter_expectation(&calls).to_never(equal(0))).status();
        assert_eq!(status, ExpectationStatus::Passed);
        assert!(calls.load(Ordering::SeqCst) >= 10);
    }

    #[test]
    fn test_to_always_fails_on_first_violation() {
        let recorder = AssertionRecorder::new();
        let calls = Arc::new(AtomicUsize::new(0));
        with_assertion_handler(recorder.clone(), || {
            block_on(counter_expectation(&calls).to_always(equal(1)));
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(recorder.failures(), vec!["expected to always equal <1>, got <2>".to_string()]);
    }
}
