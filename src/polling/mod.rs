//! Repeated evaluation of an expectation until it settles.
//!
//! A poll re-evaluates an expression on every tick, classifies the tick's
//! [`MatcherResult`] under a [`MatchStyle`], and stops when the style's
//! condition is decided or the timeout passes. The raw [`PollOutcome`] is
//! then mapped back to a single [`MatcherResult`] by
//! [`process_poll_result`].
//!
//! Two regimes share this logic:
//!
//! - blocking: [`Poller::poll_blocking`] parks the calling thread between
//!   ticks through a [`BlockingTimeSource`]
//! - cooperative: [`Poller::poll`] awaits a [`TimeSource`] sleep between
//!   ticks and abandons a tick still in flight at the deadline
//!
//! If control comes back later than `timeout + leeway`, the host could not
//! service the poll in time and the outcome is
//! [`PollOutcome::BlockedScheduler`] rather than a plain timeout.

mod blocking;
mod config;
mod cooperative;
mod wait;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Thrown;
use crate::expression::{Actual, AsyncExpression, Expression, Outcome};
use crate::location::SourceLocation;
use crate::matcher::{AsyncMatcher, Matcher, MatcherResult, MatcherStatus, Polarity};
use crate::message::{stringify, Message};
use crate::runtime::{default_blocking_time_source, default_time_source, BlockingTimeSource, TimeSource};

pub use config::{DefaultsGuard, PollingDefaults, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};
pub use wait::Done;

/// How a poll interprets its ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStyle {
    /// Succeed as soon as one tick satisfies the expectation.
    Eventually,
    /// Succeed only if no tick satisfies the matcher before the timeout.
    Never,
    /// Succeed only if every tick satisfies the matcher until the timeout.
    Always,
}

impl MatchStyle {
    /// Whether the style must hold on every tick rather than once.
    #[must_use]
    pub fn is_continuous(self) -> bool {
        matches!(self, Self::Never | Self::Always)
    }
}

impl fmt::Display for MatchStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eventually => "eventually",
            Self::Never => "never",
            Self::Always => "always",
        })
    }
}

/// The verdict of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// The poll is decided with the given verdict.
    Finished(bool),
    /// Keep polling.
    Incomplete,
}

impl PollStatus {
    /// Classify a tick's result for a poll of the given polarity and style.
    #[must_use]
    pub fn classify(result: &MatcherResult, polarity: Polarity, style: MatchStyle) -> Self {
        match (result.to_boolean(polarity), style.is_continuous()) {
            (true, true) | (false, false) => Self::Incomplete,
            (true, false) => Self::Finished(true),
            (false, true) => Self::Finished(false),
        }
    }
}

/// How a poll ended.
///
/// The last tick's [`MatcherResult`] is tracked by the caller and combined
/// with the outcome in [`process_poll_result`].
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// A tick decided the poll.
    Completed(bool),
    /// The timeout passed without a decision.
    TimedOut,
    /// Control came back later than `timeout + leeway`.
    BlockedScheduler,
    /// A tick returned an error.
    ErrorThrown(Thrown),
    /// A tick panicked.
    ExceptionRaised(String),
}

/// Map a poll outcome and the last tick's result to the final result.
#[must_use]
pub fn process_poll_result(
    outcome: PollOutcome,
    style: MatchStyle,
    last: Option<MatcherResult>,
    timeout: Duration,
) -> MatcherResult {
    let last_message = |fallback: &str| {
        last.as_ref()
            .map_or_else(|| Message::fail(fallback), |result| result.message.clone())
    };

    match outcome {
        PollOutcome::Completed(_) => match style {
            MatchStyle::Eventually => last.clone().unwrap_or_else(|| {
                MatcherResult::fail(Message::fail("completed without evaluating the matcher"))
            }),
            MatchStyle::Never => {
                MatcherResult::fail(last_message("matched the matcher when it shouldn't have"))
            }
            MatchStyle::Always => {
                MatcherResult::fail(last_message("didn't match the matcher when it should have"))
            }
        },
        PollOutcome::TimedOut => match style {
            MatchStyle::Eventually => MatcherResult::fail(match &last {
                Some(result) => result.message.appended(format!(" (timed out after {timeout:?})")),
                None => Message::fail("timed out before returning a value"),
            }),
            MatchStyle::Never => MatcherResult::new(
                MatcherStatus::DoesNotMatch,
                Message::expected_to("never match the matcher"),
            ),
            MatchStyle::Always => MatcherResult::new(
                MatcherStatus::Matches,
                Message::expected_to("always match the matcher"),
            ),
        },
        PollOutcome::ErrorThrown(error) => {
            MatcherResult::fail(Message::fail(format!("unexpected error thrown: <{error}>")))
        }
        PollOutcome::ExceptionRaised(panic) => {
            MatcherResult::fail(Message::fail(format!("unexpected exception raised: {panic}")))
        }
        PollOutcome::BlockedScheduler => MatcherResult::fail(match &last {
            Some(result) => result
                .message
                .appended(" (timed out, but the scheduler was unresponsive)."),
            None => Message::fail("the scheduler was unresponsive"),
        }),
    }
}

/// Panic unless the expression can be re-evaluated.
#[track_caller]
pub(crate) fn require_closure(is_closure: bool, fn_name: &str) {
    assert!(
        is_closure,
        "testkit-expect internal error: {fn_name} requires an explicit closure \
         (eg - expect(|| ...).to_eventually(...)); a value captured up front can never change"
    );
}

/// Runs polls with a given configuration and time source.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
/// use testkit_expect::clock::MockClock;
/// use testkit_expect::prelude::*;
///
/// let poller = Poller::new(PollingDefaults::new().with_timeout(Duration::from_secs(5)))
///     .with_clock(MockClock::auto_advancing());
///
/// let ticks = Arc::new(AtomicUsize::new(0));
/// let counter = ticks.clone();
/// expect(move || counter.fetch_add(1, Ordering::SeqCst))
///     .using(poller)
///     .to_eventually(equal(3));
/// ```
#[derive(Clone)]
pub struct Poller {
    defaults: PollingDefaults,
    blocking: Arc<dyn BlockingTimeSource>,
    cooperative: Option<Arc<dyn TimeSource>>,
}

impl fmt::Debug for Poller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::current()
    }
}

impl Poller {
    /// A poller using real time.
    #[must_use]
    pub fn new(defaults: PollingDefaults) -> Self {
        Self {
            defaults,
            blocking: default_blocking_time_source(),
            cooperative: None,
        }
    }

    /// A poller using the defaults current on this thread.
    #[must_use]
    pub fn current() -> Self {
        Self::new(PollingDefaults::current())
    }

    /// Use one clock for both regimes.
    #[must_use]
    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: TimeSource + BlockingTimeSource + 'static,
    {
        let clock = Arc::new(clock);
        self.blocking = clock.clone();
        self.cooperative = Some(clock);
        self
    }

    /// Use `time` for cooperative polls.
    #[must_use]
    pub fn with_time_source(mut self, time: Arc<dyn TimeSource>) -> Self {
        self.cooperative = Some(time);
        self
    }

    /// Use `time` for blocking polls.
    #[must_use]
    pub fn with_blocking_time_source(mut self, time: Arc<dyn BlockingTimeSource>) -> Self {
        self.blocking = time;
        self
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_defaults(mut self, defaults: PollingDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Override timeout and poll interval.
    #[must_use]
    pub fn within(self, timeout: Duration, poll_interval: Duration) -> Self {
        let defaults = self
            .defaults
            .with_timeout(timeout)
            .with_poll_interval(poll_interval);
        self.with_defaults(defaults)
    }

    /// The configuration.
    #[must_use]
    pub fn defaults(&self) -> PollingDefaults {
        self.defaults
    }

    fn time_source(&self) -> Arc<dyn TimeSource> {
        self.cooperative.clone().unwrap_or_else(default_time_source)
    }

    /// Poll a blocking expression with a matcher.
    pub(crate) fn poll_matcher_blocking<T, M>(
        &self,
        fn_name: &str,
        expression: &Expression<T>,
        matcher: &M,
        polarity: Polarity,
        style: MatchStyle,
    ) -> Polled<T>
    where
        T: Actual,
        M: Matcher<T> + ?Sized,
    {
        let uncached = expression.without_caching();
        let mut last = None;
        let mut last_value = None;
        let outcome = self.poll_blocking(fn_name, expression.location(), style, || {
            let fresh = uncached.with_caching();
            let result = matcher.satisfies(&fresh)?;
            let value = fresh.evaluate();
            let result = resolve_actual(result, &value);
            let status = PollStatus::classify(&result, polarity, style);
            tracing::trace!(status = ?result.status, ?status, "poll tick");
            last = Some(result);
            last_value = Some(value);
            Ok(status)
        });
        Polled {
            result: process_poll_result(outcome, style, last, self.defaults.timeout()),
            last_value,
        }
    }

    /// Poll a cooperative expression with a matcher.
    pub(crate) async fn poll_matcher<T, M>(
        &self,
        fn_name: &str,
        expression: &AsyncExpression<T>,
        matcher: &M,
        polarity: Polarity,
        style: MatchStyle,
    ) -> Polled<T>
    where
        T: Actual,
        M: AsyncMatcher<T> + ?Sized,
    {
        let uncached = expression.without_caching();
        let last = parking_lot::Mutex::new(None);
        let outcome = self
            .poll(fn_name, expression.location(), style, || {
                let fresh = uncached.with_caching();
                let last = &last;
                async move {
                    let result = matcher.satisfies(&fresh).await?;
                    let value = fresh.evaluate().await;
                    let result = resolve_actual(result, &value);
                    let status = PollStatus::classify(&result, polarity, style);
                    tracing::trace!(status = ?result.status, ?status, "poll tick");
                    *last.lock() = Some((result, value));
                    Ok(status)
                }
            })
            .await;
        let (last, last_value) = last.into_inner().unzip();
        Polled {
            result: process_poll_result(outcome, style, last, self.defaults.timeout()),
            last_value,
        }
    }

    fn expiry(&self, elapsed: Duration, location: SourceLocation, ticks: usize) -> PollOutcome {
        let timeout = self.defaults.timeout();
        if elapsed > timeout + self.defaults.leeway() {
            tracing::warn!(%location, ticks, ?elapsed, ?timeout, "poll blocked past its deadline");
            PollOutcome::BlockedScheduler
        } else {
            tracing::debug!(%location, ticks, ?elapsed, ?timeout, "poll timed out");
            PollOutcome::TimedOut
        }
    }
}

/// The final result of a poll and the value its last tick saw.
pub(crate) struct Polled<T> {
    pub(crate) result: MatcherResult,
    pub(crate) last_value: Option<Outcome<T>>,
}

fn resolve_actual<T: Actual>(result: MatcherResult, value: &Outcome<T>) -> MatcherResult {
    match value {
        Ok(value) => MatcherResult {
            message: result.message.resolving_actual(&stringify(value.as_ref())),
            status: result.status,
        },
        Err(_) => result,
    }
}
