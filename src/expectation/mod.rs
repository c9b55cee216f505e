//! Expectations: applying matchers to expressions and reporting verdicts.
//!
//! An expectation pairs an [`Expression`] with one or more matchers. Each
//! `to…` call judges the expression, folds the verdict into the
//! expectation's [`ExpectationStatus`], and hands the rendered message to
//! the current [`AssertionHandler`].
//!
//! - [`SyncExpectation`] - blocking front end, built by [`expect`](crate::expect)
//! - [`AsyncExpectation`] - cooperative front end, built by
//!   [`expect_async`](crate::expect_async)
//! - [`AssertionHandler`] - receives verdicts; [`PanicHandler`] by default
//!
//! Errors returned by the expression become `unexpected error thrown: …`
//! failures, and a panic inside the expression or matcher becomes an
//! `unexpected exception raised: …` failure, so one bad expectation does not
//! abort the rest of the test.

mod concurrent;
mod handler;
mod sync;

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};

use futures::FutureExt;

use crate::error::Thrown;
use crate::expression::{Actual, AsyncExpression, Expression, Outcome};
use crate::matcher::{MatcherResult, Polarity};
use crate::message::{stringify, FailureMessage};
use crate::trap::panic_message;

pub use concurrent::AsyncExpectation;
pub use handler::{
    install_assertion_handler, set_default_assertion_handler, with_assertion_handler, AssertionHandler,
    AssertionRecord, AssertionRecorder, HandlerGuard, PanicHandler,
};
pub use sync::SyncExpectation;

pub(crate) use handler::report;

/// The verdicts an expectation has reached so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExpectationStatus {
    /// No verdict yet.
    #[default]
    Pending,
    /// Every verdict passed.
    Passed,
    /// Every verdict failed.
    Failed,
    /// Both passing and failing verdicts were reached.
    Mixed,
}

impl ExpectationStatus {
    /// Fold one more verdict in.
    #[must_use]
    pub fn applying(self, passed: bool) -> Self {
        match (self, passed) {
            (Self::Pending | Self::Passed, true) => Self::Passed,
            (Self::Pending | Self::Failed, false) => Self::Failed,
            _ => Self::Mixed,
        }
    }
}

/// The outcome of judging an expression once.
#[derive(Debug, Clone)]
pub(crate) struct Verdict {
    pub(crate) passed: bool,
    pub(crate) message: FailureMessage,
    pub(crate) thrown: Option<Thrown>,
}

fn failure_message(to: &str, description: Option<&str>) -> FailureMessage {
    let mut message = FailureMessage::new();
    message.to = to.to_string();
    message.user_description = description.map(str::to_string);
    message
}

fn needs_actual(message: &FailureMessage) -> bool {
    !message.has_overridden_string_value() && message.actual_value.as_deref() == Some("")
}

fn conclude<T: Actual>(
    mut message: FailureMessage,
    polarity: Polarity,
    judged: Result<MatcherResult, Thrown>,
    actual: impl FnOnce() -> Outcome<T>,
) -> Verdict {
    let result = match judged {
        Ok(result) => result,
        Err(error) => return thrown(message, error),
    };
    result.message.update(&mut message);
    if needs_actual(&message) {
        match actual() {
            Ok(value) => message.actual_value = Some(stringify(value.as_ref())),
            Err(error) => return thrown(message, error),
        }
    }
    Verdict {
        passed: result.to_boolean(polarity),
        message,
        thrown: None,
    }
}

fn thrown(mut message: FailureMessage, error: Thrown) -> Verdict {
    message.set_string_value(format!("unexpected error thrown: <{error}>"));
    Verdict {
        passed: false,
        message,
        thrown: Some(error),
    }
}

fn raised(mut message: FailureMessage, payload: &(dyn std::any::Any + Send)) -> Verdict {
    message.set_string_value(format!("unexpected exception raised: {}", panic_message(payload)));
    Verdict {
        passed: false,
        message,
        thrown: None,
    }
}

/// Judge a blocking expression.
///
/// `judge` runs the matcher; the expression is evaluated again (from its
/// cache) only when the matcher left the actual value for the caller to
/// fill in. With `capture_panics` a panic becomes a failed verdict.
pub(crate) fn execute<T, F>(
    expression: &Expression<T>,
    polarity: Polarity,
    to: &str,
    description: Option<&str>,
    capture_panics: bool,
    judge: F,
) -> Verdict
where
    T: Actual,
    F: FnOnce() -> Result<MatcherResult, Thrown>,
{
    let message = failure_message(to, description);
    if !capture_panics {
        return conclude(message, polarity, judge(), || expression.evaluate());
    }
    let attempt = catch_unwind(AssertUnwindSafe(|| {
        conclude(message.clone(), polarity, judge(), || expression.evaluate())
    }));
    attempt.unwrap_or_else(|payload| raised(message, &*payload))
}

/// Judge a cooperative expression.
pub(crate) async fn execute_async<T, Fut>(
    expression: &AsyncExpression<T>,
    polarity: Polarity,
    to: &str,
    description: Option<&str>,
    capture_panics: bool,
    judged: Fut,
) -> Verdict
where
    T: Actual,
    Fut: Future<Output = Result<MatcherResult, Thrown>>,
{
    let message = failure_message(to, description);
    let base = message.clone();
    let attempt = async move {
        let judged = judged.await;
        let needs = judged.as_ref().is_ok_and(|result| {
            let mut probe = base.clone();
            result.message.update(&mut probe);
            needs_actual(&probe)
        });
        let actual = if needs {
            Some(expression.evaluate().await)
        } else {
            None
        };
        conclude(base, polarity, judged, move || actual.unwrap_or(Ok(None)))
    };
    if !capture_panics {
        return attempt.await;
    }
    match AssertUnwindSafe(attempt).catch_unwind().await {
        Ok(verdict) => verdict,
        Err(payload) => raised(message, &*payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::SourceLocation;
    use crate::matcher::{equal, Matcher};
    use futures::executor::block_on;

    fn here() -> SourceLocation {
        SourceLocation::new(file!(), line!(), 1)
    }

    #[test]
    fn test_status_fold() {
        use ExpectationStatus::*;
        assert_eq!(Pending.applying(true), Passed);
        assert_eq!(Passed.applying(true), Passed);
        assert_eq!(Pending.applying(false), Failed);
        assert_eq!(Failed.applying(false), Failed);
        assert_eq!(Passed.applying(false), Mixed);
        assert_eq!(Failed.applying(true), Mixed);
        assert_eq!(Mixed.applying(true), Mixed);
    }

    #[test]
    fn test_execute_renders_actual() {
        let expression = Expression::new(|| 1, here());
        let verdict = execute(&expression, Polarity::ToMatch, "to", None, true, || {
            equal(2).satisfies(&expression)
        });
        assert!(!verdict.passed);
        assert_eq!(verdict.message.string_value(), "expected to equal <2>, got <1>");
    }

    #[test]
    fn test_execute_error_and_panic() {
        let failing = Expression::<i32>::from_fn(|| Err(Thrown::msg("disk full")), here());
        let verdict = execute(&failing, Polarity::ToMatch, "to", None, true, || {
            equal(2).satisfies(&failing)
        });
        assert!(!verdict.passed);
        assert!(verdict.thrown.is_some());
        assert_eq!(verdict.message.string_value(), "unexpected error thrown: <disk full>");

        let panicking = Expression::new(|| -> i32 { panic!("poisoned") }, here());
        let verdict = execute(&panicking, Polarity::ToNotMatch, "to not", None, true, || {
            equal(2).satisfies(&panicking)
        });
        assert!(!verdict.passed);
        assert_eq!(verdict.message.string_value(), "unexpected exception raised: poisoned");
    }

    #[test]
    fn test_execute_async_with_description() {
        let expression = AsyncExpression::new(|| async { 5 }, here());
        let verdict = block_on(execute_async(
            &expression,
            Polarity::ToMatch,
            "to",
            Some("the answer"),
            true,
            async {
                let frozen = expression.to_synchronous().await;
                equal(6).satisfies(&frozen)
            },
        ));
        assert!(!verdict.passed);
        assert_eq!(
            verdict.message.string_value(),
            "the answer\nexpected to equal <6>, got <5>"
        );
    }
}
