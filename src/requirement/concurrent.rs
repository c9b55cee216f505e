//! The cooperative requirement front end.

use std::time::Duration;

use super::conclude;
use crate::error::{Error, Result};
use crate::expectation::execute_async;
use crate::expression::{Actual, AsyncExpression};
use crate::location::SourceLocation;
use crate::matcher::{AsyncMatcher, Blocking, Matcher, Polarity};
use crate::polling::{require_closure, MatchStyle, Poller};

/// A requirement on an [`AsyncExpression`].
///
/// ```rust
/// use testkit_expect::prelude::*;
///
/// # futures::executor::block_on(async {
/// let body = require_async(|| async { "pong".to_string() })
///     .to(contain_substring("on"))
///     .await
///     .unwrap();
/// assert_eq!(body, "pong");
/// # });
/// ```
#[derive(Debug)]
#[must_use = "requirements do nothing until a matcher is applied"]
pub struct AsyncRequirement<T> {
    expression: AsyncExpression<T>,
    poller: Option<Poller>,
    custom_error: Option<Error>,
}

impl<T: Actual> AsyncRequirement<T> {
    /// Wrap an expression.
    pub fn new(expression: AsyncExpression<T>) -> Self {
        Self {
            expression,
            poller: None,
            custom_error: None,
        }
    }

    /// Where the requirement was declared.
    pub fn location(&self) -> SourceLocation {
        self.expression.location()
    }

    /// Return `error` instead of [`Error::RequireFailed`] on failure.
    pub fn with_error<E>(self, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.with_custom_error(Error::custom(error))
    }

    pub(crate) fn with_custom_error(mut self, error: Error) -> Self {
        self.custom_error = Some(error);
        self
    }

    /// Poll with `poller` instead of one built from the current defaults.
    pub fn using(mut self, poller: Poller) -> Self {
        self.poller = Some(poller);
        self
    }

    /// Poll with the given timeout and interval.
    pub fn within(self, timeout: Duration, poll_interval: Duration) -> Self {
        let poller = self
            .poller
            .clone()
            .unwrap_or_else(Poller::current)
            .within(timeout, poll_interval);
        self.using(poller)
    }

    async fn judge<M: AsyncMatcher<T>>(self, matcher: M, polarity: Polarity, to: &str) -> Result<T> {
        let expression = &self.expression;
        let verdict = execute_async(
            expression,
            polarity,
            to,
            None,
            true,
            matcher.satisfies(expression),
        )
        .await;
        let value = if verdict.passed {
            Some(expression.evaluate().await)
        } else {
            None
        };
        conclude(verdict, expression.location(), self.custom_error, || value)
    }

    /// Require the matcher to match and return the value.
    ///
    /// # Errors
    ///
    /// Returns an error when the matcher does not match, the computation
    /// fails, or it produces no value.
    pub async fn to<M: Matcher<T>>(self, matcher: M) -> Result<T> {
        self.judge(Blocking(matcher), Polarity::ToMatch, "to").await
    }

    /// Require the matcher not to match and return the value.
    ///
    /// # Errors
    ///
    /// See [`to`](Self::to).
    pub async fn to_not<M: Matcher<T>>(self, matcher: M) -> Result<T> {
        self.judge(Blocking(matcher), Polarity::ToNotMatch, "to not").await
    }

    /// Alias for [`to_not`](Self::to_not).
    ///
    /// # Errors
    ///
    /// See [`to`](Self::to).
    pub async fn not_to<M: Matcher<T>>(self, matcher: M) -> Result<T> {
        self.to_not(matcher).await
    }

    /// Require the async matcher to match and return the value.
    ///
    /// # Errors
    ///
    /// See [`to`](Self::to).
    pub async fn to_async<M: AsyncMatcher<T>>(self, matcher: M) -> Result<T> {
        self.judge(matcher, Polarity::ToMatch, "to").await
    }

    async fn poll<M: AsyncMatcher<T>>(
        self,
        matcher: M,
        fn_name: &str,
        to: &str,
        polarity: Polarity,
        style: MatchStyle,
    ) -> Result<T> {
        require_closure(self.expression.is_closure(), fn_name);
        let poller = self.poller.clone().unwrap_or_else(Poller::current);
        let expression = &self.expression;
        let polled = poller
            .poll_matcher(fn_name, expression, &matcher, polarity, style)
            .await;
        let last_value = polled.last_value;
        let result = polled.result;
        let verdict = execute_async(expression, polarity, to, None, false, async { Ok(result) }).await;
        conclude(verdict, expression.location(), self.custom_error, || last_value)
    }

    /// Poll until the matcher matches and return the value that matched.
    ///
    /// # Errors
    ///
    /// Returns an error when the poll fails.
    ///
    /// # Panics
    ///
    /// Panics if the expression was not built from a closure.
    pub async fn to_eventually<M: Matcher<T>>(self, matcher: M) -> Result<T> {
        self.poll(
            Blocking(matcher),
            "require(...).to_eventually(...)",
            "to eventually",
            Polarity::ToMatch,
            MatchStyle::Eventually,
        )
        .await
    }

    /// Poll until the matcher stops matching.
    ///
    /// # Errors
    ///
    /// Returns an error when the poll fails.
    pub async fn to_eventually_not<M: Matcher<T>>(self, matcher: M) -> Result<T> {
        self.poll(
            Blocking(matcher),
            "require(...).to_eventually_not(...)",
            "to eventually not",
            Polarity::ToNotMatch,
            MatchStyle::Eventually,
        )
        .await
    }

    /// Poll until the timeout, failing if the matcher ever matches.
    ///
    /// # Errors
    ///
    /// Returns an error when the poll fails.
    pub async fn to_never<M: Matcher<T>>(self, matcher: M) -> Result<T> {
        self.poll(
            Blocking(matcher),
            "require(...).to_never(...)",
            "to never",
            Polarity::ToNotMatch,
            MatchStyle::Never,
        )
        .await
    }

    /// Poll until the timeout, failing if the matcher ever stops matching.
    ///
    /// # Errors
    ///
    /// Returns an error when the poll fails.
    pub async fn to_always<M: Matcher<T>>(self, matcher: M) -> Result<T> {
        self.poll(
            Blocking(matcher),
            "require(...).to_always(...)",
            "to always",
            Polarity::ToMatch,
            MatchStyle::Always,
        )
        .await
    }

    /// Poll until the async matcher matches and return the value.
    ///
    /// # Errors
    ///
    /// Returns an error when the poll fails.
    pub async fn to_eventually_async<M: AsyncMatcher<T>>(self, matcher: M) -> Result<T> {
        self.poll(
            matcher,
            "require(...).to_eventually(...)",
            "to eventually",
            Polarity::ToMatch,
            MatchStyle::Eventually,
        )
        .await
    }
}
