//! The blocking requirement front end.

use std::time::Duration;

use super::conclude;
use crate::error::{Error, Result};
use crate::expectation::execute;
use crate::expression::{Actual, Expression};
use crate::location::SourceLocation;
use crate::matcher::{Matcher, Polarity};
use crate::polling::{require_closure, MatchStyle, Poller};

use super::AsyncRequirement;

/// A requirement on a blocking [`Expression`].
#[derive(Debug)]
#[must_use = "requirements do nothing until a matcher is applied"]
pub struct SyncRequirement<T> {
    expression: Expression<T>,
    poller: Option<Poller>,
    custom_error: Option<Error>,
}

impl<T: Actual> SyncRequirement<T> {
    /// Wrap an expression.
    pub fn new(expression: Expression<T>) -> Self {
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
    pub fn with_error<E>(mut self, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.custom_error = Some(Error::custom(error));
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

    /// Move the requirement into the cooperative regime.
    pub fn into_async(self) -> AsyncRequirement<T> {
        let mut requirement = AsyncRequirement::new(self.expression.to_async());
        if let Some(poller) = self.poller {
            requirement = requirement.using(poller);
        }
        if let Some(error) = self.custom_error {
            requirement = requirement.with_custom_error(error);
        }
        requirement
    }

    fn judge<M: Matcher<T>>(
        self,
        matcher: M,
        polarity: Polarity,
        to: &str,
        description: Option<&str>,
    ) -> Result<T> {
        let expression = &self.expression;
        let verdict = execute(expression, polarity, to, description, true, || {
            matcher.satisfies(expression)
        });
        conclude(verdict, expression.location(), self.custom_error, || {
            Some(expression.evaluate())
        })
    }

    /// Require the matcher to match and return the value.
    ///
    /// # Errors
    ///
    /// Returns an error when the matcher does not match, the computation
    /// fails, or it produces no value.
    pub fn to<M: Matcher<T>>(self, matcher: M) -> Result<T> {
        self.judge(matcher, Polarity::ToMatch, "to", None)
    }

    /// [`to`](Self::to) with a description shown on failure.
    ///
    /// # Errors
    ///
    /// See [`to`](Self::to).
    pub fn to_with<M: Matcher<T>>(self, matcher: M, description: &str) -> Result<T> {
        self.judge(matcher, Polarity::ToMatch, "to", Some(description))
    }

    /// Require the matcher not to match and return the value.
    ///
    /// # Errors
    ///
    /// Returns an error when the matcher matches, the computation fails, or
    /// it produces no value.
    pub fn to_not<M: Matcher<T>>(self, matcher: M) -> Result<T> {
        self.judge(matcher, Polarity::ToNotMatch, "to not", None)
    }

    /// [`to_not`](Self::to_not) with a description shown on failure.
    ///
    /// # Errors
    ///
    /// See [`to_not`](Self::to_not).
    pub fn to_not_with<M: Matcher<T>>(self, matcher: M, description: &str) -> Result<T> {
        self.judge(matcher, Polarity::ToNotMatch, "to not", Some(description))
    }

    /// Alias for [`to_not`](Self::to_not).
    ///
    /// # Errors
    ///
    /// See [`to_not`](Self::to_not).
    pub fn not_to<M: Matcher<T>>(self, matcher: M) -> Result<T> {
        self.to_not(matcher)
    }

    fn poll<M: Matcher<T>>(
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
        let mut last_value = None;
        let verdict = execute(expression, polarity, to, None, false, || {
            let polled = poller.poll_matcher_blocking(fn_name, expression, &matcher, polarity, style);
            last_value = polled.last_value;
            Ok(polled.result)
        });
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
    pub fn to_eventually<M: Matcher<T>>(self, matcher: M) -> Result<T> {
        self.poll(
            matcher,
            "require(...).to_eventually(...)",
            "to eventually",
            Polarity::ToMatch,
            MatchStyle::Eventually,
        )
    }

    /// Poll until the matcher stops matching.
    ///
    /// # Errors
    ///
    /// Returns an error when the poll fails.
    pub fn to_eventually_not<M: Matcher<T>>(self, matcher: M) -> Result<T> {
        self.poll(
            matcher,
            "require(...).to_eventually_not(...)",
            "to eventually not",
            Polarity::ToNotMatch,
            MatchStyle::Eventually,
        )
    }

    /// Poll until the timeout, failing if the matcher ever matches.
    ///
    /// # Errors
    ///
    /// Returns an error when the poll fails.
    pub fn to_never<M: Matcher<T>>(self, matcher: M) -> Result<T> {
        self.poll(
            matcher,
            "require(...).to_never(...)",
            "to never",
            Polarity::ToNotMatch,
            MatchStyle::Never,
        )
    }

    /// Poll until the timeout, failing if the matcher ever stops matching.
    ///
    /// # Errors
    ///
    /// Returns an error when the poll fails.
    pub fn to_always<M: Matcher<T>>(self, matcher: M) -> Result<T> {
        self.poll(
            matcher,
            "require(...).to_always(...)",
            "to always",
            Polarity::ToMatch,
            MatchStyle::Always,
        )
    }
}
