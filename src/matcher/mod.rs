// Matcher constructors are usually handed straight to an expectation
#![allow(clippy::must_use_candidate)]

//! Matchers and their results.
//!
//! A [`Matcher`] looks at an [`Expression`] and reports a [`MatcherResult`]:
//! a three-valued [`MatcherStatus`] plus a [`Message`] describing what was
//! expected. `Fail` is distinct from `DoesNotMatch`: it means the check could
//! not be performed at all (for example the value was missing) and it fails
//! the expectation regardless of polarity.
//!
//! - Custom matchers: implement [`Matcher`], or build one from a closure with
//!   [`define`], [`define_nilable`], [`simple`] or [`simple_nilable`]
//! - Built-in matchers: [`equal`], [`be_greater_than`], [`contain`], ...
//! - Combinators: [`not`], [`all_of`], [`any_of`], [`all_pass`], [`map`]
//!
//! # Example
//!
//! ```rust
//! use testkit_expect::prelude::*;
//!
//! let is_even = simple("be even", |actual: &Expression<i32>| {
//!     Ok(MatcherStatus::from(actual.evaluate()?.map_or(false, |n| n % 2 == 0)))
//! });
//!
//! let result = is_even
//!     .satisfies(&Expression::from_value(4, SourceLocation::caller()))
//!     .unwrap();
//! assert_eq!(result.status, MatcherStatus::Matches);
//! ```

mod async_matcher;
mod builtin;
mod combinators;

use std::sync::Arc;

use crate::error::Thrown;
use crate::expression::{Actual, Expression};
use crate::message::Message;

pub use async_matcher::{async_matcher, not_async, AsyncFnMatcher, AsyncMatcher, Blocking, NotAsync};
pub use builtin::{
    always_fail, be_empty, be_greater_than, be_greater_than_or_equal_to, be_less_than,
    be_less_than_or_equal_to, be_none, be_some, be_within, contain, contain_substring, equal,
    have_count, satisfy, succeed, Collection,
};
pub use combinators::{all_of, all_pass, any_of, filter_map, map, not, AllOf, AllPass, AnyOf, Map, Not};

/// The three-valued outcome of a matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatcherStatus {
    /// The value satisfied the matcher.
    Matches,
    /// The value did not satisfy the matcher.
    DoesNotMatch,
    /// The matcher could not be evaluated. Fails under either polarity.
    Fail,
}

impl From<bool> for MatcherStatus {
    fn from(matches: bool) -> Self {
        if matches {
            Self::Matches
        } else {
            Self::DoesNotMatch
        }
    }
}

impl MatcherStatus {
    /// Whether this status satisfies an expectation of the given polarity.
    #[must_use]
    pub fn to_boolean(self, polarity: Polarity) -> bool {
        match self {
            Self::Matches => polarity == Polarity::ToMatch,
            Self::DoesNotMatch => polarity == Polarity::ToNotMatch,
            Self::Fail => false,
        }
    }

    /// Swap `Matches` and `DoesNotMatch`; `Fail` stays `Fail`.
    #[must_use]
    pub fn negated(self) -> Self {
        match self {
            Self::Matches => Self::DoesNotMatch,
            Self::DoesNotMatch => Self::Matches,
            Self::Fail => Self::Fail,
        }
    }
}

/// Whether an expectation asserts a match or its absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    /// `to(...)`
    ToMatch,
    /// `to_not(...)`
    ToNotMatch,
}

/// A matcher's verdict and description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherResult {
    /// Verdict.
    pub status: MatcherStatus,
    /// What the matcher expected.
    pub message: Message,
}

impl MatcherResult {
    /// Create a result.
    pub fn new(status: MatcherStatus, message: Message) -> Self {
        Self { status, message }
    }

    /// A result from a boolean verdict.
    pub fn from_bool(matches: bool, message: Message) -> Self {
        Self::new(MatcherStatus::from(matches), message)
    }

    /// A `Fail` result.
    pub fn fail(message: Message) -> Self {
        Self::new(MatcherStatus::Fail, message)
    }

    /// Whether the result satisfies an expectation of the given polarity.
    #[must_use]
    pub fn to_boolean(&self, polarity: Polarity) -> bool {
        self.status.to_boolean(polarity)
    }

    /// The logical negation, with the message prefixed by `"not "`.
    #[must_use]
    pub fn negated(self) -> Self {
        Self {
            status: self.status.negated(),
            message: self.message.prepended("not "),
        }
    }
}

/// Something that can judge an expression.
///
/// Matchers must be shareable across threads because polling expectations
/// may evaluate them away from the declaring thread.
///
/// # Implementing Custom Matchers
///
/// ```rust
/// use testkit_expect::prelude::*;
/// use testkit_expect::error::Thrown;
///
/// struct IsEven;
///
/// impl Matcher<i32> for IsEven {
///     fn satisfies(&self, actual: &Expression<i32>) -> std::result::Result<MatcherResult, Thrown> {
///         let message = Message::expected_actual_value_to("be even");
///         Ok(match actual.evaluate()? {
///             Some(n) => MatcherResult::from_bool(n % 2 == 0, message),
///             None => MatcherResult::fail(message.appended_be_none_hint()),
///         })
///     }
/// }
///
/// expect(|| 4).to(IsEven);
/// ```
pub trait Matcher<T>: Send + Sync {
    /// Judge the expression.
    ///
    /// # Errors
    ///
    /// Returns the error raised while evaluating the expression or running
    /// the check.
    fn satisfies(&self, actual: &Expression<T>) -> Result<MatcherResult, Thrown>;
}

impl<T, M: Matcher<T> + ?Sized> Matcher<T> for Box<M> {
    fn satisfies(&self, actual: &Expression<T>) -> Result<MatcherResult, Thrown> {
        (**self).satisfies(actual)
    }
}

impl<T, M: Matcher<T> + ?Sized> Matcher<T> for Arc<M> {
    fn satisfies(&self, actual: &Expression<T>) -> Result<MatcherResult, Thrown> {
        (**self).satisfies(actual)
    }
}

impl<T, M: Matcher<T> + ?Sized> Matcher<T> for &M {
    fn satisfies(&self, actual: &Expression<T>) -> Result<MatcherResult, Thrown> {
        (**self).satisfies(actual)
    }
}

/// Convenience methods available on every matcher.
pub trait MatcherExt<T: Actual>: Matcher<T> + Sized + 'static {
    /// Erase the matcher's type.
    fn boxed(self) -> Box<dyn Matcher<T>> {
        Box::new(self)
    }

    /// Matches when both matchers match.
    fn and<M: Matcher<T> + 'static>(self, other: M) -> AllOf<T> {
        all_of(vec![self.boxed(), Box::new(other)])
    }

    /// Matches when either matcher matches.
    fn or<M: Matcher<T> + 'static>(self, other: M) -> AnyOf<T> {
        any_of(vec![self.boxed(), Box::new(other)])
    }
}

impl<T: Actual, M: Matcher<T> + Sized + 'static> MatcherExt<T> for M {}

/// A matcher built from a closure.
pub struct FnMatcher<F> {
    f: F,
}

impl<T, F> Matcher<T> for FnMatcher<F>
where
    F: Fn(&Expression<T>) -> Result<MatcherResult, Thrown> + Send + Sync,
{
    fn satisfies(&self, actual: &Expression<T>) -> Result<MatcherResult, Thrown> {
        (self.f)(actual)
    }
}

/// Wraps a matcher so a missing value is a `Fail` with the `be_none()` hint.
pub struct RequireNonNil<M> {
    inner: M,
}

impl<T: Actual, M: Matcher<T>> Matcher<T> for RequireNonNil<M> {
    fn satisfies(&self, actual: &Expression<T>) -> Result<MatcherResult, Thrown> {
        let result = self.inner.satisfies(actual)?;
        if actual.evaluate()?.is_none() {
            return Ok(MatcherResult::fail(result.message.appended_be_none_hint()));
        }
        Ok(result)
    }
}

/// Make `inner` fail when the value is missing.
pub fn require_non_nil<M>(inner: M) -> RequireNonNil<M> {
    RequireNonNil { inner }
}

/// Build a matcher from a closure that never sees a missing value.
///
/// The closure still receives the expression; if the expression evaluates to
/// no value the closure's verdict is replaced by `Fail`.
pub fn define<T, F>(f: F) -> RequireNonNil<FnMatcher<F>>
where
    T: Actual,
    F: Fn(&Expression<T>) -> Result<MatcherResult, Thrown> + Send + Sync,
{
    require_non_nil(FnMatcher { f })
}

/// Like [`define`], with the expectation text passed to the closure.
pub fn define_with_message<T, F>(
    message: impl Into<String>,
    f: F,
) -> RequireNonNil<FnMatcher<impl Fn(&Expression<T>) -> Result<MatcherResult, Thrown> + Send + Sync>>
where
    T: Actual,
    F: Fn(&Expression<T>, Message) -> Result<MatcherResult, Thrown> + Send + Sync,
{
    let message = Message::expected_actual_value_to(message);
    define(move |actual: &Expression<T>| f(actual, message.clone()))
}

/// Build a matcher from a closure that handles missing values itself.
pub fn define_nilable<T, F>(f: F) -> FnMatcher<F>
where
    F: Fn(&Expression<T>) -> Result<MatcherResult, Thrown> + Send + Sync,
{
    FnMatcher { f }
}

/// Build a matcher from a status-returning closure and a fixed message.
pub fn simple<T, F>(
    message: impl Into<String>,
    f: F,
) -> RequireNonNil<FnMatcher<impl Fn(&Expression<T>) -> Result<MatcherResult, Thrown> + Send + Sync>>
where
    T: Actual,
    F: Fn(&Expression<T>) -> Result<MatcherStatus, Thrown> + Send + Sync,
{
    require_non_nil(simple_nilable(message, f))
}

/// Like [`simple`], without the missing-value check.
pub fn simple_nilable<T, F>(
    message: impl Into<String>,
    f: F,
) -> FnMatcher<impl Fn(&Expression<T>) -> Result<MatcherResult, Thrown> + Send + Sync>
where
    F: Fn(&Expression<T>) -> Result<MatcherStatus, Thrown> + Send + Sync,
{
    let message = Message::expected_actual_value_to(message);
    FnMatcher {
        f: move |actual: &Expression<T>| Ok(MatcherResult::new(f(actual)?, message.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::SourceLocation;

    fn value<T: Actual>(v: T) -> Expression<T> {
        Expression::from_value(v, SourceLocation::caller())
    }

    fn missing() -> Expression<i32> {
        Expression::optional(|| None, SourceLocation::caller())
    }

    #[test]
    fn test_to_boolean_truth_table() {
        use MatcherStatus::{DoesNotMatch, Fail, Matches};
        use Polarity::{ToMatch, ToNotMatch};

        assert!(Matches.to_boolean(ToMatch));
        assert!(!Matches.to_boolean(ToNotMatch));
        assert!(!DoesNotMatch.to_boolean(ToMatch));
        assert!(DoesNotMatch.to_boolean(ToNotMatch));
        assert!(!Fail.to_boolean(ToMatch));
        assert!(!Fail.to_boolean(ToNotMatch));
    }

    #[test]
    fn test_negation_keeps_fail() {
        assert_eq!(MatcherStatus::Fail.negated(), MatcherStatus::Fail);
        assert_eq!(MatcherStatus::Matches.negated(), MatcherStatus::DoesNotMatch);

        let result = MatcherResult::from_bool(true, Message::expected_to("be ready")).negated();
        assert_eq!(result.status, MatcherStatus::DoesNotMatch);
        assert_eq!(result.message, Message::expected_to("not be ready"));
    }

    #[test]
    fn test_simple_matcher_requires_value() {
        let positive = simple("be positive", |actual: &Expression<i32>| {
            Ok(MatcherStatus::from(actual.evaluate()?.map_or(false, |n| n > 0)))
        });

        assert_eq!(positive.satisfies(&value(3)).unwrap().status, MatcherStatus::Matches);
        assert_eq!(
            positive.satisfies(&value(-3)).unwrap().status,
            MatcherStatus::DoesNotMatch
        );

        let result = positive.satisfies(&missing()).unwrap();
        assert_eq!(result.status, MatcherStatus::Fail);
        assert_eq!(
            result.message.render("<None>", "expected", "to"),
            "expected to be positive, got <None> (use be_none() to match None)"
        );
    }

    #[test]
    fn test_nilable_matcher_sees_missing_value() {
        let absent = simple_nilable("be absent", |actual: &Expression<i32>| {
            Ok(MatcherStatus::from(actual.evaluate()?.is_none()))
        });
        assert_eq!(absent.satisfies(&missing()).unwrap().status, MatcherStatus::Matches);
    }

    #[test]
    fn test_define_with_message() {
        let small = define_with_message("be small", |actual: &Expression<i32>, message| {
            let n = actual.evaluate()?.unwrap_or_default();
            Ok(MatcherResult::from_bool(n < 10, message))
        });
        let result = small.satisfies(&value(50)).unwrap();
        assert_eq!(result.status, MatcherStatus::DoesNotMatch);
        assert_eq!(result.message, Message::expected_actual_value_to("be small"));
    }

    #[test]
    fn test_matcher_errors_propagate() {
        let broken = define(|_: &Expression<i32>| Err(Thrown::msg("kaput")));
        let err = broken.satisfies(&value(1)).unwrap_err();
        assert_eq!(err.to_string(), "kaput");
    }

    #[test]
    fn test_boxed_and_references_are_matchers() {
        let boxed: Box<dyn Matcher<i32>> = equal(1).boxed();
        assert_eq!(boxed.satisfies(&value(1)).unwrap().status, MatcherStatus::Matches);

        let by_ref = &boxed;
        assert_eq!(by_ref.satisfies(&value(2)).unwrap().status, MatcherStatus::DoesNotMatch);
    }
}
