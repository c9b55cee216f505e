//! Matchers built from other matchers.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use super::{Matcher, MatcherResult, MatcherStatus};
use crate::error::Thrown;
use crate::expression::{Actual, Expression};
use crate::message::{stringify, Message};

/// Negate a matcher. A `Fail` stays a `Fail`.
///
/// # Example
///
/// ```rust
/// use testkit_expect::prelude::*;
///
/// expect(|| 1).to(not(equal(2)));
/// ```
pub fn not<M>(matcher: M) -> Not<M> {
    Not { inner: matcher }
}

/// Matcher returned by [`not`].
pub struct Not<M> {
    inner: M,
}

impl<T, M: Matcher<T>> Matcher<T> for Not<M> {
    fn satisfies(&self, actual: &Expression<T>) -> Result<MatcherResult, Thrown> {
        Ok(self.inner.satisfies(actual)?.negated())
    }
}

fn quoted(results: &[MatcherResult], separator: &str) -> String {
    results
        .iter()
        .map(|result| format!("{{{}}}", result.message.expected_message()))
        .collect::<Vec<_>>()
        .join(separator)
}

fn with_actual<T: Debug>(text: String, value: Option<&T>) -> Message {
    match value {
        Some(_) => Message::expected_value_to(text, stringify(value)),
        None => Message::expected_actual_value_to(text),
    }
}

/// Matches when every matcher matches.
///
/// The expression is evaluated at most once no matter how many matchers
/// inspect it. Any `Fail` makes the whole result `Fail`.
///
/// # Example
///
/// ```rust
/// use testkit_expect::prelude::*;
///
/// expect(|| 5).to(all_of(vec![
///     be_greater_than(1).boxed(),
///     be_less_than(10).boxed(),
/// ]));
/// ```
pub fn all_of<T>(matchers: Vec<Box<dyn Matcher<T>>>) -> AllOf<T> {
    AllOf { matchers }
}

/// Matcher returned by [`all_of`].
pub struct AllOf<T> {
    matchers: Vec<Box<dyn Matcher<T>>>,
}

impl<T: Actual> Matcher<T> for AllOf<T> {
    fn satisfies(&self, actual: &Expression<T>) -> Result<MatcherResult, Thrown> {
        let cached = actual.with_caching();
        let mut status = MatcherStatus::Matches;
        let mut results = Vec::with_capacity(self.matchers.len());
        for matcher in &self.matchers {
            let result = matcher.satisfies(&cached)?;
            match result.status {
                MatcherStatus::Fail => status = MatcherStatus::Fail,
                MatcherStatus::DoesNotMatch if status != MatcherStatus::Fail => {
                    status = MatcherStatus::DoesNotMatch;
                }
                _ => {}
            }
            results.push(result);
        }

        let value = cached.evaluate()?;
        let text = format!("match all of: {}", quoted(&results, ", and "));
        let message = with_actual(text, value.as_ref());
        if value.is_none() {
            return Ok(MatcherResult::fail(message.appended_be_none_hint()));
        }
        Ok(MatcherResult::new(status, message))
    }
}

/// Matches when at least one matcher matches.
///
/// Any `Fail` makes the whole result `Fail`.
pub fn any_of<T>(matchers: Vec<Box<dyn Matcher<T>>>) -> AnyOf<T> {
    AnyOf { matchers }
}

/// Matcher returned by [`any_of`].
pub struct AnyOf<T> {
    matchers: Vec<Box<dyn Matcher<T>>>,
}

impl<T: Actual> Matcher<T> for AnyOf<T> {
    fn satisfies(&self, actual: &Expression<T>) -> Result<MatcherResult, Thrown> {
        let cached = actual.with_caching();
        let mut status = MatcherStatus::DoesNotMatch;
        let mut results = Vec::with_capacity(self.matchers.len());
        for matcher in &self.matchers {
            let result = matcher.satisfies(&cached)?;
            match result.status {
                MatcherStatus::Fail => status = MatcherStatus::Fail,
                MatcherStatus::Matches if status != MatcherStatus::Fail => {
                    status = MatcherStatus::Matches;
                }
                _ => {}
            }
            results.push(result);
        }

        let value = cached.evaluate()?;
        let text = format!("match one of: {}", quoted(&results, ", or "));
        let message = with_actual(text, value.as_ref());
        if value.is_none() {
            return Ok(MatcherResult::fail(message.appended_be_none_hint()));
        }
        Ok(MatcherResult::new(status, message))
    }
}

/// Matches a sequence whose every element satisfies `matcher`.
///
/// The failure message names the first offending element and its index.
///
/// # Example
///
/// ```rust
/// use testkit_expect::prelude::*;
///
/// expect(|| vec![2, 4, 6]).to(all_pass(be_less_than(10)));
/// ```
pub fn all_pass<E, M>(matcher: M) -> AllPass<E, M> {
    AllPass {
        element: matcher,
        _phantom: PhantomData,
    }
}

/// Matcher returned by [`all_pass`].
pub struct AllPass<E, M> {
    element: M,
    _phantom: PhantomData<fn() -> E>,
}

impl<S, E, M> Matcher<S> for AllPass<E, M>
where
    S: Actual + IntoIterator<Item = E>,
    E: Actual,
    M: Matcher<E>,
{
    fn satisfies(&self, actual: &Expression<S>) -> Result<MatcherResult, Thrown> {
        let Some(sequence) = actual.evaluate()? else {
            return Ok(MatcherResult::fail(
                Message::expected_to("all pass").appended_be_none_hint(),
            ));
        };
        let rendered = format!("{sequence:?}");
        let location = actual.location();

        let mut last = None;
        for (index, element) in sequence.into_iter().enumerate() {
            let result = self
                .element
                .satisfies(&Expression::from_value(element.clone(), location))?;
            if result.status != MatcherStatus::Matches {
                let message = Message::expected_to(format!(
                    "all {}, but failed first at element <{element:?}> at index {index} in <{rendered}>",
                    result.message.expected_message()
                ));
                return Ok(MatcherResult::new(result.status, message));
            }
            last = Some(result);
        }

        let text = last.map_or_else(
            || "all pass".to_string(),
            |result| format!("all {}", result.message.expected_message()),
        );
        Ok(MatcherResult::new(MatcherStatus::Matches, Message::expected_to(text)))
    }
}

/// Apply `matcher` to a projection of the value.
///
/// # Example
///
/// ```rust
/// use testkit_expect::prelude::*;
///
/// expect(|| "hello".to_string()).to(map(|s: String| s.len(), equal(5)));
/// ```
pub fn map<T, U, F, M>(
    transform: F,
    matcher: M,
) -> Map<impl Fn(T) -> Option<U> + Send + Sync + 'static, M>
where
    F: Fn(T) -> U + Send + Sync + 'static,
{
    filter_map(move |value: T| Some(transform(value)), matcher)
}

/// Apply `matcher` to a projection that may yield nothing.
///
/// A present value whose projection yields nothing makes the result `Fail`.
pub fn filter_map<F, M>(transform: F, matcher: M) -> Map<F, M> {
    Map {
        transform: Arc::new(transform),
        matcher,
    }
}

/// Matcher returned by [`map`] and [`filter_map`].
pub struct Map<F, M> {
    transform: Arc<F>,
    matcher: M,
}

impl<T, U, F, M> Matcher<T> for Map<F, M>
where
    T: Actual,
    U: Actual,
    F: Fn(T) -> Option<U> + Send + Sync + 'static,
    M: Matcher<U>,
{
    fn satisfies(&self, actual: &Expression<T>) -> Result<MatcherResult, Thrown> {
        let transform = Arc::clone(&self.transform);
        let projected = actual.cast(move |value| Ok(value.and_then(|v| transform(v))));
        let result = self.matcher.satisfies(&projected)?;
        if actual.evaluate()?.is_some() && projected.evaluate()?.is_none() {
            return Ok(MatcherResult::fail(
                result.message.appended(" (the projection produced no value)"),
            ));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::SourceLocation;
    use crate::matcher::{always_fail, be_greater_than, be_less_than, equal, MatcherExt};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn value<T: Actual>(v: T) -> Expression<T> {
        Expression::from_value(v, SourceLocation::caller())
    }

    #[test]
    fn test_not() {
        assert_eq!(
            not(equal(1)).satisfies(&value(2)).unwrap().status,
            MatcherStatus::Matches
        );
        let result = not(equal(1)).satisfies(&value(1)).unwrap();
        assert_eq!(result.status, MatcherStatus::DoesNotMatch);
        assert_eq!(
            result.message.render("<1>", "expected", "to"),
            "expected to not equal <1>, got <1>"
        );
    }

    #[test]
    fn test_not_of_fail_is_fail() {
        let result = not(always_fail::<i32>()).satisfies(&value(1)).unwrap();
        assert_eq!(result.status, MatcherStatus::Fail);
    }

    #[test]
    fn test_all_of_names_every_matcher() {
        let matcher = equal(5).and(be_greater_than(10));
        let result = matcher.satisfies(&value(5)).unwrap();
        assert_eq!(result.status, MatcherStatus::DoesNotMatch);
        assert_eq!(
            result.message.render("", "expected", "to"),
            "expected to match all of: {equal <5>}, and {be greater than <10>}, got <5>"
        );
    }

    #[test]
    fn test_all_of_evaluates_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let expr = Expression::new(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                5
            },
            SourceLocation::caller(),
        )
        .without_caching();

        let matcher = all_of(vec![
            be_greater_than(1).boxed(),
            be_less_than(10).boxed(),
            equal(5).boxed(),
        ]);
        assert_eq!(matcher.satisfies(&expr).unwrap().status, MatcherStatus::Matches);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_all_of_fail_is_absorbing() {
        let matcher = all_of(vec![always_fail().boxed(), equal(1).boxed()]);
        assert_eq!(matcher.satisfies(&value(1)).unwrap().status, MatcherStatus::Fail);
    }

    #[test]
    fn test_any_of() {
        let matcher = equal(1).or(equal(2));
        assert_eq!(matcher.satisfies(&value(2)).unwrap().status, MatcherStatus::Matches);

        let result = matcher.satisfies(&value(3)).unwrap();
        assert_eq!(result.status, MatcherStatus::DoesNotMatch);
        assert_eq!(
            result.message.render("", "expected", "to"),
            "expected to match one of: {equal <1>}, or {equal <2>}, got <3>"
        );

        let failing = any_of(vec![equal(3).boxed(), always_fail().boxed()]);
        assert_eq!(failing.satisfies(&value(3)).unwrap().status, MatcherStatus::Fail);
    }

    #[test]
    fn test_all_pass() {
        let matcher = all_pass(be_less_than(3));
        assert_eq!(
            matcher.satisfies(&value(vec![1, 2])).unwrap().status,
            MatcherStatus::Matches
        );

        let result = matcher.satisfies(&value(vec![1, 5, 7])).unwrap();
        assert_eq!(result.status, MatcherStatus::DoesNotMatch);
        assert_eq!(
            result.message.render("", "expected", "to"),
            "expected to all be less than <3>, but failed first at element <5> at index 1 in <[1, 5, 7]>"
        );

        let missing: Expression<Vec<i32>> = Expression::optional(|| None, SourceLocation::caller());
        assert_eq!(matcher.satisfies(&missing).unwrap().status, MatcherStatus::Fail);
    }

    #[test]
    fn test_all_pass_names_position_of_repeated_value() {
        let result = all_pass(be_less_than(3))
            .satisfies(&value(vec![1, 2, 5, 5]))
            .unwrap();
        assert_eq!(result.status, MatcherStatus::DoesNotMatch);
        assert_eq!(
            result.message.render("", "expected", "to"),
            "expected to all be less than <3>, but failed first at element <5> at index 2 in <[1, 2, 5, 5]>"
        );
    }

    #[test]
    fn test_map_projects_value() {
        let matcher = map(|s: String| s.len(), equal(5));
        assert_eq!(
            matcher.satisfies(&value("hello".to_string())).unwrap().status,
            MatcherStatus::Matches
        );
    }

    #[test]
    fn test_filter_map_without_projection_fails() {
        let matcher = filter_map(|s: String| s.parse::<i32>().ok(), equal(5));
        assert_eq!(
            matcher.satisfies(&value("5".to_string())).unwrap().status,
            MatcherStatus::Matches
        );
        assert_eq!(
            matcher.satisfies(&value("five".to_string())).unwrap().status,
            MatcherStatus::Fail
        );
    }
}
