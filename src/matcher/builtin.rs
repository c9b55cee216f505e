//! Built-in matchers.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::Debug;
use std::marker::PhantomData;
use std::ops::RangeInclusive;

use super::{Matcher, MatcherResult, MatcherStatus};
use crate::error::Thrown;
use crate::expression::{Actual, Expression};
use crate::message::{stringify, Message};

fn evaluated_or_fail<T: Actual>(
    actual: &Expression<T>,
    message: &Message,
) -> Result<Result<T, MatcherResult>, Thrown> {
    Ok(match actual.evaluate()? {
        Some(value) => Ok(value),
        None => Err(MatcherResult::fail(message.appended_be_none_hint())),
    })
}

/// Matches a value equal to `expected`.
///
/// # Example
///
/// ```rust
/// use testkit_expect::prelude::*;
///
/// expect(|| 40 + 2).to(equal(42));
/// expect(|| "a".to_string()).to_not(equal("b".to_string()));
/// ```
pub fn equal<T>(expected: T) -> EqualMatcher<T> {
    EqualMatcher { expected }
}

/// Matcher returned by [`equal`].
#[derive(Debug, Clone)]
pub struct EqualMatcher<T> {
    expected: T,
}

impl<T: Actual + PartialEq> Matcher<T> for EqualMatcher<T> {
    fn satisfies(&self, actual: &Expression<T>) -> Result<MatcherResult, Thrown> {
        let message = Message::expected_actual_value_to(format!("equal <{:?}>", self.expected));
        Ok(match evaluated_or_fail(actual, &message)? {
            Ok(value) => MatcherResult::from_bool(value == self.expected, message),
            Err(fail) => fail,
        })
    }
}

/// How a value is compared against a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl Comparison {
    fn verb(self) -> &'static str {
        match self {
            Self::Greater => "be greater than",
            Self::GreaterOrEqual => "be greater than or equal to",
            Self::Less => "be less than",
            Self::LessOrEqual => "be less than or equal to",
        }
    }

    fn holds<T: PartialOrd>(self, value: &T, threshold: &T) -> bool {
        match self {
            Self::Greater => value > threshold,
            Self::GreaterOrEqual => value >= threshold,
            Self::Less => value < threshold,
            Self::LessOrEqual => value <= threshold,
        }
    }
}

/// Matcher returned by the ordering constructors such as
/// [`be_greater_than`].
#[derive(Debug, Clone)]
pub struct CompareMatcher<T> {
    threshold: T,
    comparison: Comparison,
}

impl<T: Actual + PartialOrd> Matcher<T> for CompareMatcher<T> {
    fn satisfies(&self, actual: &Expression<T>) -> Result<MatcherResult, Thrown> {
        let message = Message::expected_actual_value_to(format!(
            "{} <{:?}>",
            self.comparison.verb(),
            self.threshold
        ));
        Ok(match evaluated_or_fail(actual, &message)? {
            Ok(value) => {
                MatcherResult::from_bool(self.comparison.holds(&value, &self.threshold), message)
            }
            Err(fail) => fail,
        })
    }
}

/// Matches a value strictly greater than `threshold`.
pub fn be_greater_than<T>(threshold: T) -> CompareMatcher<T> {
    CompareMatcher {
        threshold,
        comparison: Comparison::Greater,
    }
}

/// Matches a value greater than or equal to `threshold`.
pub fn be_greater_than_or_equal_to<T>(threshold: T) -> CompareMatcher<T> {
    CompareMatcher {
        threshold,
        comparison: Comparison::GreaterOrEqual,
    }
}

/// Matches a value strictly less than `threshold`.
pub fn be_less_than<T>(threshold: T) -> CompareMatcher<T> {
    CompareMatcher {
        threshold,
        comparison: Comparison::Less,
    }
}

/// Matches a value less than or equal to `threshold`.
pub fn be_less_than_or_equal_to<T>(threshold: T) -> CompareMatcher<T> {
    CompareMatcher {
        threshold,
        comparison: Comparison::LessOrEqual,
    }
}

/// Matches a value inside an inclusive range.
///
/// ```rust
/// use testkit_expect::prelude::*;
///
/// expect(|| 5).to(be_within(1..=10));
/// expect(|| 11).to_not(be_within(1..=10));
/// ```
pub fn be_within<T>(range: RangeInclusive<T>) -> WithinMatcher<T> {
    WithinMatcher { range }
}

/// Matcher returned by [`be_within`].
#[derive(Debug, Clone)]
pub struct WithinMatcher<T> {
    range: RangeInclusive<T>,
}

impl<T: Actual + PartialOrd> Matcher<T> for WithinMatcher<T> {
    fn satisfies(&self, actual: &Expression<T>) -> Result<MatcherResult, Thrown> {
        let message = Message::expected_actual_value_to(format!("be within <{:?}>", self.range));
        Ok(match evaluated_or_fail(actual, &message)? {
            Ok(value) => MatcherResult::from_bool(self.range.contains(&value), message),
            Err(fail) => fail,
        })
    }
}

/// Values with a number of elements.
pub trait Collection {
    /// Number of elements.
    fn count(&self) -> usize;
}

impl<E> Collection for Vec<E> {
    fn count(&self) -> usize {
        self.len()
    }
}

impl<E> Collection for VecDeque<E> {
    fn count(&self) -> usize {
        self.len()
    }
}

impl<E, S> Collection for HashSet<E, S> {
    fn count(&self) -> usize {
        self.len()
    }
}

impl<E> Collection for BTreeSet<E> {
    fn count(&self) -> usize {
        self.len()
    }
}

impl<K, V, S> Collection for HashMap<K, V, S> {
    fn count(&self) -> usize {
        self.len()
    }
}

impl<K, V> Collection for BTreeMap<K, V> {
    fn count(&self) -> usize {
        self.len()
    }
}

impl Collection for String {
    fn count(&self) -> usize {
        self.chars().count()
    }
}

impl Collection for &str {
    fn count(&self) -> usize {
        self.chars().count()
    }
}

/// Matches an empty collection.
pub fn be_empty<T>() -> EmptyMatcher<T> {
    EmptyMatcher {
        _phantom: PhantomData,
    }
}

/// Matcher returned by [`be_empty`].
pub struct EmptyMatcher<T> {
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Actual + Collection> Matcher<T> for EmptyMatcher<T> {
    fn satisfies(&self, actual: &Expression<T>) -> Result<MatcherResult, Thrown> {
        let message = Message::expected_actual_value_to("be empty");
        Ok(match evaluated_or_fail(actual, &message)? {
            Ok(value) => MatcherResult::from_bool(value.count() == 0, message),
            Err(fail) => fail,
        })
    }
}

/// Matches a collection with exactly `expected` elements.
///
/// ```rust
/// use testkit_expect::prelude::*;
///
/// expect(|| vec![1, 2, 3]).to(have_count(3));
/// ```
pub fn have_count<T>(expected: usize) -> CountMatcher<T> {
    CountMatcher {
        expected,
        _phantom: PhantomData,
    }
}

/// Matcher returned by [`have_count`].
pub struct CountMatcher<T> {
    expected: usize,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Actual + Collection> Matcher<T> for CountMatcher<T> {
    fn satisfies(&self, actual: &Expression<T>) -> Result<MatcherResult, Thrown> {
        let text = format!("have count <{}>", self.expected);
        let message = Message::expected_actual_value_to(text.clone());
        Ok(match evaluated_or_fail(actual, &message)? {
            Ok(value) => {
                let count = value.count();
                MatcherResult::from_bool(
                    count == self.expected,
                    Message::expected_value_to(text, format!("<{count}> (value: {value:?})")),
                )
            }
            Err(fail) => fail,
        })
    }
}

/// Matches a vector containing `element`.
pub fn contain<E>(element: E) -> ContainMatcher<E> {
    ContainMatcher { element }
}

/// Matcher returned by [`contain`].
#[derive(Debug, Clone)]
pub struct ContainMatcher<E> {
    element: E,
}

impl<E: Actual + PartialEq> Matcher<Vec<E>> for ContainMatcher<E> {
    fn satisfies(&self, actual: &Expression<Vec<E>>) -> Result<MatcherResult, Thrown> {
        let message = Message::expected_actual_value_to(format!("contain <{:?}>", self.element));
        Ok(match evaluated_or_fail(actual, &message)? {
            Ok(value) => MatcherResult::from_bool(value.contains(&self.element), message),
            Err(fail) => fail,
        })
    }
}

/// Matches a string containing `substring`.
pub fn contain_substring(substring: impl Into<String>) -> SubstringMatcher {
    SubstringMatcher {
        substring: substring.into(),
    }
}

/// Matcher returned by [`contain_substring`].
#[derive(Debug, Clone)]
pub struct SubstringMatcher {
    substring: String,
}

impl Matcher<String> for SubstringMatcher {
    fn satisfies(&self, actual: &Expression<String>) -> Result<MatcherResult, Thrown> {
        let message = Message::expected_actual_value_to(format!("contain <{:?}>", self.substring));
        Ok(match evaluated_or_fail(actual, &message)? {
            Ok(value) => MatcherResult::from_bool(value.contains(&self.substring), message),
            Err(fail) => fail,
        })
    }
}

impl Matcher<&'static str> for SubstringMatcher {
    fn satisfies(&self, actual: &Expression<&'static str>) -> Result<MatcherResult, Thrown> {
        let message = Message::expected_actual_value_to(format!("contain <{:?}>", self.substring));
        Ok(match evaluated_or_fail(actual, &message)? {
            Ok(value) => MatcherResult::from_bool(value.contains(&self.substring), message),
            Err(fail) => fail,
        })
    }
}

/// Matches a missing value.
///
/// ```rust
/// use testkit_expect::prelude::*;
///
/// expect_option(|| None::<i32>).to(be_none());
/// expect_option(|| Some(1)).to_not(be_none());
/// ```
pub fn be_none<T>() -> PresenceMatcher<T> {
    PresenceMatcher {
        present: false,
        _phantom: PhantomData,
    }
}

/// Matches any present value.
pub fn be_some<T>() -> PresenceMatcher<T> {
    PresenceMatcher {
        present: true,
        _phantom: PhantomData,
    }
}

/// Matcher returned by [`be_none`] and [`be_some`].
pub struct PresenceMatcher<T> {
    present: bool,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Actual> Matcher<T> for PresenceMatcher<T> {
    fn satisfies(&self, actual: &Expression<T>) -> Result<MatcherResult, Thrown> {
        let value = actual.evaluate()?;
        let text = if self.present { "be some" } else { "be none" };
        Ok(MatcherResult::from_bool(
            value.is_some() == self.present,
            Message::expected_value_to(text, stringify(value.as_ref())),
        ))
    }
}

/// Matches a value accepted by `predicate`.
///
/// ```rust
/// use testkit_expect::prelude::*;
///
/// expect(|| 4).to(satisfy("be even", |n: &i32| n % 2 == 0));
/// ```
pub fn satisfy<F>(description: impl Into<String>, predicate: F) -> SatisfyMatcher<F> {
    SatisfyMatcher {
        description: description.into(),
        predicate,
    }
}

/// Matcher returned by [`satisfy`].
pub struct SatisfyMatcher<F> {
    description: String,
    predicate: F,
}

impl<T, F> Matcher<T> for SatisfyMatcher<F>
where
    T: Actual,
    F: Fn(&T) -> bool + Send + Sync,
{
    fn satisfies(&self, actual: &Expression<T>) -> Result<MatcherResult, Thrown> {
        let message = Message::expected_actual_value_to(self.description.clone());
        Ok(match evaluated_or_fail(actual, &message)? {
            Ok(value) => MatcherResult::from_bool((self.predicate)(&value), message),
            Err(fail) => fail,
        })
    }
}

/// Matches an expression that evaluates without an error.
///
/// Unlike other matchers, an error raised by the expression is the
/// `DoesNotMatch` case rather than a failure of the expectation.
///
/// ```rust
/// use testkit_expect::prelude::*;
///
/// expect_result(|| "42".parse::<i32>()).to(succeed());
/// expect_result(|| "x".parse::<i32>()).to_not(succeed());
/// ```
pub fn succeed<T>() -> SucceedMatcher<T> {
    SucceedMatcher {
        _phantom: PhantomData,
    }
}

/// Matcher returned by [`succeed`].
pub struct SucceedMatcher<T> {
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Actual> Matcher<T> for SucceedMatcher<T> {
    fn satisfies(&self, actual: &Expression<T>) -> Result<MatcherResult, Thrown> {
        Ok(match actual.evaluate() {
            Ok(value) => MatcherResult::new(
                MatcherStatus::Matches,
                Message::expected_value_to("succeed", stringify(value.as_ref())),
            ),
            Err(thrown) => MatcherResult::new(
                MatcherStatus::DoesNotMatch,
                Message::expected_value_to("succeed", format!("<error: {thrown}>")),
            ),
        })
    }
}

/// A matcher that always reports `Fail`.
pub fn always_fail<T>() -> AlwaysFailMatcher<T> {
    AlwaysFailMatcher {
        _phantom: PhantomData,
    }
}

/// Matcher returned by [`always_fail`].
pub struct AlwaysFailMatcher<T> {
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Actual> Matcher<T> for AlwaysFailMatcher<T> {
    fn satisfies(&self, _actual: &Expression<T>) -> Result<MatcherResult, Thrown> {
        Ok(MatcherResult::fail(Message::fail("matcher always fails")))
    }
}
