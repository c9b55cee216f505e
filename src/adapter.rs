//! A type-erased bridge to the matcher engine.
//!
//! Callers that only know values as `Arc<dyn Any + Send + Sync>` (scripting
//! hosts, table-driven tests, FFI shims) can still drive typed matchers:
//! [`DynMatcher`] downcasts the value before delegating, and
//! [`DynMatcherResult`] carries a verdict as a plain status code plus text.
//!
//! ```rust
//! use std::any::Any;
//! use std::sync::Arc;
//! use testkit_expect::adapter::{DynMatcher, DynStatus};
//! use testkit_expect::prelude::*;
//!
//! let matcher = DynMatcher::new(equal(7_u32));
//! let value: Arc<dyn Any + Send + Sync> = Arc::new(7_u32);
//! let result = matcher.matches(Some(value), SourceLocation::caller());
//! assert_eq!(result.status(), DynStatus::Matches);
//! assert!(result.passed(true));
//! ```

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use crate::error::Thrown;
use crate::expression::{Actual, Expression};
use crate::location::SourceLocation;
use crate::matcher::{Matcher, MatcherResult, MatcherStatus, Polarity};
use crate::message::{stringify, FailureMessage, Message};

/// A type-erased value.
pub type DynValue = Arc<dyn Any + Send + Sync>;

/// [`MatcherStatus`] as a plain code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DynStatus {
    /// The value satisfied the matcher.
    Matches = 0,
    /// The value did not satisfy the matcher.
    DoesNotMatch = 1,
    /// The matcher could not judge the value.
    Fail = 2,
}

impl DynStatus {
    /// Decode a status code.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Matches),
            1 => Some(Self::DoesNotMatch),
            2 => Some(Self::Fail),
            _ => None,
        }
    }

    /// The status code.
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<MatcherStatus> for DynStatus {
    fn from(status: MatcherStatus) -> Self {
        match status {
            MatcherStatus::Matches => Self::Matches,
            MatcherStatus::DoesNotMatch => Self::DoesNotMatch,
            MatcherStatus::Fail => Self::Fail,
        }
    }
}

impl From<DynStatus> for MatcherStatus {
    fn from(status: DynStatus) -> Self {
        match status {
            DynStatus::Matches => Self::Matches,
            DynStatus::DoesNotMatch => Self::DoesNotMatch,
            DynStatus::Fail => Self::Fail,
        }
    }
}

/// A verdict as a status code and a structured message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynMatcherResult {
    status: DynStatus,
    message: FailureMessage,
}

impl DynMatcherResult {
    /// Build a result from its parts.
    #[must_use]
    pub fn new(status: DynStatus, message: FailureMessage) -> Self {
        Self { status, message }
    }

    /// A result from a plain boolean.
    #[must_use]
    pub fn from_bool(matches: bool, message: FailureMessage) -> Self {
        Self::new(MatcherStatus::from(matches).into(), message)
    }

    /// The status code.
    #[must_use]
    pub fn status(&self) -> DynStatus {
        self.status
    }

    /// The message.
    #[must_use]
    pub fn message(&self) -> &FailureMessage {
        &self.message
    }

    /// Whether the verdict passes under the given polarity.
    #[must_use]
    pub fn passed(&self, affirmative: bool) -> bool {
        let polarity = if affirmative {
            Polarity::ToMatch
        } else {
            Polarity::ToNotMatch
        };
        MatcherStatus::from(self.status).to_boolean(polarity)
    }
}

impl From<MatcherResult> for DynMatcherResult {
    fn from(result: MatcherResult) -> Self {
        let mut message = FailureMessage::new();
        result.message.update(&mut message);
        Self::new(result.status.into(), message)
    }
}

impl From<DynMatcherResult> for MatcherResult {
    fn from(result: DynMatcherResult) -> Self {
        Self::new(result.status.into(), result.message.to_message())
    }
}

/// Judges type-erased values with a typed matcher.
pub struct DynMatcher {
    judge: Box<dyn Fn(Option<DynValue>, SourceLocation) -> Result<MatcherResult, Thrown> + Send + Sync>,
    expects: &'static str,
}

impl fmt::Debug for DynMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynMatcher")
            .field("expects", &self.expects)
            .finish_non_exhaustive()
    }
}

impl DynMatcher {
    /// Erase a matcher over `T`.
    pub fn new<T, M>(matcher: M) -> Self
    where
        T: Actual,
        M: Matcher<T> + 'static,
    {
        let expects = type_name::<T>();
        Self {
            judge: Box::new(move |value, location| {
                let typed = match value {
                    None => None,
                    Some(value) => match value.downcast_ref::<T>() {
                        Some(typed) => Some(typed.clone()),
                        None => {
                            return Ok(MatcherResult::fail(Message::fail(format!(
                                "expected a value of type {expects}"
                            ))))
                        }
                    },
                };
                let rendered = stringify(typed.as_ref());
                let expression = Expression::from_outcome(Ok(typed), location);
                let result = matcher.satisfies(&expression)?;
                Ok(MatcherResult::new(
                    result.status,
                    result.message.resolving_actual(&rendered),
                ))
            }),
            expects,
        }
    }

    /// The type the wrapped matcher expects.
    #[must_use]
    pub fn expected_type(&self) -> &'static str {
        self.expects
    }

    /// Judge a value. Errors become `Fail` verdicts.
    pub fn matches(&self, value: Option<DynValue>, location: SourceLocation) -> DynMatcherResult {
        match (self.judge)(value, location) {
            Ok(result) => result.into(),
            Err(error) => DynMatcherResult::new(
                DynStatus::Fail,
                FailureMessage::with_string(format!("unexpected error thrown: <{error}>")),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{be_none, contain_substring, equal};

    fn here() -> SourceLocation {
        SourceLocation::new(file!(), line!(), 1)
    }

    #[test]
    fn test_status_codes() {
        for status in [DynStatus::Matches, DynStatus::DoesNotMatch, DynStatus::Fail] {
            assert_eq!(DynStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(DynStatus::from_code(9), None);
    }

    #[test]
    fn test_fail_never_passes() {
        let result = DynMatcherResult::new(DynStatus::Fail, FailureMessage::new());
        assert!(!result.passed(true));
        assert!(!result.passed(false));
    }

    #[test]
    fn test_result_conversion_keeps_status_and_text() {
        let typed = MatcherResult::new(
            MatcherStatus::DoesNotMatch,
            Message::expected_value_to("equal <1>", "<2>"),
        );
        let erased = DynMatcherResult::from(typed);
        assert_eq!(erased.status(), DynStatus::DoesNotMatch);
        assert_eq!(erased.message().string_value(), "expected to equal <1>, got <2>");

        let back = MatcherResult::from(erased);
        assert_eq!(back.status, MatcherStatus::DoesNotMatch);
        assert_eq!(back.message.render("", "expected", "to"), "expected to equal <1>, got <2>");
    }

    #[test]
    fn test_dyn_matcher_downcasts() {
        let matcher = DynMatcher::new::<String, _>(contain_substring("lo"));
        let value: DynValue = Arc::new("hello".to_string());
        let result = matcher.matches(Some(value), here());
        assert_eq!(result.status(), DynStatus::Matches);

        let value: DynValue = Arc::new("world".to_string());
        let result = matcher.matches(Some(value), here());
        assert_eq!(result.status(), DynStatus::DoesNotMatch);
        assert_eq!(
            result.message().string_value(),
            "expected to contain <\"lo\">, got <\"world\">"
        );
    }

    #[test]
    fn test_dyn_matcher_type_mismatch_fails() {
        let matcher = DynMatcher::new(equal(1_i64));
        let value: DynValue = Arc::new("one");
        let result = matcher.matches(Some(value), here());
        assert_eq!(result.status(), DynStatus::Fail);
        assert_eq!(result.message().string_value(), "expected a value of type i64");
    }

    #[test]
    fn test_dyn_matcher_none() {
        let matcher = DynMatcher::new(be_none::<i32>());
        assert_eq!(matcher.matches(None, here()).status(), DynStatus::Matches);
    }
}
