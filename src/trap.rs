//! Capturing panics as traps.
//!
//! A panic is the closest Rust has to a process-level trap that a test can
//! observe and survive. [`capture_trap`] runs a closure and reports the
//! panic it raised, if any, and [`panic_with`] turns that into a matcher.
//!
//! ```rust
//! use testkit_expect::prelude::*;
//! use testkit_expect::trap::{capture_trap, panic_with};
//!
//! let trap = capture_trap(|| panic!("index out of range")).unwrap();
//! assert_eq!(trap.message(), "index out of range");
//!
//! expect(|| { let v: Vec<u8> = Vec::new(); v[1] }).to(panic_with("out of bounds"));
//! ```

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::Thrown;
use crate::expression::{Actual, Expression};
use crate::matcher::{Matcher, MatcherResult};
use crate::message::Message;

/// What a captured panic carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrapInfo {
    message: String,
}

impl TrapInfo {
    /// The panic message, or a placeholder for non-string payloads.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TrapInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Run `f`, returning the panic it raised.
pub fn capture_trap<F: FnOnce()>(f: F) -> Option<TrapInfo> {
    catch_unwind(AssertUnwindSafe(f)).err().map(|payload| TrapInfo {
        message: panic_message(&*payload),
    })
}

/// Extract the message of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

/// Matches when evaluating the expression panics.
pub struct PanicMatcher {
    expected: Option<String>,
}

/// Matches when evaluating the expression panics with a message containing
/// `text`.
pub fn panic_with(text: impl Into<String>) -> PanicMatcher {
    PanicMatcher {
        expected: Some(text.into()),
    }
}

/// Matches when evaluating the expression panics at all.
#[must_use]
pub fn panic_any() -> PanicMatcher {
    PanicMatcher { expected: None }
}

impl<T: Actual> Matcher<T> for PanicMatcher {
    fn satisfies(&self, actual: &Expression<T>) -> Result<MatcherResult, Thrown> {
        let expectation = match &self.expected {
            Some(text) => format!("panic with <{text:?}>"),
            None => "panic".to_string(),
        };
        let mut failed = None;
        let trap = capture_trap(|| {
            if let Err(error) = actual.evaluate() {
                failed = Some(error);
            }
        });
        if let Some(error) = failed {
            return Err(error);
        }
        Ok(match trap {
            None => MatcherResult::from_bool(
                false,
                Message::expected_value_to(expectation, "<no panic>"),
            ),
            Some(trap) => {
                let matches = self
                    .expected
                    .as_deref()
                    .map_or(true, |text| trap.message.contains(text));
                MatcherResult::from_bool(
                    matches,
                    Message::expected_value_to(expectation, format!("<panic: {:?}>", trap.message)),
                )
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::SourceLocation;
    use crate::matcher::MatcherStatus;

    fn here() -> SourceLocation {
        SourceLocation::new(file!(), line!(), 1)
    }

    #[test]
    fn test_capture_trap() {
        assert_eq!(capture_trap(|| {}), None);
        let trap = capture_trap(|| panic!("code {}", 7)).unwrap();
        assert_eq!(trap.message(), "code 7");
    }

    #[test]
    fn test_non_string_payload() {
        let trap = capture_trap(|| std::panic::panic_any(42_u8)).unwrap();
        assert_eq!(trap.message(), "<non-string panic payload>");
    }

    #[test]
    fn test_panic_matchers() {
        let panics = Expression::new(|| -> i32 { panic!("queue closed") }, here());
        let returns = Expression::new(|| 1, here());

        let result = panic_with("closed").satisfies(&panics).unwrap();
        assert_eq!(result.status, MatcherStatus::Matches);

        let result = panic_with("full").satisfies(&panics).unwrap();
        assert_eq!(result.status, MatcherStatus::DoesNotMatch);
        assert_eq!(
            result.message.render("", "expected", "to"),
            "expected to panic with <\"full\">, got <panic: \"queue closed\">"
        );

        let result = panic_any().satisfies(&returns).unwrap();
        assert_eq!(result.status, MatcherStatus::DoesNotMatch);
        assert_eq!(
            result.message.render("", "expected", "to"),
            "expected to panic, got <no panic>"
        );
    }

    #[test]
    fn test_errors_are_propagated() {
        let thrown = Expression::<i32>::from_fn(|| Err(Thrown::msg("closed")), here());
        assert!(panic_any().satisfies(&thrown).is_err());
    }
}
