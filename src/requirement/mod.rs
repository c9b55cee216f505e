//! Requirements: expectations that stop the test and hand back the value.
//!
//! A requirement reports its verdict like an expectation, then returns
//! `Ok(value)` when it held or an [`Error`] when it did not, so a test can
//! continue with the checked value or bail out with `?`.
//!
//! ```rust
//! use testkit_expect::prelude::*;
//!
//! fn parse_port() -> testkit_expect::Result<u16> {
//!     let port = require(|| "8080".parse::<u16>().unwrap()).to(be_greater_than(1024))?;
//!     Ok(port)
//! }
//!
//! assert_eq!(parse_port().unwrap(), 8080);
//! ```

mod concurrent;
mod sync;

use crate::error::{Error, Result};
use crate::expectation::{report, Verdict};
use crate::expression::Outcome;
use crate::location::SourceLocation;

pub use concurrent::AsyncRequirement;
pub use sync::SyncRequirement;

/// Turn a verdict and the value it was reached on into the requirement's
/// result.
fn conclude<T>(
    verdict: Verdict,
    location: SourceLocation,
    custom_error: Option<Error>,
    value: impl FnOnce() -> Option<Outcome<T>>,
) -> Result<T> {
    report(verdict.passed, &verdict.message, &location);
    if !verdict.passed {
        tracing::debug!(%location, "requirement failed");
        if let Some(error) = custom_error {
            return Err(error);
        }
        if let Some(error) = verdict.thrown {
            return Err(Error::Thrown { error, location });
        }
        return Err(Error::require_failed(verdict.message.string_value(), location));
    }
    match value() {
        Some(Ok(Some(value))) => Ok(value),
        Some(Err(error)) => Err(Error::Thrown { error, location }),
        Some(Ok(None)) | None => Err(custom_error.unwrap_or_else(|| {
            Error::require_failed("expected a value to be returned, got <None>", location)
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Thrown;
    use crate::message::FailureMessage;

    fn here() -> SourceLocation {
        SourceLocation::new("tests/require.rs", 4, 2)
    }

    fn verdict(passed: bool) -> Verdict {
        Verdict {
            passed,
            message: FailureMessage::with_string("expected to equal <2>, got <1>"),
            thrown: None,
        }
    }

    #[test]
    fn test_conclude_failure_uses_rendered_message() {
        let recorder = crate::expectation::AssertionRecorder::new();
        let result = crate::expectation::with_assertion_handler(recorder.clone(), || {
            conclude::<i32>(verdict(false), here(), None, || unreachable!())
        });
        let error = result.unwrap_err();
        assert_eq!(
            error.to_string(),
            "expected to equal <2>, got <1> (tests/require.rs:4:2)"
        );
        assert_eq!(recorder.failures().len(), 1);
    }

    #[test]
    fn test_conclude_success_returns_value() {
        let value = conclude(verdict(true), here(), None, || Some(Ok(Some(5))));
        assert_eq!(value.unwrap(), 5);

        let missing = conclude::<i32>(verdict(true), here(), None, || Some(Ok(None)));
        assert!(matches!(missing, Err(Error::RequireFailed { .. })));

        let thrown = conclude::<i32>(verdict(true), here(), None, || Some(Err(Thrown::msg("gone"))));
        assert!(matches!(thrown, Err(Error::Thrown { .. })));
    }
}
