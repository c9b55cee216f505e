//! Where verdicts go.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::location::SourceLocation;
use crate::message::FailureMessage;

/// Receives every verdict an expectation reaches.
pub trait AssertionHandler: Send + Sync {
    /// Record one verdict.
    fn assert(&self, passed: bool, message: &FailureMessage, location: &SourceLocation);
}

impl<H: AssertionHandler + ?Sized> AssertionHandler for Arc<H> {
    fn assert(&self, passed: bool, message: &FailureMessage, location: &SourceLocation) {
        (**self).assert(passed, message, location);
    }
}

/// Fails the running test by panicking on a failed verdict.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicHandler;

impl AssertionHandler for PanicHandler {
    fn assert(&self, passed: bool, message: &FailureMessage, location: &SourceLocation) {
        if !passed {
            panic!("{location}: {message}");
        }
    }
}

/// One recorded verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionRecord {
    /// Whether the expectation held.
    pub passed: bool,
    /// The rendered message.
    pub message: String,
    /// Where the expectation was declared.
    pub location: SourceLocation,
}

impl fmt::Display for AssertionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.passed { "passed" } else { "failed" };
        write!(f, "{}: {verdict}: {}", self.location, self.message)
    }
}

/// Collects verdicts instead of failing.
///
/// Clones share the same record list.
///
/// # Example
///
/// ```rust
/// use testkit_expect::prelude::*;
/// use testkit_expect::expectation::{with_assertion_handler, AssertionRecorder};
///
/// let recorder = AssertionRecorder::new();
/// with_assertion_handler(recorder.clone(), || {
///     expect(|| 1).to(equal(2));
/// });
/// assert_eq!(recorder.failures(), vec!["expected to equal <2>, got <1>".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AssertionRecorder {
    records: Arc<Mutex<Vec<AssertionRecord>>>,
}

impl AssertionRecorder {
    /// An empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every verdict so far.
    #[must_use]
    pub fn records(&self) -> Vec<AssertionRecord> {
        self.records.lock().clone()
    }

    /// Messages of the failed verdicts.
    #[must_use]
    pub fn failures(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|record| !record.passed)
            .map(|record| record.message.clone())
            .collect()
    }

    /// Whether every recorded verdict passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.records.lock().iter().all(|record| record.passed)
    }

    /// Drop all records.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl AssertionHandler for AssertionRecorder {
    fn assert(&self, passed: bool, message: &FailureMessage, location: &SourceLocation) {
        self.records.lock().push(AssertionRecord {
            passed,
            message: message.string_value(),
            location: *location,
        });
    }
}

static DEFAULT_HANDLER: RwLock<Option<Arc<dyn AssertionHandler>>> = parking_lot::const_rwlock(None);

thread_local! {
    static SCOPED: RefCell<Vec<Arc<dyn AssertionHandler>>> = const { RefCell::new(Vec::new()) };
}

/// Replace the process-wide handler. `None` restores [`PanicHandler`].
pub fn set_default_assertion_handler(handler: Option<Arc<dyn AssertionHandler>>) {
    *DEFAULT_HANDLER.write() = handler;
}

/// Removes a scoped handler when dropped.
#[derive(Debug)]
pub struct HandlerGuard {
    _not_send: PhantomData<*const ()>,
}

impl Drop for HandlerGuard {
    fn drop(&mut self) {
        SCOPED.with(|scoped| {
            scoped.borrow_mut().pop();
        });
    }
}

/// Route verdicts on this thread to `handler` until the guard drops.
#[must_use = "the handler is removed when the guard is dropped"]
pub fn install_assertion_handler<H: AssertionHandler + 'static>(handler: H) -> HandlerGuard {
    SCOPED.with(|scoped| scoped.borrow_mut().push(Arc::new(handler)));
    HandlerGuard {
        _not_send: PhantomData,
    }
}

/// Run `f` with verdicts on this thread routed to `handler`.
pub fn with_assertion_handler<H, F, R>(handler: H, f: F) -> R
where
    H: AssertionHandler + 'static,
    F: FnOnce() -> R,
{
    let _guard = install_assertion_handler(handler);
    f()
}

fn current_handler() -> Arc<dyn AssertionHandler> {
    SCOPED
        .with(|scoped| scoped.borrow().last().cloned())
        .or_else(|| DEFAULT_HANDLER.read().clone())
        .unwrap_or_else(|| Arc::new(PanicHandler))
}

/// Hand a verdict to the current handler.
pub(crate) fn report(passed: bool, message: &FailureMessage, location: &SourceLocation) {
    if passed {
        tracing::trace!(%location, "expectation passed");
    } else {
        tracing::debug!(%location, message = %message, "expectation failed");
    }
    current_handler().assert(passed, message, location);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn here() -> SourceLocation {
        SourceLocation::new("tests/handler.rs", 3, 9)
    }

    #[test]
    fn test_recorder_collects() {
        let recorder = AssertionRecorder::new();
        with_assertion_handler(recorder.clone(), || {
            report(true, &FailureMessage::new(), &here());
            report(false, &FailureMessage::with_string("nope"), &here());
        });
        assert_eq!(recorder.records().len(), 2);
        assert_eq!(recorder.failures(), vec!["nope".to_string()]);
        assert!(!recorder.all_passed());
        assert_eq!(
            recorder.records()[1].to_string(),
            "tests/handler.rs:3:9: failed: nope"
        );
        recorder.clear();
        assert!(recorder.all_passed());
    }

    #[test]
    fn test_scoped_handlers_nest() {
        let outer = AssertionRecorder::new();
        let inner = AssertionRecorder::new();
        let _outer = install_assertion_handler(outer.clone());
        {
            let _inner = install_assertion_handler(inner.clone());
            report(false, &FailureMessage::with_string("inner"), &here());
        }
        report(false, &FailureMessage::with_string("outer"), &here());
        assert_eq!(inner.failures(), vec!["inner".to_string()]);
        assert_eq!(outer.failures(), vec!["outer".to_string()]);
    }

    #[test]
    #[should_panic(expected = "tests/handler.rs:3:9: boom")]
    fn test_panic_handler() {
        PanicHandler.assert(false, &FailureMessage::with_string("boom"), &here());
    }

    #[test]
    fn test_panic_handler_ignores_passes() {
        PanicHandler.assert(true, &FailureMessage::new(), &here());
    }
}
