//! Waiting for a completion callback.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::channel::oneshot;
use futures::FutureExt;
use parking_lot::Mutex;

use super::cooperative::{Raced, WithDeadline};
use super::{MatchStyle, PollOutcome, PollStatus, Poller};
use crate::error::Thrown;
use crate::expectation::report;
use crate::location::SourceLocation;
use crate::message::FailureMessage;
use crate::trap::panic_message;

/// The completion handle passed to a `wait_until` action.
///
/// Clones share state, so the handle can be moved to another thread or task.
/// It must be called exactly once; a second call is reported as a failure
/// at the `wait_until` call site.
#[derive(Debug, Clone)]
pub struct Done {
    inner: Arc<DoneInner>,
}

#[derive(Debug)]
struct DoneInner {
    sender: Mutex<Option<oneshot::Sender<()>>>,
    calls: AtomicUsize,
    location: SourceLocation,
}

impl Done {
    fn new(location: SourceLocation) -> (Self, oneshot::Receiver<()>) {
        let (sender, receiver) = oneshot::channel();
        let done = Self {
            inner: Arc::new(DoneInner {
                sender: Mutex::new(Some(sender)),
                calls: AtomicUsize::new(0),
                location,
            }),
        };
        (done, receiver)
    }

    /// Signal completion.
    pub fn call(&self) {
        let calls = self.inner.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if calls > 1 {
            tracing::warn!(location = %self.inner.location, calls, "wait_until completion called again");
            report(
                false,
                &FailureMessage::with_string(
                    "wait_until(..) expects its completion closure to be only called once",
                ),
                &self.inner.location,
            );
            return;
        }
        if let Some(sender) = self.inner.sender.lock().take() {
            let _ = sender.send(());
        }
    }

    /// Whether the handle has been called.
    #[must_use]
    pub fn is_called(&self) -> bool {
        self.inner.calls.load(Ordering::SeqCst) > 0
    }
}

impl Poller {
    /// Run `action` and block until it calls [`Done::call`] or the timeout
    /// passes. Failures are reported to the current assertion handler.
    ///
    /// Returns whether the wait succeeded.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use testkit_expect::prelude::*;
    ///
    /// Poller::current()
    ///     .within(Duration::from_secs(1), Duration::from_millis(5))
    ///     .wait_until(|done| {
    ///         std::thread::spawn(move || done.call());
    ///     });
    /// ```
    #[track_caller]
    pub fn wait_until<F>(&self, action: F) -> bool
    where
        F: FnOnce(Done),
    {
        self.try_wait_until(|done| {
            action(done);
            Ok::<(), Thrown>(())
        })
    }

    /// Like [`wait_until`](Self::wait_until), with an action that may fail.
    #[track_caller]
    pub fn try_wait_until<F, E>(&self, action: F) -> bool
    where
        F: FnOnce(Done) -> Result<(), E>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let location = SourceLocation::caller();
        let (done, mut receiver) = Done::new(location);
        let mut action = Some(action);

        let outcome = self.poll_blocking("wait_until(..)", location, MatchStyle::Eventually, || {
            if let Some(action) = action.take() {
                action(done.clone()).map_err(Thrown::new)?;
            }
            Ok(match receiver.try_recv() {
                Ok(Some(())) => PollStatus::Finished(true),
                _ => PollStatus::Incomplete,
            })
        });
        self.finish_wait(outcome, location)
    }

    /// Run `action` and await until it calls [`Done::call`] or the timeout
    /// passes. A still-running action is dropped at the deadline.
    #[track_caller]
    pub fn wait_until_async<F, Fut>(&self, action: F) -> impl Future<Output = bool>
    where
        F: FnOnce(Done) -> Fut,
        Fut: Future<Output = ()>,
    {
        let location = SourceLocation::caller();
        let (done, receiver) = Done::new(location);
        let started = action(done);
        let poller = self.clone();
        async move {
            let this = &poller;
            let time = this.time_source();
            let time = &*time;
            let timeout = this.defaults.timeout();
            let start = time.now();
            let waiting = async move {
                started.await;
                let _ = receiver.await;
                Ok::<(), Thrown>(())
            };
            let outcome = match WithDeadline::new(
                AssertUnwindSafe(waiting).catch_unwind(),
                time,
                start + timeout,
            )
            .await
            {
                Raced::Finished(Ok(Ok(()))) => PollOutcome::Completed(true),
                Raced::Finished(Ok(Err(error))) => PollOutcome::ErrorThrown(error),
                Raced::Finished(Err(payload)) => PollOutcome::ExceptionRaised(panic_message(&*payload)),
                Raced::Expired => this.expiry(time.now().saturating_sub(start), location, 1),
            };
            this.finish_wait(outcome, location)
        }
    }

    fn finish_wait(&self, outcome: PollOutcome, location: SourceLocation) -> bool {
        let timeout = self.defaults.timeout();
        let failure = match outcome {
            PollOutcome::Completed(_) => None,
            PollOutcome::TimedOut => Some(format!("Waited more than {timeout:?}")),
            PollOutcome::BlockedScheduler => Some(format!(
                "Waited more than {timeout:?}, and the scheduler was unresponsive for {:?} beyond it",
                self.defaults.leeway()
            )),
            PollOutcome::ErrorThrown(error) => Some(format!("Unexpected error thrown: <{error}>")),
            PollOutcome::ExceptionRaised(panic) => Some(format!("Unexpected exception raised: {panic}")),
        };
        match failure {
            None => {
                report(true, &FailureMessage::new(), &location);
                true
            }
            Some(text) => {
                report(false, &FailureMessage::with_string(text), &location);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::expectation::{with_assertion_handler, AssertionRecorder};
    use crate::polling::PollingDefaults;
    use futures::executor::block_on;

    fn poller(clock: MockClock) -> Poller {
        Poller::new(PollingDefaults::new().with_timeout(Duration::from_millis(100))).with_clock(clock)
    }

    #[test]
    fn test_wait_until_done_immediately() {
        let recorder = AssertionRecorder::new();
        let passed = with_assertion_handler(recorder.clone(), || {
            poller(MockClock::auto_advancing()).wait_until(|done| done.call())
        });
        assert!(passed);
        assert!(recorder.all_passed());
    }

    #[test]
    fn test_wait_until_times_out() {
        let recorder = AssertionRecorder::new();
        let passed = with_assertion_handler(recorder.clone(), || {
            poller(MockClock::auto_advancing()).wait_until(|_done| {})
        });
        assert!(!passed);
        assert_eq!(recorder.failures(), vec!["Waited more than 100ms".to_string()]);
    }

    #[test]
    fn test_wait_until_from_another_thread() {
        let recorder = AssertionRecorder::new();
        let passed = with_assertion_handler(recorder.clone(), || {
            Poller::new(PollingDefaults::new().with_timeout(Duration::from_secs(5))).wait_until(|done| {
                std::thread::spawn(move || {
                    std::thread::sleep(Duration::from_millis(5));
                    done.call();
                });
            })
        });
        assert!(passed);
    }

    #[test]
    fn test_wait_until_error_and_panic() {
        let recorder = AssertionRecorder::new();
        with_assertion_handler(recorder.clone(), || {
            poller(MockClock::auto_advancing()).try_wait_until(|_done| Err(Thrown::msg("refused")));
            poller(MockClock::auto_advancing()).wait_until(|_done| panic!("action blew up"));
        });
        assert_eq!(
            recorder.failures(),
            vec![
                "Unexpected error thrown: <refused>".to_string(),
                "Unexpected exception raised: action blew up".to_string(),
            ]
        );
    }

    #[test]
    fn test_done_called_twice_is_reported() {
        let recorder = AssertionRecorder::new();
        with_assertion_handler(recorder.clone(), || {
            poller(MockClock::auto_advancing()).wait_until(|done| {
                done.call();
                done.call();
            });
        });
        assert_eq!(
            recorder.failures(),
            vec!["wait_until(..) expects its completion closure to be only called once".to_string()]
        );
    }

    #[test]
    fn test_wait_until_async() {
        let recorder = AssertionRecorder::new();
        let passed = with_assertion_handler(recorder.clone(), || {
            block_on(poller(MockClock::auto_advancing()).wait_until_async(|done| async move {
                done.call();
            }))
        });
        assert!(passed);

        let passed = with_assertion_handler(recorder.clone(), || {
            block_on(
                poller(MockClock::auto_advancing())
                    .wait_until_async(|_done| futures::future::pending::<()>()),
            )
        });
        assert!(!passed);
        assert_eq!(recorder.failures(), vec!["Waited more than 100ms".to_string()]);
    }
}
