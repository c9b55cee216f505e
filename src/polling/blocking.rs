//! The thread-parking poll loop.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};

use super::{MatchStyle, PollOutcome, PollStatus, Poller};
use crate::error::Thrown;
use crate::location::SourceLocation;
use crate::trap::panic_message;

thread_local! {
    static WAITER: RefCell<Option<Waiter>> = const { RefCell::new(None) };
}

#[derive(Debug, Clone)]
struct Waiter {
    name: String,
    location: SourceLocation,
}

impl fmt::Display for Waiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.name, self.location)
    }
}

/// Marks the current thread as polling. Released on drop.
#[derive(Debug)]
pub(crate) struct WaitLockGuard {
    _not_send: PhantomData<*const ()>,
}

impl Drop for WaitLockGuard {
    fn drop(&mut self) {
        WAITER.with(|waiter| waiter.borrow_mut().take());
    }
}

/// Claim the current thread for a blocking poll.
///
/// # Panics
///
/// Panics if a poll is already running on this thread. The message names
/// both call sites.
fn acquire_wait_lock(fn_name: &str, location: SourceLocation) -> WaitLockGuard {
    let incoming = Waiter {
        name: fn_name.to_string(),
        location,
    };
    let current = WAITER.with(|waiter| {
        let mut waiter = waiter.borrow_mut();
        match &*waiter {
            Some(current) => Some(current.clone()),
            None => {
                *waiter = Some(incoming.clone());
                None
            }
        }
    });
    if let Some(current) = current {
        panic!(
            "invalid testkit-expect API usage: nested polling expectations are not allowed \
             to avoid creating flaky tests.\n\n\
             The call to\n\t{incoming}\n\
             triggered this panic because\n\t{current}\n\
             is currently polling on this thread."
        );
    }
    WaitLockGuard {
        _not_send: PhantomData,
    }
}

impl Poller {
    /// Run `tick` until it decides the poll or the timeout passes, parking
    /// the calling thread between ticks.
    ///
    /// A tick that panics ends the poll with
    /// [`PollOutcome::ExceptionRaised`]. Ticks are never interrupted, so a
    /// tick that overruns the deadline by more than the leeway reports
    /// [`PollOutcome::BlockedScheduler`].
    ///
    /// # Panics
    ///
    /// Panics if another blocking poll is already running on this thread.
    pub fn poll_blocking<F>(
        &self,
        fn_name: &str,
        location: SourceLocation,
        style: MatchStyle,
        mut tick: F,
    ) -> PollOutcome
    where
        F: FnMut() -> Result<PollStatus, Thrown>,
    {
        let _lock = acquire_wait_lock(fn_name, location);
        let clock = &self.blocking;
        let timeout = self.defaults.timeout();
        let interval = self.defaults.poll_interval();
        let start = clock.now();
        tracing::debug!(%location, %style, ?timeout, ?interval, "blocking poll started");

        let mut ticks = 0usize;
        loop {
            ticks += 1;
            match catch_unwind(AssertUnwindSafe(&mut tick)) {
                Ok(Ok(PollStatus::Finished(verdict))) => {
                    tracing::debug!(%location, ticks, verdict, "blocking poll finished");
                    return PollOutcome::Completed(verdict);
                }
                Ok(Ok(PollStatus::Incomplete)) => {}
                Ok(Err(error)) => {
                    tracing::debug!(%location, ticks, %error, "poll tick returned an error");
                    return PollOutcome::ErrorThrown(error);
                }
                Err(payload) => {
                    let message = panic_message(&*payload);
                    tracing::debug!(%location, ticks, %message, "poll tick panicked");
                    return PollOutcome::ExceptionRaised(message);
                }
            }

            let elapsed = clock.now().saturating_sub(start);
            if elapsed >= timeout {
                return self.expiry(elapsed, location, ticks);
            }
            clock.park(interval.min(timeout - elapsed));

            let elapsed = clock.now().saturating_sub(start);
            if elapsed >= timeout {
                return self.expiry(elapsed, location, ticks);
            }
        }
    }
}
