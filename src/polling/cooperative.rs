//! The awaiting poll loop.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::FutureExt;
use pin_project_lite::pin_project;

use super::{MatchStyle, PollOutcome, PollStatus, Poller};
use crate::error::Thrown;
use crate::location::SourceLocation;
use crate::runtime::TimeSource;
use crate::trap::panic_message;

pin_project! {
    /// Races a task against a deadline.
    ///
    /// The timer is only armed once the task has returned `Pending`, so an
    /// auto-advancing clock is not pushed to the deadline by a task that
    /// completes immediately.
    pub(super) struct WithDeadline<'a, F> {
        #[pin]
        task: F,
        timer: Option<Pin<Box<dyn Future<Output = ()> + Send + 'a>>>,
        time: &'a dyn TimeSource,
        deadline: Duration,
    }
}

pub(super) enum Raced<T> {
    Finished(T),
    Expired,
}

impl<'a, F> WithDeadline<'a, F> {
    pub(super) fn new(task: F, time: &'a dyn TimeSource, deadline: Duration) -> Self {
        Self {
            task,
            timer: None,
            time,
            deadline,
        }
    }
}

impl<F: Future> Future for WithDeadline<'_, F> {
    type Output = Raced<F::Output>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        if let Poll::Ready(output) = this.task.poll(cx) {
            return Poll::Ready(Raced::Finished(output));
        }
        let time = *this.time;
        let deadline = *this.deadline;
        let timer = this.timer.get_or_insert_with(|| time.sleep_until(deadline));
        match timer.as_mut().poll(cx) {
            Poll::Ready(()) => Poll::Ready(Raced::Expired),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Poller {
    /// Run `tick` until it decides the poll or the timeout passes, awaiting
    /// a sleep between ticks.
    ///
    /// A tick still running at the deadline is dropped. If the deadline is
    /// observed later than `timeout + leeway` the outcome is
    /// [`PollOutcome::BlockedScheduler`].
    pub async fn poll<F, Fut>(
        &self,
        fn_name: &str,
        location: SourceLocation,
        style: MatchStyle,
        mut tick: F,
    ) -> PollOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<PollStatus, Thrown>>,
    {
        let time = self.time_source();
        let time = &*time;
        let timeout = self.defaults.timeout();
        let interval = self.defaults.poll_interval();
        let start = time.now();
        let deadline = start + timeout;
        tracing::debug!(%location, %style, fn_name, ?timeout, ?interval, "cooperative poll started");

        let mut ticks = 0usize;
        loop {
            ticks += 1;
            let attempt = AssertUnwindSafe(tick()).catch_unwind();
            match WithDeadline::new(attempt, time, deadline).await {
                Raced::Finished(Ok(Ok(PollStatus::Finished(verdict)))) => {
                    tracing::debug!(%location, ticks, verdict, "cooperative poll finished");
                    return PollOutcome::Completed(verdict);
                }
                Raced::Finished(Ok(Ok(PollStatus::Incomplete))) => {}
                Raced::Finished(Ok(Err(error))) => {
                    tracing::debug!(%location, ticks, %error, "poll tick returned an error");
                    return PollOutcome::ErrorThrown(error);
                }
                Raced::Finished(Err(payload)) => {
                    let message = panic_message(&*payload);
                    tracing::debug!(%location, ticks, %message, "poll tick panicked");
                    return PollOutcome::ExceptionRaised(message);
                }
                Raced::Expired => {
                    tracing::trace!(%location, ticks, "in-flight tick abandoned at the deadline");
                    return self.expiry(time.now().saturating_sub(start), location, ticks);
                }
            }

            let elapsed = time.now().saturating_sub(start);
            if elapsed >= timeout {
                return self.expiry(elapsed, location, ticks);
            }
            time.sleep(interval.min(timeout - elapsed)).await;

            let elapsed = time.now().saturating_sub(start);
            if elapsed >= timeout {
                return self.expiry(elapsed, location, ticks);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::polling::PollingDefaults;
    use futures::executor::block_on;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn here() -> SourceLocation {
        SourceLocation::new(file!(), line!(), 1)
    }

    async fn explode() -> Result<PollStatus, Thrown> {
        panic!("tick exploded")
    }

    fn poller(clock: MockClock) -> Poller {
        Poller::new(
            PollingDefaults::new()
                .with_timeout(Duration::from_millis(100))
                .with_poll_interval(Duration::from_millis(10)),
        )
        .with_clock(clock)
    }

    #[test]
    fn test_finishes_on_decisive_tick() {
        let calls = AtomicUsize::new(0);
        let outcome = block_on(poller(MockClock::auto_advancing()).poll(
            "test",
            here(),
            MatchStyle::Eventually,
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    Ok(if n == 4 {
                        PollStatus::Finished(true)
                    } else {
                        PollStatus::Incomplete
                    })
                }
            },
        ));
        assert!(matches!(outcome, PollOutcome::Completed(true)));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_times_out_with_auto_advancing_clock() {
        let clock = MockClock::auto_advancing();
        let outcome = block_on(poller(clock.clone()).poll("test", here(), MatchStyle::Always, || async {
            Ok(PollStatus::Incomplete)
        }));
        assert!(matches!(outcome, PollOutcome::TimedOut));
        assert_eq!(clock.now(), Duration::from_millis(100));
    }

    #[test]
    fn test_pending_tick_is_abandoned_at_deadline() {
        let clock = MockClock::auto_advancing();
        let outcome = block_on(poller(clock).poll("test", here(), MatchStyle::Eventually, || {
            futures::future::pending::<Result<PollStatus, Thrown>>()
        }));
        assert!(matches!(outcome, PollOutcome::TimedOut));
    }

    #[test]
    fn test_panicking_tick() {
        let outcome = block_on(poller(MockClock::auto_advancing()).poll(
            "test",
            here(),
            MatchStyle::Eventually,
            explode,
        ));
        assert!(matches!(outcome, PollOutcome::ExceptionRaised(m) if m == "tick exploded"));
    }

    #[test]
    fn test_slow_tick_reports_blocked_scheduler() {
        let clock = MockClock::new();
        let shared = clock.clone();
        let outcome = block_on(poller(clock).poll("test", here(), MatchStyle::Eventually, || {
            shared.advance(Duration::from_secs(5));
            async { Ok(PollStatus::Incomplete) }
        }));
        assert!(matches!(outcome, PollOutcome::BlockedScheduler));
    }

    #[::tokio::test]
    async fn test_manual_clock_driven_from_another_task() {
        let clock = MockClock::new();
        let driver = clock.clone();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();

        let drive = ::tokio::spawn(async move {
            for _ in 0..20 {
                ::tokio::task::yield_now().await;
                driver.advance(Duration::from_millis(10));
            }
        });
        let outcome = poller(clock)
            .within(Duration::from_secs(10), Duration::from_millis(10))
            .poll("test", here(), MatchStyle::Eventually, || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    Ok(if n >= 3 {
                        PollStatus::Finished(true)
                    } else {
                        PollStatus::Incomplete
                    })
                }
            })
            .await;
        drive.await.unwrap();
        assert!(matches!(outcome, PollOutcome::Completed(true)));
        assert!(seen.load(Ordering::SeqCst) >= 3);
    }
}
