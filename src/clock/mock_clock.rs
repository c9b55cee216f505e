//! `MockClock` implementation for virtual time control.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use super::sleep::{MockSleep, SleepState};
use crate::runtime::{BlockingTimeSource, TimeSource};

/// A mock clock that provides virtual time control for polling tests.
///
/// `MockClock` implements both [`TimeSource`] and [`BlockingTimeSource`], so
/// it can drive blocking and cooperative polling alike. By default time only
/// moves when the test calls [`advance`](Self::advance); a parked poller
/// waits until another thread advances the clock. An
/// [`auto_advancing`](Self::auto_advancing) clock instead jumps forward
/// whenever a poller sleeps, which makes timeouts instantaneous and
/// deterministic.
///
/// # Thread Safety
///
/// `MockClock` is thread-safe and can be cloned and shared across threads.
/// All clones share the same underlying time state.
///
/// # Example
///
/// ```rust
/// use testkit_expect::clock::MockClock;
/// use std::time::Duration;
///
/// let clock = MockClock::new();
/// assert_eq!(clock.now(), Duration::ZERO);
///
/// clock.advance(Duration::from_secs(10));
/// assert_eq!(clock.now(), Duration::from_secs(10));
///
/// let clock2 = clock.clone();
/// clock2.advance(Duration::from_secs(5));
/// assert_eq!(clock.now(), Duration::from_secs(15));
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    pub(crate) inner: Arc<ClockInner>,
}

#[derive(Debug)]
pub(crate) struct ClockInner {
    state: Mutex<ClockState>,
    /// Threads parked until the clock reaches their deadline
    parked: Condvar,
    /// Pending sleeps
    pub(crate) sleeps: Mutex<SleepState>,
}

#[derive(Debug)]
struct ClockState {
    current_time: Duration,
    auto_advance: bool,
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClock {
    /// Creates a new `MockClock` starting at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::with_start_time(Duration::ZERO)
    }

    /// Creates a new `MockClock` starting at the specified time.
    #[must_use]
    pub fn with_start_time(start: Duration) -> Self {
        Self::build(start, false)
    }

    /// Creates a clock that advances itself whenever something sleeps or
    /// parks on it.
    ///
    /// ```rust
    /// use testkit_expect::clock::MockClock;
    /// use testkit_expect::runtime::BlockingTimeSource;
    /// use std::time::Duration;
    ///
    /// let clock = MockClock::auto_advancing();
    /// clock.park(Duration::from_secs(30));
    /// assert_eq!(clock.now(), Duration::from_secs(30));
    /// ```
    #[must_use]
    pub fn auto_advancing() -> Self {
        Self::build(Duration::ZERO, true)
    }

    fn build(start: Duration, auto_advance: bool) -> Self {
        Self {
            inner: Arc::new(ClockInner {
                state: Mutex::new(ClockState {
                    current_time: start,
                    auto_advance,
                }),
                parked: Condvar::new(),
                sleeps: Mutex::new(SleepState::default()),
            }),
        }
    }

    /// Returns the current virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.inner.state.lock().current_time
    }

    /// Whether sleeping on the clock advances it.
    #[must_use]
    pub fn is_auto_advancing(&self) -> bool {
        self.inner.state.lock().auto_advance
    }

    /// Turn auto-advance on or off.
    pub fn set_auto_advance(&self, enabled: bool) {
        self.inner.state.lock().auto_advance = enabled;
    }

    /// Advances the clock by the specified duration, waking every sleep and
    /// parked thread whose deadline has been reached.
    pub fn advance(&self, duration: Duration) {
        let now = {
            let mut state = self.inner.state.lock();
            state.current_time += duration;
            state.current_time
        };
        self.notify(now);
    }

    /// Advances the clock to a specific time.
    ///
    /// This method only moves time forward - if the specified time
    /// is less than or equal to the current time, this is a no-op.
    pub fn advance_to(&self, time: Duration) {
        let now = {
            let mut state = self.inner.state.lock();
            if time <= state.current_time {
                return;
            }
            state.current_time = time;
            time
        };
        self.notify(now);
    }

    /// Sets the clock to an absolute time, possibly moving it backwards.
    pub fn set(&self, time: Duration) {
        self.inner.state.lock().current_time = time;
        self.notify(time);
    }

    fn notify(&self, now: Duration) {
        self.inner.sleeps.lock().wake_expired(now);
        self.inner.parked.notify_all();
    }

    /// Creates a future that completes once the clock has advanced by
    /// `duration`.
    #[must_use]
    pub fn sleep(&self, duration: Duration) -> MockSleep {
        MockSleep::new(self.clone(), duration)
    }

    /// Number of sleeps waiting on the clock.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.sleeps.lock().pending_count()
    }
}

impl TimeSource for MockClock {
    fn now(&self) -> Duration {
        MockClock::now(self)
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        if self.is_auto_advancing() {
            self.advance(duration);
            return Box::pin(std::future::ready(()));
        }
        Box::pin(MockClock::sleep(self, duration))
    }
}

impl BlockingTimeSource for MockClock {
    fn now(&self) -> Duration {
        MockClock::now(self)
    }

    fn park(&self, duration: Duration) {
        let mut state = self.inner.state.lock();
        let deadline = state.current_time + duration;
        if state.auto_advance {
            drop(state);
            self.advance_to(deadline);
            return;
        }
        while state.current_time < deadline {
            self.inner.parked.wait(&mut state);
        }
    }
}
