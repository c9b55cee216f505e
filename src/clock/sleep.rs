//! Mock sleep future.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use super::MockClock;

type SleepKey = (Duration, u64);

/// Sleeps waiting on a [`MockClock`], ordered by deadline.
#[derive(Debug, Default)]
pub(crate) struct SleepState {
    pending: BTreeMap<SleepKey, Option<Waker>>,
    next_id: u64,
}

impl SleepState {
    fn register(&mut self, deadline: Duration) -> SleepKey {
        let key = (deadline, self.next_id);
        self.next_id += 1;
        self.pending.insert(key, None);
        key
    }

    fn update_waker(&mut self, key: SleepKey, waker: &Waker) {
        if let Some(slot) = self.pending.get_mut(&key) {
            match slot {
                Some(existing) if existing.will_wake(waker) => {}
                _ => *slot = Some(waker.clone()),
            }
        }
    }

    fn remove(&mut self, key: SleepKey) {
        self.pending.remove(&key);
    }

    /// Wake every sleep whose deadline is at or before `now`.
    pub(crate) fn wake_expired(&mut self, now: Duration) {
        let later = self.pending.split_off(&(now, u64::MAX));
        let expired = std::mem::replace(&mut self.pending, later);
        for waker in expired.into_values().flatten() {
            waker.wake();
        }
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// A future that completes once the mock clock reaches its deadline.
///
/// Created by [`MockClock::sleep`]. The sleep only completes when the clock
/// is advanced; real time has no effect.
///
/// # Example
///
/// ```rust
/// use testkit_expect::clock::MockClock;
/// use std::time::Duration;
///
/// let clock = MockClock::new();
/// let sleep = clock.sleep(Duration::from_secs(5));
/// assert!(!sleep.is_elapsed());
///
/// clock.advance(Duration::from_secs(5));
/// assert!(sleep.is_elapsed());
/// ```
#[derive(Debug)]
pub struct MockSleep {
    clock: MockClock,
    deadline: Duration,
    key: Option<SleepKey>,
}

impl MockSleep {
    pub(crate) fn new(clock: MockClock, duration: Duration) -> Self {
        let deadline = clock.now() + duration;
        Self {
            clock,
            deadline,
            key: None,
        }
    }

    /// Virtual time at which the sleep completes.
    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Virtual time left until the deadline.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_sub(self.clock.now())
    }

    /// Whether the deadline has been reached.
    #[must_use]
    pub fn is_elapsed(&self) -> bool {
        self.clock.now() >= self.deadline
    }
}

impl Future for MockSleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        if this.is_elapsed() {
            if let Some(key) = this.key.take() {
                this.clock.inner.sleeps.lock().remove(key);
            }
            return Poll::Ready(());
        }

        let mut sleeps = this.clock.inner.sleeps.lock();
        let key = *this.key.get_or_insert_with(|| sleeps.register(this.deadline));
        sleeps.update_waker(key, cx.waker());
        drop(sleeps);

        // The clock may have moved between the check and the registration.
        if this.is_elapsed() {
            cx.waker().wake_by_ref();
        }
        Poll::Pending
    }
}

impl Drop for MockSleep {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.clock.inner.sleeps.lock().remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[test]
    fn test_sleep_completes_after_advance() {
        let clock = MockClock::new();
        let mut sleep = clock.sleep(Duration::from_secs(1));

        assert!((&mut sleep).now_or_never().is_none());
        assert_eq!(clock.pending_count(), 1);

        clock.advance(Duration::from_secs(1));
        assert!((&mut sleep).now_or_never().is_some());
        assert_eq!(clock.pending_count(), 0);
    }

    #[test]
    fn test_dropped_sleep_unregisters() {
        let clock = MockClock::new();
        let mut sleep = clock.sleep(Duration::from_secs(1));
        assert!((&mut sleep).now_or_never().is_none());
        drop(sleep);
        assert_eq!(clock.pending_count(), 0);
    }

    #[test]
    fn test_wake_expired_only_wakes_due_sleeps() {
        let mut state = SleepState::default();
        state.register(Duration::from_secs(1));
        state.register(Duration::from_secs(2));
        state.register(Duration::from_secs(3));

        state.wake_expired(Duration::from_secs(2));
        assert_eq!(state.pending_count(), 1);
    }

    #[test]
    fn test_remaining() {
        let clock = MockClock::new();
        let sleep = clock.sleep(Duration::from_secs(10));
        clock.advance(Duration::from_secs(4));
        assert_eq!(sleep.remaining(), Duration::from_secs(6));
        clock.advance(Duration::from_secs(10));
        assert_eq!(sleep.remaining(), Duration::ZERO);
    }
}
