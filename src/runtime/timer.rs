//! Real-time sleeps for [`SystemClock`](super::SystemClock).
//!
//! Every sleep registers its deadline with one timer thread, which parks on
//! a condition variable until the earliest deadline and wakes the sleeps that
//! are due. Dropping a sleep removes its deadline, so an abandoned timer
//! costs nothing once its future is gone.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll, Waker};
use std::thread;
use std::time::Instant;

use parking_lot::{Condvar, Mutex, MutexGuard};

type TimerKey = (Instant, u64);

#[derive(Debug, Default)]
struct TimerState {
    pending: BTreeMap<TimerKey, Option<Waker>>,
    next_id: u64,
    shutdown: bool,
}

impl TimerState {
    fn register(&mut self, deadline: Instant) -> TimerKey {
        let key = (deadline, self.next_id);
        self.next_id += 1;
        self.pending.insert(key, None);
        key
    }

    fn update_waker(&mut self, key: TimerKey, waker: &Waker) {
        if let Some(slot) = self.pending.get_mut(&key) {
            match slot {
                Some(existing) if existing.will_wake(waker) => {}
                _ => *slot = Some(waker.clone()),
            }
        }
    }

    fn remove(&mut self, key: TimerKey) {
        self.pending.remove(&key);
    }

    fn take_expired(&mut self, now: Instant) -> Vec<Waker> {
        let later = self.pending.split_off(&(now, u64::MAX));
        let expired = std::mem::replace(&mut self.pending, later);
        expired.into_values().flatten().collect()
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<TimerState>,
    changed: Condvar,
}

impl Shared {
    fn run(&self) {
        let mut state = self.state.lock();
        while !state.shutdown {
            let expired = state.take_expired(Instant::now());
            if !expired.is_empty() {
                MutexGuard::unlocked(&mut state, || expired.into_iter().for_each(Waker::wake));
                continue;
            }
            match state.next_deadline() {
                Some(deadline) => {
                    self.changed.wait_until(&mut state, deadline);
                }
                None => self.changed.wait(&mut state),
            }
        }
    }
}

/// A timer thread and the deadlines it serves.
///
/// The thread stops when the `Timer` is dropped.
#[derive(Debug)]
pub(crate) struct Timer {
    shared: Arc<Shared>,
}

impl Timer {
    /// Start a timer thread.
    ///
    /// # Panics
    ///
    /// Panics if the operating system refuses to start a thread.
    pub(crate) fn start() -> Self {
        let shared = Arc::new(Shared::default());
        let worker = Arc::clone(&shared);
        thread::Builder::new()
            .name("testkit-expect-timer".into())
            .spawn(move || worker.run())
            .unwrap_or_else(|error| panic!("failed to start the testkit-expect timer thread: {error}"));
        Self { shared }
    }

    /// The process-wide timer.
    pub(crate) fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<Timer>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::start())))
    }

    /// A future that completes at `deadline`.
    pub(crate) fn sleep_until(&self, deadline: Instant) -> TimerSleep {
        TimerSleep {
            shared: Arc::clone(&self.shared),
            deadline,
            key: None,
        }
    }

    /// Number of sleeps waiting on this timer.
    #[cfg(test)]
    pub(crate) fn pending_count(&self) -> usize {
        self.shared.state.lock().pending.len()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.changed.notify_one();
    }
}

/// A sleep served by a [`Timer`].
#[derive(Debug)]
pub(crate) struct TimerSleep {
    shared: Arc<Shared>,
    deadline: Instant,
    key: Option<TimerKey>,
}

impl Future for TimerSleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        if Instant::now() >= this.deadline {
            if let Some(key) = this.key.take() {
                this.shared.state.lock().remove(key);
            }
            return Poll::Ready(());
        }

        let mut state = this.shared.state.lock();
        let registered = this.key.is_some();
        let key = *this.key.get_or_insert_with(|| state.register(this.deadline));
        state.update_waker(key, cx.waker());
        drop(state);

        if !registered {
            this.shared.changed.notify_one();
        }
        Poll::Pending
    }
}

impl Drop for TimerSleep {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.shared.state.lock().remove(key);
        }
    }
}
