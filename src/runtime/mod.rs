//! Scheduler hosts for polling expectations.
//!
//! Polling needs two things from its host: a clock, and a way to let time
//! pass. Blocking expectations park the calling thread through a
//! [`BlockingTimeSource`]; cooperative ones await a [`TimeSource`] sleep so
//! other tasks keep running.
//!
//! # Core Traits
//!
//! - [`TimeSource`] - Abstraction over async time operations (now, sleep)
//! - [`BlockingTimeSource`] - Abstraction over blocking time operations
//!   (now, park)
//!
//! [`SystemClock`] implements both with real time and needs no async
//! runtime. [`MockClock`](crate::clock::MockClock) implements both with
//! virtual time.

#[cfg(feature = "async-std")]
pub mod async_std;
#[cfg(feature = "smol")]
pub mod smol;
#[cfg(feature = "tokio")]
pub mod tokio;

mod timer;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use self::timer::Timer;

/// A source of time for async operations.
///
/// This trait abstracts over different time implementations, allowing
/// polling to work with both real time and mock time.
///
/// # Implementations
///
/// - [`MockClock`](crate::clock::MockClock) - Mock time for testing
/// - [`SystemClock`] - Real time, runtime independent
/// - `TokioTime` - Real tokio time (with `tokio` feature)
/// - `AsyncStdTime` - Real async-std time (with `async-std` feature)
/// - `SmolTime` - Real smol time (with `smol` feature)
pub trait TimeSource: Send + Sync {
    /// Get the current time as a duration since an epoch.
    fn now(&self) -> Duration;

    /// Create a future that completes after the given duration.
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;

    /// Create a future that completes at the given instant.
    fn sleep_until(&self, deadline: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        let now = self.now();
        if deadline <= now {
            Box::pin(std::future::ready(()))
        } else {
            self.sleep(deadline - now)
        }
    }
}

/// A source of time for code that blocks the calling thread.
pub trait BlockingTimeSource: Send + Sync {
    /// Get the current time as a duration since an epoch.
    fn now(&self) -> Duration;

    /// Block the calling thread for the given duration.
    fn park(&self, duration: Duration);
}

/// Real time backed by [`std::time::Instant`].
///
/// Its [`TimeSource::sleep`] is served by one shared timer thread, so it
/// works under any executor, including `futures::executor::block_on`.
/// Dropping a sleep cancels it.
#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
    timer: Arc<Timer>,
}

impl SystemClock {
    /// Create a clock whose epoch is now.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timer(Timer::global())
    }

    fn with_timer(timer: Arc<Timer>) -> Self {
        Self {
            start: Instant::now(),
            timer,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        match Instant::now().checked_add(duration) {
            Some(deadline) => Box::pin(self.timer.sleep_until(deadline)),
            None => Box::pin(futures::future::pending()),
        }
    }
}

impl BlockingTimeSource for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn park(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// The time source cooperative polling uses when none is given.
///
/// Prefers the timer of the runtime the caller is running on.
#[must_use]
pub fn default_time_source() -> Arc<dyn TimeSource> {
    if on_tokio_runtime() {
        return tokio_time_source();
    }
    fallback_time_source()
}

#[cfg(feature = "tokio")]
fn on_tokio_runtime() -> bool {
    ::tokio::runtime::Handle::try_current().is_ok()
}

#[cfg(not(feature = "tokio"))]
fn on_tokio_runtime() -> bool {
    false
}

#[cfg(feature = "tokio")]
fn tokio_time_source() -> Arc<dyn TimeSource> {
    Arc::new(self::tokio::TokioTime::new())
}

#[cfg(not(feature = "tokio"))]
fn tokio_time_source() -> Arc<dyn TimeSource> {
    fallback_time_source()
}

#[cfg(feature = "async-std")]
fn fallback_time_source() -> Arc<dyn TimeSource> {
    Arc::new(self::async_std::AsyncStdTime::new())
}

#[cfg(all(feature = "smol", not(feature = "async-std")))]
fn fallback_time_source() -> Arc<dyn TimeSource> {
    Arc::new(self::smol::SmolTime::new())
}

#[cfg(not(any(feature = "async-std", feature = "smol")))]
fn fallback_time_source() -> Arc<dyn TimeSource> {
    Arc::new(SystemClock::new())
}

/// The time source blocking polling uses when none is given.
#[must_use]
pub fn default_blocking_time_source() -> Arc<dyn BlockingTimeSource> {
    Arc::new(SystemClock::new())
}
