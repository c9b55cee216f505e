//! Polling timeouts and intervals.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::time::Duration;

use parking_lot::RwLock;

/// Default time a polling expectation waits before giving up.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Default time between two evaluations of a polled expression.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

static GLOBAL: RwLock<PollingDefaults> = parking_lot::const_rwlock(PollingDefaults::new());

thread_local! {
    static SCOPED: RefCell<Vec<PollingDefaults>> = const { RefCell::new(Vec::new()) };
}

/// Timeout, poll interval and leeway for polling expectations.
///
/// Values are resolved at the call site with [`PollingDefaults::current`]:
/// a scoped override installed on the current thread wins over the
/// process-wide default.
///
/// # Example
///
/// ```rust
/// use testkit_expect::polling::PollingDefaults;
/// use std::time::Duration;
///
/// let defaults = PollingDefaults::new()
///     .with_timeout(Duration::from_millis(200))
///     .with_poll_interval(Duration::from_millis(5));
///
/// let _guard = defaults.scoped();
/// assert_eq!(PollingDefaults::current().timeout(), Duration::from_millis(200));
/// assert_eq!(PollingDefaults::current().leeway(), Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingDefaults {
    timeout: Duration,
    poll_interval: Duration,
    leeway: Option<Duration>,
}

impl Default for PollingDefaults {
    fn default() -> Self {
        Self::new()
    }
}

impl PollingDefaults {
    /// One second timeout, ten millisecond interval, leeway of half the
    /// timeout.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            leeway: None,
        }
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the grace period after the timeout before the scheduler is
    /// considered unresponsive.
    #[must_use]
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = Some(leeway);
        self
    }

    /// The timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// The leeway, half the timeout unless set explicitly.
    #[must_use]
    pub fn leeway(&self) -> Duration {
        self.leeway.unwrap_or(self.timeout / 2)
    }

    /// The process-wide default.
    #[must_use]
    pub fn global() -> Self {
        *GLOBAL.read()
    }

    /// Replace the process-wide default.
    pub fn set_global(defaults: Self) {
        *GLOBAL.write() = defaults;
    }

    /// The defaults in effect on this thread.
    #[must_use]
    pub fn current() -> Self {
        SCOPED
            .with(|scoped| scoped.borrow().last().copied())
            .unwrap_or_else(Self::global)
    }

    /// Make these defaults current on this thread until the guard drops.
    #[must_use = "the override is removed when the guard is dropped"]
    pub fn scoped(self) -> DefaultsGuard {
        SCOPED.with(|scoped| scoped.borrow_mut().push(self));
        DefaultsGuard {
            _not_send: PhantomData,
        }
    }
}

/// Removes a scoped override when dropped.
#[derive(Debug)]
pub struct DefaultsGuard {
    _not_send: PhantomData<*const ()>,
}

impl Drop for DefaultsGuard {
    fn drop(&mut self) {
        SCOPED.with(|scoped| {
            scoped.borrow_mut().pop();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = PollingDefaults::new();
        assert_eq!(defaults.timeout(), Duration::from_secs(1));
        assert_eq!(defaults.poll_interval(), Duration::from_millis(10));
        assert_eq!(defaults.leeway(), Duration::from_millis(500));
    }

    #[test]
    fn test_explicit_leeway() {
        let defaults = PollingDefaults::new().with_leeway(Duration::from_millis(3));
        assert_eq!(defaults.leeway(), Duration::from_millis(3));
    }

    #[test]
    fn test_scoped_overrides_nest() {
        let outer = PollingDefaults::new().with_timeout(Duration::from_secs(5));
        let inner = PollingDefaults::new().with_timeout(Duration::from_secs(9));

        let outer_guard = outer.scoped();
        assert_eq!(PollingDefaults::current(), outer);
        {
            let _inner_guard = inner.scoped();
            assert_eq!(PollingDefaults::current(), inner);
        }
        assert_eq!(PollingDefaults::current(), outer);
        drop(outer_guard);
        assert_eq!(PollingDefaults::current(), PollingDefaults::global());
    }

    #[test]
    fn test_scoped_override_is_per_thread() {
        let _guard = PollingDefaults::new()
            .with_timeout(Duration::from_secs(42))
            .scoped();
        let other = std::thread::spawn(PollingDefaults::current).join().unwrap();
        assert_eq!(other, PollingDefaults::global());
    }
}
