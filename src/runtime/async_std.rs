//! async-std time for cooperative polling.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use super::TimeSource;

/// async-std-based time source.
#[derive(Debug, Clone)]
pub struct AsyncStdTime {
    start: Instant,
}

impl AsyncStdTime {
    /// Create a new async-std time source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for AsyncStdTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for AsyncStdTime {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(::async_std::task::sleep(duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep() {
        let time = AsyncStdTime::new();
        ::async_std::task::block_on(time.sleep(Duration::from_millis(5)));
        assert!(time.now() >= Duration::from_millis(5));
    }
}
