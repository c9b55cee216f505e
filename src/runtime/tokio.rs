//! Tokio time for cooperative polling.
//!
//! [`TokioTime`] reads `tokio::time::Instant`, so under a runtime started
//! with paused time (`#[tokio::test(start_paused = true)]`) polling timeouts
//! follow tokio's virtual clock.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use ::tokio::time::Instant;

use super::TimeSource;

/// Tokio-based time source.
#[derive(Debug, Clone)]
pub struct TokioTime {
    start: Instant,
}

impl TokioTime {
    /// Create a new Tokio time source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for TokioTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for TokioTime {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(::tokio::time::sleep(duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_follows_paused_clock() {
        let time = TokioTime::new();
        time.sleep(Duration::from_secs(60)).await;
        assert!(time.now() >= Duration::from_secs(60));
    }
}
