//! smol time for cooperative polling.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use super::TimeSource;

/// smol-based time source.
#[derive(Debug, Clone)]
pub struct SmolTime {
    start: Instant,
}

impl SmolTime {
    /// Create a new smol time source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SmolTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SmolTime {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            ::smol::Timer::after(duration).await;
        })
    }
}
