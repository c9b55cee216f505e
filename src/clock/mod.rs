//! Virtual time control for polling tests
//!
//! The `clock` module provides [`MockClock`](crate::clock::MockClock), a
//! virtual clock that can stand in for real time wherever polling asks for a
//! [`TimeSource`](crate::runtime::TimeSource) or a
//! [`BlockingTimeSource`](crate::runtime::BlockingTimeSource).
//!
//! # Example
//!
//! ```rust
//! use testkit_expect::clock::MockClock;
//! use std::time::Duration;
//!
//! let clock = MockClock::new();
//! assert_eq!(clock.now(), Duration::ZERO);
//!
//! clock.advance(Duration::from_secs(10));
//! assert_eq!(clock.now(), Duration::from_secs(10));
//! ```

mod mock_clock;
mod sleep;

pub use mock_clock::MockClock;
pub use sleep::MockSleep;
