//! # testkit-expect
//!
//! > Expectations, matchers and polling assertions for Rust tests
//!
//! **testkit-expect** wraps the value under test in a lazy, memoized
//! expression, judges it with composable matchers, and can re-evaluate it on
//! a schedule until it settles.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use testkit_expect::prelude::*;
//!
//! expect(|| 1 + 1).to(equal(2));
//! expect(|| vec![1, 2, 3]).to(contain(2)).to_not(be_empty());
//!
//! // Polling: the closure runs again on every tick.
//! let jobs = Arc::new(AtomicUsize::new(0));
//! let worker = jobs.clone();
//! std::thread::spawn(move || {
//!     for _ in 0..3 {
//!         worker.fetch_add(1, Ordering::SeqCst);
//!     }
//! });
//! let done = jobs.clone();
//! expect(move || done.load(Ordering::SeqCst)).to_eventually(equal(3));
//! ```
//!
//! ## Features
//!
//! - **Expressions** - lazy, memoized, thread-safe deferred values
//! - **Matchers** - three-valued results with composable messages
//! - **Polling** - `to_eventually`, `to_never`, `to_always`, blocking or async
//! - **Requirements** - hard assertions that hand back the checked value
//! - **Mock Clock** - run polls in virtual time

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Mock clock for time control in tests
pub mod clock;

pub mod adapter;
pub mod error;
pub mod expectation;
pub mod expression;
pub mod matcher;
pub mod message;
pub mod polling;
pub mod requirement;
pub mod runtime;
pub mod trap;

mod dsl;
mod location;

/// Prelude for convenient imports
///
/// ```rust
/// use testkit_expect::prelude::*;
/// ```
pub mod prelude {
    pub use crate::dsl::*;
    pub use crate::error::{Error, Result};
    pub use crate::expectation::{AsyncExpectation, ExpectationStatus, SyncExpectation};
    pub use crate::expression::{AsyncExpression, Expression};
    pub use crate::location::SourceLocation;
    pub use crate::matcher::*;
    pub use crate::message::{FailureMessage, Message};
    pub use crate::polling::{Done, MatchStyle, Poller, PollingDefaults};
    pub use crate::requirement::{AsyncRequirement, SyncRequirement};
    pub use crate::{expect, require};
}

// Re-exports
pub use dsl::{
    expect, expect_async, expect_async_result, expect_option, expect_result, expect_value, fail,
    poll_unwrap, require, require_async, require_option, require_result, require_value,
    try_wait_until, unwrap, wait_until, wait_until_async,
};
pub use error::{Error, Result};
pub use expression::{AsyncExpression, Expression};
pub use location::SourceLocation;
pub use message::{FailureMessage, Message};

// Re-export the test macro when macros feature is enabled
#[cfg(feature = "macros")]
pub use testkit_expect_macros::test;
