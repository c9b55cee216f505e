//! Deferred values under test.
//!
//! An expectation never holds the value it checks. It holds an
//! [`Expression`]: a closure producing the value on demand, plus an optional
//! memo cell. Matchers pull the value through [`Expression::evaluate`], which
//! lets polling expectations re-run the closure on every tick while plain
//! expectations compute it at most once.
//!
//! - [`Expression`] wraps a blocking closure
//! - [`AsyncExpression`] wraps a closure returning a future
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use testkit_expect::{Expression, SourceLocation};
//!
//! let calls = Arc::new(AtomicUsize::new(0));
//! let counter = calls.clone();
//! let expr = Expression::new(
//!     move || counter.fetch_add(1, Ordering::SeqCst) + 1,
//!     SourceLocation::caller(),
//! );
//!
//! assert_eq!(expr.evaluate().unwrap(), Some(1));
//! assert_eq!(expr.evaluate().unwrap(), Some(1));
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//!
//! let fresh = expr.without_caching();
//! assert_eq!(fresh.evaluate().unwrap(), Some(2));
//! assert_eq!(fresh.evaluate().unwrap(), Some(3));
//! ```

mod concurrent;
mod sync;

use std::fmt::Debug;

use crate::error::Thrown;

pub use concurrent::AsyncExpression;
pub use sync::Expression;

/// The result of evaluating an expression once.
///
/// `Ok(None)` means the expression produced no value.
pub type Outcome<T> = Result<Option<T>, Thrown>;

/// Bounds every value flowing through an expectation must satisfy.
///
/// Values are cloned out of memo cells, rendered with `Debug` in failure
/// messages, and may be evaluated from a polling thread.
pub trait Actual: Clone + Debug + Send + Sync + 'static {}

impl<T> Actual for T where T: Clone + Debug + Send + Sync + 'static {}
