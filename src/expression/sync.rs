//! Blocking deferred values.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Actual, AsyncExpression, Outcome};
use crate::error::Thrown;
use crate::location::SourceLocation;

type Thunk<T> = Arc<dyn Fn() -> Outcome<T> + Send + Sync>;
type Memo<T> = Arc<Mutex<Option<Outcome<T>>>>;

/// A memoizable, possibly failing computation of an optional value.
///
/// Clones share the memo cell, so a value computed through one clone is seen
/// by every other clone. [`without_caching`](Self::without_caching) and
/// [`with_caching`](Self::with_caching) produce expressions with independent
/// cache state.
pub struct Expression<T> {
    thunk: Thunk<T>,
    memo: Option<Memo<T>>,
    location: SourceLocation,
    is_closure: bool,
}

impl<T> Clone for Expression<T> {
    fn clone(&self) -> Self {
        Self {
            thunk: Arc::clone(&self.thunk),
            memo: self.memo.clone(),
            location: self.location,
            is_closure: self.is_closure,
        }
    }
}

impl<T> fmt::Debug for Expression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("location", &self.location)
            .field("is_closure", &self.is_closure)
            .field("cached", &self.memo.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: Actual> Expression<T> {
    /// Wrap a closure that always produces a value.
    pub fn new<F>(f: F, location: SourceLocation) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::from_fn(move || Ok(Some(f())), location)
    }

    /// Wrap a closure that may produce no value.
    pub fn optional<F>(f: F, location: SourceLocation) -> Self
    where
        F: Fn() -> Option<T> + Send + Sync + 'static,
    {
        Self::from_fn(move || Ok(f()), location)
    }

    /// Wrap a closure that may fail.
    pub fn fallible<F, E>(f: F, location: SourceLocation) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::from_fn(move || f().map(Some).map_err(Thrown::new), location)
    }

    /// Wrap a closure returning a raw [`Outcome`].
    pub fn from_fn<F>(f: F, location: SourceLocation) -> Self
    where
        F: Fn() -> Outcome<T> + Send + Sync + 'static,
    {
        Self {
            thunk: Arc::new(f),
            memo: Some(Arc::new(Mutex::new(None))),
            location,
            is_closure: true,
        }
    }

    /// Wrap an already computed value.
    ///
    /// The resulting expression is not a closure: polling expectations
    /// refuse it because re-evaluating could never observe a change.
    pub fn from_value(value: T, location: SourceLocation) -> Self {
        Self::from_outcome(Ok(Some(value)), location)
    }

    pub(crate) fn from_outcome(outcome: Outcome<T>, location: SourceLocation) -> Self {
        Self {
            thunk: Arc::new(move || outcome.clone()),
            memo: Some(Arc::new(Mutex::new(None))),
            location,
            is_closure: false,
        }
    }

    pub(crate) fn with_closure_flag(mut self, is_closure: bool) -> Self {
        self.is_closure = is_closure;
        self
    }

    /// Evaluate the expression.
    ///
    /// With caching enabled the closure runs at most once: the memo cell's
    /// lock is held for the whole computation, so concurrent callers wait
    /// for the first result instead of recomputing it. A panic inside the
    /// closure is not memoized.
    pub fn evaluate(&self) -> Outcome<T> {
        let Some(memo) = &self.memo else {
            return (self.thunk)();
        };
        let mut slot = memo.lock();
        if let Some(outcome) = slot.as_ref() {
            return outcome.clone();
        }
        let outcome = (self.thunk)();
        *slot = Some(outcome.clone());
        outcome
    }

    /// An expression over the same closure that re-runs it on every
    /// evaluation.
    #[must_use]
    pub fn without_caching(&self) -> Self {
        Self {
            thunk: Arc::clone(&self.thunk),
            memo: None,
            location: self.location,
            is_closure: self.is_closure,
        }
    }

    /// An expression with a fresh memo cell layered over this one.
    ///
    /// The first evaluation of the result evaluates `self` (which may itself
    /// be cached or not); later evaluations reuse that outcome.
    #[must_use]
    pub fn with_caching(&self) -> Self {
        let inner = self.clone();
        Self {
            thunk: Arc::new(move || inner.evaluate()),
            memo: Some(Arc::new(Mutex::new(None))),
            location: self.location,
            is_closure: self.is_closure,
        }
    }

    /// Derive an expression by transforming this one's outcome.
    ///
    /// The derived expression evaluates `self` lazily and is cached
    /// independently.
    pub fn cast<U, F>(&self, f: F) -> Expression<U>
    where
        U: Actual,
        F: Fn(Option<T>) -> Outcome<U> + Send + Sync + 'static,
    {
        let inner = self.clone();
        Expression {
            thunk: Arc::new(move || inner.evaluate().and_then(&f)),
            memo: Some(Arc::new(Mutex::new(None))),
            location: self.location,
            is_closure: self.is_closure,
        }
    }

    /// Lift this expression into the cooperative regime.
    ///
    /// The returned expression delegates to `self`, so it inherits this
    /// expression's caching behavior.
    #[must_use]
    pub fn to_async(&self) -> AsyncExpression<T> {
        let inner = self.clone();
        AsyncExpression::from_fn(
            move || {
                let outcome = inner.evaluate();
                async move { outcome }
            },
            self.location,
        )
        .uncached()
        .with_closure_flag(self.is_closure)
    }

    /// Where the expression was declared.
    #[must_use]
    pub fn location(&self) -> SourceLocation {
        self.location
    }

    /// Whether the expression wraps an explicit closure.
    #[must_use]
    pub fn is_closure(&self) -> bool {
        self.is_closure
    }

    /// Whether evaluations are memoized.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.memo.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting() -> (Expression<usize>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let expr = Expression::new(
            move || counter.fetch_add(1, Ordering::SeqCst) + 1,
            SourceLocation::caller(),
        );
        (expr, calls)
    }

    #[test]
    fn test_cached_expression_runs_once() {
        let (expr, calls) = counting();
        for _ in 0..5 {
            assert_eq!(expr.evaluate().unwrap(), Some(1));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clones_share_memo() {
        let (expr, calls) = counting();
        let copy = expr.clone();
        assert_eq!(expr.evaluate().unwrap(), Some(1));
        assert_eq!(copy.evaluate().unwrap(), Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_uncached_expression_runs_every_time() {
        let (expr, calls) = counting();
        let fresh = expr.without_caching();
        let seen: Vec<_> = (0..4).map(|_| fresh.evaluate().unwrap()).collect();
        assert_eq!(seen, vec![Some(1), Some(2), Some(3), Some(4)]);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(!fresh.is_cached());
    }

    #[test]
    fn test_without_caching_does_not_touch_original_memo() {
        let (expr, _calls) = counting();
        let fresh = expr.without_caching();
        assert_eq!(fresh.evaluate().unwrap(), Some(1));
        assert_eq!(expr.evaluate().unwrap(), Some(2));
        assert_eq!(expr.evaluate().unwrap(), Some(2));
    }

    #[test]
    fn test_with_caching_restores_memoization() {
        let (expr, calls) = counting();
        let cached = expr.without_caching().with_caching();
        assert_eq!(cached.evaluate().unwrap(), Some(1));
        assert_eq!(cached.evaluate().unwrap(), Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_errors_are_memoized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let expr: Expression<i32> = Expression::from_fn(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Thrown::msg("nope"))
            },
            SourceLocation::caller(),
        );
        let first = expr.evaluate().unwrap_err();
        let second = expr.evaluate().unwrap_err();
        assert!(first.ptr_eq(&second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_evaluation_computes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let expr = Expression::new(
            move || {
                std::thread::sleep(std::time::Duration::from_millis(20));
                counter.fetch_add(1, Ordering::SeqCst)
            },
            SourceLocation::caller(),
        );

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let expr = expr.clone();
                std::thread::spawn(move || expr.evaluate().unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Some(0));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cast_transforms_lazily() {
        let (expr, calls) = counting();
        let doubled = expr.cast(|v| Ok(v.map(|n| n * 2)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(doubled.evaluate().unwrap(), Some(2));
        assert_eq!(expr.evaluate().unwrap(), Some(1));
    }

    #[test]
    fn test_from_value_is_not_a_closure() {
        let expr = Expression::from_value(7, SourceLocation::caller());
        assert!(!expr.is_closure());
        assert_eq!(expr.without_caching().evaluate().unwrap(), Some(7));
    }

    #[test]
    fn test_optional_and_fallible() {
        let none: Expression<i32> = Expression::optional(|| None, SourceLocation::caller());
        assert_eq!(none.evaluate().unwrap(), None);

        let failing: Expression<i32> = Expression::fallible(
            || "x".parse::<i32>(),
            SourceLocation::caller(),
        );
        assert!(failing.evaluate().is_err());
    }
}
