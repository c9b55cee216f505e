//! Deferred values produced by futures.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::lock::Mutex;
use futures::FutureExt;

use super::{Actual, Expression, Outcome};
use crate::error::Thrown;
use crate::location::SourceLocation;

type AsyncThunk<T> = Arc<dyn Fn() -> BoxFuture<'static, Outcome<T>> + Send + Sync>;
type AsyncMemo<T> = Arc<Mutex<Option<Outcome<T>>>>;

/// The cooperative counterpart of [`Expression`].
///
/// The closure returns a future. With caching enabled, the first caller
/// drives the computation while holding the memo lock; concurrent callers
/// queue behind it and observe the same outcome.
pub struct AsyncExpression<T> {
    thunk: AsyncThunk<T>,
    memo: Option<AsyncMemo<T>>,
    location: SourceLocation,
    is_closure: bool,
}

impl<T> Clone for AsyncExpression<T> {
    fn clone(&self) -> Self {
        Self {
            thunk: Arc::clone(&self.thunk),
            memo: self.memo.clone(),
            location: self.location,
            is_closure: self.is_closure,
        }
    }
}

impl<T> fmt::Debug for AsyncExpression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncExpression")
            .field("location", &self.location)
            .field("is_closure", &self.is_closure)
            .field("cached", &self.memo.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: Actual> AsyncExpression<T> {
    /// Wrap an async closure that always produces a value.
    pub fn new<F, Fut>(f: F, location: SourceLocation) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Self::from_fn(move || f().map(|value| Ok(Some(value))), location)
    }

    /// Wrap an async closure that may produce no value.
    pub fn optional<F, Fut>(f: F, location: SourceLocation) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<T>> + Send + 'static,
    {
        Self::from_fn(move || f().map(Ok), location)
    }

    /// Wrap an async closure that may fail.
    pub fn fallible<F, Fut, E>(f: F, location: SourceLocation) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::from_fn(
            move || f().map(|result| result.map(Some).map_err(Thrown::new)),
            location,
        )
    }

    /// Wrap an async closure returning a raw [`Outcome`].
    pub fn from_fn<F, Fut>(f: F, location: SourceLocation) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<T>> + Send + 'static,
    {
        Self {
            thunk: Arc::new(move || f().boxed()),
            memo: Some(Arc::new(Mutex::new(None))),
            location,
            is_closure: true,
        }
    }

    /// Wrap an already computed value.
    pub fn from_value(value: T, location: SourceLocation) -> Self {
        let outcome: Outcome<T> = Ok(Some(value));
        Self {
            thunk: Arc::new(move || futures::future::ready(outcome.clone()).boxed()),
            memo: Some(Arc::new(Mutex::new(None))),
            location,
            is_closure: false,
        }
    }

    pub(crate) fn uncached(mut self) -> Self {
        self.memo = None;
        self
    }

    pub(crate) fn with_closure_flag(mut self, is_closure: bool) -> Self {
        self.is_closure = is_closure;
        self
    }

    /// Evaluate the expression, memoizing the outcome when caching is on.
    pub async fn evaluate(&self) -> Outcome<T> {
        let Some(memo) = &self.memo else {
            return (self.thunk)().await;
        };
        let mut slot = memo.lock().await;
        if let Some(outcome) = slot.as_ref() {
            return outcome.clone();
        }
        let outcome = (self.thunk)().await;
        *slot = Some(outcome.clone());
        outcome
    }

    /// An expression over the same closure that re-runs it on every
    /// evaluation.
    #[must_use]
    pub fn without_caching(&self) -> Self {
        self.clone().uncached()
    }

    /// An expression with a fresh memo cell layered over this one.
    #[must_use]
    pub fn with_caching(&self) -> Self {
        let inner = self.clone();
        Self {
            thunk: Arc::new(move || {
                let inner = inner.clone();
                async move { inner.evaluate().await }.boxed()
            }),
            memo: Some(Arc::new(Mutex::new(None))),
            location: self.location,
            is_closure: self.is_closure,
        }
    }

    /// Derive an expression by transforming this one's outcome.
    pub fn cast<U, F>(&self, f: F) -> AsyncExpression<U>
    where
        U: Actual,
        F: Fn(Option<T>) -> Outcome<U> + Send + Sync + 'static,
    {
        let inner = self.clone();
        let f = Arc::new(f);
        AsyncExpression {
            thunk: Arc::new(move || {
                let inner = inner.clone();
                let f = Arc::clone(&f);
                async move { inner.evaluate().await.and_then(|value| f(value)) }.boxed()
            }),
            memo: Some(Arc::new(Mutex::new(None))),
            location: self.location,
            is_closure: self.is_closure,
        }
    }

    /// Evaluate once and freeze the outcome into a blocking expression.
    ///
    /// This is how synchronous matchers are applied to values produced
    /// cooperatively. The resulting expression keeps this expression's
    /// closure flag.
    pub async fn to_synchronous(&self) -> Expression<T> {
        let outcome = self.evaluate().await;
        Expression::from_outcome(outcome, self.location).with_closure_flag(self.is_closure)
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
