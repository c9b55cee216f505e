//! Matchers that judge values produced by futures.

use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;

use super::{Matcher, MatcherResult};
use crate::error::Thrown;
use crate::expression::{Actual, AsyncExpression};

/// The cooperative counterpart of [`Matcher`].
///
/// Every blocking matcher can be used where an `AsyncMatcher` is expected by
/// wrapping it in [`Blocking`]; the expression is evaluated once and its
/// outcome handed to the blocking matcher.
pub trait AsyncMatcher<T>: Send + Sync {
    /// Judge the expression.
    fn satisfies<'a>(
        &'a self,
        actual: &'a AsyncExpression<T>,
    ) -> BoxFuture<'a, Result<MatcherResult, Thrown>>;
}

impl<T, M: AsyncMatcher<T> + ?Sized> AsyncMatcher<T> for Box<M> {
    fn satisfies<'a>(
        &'a self,
        actual: &'a AsyncExpression<T>,
    ) -> BoxFuture<'a, Result<MatcherResult, Thrown>> {
        (**self).satisfies(actual)
    }
}

/// Adapts a blocking [`Matcher`] to an [`AsyncMatcher`].
pub struct Blocking<M>(pub M);

impl<T: Actual, M: Matcher<T>> AsyncMatcher<T> for Blocking<M> {
    fn satisfies<'a>(
        &'a self,
        actual: &'a AsyncExpression<T>,
    ) -> BoxFuture<'a, Result<MatcherResult, Thrown>> {
        async move {
            let frozen = actual.to_synchronous().await;
            self.0.satisfies(&frozen)
        }
        .boxed()
    }
}

/// An async matcher built from a closure.
pub struct AsyncFnMatcher<F> {
    f: F,
}

/// Build an async matcher from a closure returning a future.
///
/// # Example
///
/// ```rust
/// use testkit_expect::prelude::*;
///
/// # futures::executor::block_on(async {
/// let ready = async_matcher(|actual: AsyncExpression<bool>| async move {
///     let ready = actual.evaluate().await?.unwrap_or(false);
///     Ok(MatcherResult::from_bool(ready, Message::expected_to("be ready")))
/// });
///
/// expect_async(|| async { true }).to_async(ready).await;
/// # });
/// ```
pub fn async_matcher<T, F, Fut>(f: F) -> AsyncFnMatcher<F>
where
    F: Fn(AsyncExpression<T>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<MatcherResult, Thrown>> + Send + 'static,
{
    AsyncFnMatcher { f }
}

impl<T, F, Fut> AsyncMatcher<T> for AsyncFnMatcher<F>
where
    T: Actual,
    F: Fn(AsyncExpression<T>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<MatcherResult, Thrown>> + Send + 'static,
{
    fn satisfies<'a>(
        &'a self,
        actual: &'a AsyncExpression<T>,
    ) -> BoxFuture<'a, Result<MatcherResult, Thrown>> {
        (self.f)(actual.clone()).boxed()
    }
}

/// Negate an async matcher. A `Fail` stays a `Fail`.
pub fn not_async<M>(matcher: M) -> NotAsync<M> {
    NotAsync { inner: matcher }
}

/// Matcher returned by [`not_async`].
pub struct NotAsync<M> {
    inner: M,
}

impl<T: Actual, M: AsyncMatcher<T>> AsyncMatcher<T> for NotAsync<M> {
    fn satisfies<'a>(
        &'a self,
        actual: &'a AsyncExpression<T>,
    ) -> BoxFuture<'a, Result<MatcherResult, Thrown>> {
        async move { Ok(self.inner.satisfies(actual).await?.negated()) }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::SourceLocation;
    use crate::matcher::{always_fail, equal, MatcherStatus};
    use crate::message::Message;
    use futures::executor::block_on;

    fn value<T: Actual>(v: T) -> AsyncExpression<T> {
        AsyncExpression::from_value(v, SourceLocation::caller())
    }

    #[test]
    fn test_blocking_adapter() {
        let matcher = Blocking(equal(3));
        let result = block_on(matcher.satisfies(&value(3))).unwrap();
        assert_eq!(result.status, MatcherStatus::Matches);
    }

    #[test]
    fn test_async_fn_matcher() {
        let positive = async_matcher(|actual: AsyncExpression<i32>| async move {
            let n = actual.evaluate().await?.unwrap_or_default();
            Ok(MatcherResult::from_bool(n > 0, Message::expected_actual_value_to("be positive")))
        });
        let result = block_on(positive.satisfies(&value(-1))).unwrap();
        assert_eq!(result.status, MatcherStatus::DoesNotMatch);
    }

    #[test]
    fn test_not_async() {
        let result = block_on(not_async(Blocking(equal(1))).satisfies(&value(2))).unwrap();
        assert_eq!(result.status, MatcherStatus::Matches);

        let result = block_on(not_async(Blocking(always_fail::<i32>())).satisfies(&value(2))).unwrap();
        assert_eq!(result.status, MatcherStatus::Fail);
    }
}
