//! The error value a wrapped computation may produce.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// An error raised by a wrapped computation or a matcher.
///
/// `Thrown` is reference counted so a memoized expression can hand the same
/// error to every caller without requiring the underlying error to be `Clone`.
///
/// # Example
///
/// ```rust
/// use testkit_expect::error::Thrown;
///
/// let thrown = Thrown::msg("connection refused");
/// assert_eq!(thrown.to_string(), "connection refused");
///
/// let copy = thrown.clone();
/// assert!(copy.ptr_eq(&thrown));
/// ```
#[derive(Clone)]
pub struct Thrown {
    inner: Arc<dyn StdError + Send + Sync + 'static>,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct MessageError(String);

impl Thrown {
    /// Wrap an error value.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(error),
        }
    }

    /// Create an error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(MessageError(message.into()))
    }

    /// Attempt to view the wrapped error as a concrete type.
    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// Returns `true` if both values share the same underlying error.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl fmt::Display for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

impl StdError for Thrown {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, thiserror::Error)]
    #[error("refused")]
    struct Refused;

    #[test]
    fn test_downcast_to_original_error() {
        let thrown = Thrown::new(Refused);
        assert_eq!(thrown.downcast_ref::<Refused>(), Some(&Refused));
        assert_eq!(thrown.to_string(), "refused");
    }

    #[test]
    fn test_clones_share_the_error() {
        let a = Thrown::msg("boom");
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Thrown::msg("boom")));
    }

    #[test]
    fn test_message_errors_display_their_text() {
        let thrown = Thrown::msg("socket closed");
        assert_eq!(thrown.to_string(), "socket closed");
        assert_eq!(format!("{thrown:?}"), "MessageError(\"socket closed\")");
        assert!(thrown.source().is_none());
    }
}
