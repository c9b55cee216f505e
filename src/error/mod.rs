//! Error definitions
//!
//! This module provides error types for testkit-expect.

mod thrown;

use std::sync::Arc;

use thiserror::Error;

use crate::location::SourceLocation;

pub use thrown::Thrown;

/// Main error type for testkit-expect
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A requirement did not hold.
    ///
    /// The assertion handler has already been told about the failure; this
    /// error exists so the calling test can stop with `?`.
    #[error("{message} ({location})")]
    RequireFailed {
        /// Rendered failure message.
        message: String,
        /// Where the requirement was declared.
        location: SourceLocation,
    },

    /// The computation behind a requirement raised an error.
    #[error("unexpected error thrown: <{error}> ({location})")]
    Thrown {
        /// The raised error.
        #[source]
        error: Thrown,
        /// Where the requirement was declared.
        location: SourceLocation,
    },

    /// A caller-supplied error returned in place of [`Error::RequireFailed`].
    #[error(transparent)]
    Custom(Arc<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// Create a requirement failure error.
    #[must_use]
    pub fn require_failed(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::RequireFailed {
            message: message.into(),
            location,
        }
    }

    /// Wrap a caller-supplied error.
    #[must_use]
    pub fn custom<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(error))
    }

    /// Location of the failed requirement, if this error carries one.
    #[must_use]
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            Self::RequireFailed { location, .. } | Self::Thrown { location, .. } => Some(*location),
            Self::Custom(_) => None,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
