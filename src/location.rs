//! Source locations attached to expectations.

use std::fmt;

/// The place in a test file an expectation was declared.
///
/// Every DSL entry point is `#[track_caller]`, so locations point at the
/// caller's `expect(...)` rather than at library internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    file: &'static str,
    line: u32,
    column: u32,
}

impl SourceLocation {
    /// Create a location from its parts.
    #[must_use]
    pub const fn new(file: &'static str, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    /// Capture the location of the caller.
    ///
    /// # Example
    ///
    /// ```rust
    /// use testkit_expect::SourceLocation;
    ///
    /// let here = SourceLocation::caller();
    /// assert!(here.file().ends_with(".rs"));
    /// ```
    #[must_use]
    #[track_caller]
    pub fn caller() -> Self {
        let location = std::panic::Location::caller();
        Self::new(location.file(), location.line(), location.column())
    }

    /// Source file path.
    #[must_use]
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// One-based line number.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// One-based column number.
    #[must_use]
    pub fn column(&self) -> u32 {
        self.column
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
