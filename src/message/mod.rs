//! Failure message model.
//!
//! Matchers describe their expectation with a [`Message`] tree. The tree is
//! immutable; transformations such as [`Message::prepended`] return new
//! trees that share unchanged nodes. When an expectation is verified the tree
//! is folded into a mutable [`FailureMessage`] and rendered.

mod failure;

use std::fmt::Debug;
use std::sync::Arc;

pub use failure::FailureMessage;

/// Hint appended when a matcher that needs a value received none.
pub const BE_NONE_HINT: &str = " (use be_none() to match None)";

/// A structured description of what a matcher expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Free-form text rendered as is.
    Fail(String),
    /// `expected to <text>`, without the actual value.
    ExpectedTo(String),
    /// `expected to <text>, got <actual>`, where the actual value is
    /// supplied when the message is rendered.
    ExpectedActualValueTo(String),
    /// `expected to <text>, got <actual>` with a fixed actual string.
    ExpectedValueTo(String, String),
    /// A suffix appended to the rendered inner message.
    Append(Arc<Message>, String),
    /// Multi-line details rendered below the inner message.
    Details(Arc<Message>, String),
}

impl Message {
    /// Free-form message.
    pub fn fail(text: impl Into<String>) -> Self {
        Self::Fail(text.into())
    }

    /// `expected to <text>`.
    pub fn expected_to(text: impl Into<String>) -> Self {
        Self::ExpectedTo(text.into())
    }

    /// `expected to <text>, got <actual>` with the actual value filled in
    /// later.
    pub fn expected_actual_value_to(text: impl Into<String>) -> Self {
        Self::ExpectedActualValueTo(text.into())
    }

    /// `expected to <text>, got <actual>`.
    pub fn expected_value_to(text: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ExpectedValueTo(text.into(), actual.into())
    }

    /// The text of a leaf message, or `None` for composite nodes.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Fail(text)
            | Self::ExpectedTo(text)
            | Self::ExpectedActualValueTo(text)
            | Self::ExpectedValueTo(text, _) => Some(text),
            Self::Append(..) | Self::Details(..) => None,
        }
    }

    /// The expectation part of the message with appended suffixes, used when
    /// one matcher quotes another.
    #[must_use]
    pub fn expected_message(&self) -> String {
        match self {
            Self::Fail(text)
            | Self::ExpectedTo(text)
            | Self::ExpectedActualValueTo(text)
            | Self::ExpectedValueTo(text, _) => text.clone(),
            Self::Append(inner, suffix) => format!("{}{suffix}", inner.expected_message()),
            Self::Details(inner, _) => inner.expected_message(),
        }
    }

    /// Append a suffix. Appending to a details node appends inside it so the
    /// details stay last.
    #[must_use]
    pub fn appended(&self, suffix: impl Into<String>) -> Self {
        match self {
            Self::Details(inner, details) => {
                Self::Details(Arc::new(inner.appended(suffix)), details.clone())
            }
            _ => Self::Append(Arc::new(self.clone()), suffix.into()),
        }
    }

    /// Append the "use `be_none()`" hint.
    #[must_use]
    pub fn appended_be_none_hint(&self) -> Self {
        self.appended(BE_NONE_HINT)
    }

    /// Attach multi-line details.
    #[must_use]
    pub fn with_details(&self, details: impl Into<String>) -> Self {
        Self::Details(Arc::new(self.clone()), details.into())
    }

    /// Rewrite every leaf with `f`, keeping composite structure.
    #[must_use]
    pub fn map_leaves<F>(&self, f: &F) -> Self
    where
        F: Fn(&Self) -> Self,
    {
        match self {
            Self::Append(inner, suffix) => Self::Append(Arc::new(inner.map_leaves(f)), suffix.clone()),
            Self::Details(inner, details) => {
                Self::Details(Arc::new(inner.map_leaves(f)), details.clone())
            }
            leaf => f(leaf),
        }
    }

    /// Prefix the expectation text of every expectation leaf. Free-form
    /// leaves are left alone.
    #[must_use]
    pub fn prepended(&self, prefix: &str) -> Self {
        self.map_leaves(&|leaf: &Self| match leaf {
            Self::ExpectedTo(text) => Self::ExpectedTo(format!("{prefix}{text}")),
            Self::ExpectedActualValueTo(text) => {
                Self::ExpectedActualValueTo(format!("{prefix}{text}"))
            }
            Self::ExpectedValueTo(text, actual) => {
                Self::ExpectedValueTo(format!("{prefix}{text}"), actual.clone())
            }
            other => other.clone(),
        })
    }

    /// Prefix and suffix the message.
    #[must_use]
    pub fn wrapped(&self, before: &str, after: &str) -> Self {
        self.prepended(before).appended(after)
    }

    /// Fix the actual value of every leaf that would otherwise pick it up at
    /// render time.
    #[must_use]
    pub fn resolving_actual(&self, actual: &str) -> Self {
        self.map_leaves(&|leaf: &Self| match leaf {
            Self::ExpectedActualValueTo(text) => {
                Self::ExpectedValueTo(text.clone(), actual.to_string())
            }
            other => other.clone(),
        })
    }

    /// Render the message.
    ///
    /// # Example
    ///
    /// ```rust
    /// use testkit_expect::Message;
    ///
    /// let message = Message::expected_actual_value_to("equal <1>").appended_be_none_hint();
    /// assert_eq!(
    ///     message.render("None", "expected", "to"),
    ///     "expected to equal <1>, got None (use be_none() to match None)"
    /// );
    /// ```
    #[must_use]
    pub fn render(&self, actual: &str, expected: &str, to: &str) -> String {
        match self {
            Self::Fail(text) => text.clone(),
            Self::ExpectedTo(text) => format!("{expected} {to} {text}"),
            Self::ExpectedActualValueTo(text) => format!("{expected} {to} {text}, got {actual}"),
            Self::ExpectedValueTo(text, actual) => format!("{expected} {to} {text}, got {actual}"),
            Self::Append(inner, suffix) => format!("{}{suffix}", inner.render(actual, expected, to)),
            Self::Details(inner, details) => {
                format!("{}\n{details}", inner.render(actual, expected, to))
            }
        }
    }

    /// Fold this message into a mutable failure message.
    ///
    /// Suffixes attach to the actual value when one is shown and to the
    /// expectation text otherwise.
    pub fn update(&self, failure: &mut FailureMessage) {
        match self {
            Self::Fail(text) => failure.set_string_value(text.clone()),
            Self::ExpectedTo(text) => {
                failure.actual_value = None;
                failure.postfix_message.clone_from(text);
            }
            Self::ExpectedActualValueTo(text) => failure.postfix_message.clone_from(text),
            Self::ExpectedValueTo(text, actual) => {
                failure.postfix_message.clone_from(text);
                failure.actual_value = Some(actual.clone());
            }
            Self::Append(inner, suffix) => {
                inner.update(failure);
                failure.append_message(suffix);
            }
            Self::Details(inner, details) => {
                inner.update(failure);
                failure.append_details(details);
            }
        }
    }
}

/// Render an evaluated value the way failure messages show it.
pub(crate) fn stringify<T: Debug>(value: Option<&T>) -> String {
    match value {
        Some(value) => format!("<{value:?}>"),
        None => "<None>".to_string(),
    }
}
