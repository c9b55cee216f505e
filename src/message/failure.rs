//! The mutable, rendered form of a failure message.

use std::fmt;

use super::Message;

const DEFAULT_EXPECTED: &str = "expected";
const DEFAULT_TO: &str = "to";
const DEFAULT_POSTFIX_MESSAGE: &str = "match";

/// A failure message under construction.
///
/// The rendered text is `"<expected> <to> <postfix_message>"`, followed by
/// `", got <actual_value><postfix_actual>"` when an actual value is shown.
/// `actual_value` of `Some("")` means "fill in the evaluated value", while
/// `None` hides it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureMessage {
    /// Leading word, normally `"expected"`.
    pub expected: String,
    /// Rendered actual value.
    pub actual_value: Option<String>,
    /// Verb phrase such as `"to"`, `"to not"` or `"to eventually"`.
    pub to: String,
    /// Matcher text.
    pub postfix_message: String,
    /// Suffix after the actual value.
    pub postfix_actual: String,
    /// Extra lines shown below the message.
    pub extended_message: Option<String>,
    /// Caller-provided description shown above the message.
    pub user_description: Option<String>,
    string_value_override: Option<String>,
}

impl Default for FailureMessage {
    fn default() -> Self {
        Self::new()
    }
}

impl FailureMessage {
    /// An empty failure message.
    #[must_use]
    pub fn new() -> Self {
        Self {
            expected: DEFAULT_EXPECTED.to_string(),
            actual_value: Some(String::new()),
            to: DEFAULT_TO.to_string(),
            postfix_message: DEFAULT_POSTFIX_MESSAGE.to_string(),
            postfix_actual: String::new(),
            extended_message: None,
            user_description: None,
            string_value_override: None,
        }
    }

    /// A failure message with fixed text.
    pub fn with_string(text: impl Into<String>) -> Self {
        let mut message = Self::new();
        message.set_string_value(text);
        message
    }

    /// Replace the rendered text entirely.
    pub fn set_string_value(&mut self, text: impl Into<String>) {
        self.string_value_override = Some(text.into());
    }

    /// Whether the rendered text was replaced.
    #[must_use]
    pub fn has_overridden_string_value(&self) -> bool {
        self.string_value_override.is_some()
    }

    /// Render the message.
    #[must_use]
    pub fn string_value(&self) -> String {
        if let Some(text) = &self.string_value_override {
            return text.clone();
        }

        let mut value = match &self.actual_value {
            Some(actual) => format!(
                "{} {} {}, got {actual}{}",
                self.expected, self.to, self.postfix_message, self.postfix_actual
            ),
            None => format!("{} {} {}", self.expected, self.to, self.postfix_message),
        };
        value = strip_newlines(&value);

        if let Some(extended) = &self.extended_message {
            value.push('\n');
            value.push_str(extended);
        }

        match &self.user_description {
            Some(description) => format!("{description}\n{value}"),
            None => value,
        }
    }

    /// Append text where a matcher suffix belongs.
    pub fn append_message(&mut self, text: &str) {
        if let Some(overridden) = &mut self.string_value_override {
            overridden.push_str(text);
        } else if self.actual_value.is_some() {
            self.postfix_actual.push_str(text);
        } else {
            self.postfix_message.push_str(text);
        }
    }

    /// Attach details on a new line.
    pub fn append_details(&mut self, text: &str) {
        if let Some(overridden) = &mut self.string_value_override {
            if let Some(description) = &self.user_description {
                *overridden = format!("{description}\n{overridden}");
            }
            overridden.push('\n');
            overridden.push_str(text);
        } else {
            self.extended_message = Some(text.to_string());
        }
    }

    /// Convert back into a structured message.
    #[must_use]
    pub fn to_message(&self) -> Message {
        if self.expected != DEFAULT_EXPECTED || self.has_overridden_string_value() {
            return Message::Fail(self.string_value());
        }

        let mut message = Message::Fail(self.user_description.clone().unwrap_or_default());
        match self.actual_value.as_deref() {
            Some(actual) if !actual.is_empty() => {
                message = Message::expected_value_to(self.postfix_message.clone(), actual);
            }
            actual if self.postfix_message != DEFAULT_POSTFIX_MESSAGE => {
                message = if actual.is_none() {
                    Message::expected_to(self.postfix_message.clone())
                } else {
                    Message::expected_actual_value_to(self.postfix_message.clone())
                };
            }
            _ => {}
        }
        if !self.postfix_actual.is_empty() {
            message = message.appended(self.postfix_actual.clone());
        }
        if let Some(extended) = &self.extended_message {
            message = message.with_details(extended.clone());
        }
        message
    }
}

impl fmt::Display for FailureMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string_value())
    }
}

fn strip_newlines(text: &str) -> String {
    text.split('\n').map(str::trim).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rendering() {
        let message = FailureMessage::new();
        assert_eq!(message.string_value(), "expected to match, got");
    }

    #[test]
    fn test_rendering_with_actual_and_description() {
        let mut message = FailureMessage::new();
        message.postfix_message = "equal <1>".to_string();
        message.actual_value = Some("<2>".to_string());
        message.user_description = Some("counter".to_string());
        assert_eq!(message.string_value(), "counter\nexpected to equal <1>, got <2>");
    }

    #[test]
    fn test_newlines_are_stripped_from_the_main_line() {
        let mut message = FailureMessage::new();
        message.postfix_message = "equal\n  <1>".to_string();
        message.actual_value = None;
        message.extended_message = Some("first\nsecond".to_string());
        assert_eq!(message.string_value(), "expected to equal<1>\nfirst\nsecond");
    }

    #[test]
    fn test_override_wins() {
        let mut message = FailureMessage::with_string("custom");
        message.postfix_message = "ignored".to_string();
        message.append_message("!");
        assert_eq!(message.string_value(), "custom!");
        assert_eq!(message.to_message(), Message::fail("custom!"));
    }

    #[test]
    fn test_append_message_targets() {
        let mut shown = FailureMessage::new();
        shown.actual_value = Some("<1>".to_string());
        shown.append_message(" (hint)");
        assert_eq!(shown.postfix_actual, " (hint)");

        let mut hidden = FailureMessage::new();
        hidden.actual_value = None;
        hidden.append_message(" (hint)");
        assert_eq!(hidden.postfix_message, "match (hint)");
    }

    #[test]
    fn test_append_details_on_override_includes_description() {
        let mut message = FailureMessage::with_string("boom");
        message.user_description = Some("setup".to_string());
        message.append_details("trace");
        assert_eq!(message.string_value(), "setup\nboom\ntrace");
    }

    #[test]
    fn test_to_message_round_trips_structure() {
        let mut message = FailureMessage::new();
        message.postfix_message = "be ready".to_string();
        message.actual_value = None;
        message.postfix_actual = "!".to_string();
        assert_eq!(
            message.to_message(),
            Message::expected_to("be ready").appended("!")
        );

        let mut valued = FailureMessage::new();
        valued.postfix_message = "equal <1>".to_string();
        valued.actual_value = Some("<2>".to_string());
        assert_eq!(
            valued.to_message(),
            Message::expected_value_to("equal <1>", "<2>")
        );
    }
}
