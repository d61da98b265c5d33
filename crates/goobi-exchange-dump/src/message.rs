//! Ordered operation messages surfaced to the caller after each phase.

use serde::Serialize;
use std::fmt;

/// Severity of a run message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Ok,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry of the audit trail. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub text: String,
    pub severity: Severity,
}

impl Message {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: Severity::Ok,
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: Severity::Warning,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: Severity::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Append-only message list. Each append is mirrored to `tracing`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        match message.severity {
            Severity::Ok => tracing::info!("{}", message.text),
            Severity::Warning => tracing::warn!("{}", message.text),
            Severity::Error => tracing::error!("{}", message.text),
        }
        self.messages.push(message);
    }

    pub fn ok(&mut self, text: impl Into<String>) {
        self.push(Message::ok(text));
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.push(Message::warning(text));
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(Message::error(text));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(Message::is_error)
    }

    /// Number of messages with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.messages
            .iter()
            .filter(|m| m.severity == severity)
            .count()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }
}

impl<'a> IntoIterator for &'a MessageLog {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
