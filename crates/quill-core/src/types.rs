//! Request and result types passed between the HTTP layer and the adapter.

use serde::{Deserialize, Serialize};

use crate::error::CompletionError;

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Free-form role label (`"user"`, `"assistant"`, ...). Not interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Message text; may be empty.
    #[serde(default)]
    pub content: String,
}

impl Message {
    pub fn new(role: Option<String>, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Some(ROLE_USER.to_owned()), content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Some(ROLE_ASSISTANT.to_owned()), content)
    }
}

/// An inbound chat request. Only the last message is ever read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Convenience constructor for a single user turn.
    pub fn single(content: impl Into<String>) -> Self {
        Self::new(vec![Message::user(content)])
    }

    /// The message the adapter acts on, if any.
    pub fn latest(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Outcome of one [`crate::CompletionAdapter::complete`] call.
#[must_use]
#[derive(Debug)]
pub enum CompletionResult {
    Success { text: String },
    Failure(CompletionError),
}

impl CompletionResult {
    pub fn success(text: impl Into<String>) -> Self {
        CompletionResult::Success { text: text.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CompletionResult::Success { .. })
    }

    /// The failure reason, or `None` on success.
    pub fn reason(&self) -> Option<String> {
        match self {
            CompletionResult::Success { .. } => None,
            CompletionResult::Failure(e) => Some(e.to_string()),
        }
    }

    pub fn into_result(self) -> Result<String, CompletionError> {
        match self {
            CompletionResult::Success { text } => Ok(text),
            CompletionResult::Failure(e) => Err(e),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
