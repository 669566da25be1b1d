//! Append-only chat history for one interactive session.

use crate::types::{CompletionResult, Message};

/// Shown in place of the assistant's turn when a completion fails.
pub const APOLOGY: &str = "잠시 잉크가 말랐나 봅니다. 다시 시도해주세요.";

/// Ordered history of one session, oldest first.
///
/// The only mutations are appends and [`SessionHistory::clear`]. Every clear
/// bumps the generation, so a reply computed before the clear can be
/// recognised and dropped by [`SessionHistory::push_reply`].
#[derive(Debug, Clone, Default)]
pub struct SessionHistory {
    messages: Vec<Message>,
    generation: u64,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> &Message {
        self.push(Message::user(content))
    }

    /// Append the assistant turn for `result`; failures append [`APOLOGY`].
    pub fn push_assistant(&mut self, result: &CompletionResult) -> &Message {
        let content = match result {
            CompletionResult::Success { text } => text.clone(),
            CompletionResult::Failure(_) => APOLOGY.to_owned(),
        };
        self.push(Message::assistant(content))
    }

    /// Append the assistant turn for `result` only if the history has not
    /// been cleared since `generation` was read. Returns `None` when the
    /// reply is stale and was dropped.
    pub fn push_reply(&mut self, generation: u64, result: &CompletionResult) -> Option<&Message> {
        if generation != self.generation {
            return None;
        }
        Some(self.push_assistant(result))
    }

    /// Incremented by every [`SessionHistory::clear`].
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        // Just pushed, so never empty.
        &self.messages[self.messages.len() - 1]
    }

    pub fn clear(&mut self) {
        self.messages = Vec::new();
        self.generation = self.generation.wrapping_add(1);
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
}

// ── Tests ──────────────────────────────────────────────────────────────────────
