use quill_core::Message;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    /// Position in the history, starting at 0.
    pub index: usize,
    pub role: String,
    pub content: String,
}

impl MessageResponse {
    pub fn from_message(index: usize, message: &Message) -> Self {
        Self {
            index,
            role: message.role.clone().unwrap_or_default(),
            content: message.content.clone(),
        }
    }
}

/// Body of `POST /v1/sessions/{id}/messages`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub content: String,
}

/// Result of one session turn.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TurnResponse {
    /// The assistant message appended to the history.
    pub reply: MessageResponse,
    /// Failure reason when the reply is the fixed apology.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
