//! OpenAI-compatible chat-completion request / response types and the
//! mapping from [`CompletionResult`] to HTTP.
//!
//! Only the subset of the OpenAI schema that quill honours is modelled.
//! Unknown request fields (`temperature`, `stream`, ...) are accepted and
//! ignored.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use quill_core::types::ROLE_ASSISTANT;
use quill_core::{ChatRequest, CompletionError, CompletionResult, Message};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const FINISH_STOP: &str = "stop";
pub const OBJECT_CHAT_COMPLETION: &str = "chat.completion";

/// A single inbound message. Only `content` of the last message is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    /// Role label (`"user"`, `"system"`, ...); informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Message text. Missing or `null` is treated as `""`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Request body for `POST /v1/chat/completions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ChatCompletionRequest {
    /// Ignored; the deployment's configured model is always used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Conversation; only the last entry is sent to the backend.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl From<ChatCompletionRequest> for ChatRequest {
    fn from(req: ChatCompletionRequest) -> Self {
        ChatRequest::new(
            req.messages
                .into_iter()
                .map(|m| Message::new(m.role, m.content.unwrap_or_default()))
                .collect(),
        )
    }
}

/// The generated assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssistantMessage {
    /// Always `"assistant"`.
    pub role: String,
    pub content: String,
}

/// A single choice in the completion response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatChoice {
    /// Always `0`; quill produces exactly one choice.
    pub index: u32,
    pub message: AssistantMessage,
    /// Always `"stop"`.
    pub finish_reason: String,
}

/// Response body for a successful `POST /v1/chat/completions`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatCompletionResponse {
    /// Always `"chat.completion"`.
    pub object: String,
    /// Model that produced the completion.
    pub model: String,
    /// Exactly one choice.
    pub choices: Vec<ChatChoice>,
}

impl ChatCompletionResponse {
    pub fn single(model: &str, text: String) -> Self {
        Self {
            object: OBJECT_CHAT_COMPLETION.to_owned(),
            model: model.to_owned(),
            choices: vec![ChatChoice {
                index: 0,
                message: AssistantMessage { role: ROLE_ASSISTANT.to_owned(), content: text },
                finish_reason: FINISH_STOP.to_owned(),
            }],
        }
    }
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// HTTP status for a completion failure.
pub fn failure_status(error: &CompletionError) -> StatusCode {
    match error {
        CompletionError::NoMessages => StatusCode::BAD_REQUEST,
        CompletionError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
        CompletionError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// A [`CompletionResult`] ready to be sent: success becomes 200 with one
/// choice, failure becomes `{"error": reason}` with [`failure_status`].
#[derive(Debug)]
pub struct CompletionReply {
    pub result: CompletionResult,
    pub model: String,
}

impl CompletionReply {
    pub fn new(result: CompletionResult, model: impl Into<String>) -> Self {
        Self { result, model: model.into() }
    }
}

impl IntoResponse for CompletionReply {
    fn into_response(self) -> Response {
        match self.result {
            CompletionResult::Success { text } => {
                (StatusCode::OK, Json(ChatCompletionResponse::single(&self.model, text)))
                    .into_response()
            }
            CompletionResult::Failure(e) => {
                let status = failure_status(&e);
                (status, Json(ErrorResponse { error: e.to_string() })).into_response()
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
