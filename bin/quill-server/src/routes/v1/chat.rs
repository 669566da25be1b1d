//! OpenAI-compatible chat-completion route.
//!
//! Only the content of the last message is sent to the backend, wrapped in
//! the configured persona. Prior messages are accepted and ignored.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use quill_core::ChatRequest;
use tracing::info;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::v1::chat::{
    AssistantMessage, ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
    CompletionReply, ErrorResponse,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(chat_completions),
    components(schemas(
        ChatCompletionRequest,
        ChatCompletionResponse,
        ChatMessage,
        ChatChoice,
        AssistantMessage,
        ErrorResponse
    ))
)]
pub struct ChatApi;

/// Register chat-completion routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat/completions", post(chat_completions))
}

/// OpenAI chat completions (`POST /v1/chat/completions`).
///
/// The `model` field is ignored; the deployment's configured model is used.
#[utoipa::path(
    post,
    path = "/v1/chat/completions",
    tag = "chat",
    request_body = ChatCompletionRequest,
    responses(
        (status = 200, description = "Completion generated", body = ChatCompletionResponse),
        (status = 400, description = "Empty message list or malformed body", body = ErrorResponse),
        (status = 500, description = "Backend error", body = ErrorResponse),
        (status = 503, description = "Backend not configured", body = ErrorResponse),
    )
)]
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Result<CompletionReply, ServerError> {
    let Json(req) = payload?;
    let request: ChatRequest = req.into();

    let result = state.adapter.complete(&request).await;
    info!(
        messages = request.messages.len(),
        success = result.is_success(),
        "chat completion finished"
    );
    Ok(CompletionReply::new(result, state.adapter.model()))
}
