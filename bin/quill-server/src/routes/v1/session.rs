//! Session widget routes: a server-held chat history per browser tab.
//!
//! Each turn sends only the new message to the backend; the history is
//! kept for display.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{delete, post};
use axum::{Json, Router};
use quill_core::ChatRequest;
use tracing::{debug, info};
use utoipa::OpenApi;
use uuid::Uuid;

use crate::error::ServerError;
use crate::schemas::v1::chat::ErrorResponse;
use crate::schemas::v1::session::{
    MessageResponse, SendMessageRequest, SessionResponse, TurnResponse,
};
use crate::state::{AppState, StaleReply};

#[derive(OpenApi)]
#[openapi(
    paths(create_session, delete_session, list_session_messages, send_message, clear_session_messages),
    components(schemas(
        SessionResponse,
        MessageResponse,
        SendMessageRequest,
        TurnResponse
    ))
)]
pub struct SessionApi;

/// Register session routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", delete(delete_session))
        .route(
            "/sessions/{id}/messages",
            post(send_message).get(list_session_messages).delete(clear_session_messages),
        )
}

fn session_id(raw: &str) -> Result<Uuid, ServerError> {
    Uuid::parse_str(raw).map_err(|_| not_found(raw))
}

fn not_found(id: &str) -> ServerError {
    ServerError::NotFound(format!("session not found: {id}"))
}

// ── Session handlers ──────────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/v1/sessions",
    tag = "sessions",
    responses(
        (status = 200, description = "Session created", body = SessionResponse),
    )
)]
pub async fn create_session(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    let id = state.sessions.create();
    debug!(session_id = %id, "session created");
    Json(SessionResponse { id: id.to_string() })
}

#[utoipa::path(
    delete,
    path = "/v1/sessions/{id}",
    tag = "sessions",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session deleted", body = serde_json::Value),
        (status = 404, description = "Unknown session", body = ErrorResponse),
    )
)]
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    if !state.sessions.remove(&session_id(&id)?) {
        return Err(not_found(&id));
    }
    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[utoipa::path(
    get,
    path = "/v1/sessions/{id}/messages",
    tag = "sessions",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "History, oldest first", body = Vec<MessageResponse>),
        (status = 404, description = "Unknown session", body = ErrorResponse),
    )
)]
pub async fn list_session_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, ServerError> {
    let messages = state.sessions.messages(&session_id(&id)?).ok_or_else(|| not_found(&id))?;
    Ok(Json(
        messages
            .iter()
            .enumerate()
            .map(|(i, m)| MessageResponse::from_message(i, m))
            .collect(),
    ))
}

/// Run one turn: append the user message, complete it, append the reply.
///
/// A failed completion still returns 200; the appended reply is the fixed
/// apology and `error` carries the reason. If the history is cleared while
/// the backend call is in flight, the reply is discarded and 409 returned.
#[utoipa::path(
    post,
    path = "/v1/sessions/{id}/messages",
    tag = "sessions",
    params(("id" = String, Path, description = "Session ID")),
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Turn completed", body = TurnResponse),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 404, description = "Unknown session", body = ErrorResponse),
        (status = 409, description = "History cleared before the reply arrived", body = ErrorResponse),
    )
)]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<TurnResponse>, ServerError> {
    let sid = session_id(&id)?;
    let Json(req) = payload?;

    let turn = state.sessions.push_user(&sid, &req.content).ok_or_else(|| not_found(&id))?;

    // The registry lock is not held while the backend call is in flight.
    let result = state.adapter.complete(&ChatRequest::single(req.content)).await;

    let (index, message) = state.sessions.push_assistant(&sid, turn, &result).map_err(|stale| {
        debug!(session_id = %sid, ?stale, "dropping reply for a turn that no longer exists");
        match stale {
            StaleReply::Gone => not_found(&id),
            StaleReply::Cleared => {
                ServerError::Conflict(format!("session {id} was cleared while the reply was pending"))
            }
        }
    })?;
    info!(session_id = %sid, index, success = result.is_success(), "session turn finished");

    Ok(Json(TurnResponse {
        reply: MessageResponse::from_message(index, &message),
        error: result.reason(),
    }))
}

#[utoipa::path(
    delete,
    path = "/v1/sessions/{id}/messages",
    tag = "sessions",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "History cleared", body = serde_json::Value),
        (status = 404, description = "Unknown session", body = ErrorResponse),
    )
)]
pub async fn clear_session_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    if !state.sessions.clear(&session_id(&id)?) {
        return Err(not_found(&id));
    }
    Ok(Json(serde_json::json!({ "cleared": true })))
}
