//! Unified server error type.
//!
//! Handlers return `Result<T, ServerError>`; [`IntoResponse`] turns the error
//! into a `{"error": "..."}` body with a matching status code. Completion
//! failures do not pass through here: they are shaped by
//! [`crate::schemas::v1::chat::CompletionReply`].

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::debug;

use crate::schemas::v1::chat::ErrorResponse;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller referenced a resource that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request body exceeds the accepted size.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// The resource changed underneath an in-flight request.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match self {
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ServerError::BadRequest(m) => {
                debug!(reason = %m, "rejecting bad request");
                (StatusCode::BAD_REQUEST, m)
            }
            ServerError::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, m),
            ServerError::Conflict(m) => (StatusCode::CONFLICT, m),
        };
        (status, Json(ErrorResponse { error: client_message })).into_response()
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}
