//! Error types shared by the persona configurator, the backend clients and
//! the completion adapter.

use thiserror::Error;

/// Raised while building a [`crate::GenerationHandle`] or loading credentials.
///
/// These are startup errors: the server refuses to start rather than serving
/// requests it can never fulfil.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No API key could be resolved for the backend.
    #[error("no credential found for {backend}: set {hint}")]
    MissingCredential { backend: String, hint: String },

    /// The backend model identifier is blank.
    #[error("model name must not be empty")]
    EmptyModel,

    /// A persona mode that needs instruction text was given none.
    #[error("persona mode '{mode}' requires non-empty persona text")]
    EmptyPersona { mode: String },

    /// `QUILL_PERSONA_PRESET` named a preset that does not exist.
    #[error("unknown persona preset '{0}'")]
    UnknownPreset(String),

    /// `QUILL_PERSONA_MODE` is not one of `none`, `standing`, `inline`.
    #[error("invalid persona mode '{0}' (expected none, standing or inline)")]
    InvalidPersonaMode(String),

    /// The backend HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    /// The secrets file exists but could not be read or parsed.
    #[error("failed to load secrets from {path}: {message}")]
    Secrets { path: String, message: String },
}

/// Failure surfaced by a [`crate::Generator`] call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The client was built with a blank key (call-time guard).
    #[error("backend credential is missing")]
    MissingCredential,

    /// Connection, TLS or timeout failure before a reply was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The backend refused to answer the prompt.
    #[error("prompt was blocked by the backend: {reason}")]
    Blocked { reason: String },

    /// The reply could not be decoded or carried no text.
    #[error("malformed backend reply: {0}")]
    MalformedReply(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::MalformedReply(e.to_string())
        } else {
            BackendError::Transport(e.to_string())
        }
    }
}

/// The failure side of a [`crate::CompletionResult`].
///
/// The `Display` output is the user-visible failure reason.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The request carried an empty message list.
    #[error("no messages provided")]
    NoMessages,

    /// The generation handle is unusable.
    #[error("{0}")]
    Configuration(String),

    /// The backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}
