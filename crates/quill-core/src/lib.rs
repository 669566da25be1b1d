//! quill-core: persona-steered chat completion.
//!
//! The pieces, in call order:
//!
//! 1. [`PersonaConfig`] binds a model name and an optional [`Persona`] to a
//!    [`Generator`], producing a [`GenerationHandle`].
//! 2. [`CompletionAdapter::complete`] takes a [`ChatRequest`], sends its last
//!    message through the handle and returns a [`CompletionResult`].
//! 3. [`SessionHistory`] records turns for the interactive chat widget.

pub mod adapter;
pub mod backend;
pub mod credentials;
pub mod error;
pub mod persona;
pub mod session;
pub mod types;

pub use adapter::CompletionAdapter;
pub use backend::{GeminiClient, Generator};
pub use error::{BackendError, CompletionError, ConfigError};
pub use persona::{GenerationHandle, PageText, Persona, PersonaConfig, PersonaMode, PersonaPreset};
pub use session::{SessionHistory, APOLOGY};
pub use types::{ChatRequest, CompletionResult, Message};
