//! Generative-text backends.
//!
//! The adapter only sees the [`Generator`] trait. [`gemini::GeminiClient`] is
//! the production implementation; tests substitute recording stubs.

pub mod gemini;

use async_trait::async_trait;

use crate::error::BackendError;

pub use gemini::GeminiClient;

/// One-shot text generation.
#[async_trait]
pub trait Generator: Send + Sync + 'static {
    /// Short backend name used in logs.
    fn name(&self) -> &str;

    /// Whether the backend accepts a standing system instruction alongside
    /// the prompt. When `false`, personas are concatenated into the prompt.
    fn supports_standing_instruction(&self) -> bool {
        true
    }

    /// Generate text for `prompt`, optionally steered by `system_instruction`.
    async fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> Result<String, BackendError>;
}
