//! LLM backend abstraction.
//!
//! The conversation loop only needs "prompt in, text out". Backends hide the
//! transport (single response or token stream) and hand back the fully
//! drained, reasoning-free completion.

mod errors;
mod ollama;
mod reasoning;

pub use errors::CompletionError;
pub use ollama::{DEFAULT_BASE_URL, DEFAULT_MODEL, OllamaBackend, OllamaBackendBuilder, is_installed};
pub use reasoning::{REASONING_CLOSE, REASONING_OPEN, strip_reasoning};

use std::future::Future;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Generation options passed with every completion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Trait for LLM backends.
///
/// Implementations never retry; a failed request is reported once and the
/// caller decides what to do with the turn.
pub trait LlmBackend: Send + Sync {
    /// Complete `prompt` and return the final text.
    fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> impl Future<Output = Result<String, CompletionError>> + Send;

    /// Identifier of the model this backend talks to.
    fn model(&self) -> &str;
}
