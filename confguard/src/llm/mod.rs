//! Generative text gateway. The hosted backend is a black box (prompt in,
//! raw text out) that may be slow, non-deterministic or down; everything it
//! returns is validated downstream before use.

use std::fmt;

use async_trait::async_trait;

mod gemini;
pub mod json;
pub mod prompts;

pub use gemini::GeminiClient;

/// Failure of a single generative call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenError {
    /// The call exceeded the configured deadline.
    Timeout,
    /// Transport or backend failure, with the underlying message.
    Backend(String),
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenError::Timeout => write!(f, "generative backend call timed out"),
            GenError::Backend(msg) => write!(f, "generative backend error: {msg}"),
        }
    }
}

impl std::error::Error for GenError {}

/// Text-generation backend consumed by the analysis and autofix pipelines.
///
/// Implementations must apply their own per-call timeout and surface it as
/// [`GenError::Timeout`].
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates with a JSON-biased output mode and low temperature.
    async fn generate_json(&self, prompt: &str) -> Result<String, GenError>;

    /// Generates plain text (no JSON bias).
    async fn generate_plain(&self, prompt: &str) -> Result<String, GenError>;

    /// Extracts text from an image (OCR-capable call).
    async fn generate_from_image(
        &self,
        instruction: &str,
        image_base64: &str,
        mime_type: &str,
    ) -> Result<String, GenError>;
}
