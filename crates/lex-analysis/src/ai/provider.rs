//! Text generation trait for abstracting LLM interactions.
//!
//! A [`TextGenerator`] takes a fully built prompt and returns generated
//! text or a typed [`EnhancementFailure`]. It knows nothing about analysis
//! results or report sections; prompt construction lives in the reporting
//! module.
//!
//! # Implementing a New Generator
//!
//! 1. Create a new file in `src/ai/` (e.g., `ollama.rs`)
//! 2. Implement [`TextGenerator`] for your client struct
//! 3. Export it from `src/ai/mod.rs`
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_analysis::ai::{OpenRouterGenerator, TextGenerator};
//!
//! let generator = OpenRouterGenerator::new("your-api-key")?;
//! let text = generator.generate("Summarise: r = 0.62, p < .001")?;
//! ```

use std::time::Duration;
use thiserror::Error;

/// Why a generation attempt produced no usable text.
///
/// Every variant is absorbed by the report composer, which then falls back
/// to the deterministic narrative.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnhancementFailure {
    /// The provider did not answer within the configured bound.
    #[error("text generation timed out after {0:?}")]
    Timeout(Duration),

    /// The provider answered with an error (HTTP status, transport, quota).
    #[error("provider error: {0}")]
    Provider(String),

    /// The provider answered but the response carried no usable text.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// No provider is configured or enhancement is disabled.
    #[error("text generation unavailable")]
    Unavailable,
}

/// Trait for providers that turn a prompt into text.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: the provider-backed enhancer
/// calls them from a worker thread so it can bound the wait.
///
/// # Error Handling
///
/// A single bounded attempt per call; implementations must not retry.
pub trait TextGenerator: Send + Sync {
    /// Generate text for a prompt.
    fn generate(&self, prompt: &str) -> Result<String, EnhancementFailure>;

    /// Get the provider name for logging and debugging.
    fn name(&self) -> &str;

    /// Get the model being used, if the provider has one.
    fn model(&self) -> Option<&str> {
        None
    }
}
