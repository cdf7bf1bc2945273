//! AI boundary for report narrative enhancement.
//!
//! The boundary is prompt in, text or typed failure out. Nothing here knows
//! about analysis results; the reporting module builds prompts and decides
//! what to do when enhancement fails.
//!
//! # Feature Flag
//!
//! The [`TextGenerator`] and [`NarrativeEnhancer`] traits are always
//! available. The HTTP-backed [`OpenRouterGenerator`] requires the `ai`
//! feature.
//!
//! ```toml
//! # Enable AI support (default)
//! lex_analysis = { version = "0.1", features = ["ai"] }
//!
//! # Deterministic narratives only, no HTTP client
//! lex_analysis = { version = "0.1", default-features = false }
//! ```
//!
//! # Architecture
//!
//! - [`TextGenerator`]: one provider call per prompt, no retries.
//! - [`NarrativeEnhancer`]: the capability the composer holds.
//!   [`ProviderEnhancer`] wraps a generator with a bounded wait,
//!   [`DeterministicEnhancer`] never calls out.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_analysis::ai::{OpenRouterGenerator, ProviderEnhancer};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let generator = Arc::new(OpenRouterGenerator::new("your-api-key")?);
//! let enhancer = ProviderEnhancer::new(generator, Duration::from_secs(30));
//! ```

mod enhancer;
mod provider;

pub use enhancer::{DeterministicEnhancer, NarrativeEnhancer, ProviderEnhancer, enhancer_for};
pub use provider::{EnhancementFailure, TextGenerator};

#[cfg(feature = "ai")]
mod openrouter;

#[cfg(feature = "ai")]
pub use openrouter::{OpenRouterConfig, OpenRouterConfigBuilder, OpenRouterGenerator};
