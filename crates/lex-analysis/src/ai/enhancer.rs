//! Narrative enhancement capability used by the report composer.
//!
//! The composer holds one [`NarrativeEnhancer`], chosen at construction:
//!
//! - [`ProviderEnhancer`] sends the prompt to a [`TextGenerator`] on a worker
//!   thread and waits at most the configured timeout.
//! - [`DeterministicEnhancer`] never calls out; every section uses the
//!   deterministic narrative.
//!
//! A generator that panics surfaces as [`EnhancementFailure::Provider`] only
//! when panics unwind. The workspace dev and release profiles set
//! `panic = "abort"`, so in the CLI binary such a panic ends the process;
//! generators must report failures through their `Result`.

use super::provider::{EnhancementFailure, TextGenerator};
use crate::config::EngineConfig;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Rewrites a section prompt into narrative text.
pub trait NarrativeEnhancer: Send + Sync {
    /// Produce narrative text for a prompt, or say why none is available.
    fn enhance(&self, prompt: &str) -> Result<String, EnhancementFailure>;

    /// Short label for logs.
    fn describe(&self) -> String;
}

/// Enhancer backed by a text generator with a bounded wait.
pub struct ProviderEnhancer {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl ProviderEnhancer {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }
}

impl NarrativeEnhancer for ProviderEnhancer {
    fn enhance(&self, prompt: &str) -> Result<String, EnhancementFailure> {
        let (tx, rx) = mpsc::channel();
        let generator = Arc::clone(&self.generator);
        let prompt = prompt.to_string();

        // The worker is detached: on timeout it keeps running and its send fails silently.
        thread::Builder::new()
            .name("narrative-enhancer".to_string())
            .spawn(move || {
                let _ = tx.send(generator.generate(&prompt));
            })
            .map_err(|e| EnhancementFailure::Provider(format!("cannot start worker: {}", e)))?;

        let text = match rx.recv_timeout(self.timeout) {
            Ok(outcome) => outcome?,
            Err(RecvTimeoutError::Timeout) => {
                return Err(EnhancementFailure::Timeout(self.timeout));
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(EnhancementFailure::Provider(
                    "worker stopped without a response".to_string(),
                ));
            }
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(EnhancementFailure::MalformedResponse(
                "empty response".to_string(),
            ));
        }
        debug!("{} returned {} characters", self.generator.name(), text.len());
        Ok(text.to_string())
    }

    fn describe(&self) -> String {
        match self.generator.model() {
            Some(model) => format!("{} ({})", self.generator.name(), model),
            None => self.generator.name().to_string(),
        }
    }
}

/// Enhancer that never produces text.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeterministicEnhancer;

impl NarrativeEnhancer for DeterministicEnhancer {
    fn enhance(&self, _prompt: &str) -> Result<String, EnhancementFailure> {
        Err(EnhancementFailure::Unavailable)
    }

    fn describe(&self) -> String {
        "deterministic".to_string()
    }
}

/// Pick the enhancer the configuration asks for.
///
/// Falls back to [`DeterministicEnhancer`] when enhancement is disabled or
/// no generator is available.
pub fn enhancer_for(
    config: &EngineConfig,
    generator: Option<Arc<dyn TextGenerator>>,
) -> Arc<dyn NarrativeEnhancer> {
    match generator {
        Some(generator) if config.use_ai_enhancement => Arc::new(ProviderEnhancer::new(
            generator,
            Duration::from_secs(config.ai_timeout_secs),
        )),
        _ => Arc::new(DeterministicEnhancer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    struct Scripted(&'static str);

    impl TextGenerator for Scripted {
        fn generate(&self, _prompt: &str) -> Result<String, EnhancementFailure> {
            Ok(self.0.to_string())
        }

        fn name(&self) -> &str {
            "Scripted"
        }
    }

    struct Slow;

    impl TextGenerator for Slow {
        fn generate(&self, _prompt: &str) -> Result<String, EnhancementFailure> {
            thread::sleep(Duration::from_secs(5));
            Ok("too late".to_string())
        }

        fn name(&self) -> &str {
            "Slow"
        }
    }

    struct Panicking;

    impl TextGenerator for Panicking {
        fn generate(&self, _prompt: &str) -> Result<String, EnhancementFailure> {
            panic!("provider bug");
        }

        fn name(&self) -> &str {
            "Panicking"
        }
    }

    #[test]
    fn test_provider_text_is_trimmed() {
        let enhancer = ProviderEnhancer::new(Arc::new(Scripted("  Narrative.  ")), Duration::from_secs(1));
        assert_eq!(enhancer.enhance("prompt").unwrap(), "Narrative.");
    }

    #[test]
    fn test_empty_response_is_malformed() {
        let enhancer = ProviderEnhancer::new(Arc::new(Scripted("   ")), Duration::from_secs(1));
        assert!(matches!(
            enhancer.enhance("prompt"),
            Err(EnhancementFailure::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_slow_provider_times_out() {
        let enhancer = ProviderEnhancer::new(Arc::new(Slow), Duration::from_millis(50));
        let start = Instant::now();
        assert_eq!(
            enhancer.enhance("prompt"),
            Err(EnhancementFailure::Timeout(Duration::from_millis(50)))
        );
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    // Test builds always unwind; under the abort profiles this panic would end the process.
    #[test]
    fn test_panicking_provider_is_absorbed() {
        let enhancer = ProviderEnhancer::new(Arc::new(Panicking), Duration::from_secs(1));
        assert!(matches!(
            enhancer.enhance("prompt"),
            Err(EnhancementFailure::Provider(_))
        ));
    }

    #[test]
    fn test_enhancer_for_respects_config() {
        let disabled = EngineConfig {
            use_ai_enhancement: false,
            ..EngineConfig::default()
        };
        let generator: Arc<dyn TextGenerator> = Arc::new(Scripted("text"));

        let enhancer = enhancer_for(&disabled, Some(Arc::clone(&generator)));
        assert_eq!(enhancer.describe(), "deterministic");

        let enhancer = enhancer_for(&EngineConfig::default(), Some(generator));
        assert_eq!(enhancer.describe(), "Scripted");

        let enhancer = enhancer_for(&EngineConfig::default(), None);
        assert_eq!(enhancer.enhance("x"), Err(EnhancementFailure::Unavailable));
    }
}
