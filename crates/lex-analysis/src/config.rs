//! Configuration for the analysis engine and report composer.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic engine setup.

use serde::{Deserialize, Serialize};

/// Configuration shared by the engine, computers and composer.
///
/// Use [`EngineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lex_analysis::config::EngineConfig;
///
/// let config = EngineConfig::builder()
///     .alpha(0.01)
///     .random_seed(7)
///     .use_ai_enhancement(false)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default significance level when a request does not set `alpha`.
    /// Default: 0.05
    pub alpha: f64,

    /// Magnitude below zero that a corrected item-total correlation must
    /// exceed before an item is flagged as reverse-coded.
    /// Default: 0.1
    pub reverse_item_threshold: f64,

    /// Minimum KMO for a variable set to be considered factorable.
    /// Default: 0.6
    pub kmo_threshold: f64,

    /// Seed for k-means initialisation and train/test splits.
    /// Default: 42
    pub random_seed: u64,

    /// Share of rows held out for evaluation in model comparisons.
    /// Default: 0.3
    pub test_fraction: f64,

    /// Iteration cap for iterative fitting (IRLS, k-means, varimax).
    /// Default: 100
    pub max_iterations: usize,

    /// Row cap for algorithms that build a full distance matrix
    /// (hierarchical clustering, MDS, silhouette).
    /// Default: 2000
    pub max_pairwise_rows: usize,

    /// Upper bound on a single AI enhancement call, in seconds.
    /// Default: 30
    pub ai_timeout_secs: u64,

    /// Whether the composer should try the AI enhancement path.
    /// If false or no generator is configured, the deterministic narrative is used.
    /// Default: true
    pub use_ai_enhancement: bool,
}

/// Significance level used when neither the request nor the config sets one.
pub const DEFAULT_ALPHA: f64 = 0.05;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            reverse_item_threshold: 0.1,
            kmo_threshold: 0.6,
            random_seed: 42,
            test_fraction: 0.3,
            max_iterations: 100,
            max_pairwise_rows: 2000,
            ai_timeout_secs: 30,
            use_ai_enhancement: true,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ConfigValidationError::InvalidProbability {
                field: "alpha".to_string(),
                value: self.alpha,
            });
        }

        if !(0.0..1.0).contains(&self.reverse_item_threshold) {
            return Err(ConfigValidationError::InvalidProbability {
                field: "reverse_item_threshold".to_string(),
                value: self.reverse_item_threshold,
            });
        }

        if !(0.0..=1.0).contains(&self.kmo_threshold) {
            return Err(ConfigValidationError::InvalidProbability {
                field: "kmo_threshold".to_string(),
                value: self.kmo_threshold,
            });
        }

        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ConfigValidationError::InvalidProbability {
                field: "test_fraction".to_string(),
                value: self.test_fraction,
            });
        }

        if self.max_iterations == 0 {
            return Err(ConfigValidationError::ZeroLimit("max_iterations".to_string()));
        }

        if self.max_pairwise_rows == 0 {
            return Err(ConfigValidationError::ZeroLimit("max_pairwise_rows".to_string()));
        }

        if self.ai_timeout_secs == 0 {
            return Err(ConfigValidationError::ZeroLimit("ai_timeout_secs".to_string()));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{field}': {value} (must lie strictly between 0.0 and 1.0)")]
    InvalidProbability { field: String, value: f64 },

    #[error("Invalid value for '{0}': must be at least 1")]
    ZeroLimit(String),
}

/// Builder for [`EngineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    alpha: Option<f64>,
    reverse_item_threshold: Option<f64>,
    kmo_threshold: Option<f64>,
    random_seed: Option<u64>,
    test_fraction: Option<f64>,
    max_iterations: Option<usize>,
    max_pairwise_rows: Option<usize>,
    ai_timeout_secs: Option<u64>,
    use_ai_enhancement: Option<bool>,
}

impl EngineConfigBuilder {
    /// Set the default significance level.
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }

    /// Set the reverse-item detection threshold.
    ///
    /// An item is flagged when its corrected item-total correlation is
    /// below `-threshold`.
    pub fn reverse_item_threshold(mut self, threshold: f64) -> Self {
        self.reverse_item_threshold = Some(threshold);
        self
    }

    /// Set the minimum acceptable KMO.
    pub fn kmo_threshold(mut self, threshold: f64) -> Self {
        self.kmo_threshold = Some(threshold);
        self
    }

    /// Set the RNG seed used by stochastic algorithms.
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Set the evaluation hold-out share for model comparisons.
    pub fn test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = Some(fraction);
        self
    }

    /// Set the iteration cap for iterative fitting.
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    /// Set the row cap for distance-matrix algorithms.
    pub fn max_pairwise_rows(mut self, rows: usize) -> Self {
        self.max_pairwise_rows = Some(rows);
        self
    }

    /// Set the AI enhancement timeout in seconds.
    pub fn ai_timeout_secs(mut self, secs: u64) -> Self {
        self.ai_timeout_secs = Some(secs);
        self
    }

    /// Enable or disable AI narrative enhancement.
    pub fn use_ai_enhancement(mut self, use_ai: bool) -> Self {
        self.use_ai_enhancement = Some(use_ai);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `EngineConfig` or an error if validation fails.
    pub fn build(self) -> Result<EngineConfig, ConfigValidationError> {
        let defaults = EngineConfig::default();
        let config = EngineConfig {
            alpha: self.alpha.unwrap_or(defaults.alpha),
            reverse_item_threshold: self
                .reverse_item_threshold
                .unwrap_or(defaults.reverse_item_threshold),
            kmo_threshold: self.kmo_threshold.unwrap_or(defaults.kmo_threshold),
            random_seed: self.random_seed.unwrap_or(defaults.random_seed),
            test_fraction: self.test_fraction.unwrap_or(defaults.test_fraction),
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
            max_pairwise_rows: self.max_pairwise_rows.unwrap_or(defaults.max_pairwise_rows),
            ai_timeout_secs: self.ai_timeout_secs.unwrap_or(defaults.ai_timeout_secs),
            use_ai_enhancement: self.use_ai_enhancement.unwrap_or(defaults.use_ai_enhancement),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.alpha, 0.05);
        assert_eq!(config.reverse_item_threshold, 0.1);
        assert_eq!(config.kmo_threshold, 0.6);
        assert_eq!(config.random_seed, 42);
        assert!(config.use_ai_enhancement);
    }

    #[test]
    fn test_builder_custom_values() {
        let config = EngineConfig::builder()
            .alpha(0.01)
            .random_seed(7)
            .test_fraction(0.25)
            .ai_timeout_secs(5)
            .use_ai_enhancement(false)
            .build()
            .unwrap();

        assert_eq!(config.alpha, 0.01);
        assert_eq!(config.random_seed, 7);
        assert_eq!(config.test_fraction, 0.25);
        assert_eq!(config.ai_timeout_secs, 5);
        assert!(!config.use_ai_enhancement);
    }

    #[test]
    fn test_validation_invalid_alpha() {
        let result = EngineConfig::builder().alpha(1.5).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidProbability { .. }
        ));
    }

    #[test]
    fn test_validation_zero_timeout() {
        let result = EngineConfig::builder().ai_timeout_secs(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::ZeroLimit(field) if field == "ai_timeout_secs"
        ));
    }

    #[test]
    fn test_config_from_partial_json() {
        let json = r#"{ "alpha": 0.1, "use_ai_enhancement": false }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.alpha, 0.1);
        assert!(!config.use_ai_enhancement);
        assert_eq!(config.max_iterations, 100);
        assert!(config.validate().is_ok());
    }
}
