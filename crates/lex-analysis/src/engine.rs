//! Analysis engine: validator, statistic computer and normalizer in sequence.
//!
//! The engine is the only entry point that runs a computation. A request
//! rejected by the validator surfaces as a [`ValidationError`]; anything that
//! goes wrong after validation is folded into a `failed` [`AnalysisResult`].

use crate::computers::computer_for;
use crate::config::EngineConfig;
use crate::dataset::Dataset;
use crate::error::{Result, ValidationError};
use crate::request::AnalysisRequest;
use crate::result::{AnalysisResult, FailureReason, ResultSet, normalize};
use crate::validation::MethodValidator;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Runs analysis requests against a dataset.
///
/// # Example
///
/// ```rust,ignore
/// use lex_analysis::{AnalysisEngine, AnalysisMethod, AnalysisRequest, Dataset, Role};
///
/// let dataset = Dataset::from_frame(df);
/// let request = AnalysisRequest::new(AnalysisMethod::Correlation)
///     .bind(Role::Variables, "a")
///     .bind(Role::Variables, "b");
///
/// let result = AnalysisEngine::default().run(&dataset, &request)?;
/// println!("{}: {}", result.method, result.status);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AnalysisEngine {
    config: EngineConfig,
    validator: MethodValidator,
}

static_assertions::assert_impl_all!(AnalysisEngine: Send, Sync);

impl AnalysisEngine {
    /// Create an engine with a validated configuration.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            validator: MethodValidator::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate and run one request.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] when the request does not fit the
    /// dataset. Computation problems are reported as a `failed` result.
    pub fn run(
        &self,
        dataset: &Dataset,
        request: &AnalysisRequest,
    ) -> std::result::Result<AnalysisResult, ValidationError> {
        let method = request.method;
        let bound = self.validator.validate(dataset, request)?;

        let start = Instant::now();
        let computer = computer_for(method.family());
        let raw = match computer.compute(dataset, &bound, &self.config) {
            Ok(raw) => raw,
            Err(e) => {
                error!("{} computation error: {}", method, e);
                return Ok(AnalysisResult::failed(
                    method,
                    FailureReason::DegenerateInput(e.to_string()),
                ));
            }
        };

        let result = match normalize(method, raw) {
            Ok(result) => result,
            Err(e) => {
                error!("{} output rejected by normalizer: {}", method, e);
                AnalysisResult::failed(method, FailureReason::MalformedOutput(e.to_string()))
            }
        };

        match &result.failure {
            Some(reason) => info!("{} failed: {}", method, reason),
            None => info!(
                "{} finished with status {} in {:.2?} ({} warnings)",
                method,
                result.status,
                start.elapsed(),
                result.warnings.len()
            ),
        }
        Ok(result)
    }

    /// Run keyed requests and collect their results for the report composer.
    ///
    /// A request the validator rejects is logged and left out of the set, so
    /// the composer treats its key as absent.
    pub fn run_batch<K: AsRef<str>>(
        &self,
        dataset: &Dataset,
        requests: &[(K, AnalysisRequest)],
    ) -> ResultSet {
        let mut results = ResultSet::new();
        for (key, request) in requests {
            let key = key.as_ref();
            match self.run(dataset, request) {
                Ok(result) => {
                    debug!("Result '{}' -> {}", key, result.status);
                    results.insert(key.to_string(), result);
                }
                Err(e) => warn!("Skipping '{}': {}", key, e),
            }
        }
        info!(
            "Batch complete: {} of {} requests produced results",
            results.len(),
            requests.len()
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{AnalysisMethod, Role};
    use crate::result::Status;
    use polars::prelude::*;

    fn dataset() -> Dataset {
        let df = df![
            "a" => [Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)],
            "b" => [Some(2.0), None, Some(3.0), Some(4.0), Some(5.0)],
            "g" => ["x", "y", "x", "y", "x"],
        ]
        .unwrap();
        Dataset::from_frame(df)
    }

    fn correlation() -> AnalysisRequest {
        AnalysisRequest::new(AnalysisMethod::Correlation)
            .bind(Role::Variables, "a")
            .bind(Role::Variables, "b")
    }

    // ===== Single runs =====

    #[test]
    fn test_run_uses_pairwise_rows() {
        let result = AnalysisEngine::default()
            .run(&dataset(), &correlation())
            .unwrap();
        assert_eq!(result.status, Status::Success);
        assert_eq!(result.number("n"), Some(3.0));
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let request = AnalysisRequest::new(AnalysisMethod::Correlation)
            .bind(Role::Variables, "a")
            .bind(Role::Variables, "missing");
        let err = AnalysisEngine::default()
            .run(&dataset(), &request)
            .unwrap_err();
        assert_eq!(err, ValidationError::UnknownColumn("missing".to_string()));
    }

    #[test]
    fn test_invalid_config_is_refused() {
        let config = EngineConfig {
            alpha: 2.0,
            ..EngineConfig::default()
        };
        assert!(AnalysisEngine::new(config).is_err());
    }

    // ===== Batches =====

    #[test]
    fn test_batch_skips_rejected_requests() {
        let requests = vec![
            ("correlation", correlation()),
            (
                "broken",
                AnalysisRequest::new(AnalysisMethod::Correlation).bind(Role::Variables, "nope"),
            ),
        ];
        let results = AnalysisEngine::default().run_batch(&dataset(), &requests);

        assert_eq!(results.len(), 1);
        assert!(results.contains_key("correlation"));
    }
}
