//! Result normalizer: turns raw computer output into an [`AnalysisResult`].
//!
//! Enforced here, once, so that no consumer has to re-check:
//!
//! - output without a status is rejected;
//! - non-finite numeric findings are dropped with a warning;
//! - a missing required finding turns the result into `failed`;
//! - a missing optional finding downgrades `success` to `partial`;
//! - `failed` results carry no findings and always carry a reason;
//! - multi-algorithm status is derived from the per-algorithm outcomes.

use super::{
    AlgorithmOutcome, AnalysisResult, FailureReason, FigureDescriptor, Finding, Status, Table,
};
use crate::request::AnalysisMethod;
use crate::stats::format::clean_p_value;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Raw output of a statistic computer, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawOutput {
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub findings: BTreeMap<String, Finding>,
    #[serde(default)]
    pub tables: BTreeMap<String, Table>,
    #[serde(default)]
    pub algorithms: BTreeMap<String, AlgorithmOutcome>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub figures: Vec<FigureDescriptor>,
    #[serde(default)]
    pub failure: Option<FailureReason>,
}

impl RawOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output of a computation that could not produce its core statistic.
    pub fn failure(reason: FailureReason) -> Self {
        Self {
            status: Some(Status::Failed),
            failure: Some(reason),
            ..Self::default()
        }
    }

    pub fn finding(&mut self, name: impl Into<String>, value: impl Into<Finding>) {
        self.findings.insert(name.into(), value.into());
    }

    pub fn table(&mut self, key: impl Into<String>, table: Table) {
        self.tables.insert(key.into(), table);
    }

    pub fn figure(&mut self, figure: FigureDescriptor) {
        self.figures.push(figure);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn algorithm(&mut self, name: impl Into<String>, outcome: AlgorithmOutcome) {
        self.algorithms.insert(name.into(), outcome);
    }

    /// Mark the core statistic as computed.
    pub fn succeed(mut self) -> Self {
        self.status = Some(Status::Success);
        self
    }

    /// Mark the core statistic as computed with a caveat.
    pub fn partial(mut self, warning: impl Into<String>) -> Self {
        self.status = Some(Status::Partial);
        self.warnings.push(warning.into());
        self
    }
}

/// Reasons the normalizer refuses a payload.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("computer output has no status")]
    MissingStatus,

    #[error("payload is not a valid result: {0}")]
    Json(#[from] serde_json::Error),
}

/// Wrap raw computer output into the uniform envelope.
pub fn normalize(
    method: AnalysisMethod,
    raw: RawOutput,
) -> Result<AnalysisResult, NormalizeError> {
    let mut status = raw.status.ok_or(NormalizeError::MissingStatus)?;
    let mut findings = raw.findings;
    let mut warnings = raw.warnings;
    let mut failure = raw.failure;
    let algorithms = raw.algorithms;

    if method.is_multi_algorithm() && status != Status::Failed {
        let requested = algorithms.len();
        let succeeded = algorithms.values().filter(|o| o.is_success()).count();
        findings
            .entry("algorithms_requested".to_string())
            .or_insert(Finding::from(requested));
        findings
            .entry("algorithms_succeeded".to_string())
            .or_insert(Finding::from(succeeded));

        for (name, outcome) in algorithms.iter().filter(|(_, o)| !o.is_success()) {
            let reason = outcome
                .failure
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "unknown failure".to_string());
            warnings.push(format!("Algorithm '{}' failed: {}", name, reason));
        }

        if succeeded == 0 {
            status = Status::Failed;
            failure = Some(FailureReason::AllAlgorithmsFailed(requested));
        } else if succeeded < requested {
            status = Status::Partial;
        }
    }

    if status != Status::Failed {
        findings.retain(|name, finding| {
            let keep = finding.is_reportable();
            if !keep {
                warnings.push(format!("Finding '{}' could not be computed", name));
            }
            keep
        });

        let contract = method.contract();
        if let Some(missing) = contract
            .required
            .iter()
            .find(|name| !findings.contains_key(**name))
        {
            debug!("{} result lacks required finding '{}'", method, missing);
            status = Status::Failed;
            failure = Some(FailureReason::MissingFinding((*missing).to_string()));
        } else if status == Status::Success {
            let absent: Vec<&str> = contract
                .optional
                .iter()
                .copied()
                .filter(|name| !findings.contains_key(*name))
                .collect();
            if !absent.is_empty() {
                status = Status::Partial;
                warnings.push(format!("Optional findings unavailable: {}", absent.join(", ")));
            }
        }
    }

    if status == Status::Failed {
        let reason = failure.unwrap_or_else(|| {
            FailureReason::MalformedOutput("failed without a reason".to_string())
        });
        return Ok(AnalysisResult {
            method,
            status,
            findings: BTreeMap::new(),
            tables: BTreeMap::new(),
            algorithms,
            warnings,
            figures: Vec::new(),
            failure: Some(reason),
        });
    }

    Ok(AnalysisResult {
        method,
        status,
        findings,
        tables: raw.tables,
        algorithms,
        warnings,
        figures: raw.figures,
        failure: None,
    })
}

#[derive(Deserialize)]
struct ExternalPayload {
    method: AnalysisMethod,
    #[serde(flatten)]
    output: RawOutput,
}

fn is_p_value_name(name: &str) -> bool {
    name == "p_value" || name.ends_with("_p_value") || name.ends_with("_p")
}

/// Normalize a JSON payload produced outside the crate.
///
/// P-values written as text (`"<0.001"`, `"p=0.03"`) are parsed into
/// numbers; text that does not parse becomes NaN and is dropped like any
/// other non-finite finding.
pub fn normalize_json(payload: serde_json::Value) -> Result<AnalysisResult, NormalizeError> {
    let mut external: ExternalPayload = serde_json::from_value(payload)?;
    for (name, finding) in external.output.findings.iter_mut() {
        if let Finding::Text(text) = finding
            && is_p_value_name(name)
        {
            *finding = Finding::Number(clean_p_value(text).unwrap_or(f64::NAN));
        }
    }
    normalize(external.method, external.output)
}
