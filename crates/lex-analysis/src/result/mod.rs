//! The uniform result envelope every analysis returns.
//!
//! Downstream consumers (report composer, UI, CLI) depend only on
//! [`AnalysisResult`]. Every collection field is a plain container that is
//! empty by default, both when constructed in code and when deserialized,
//! so consumers can iterate without null checks.

mod normalize;

pub use normalize::{NormalizeError, RawOutput, normalize, normalize_json};

use crate::request::AnalysisMethod;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Three-state outcome of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Partial,
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Success => "success",
            Status::Partial => "partial",
            Status::Failed => "failed",
        })
    }
}

/// Why a computation produced no findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    #[error("insufficient pairwise sample: need {required}, have {found}")]
    InsufficientPairwiseSample { required: usize, found: usize },

    #[error("singular matrix: {0}")]
    SingularMatrix(String),

    #[error("did not converge: {0}")]
    NonConvergence(String),

    #[error("zero variance: {0}")]
    ZeroVariance(String),

    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error("malformed computer output: {0}")]
    MalformedOutput(String),

    #[error("required finding '{0}' is missing")]
    MissingFinding(String),

    #[error("none of the {0} requested algorithms succeeded")]
    AllAlgorithmsFailed(usize),
}

/// One named finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Finding {
    Integer(i64),
    Number(f64),
    Flag(bool),
    Text(String),
    Interval { lower: f64, upper: f64, level: f64 },
}

impl Finding {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Finding::Number(v) => Some(*v),
            Finding::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Finding::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Finding::Flag(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether the value can be reported (numbers must be finite).
    pub fn is_reportable(&self) -> bool {
        match self {
            Finding::Number(v) => v.is_finite(),
            Finding::Interval { lower, upper, .. } => lower.is_finite() && upper.is_finite(),
            Finding::Text(s) => !s.is_empty(),
            _ => true,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::Integer(v) => write!(f, "{}", v),
            Finding::Number(v) => write!(f, "{:.3}", v),
            Finding::Flag(v) => write!(f, "{}", if *v { "yes" } else { "no" }),
            Finding::Text(s) => f.write_str(s),
            Finding::Interval {
                lower,
                upper,
                level,
            } => write!(f, "[{:.3}, {:.3}] ({:.0}%)", lower, upper, level * 100.0),
        }
    }
}

impl From<f64> for Finding {
    fn from(v: f64) -> Self {
        Finding::Number(v)
    }
}

impl From<usize> for Finding {
    fn from(v: usize) -> Self {
        Finding::Integer(v as i64)
    }
}

impl From<i64> for Finding {
    fn from(v: i64) -> Self {
        Finding::Integer(v)
    }
}

impl From<bool> for Finding {
    fn from(v: bool) -> Self {
        Finding::Flag(v)
    }
}

impl From<&str> for Finding {
    fn from(v: &str) -> Self {
        Finding::Text(v.to_string())
    }
}

impl From<String> for Finding {
    fn from(v: String) -> Self {
        Finding::Text(v)
    }
}

/// A table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        if v.is_finite() { Cell::Number(v) } else { Cell::Empty }
    }
}

impl From<Option<f64>> for Cell {
    fn from(v: Option<f64>) -> Self {
        v.map(Cell::from).unwrap_or(Cell::Empty)
    }
}

impl From<usize> for Cell {
    fn from(v: usize) -> Self {
        Cell::Number(v as f64)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(v) if v.fract() == 0.0 && v.abs() < 1e9 => write!(f, "{}", *v as i64),
            Cell::Number(v) => write!(f, "{:.3}", v),
            Cell::Text(s) => f.write_str(s),
            Cell::Empty => f.write_str("-"),
        }
    }
}

/// Tabular sub-result (descriptives by group, loading matrices, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new<I, S>(title: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: title.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Kind of chart a figure descriptor describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FigureKind {
    Bar,
    Line,
    Scatter,
    Heatmap,
    Scree,
    Histogram,
}

/// One data series of a figure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FigureSeries {
    pub name: String,
    /// Category labels; empty when `x` carries numeric positions.
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub x: Vec<f64>,
    #[serde(default)]
    pub y: Vec<f64>,
}

/// Chart data handed to an external renderer (no pixels).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureDescriptor {
    pub kind: FigureKind,
    pub title: String,
    #[serde(default)]
    pub series: Vec<FigureSeries>,
}

impl FigureDescriptor {
    pub fn new(kind: FigureKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            series: Vec::new(),
        }
    }

    pub fn with_series(mut self, series: FigureSeries) -> Self {
        self.series.push(series);
        self
    }
}

/// Outcome of one algorithm within a multi-algorithm method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmOutcome {
    pub status: Status,
    #[serde(default)]
    pub findings: BTreeMap<String, Finding>,
    #[serde(default)]
    pub failure: Option<FailureReason>,
}

impl AlgorithmOutcome {
    pub fn succeeded(findings: BTreeMap<String, Finding>) -> Self {
        Self {
            status: Status::Success,
            findings,
            failure: None,
        }
    }

    pub fn failed(reason: FailureReason) -> Self {
        Self {
            status: Status::Failed,
            findings: BTreeMap::new(),
            failure: Some(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status != Status::Failed
    }
}

/// Uniform envelope for every analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub method: AnalysisMethod,
    pub status: Status,
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

impl AnalysisResult {
    /// A failed result with no findings.
    pub fn failed(method: AnalysisMethod, reason: FailureReason) -> Self {
        Self {
            method,
            status: Status::Failed,
            findings: BTreeMap::new(),
            tables: BTreeMap::new(),
            algorithms: BTreeMap::new(),
            warnings: Vec::new(),
            figures: Vec::new(),
            failure: Some(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn is_failed(&self) -> bool {
        self.status == Status::Failed
    }

    pub fn finding(&self, name: &str) -> Option<&Finding> {
        self.findings.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.findings.get(name).and_then(Finding::as_f64)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.findings.get(name).and_then(Finding::as_text)
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.findings.get(name).and_then(Finding::as_flag)
    }
}

/// Results keyed by the role a report template expects ("correlation", "reliability", ...).
pub type ResultSet = BTreeMap<String, AnalysisResult>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_collections_default_to_empty() {
        let json = r#"{ "method": "pca", "status": "partial" }"#;
        let result: AnalysisResult = serde_json::from_str(json).unwrap();

        assert!(result.findings.is_empty());
        assert!(result.tables.is_empty());
        assert!(result.algorithms.is_empty());
        assert!(result.warnings.is_empty());
        assert!(result.figures.is_empty());
        assert!(result.failure.is_none());
    }

    #[test]
    fn test_failed_constructor() {
        let result = AnalysisResult::failed(
            AnalysisMethod::Correlation,
            FailureReason::InsufficientPairwiseSample {
                required: 3,
                found: 2,
            },
        );
        assert!(result.is_failed());
        assert!(result.findings.is_empty());
        assert!(result.failure.unwrap().to_string().contains("need 3, have 2"));
    }

    #[test]
    fn test_finding_display_and_access() {
        assert_eq!(Finding::Number(0.12345).to_string(), "0.123");
        assert_eq!(Finding::Integer(12).as_f64(), Some(12.0));
        assert!(!Finding::Number(f64::NAN).is_reportable());
        let ci = Finding::Interval {
            lower: 0.1,
            upper: 0.5,
            level: 0.95,
        };
        assert_eq!(ci.to_string(), "[0.100, 0.500] (95%)");
    }

    #[test]
    fn test_cell_from_non_finite_is_empty() {
        assert_eq!(Cell::from(f64::INFINITY), Cell::Empty);
        assert_eq!(Cell::from(None), Cell::Empty);
        assert_eq!(Cell::from(3.0).to_string(), "3");
    }
}
