//! Error types for the analysis engine and report pipeline.
//!
//! Errors are split by the layer that raises them:
//!
//! - [`ValidationError`]: a request was rejected before any computation ran.
//! - [`ReportError`]: the report composer could not resolve or use a template.
//! - [`AnalysisError`]: the crate-level error wrapping the above plus IO,
//!   Polars and JSON failures.
//!
//! Computation failures are deliberately *not* errors: they are captured in
//! [`crate::result::AnalysisResult`] as `status = failed` with a
//! [`crate::result::FailureReason`].
//!
//! [`AnalysisError`] is serializable as `{code, message}` so front ends can
//! branch on the code.

use crate::dataset::ColumnKind;
use crate::request::{AnalysisMethod, Role};
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// Reasons a request is rejected by the method validator.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// A role the method requires was not bound to any column.
    #[error("{method} requires the '{role}' role to be bound")]
    MissingRole { method: AnalysisMethod, role: Role },

    /// A bound column does not exist in the dataset.
    #[error("Column '{0}' not found in dataset")]
    UnknownColumn(String),

    /// A bound column has a kind the role does not accept.
    #[error("Column '{column}' is {found} but role '{role}' expects {expected}")]
    WrongColumnKind {
        column: String,
        role: Role,
        expected: String,
        found: ColumnKind,
    },

    /// A role received fewer or more columns than the method accepts.
    #[error("Role '{role}' accepts {expected} column(s), got {found}")]
    WrongColumnCount {
        role: Role,
        expected: String,
        found: usize,
    },

    /// A role was bound that the method does not use.
    #[error("{method} does not use the '{role}' role")]
    UnexpectedRole { method: AnalysisMethod, role: Role },

    /// A method parameter is out of range or of the wrong type.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The sample available to the method is below its documented floor.
    #[error("Insufficient sample for {method}: {detail} (need {required}, have {found})")]
    InsufficientSample {
        method: AnalysisMethod,
        detail: String,
        required: usize,
        found: usize,
    },
}

impl ValidationError {
    /// Stable error code for front-end handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingRole { .. } => "MISSING_ROLE",
            Self::UnknownColumn(_) => "UNKNOWN_COLUMN",
            Self::WrongColumnKind { .. } => "WRONG_COLUMN_KIND",
            Self::WrongColumnCount { .. } => "WRONG_COLUMN_COUNT",
            Self::UnexpectedRole { .. } => "UNEXPECTED_ROLE",
            Self::InvalidParameter { .. } => "INVALID_PARAMETER",
            Self::InsufficientSample { .. } => "INSUFFICIENT_SAMPLE",
        }
    }
}

/// Errors raised by the report composer and template registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReportError {
    /// No template is registered under the requested name.
    #[error("Unknown report template '{0}'")]
    UnknownTemplate(String),

    /// The template produced no sections at all.
    #[error("Template '{0}' has no sections to compose")]
    NoSections(String),

    /// The template definition is malformed.
    #[error("Invalid template '{name}': {reason}")]
    InvalidTemplate { name: String, reason: String },
}

/// The main error type for the analysis crate.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Request rejected before computation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Report composition failed.
    #[error(transparent)]
    Report(#[from] ReportError),

    /// Invalid engine configuration.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigValidationError),

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Column values could not be read as the requested kind.
    #[error("Failed to read column '{column}' as {target}: {reason}")]
    ColumnConversion {
        column: String,
        target: String,
        reason: String,
    },

    /// Internal error (e.g., worker thread failure).
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AnalysisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.error_code(),
            Self::Report(ReportError::UnknownTemplate(_)) => "UNKNOWN_TEMPLATE",
            Self::Report(ReportError::NoSections(_)) => "NO_SECTIONS",
            Self::Report(ReportError::InvalidTemplate { .. }) => "INVALID_TEMPLATE",
            Self::Config(_) => "INVALID_CONFIG",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::ColumnConversion { .. } => "COLUMN_CONVERSION_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether the caller can fix this by changing the request.
    pub fn is_request_error(&self) -> bool {
        match self {
            Self::Validation(_) | Self::ColumnNotFound(_) | Self::Report(_) => true,
            Self::WithContext { source, .. } => source.is_request_error(),
            _ => false,
        }
    }
}

impl Serialize for AnalysisError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AnalysisError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalysisError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            AnalysisError::ColumnNotFound("age".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        let missing = ValidationError::MissingRole {
            method: AnalysisMethod::Anova,
            role: Role::Grouping,
        };
        assert_eq!(AnalysisError::from(missing).error_code(), "MISSING_ROLE");
    }

    #[test]
    fn test_validation_message_names_role() {
        let error = ValidationError::MissingRole {
            method: AnalysisMethod::IndependentTTest,
            role: Role::Dependent,
        };
        assert!(error.to_string().contains("dependent"));
        assert!(error.to_string().contains("independent_t_test"));
    }

    #[test]
    fn test_is_request_error() {
        assert!(AnalysisError::from(ReportError::UnknownTemplate("x".into())).is_request_error());
        assert!(!AnalysisError::Internal("boom".into()).is_request_error());
        assert!(
            AnalysisError::ColumnNotFound("x".into())
                .with_context("Reading items")
                .is_request_error()
        );
    }

    #[test]
    fn test_error_serialization() {
        let error = AnalysisError::from(ReportError::UnknownTemplate("thesis".to_string()));
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("UNKNOWN_TEMPLATE"));
        assert!(json.contains("thesis"));
    }

    #[test]
    fn test_with_context() {
        let error = AnalysisError::ColumnNotFound("q1".to_string()).with_context("During validation");
        assert!(error.to_string().contains("During validation"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND");
    }
}
