//! Statistical Analysis Engine and Report Composition Library
//!
//! Survey-style statistical analysis over Polars data frames, with a
//! uniform result contract and a report composer that degrades gracefully
//! when results are missing or AI enhancement is unavailable.
//!
//! # Overview
//!
//! - **Validation**: every request is checked against the dataset schema and
//!   sample floors before anything is computed; [`recommend`] suggests
//!   runnable requests from the schema and counts alone
//! - **Statistic Computers**: correlation, crosstabs, t-tests, ANOVA,
//!   regression, factor analysis, PCA, clustering, model comparison, trend,
//!   multi-select items, reliability and questionnaire quality
//! - **Uniform Results**: one [`AnalysisResult`] envelope with a three-state
//!   status, named findings, tables, figure descriptors and warnings
//! - **Report Composition**: templates turn keyed results into ordered
//!   sections, with optional AI-written narrative and a deterministic fallback
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_analysis::{AnalysisEngine, AnalysisMethod, AnalysisRequest, Dataset, Role};
//! use lex_analysis::reporting::{ReportComposer, TemplateRegistry};
//! use polars::prelude::*;
//!
//! let dataset = Dataset::from_frame(df).with_reverse_hints(["q4"]);
//! let engine = AnalysisEngine::default();
//!
//! let results = engine.run_batch(
//!     &dataset,
//!     &[
//!         (
//!             "correlation",
//!             AnalysisRequest::new(AnalysisMethod::Correlation)
//!                 .bind(Role::Variables, "age")
//!                 .bind(Role::Variables, "income"),
//!         ),
//!         (
//!             "reliability",
//!             AnalysisRequest::new(AnalysisMethod::Reliability)
//!                 .bind_all(Role::Items, ["q1", "q2", "q3", "q4"]),
//!         ),
//!     ],
//! );
//!
//! let registry = TemplateRegistry::with_builtins();
//! let report = ReportComposer::default().generate(&registry, "academic_paper", &results)?;
//! ```
//!
//! # AI Enhancement
//!
//! Section narratives can be written by any [`ai::TextGenerator`]. The
//! [`ai::OpenRouterGenerator`] reference implementation is behind the `ai`
//! feature. Every provider failure (timeout, HTTP error, empty response)
//! falls back to the deterministic narrative; see the [`ai`] module.
//!
//! # Configuration
//!
//! ```rust,ignore
//! use lex_analysis::EngineConfig;
//!
//! let config = EngineConfig::builder()
//!     .alpha(0.01)
//!     .random_seed(7)
//!     .ai_timeout_secs(20)
//!     .build()?;
//! let engine = AnalysisEngine::new(config)?;
//! ```

pub mod ai;
pub mod computers;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod reporting;
pub mod request;
pub mod result;
pub mod stats;
pub mod utils;
pub mod validation;

// Re-exports for convenient access
pub use config::{ConfigValidationError, EngineConfig, EngineConfigBuilder};
pub use dataset::{ColumnKind, ColumnSpec, Dataset};
pub use engine::AnalysisEngine;
pub use error::{AnalysisError, ReportError, Result as LexAnalysisResult, ResultExt, ValidationError};
pub use reporting::{
    ComposedReport, ContentBlock, Provenance, ReportComposer, ReportSection, SectionSpec,
    Template, TemplateRegistry,
};
pub use request::{AnalysisMethod, AnalysisRequest, MethodFamily, Parameters, Role, VariableBinding};
pub use result::{
    AlgorithmOutcome, AnalysisResult, Cell, FailureReason, FigureDescriptor, FigureKind,
    FigureSeries, Finding, ResultSet, Status, Table, normalize, normalize_json,
};
pub use validation::{BoundRequest, MethodValidator, Recommendation, recommend};
