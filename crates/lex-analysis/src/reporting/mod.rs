//! Report composition.
//!
//! Turns a keyed [`ResultSet`](crate::result::ResultSet) into ordered report
//! sections following a [`Template`]:
//!
//! - [`TemplateRegistry`] resolves template names (built-ins plus templates
//!   registered in code or loaded from JSON).
//! - [`ReportComposer`] walks the template's sections, pulls the results each
//!   one names and writes the narrative through a
//!   [`NarrativeEnhancer`](crate::ai::NarrativeEnhancer), falling back to a
//!   deterministic narrative.
//!
//! Rendering (Markdown, Word, PDF) is left to the caller; sections carry
//! text, tables and figure descriptors only.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_analysis::reporting::{ReportComposer, TemplateRegistry};
//!
//! let registry = TemplateRegistry::with_builtins();
//! let report = ReportComposer::default().generate(&registry, "technical_report", &results)?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! ```

mod composer;
mod narrative;
mod templates;

pub use composer::{ComposedReport, ContentBlock, Provenance, ReportComposer, ReportSection};
pub use narrative::{DEFAULT_PROMPT, build_prompt, describe_result, deterministic_narrative};
pub use templates::{SectionSpec, Template, TemplateRegistry};
