//! Report composer: template + keyed results -> ordered report sections.
//!
//! Composition never fails because of the data. A section whose results are
//! all absent becomes a placeholder, a failed result becomes a limitation
//! sentence, and any enhancement failure falls back to the deterministic
//! narrative. Only template problems surface as [`ReportError`].

use super::narrative::{build_prompt, deterministic_narrative, failure_sentence};
use super::templates::{SectionSpec, Template, TemplateRegistry};
use crate::ai::{DeterministicEnhancer, NarrativeEnhancer};
use crate::error::ReportError;
use crate::result::{AnalysisResult, FigureDescriptor, ResultSet, Status, Table};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a section's narrative came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Ai,
    Fallback,
}

/// One piece of section content, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum ContentBlock {
    Narrative(String),
    /// Limitation or placeholder text.
    Note(String),
    Table {
        source: String,
        key: String,
        table: Table,
    },
    Figure {
        source: String,
        figure: FigureDescriptor,
    },
}

/// A composed section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub key: String,
    pub title: String,
    pub blocks: Vec<ContentBlock>,
    pub provenance: Provenance,
    /// Source keys that had a result.
    #[serde(default)]
    pub sources_used: Vec<String>,
    /// Source keys with no result in the set.
    #[serde(default)]
    pub sources_missing: Vec<String>,
}

impl ReportSection {
    /// Whether the section carries nothing but placeholder text.
    pub fn is_placeholder(&self) -> bool {
        self.sources_used.is_empty()
    }

    pub fn narrative(&self) -> Option<&str> {
        self.blocks.iter().find_map(|b| match b {
            ContentBlock::Narrative(text) => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn notes(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|b| match b {
            ContentBlock::Note(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Sections of one template, stamped with the generation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposedReport {
    pub template: String,
    pub generated_at: String,
    pub sections: Vec<ReportSection>,
}

impl ComposedReport {
    /// Number of sections whose narrative came from the AI provider.
    pub fn enhanced_sections(&self) -> usize {
        self.sections
            .iter()
            .filter(|s| s.provenance == Provenance::Ai)
            .count()
    }
}

/// Composes report sections from analysis results.
///
/// # Example
///
/// ```rust,ignore
/// use lex_analysis::reporting::{ReportComposer, TemplateRegistry};
///
/// let registry = TemplateRegistry::with_builtins();
/// let report = ReportComposer::deterministic().generate(&registry, "academic_paper", &results)?;
/// for section in &report.sections {
///     println!("{} ({:?})", section.title, section.provenance);
/// }
/// ```
pub struct ReportComposer {
    enhancer: Arc<dyn NarrativeEnhancer>,
}

static_assertions::assert_impl_all!(ReportComposer: Send, Sync);

impl Default for ReportComposer {
    fn default() -> Self {
        Self::deterministic()
    }
}

impl ReportComposer {
    pub fn new(enhancer: Arc<dyn NarrativeEnhancer>) -> Self {
        Self { enhancer }
    }

    /// A composer that never calls an AI provider.
    pub fn deterministic() -> Self {
        Self::new(Arc::new(DeterministicEnhancer))
    }

    /// Resolve `name` once and compose its sections.
    pub fn generate(
        &self,
        registry: &TemplateRegistry,
        name: &str,
        results: &ResultSet,
    ) -> Result<ComposedReport, ReportError> {
        let template = registry.resolve(name)?;
        let sections = self.compose(&template, results)?;
        Ok(ComposedReport {
            template: template.name.clone(),
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            sections,
        })
    }

    /// Compose every section of a template, in template order.
    pub fn compose(
        &self,
        template: &Template,
        results: &ResultSet,
    ) -> Result<Vec<ReportSection>, ReportError> {
        if template.sections.is_empty() {
            return Err(ReportError::NoSections(template.name.clone()));
        }
        info!(
            "Composing '{}' ({} sections, {} results) with {} narratives",
            template.name,
            template.sections.len(),
            results.len(),
            self.enhancer.describe()
        );

        let sections: Vec<ReportSection> = template
            .sections
            .iter()
            .map(|spec| self.compose_section(spec, results))
            .collect();

        let placeholders = sections.iter().filter(|s| s.is_placeholder()).count();
        if placeholders > 0 {
            warn!(
                "{} of {} sections of '{}' have no results",
                placeholders,
                sections.len(),
                template.name
            );
        }
        Ok(sections)
    }

    fn compose_section(&self, spec: &SectionSpec, results: &ResultSet) -> ReportSection {
        let mut present: Vec<(&str, &AnalysisResult)> = Vec::new();
        let mut missing: Vec<String> = Vec::new();
        for source in &spec.sources {
            match results.get(source) {
                Some(result) => present.push((source.as_str(), result)),
                None => missing.push(source.clone()),
            }
        }

        if present.is_empty() {
            debug!("Section '{}' has no results", spec.key);
            return placeholder(spec, missing);
        }

        let (usable, failed): (Vec<(&str, &AnalysisResult)>, Vec<_>) = present
            .iter()
            .copied()
            .partition(|(_, r)| r.status != Status::Failed);

        let mut blocks = Vec::new();
        let mut provenance = Provenance::Fallback;
        if !usable.is_empty() {
            let prompt = build_prompt(spec, &usable);
            match self.enhancer.enhance(&prompt) {
                Ok(text) => {
                    provenance = Provenance::Ai;
                    blocks.push(ContentBlock::Narrative(text));
                }
                Err(failure) => {
                    warn!("Section '{}' uses the fallback narrative: {}", spec.key, failure);
                    blocks.push(ContentBlock::Narrative(deterministic_narrative(&usable)));
                }
            }
        }

        for (_, result) in &failed {
            blocks.push(ContentBlock::Note(failure_sentence(
                result.method.label(),
                result,
            )));
        }
        if !missing.is_empty() {
            blocks.push(ContentBlock::Note(format!(
                "This section is incomplete: no results were available for {}.",
                missing.join(", ")
            )));
        }

        for (source, result) in &usable {
            if spec.include_tables {
                for (key, table) in &result.tables {
                    blocks.push(ContentBlock::Table {
                        source: source.to_string(),
                        key: key.clone(),
                        table: table.clone(),
                    });
                }
            }
            if spec.include_figures {
                for figure in &result.figures {
                    blocks.push(ContentBlock::Figure {
                        source: source.to_string(),
                        figure: figure.clone(),
                    });
                }
            }
        }

        ReportSection {
            key: spec.key.clone(),
            title: spec.title.clone(),
            blocks,
            provenance,
            sources_used: present.iter().map(|(k, _)| k.to_string()).collect(),
            sources_missing: missing,
        }
    }
}

fn placeholder(spec: &SectionSpec, missing: Vec<String>) -> ReportSection {
    let text = if missing.is_empty() {
        format!("No analyses are assigned to \"{}\".", spec.title)
    } else {
        format!(
            "No results are available for \"{}\". The following analyses were not run or were rejected: {}.",
            spec.title,
            missing.join(", ")
        )
    };
    ReportSection {
        key: spec.key.clone(),
        title: spec.title.clone(),
        blocks: vec![ContentBlock::Note(text)],
        provenance: Provenance::Fallback,
        sources_used: Vec::new(),
        sources_missing: missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::EnhancementFailure;
    use crate::request::AnalysisMethod;
    use crate::result::{FailureReason, Finding};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    struct Fixed(&'static str);

    impl NarrativeEnhancer for Fixed {
        fn enhance(&self, _prompt: &str) -> Result<String, EnhancementFailure> {
            Ok(self.0.to_string())
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    struct Failing;

    impl NarrativeEnhancer for Failing {
        fn enhance(&self, _prompt: &str) -> Result<String, EnhancementFailure> {
            Err(EnhancementFailure::Provider("HTTP 500".to_string()))
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    fn reliability() -> AnalysisResult {
        let mut findings = BTreeMap::new();
        findings.insert("cronbach_alpha".to_string(), Finding::Number(0.84));
        findings.insert("n_items".to_string(), Finding::Integer(5));
        findings.insert("n".to_string(), Finding::Integer(120));
        findings.insert("alpha_label".to_string(), Finding::from("good"));
        let mut tables = BTreeMap::new();
        tables.insert("items".to_string(), Table::new("Item statistics", ["item"]));
        AnalysisResult {
            method: AnalysisMethod::Reliability,
            status: Status::Success,
            findings,
            tables,
            algorithms: BTreeMap::new(),
            warnings: Vec::new(),
            figures: Vec::new(),
            failure: None,
        }
    }

    fn template() -> Template {
        Template::new("t", "")
            .section(SectionSpec::new("rel", "Reliability", ["reliability"]))
            .section(SectionSpec::new("mixed", "Mixed", ["reliability", "anova"]).text_only())
            .section(SectionSpec::new("none", "Nothing", ["trend"]))
    }

    #[test]
    fn test_empty_result_set_gives_placeholders() {
        let sections = ReportComposer::new(Arc::new(Fixed("ai")))
            .compose(&template(), &ResultSet::new())
            .unwrap();

        assert_eq!(sections.len(), 3);
        for section in &sections {
            assert!(section.is_placeholder());
            assert_eq!(section.provenance, Provenance::Fallback);
            assert_eq!(section.narrative(), None);
        }
        assert_eq!(sections[1].sources_missing, vec!["reliability", "anova"]);
    }

    #[test]
    fn test_ai_narrative_and_partial_sources() {
        let mut results = ResultSet::new();
        results.insert("reliability".to_string(), reliability());
        let sections = ReportComposer::new(Arc::new(Fixed("Enhanced text.")))
            .compose(&template(), &results)
            .unwrap();

        let rel = &sections[0];
        assert_eq!(rel.provenance, Provenance::Ai);
        assert_eq!(rel.narrative(), Some("Enhanced text."));
        assert!(matches!(rel.blocks[1], ContentBlock::Table { ref key, .. } if key == "items"));

        let mixed = &sections[1];
        assert_eq!(mixed.sources_missing, vec!["anova"]);
        assert!(mixed.notes().any(|n| n.contains("incomplete")));
        assert!(!mixed.blocks.iter().any(|b| matches!(b, ContentBlock::Table { .. })));

        assert!(sections[2].is_placeholder());
    }

    #[test]
    fn test_failing_enhancer_falls_back() {
        let mut results = ResultSet::new();
        results.insert("reliability".to_string(), reliability());
        let sections = ReportComposer::new(Arc::new(Failing))
            .compose(&template(), &results)
            .unwrap();

        assert_eq!(sections[0].provenance, Provenance::Fallback);
        assert!(sections[0].narrative().unwrap().contains("Cronbach's alpha was 0.840"));
    }

    #[test]
    fn test_failed_result_is_a_limitation_without_ai() {
        let mut results = ResultSet::new();
        results.insert(
            "reliability".to_string(),
            AnalysisResult::failed(
                AnalysisMethod::Reliability,
                FailureReason::ZeroVariance("item q3".to_string()),
            ),
        );
        let sections = ReportComposer::new(Arc::new(Fixed("should not be used")))
            .compose(&template(), &results)
            .unwrap();

        let rel = &sections[0];
        assert_eq!(rel.provenance, Provenance::Fallback);
        assert_eq!(rel.narrative(), None);
        assert!(rel.notes().any(|n| n.contains("could not be computed")));
        assert!(!rel.is_placeholder());
    }

    #[test]
    fn test_template_without_sections() {
        let err = ReportComposer::default()
            .compose(&Template::new("bare", ""), &ResultSet::new())
            .unwrap_err();
        assert_eq!(err, ReportError::NoSections("bare".to_string()));
    }

    #[test]
    fn test_generate_resolves_by_name() {
        let registry = TemplateRegistry::with_builtins();
        let composer = ReportComposer::default();

        let report = composer
            .generate(&registry, "executive_summary", &ResultSet::new())
            .unwrap();
        assert_eq!(report.template, "executive_summary");
        assert_eq!(report.enhanced_sections(), 0);

        assert_eq!(
            composer
                .generate(&registry, "missing", &ResultSet::new())
                .unwrap_err(),
            ReportError::UnknownTemplate("missing".to_string())
        );
    }
}
