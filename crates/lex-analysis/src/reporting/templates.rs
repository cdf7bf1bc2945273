//! Report templates and the registry that resolves them by name.
//!
//! A [`Template`] is an ordered list of [`SectionSpec`]s. Each section names
//! the result keys it draws on (`sources`), so the same analysis results can
//! be laid out as an academic paper, a business report or a one-page
//! summary. Templates are immutable once registered and handed out as
//! `Arc<Template>`.

use crate::error::{AnalysisError, ReportError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One section of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSpec {
    pub key: String,
    pub title: String,
    /// Result keys this section reports on, in display order.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Prompt pattern; `{title}`, `{method}`, `{findings}` and `{warnings}` are substituted.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Writing guidance appended to the prompt.
    #[serde(default)]
    pub guidelines: Option<String>,
    #[serde(default = "default_true")]
    pub include_tables: bool,
    #[serde(default = "default_true")]
    pub include_figures: bool,
}

fn default_true() -> bool {
    true
}

impl SectionSpec {
    pub fn new<I, S>(key: impl Into<String>, title: impl Into<String>, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            title: title.into(),
            sources: sources.into_iter().map(Into::into).collect(),
            prompt: None,
            guidelines: None,
            include_tables: true,
            include_figures: true,
        }
    }

    pub fn with_guidelines(mut self, guidelines: impl Into<String>) -> Self {
        self.guidelines = Some(guidelines.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Narrative only: no tables, no figures.
    pub fn text_only(mut self) -> Self {
        self.include_tables = false;
        self.include_figures = false;
        self
    }
}

/// A named, ordered report layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sections: Vec<SectionSpec>,
}

impl Template {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            sections: Vec::new(),
        }
    }

    pub fn section(mut self, spec: SectionSpec) -> Self {
        self.sections.push(spec);
        self
    }

    /// Check the template can be registered and saved.
    pub fn validate(&self) -> std::result::Result<(), ReportError> {
        let invalid = |reason: &str| ReportError::InvalidTemplate {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(invalid("name may only contain letters, digits, '_' and '-'"));
        }
        if self.sections.is_empty() {
            return Err(invalid("template has no sections"));
        }
        let mut seen = HashSet::new();
        for spec in &self.sections {
            if spec.key.trim().is_empty() {
                return Err(invalid("a section has an empty key"));
            }
            if !seen.insert(spec.key.as_str()) {
                return Err(invalid(&format!("section key '{}' is repeated", spec.key)));
            }
        }
        Ok(())
    }

    /// Every result key any section draws on.
    pub fn source_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for source in self.sections.iter().flat_map(|s| s.sources.iter()) {
            if !keys.contains(&source.as_str()) {
                keys.push(source);
            }
        }
        keys
    }
}

/// Registry resolving template names to shared templates.
///
/// # Example
///
/// ```rust,ignore
/// use lex_analysis::reporting::TemplateRegistry;
///
/// let mut registry = TemplateRegistry::with_builtins();
/// registry.load_dir("templates/")?;
/// let template = registry.resolve("business_report")?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, Arc<Template>>,
}

static_assertions::assert_impl_all!(TemplateRegistry: Send, Sync);

impl TemplateRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in templates.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for template in builtin_templates() {
            registry
                .templates
                .insert(template.name.clone(), Arc::new(template));
        }
        registry
    }

    /// Register a template, replacing any template of the same name.
    pub fn register(&mut self, template: Template) -> std::result::Result<Arc<Template>, ReportError> {
        template.validate()?;
        let template = Arc::new(template);
        if self
            .templates
            .insert(template.name.clone(), Arc::clone(&template))
            .is_some()
        {
            debug!("Replaced template '{}'", template.name);
        }
        Ok(template)
    }

    /// Look a template up by name.
    pub fn resolve(&self, name: &str) -> std::result::Result<Arc<Template>, ReportError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| ReportError::UnknownTemplate(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<Template>> {
        self.templates.remove(name)
    }

    /// Read one template from a JSON file and register it.
    pub fn load_json(&mut self, path: impl AsRef<Path>) -> Result<Arc<Template>> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| AnalysisError::from(e).with_context(format!("Reading {}", path.display())))?;
        let template: Template = serde_json::from_str(&text)
            .map_err(|e| AnalysisError::from(e).with_context(format!("Parsing {}", path.display())))?;
        let template = self.register(template)?;
        info!("Loaded template '{}' from {}", template.name, path.display());
        Ok(template)
    }

    /// Load every `*.json` file of a directory.
    ///
    /// Files that cannot be read or are not valid templates are skipped with a
    /// warning. Returns the names that were registered.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<Vec<String>> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| AnalysisError::from(e).with_context(format!("Listing {}", dir.display())))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut loaded = Vec::new();
        for path in paths {
            match self.load_json(&path) {
                Ok(template) => loaded.push(template.name.clone()),
                Err(e) => warn!("Skipping template file {}: {}", path.display(), e),
            }
        }
        Ok(loaded)
    }

    /// Write a template to `<dir>/<name>.json`.
    pub fn save(template: &Template, dir: impl AsRef<Path>) -> Result<PathBuf> {
        template.validate()?;
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.json", template.name));
        fs::write(&path, serde_json::to_string_pretty(template)?)?;
        info!("Template saved: {}", path.display());
        Ok(path)
    }
}

fn builtin_templates() -> Vec<Template> {
    vec![
        Template::new(
            "academic_paper",
            "Journal-style paper: methods, results by analysis family, discussion",
        )
        .section(
            SectionSpec::new("abstract", "Abstract", ["descriptive", "correlation", "regression"])
                .with_guidelines("150 to 250 words covering aim, method, main results and conclusion.")
                .text_only(),
        )
        .section(
            SectionSpec::new("methodology", "Method", ["descriptive", "reliability"])
                .with_guidelines("Describe the sample, the measures and their reliability."),
        )
        .section(
            SectionSpec::new(
                "results_association",
                "Results: Associations",
                ["correlation", "crosstab"],
            )
            .with_guidelines("Report coefficients with p-values in APA style."),
        )
        .section(
            SectionSpec::new(
                "results_differences",
                "Results: Group Differences",
                ["t_test", "paired_t_test", "anova"],
            )
            .with_guidelines("Report test statistics, degrees of freedom, p-values and effect sizes."),
        )
        .section(
            SectionSpec::new(
                "results_models",
                "Results: Models",
                ["regression", "logistic_regression", "factor_analysis"],
            )
            .with_guidelines("Report model fit first, then individual predictors or loadings."),
        )
        .section(
            SectionSpec::new("discussion", "Discussion", ["correlation", "regression", "anova"])
                .with_guidelines("Interpret the findings and name the limitations of the data.")
                .text_only(),
        ),
        Template::new(
            "business_report",
            "Decision-oriented report: key findings, detailed analysis, recommendations",
        )
        .section(
            SectionSpec::new(
                "executive_summary",
                "Executive Summary",
                ["descriptive", "frequency", "correlation"],
            )
            .with_guidelines("Lead with the business-relevant findings in plain language.")
            .text_only(),
        )
        .section(
            SectionSpec::new("key_findings", "Key Findings", ["frequency", "crosstab", "anova"])
                .with_guidelines("Three to five findings, each backed by a number."),
        )
        .section(
            SectionSpec::new(
                "segmentation",
                "Customer Segments",
                ["clustering", "dimensionality_reduction"],
            )
            .with_guidelines("Describe the segments and how distinct they are."),
        )
        .section(
            SectionSpec::new(
                "drivers",
                "Drivers and Predictions",
                ["regression", "classification", "regression_comparison"],
            )
            .with_guidelines("Explain which factors matter most and how well outcomes can be predicted."),
        )
        .section(
            SectionSpec::new("trends", "Trends", ["trend"])
                .with_guidelines("State the direction and size of change over time."),
        )
        .section(
            SectionSpec::new("recommendations", "Recommendations", ["crosstab", "regression", "trend"])
                .with_guidelines("Concrete, prioritised actions that follow from the results.")
                .text_only(),
        ),
        Template::new(
            "technical_report",
            "Full technical account of every analysis with all tables and figures",
        )
        .section(SectionSpec::new("data", "Data Description", ["descriptive", "frequency"]))
        .section(SectionSpec::new(
            "inference",
            "Statistical Tests",
            ["correlation", "crosstab", "t_test", "paired_t_test", "anova"],
        ))
        .section(SectionSpec::new(
            "modelling",
            "Modelling",
            [
                "regression",
                "logistic_regression",
                "classification",
                "regression_comparison",
            ],
        ))
        .section(SectionSpec::new(
            "structure",
            "Latent Structure and Segmentation",
            ["factor_analysis", "pca", "clustering", "dimensionality_reduction"],
        ))
        .section(SectionSpec::new("time_series", "Time Series", ["trend"]))
        .section(SectionSpec::new(
            "measurement",
            "Measurement Quality",
            ["reliability", "quality", "multi_select"],
        )),
        Template::new(
            "executive_summary",
            "One-page summary with headline findings and next steps",
        )
        .section(
            SectionSpec::new(
                "headline",
                "Headline",
                ["correlation", "anova", "regression", "trend"],
            )
            .with_guidelines("One or two sentences with the single most important result.")
            .text_only(),
        )
        .section(
            SectionSpec::new(
                "key_findings",
                "Key Findings",
                ["descriptive", "crosstab", "t_test", "clustering"],
            )
            .with_guidelines("Bullet points, each with a supporting number.")
            .text_only(),
        )
        .section(
            SectionSpec::new("next_steps", "Next Steps", ["trend", "classification"])
                .with_guidelines("Clear actions and what to measure next.")
                .text_only(),
        ),
        Template::new(
            "questionnaire_report",
            "Survey instrument report: response quality, reliability and item analysis",
        )
        .section(
            SectionSpec::new("sample", "Sample and Responses", ["descriptive", "frequency"])
                .with_guidelines("Describe who answered and how complete the responses are."),
        )
        .section(
            SectionSpec::new("quality", "Questionnaire Quality", ["quality"])
                .with_guidelines("Report the quality score, flagged items and reverse-coded items."),
        )
        .section(
            SectionSpec::new("reliability", "Reliability", ["reliability"])
                .with_guidelines("Report Cronbach's alpha and items that weaken the scale."),
        )
        .section(
            SectionSpec::new("validity", "Construct Validity", ["factor_analysis"])
                .with_guidelines("Report sampling adequacy and the factor structure."),
        )
        .section(
            SectionSpec::new("multi_select", "Multiple-Choice Items", ["multi_select"])
                .with_guidelines("Report selection rates and the most common combinations."),
        ),
    ]
}
