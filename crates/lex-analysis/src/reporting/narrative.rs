//! Section prompts and the deterministic narrative.
//!
//! Both are built from the same material: the findings and warnings of the
//! results a section draws on. The deterministic narrative is what a reader
//! gets whenever AI enhancement is disabled or fails, so it has to stand on
//! its own.

use super::templates::SectionSpec;
use crate::config::DEFAULT_ALPHA;
use crate::result::{AnalysisResult, Finding, Status};
use crate::request::AnalysisMethod;
use crate::stats::format::format_p_value;

/// Prompt used when a section spec has none.
pub const DEFAULT_PROMPT: &str = "Write the \"{title}\" section of a statistical report.\n\n\
Analyses: {method}\n\n\
Findings:\n{findings}\n\n\
Caveats:\n{warnings}\n\n\
Use only the numbers above. Write two to four short paragraphs of plain prose.";

/// Fill a section's prompt pattern from the present results.
pub fn build_prompt(spec: &SectionSpec, results: &[(&str, &AnalysisResult)]) -> String {
    let methods: Vec<&str> = results.iter().map(|(_, r)| r.method.label()).collect();

    let mut findings = String::new();
    for (key, result) in results {
        for (name, value) in ordered_findings(result) {
            findings.push_str(&format!(
                "- {} ({}): {} = {}\n",
                result.method.label(),
                key,
                name,
                value_text(name, value)
            ));
        }
    }
    let warnings: Vec<String> = results
        .iter()
        .flat_map(|(_, r)| r.warnings.iter().map(|w| format!("- {}", w)))
        .collect();

    let pattern = spec.prompt.as_deref().unwrap_or(DEFAULT_PROMPT);
    let mut prompt = pattern
        .replace("{title}", &spec.title)
        .replace("{method}", &methods.join(", "))
        .replace("{findings}", findings.trim_end())
        .replace(
            "{warnings}",
            &if warnings.is_empty() {
                "- none".to_string()
            } else {
                warnings.join("\n")
            },
        );
    if let Some(guidelines) = &spec.guidelines {
        prompt.push_str("\n\nGuidelines: ");
        prompt.push_str(guidelines);
    }
    prompt
}

/// Plain-language paragraph for one result.
pub fn describe_result(result: &AnalysisResult) -> String {
    let label = result.method.label();
    if result.status == Status::Failed {
        return failure_sentence(label, result);
    }

    let mut text = match headline(result) {
        Some(headline) => format!("{}: {}.", label, headline),
        None => format!("{}: {}.", label, finding_list(result, 6)),
    };
    if result.status == Status::Partial {
        text.push_str(" Some results are incomplete.");
    }
    match result.warnings.len() {
        0 => {}
        1 => text.push_str(&format!(" Note: {}.", result.warnings[0].trim_end_matches('.'))),
        n => text.push_str(&format!(" {} caveats apply; see the warnings.", n)),
    }
    text
}

/// Limitation sentence for a result that could not be computed.
pub fn failure_sentence(label: &str, result: &AnalysisResult) -> String {
    match &result.failure {
        Some(reason) => format!("{} could not be computed ({}).", label, reason),
        None => format!("{} could not be computed.", label),
    }
}

/// Deterministic narrative for a whole section.
pub fn deterministic_narrative(results: &[(&str, &AnalysisResult)]) -> String {
    results
        .iter()
        .map(|(_, r)| describe_result(r))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Findings in contract order: required first, then the rest alphabetically.
fn ordered_findings(result: &AnalysisResult) -> Vec<(&str, &Finding)> {
    let contract = result.method.contract();
    let mut ordered: Vec<(&str, &Finding)> = contract
        .required
        .iter()
        .filter_map(|name| result.findings.get_key_value(*name))
        .map(|(k, v)| (k.as_str(), v))
        .collect();
    for (name, value) in &result.findings {
        if !contract.required.contains(&name.as_str()) {
            ordered.push((name, value));
        }
    }
    ordered
}

fn value_text(name: &str, value: &Finding) -> String {
    match value.as_f64() {
        Some(p) if name.ends_with("p_value") || name.ends_with("_p") => format_p_value(p),
        _ => value.to_string(),
    }
}

fn finding_list(result: &AnalysisResult, limit: usize) -> String {
    ordered_findings(result)
        .into_iter()
        .take(limit)
        .map(|(name, value)| format!("{} = {}", name, value_text(name, value)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn p_text(result: &AnalysisResult) -> String {
    match result.number("p_value") {
        Some(p) if p < 0.001 => "p < .001".to_string(),
        Some(p) => format!("p = {}", format_p_value(p)),
        None => "p unavailable".to_string(),
    }
}

/// The computer's own decision at the request alpha; results without one
/// (external payloads) are judged at the default alpha.
fn is_significant(result: &AnalysisResult) -> bool {
    result.flag("significant").unwrap_or_else(|| {
        result
            .number("p_value")
            .is_some_and(|p| p < DEFAULT_ALPHA)
    })
}

fn significance(result: &AnalysisResult) -> &'static str {
    if is_significant(result) {
        "statistically significant"
    } else {
        "not statistically significant"
    }
}

/// Method-specific summary sentence, when the key findings are there.
fn headline(result: &AnalysisResult) -> Option<String> {
    let num = |name: &str| result.number(name);
    let text = |name: &str| result.text(name).unwrap_or("");
    let line = match result.method {
        AnalysisMethod::Correlation => format!(
            "the {} correlation between {} and {} was {} (r = {:.2}, {}, n = {})",
            text("strength"),
            text("variable_1"),
            text("variable_2"),
            significance(result),
            num("r")?,
            p_text(result),
            num("n")?
        ),
        AnalysisMethod::Crosstab => format!(
            "the association was {} (χ²({}) = {:.2}, {}, Cramér's V = {:.2}, n = {})",
            significance(result),
            num("df")?,
            num("chi_square")?,
            p_text(result),
            num("cramers_v")?,
            num("n")?
        ),
        AnalysisMethod::IndependentTTest | AnalysisMethod::PairedTTest => format!(
            "the mean difference of {:.2} was {} (t({:.1}) = {:.2}, {}, d = {:.2}, {} effect)",
            num("mean_difference")?,
            significance(result),
            num("df")?,
            num("t")?,
            p_text(result),
            num("cohens_d")?,
            text("effect_size")
        ),
        AnalysisMethod::Anova => format!(
            "group means differed {} (F({}, {}) = {:.2}, {}, η² = {:.3})",
            if is_significant(result) { "significantly" } else { "non-significantly" },
            num("df_between")?,
            num("df_within")?,
            num("f")?,
            p_text(result),
            num("eta_squared")?
        ),
        AnalysisMethod::LinearRegression => format!(
            "the model explained {:.1}% of the variance (adjusted R² = {:.3}, F = {:.2}, {}, n = {})",
            num("r_squared")? * 100.0,
            num("adj_r_squared")?,
            num("f")?,
            p_text(result),
            num("n")?
        ),
        AnalysisMethod::LogisticRegression => format!(
            "the model classified {:.1}% of cases correctly (AUC = {:.3}, pseudo R² = {:.3}, n = {})",
            num("accuracy")? * 100.0,
            num("auc")?,
            num("pseudo_r_squared")?,
            num("n")?
        ),
        AnalysisMethod::ClassificationComparison => format!(
            "{} of {} algorithms succeeded; {} performed best (accuracy {:.1}%)",
            num("algorithms_succeeded")?,
            num("algorithms_requested")?,
            text("best_algorithm"),
            num("best_accuracy")? * 100.0
        ),
        AnalysisMethod::RegressionComparison => format!(
            "{} of {} algorithms succeeded; {} performed best (test R² = {:.3})",
            num("algorithms_succeeded")?,
            num("algorithms_requested")?,
            text("best_algorithm"),
            num("best_r_squared")?
        ),
        AnalysisMethod::Clustering => format!(
            "{} of {} algorithms succeeded; {} gave the clearest separation (silhouette {:.2})",
            num("algorithms_succeeded")?,
            num("algorithms_requested")?,
            text("best_algorithm"),
            num("best_silhouette")?
        ),
        AnalysisMethod::Trend => format!(
            "the series trends {} (slope {:.3} per {}, R² = {:.2}, {}, {} points)",
            match text("direction") {
                "flat" => "flat",
                "up" => "upward",
                _ => "downward",
            },
            num("slope")?,
            text("time_unit"),
            num("r_squared")?,
            p_text(result),
            num("n_points")?
        ),
        AnalysisMethod::Reliability => format!(
            "Cronbach's alpha was {:.3} across {} items ({}), n = {}",
            num("cronbach_alpha")?,
            num("n_items")?,
            text("alpha_label"),
            num("n")?
        ),
        AnalysisMethod::QuestionnaireQuality => format!(
            "the overall quality score was {:.0} ({}); alpha moved from {:.3} to {:.3} after {} reverse-coded item(s) were corrected",
            num("overall_score")?,
            text("grade"),
            num("raw_alpha")?,
            num("corrected_alpha")?,
            num("reverse_items_flagged")?
        ),
        AnalysisMethod::MultiSelect => format!(
            "{} respondents chose on average {:.2} of {} options",
            num("respondents")?,
            num("mean_selections")?,
            num("options")?
        ),
        _ => return None,
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::FailureReason;
    use std::collections::BTreeMap;

    fn correlation() -> AnalysisResult {
        let mut findings = BTreeMap::new();
        findings.insert("r".to_string(), Finding::Number(0.62));
        findings.insert("p_value".to_string(), Finding::Number(0.0004));
        findings.insert("n".to_string(), Finding::Integer(48));
        findings.insert("pairs_computed".to_string(), Finding::Integer(1));
        findings.insert("strength".to_string(), Finding::from("strong"));
        findings.insert("variable_1".to_string(), Finding::from("age"));
        findings.insert("variable_2".to_string(), Finding::from("income"));
        AnalysisResult {
            method: AnalysisMethod::Correlation,
            status: Status::Success,
            findings,
            tables: BTreeMap::new(),
            algorithms: BTreeMap::new(),
            warnings: Vec::new(),
            figures: Vec::new(),
            failure: None,
        }
    }

    #[test]
    fn test_prompt_substitutes_placeholders() {
        let spec = SectionSpec::new("results", "Results", ["correlation"])
            .with_guidelines("Be brief.");
        let result = correlation();
        let prompt = build_prompt(&spec, &[("correlation", &result)]);

        assert!(prompt.contains("\"Results\" section"));
        assert!(prompt.contains("Analyses: Correlation analysis"));
        assert!(prompt.contains("r = 0.620"));
        assert!(prompt.contains("p_value = <0.001"));
        assert!(prompt.contains("- none"));
        assert!(prompt.ends_with("Guidelines: Be brief."));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn test_custom_prompt_pattern() {
        let spec = SectionSpec::new("k", "Key", ["c"]).with_prompt("{title} / {method}");
        let result = correlation();
        assert_eq!(build_prompt(&spec, &[("c", &result)]), "Key / Correlation analysis");
    }

    #[test]
    fn test_correlation_headline() {
        let text = describe_result(&correlation());
        assert!(text.starts_with("Correlation analysis: the strong correlation between age and income"));
        assert!(text.contains("p < .001"));
    }

    #[test]
    fn test_significance_follows_the_result_alpha() {
        let mut result = correlation();
        result.findings.insert("p_value".to_string(), Finding::Number(0.03));
        result.findings.insert("significant".to_string(), Finding::Flag(false));
        let text = describe_result(&result);
        assert!(text.contains("was not statistically significant"), "{text}");

        result.findings.remove("significant");
        let text = describe_result(&result);
        assert!(!text.contains("not statistically significant"), "{text}");
    }

    #[test]
    fn test_failed_result_sentence() {
        let result = AnalysisResult::failed(
            AnalysisMethod::Anova,
            FailureReason::InsufficientPairwiseSample {
                required: 3,
                found: 1,
            },
        );
        let text = describe_result(&result);
        assert!(text.contains("could not be computed"));
        assert!(text.contains("need 3, have 1"));
    }

    #[test]
    fn test_missing_headline_findings_fall_back_to_list() {
        let mut result = correlation();
        result.findings.remove("r");
        let text = describe_result(&result);
        assert!(text.contains("p_value = <0.001"));
    }
}
