//! Questionnaire methods: multi-select items, scale reliability and quality.
//!
//! Reliability and quality work on complete cases over the item set.
//! Quality additionally runs reverse-item detection: items whose corrected
//! item-total correlation is below `-reverse_item_threshold` are rescored as
//! `scale_max + scale_min - value`, one at a time, and Cronbach's α is recomputed.

use super::{StatisticComputer, guard_sample, numeric_columns};
use crate::config::EngineConfig;
use crate::dataset::{Dataset, complete_columns, present};
use crate::error::Result;
use crate::request::{AnalysisMethod, MethodFamily, Role};
use crate::result::{
    Cell, FailureReason, FigureDescriptor, FigureKind, FigureSeries, RawOutput, Table,
};
use crate::stats::correlation::pearson;
use crate::stats::descriptive::{iqr_outliers, mean, std_dev, variance};
use crate::stats::format::alpha_label;
use crate::validation::BoundRequest;
use std::collections::BTreeMap;
use tracing::{debug, info};

const HIGH_MISSING_PERCENT: f64 = 10.0;
const TOP_PATTERNS: usize = 10;

/// Handles `multi_select`, `reliability` and `questionnaire_quality`.
pub struct QuestionnaireComputer;

impl StatisticComputer for QuestionnaireComputer {
    fn family(&self) -> MethodFamily {
        MethodFamily::Questionnaire
    }

    fn compute(
        &self,
        dataset: &Dataset,
        request: &BoundRequest,
        config: &EngineConfig,
    ) -> Result<RawOutput> {
        match request.method {
            AnalysisMethod::MultiSelect => multi_select(dataset, request),
            AnalysisMethod::Reliability => reliability(dataset, request),
            _ => quality(dataset, request, config),
        }
    }
}

// ============================================================================
// Reliability primitives
// ============================================================================

/// Cronbach's α over item columns of equal length.
///
/// `None` with fewer than two items or when the total score is constant.
pub fn cronbach_alpha(items: &[Vec<f64>]) -> Option<f64> {
    let k = items.len();
    let n = items.first().map(Vec::len).unwrap_or(0);
    if k < 2 || n < 2 {
        return None;
    }
    let totals: Vec<f64> = (0..n).map(|i| items.iter().map(|c| c[i]).sum()).collect();
    let total_var = variance(&totals);
    if !total_var.is_finite() || total_var <= f64::EPSILON {
        return None;
    }
    let item_var: f64 = items.iter().map(|c| variance(c)).sum();
    let k = k as f64;
    Some(k / (k - 1.0) * (1.0 - item_var / total_var))
}

/// Correlation of each item with the sum of the other items.
pub fn corrected_item_total(items: &[Vec<f64>]) -> Vec<Option<f64>> {
    let n = items.first().map(Vec::len).unwrap_or(0);
    let totals: Vec<f64> = (0..n).map(|i| items.iter().map(|c| c[i]).sum()).collect();
    items
        .iter()
        .map(|item| {
            let rest: Vec<f64> = totals.iter().zip(item).map(|(t, v)| t - v).collect();
            pearson(item, &rest)
        })
        .collect()
}

fn alpha_if_deleted(items: &[Vec<f64>]) -> Vec<Option<f64>> {
    (0..items.len())
        .map(|skip| {
            let rest: Vec<Vec<f64>> = items
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != skip)
                .map(|(_, c)| c.clone())
                .collect();
            cronbach_alpha(&rest)
        })
        .collect()
}

/// Outcome of reverse-item detection over complete item columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ReverseCorrection {
    /// Indices of items detected as reverse-coded.
    pub flagged: Vec<usize>,
    /// Corrected item-total correlation of each item before rescoring.
    pub item_total: Vec<Option<f64>>,
    /// Item columns after rescoring the flagged items.
    pub items: Vec<Vec<f64>>,
}

/// Detect reverse-coded items and rescore them within `[scale_min, scale_max]`.
///
/// Items are rescored one at a time, most negative item-total correlation
/// first, recomputing the correlations after every flip. Each flip of an item
/// with a negative item-total covariance strictly raises the total-score
/// variance, so the loop ends at a point where no item is below
/// `-threshold`. Running it again on the corrected items flags nothing.
pub fn detect_and_correct(
    items: &[Vec<f64>],
    scale_min: f64,
    scale_max: f64,
    threshold: f64,
) -> ReverseCorrection {
    let item_total = corrected_item_total(items);
    let mut corrected = items.to_vec();
    let mut flipped = vec![false; items.len()];
    let mut current = item_total.clone();

    while let Some((worst, _)) = current
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.filter(|r| *r < -threshold).map(|r| (i, r)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
    {
        for v in corrected[worst].iter_mut() {
            *v = scale_max + scale_min - *v;
        }
        flipped[worst] = !flipped[worst];
        current = corrected_item_total(&corrected);
    }

    let flagged = flipped
        .iter()
        .enumerate()
        .filter(|(_, f)| **f)
        .map(|(i, _)| i)
        .collect();
    ReverseCorrection {
        flagged,
        item_total,
        items: corrected,
    }
}

fn item_columns(dataset: &Dataset, request: &BoundRequest) -> Result<Vec<Vec<f64>>> {
    let (columns, _) = complete_columns(&numeric_columns(dataset, request, Role::Items)?);
    Ok(columns)
}

// ============================================================================
// Reliability
// ============================================================================

fn reliability(dataset: &Dataset, request: &BoundRequest) -> Result<RawOutput> {
    let names = request.columns(Role::Items);
    let items = item_columns(dataset, request)?;
    let n = items.first().map(Vec::len).unwrap_or(0);
    if let Some(failed) = guard_sample(2, n) {
        return Ok(failed);
    }
    let Some(alpha) = cronbach_alpha(&items) else {
        return Ok(RawOutput::failure(FailureReason::ZeroVariance(
            "total score is constant across respondents".to_string(),
        )));
    };

    let mut raw = RawOutput::new();
    raw.finding("cronbach_alpha", alpha);
    raw.finding("alpha_label", alpha_label(alpha));
    raw.finding("n_items", names.len());
    raw.finding("n", n);
    if alpha < 0.0 {
        raw.warn("Negative α: some items may be reverse-coded");
    }

    let correlations: Vec<f64> = (0..items.len())
        .flat_map(|i| ((i + 1)..items.len()).map(move |j| (i, j)))
        .filter_map(|(i, j)| pearson(&items[i], &items[j]))
        .collect();
    if !correlations.is_empty() {
        raw.finding("mean_inter_item_r", mean(&correlations));
    }

    raw.table("items", item_table(names, &items));
    Ok(raw.succeed())
}

fn item_table(names: &[String], items: &[Vec<f64>]) -> Table {
    let item_total = corrected_item_total(items);
    let deleted = alpha_if_deleted(items);
    let mut table = Table::new(
        "Item statistics",
        ["item", "mean", "std_dev", "corrected_item_total", "alpha_if_deleted"],
    );
    for (i, name) in names.iter().enumerate() {
        table.push_row(vec![
            Cell::from(name.as_str()),
            Cell::from(mean(&items[i])),
            Cell::from(std_dev(&items[i])),
            Cell::from(item_total[i]),
            Cell::from(deleted[i]),
        ]);
    }
    table
}

// ============================================================================
// Questionnaire quality
// ============================================================================

fn quality(dataset: &Dataset, request: &BoundRequest, config: &EngineConfig) -> Result<RawOutput> {
    let names = request.columns(Role::Items);
    let raw_columns = numeric_columns(dataset, request, Role::Items)?;
    let rows = dataset.height();
    let mut raw = RawOutput::new();

    let declared_min = request.parameters.f64("scale_min");
    let declared_max = request.parameters.f64("scale_max");

    // per-item screening on every available value
    let mut screening = Table::new(
        "Item screening",
        [
            "item",
            "valid",
            "missing",
            "missing_percent",
            "below_scale",
            "above_scale",
            "iqr_outliers",
            "outlier_percent",
        ],
    );
    let mut missing_rates = Vec::new();
    let mut outlier_rates = Vec::new();
    let mut high_missing = Vec::new();
    let mut out_of_range = 0usize;
    for (name, column) in names.iter().zip(&raw_columns) {
        let values = present(column);
        let missing = rows - values.len();
        let missing_percent = missing as f64 / rows.max(1) as f64 * 100.0;
        if missing_percent > HIGH_MISSING_PERCENT {
            high_missing.push(name.clone());
        }
        let below = declared_min.map(|lo| values.iter().filter(|v| **v < lo).count());
        let above = declared_max.map(|hi| values.iter().filter(|v| **v > hi).count());
        out_of_range += below.unwrap_or(0) + above.unwrap_or(0);
        let outliers = if values.is_empty() { 0 } else { iqr_outliers(&values).2 };
        let outlier_percent = outliers as f64 / values.len().max(1) as f64 * 100.0;

        missing_rates.push(missing_percent);
        outlier_rates.push(outlier_percent);
        screening.push_row(vec![
            Cell::from(name.as_str()),
            Cell::from(values.len()),
            Cell::from(missing),
            Cell::from(missing_percent),
            below.map(Cell::from).unwrap_or(Cell::Empty),
            above.map(Cell::from).unwrap_or(Cell::Empty),
            Cell::from(outliers),
            Cell::from(outlier_percent),
        ]);
    }
    raw.table("screening", screening);
    raw.finding("high_missing_items", high_missing.len());
    if !high_missing.is_empty() {
        raw.warn(format!(
            "Missing rate above {}% for: {}",
            HIGH_MISSING_PERCENT,
            high_missing.join(", ")
        ));
    }
    if declared_min.is_some() || declared_max.is_some() {
        raw.finding("out_of_range_values", out_of_range);
        if out_of_range > 0 {
            raw.warn(format!(
                "{} values fall outside the declared scale",
                out_of_range
            ));
        }
    }

    let items = item_columns(dataset, request)?;
    let n = items.first().map(Vec::len).unwrap_or(0);
    if let Some(failed) = guard_sample(2, n) {
        return Ok(failed);
    }
    let Some(raw_alpha) = cronbach_alpha(&items) else {
        return Ok(RawOutput::failure(FailureReason::ZeroVariance(
            "total score is constant across respondents".to_string(),
        )));
    };

    let observed = items.iter().flatten().copied();
    let scale_min = declared_min.unwrap_or_else(|| observed.clone().fold(f64::INFINITY, f64::min));
    let scale_max = declared_max.unwrap_or_else(|| observed.fold(f64::NEG_INFINITY, f64::max));
    let correction = detect_and_correct(&items, scale_min, scale_max, config.reverse_item_threshold);
    let corrected_alpha = cronbach_alpha(&correction.items).unwrap_or(raw_alpha);
    debug!(
        "Reverse detection flagged {:?}; alpha {:.3} -> {:.3}",
        correction.flagged, raw_alpha, corrected_alpha
    );

    let flagged_names: Vec<&str> = correction
        .flagged
        .iter()
        .map(|&i| names[i].as_str())
        .collect();
    let mut reverse = Table::new(
        "Reverse-item check",
        ["item", "corrected_item_total", "flagged", "declared_reverse"],
    );
    for (i, name) in names.iter().enumerate() {
        let flagged = correction.flagged.contains(&i);
        let hinted = dataset.is_reverse_hinted(name);
        if hinted && !flagged {
            raw.warn(format!(
                "'{}' is declared reverse-coded but was not detected as such",
                name
            ));
        } else if flagged && !hinted && !dataset.reverse_hints().is_empty() {
            raw.warn(format!(
                "'{}' was detected as reverse-coded but is not declared",
                name
            ));
        }
        reverse.push_row(vec![
            Cell::from(name.as_str()),
            Cell::from(correction.item_total[i]),
            Cell::from(if flagged { "yes" } else { "no" }),
            Cell::from(if hinted { "yes" } else { "no" }),
        ]);
    }
    raw.table("reverse_items", reverse);
    if !flagged_names.is_empty() {
        info!("Rescored reverse-coded items: {}", flagged_names.join(", "));
        raw.finding("reverse_items", flagged_names.join(", "));
    }

    let score = QualityScore::new(mean(&missing_rates), corrected_alpha, mean(&outlier_rates));
    raw.finding("raw_alpha", raw_alpha);
    raw.finding("corrected_alpha", corrected_alpha);
    raw.finding("alpha_label", alpha_label(corrected_alpha));
    raw.finding("reverse_items_flagged", correction.flagged.len());
    raw.finding("scale_min", scale_min);
    raw.finding("scale_max", scale_max);
    raw.finding("missing_score", score.missing);
    raw.finding("consistency_score", score.consistency);
    raw.finding("outlier_score", score.outliers);
    raw.finding("overall_score", score.overall());
    raw.finding("grade", score.grade());
    raw.finding("n_items", names.len());
    raw.finding("n", n);

    raw.table("items", item_table(names, &correction.items));
    Ok(raw.succeed())
}

/// Component scores on a 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq)]
struct QualityScore {
    missing: f64,
    consistency: f64,
    outliers: f64,
}

impl QualityScore {
    fn new(mean_missing_percent: f64, alpha: f64, mean_outlier_percent: f64) -> Self {
        let outliers = if mean_outlier_percent < 5.0 {
            90.0
        } else if mean_outlier_percent < 10.0 {
            70.0
        } else {
            50.0
        };
        Self {
            missing: (100.0 - mean_missing_percent * 2.0).max(0.0),
            consistency: (alpha * 100.0).clamp(0.0, 100.0),
            outliers,
        }
    }

    fn overall(&self) -> f64 {
        (self.missing + self.consistency + self.outliers) / 3.0
    }

    fn grade(&self) -> &'static str {
        match self.overall() {
            s if s >= 90.0 => "excellent",
            s if s >= 80.0 => "good",
            s if s >= 70.0 => "fair",
            s if s >= 60.0 => "poor",
            _ => "unacceptable",
        }
    }
}

// ============================================================================
// Multi-select
// ============================================================================

fn multi_select(dataset: &Dataset, request: &BoundRequest) -> Result<RawOutput> {
    let names = request.columns(Role::Items);
    let flags: Vec<Vec<Option<bool>>> = names
        .iter()
        .map(|n| dataset.flags(n))
        .collect::<Result<_>>()?;

    // respondents answered at least one option; unanswered options count as not selected
    let answered: Vec<Vec<bool>> = (0..dataset.height())
        .filter(|&row| flags.iter().any(|f| f[row].is_some()))
        .map(|row| flags.iter().map(|f| f[row] == Some(true)).collect())
        .collect();
    let respondents = answered.len();
    if let Some(failed) = guard_sample(1, respondents) {
        return Ok(failed);
    }

    let mut raw = RawOutput::new();
    let selected: Vec<usize> = (0..names.len())
        .map(|j| answered.iter().filter(|r| r[j]).count())
        .collect();
    let rates: Vec<f64> = selected
        .iter()
        .map(|s| *s as f64 / respondents as f64 * 100.0)
        .collect();

    let mut options = Table::new(
        "Selection rates",
        ["option", "selected", "rate_percent", "not_selected"],
    );
    for (j, name) in names.iter().enumerate() {
        options.push_row(vec![
            Cell::from(name.as_str()),
            Cell::from(selected[j]),
            Cell::from(rates[j]),
            Cell::from(respondents - selected[j]),
        ]);
    }
    raw.table("options", options);
    raw.figure(
        FigureDescriptor::new(FigureKind::Bar, "Selection rate by option").with_series(
            FigureSeries {
                name: "rate_percent".to_string(),
                labels: names.to_vec(),
                x: Vec::new(),
                y: rates.clone(),
            },
        ),
    );

    let per_respondent: Vec<usize> = answered
        .iter()
        .map(|r| r.iter().filter(|s| **s).count())
        .collect();
    let mut distribution: BTreeMap<usize, usize> = BTreeMap::new();
    for count in &per_respondent {
        *distribution.entry(*count).or_insert(0) += 1;
    }
    let mut counts = Table::new(
        "Selections per respondent",
        ["selections", "respondents", "percent"],
    );
    for (selections, people) in &distribution {
        counts.push_row(vec![
            Cell::from(*selections),
            Cell::from(*people),
            Cell::from(*people as f64 / respondents as f64 * 100.0),
        ]);
    }
    raw.table("selection_counts", counts);

    let mut cooccurrence = Table::new(
        "Co-occurrence",
        std::iter::once("option".to_string()).chain(names.iter().cloned()),
    );
    let mut heatmap = FigureDescriptor::new(FigureKind::Heatmap, "Option co-occurrence");
    for (i, name) in names.iter().enumerate() {
        let together: Vec<usize> = (0..names.len())
            .map(|j| answered.iter().filter(|r| r[i] && r[j]).count())
            .collect();
        let mut row = vec![Cell::from(name.as_str())];
        row.extend(together.iter().map(|c| Cell::from(*c)));
        cooccurrence.push_row(row);
        heatmap = heatmap.with_series(FigureSeries {
            name: name.clone(),
            labels: names.to_vec(),
            x: Vec::new(),
            y: together.iter().map(|c| *c as f64).collect(),
        });
    }
    raw.table("cooccurrence", cooccurrence);
    raw.figure(heatmap);

    let mut patterns: BTreeMap<String, usize> = BTreeMap::new();
    for row in &answered {
        let chosen: Vec<&str> = names
            .iter()
            .zip(row)
            .filter(|(_, s)| **s)
            .map(|(n, _)| n.as_str())
            .collect();
        let key = if chosen.is_empty() {
            "(none)".to_string()
        } else {
            chosen.join(" + ")
        };
        *patterns.entry(key).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> = patterns.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let mut top = Table::new("Most common combinations", ["pattern", "respondents", "percent"]);
    for (pattern, people) in ranked.iter().take(TOP_PATTERNS) {
        top.push_row(vec![
            Cell::from(pattern.as_str()),
            Cell::from(*people),
            Cell::from(*people as f64 / respondents as f64 * 100.0),
        ]);
    }
    raw.table("patterns", top);

    let favourite = rates
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(j, _)| j)
        .unwrap_or(0);
    raw.finding("respondents", respondents);
    raw.finding("options", names.len());
    raw.finding(
        "mean_selections",
        per_respondent.iter().sum::<usize>() as f64 / respondents as f64,
    );
    raw.finding("most_selected", names[favourite].as_str());
    raw.finding("most_selected_rate", rates[favourite]);
    if let Some((pattern, _)) = ranked.first() {
        raw.finding("top_pattern", pattern.as_str());
    }
    Ok(raw.succeed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::AnalysisRequest;
    use crate::validation::MethodValidator;
    use polars::prelude::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::{Strategy, prop, prop_assert, prop_assert_eq, proptest};

    /// Five 1-7 items; `e` is the mirror image of `a`.
    fn reversed_scale() -> Dataset {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 4.0, 3.0, 5.0];
        let b = [2.0, 2.0, 3.0, 5.0, 5.0, 6.0, 6.0, 4.0, 3.0, 4.0];
        let c = [1.0, 3.0, 3.0, 4.0, 4.0, 7.0, 6.0, 5.0, 2.0, 5.0];
        let d = [2.0, 1.0, 4.0, 4.0, 6.0, 5.0, 7.0, 4.0, 3.0, 6.0];
        let e: Vec<f64> = a.iter().map(|v| 8.0 - v).collect();
        Dataset::from_frame(df!["a" => a, "b" => b, "c" => c, "d" => d, "e" => e].unwrap())
    }

    fn run(dataset: &Dataset, request: AnalysisRequest) -> RawOutput {
        let bound = MethodValidator::new().validate(dataset, &request).unwrap();
        QuestionnaireComputer
            .compute(dataset, &bound, &EngineConfig::default())
            .unwrap()
    }

    fn quality_request() -> AnalysisRequest {
        AnalysisRequest::new(AnalysisMethod::QuestionnaireQuality)
            .bind_all(Role::Items, ["a", "b", "c", "d", "e"])
            .param("scale_min", 1)
            .param("scale_max", 7)
    }

    #[test]
    fn test_alpha_rises_after_reverse_correction() {
        let dataset = reversed_scale();
        let raw = run(&dataset, quality_request());
        let before = raw.findings["raw_alpha"].as_f64().unwrap();
        let after = raw.findings["corrected_alpha"].as_f64().unwrap();
        assert!(after > before, "{} -> {}", before, after);
        assert_eq!(raw.findings["reverse_items_flagged"].as_f64(), Some(1.0));
        assert_eq!(raw.findings["reverse_items"].as_text(), Some("e"));
    }

    #[test]
    fn test_correction_flags_the_mirrored_item() {
        let dataset = reversed_scale();
        let items: Vec<Vec<f64>> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|n| present(&dataset.numeric(n).unwrap()))
            .collect();
        let once = detect_and_correct(&items, 1.0, 7.0, 0.1);
        assert_eq!(once.flagged, vec![4]);
        assert_eq!(once.items[4], items[0]);
    }

    #[test]
    fn test_correction_rechecks_after_each_flip() {
        // flipping `c` alone pushes `e` below the threshold
        let x = [2.0, 2.0, 6.0, 6.0, 2.0, 2.0, 6.0, 6.0];
        let y = [2.0, 6.0, 2.0, 6.0, 2.0, 6.0, 2.0, 6.0];
        let c: Vec<f64> = x.iter().zip(&y).map(|(x, y)| 8.0 - x + (y - 4.0) / 2.0).collect();
        let items = vec![x.to_vec(), x.to_vec(), c, y.to_vec()];

        let once = detect_and_correct(&items, 1.0, 7.0, 0.1);
        assert_eq!(once.flagged, vec![2, 3]);
        assert!(
            corrected_item_total(&once.items)
                .iter()
                .all(|r| r.is_none_or(|r| r >= -0.1))
        );

        let twice = detect_and_correct(&once.items, 1.0, 7.0, 0.1);
        assert!(twice.flagged.is_empty());
        assert_eq!(twice.items, once.items);
    }

    proptest! {
        #[test]
        fn prop_correction_is_idempotent(
            items in (2usize..7, 3usize..16).prop_flat_map(|(k, n)| {
                prop::collection::vec(prop::collection::vec(1u8..=7, n), k)
            })
        ) {
            let items: Vec<Vec<f64>> = items
                .into_iter()
                .map(|c| c.into_iter().map(f64::from).collect())
                .collect();
            let once = detect_and_correct(&items, 1.0, 7.0, 0.1);
            let twice = detect_and_correct(&once.items, 1.0, 7.0, 0.1);
            prop_assert!(twice.flagged.is_empty());
            prop_assert_eq!(twice.items, once.items);
        }
    }

    #[test]
    fn test_declared_hint_mismatch_warns() {
        let dataset = reversed_scale().with_reverse_hints(["b"]);
        let raw = run(&dataset, quality_request());
        assert!(raw.warnings.iter().any(|w| w.contains("'b' is declared")));
        assert!(raw.warnings.iter().any(|w| w.contains("'e' was detected")));
    }

    #[test]
    fn test_quality_flags_missing_and_out_of_range() {
        let df = df![
            "q1" => [Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(9.0), Some(2.0)],
            "q2" => [Some(1.0), None, Some(3.0), Some(5.0), Some(5.0), Some(2.0)],
        ]
        .unwrap();
        let dataset = Dataset::from_frame(df);
        let raw = run(
            &dataset,
            AnalysisRequest::new(AnalysisMethod::QuestionnaireQuality)
                .bind_all(Role::Items, ["q1", "q2"])
                .param("scale_min", 1)
                .param("scale_max", 5),
        );
        assert_eq!(raw.findings["high_missing_items"].as_f64(), Some(1.0));
        assert_eq!(raw.findings["out_of_range_values"].as_f64(), Some(1.0));
        let score = raw.findings["overall_score"].as_f64().unwrap();
        assert!((0.0..=100.0).contains(&score));
    }

    #[test]
    fn test_reliability_reports_item_statistics() {
        let dataset = reversed_scale();
        let raw = run(
            &dataset,
            AnalysisRequest::new(AnalysisMethod::Reliability)
                .bind_all(Role::Items, ["a", "b", "c", "d"]),
        );
        let alpha = raw.findings["cronbach_alpha"].as_f64().unwrap();
        assert!(alpha > 0.8);
        assert_eq!(raw.findings["alpha_label"].as_text(), Some(alpha_label(alpha)));
        assert_eq!(raw.tables["items"].rows.len(), 4);
    }

    #[test]
    fn test_cronbach_alpha_known_value() {
        // two perfectly correlated items give alpha = 1
        let items = vec![vec![1.0, 2.0, 3.0, 4.0], vec![1.0, 2.0, 3.0, 4.0]];
        assert!((cronbach_alpha(&items).unwrap() - 1.0).abs() < 1e-12);
        let constant = vec![vec![2.0, 2.0], vec![3.0, 3.0]];
        assert_eq!(cronbach_alpha(&constant), None);
    }

    #[test]
    fn test_multi_select_summary() {
        let df = df![
            "tea" => [true, true, false, true],
            "coffee" => [false, true, false, true],
            "juice" => [false, false, false, true],
        ]
        .unwrap();
        let dataset = Dataset::from_frame(df);
        let raw = run(
            &dataset,
            AnalysisRequest::new(AnalysisMethod::MultiSelect)
                .bind_all(Role::Items, ["tea", "coffee", "juice"]),
        );
        assert_eq!(raw.findings["respondents"].as_f64(), Some(4.0));
        assert_eq!(raw.findings["mean_selections"].as_f64(), Some(1.5));
        assert_eq!(raw.findings["most_selected"].as_text(), Some("tea"));
        let cooccurrence = &raw.tables["cooccurrence"];
        assert_eq!(cooccurrence.rows[0][2], Cell::from(2usize));
        let patterns = &raw.tables["patterns"];
        assert_eq!(patterns.rows.len(), 4);
    }
}
