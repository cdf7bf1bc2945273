//! Method recommender.
//!
//! Suggests analyses for a dataset from its schema and counts alone. Every
//! suggestion carries a request that already passes [`MethodValidator`], so
//! it can be run as-is. Scores start at 100 and lose points for a sample
//! below the method's recommended size and for heavy missingness.

use super::MethodValidator;
use crate::dataset::{ColumnKind, Dataset};
use crate::error::{Result, ValidationError};
use crate::request::{AnalysisMethod, AnalysisRequest, Role};
use serde::Serialize;
use tracing::{debug, info};

/// A suggested analysis with a ready-to-run request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub method: AnalysisMethod,
    /// Suitability from 0 to 100.
    pub score: u8,
    pub reason: String,
    pub request: AnalysisRequest,
}

/// Numeric targets with at most this many distinct values may be classes.
const FEW_DISTINCT_VALUES: usize = 20;

/// Sample size below which a method's score is reduced.
fn recommended_sample(method: AnalysisMethod) -> usize {
    use AnalysisMethod::*;
    match method {
        Descriptive | Frequency | MultiSelect => 1,
        Correlation => 10,
        LinearRegression | IndependentTTest | Anova => 20,
        LogisticRegression | Crosstab | Reliability | QuestionnaireQuality => 30,
        _ => 50,
    }
}

fn default_reason(method: AnalysisMethod) -> &'static str {
    use AnalysisMethod::*;
    match method {
        Descriptive | Frequency => "baseline overview, suitable for any data",
        Correlation => "several numeric columns to relate pairwise",
        Crosstab => "two categorical columns to cross-tabulate",
        IndependentTTest => "numeric outcome with a two-level grouping",
        Anova => "numeric outcome with a multi-level grouping",
        LinearRegression | RegressionComparison => "numeric outcome with numeric predictors",
        LogisticRegression => "binary outcome with numeric predictors",
        ClassificationComparison => "categorical outcome with numeric predictors",
        FactorAnalysis | Pca | DimensionalityReduction => {
            "enough numeric columns to look for structure"
        }
        Clustering => "numeric columns to group respondents by",
        Trend => "a time axis with a numeric measure",
        MultiSelect => "multi-select option columns",
        PairedTTest | Reliability | QuestionnaireQuality => "suitable for the columns given",
    }
}

/// Columns of each analysis kind, in dataset order.
#[derive(Debug, Default)]
struct Schema {
    numeric: Vec<String>,
    categorical: Vec<String>,
    datetime: Vec<String>,
    multi_select: Vec<String>,
}

impl Schema {
    fn of(dataset: &Dataset) -> Self {
        let mut schema = Self::default();
        for column in dataset.columns() {
            let bucket = match column.kind {
                ColumnKind::Numeric => &mut schema.numeric,
                ColumnKind::Categorical => &mut schema.categorical,
                ColumnKind::Datetime => &mut schema.datetime,
                ColumnKind::MultiSelect => &mut schema.multi_select,
            };
            bucket.push(column.name.clone());
        }
        schema
    }
}

/// Share of missing cells across the whole dataset, in percent.
fn missing_percentage(dataset: &Dataset) -> Result<f64> {
    let cells = dataset.height() * dataset.columns().len();
    if cells == 0 {
        return Ok(0.0);
    }
    let mut present = 0;
    for column in dataset.columns() {
        present += dataset.non_missing_count(&column.name)?;
    }
    Ok((cells - present) as f64 / cells as f64 * 100.0)
}

/// Candidate requests that need an outcome column.
fn supervised(dataset: &Dataset, schema: &Schema, target: &str) -> Result<Vec<AnalysisRequest>> {
    let kind = dataset
        .column_kind(target)
        .ok_or_else(|| ValidationError::UnknownColumn(target.to_string()))?;
    if kind == ColumnKind::Datetime {
        debug!("Target '{}' is a time axis; no supervised methods apply", target);
        return Ok(Vec::new());
    }

    let predictors: Vec<&String> = schema.numeric.iter().filter(|c| *c != target).collect();
    let classes = dataset.levels(target)?.len();
    let mut candidates = Vec::new();

    let model = |method| {
        AnalysisRequest::new(method)
            .bind(Role::Dependent, target)
            .bind_all(Role::Independent, predictors.iter().map(|c| c.as_str()))
    };

    if kind == ColumnKind::Numeric && classes > 2 {
        if !predictors.is_empty() {
            candidates.push(model(AnalysisMethod::LinearRegression));
            candidates.push(model(AnalysisMethod::RegressionComparison));
        }
        for group in &schema.categorical {
            let method = match dataset.levels(group)?.len() {
                2 => AnalysisMethod::IndependentTTest,
                n if n > 2 => AnalysisMethod::Anova,
                _ => continue,
            };
            candidates.push(
                AnalysisRequest::new(method)
                    .bind(Role::Dependent, target)
                    .bind(Role::Grouping, group.as_str()),
            );
        }
    } else if classes >= 2 && !predictors.is_empty() {
        if classes == 2 {
            candidates.push(model(AnalysisMethod::LogisticRegression));
        }
        candidates.push(model(AnalysisMethod::ClassificationComparison));
    }
    Ok(candidates)
}

/// Candidate requests that describe or explore the data without an outcome.
fn exploratory(schema: &Schema, target: Option<&str>) -> Vec<AnalysisRequest> {
    let mut candidates = Vec::new();
    let numeric = || schema.numeric.iter().map(String::as_str);

    if !schema.numeric.is_empty() {
        candidates.push(
            AnalysisRequest::new(AnalysisMethod::Descriptive).bind_all(Role::Variables, numeric()),
        );
    }
    if !schema.categorical.is_empty() {
        candidates.push(
            AnalysisRequest::new(AnalysisMethod::Frequency)
                .bind_all(Role::Variables, schema.categorical.iter().map(String::as_str)),
        );
    }
    if schema.numeric.len() >= 2 {
        candidates.push(
            AnalysisRequest::new(AnalysisMethod::Correlation).bind_all(Role::Variables, numeric()),
        );
    }
    if let [row, column, ..] = schema.categorical.as_slice() {
        candidates.push(
            AnalysisRequest::new(AnalysisMethod::Crosstab)
                .bind(Role::Row, row.as_str())
                .bind(Role::Column, column.as_str()),
        );
    }
    if schema.numeric.len() >= 3 {
        for method in [AnalysisMethod::FactorAnalysis, AnalysisMethod::Pca] {
            candidates.push(AnalysisRequest::new(method).bind_all(Role::Variables, numeric()));
        }
    }
    if schema.numeric.len() >= 2 {
        candidates.push(
            AnalysisRequest::new(AnalysisMethod::Clustering).bind_all(Role::Variables, numeric()),
        );
    }
    if schema.multi_select.len() >= 2 {
        candidates.push(
            AnalysisRequest::new(AnalysisMethod::MultiSelect)
                .bind_all(Role::Items, schema.multi_select.iter().map(String::as_str)),
        );
    }
    let value = target
        .filter(|t| schema.numeric.iter().any(|c| c == t))
        .or_else(|| schema.numeric.first().map(String::as_str));
    if let (Some(time), Some(value)) = (schema.datetime.first(), value) {
        candidates.push(
            AnalysisRequest::new(AnalysisMethod::Trend)
                .bind(Role::Time, time.as_str())
                .bind(Role::Value, value),
        );
    }
    candidates
}

fn suitability(dataset: &Dataset, request: &AnalysisRequest, missing: f64) -> Result<(u8, String)> {
    let method = request.method;
    let mut score = 100.0;
    let mut reasons = Vec::new();

    let columns: Vec<String> = request.bindings.iter().map(|b| b.column.clone()).collect();
    let rows = if method == AnalysisMethod::MultiSelect {
        dataset.height()
    } else {
        dataset.complete_count(&columns)?
    };
    let wanted = recommended_sample(method);
    if rows < wanted {
        score -= f64::min(20.0, (wanted - rows) as f64 * 0.5);
        reasons.push(format!("only {} complete rows; at least {} recommended", rows, wanted));
    }

    if method == AnalysisMethod::LinearRegression
        && let Some(target) = request.columns_for(Role::Dependent).first()
    {
        let distinct = dataset.levels(target)?.len();
        if distinct <= FEW_DISTINCT_VALUES {
            reasons.push(format!(
                "'{}' has only {} distinct values and may be categorical",
                target, distinct
            ));
        }
    }

    if missing > 50.0 {
        score -= 15.0;
        reasons.push(format!("{:.0}% of cells are missing; results may be unreliable", missing));
    } else if missing > 20.0 {
        score -= 5.0;
        reasons.push(format!("{:.0}% of cells are missing; consider imputing first", missing));
    }

    if matches!(method, AnalysisMethod::Descriptive | AnalysisMethod::Frequency) {
        score = f64::max(score, 80.0);
    }
    if reasons.is_empty() {
        reasons.push(default_reason(method).to_string());
    }
    Ok((score.clamp(0.0, 100.0).round() as u8, reasons.join("; ")))
}

/// Suggest analyses for `dataset`, best first.
///
/// With a `target`, outcome-based methods are considered too: regression and
/// group comparisons for a numeric outcome, classification for a binary or
/// categorical one. Only schema and count queries are used. Candidates the
/// validator would reject are left out.
pub fn recommend(dataset: &Dataset, target: Option<&str>) -> Result<Vec<Recommendation>> {
    let schema = Schema::of(dataset);
    let missing = missing_percentage(dataset)?;

    let mut candidates = match target {
        Some(target) => supervised(dataset, &schema, target)?,
        None => Vec::new(),
    };
    candidates.extend(exploratory(&schema, target));

    let validator = MethodValidator::new();
    let mut recommendations = Vec::new();
    for request in candidates {
        if let Err(e) = validator.validate(dataset, &request) {
            debug!("Not recommending {}: {}", request.method, e);
            continue;
        }
        let (score, reason) = suitability(dataset, &request, missing)?;
        recommendations.push(Recommendation {
            method: request.method,
            score,
            reason,
            request,
        });
    }
    recommendations.sort_by(|a, b| b.score.cmp(&a.score));

    info!("Recommended {} analyses", recommendations.len());
    Ok(recommendations)
}
