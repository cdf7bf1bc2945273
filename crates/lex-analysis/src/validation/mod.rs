//! Method validator.
//!
//! Checks a request against the dataset schema before anything is computed:
//! role bindings, column kinds, column counts, parameter ranges and the
//! per-method minimum-sample floors. Only the schema and count queries are
//! used here; pairwise sample sizes are the computers' responsibility.
//!
//! The recommender builds on the same checks to suggest analyses that fit
//! a dataset.

mod recommend;
mod rules;

pub use recommend::{Recommendation, recommend};
pub use rules::{RoleSpec, role_specs};

use crate::dataset::{ColumnKind, Dataset};
use crate::error::{AnalysisError, ValidationError};
use crate::request::{AnalysisMethod, AnalysisRequest, Parameters, Role};
use crate::stats::CorrelationKind;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// A request whose bindings have been resolved and checked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundRequest {
    pub method: AnalysisMethod,
    pub roles: BTreeMap<Role, Vec<String>>,
    pub parameters: Parameters,
}

impl BoundRequest {
    /// Columns bound to a role, in binding order.
    pub fn columns(&self, role: Role) -> &[String] {
        self.roles.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First column bound to a role.
    pub fn column(&self, role: Role) -> Option<&str> {
        self.columns(role).first().map(String::as_str)
    }

    /// Every bound column, deduplicated, in role order.
    pub fn all_columns(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.roles
            .values()
            .flatten()
            .filter(|c| seen.insert(c.as_str()))
            .cloned()
            .collect()
    }

    /// Requested algorithms, or every algorithm the method knows.
    pub fn algorithms(&self) -> Vec<String> {
        self.parameters
            .list("algorithms")
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| {
                self.method
                    .algorithms()
                    .iter()
                    .map(|a| a.to_string())
                    .collect()
            })
    }
}

/// Validates requests against a dataset.
#[derive(Debug, Default, Clone, Copy)]
pub struct MethodValidator;

impl MethodValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check a request and bind its columns to roles.
    pub fn validate(
        &self,
        dataset: &Dataset,
        request: &AnalysisRequest,
    ) -> Result<BoundRequest, ValidationError> {
        let method = request.method;
        let specs = role_specs(method);

        let mut roles: BTreeMap<Role, Vec<String>> = BTreeMap::new();
        for binding in &request.bindings {
            let spec = specs
                .iter()
                .find(|s| s.role == binding.role)
                .ok_or(ValidationError::UnexpectedRole {
                    method,
                    role: binding.role,
                })?;
            let found = dataset
                .column_kind(&binding.column)
                .ok_or_else(|| ValidationError::UnknownColumn(binding.column.clone()))?;
            if !spec.kinds.contains(&found) {
                return Err(ValidationError::WrongColumnKind {
                    column: binding.column.clone(),
                    role: binding.role,
                    expected: spec.expected(),
                    found,
                });
            }
            let columns = roles.entry(binding.role).or_default();
            if !columns.contains(&binding.column) {
                columns.push(binding.column.clone());
            }
        }

        for spec in specs {
            let found = roles.get(&spec.role).map(Vec::len).unwrap_or(0);
            if found == 0 && spec.min > 0 {
                return Err(ValidationError::MissingRole {
                    method,
                    role: spec.role,
                });
            }
            if found < spec.min || spec.max.is_some_and(|max| found > max) {
                return Err(ValidationError::WrongColumnCount {
                    role: spec.role,
                    expected: spec.count_text(),
                    found,
                });
            }
        }

        let bound = BoundRequest {
            method,
            roles,
            parameters: request.parameters.clone(),
        };
        check_parameters(&bound)?;
        check_floors(dataset, &bound)?;
        debug!("Validated {} over {:?}", method, bound.all_columns());
        Ok(bound)
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidParameter {
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn check_probability(params: &Parameters, name: &str) -> Result<(), ValidationError> {
    if params.contains(name) {
        match params.f64(name) {
            Some(v) if v > 0.0 && v < 1.0 => {}
            _ => return Err(invalid(name, "must be a number strictly between 0 and 1")),
        }
    }
    Ok(())
}

fn check_count(
    params: &Parameters,
    name: &str,
    min: usize,
    max: Option<usize>,
) -> Result<(), ValidationError> {
    if !params.contains(name) {
        return Ok(());
    }
    match params.usize(name) {
        Some(v) if v >= min && max.is_none_or(|m| v <= m) => Ok(()),
        _ => Err(invalid(
            name,
            match max {
                Some(m) => format!("must be an integer between {} and {}", min, m),
                None => format!("must be an integer of at least {}", min),
            },
        )),
    }
}

fn check_parameters(bound: &BoundRequest) -> Result<(), ValidationError> {
    let params = &bound.parameters;
    check_probability(params, "alpha")?;
    check_probability(params, "test_fraction")?;

    let variables = bound.columns(Role::Variables).len();
    match bound.method {
        AnalysisMethod::Correlation => {
            if let Some(name) = params.str("method")
                && CorrelationKind::parse(name).is_none()
            {
                return Err(invalid("method", format!("unknown correlation method '{}'", name)));
            }
        }
        AnalysisMethod::FactorAnalysis => {
            check_count(params, "n_factors", 1, Some(variables))?;
            if let Some(rotation) = params.str("rotation")
                && !matches!(rotation.to_ascii_lowercase().as_str(), "varimax" | "none")
            {
                return Err(invalid("rotation", format!("unknown rotation '{}'", rotation)));
            }
        }
        AnalysisMethod::Pca | AnalysisMethod::DimensionalityReduction => {
            check_count(params, "n_components", 1, Some(variables))?;
        }
        AnalysisMethod::Clustering => {
            check_count(params, "n_clusters", 2, None)?;
            check_count(params, "min_samples", 1, None)?;
            if params.contains("eps") && !params.f64("eps").is_some_and(|e| e > 0.0) {
                return Err(invalid("eps", "must be a positive number"));
            }
        }
        AnalysisMethod::ClassificationComparison | AnalysisMethod::RegressionComparison => {
            check_count(params, "n_neighbors", 1, None)?;
            check_count(params, "max_depth", 1, None)?;
        }
        AnalysisMethod::Trend => check_count(params, "window", 2, None)?,
        AnalysisMethod::IndependentTTest => {
            if let Some(groups) = params.list("groups")
                && groups.len() != 2
            {
                return Err(invalid("groups", "must name exactly two groups"));
            }
        }
        AnalysisMethod::QuestionnaireQuality => {
            let min = params.f64("scale_min");
            let max = params.f64("scale_max");
            if params.contains("scale_min") && min.is_none() {
                return Err(invalid("scale_min", "must be a number"));
            }
            if params.contains("scale_max") && max.is_none() {
                return Err(invalid("scale_max", "must be a number"));
            }
            if let (Some(lo), Some(hi)) = (min, max)
                && lo >= hi
            {
                return Err(invalid("scale_max", "must be greater than scale_min"));
            }
        }
        _ => {}
    }

    if bound.method.is_multi_algorithm() {
        let known = bound.method.algorithms();
        if let Some(unknown) = bound
            .algorithms()
            .into_iter()
            .find(|a| !known.contains(&a.as_str()))
        {
            return Err(invalid(
                "algorithms",
                format!("unknown algorithm '{}' (known: {})", unknown, known.join(", ")),
            ));
        }
    }
    Ok(())
}

/// Convert a dataset read failure into the validator's vocabulary.
fn read_error(column: &str, error: AnalysisError) -> ValidationError {
    match error {
        AnalysisError::ColumnNotFound(name) => ValidationError::UnknownColumn(name),
        other => ValidationError::InvalidParameter {
            name: column.to_string(),
            reason: other.to_string(),
        },
    }
}

fn floor(
    method: AnalysisMethod,
    detail: impl Into<String>,
    required: usize,
    found: usize,
) -> Result<(), ValidationError> {
    if found < required {
        return Err(ValidationError::InsufficientSample {
            method,
            detail: detail.into(),
            required,
            found,
        });
    }
    Ok(())
}

fn each_non_missing(
    dataset: &Dataset,
    method: AnalysisMethod,
    columns: &[String],
    required: usize,
) -> Result<(), ValidationError> {
    for column in columns {
        let found = dataset
            .non_missing_count(column)
            .map_err(|e| read_error(column, e))?;
        floor(method, format!("non-missing values in '{}'", column), required, found)?;
    }
    Ok(())
}

fn complete(dataset: &Dataset, columns: &[String]) -> Result<usize, ValidationError> {
    dataset
        .complete_count(columns)
        .map_err(|e| read_error(&columns.join(","), e))
}

fn check_floors(dataset: &Dataset, bound: &BoundRequest) -> Result<(), ValidationError> {
    let method = bound.method;
    let params = &bound.parameters;
    match method {
        AnalysisMethod::Descriptive | AnalysisMethod::Frequency => {
            each_non_missing(dataset, method, bound.columns(Role::Variables), 1)
        }
        AnalysisMethod::Correlation => {
            each_non_missing(dataset, method, bound.columns(Role::Variables), 3)
        }
        AnalysisMethod::Crosstab => {
            let columns = [bound.columns(Role::Row), bound.columns(Role::Column)].concat();
            each_non_missing(dataset, method, &columns, 5)
        }
        AnalysisMethod::PairedTTest => {
            each_non_missing(dataset, method, bound.columns(Role::Variables), 2)
        }
        AnalysisMethod::IndependentTTest => {
            let (value, group) = value_and_group(bound)?;
            let counts = dataset
                .group_counts(value, group)
                .map_err(|e| read_error(group, e))?;
            let groups: Vec<String> = match params.list("groups") {
                Some(named) => {
                    if let Some(absent) = named.iter().find(|g| !counts.contains_key(*g)) {
                        return Err(invalid(
                            "groups",
                            format!("group '{}' has no observations in '{}'", absent, group),
                        ));
                    }
                    named
                }
                None => {
                    if counts.len() > 2 {
                        return Err(invalid(
                            "groups",
                            format!(
                                "'{}' has {} levels; name the two to compare",
                                group,
                                counts.len()
                            ),
                        ));
                    }
                    floor(method, format!("groups in '{}'", group), 2, counts.len())?;
                    counts.keys().cloned().collect()
                }
            };
            for name in &groups {
                let found = counts.get(name).copied().unwrap_or(0);
                floor(method, format!("observations in group '{}'", name), 2, found)?;
            }
            Ok(())
        }
        AnalysisMethod::Anova => {
            let (value, group) = value_and_group(bound)?;
            let counts = dataset
                .group_counts(value, group)
                .map_err(|e| read_error(group, e))?;
            let usable = counts.values().filter(|n| **n >= 2).count();
            floor(
                method,
                format!("groups in '{}' with at least 2 observations", group),
                2,
                usable,
            )
        }
        AnalysisMethod::LinearRegression | AnalysisMethod::LogisticRegression => {
            let predictors = bound.columns(Role::Independent).len();
            let found = complete(dataset, &bound.all_columns())?;
            floor(method, "complete cases", predictors + 2, found)?;
            if method == AnalysisMethod::LogisticRegression {
                check_binary_target(dataset, bound)?;
            }
            Ok(())
        }
        AnalysisMethod::FactorAnalysis | AnalysisMethod::Pca => {
            let variables = bound.columns(Role::Variables);
            let found = complete(dataset, variables)?;
            floor(method, "complete cases", variables.len(), found)
        }
        AnalysisMethod::Clustering | AnalysisMethod::DimensionalityReduction => {
            let found = complete(dataset, bound.columns(Role::Variables))?;
            let clusters = params.usize("n_clusters").unwrap_or(3);
            let required = if method == AnalysisMethod::Clustering {
                clusters.max(3)
            } else {
                3
            };
            floor(method, "complete cases", required, found)
        }
        AnalysisMethod::ClassificationComparison | AnalysisMethod::RegressionComparison => {
            let found = complete(dataset, &bound.all_columns())?;
            floor(method, "complete cases", 10, found)?;
            if method == AnalysisMethod::ClassificationComparison {
                let target = bound.column(Role::Dependent).unwrap_or_default();
                let levels = dataset
                    .levels(target)
                    .map_err(|e| read_error(target, e))?;
                floor(method, format!("classes in '{}'", target), 2, levels.len())?;
            }
            Ok(())
        }
        AnalysisMethod::Trend => {
            let columns = [bound.columns(Role::Time), bound.columns(Role::Value)].concat();
            each_non_missing(dataset, method, &columns, 3)
        }
        AnalysisMethod::MultiSelect => {
            let mut answered = vec![false; dataset.height()];
            for column in bound.columns(Role::Items) {
                let presence = dataset
                    .presence(column)
                    .map_err(|e| read_error(column, e))?;
                for (any, present) in answered.iter_mut().zip(presence) {
                    *any |= present;
                }
            }
            let found = answered.into_iter().filter(|a| *a).count();
            floor(method, "answered rows", 1, found)
        }
        AnalysisMethod::Reliability | AnalysisMethod::QuestionnaireQuality => {
            let found = complete(dataset, bound.columns(Role::Items))?;
            floor(method, "complete cases", 2, found)
        }
    }
}

fn value_and_group(bound: &BoundRequest) -> Result<(&str, &str), ValidationError> {
    let value = bound
        .column(Role::Dependent)
        .ok_or(ValidationError::MissingRole {
            method: bound.method,
            role: Role::Dependent,
        })?;
    let group = bound
        .column(Role::Grouping)
        .ok_or(ValidationError::MissingRole {
            method: bound.method,
            role: Role::Grouping,
        })?;
    Ok((value, group))
}

fn check_binary_target(dataset: &Dataset, bound: &BoundRequest) -> Result<(), ValidationError> {
    let Some(target) = bound.column(Role::Dependent) else {
        return Err(ValidationError::MissingRole {
            method: bound.method,
            role: Role::Dependent,
        });
    };
    let levels = dataset
        .levels(target)
        .map_err(|e| read_error(target, e))?;
    if levels.len() != 2 {
        return Err(ValidationError::WrongColumnKind {
            column: target.to_string(),
            role: Role::Dependent,
            expected: format!("a binary outcome (found {} levels)", levels.len()),
            found: dataset
                .column_kind(target)
                .unwrap_or(ColumnKind::Categorical),
        });
    }
    Ok(())
}
