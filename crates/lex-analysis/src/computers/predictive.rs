//! Supervised methods: linear and logistic regression, plus model comparisons.
//!
//! All four methods use complete cases over the outcome and every predictor.
//! Comparisons evaluate each algorithm on a seeded hold-out split and record
//! one outcome per algorithm; a failing algorithm never aborts the others.

use super::models::{
    DecisionTree, Knn, NaiveBayes, Ridge, TreeTask, accuracy, auc, least_squares,
    linear_predict, logistic, macro_f1, ols, random_split, regression_scores, stratified_split,
};
use super::{StatisticComputer, alpha, guard_sample, label_column, numeric_columns};
use crate::config::EngineConfig;
use crate::dataset::{Dataset, complete_columns, complete_rows};
use crate::error::{AnalysisError, Result};
use crate::request::{AnalysisMethod, MethodFamily, Role};
use crate::result::{
    AlgorithmOutcome, Cell, FailureReason, Finding, FigureDescriptor, FigureKind, FigureSeries,
    RawOutput, Table,
};
use crate::stats::std_dev;
use crate::validation::BoundRequest;
use std::collections::BTreeMap;
use tracing::{debug, info};

const DEFAULT_NEIGHBORS: usize = 5;
const DEFAULT_MAX_DEPTH: usize = 5;
const DEFAULT_RIDGE_LAMBDA: f64 = 1.0;
const COMPARISON_FLOOR: usize = 10;
const Z_95: f64 = 1.959_963_984_540_054;

/// Handles linear/logistic regression and the two model comparisons.
pub struct PredictiveComputer;

impl StatisticComputer for PredictiveComputer {
    fn family(&self) -> MethodFamily {
        MethodFamily::Predictive
    }

    fn compute(
        &self,
        dataset: &Dataset,
        request: &BoundRequest,
        config: &EngineConfig,
    ) -> Result<RawOutput> {
        match request.method {
            AnalysisMethod::LinearRegression => linear_regression(dataset, request, config),
            AnalysisMethod::LogisticRegression => logistic_regression(dataset, request, config),
            AnalysisMethod::ClassificationComparison => compare_classifiers(dataset, request, config),
            AnalysisMethod::RegressionComparison => compare_regressors(dataset, request, config),
            other => Err(AnalysisError::Internal(format!(
                "{} is not a predictive method",
                other
            ))),
        }
    }
}

/// Complete-case predictor rows with a numeric outcome.
fn numeric_design(
    dataset: &Dataset,
    request: &BoundRequest,
) -> Result<(Vec<Vec<f64>>, Vec<f64>)> {
    let target = request
        .column(Role::Dependent)
        .ok_or_else(|| AnalysisError::Internal("request has no dependent column".to_string()))?;
    let mut columns = numeric_columns(dataset, request, Role::Independent)?;
    columns.push(dataset.numeric(target)?);
    let (mut complete, _) = complete_columns(&columns);
    let y = complete.pop().unwrap_or_default();
    let rows = (0..y.len())
        .map(|i| complete.iter().map(|col| col[i]).collect())
        .collect();
    Ok((rows, y))
}

/// Complete-case predictor rows with class indices into the sorted label set.
struct LabelledDesign {
    rows: Vec<Vec<f64>>,
    labels: Vec<usize>,
    classes: Vec<String>,
}

fn labelled_design(dataset: &Dataset, request: &BoundRequest) -> Result<LabelledDesign> {
    let target = request
        .column(Role::Dependent)
        .ok_or_else(|| AnalysisError::Internal("request has no dependent column".to_string()))?;
    let names = label_column(dataset, target)?;
    let (rows, indices) = complete_rows(&numeric_columns(dataset, request, Role::Independent)?);

    let mut kept = Vec::new();
    let mut raw_labels = Vec::new();
    for (row, idx) in rows.into_iter().zip(indices) {
        if let Some(Some(label)) = names.get(idx) {
            kept.push(row);
            raw_labels.push(label.clone());
        }
    }
    let mut classes = raw_labels.clone();
    classes.sort();
    classes.dedup();
    let labels = raw_labels
        .iter()
        .map(|l| classes.binary_search(l).unwrap_or(0))
        .collect();
    Ok(LabelledDesign {
        rows: kept,
        labels,
        classes,
    })
}

// ============================================================================
// Linear regression
// ============================================================================

fn linear_regression(
    dataset: &Dataset,
    request: &BoundRequest,
    config: &EngineConfig,
) -> Result<RawOutput> {
    let predictors = request.columns(Role::Independent);
    let (rows, y) = numeric_design(dataset, request)?;
    if let Some(failed) = guard_sample(predictors.len() + 2, rows.len()) {
        return Ok(failed);
    }
    let fit = match ols(&rows, &y) {
        Ok(fit) => fit,
        Err(reason) => return Ok(RawOutput::failure(reason)),
    };
    debug!("OLS fit on {} rows: R² = {:.4}", rows.len(), fit.r_squared);

    let mut raw = RawOutput::new();
    raw.finding("r_squared", fit.r_squared);
    raw.finding("adj_r_squared", fit.adj_r_squared);
    raw.finding("f", fit.f);
    raw.finding("df_model", fit.df_model);
    raw.finding("df_residual", fit.df_residual);
    raw.finding("p_value", fit.f_p_value);
    raw.finding("significant", fit.f_p_value < alpha(request, config));
    raw.finding("rmse", fit.rmse);
    raw.finding("n", rows.len());

    let sd_y = std_dev(&y);
    let mut table = Table::new(
        "Coefficients",
        ["term", "b", "std_error", "t", "p_value", "beta"],
    );
    table.push_row(vec![
        Cell::from("(intercept)"),
        Cell::from(fit.coefficients[0]),
        Cell::from(fit.std_errors[0]),
        Cell::from(fit.t_values[0]),
        Cell::from(fit.p_values[0]),
        Cell::Empty,
    ]);
    for (j, name) in predictors.iter().enumerate() {
        let column: Vec<f64> = rows.iter().map(|r| r[j]).collect();
        let beta = fit.coefficients[j + 1] * std_dev(&column) / sd_y;
        table.push_row(vec![
            Cell::from(name.as_str()),
            Cell::from(fit.coefficients[j + 1]),
            Cell::from(fit.std_errors[j + 1]),
            Cell::from(fit.t_values[j + 1]),
            Cell::from(fit.p_values[j + 1]),
            Cell::from(beta),
        ]);
    }
    raw.table("coefficients", table);

    let fitted: Vec<f64> = rows.iter().map(|r| fit.predict(r)).collect();
    raw.figure(
        FigureDescriptor::new(FigureKind::Scatter, "Observed vs fitted").with_series(
            FigureSeries {
                name: "observations".to_string(),
                labels: Vec::new(),
                x: fitted,
                y,
            },
        ),
    );
    Ok(raw.succeed())
}

// ============================================================================
// Logistic regression
// ============================================================================

fn logistic_regression(
    dataset: &Dataset,
    request: &BoundRequest,
    config: &EngineConfig,
) -> Result<RawOutput> {
    let predictors = request.columns(Role::Independent);
    let design = labelled_design(dataset, request)?;
    if let Some(failed) = guard_sample(predictors.len() + 2, design.rows.len()) {
        return Ok(failed);
    }
    if design.classes.len() != 2 {
        return Ok(RawOutput::failure(FailureReason::DegenerateInput(format!(
            "complete cases hold {} outcome levels, need 2",
            design.classes.len()
        ))));
    }

    let y: Vec<f64> = design.labels.iter().map(|l| *l as f64).collect();
    let fit = match logistic(&design.rows, &y, config.max_iterations) {
        Ok(fit) => fit,
        Err(reason) => return Ok(RawOutput::failure(reason)),
    };
    debug!("Logistic fit converged after {} iterations", fit.iterations);

    let scores: Vec<f64> = design.rows.iter().map(|r| fit.probability(r)).collect();
    let positive: Vec<bool> = design.labels.iter().map(|l| *l == 1).collect();
    let predicted: Vec<usize> = scores.iter().map(|p| usize::from(*p >= 0.5)).collect();

    let mut raw = RawOutput::new();
    if let Some(area) = auc(&scores, &positive) {
        raw.finding("auc", area);
    }
    raw.finding("log_likelihood", fit.log_likelihood);
    raw.finding("pseudo_r_squared", fit.pseudo_r_squared());
    raw.finding("accuracy", accuracy(&design.labels, &predicted));
    raw.finding(
        "aic",
        -2.0 * fit.log_likelihood + 2.0 * fit.coefficients.len() as f64,
    );
    raw.finding("iterations", fit.iterations);
    raw.finding("positive_class", design.classes[1].as_str());
    raw.finding("n", design.rows.len());

    let mut table = Table::new(
        "Coefficients",
        [
            "term",
            "b",
            "std_error",
            "z",
            "p_value",
            "odds_ratio",
            "or_ci_lower",
            "or_ci_upper",
        ],
    );
    let terms = std::iter::once("(intercept)").chain(predictors.iter().map(String::as_str));
    for (j, term) in terms.enumerate() {
        let (b, se) = (fit.coefficients[j], fit.std_errors[j]);
        table.push_row(vec![
            Cell::from(term),
            Cell::from(b),
            Cell::from(se),
            Cell::from(fit.z_values[j]),
            Cell::from(fit.p_values[j]),
            Cell::from(b.exp()),
            Cell::from((b - Z_95 * se).exp()),
            Cell::from((b + Z_95 * se).exp()),
        ]);
    }
    raw.table("coefficients", table);
    Ok(raw.succeed())
}

// ============================================================================
// Model comparisons
// ============================================================================

fn test_fraction(request: &BoundRequest, config: &EngineConfig) -> f64 {
    request
        .parameters
        .f64("test_fraction")
        .unwrap_or(config.test_fraction)
}

fn pick<T: Clone>(rows: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| rows[i].clone()).collect()
}

fn outcome(metrics: &[(&str, f64)]) -> AlgorithmOutcome {
    AlgorithmOutcome::succeeded(
        metrics
            .iter()
            .map(|(name, value)| (name.to_string(), Finding::from(*value)))
            .collect::<BTreeMap<_, _>>(),
    )
}

/// Best succeeded algorithm by `metric`; earlier algorithms win ties.
fn best_by(
    algorithms: &BTreeMap<String, AlgorithmOutcome>,
    order: &[String],
    metric: &str,
) -> Option<(String, f64)> {
    let mut best: Option<(String, f64)> = None;
    for name in order {
        let Some(score) = algorithms
            .get(name)
            .filter(|o| o.is_success())
            .and_then(|o| o.findings.get(metric))
            .and_then(Finding::as_f64)
        else {
            continue;
        };
        if best.as_ref().is_none_or(|(_, s)| score > *s) {
            best = Some((name.clone(), score));
        }
    }
    best
}

fn comparison_figure(title: &str, metric: &str, scores: &[(String, f64)]) -> FigureDescriptor {
    FigureDescriptor::new(FigureKind::Bar, title).with_series(FigureSeries {
        name: metric.to_string(),
        labels: scores.iter().map(|(n, _)| n.clone()).collect(),
        x: Vec::new(),
        y: scores.iter().map(|(_, s)| *s).collect(),
    })
}

fn classify(
    algorithm: &str,
    train: &[Vec<f64>],
    train_labels: &[usize],
    test: &[Vec<f64>],
    n_classes: usize,
    request: &BoundRequest,
    config: &EngineConfig,
) -> std::result::Result<Vec<usize>, FailureReason> {
    let targets: Vec<f64> = train_labels.iter().map(|l| *l as f64).collect();
    match algorithm {
        "logistic_regression" => {
            // one-vs-rest; binary targets need a single model
            let fits = if n_classes == 2 {
                vec![logistic(train, &targets, config.max_iterations)?]
            } else {
                (0..n_classes)
                    .map(|class| {
                        let binary: Vec<f64> = train_labels
                            .iter()
                            .map(|l| if *l == class { 1.0 } else { 0.0 })
                            .collect();
                        logistic(train, &binary, config.max_iterations)
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()?
            };
            Ok(test
                .iter()
                .map(|row| {
                    if fits.len() == 1 {
                        usize::from(fits[0].probability(row) >= 0.5)
                    } else {
                        fits.iter()
                            .map(|f| f.probability(row))
                            .enumerate()
                            .max_by(|a, b| a.1.total_cmp(&b.1))
                            .map(|(class, _)| class)
                            .unwrap_or(0)
                    }
                })
                .collect())
        }
        "naive_bayes" => {
            let model = NaiveBayes::fit(train, train_labels)?;
            Ok(test.iter().map(|row| model.predict(row)).collect())
        }
        "knn" => {
            let k = request.parameters.usize("n_neighbors").unwrap_or(DEFAULT_NEIGHBORS);
            let model = Knn::fit(train, &targets, k);
            Ok(test.iter().map(|row| model.classify(row)).collect())
        }
        "decision_tree" => {
            let depth = request.parameters.usize("max_depth").unwrap_or(DEFAULT_MAX_DEPTH);
            let model = DecisionTree::fit(train, &targets, TreeTask::Classification, depth);
            Ok(test.iter().map(|row| model.predict(row) as usize).collect())
        }
        other => Err(FailureReason::DegenerateInput(format!(
            "unknown algorithm '{}'",
            other
        ))),
    }
}

fn compare_classifiers(
    dataset: &Dataset,
    request: &BoundRequest,
    config: &EngineConfig,
) -> Result<RawOutput> {
    let design = labelled_design(dataset, request)?;
    if let Some(failed) = guard_sample(COMPARISON_FLOOR, design.rows.len()) {
        return Ok(failed);
    }
    if design.classes.len() < 2 {
        return Ok(RawOutput::failure(FailureReason::DegenerateInput(
            "complete cases hold a single outcome class".to_string(),
        )));
    }

    let (train_idx, test_idx) =
        stratified_split(&design.labels, test_fraction(request, config), config.random_seed);
    if test_idx.is_empty() {
        return Ok(RawOutput::failure(FailureReason::DegenerateInput(
            "hold-out split left no test rows".to_string(),
        )));
    }
    let train = pick(&design.rows, &train_idx);
    let train_labels = pick(&design.labels, &train_idx);
    let test = pick(&design.rows, &test_idx);
    let truth = pick(&design.labels, &test_idx);

    let mut raw = RawOutput::new();
    let order = request.algorithms();
    let mut table = Table::new(
        "Classifier comparison",
        ["algorithm", "status", "accuracy", "macro_f1"],
    );
    for name in &order {
        let outcome = match classify(
            name,
            &train,
            &train_labels,
            &test,
            design.classes.len(),
            request,
            config,
        ) {
            Ok(predicted) => {
                let acc = accuracy(&truth, &predicted);
                let f1 = macro_f1(&truth, &predicted);
                table.push_row(vec![
                    Cell::from(name.as_str()),
                    Cell::from("success"),
                    Cell::from(acc),
                    Cell::from(f1),
                ]);
                outcome(&[("accuracy", acc), ("macro_f1", f1)])
            }
            Err(reason) => {
                info!("Classifier '{}' failed: {}", name, reason);
                table.push_row(vec![
                    Cell::from(name.as_str()),
                    Cell::from("failed"),
                    Cell::Empty,
                    Cell::Empty,
                ]);
                AlgorithmOutcome::failed(reason)
            }
        };
        raw.algorithm(name.as_str(), outcome);
    }

    raw.finding("n", design.rows.len());
    raw.finding("n_train", train.len());
    raw.finding("n_test", test.len());
    raw.finding("n_classes", design.classes.len());
    if let Some((best, score)) = best_by(&raw.algorithms, &order, "accuracy") {
        raw.finding("best_algorithm", best);
        raw.finding("best_accuracy", score);
    }
    let scores: Vec<(String, f64)> = order
        .iter()
        .filter_map(|n| {
            raw.algorithms
                .get(n)
                .and_then(|o| o.findings.get("accuracy"))
                .and_then(Finding::as_f64)
                .map(|s| (n.clone(), s))
        })
        .collect();
    raw.table("comparison", table);
    raw.figure(comparison_figure("Hold-out accuracy", "accuracy", &scores));
    Ok(raw.succeed())
}

fn regress(
    algorithm: &str,
    train: &[Vec<f64>],
    train_y: &[f64],
    test: &[Vec<f64>],
    request: &BoundRequest,
) -> std::result::Result<Vec<f64>, FailureReason> {
    match algorithm {
        "linear_regression" => {
            let coefficients = least_squares(train, train_y)?;
            Ok(test.iter().map(|row| linear_predict(&coefficients, row)).collect())
        }
        "ridge" => {
            let lambda = request
                .parameters
                .f64("ridge_lambda")
                .unwrap_or(DEFAULT_RIDGE_LAMBDA);
            let model = Ridge::fit(train, train_y, lambda)?;
            Ok(test.iter().map(|row| model.predict(row)).collect())
        }
        "knn" => {
            let k = request.parameters.usize("n_neighbors").unwrap_or(DEFAULT_NEIGHBORS);
            let model = Knn::fit(train, train_y, k);
            Ok(test.iter().map(|row| model.regress(row)).collect())
        }
        "decision_tree" => {
            let depth = request.parameters.usize("max_depth").unwrap_or(DEFAULT_MAX_DEPTH);
            let model = DecisionTree::fit(train, train_y, TreeTask::Regression, depth);
            Ok(test.iter().map(|row| model.predict(row)).collect())
        }
        other => Err(FailureReason::DegenerateInput(format!(
            "unknown algorithm '{}'",
            other
        ))),
    }
}

fn compare_regressors(
    dataset: &Dataset,
    request: &BoundRequest,
    config: &EngineConfig,
) -> Result<RawOutput> {
    let (rows, y) = numeric_design(dataset, request)?;
    if let Some(failed) = guard_sample(COMPARISON_FLOOR, rows.len()) {
        return Ok(failed);
    }
    let (train_idx, test_idx) =
        random_split(rows.len(), test_fraction(request, config), config.random_seed);
    let train = pick(&rows, &train_idx);
    let train_y = pick(&y, &train_idx);
    let test = pick(&rows, &test_idx);
    let truth = pick(&y, &test_idx);

    let mut raw = RawOutput::new();
    let order = request.algorithms();
    let mut table = Table::new(
        "Regressor comparison",
        ["algorithm", "status", "r_squared", "rmse", "mae"],
    );
    for name in &order {
        let result = regress(name, &train, &train_y, &test, request).and_then(|predicted| {
            let (r2, rmse, mae) = regression_scores(&truth, &predicted);
            if r2.is_finite() {
                Ok((r2, rmse, mae))
            } else {
                Err(FailureReason::ZeroVariance(
                    "outcome is constant over the test rows".to_string(),
                ))
            }
        });
        let outcome = match result {
            Ok((r2, rmse, mae)) => {
                table.push_row(vec![
                    Cell::from(name.as_str()),
                    Cell::from("success"),
                    Cell::from(r2),
                    Cell::from(rmse),
                    Cell::from(mae),
                ]);
                outcome(&[("r_squared", r2), ("rmse", rmse), ("mae", mae)])
            }
            Err(reason) => {
                info!("Regressor '{}' failed: {}", name, reason);
                table.push_row(vec![
                    Cell::from(name.as_str()),
                    Cell::from("failed"),
                    Cell::Empty,
                    Cell::Empty,
                    Cell::Empty,
                ]);
                AlgorithmOutcome::failed(reason)
            }
        };
        raw.algorithm(name.as_str(), outcome);
    }

    raw.finding("n", rows.len());
    raw.finding("n_train", train.len());
    raw.finding("n_test", test.len());
    if let Some((best, score)) = best_by(&raw.algorithms, &order, "r_squared") {
        raw.finding("best_algorithm", best);
        raw.finding("best_r_squared", score);
    }
    let scores: Vec<(String, f64)> = order
        .iter()
        .filter_map(|n| {
            raw.algorithms
                .get(n)
                .and_then(|o| o.findings.get("r_squared"))
                .and_then(Finding::as_f64)
                .map(|s| (n.clone(), s))
        })
        .collect();
    raw.table("comparison", table);
    raw.figure(comparison_figure("Hold-out R²", "r_squared", &scores));
    Ok(raw.succeed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::AnalysisRequest;
    use crate::result::{Status, normalize};
    use crate::validation::MethodValidator;
    use polars::prelude::*;

    fn run(dataset: &Dataset, request: AnalysisRequest) -> RawOutput {
        let bound = MethodValidator::new().validate(dataset, &request).unwrap();
        PredictiveComputer
            .compute(dataset, &bound, &EngineConfig::default())
            .unwrap()
    }

    fn regression_data() -> Dataset {
        let x: Vec<f64> = (1..=20).map(f64::from).collect();
        let noise = [0.3, -0.2, 0.1, -0.4, 0.2, 0.0, -0.1, 0.4, -0.3, 0.2];
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 1.5 * v + 2.0 + noise[i % 10])
            .collect();
        let z: Vec<f64> = (1..=20).map(|i| ((i * 7) % 11) as f64).collect();
        Dataset::from_frame(df!["x" => x, "z" => z, "y" => y].unwrap())
    }

    #[test]
    fn test_linear_regression_findings_and_coefficients() {
        let dataset = regression_data();
        let raw = run(
            &dataset,
            AnalysisRequest::new(AnalysisMethod::LinearRegression)
                .bind(Role::Dependent, "y")
                .bind_all(Role::Independent, ["x", "z"]),
        );
        assert!(raw.findings["r_squared"].as_f64().unwrap() > 0.99);
        assert!(raw.findings["p_value"].as_f64().unwrap() < 0.001);
        let table = &raw.tables["coefficients"];
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[1][0], Cell::from("x"));
        let result = normalize(AnalysisMethod::LinearRegression, raw).unwrap();
        assert_eq!(result.status, Status::Success);
    }

    #[test]
    fn test_logistic_regression_on_overlapping_classes() {
        let x: Vec<f64> = (1..=12).map(f64::from).collect();
        let outcome = [
            "no", "no", "yes", "no", "no", "yes", "no", "yes", "yes", "no", "yes", "yes",
        ];
        let dataset = Dataset::from_frame(df!["x" => x, "bought" => outcome].unwrap());
        let raw = run(
            &dataset,
            AnalysisRequest::new(AnalysisMethod::LogisticRegression)
                .bind(Role::Dependent, "bought")
                .bind(Role::Independent, "x"),
        );
        assert_eq!(raw.failure, None);
        assert_eq!(raw.findings["positive_class"].as_text(), Some("yes"));
        let area = raw.findings["auc"].as_f64().unwrap();
        assert!(area > 0.5 && area < 1.0);
        assert_eq!(raw.tables["coefficients"].columns[5], "odds_ratio");
    }

    #[test]
    fn test_logistic_regression_separation_fails() {
        let x: Vec<f64> = (1..=8).map(f64::from).collect();
        let outcome = ["a", "a", "a", "a", "b", "b", "b", "b"];
        let dataset = Dataset::from_frame(df!["x" => x, "y" => outcome].unwrap());
        let raw = run(
            &dataset,
            AnalysisRequest::new(AnalysisMethod::LogisticRegression)
                .bind(Role::Dependent, "y")
                .bind(Role::Independent, "x"),
        );
        assert!(raw.failure.is_some());
    }

    #[test]
    fn test_classification_comparison_with_one_failing_algorithm() {
        // perfectly separable: logistic regression cannot converge
        let x: Vec<f64> = (1..=20).map(f64::from).collect();
        let label: Vec<&str> = (1..=20).map(|i| if i <= 10 { "low" } else { "high" }).collect();
        let dataset = Dataset::from_frame(df!["x" => x, "label" => label].unwrap());
        let raw = run(
            &dataset,
            AnalysisRequest::new(AnalysisMethod::ClassificationComparison)
                .bind(Role::Dependent, "label")
                .bind(Role::Independent, "x")
                .param(
                    "algorithms",
                    serde_json::json!(["logistic_regression", "naive_bayes", "knn"]),
                ),
        );
        let result = normalize(AnalysisMethod::ClassificationComparison, raw).unwrap();
        assert_eq!(result.status, Status::Partial);
        assert_eq!(result.algorithms.len(), 3);
        assert!(!result.algorithms["logistic_regression"].is_success());
        assert!(result.algorithms["logistic_regression"].failure.is_some());
        assert!(result.algorithms["naive_bayes"].is_success());
        assert!(result.algorithms["knn"].is_success());
        assert_eq!(result.number("algorithms_succeeded"), Some(2.0));
        assert!(result.text("best_algorithm").is_some());
    }

    #[test]
    fn test_regression_comparison_all_algorithms() {
        let dataset = regression_data();
        let raw = run(
            &dataset,
            AnalysisRequest::new(AnalysisMethod::RegressionComparison)
                .bind(Role::Dependent, "y")
                .bind_all(Role::Independent, ["x", "z"]),
        );
        assert_eq!(raw.algorithms.len(), 4);
        assert!(raw.algorithms.values().all(|o| o.is_success()));
        assert_eq!(raw.findings["best_algorithm"].as_text(), Some("linear_regression"));
        assert_eq!(raw.findings["n_test"].as_f64(), Some(6.0));
    }

    #[test]
    fn test_comparison_is_reproducible() {
        let dataset = regression_data();
        let request = AnalysisRequest::new(AnalysisMethod::RegressionComparison)
            .bind(Role::Dependent, "y")
            .bind(Role::Independent, "x");
        let first = run(&dataset, request.clone());
        let second = run(&dataset, request);
        assert_eq!(first.algorithms, second.algorithms);
    }
}
