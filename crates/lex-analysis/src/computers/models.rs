//! Small supervised models used by the predictive computers.
//!
//! Every model works on row-major feature matrices (`&[Vec<f64>]`) with no
//! missing values. Fitting problems are returned as [`FailureReason`]s so a
//! comparison can record them per algorithm.

use crate::result::FailureReason;
use crate::stats::descriptive::{mean, ranks, std_dev};
use crate::stats::distributions::{f_upper, normal_two_sided, t_two_sided};
use crate::stats::matrix::design_matrix;
use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

type FitResult<T> = Result<T, FailureReason>;

// ============================================================================
// Ordinary least squares
// ============================================================================

/// An OLS fit with intercept. Index 0 of every vector is the intercept.
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub t_values: Vec<f64>,
    pub p_values: Vec<f64>,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f: f64,
    pub f_p_value: f64,
    pub df_model: f64,
    pub df_residual: f64,
    pub rmse: f64,
}

impl OlsFit {
    pub fn predict(&self, row: &[f64]) -> f64 {
        linear_predict(&self.coefficients, row)
    }
}

/// Intercept-first linear prediction.
pub fn linear_predict(coefficients: &[f64], row: &[f64]) -> f64 {
    coefficients[0]
        + row
            .iter()
            .zip(&coefficients[1..])
            .map(|(x, b)| x * b)
            .sum::<f64>()
}

/// Least-squares coefficients (intercept first) without inference.
pub fn least_squares(rows: &[Vec<f64>], y: &[f64]) -> FitResult<Vec<f64>> {
    let x = design_matrix(rows, true);
    let xtx_inv = (x.transpose() * &x).try_inverse().ok_or_else(|| {
        FailureReason::SingularMatrix("predictors are perfectly collinear".to_string())
    })?;
    Ok((xtx_inv * x.transpose() * DVector::from_column_slice(y))
        .iter()
        .copied()
        .collect())
}

pub fn ols(rows: &[Vec<f64>], y: &[f64]) -> FitResult<OlsFit> {
    let n = rows.len();
    let predictors = rows.first().map(Vec::len).unwrap_or(0);
    if n <= predictors + 1 {
        return Err(FailureReason::DegenerateInput(format!(
            "{} observations cannot support {} predictors",
            n, predictors
        )));
    }
    let x = design_matrix(rows, true);
    let target = DVector::from_column_slice(y);
    let xtx_inv = (x.transpose() * &x).try_inverse().ok_or_else(|| {
        FailureReason::SingularMatrix("predictors are perfectly collinear".to_string())
    })?;
    let beta = &xtx_inv * x.transpose() * &target;

    let residuals = &target - &x * &beta;
    let sse: f64 = residuals.iter().map(|r| r * r).sum();
    let y_mean = mean(y);
    let sst: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    if sst <= f64::EPSILON {
        return Err(FailureReason::ZeroVariance("outcome is constant".to_string()));
    }
    if sse <= sst * 1e-12 {
        return Err(FailureReason::DegenerateInput(
            "outcome is an exact linear function of the predictors".to_string(),
        ));
    }

    let df_model = predictors as f64;
    let df_residual = (n - predictors - 1) as f64;
    let sigma2 = sse / df_residual;
    let std_errors: Vec<f64> = (0..=predictors)
        .map(|j| (xtx_inv[(j, j)] * sigma2).sqrt())
        .collect();
    let coefficients: Vec<f64> = beta.iter().copied().collect();
    let t_values: Vec<f64> = coefficients
        .iter()
        .zip(&std_errors)
        .map(|(b, se)| b / se)
        .collect();
    let p_values = t_values
        .iter()
        .map(|t| t_two_sided(*t, df_residual).unwrap_or(f64::NAN))
        .collect();

    let r_squared = 1.0 - sse / sst;
    let f = ((sst - sse) / df_model) / sigma2;
    Ok(OlsFit {
        coefficients,
        std_errors,
        t_values,
        p_values,
        r_squared,
        adj_r_squared: 1.0 - (1.0 - r_squared) * (n as f64 - 1.0) / df_residual,
        f,
        f_p_value: f_upper(f, df_model, df_residual).unwrap_or(f64::NAN),
        df_model,
        df_residual,
        rmse: (sse / n as f64).sqrt(),
    })
}

// ============================================================================
// Logistic regression (IRLS)
// ============================================================================

#[derive(Debug, Clone)]
pub struct LogisticFit {
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub z_values: Vec<f64>,
    pub p_values: Vec<f64>,
    pub log_likelihood: f64,
    pub null_log_likelihood: f64,
    pub iterations: usize,
}

impl LogisticFit {
    pub fn probability(&self, row: &[f64]) -> f64 {
        sigmoid(linear_predict(&self.coefficients, row))
    }

    /// McFadden's pseudo R².
    pub fn pseudo_r_squared(&self) -> f64 {
        1.0 - self.log_likelihood / self.null_log_likelihood
    }
}

fn sigmoid(eta: f64) -> f64 {
    1.0 / (1.0 + (-eta).exp())
}

fn log_likelihood(y: &[f64], p: &[f64]) -> f64 {
    y.iter()
        .zip(p)
        .map(|(y, p)| {
            let p = p.clamp(1e-15, 1.0 - 1e-15);
            y * p.ln() + (1.0 - y) * (1.0 - p).ln()
        })
        .sum()
}

/// Fit a binary logistic regression by Newton-Raphson (IRLS).
///
/// `y` holds 0/1 outcomes. Complete separation, a singular Hessian, or
/// running out of iterations are fitting failures.
pub fn logistic(rows: &[Vec<f64>], y: &[f64], max_iterations: usize) -> FitResult<LogisticFit> {
    let x = design_matrix(rows, true);
    let (n, width) = x.shape();
    let target = DVector::from_column_slice(y);
    let mut beta = DVector::<f64>::zeros(width);

    for iteration in 1..=max_iterations {
        let probs: Vec<f64> = (&x * &beta).iter().map(|e| sigmoid(*e)).collect();
        if y.iter().zip(&probs).all(|(y, p)| (y - p).abs() < 1e-6) {
            return Err(FailureReason::NonConvergence(
                "complete separation: the predictors perfectly classify the outcome".to_string(),
            ));
        }

        let weights = DMatrix::from_fn(n, width, |i, j| x[(i, j)] * probs[i] * (1.0 - probs[i]));
        let hessian = x.transpose() * weights;
        let gradient = x.transpose() * (&target - DVector::from_vec(probs.clone()));
        let inverse = hessian.try_inverse().ok_or_else(|| {
            FailureReason::SingularMatrix(
                "information matrix is singular; predictors may separate the outcome".to_string(),
            )
        })?;
        let step = &inverse * gradient;
        beta += &step;
        if beta.iter().any(|b| !b.is_finite()) {
            return Err(FailureReason::NonConvergence(
                "coefficients diverged".to_string(),
            ));
        }

        if step.amax() < 1e-8 {
            let probs: Vec<f64> = (&x * &beta).iter().map(|e| sigmoid(*e)).collect();
            if y.iter().zip(&probs).all(|(y, p)| (y - p).abs() < 1e-6) {
                return Err(FailureReason::NonConvergence(
                    "complete separation: the predictors perfectly classify the outcome"
                        .to_string(),
                ));
            }
            let ll = log_likelihood(y, &probs);
            let rate = mean(y);
            let null_ll = n as f64 * (rate * rate.ln() + (1.0 - rate) * (1.0 - rate).ln());

            let std_errors: Vec<f64> = (0..width).map(|j| inverse[(j, j)].max(0.0).sqrt()).collect();
            let coefficients: Vec<f64> = beta.iter().copied().collect();
            let z_values: Vec<f64> = coefficients
                .iter()
                .zip(&std_errors)
                .map(|(b, se)| b / se)
                .collect();
            let p_values = z_values
                .iter()
                .map(|z| normal_two_sided(*z).unwrap_or(f64::NAN))
                .collect();
            return Ok(LogisticFit {
                coefficients,
                std_errors,
                z_values,
                p_values,
                log_likelihood: ll,
                null_log_likelihood: null_ll,
                iterations: iteration,
            });
        }
    }

    Err(FailureReason::NonConvergence(format!(
        "no convergence after {} iterations",
        max_iterations
    )))
}

/// Area under the ROC curve via the Mann-Whitney rank statistic.
pub fn auc(scores: &[f64], positive: &[bool]) -> Option<f64> {
    let n_pos = positive.iter().filter(|p| **p).count();
    let n_neg = positive.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }
    let rank_sum: f64 = ranks(scores)
        .iter()
        .zip(positive)
        .filter(|(_, p)| **p)
        .map(|(r, _)| r)
        .sum();
    let u = rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0;
    Some(u / (n_pos * n_neg) as f64)
}

// ============================================================================
// Classifiers and regressors for model comparison
// ============================================================================

/// Per-feature standardisation learned on the training rows.
#[derive(Debug, Clone)]
struct Scaler {
    means: Vec<f64>,
    sds: Vec<f64>,
}

impl Scaler {
    fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let column = |j: usize| rows.iter().map(|r| r[j]).collect::<Vec<_>>();
        let means = (0..width).map(|j| mean(&column(j))).collect();
        let sds = (0..width)
            .map(|j| {
                let sd = std_dev(&column(j));
                if sd.is_finite() && sd > f64::EPSILON { sd } else { 1.0 }
            })
            .collect();
        Self { means, sds }
    }

    fn apply(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.sds))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }
}

/// Gaussian naive Bayes.
#[derive(Debug, Clone)]
pub struct NaiveBayes {
    classes: Vec<usize>,
    priors: Vec<f64>,
    means: Vec<Vec<f64>>,
    variances: Vec<Vec<f64>>,
}

impl NaiveBayes {
    pub fn fit(rows: &[Vec<f64>], labels: &[usize]) -> FitResult<Self> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let mut by_class: BTreeMap<usize, Vec<&Vec<f64>>> = BTreeMap::new();
        for (row, label) in rows.iter().zip(labels) {
            by_class.entry(*label).or_default().push(row);
        }
        if by_class.len() < 2 {
            return Err(FailureReason::DegenerateInput(
                "training data holds a single class".to_string(),
            ));
        }

        let overall_var = (0..width)
            .map(|j| {
                let col: Vec<f64> = rows.iter().map(|r| r[j]).collect();
                let sd = std_dev(&col);
                if sd.is_finite() { sd * sd } else { 0.0 }
            })
            .fold(0.0_f64, f64::max);
        let smoothing = 1e-9 * overall_var.max(1.0);

        let mut model = Self {
            classes: Vec::new(),
            priors: Vec::new(),
            means: Vec::new(),
            variances: Vec::new(),
        };
        for (class, members) in by_class {
            let column = |j: usize| members.iter().map(|r| r[j]).collect::<Vec<_>>();
            model.classes.push(class);
            model.priors.push(members.len() as f64 / rows.len() as f64);
            model.means.push((0..width).map(|j| mean(&column(j))).collect());
            model.variances.push(
                (0..width)
                    .map(|j| {
                        let col = column(j);
                        let m = mean(&col);
                        col.iter().map(|v| (v - m).powi(2)).sum::<f64>() / col.len() as f64
                            + smoothing
                    })
                    .collect(),
            );
        }
        Ok(model)
    }

    pub fn predict(&self, row: &[f64]) -> usize {
        let mut best = (f64::NEG_INFINITY, self.classes[0]);
        for (idx, class) in self.classes.iter().enumerate() {
            let mut score = self.priors[idx].ln();
            for (j, x) in row.iter().enumerate() {
                let var = self.variances[idx][j];
                score += -0.5 * (2.0 * std::f64::consts::PI * var).ln()
                    - (x - self.means[idx][j]).powi(2) / (2.0 * var);
            }
            if score > best.0 {
                best = (score, *class);
            }
        }
        best.1
    }
}

/// k-nearest neighbours on standardised features.
#[derive(Debug, Clone)]
pub struct Knn {
    scaler: Scaler,
    rows: Vec<Vec<f64>>,
    targets: Vec<f64>,
    k: usize,
}

impl Knn {
    pub fn fit(rows: &[Vec<f64>], targets: &[f64], k: usize) -> Self {
        let scaler = Scaler::fit(rows);
        Self {
            rows: rows.iter().map(|r| scaler.apply(r)).collect(),
            scaler,
            targets: targets.to_vec(),
            k: k.clamp(1, rows.len().max(1)),
        }
    }

    fn neighbours(&self, row: &[f64]) -> Vec<f64> {
        let query = self.scaler.apply(row);
        let mut distances: Vec<(f64, f64)> = self
            .rows
            .iter()
            .zip(&self.targets)
            .map(|(r, t)| {
                let d: f64 = r.iter().zip(&query).map(|(a, b)| (a - b).powi(2)).sum();
                (d, *t)
            })
            .collect();
        distances.sort_by(|a, b| a.0.total_cmp(&b.0));
        distances.into_iter().take(self.k).map(|(_, t)| t).collect()
    }

    /// Majority vote; ties go to the smaller class index.
    pub fn classify(&self, row: &[f64]) -> usize {
        let mut votes: BTreeMap<usize, usize> = BTreeMap::new();
        for t in self.neighbours(row) {
            *votes.entry(t as usize).or_insert(0) += 1;
        }
        votes
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            .map(|(class, _)| class)
            .unwrap_or(0)
    }

    pub fn regress(&self, row: &[f64]) -> f64 {
        mean(&self.neighbours(row))
    }
}

/// Whether a tree predicts class indices or continuous values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TreeTask {
    Classification,
    Regression,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// CART decision tree (Gini for classes, squared error for values).
#[derive(Debug, Clone)]
pub struct DecisionTree {
    root: Node,
}

const MIN_SPLIT: usize = 2;

impl DecisionTree {
    pub fn fit(rows: &[Vec<f64>], targets: &[f64], task: TreeTask, max_depth: usize) -> Self {
        let indices: Vec<usize> = (0..rows.len()).collect();
        Self {
            root: grow(rows, targets, &indices, task, max_depth),
        }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}

fn leaf_value(targets: &[f64], indices: &[usize], task: TreeTask) -> f64 {
    match task {
        TreeTask::Regression => mean(&indices.iter().map(|&i| targets[i]).collect::<Vec<_>>()),
        TreeTask::Classification => {
            let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
            for &i in indices {
                *counts.entry(targets[i] as usize).or_insert(0) += 1;
            }
            counts
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
                .map(|(class, _)| class as f64)
                .unwrap_or(0.0)
        }
    }
}

fn impurity(targets: &[f64], indices: &[usize], task: TreeTask) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    let n = indices.len() as f64;
    match task {
        TreeTask::Regression => {
            let m = indices.iter().map(|&i| targets[i]).sum::<f64>() / n;
            indices.iter().map(|&i| (targets[i] - m).powi(2)).sum::<f64>() / n
        }
        TreeTask::Classification => {
            let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
            for &i in indices {
                *counts.entry(targets[i] as usize).or_insert(0) += 1;
            }
            1.0 - counts
                .values()
                .map(|c| (*c as f64 / n).powi(2))
                .sum::<f64>()
        }
    }
}

fn grow(rows: &[Vec<f64>], targets: &[f64], indices: &[usize], task: TreeTask, depth: usize) -> Node {
    let parent = impurity(targets, indices, task);
    if depth == 0 || indices.len() < MIN_SPLIT || parent <= f64::EPSILON {
        return Node::Leaf(leaf_value(targets, indices, task));
    }

    let width = rows.first().map(Vec::len).unwrap_or(0);
    let n = indices.len() as f64;
    let mut best: Option<(f64, usize, f64)> = None;
    for feature in 0..width {
        let mut values: Vec<f64> = indices.iter().map(|&i| rows[i][feature]).collect();
        values.sort_by(|a, b| a.total_cmp(b));
        values.dedup();
        for pair in values.windows(2) {
            let threshold = (pair[0] + pair[1]) / 2.0;
            let (left, right): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| rows[i][feature] <= threshold);
            let score = (left.len() as f64 * impurity(targets, &left, task)
                + right.len() as f64 * impurity(targets, &right, task))
                / n;
            if best.is_none_or(|(s, _, _)| score < s) {
                best = Some((score, feature, threshold));
            }
        }
    }

    match best {
        Some((score, feature, threshold)) if score < parent => {
            let (left, right): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| rows[i][feature] <= threshold);
            Node::Split {
                feature,
                threshold,
                left: Box::new(grow(rows, targets, &left, task, depth - 1)),
                right: Box::new(grow(rows, targets, &right, task, depth - 1)),
            }
        }
        _ => Node::Leaf(leaf_value(targets, indices, task)),
    }
}

/// Ridge regression on standardised features with an unpenalised intercept.
#[derive(Debug, Clone)]
pub struct Ridge {
    scaler: Scaler,
    intercept: f64,
    weights: Vec<f64>,
}

impl Ridge {
    pub fn fit(rows: &[Vec<f64>], y: &[f64], lambda: f64) -> FitResult<Self> {
        let scaler = Scaler::fit(rows);
        let scaled: Vec<Vec<f64>> = rows.iter().map(|r| scaler.apply(r)).collect();
        let x = design_matrix(&scaled, false);
        let intercept = mean(y);
        let centred = DVector::from_iterator(y.len(), y.iter().map(|v| v - intercept));
        let width = x.ncols();
        let penalised = x.transpose() * &x + DMatrix::<f64>::identity(width, width) * lambda;
        let inverse = penalised.try_inverse().ok_or_else(|| {
            FailureReason::SingularMatrix("penalised normal equations are singular".to_string())
        })?;
        let weights = (inverse * x.transpose() * centred).iter().copied().collect();
        Ok(Self {
            scaler,
            intercept,
            weights,
        })
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .scaler
                .apply(row)
                .iter()
                .zip(&self.weights)
                .map(|(x, w)| x * w)
                .sum::<f64>()
    }
}

// ============================================================================
// Splits and metrics
// ============================================================================

/// Seeded train/test split that keeps every class in both halves when it can.
pub fn stratified_split(labels: &[usize], test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (idx, label) in labels.iter().enumerate() {
        by_class.entry(*label).or_default().push(idx);
    }

    let mut train = Vec::new();
    let mut test = Vec::new();
    for (_, mut members) in by_class {
        members.shuffle(&mut rng);
        let mut held = (members.len() as f64 * test_fraction).round() as usize;
        if members.len() >= 2 {
            held = held.clamp(1, members.len() - 1);
        } else {
            held = 0;
        }
        test.extend_from_slice(&members[..held]);
        train.extend_from_slice(&members[held..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

/// Seeded shuffled train/test split.
pub fn random_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);
    let held = ((n as f64 * test_fraction).round() as usize).clamp(1, n.saturating_sub(2).max(1));
    let mut test = indices[..held].to_vec();
    let mut train = indices[held..].to_vec();
    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

pub fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
    let hits = truth.iter().zip(predicted).filter(|(a, b)| a == b).count();
    hits as f64 / truth.len().max(1) as f64
}

/// Unweighted mean of per-class F1 over the classes seen in `truth`.
pub fn macro_f1(truth: &[usize], predicted: &[usize]) -> f64 {
    let mut classes: Vec<usize> = truth.to_vec();
    classes.sort_unstable();
    classes.dedup();
    let scores: Vec<f64> = classes
        .iter()
        .map(|&c| {
            let tp = truth.iter().zip(predicted).filter(|(t, p)| **t == c && **p == c).count() as f64;
            let fp = truth.iter().zip(predicted).filter(|(t, p)| **t != c && **p == c).count() as f64;
            let fn_ = truth.iter().zip(predicted).filter(|(t, p)| **t == c && **p != c).count() as f64;
            if tp == 0.0 { 0.0 } else { 2.0 * tp / (2.0 * tp + fp + fn_) }
        })
        .collect();
    mean(&scores)
}

/// `(r_squared, rmse, mae)` of predictions against observed values.
pub fn regression_scores(truth: &[f64], predicted: &[f64]) -> (f64, f64, f64) {
    let n = truth.len().max(1) as f64;
    let m = mean(truth);
    let sse: f64 = truth.iter().zip(predicted).map(|(t, p)| (t - p).powi(2)).sum();
    let sst: f64 = truth.iter().map(|t| (t - m).powi(2)).sum();
    let mae = truth.iter().zip(predicted).map(|(t, p)| (t - p).abs()).sum::<f64>() / n;
    let r2 = if sst > 0.0 { 1.0 - sse / sst } else { f64::NAN };
    (r2, (sse / n).sqrt(), mae)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(values: &[f64]) -> Vec<Vec<f64>> {
        values.iter().map(|v| vec![*v]).collect()
    }

    #[test]
    fn test_ols_recovers_line_with_noise() {
        let x = rows(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let y = [3.1, 4.9, 7.2, 8.8, 11.1, 13.0];
        let fit = ols(&x, &y).unwrap();
        assert!((fit.coefficients[1] - 2.0).abs() < 0.1);
        assert!(fit.r_squared > 0.99);
        assert!(fit.f_p_value < 0.001);
        assert!((fit.predict(&[7.0]) - 15.0).abs() < 0.5);
    }

    #[test]
    fn test_ols_collinear_is_singular() {
        let x: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64, 2.0 * i as f64]).collect();
        let y = [1.0, 3.0, 2.0, 5.0, 4.0, 6.0];
        assert!(matches!(ols(&x, &y), Err(FailureReason::SingularMatrix(_))));
    }

    #[test]
    fn test_logistic_converges_on_overlapping_classes() {
        let x = rows(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let y = [0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0];
        let fit = logistic(&x, &y, 100).unwrap();
        assert!(fit.coefficients[1] > 0.0);
        assert!(fit.pseudo_r_squared() > 0.0 && fit.pseudo_r_squared() < 1.0);
    }

    #[test]
    fn test_logistic_fails_on_separation() {
        let x = rows(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let y = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let error = logistic(&x, &y, 100).unwrap_err();
        assert!(matches!(
            error,
            FailureReason::NonConvergence(_) | FailureReason::SingularMatrix(_)
        ));
    }

    #[test]
    fn test_auc_bounds() {
        assert_eq!(auc(&[0.1, 0.2, 0.8, 0.9], &[false, false, true, true]), Some(1.0));
        assert_eq!(auc(&[0.9, 0.8, 0.2, 0.1], &[false, false, true, true]), Some(0.0));
        assert_eq!(auc(&[0.5, 0.5], &[true, true]), None);
    }

    #[test]
    fn test_tree_and_knn_classify_thresholds() {
        let x = rows(&[1.0, 2.0, 3.0, 10.0, 11.0, 12.0]);
        let labels = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let tree = DecisionTree::fit(&x, &labels, TreeTask::Classification, 3);
        assert_eq!(tree.predict(&[2.5]), 0.0);
        assert_eq!(tree.predict(&[9.0]), 1.0);
        let knn = Knn::fit(&x, &labels, 3);
        assert_eq!(knn.classify(&[11.5]), 1);
    }

    #[test]
    fn test_naive_bayes_needs_two_classes() {
        let x = rows(&[1.0, 2.0]);
        assert!(NaiveBayes::fit(&x, &[0, 0]).is_err());
        let model = NaiveBayes::fit(&rows(&[1.0, 1.2, 5.0, 5.3]), &[0, 0, 1, 1]).unwrap();
        assert_eq!(model.predict(&[4.9]), 1);
    }

    #[test]
    fn test_ridge_shrinks_towards_mean() {
        let x = rows(&[1.0, 2.0, 3.0, 4.0]);
        let y = [2.0, 4.0, 6.0, 8.0];
        let light = Ridge::fit(&x, &y, 0.01).unwrap();
        let heavy = Ridge::fit(&x, &y, 100.0).unwrap();
        assert!((light.predict(&[4.0]) - 8.0).abs() < 0.1);
        assert!((heavy.predict(&[4.0]) - 5.0).abs() < (light.predict(&[4.0]) - 5.0).abs());
    }

    #[test]
    fn test_stratified_split_keeps_classes() {
        let labels: Vec<usize> = (0..20).map(|i| usize::from(i >= 14)).collect();
        let (train, test) = stratified_split(&labels, 0.3, 42);
        assert_eq!(train.len() + test.len(), 20);
        assert!(test.iter().any(|&i| labels[i] == 1));
        assert!(train.iter().any(|&i| labels[i] == 1));
        assert_eq!(stratified_split(&labels, 0.3, 42), (train, test));
    }

    #[test]
    fn test_metrics() {
        assert_eq!(accuracy(&[0, 1, 1, 0], &[0, 1, 0, 0]), 0.75);
        assert!((macro_f1(&[0, 0, 1, 1], &[0, 0, 1, 1]) - 1.0).abs() < 1e-12);
        let (r2, rmse, mae) = regression_scores(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!((r2, rmse, mae), (1.0, 0.0, 0.0));
    }
}
