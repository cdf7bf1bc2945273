//! Bivariate correlation with significance and Fisher-z intervals.

use super::descriptive::{mean, ranks};
use super::distributions::{normal_quantile, t_two_sided};
use serde::{Deserialize, Serialize};

/// Correlation coefficient family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationKind {
    #[default]
    Pearson,
    Spearman,
}

impl CorrelationKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pearson" => Some(Self::Pearson),
            "spearman" => Some(Self::Spearman),
            _ => None,
        }
    }
}

/// Pearson's r. `None` when either variable has no spread.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let (mx, my) = (mean(x), mean(y));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx <= f64::EPSILON || syy <= f64::EPSILON {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    pearson(&ranks(x), &ranks(y))
}

/// A tested correlation coefficient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrelationTest {
    pub r: f64,
    pub p_value: f64,
    pub n: usize,
    /// Fisher-z confidence interval, available when n > 3.
    pub ci: Option<(f64, f64)>,
}

/// Correlate two equally long, missing-free samples and test r = 0.
pub fn correlation_test(
    x: &[f64],
    y: &[f64],
    kind: CorrelationKind,
    level: f64,
) -> Option<CorrelationTest> {
    let n = x.len();
    if n < 3 {
        return None;
    }
    let r = match kind {
        CorrelationKind::Pearson => pearson(x, y)?,
        CorrelationKind::Spearman => spearman(x, y)?,
    };

    let df = (n - 2) as f64;
    let p_value = if (1.0 - r.abs()) < 1e-12 {
        0.0
    } else {
        t_two_sided(r * (df / (1.0 - r * r)).sqrt(), df)?
    };

    Some(CorrelationTest {
        r,
        p_value,
        n,
        ci: fisher_interval(r, n, level),
    })
}

fn fisher_interval(r: f64, n: usize, level: f64) -> Option<(f64, f64)> {
    if n <= 3 {
        return None;
    }
    let z = r.clamp(-0.999_999, 0.999_999).atanh();
    let se = 1.0 / ((n - 3) as f64).sqrt();
    let crit = normal_quantile(1.0 - (1.0 - level) / 2.0)?;
    Some(((z - crit * se).tanh(), (z + crit * se).tanh()))
}
