//! Univariate summaries over already-filtered (missing-free) samples.

use serde::Serialize;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n - 1 denominator). NaN below two observations.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

/// Linear-interpolated quantile of a sorted slice.
pub fn quantile_sorted(values: &[f64], quantile: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let pos = quantile.clamp(0.0, 1.0) * (values.len() as f64 - 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return values[lower];
    }
    let weight = pos - lower as f64;
    values[lower] + (values[upper] - values[lower]) * weight
}

pub fn median(values: &[f64]) -> f64 {
    quantile_sorted(&sorted(values), 0.5)
}

/// Bias-adjusted sample skewness (G1). Needs three observations and spread.
pub fn skewness(values: &[f64]) -> Option<f64> {
    let n = values.len() as f64;
    if values.len() < 3 {
        return None;
    }
    let m = mean(values);
    let m2 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    let m3 = values.iter().map(|v| (v - m).powi(3)).sum::<f64>() / n;
    if m2 <= f64::EPSILON {
        return None;
    }
    let g1 = m3 / m2.powf(1.5);
    Some(g1 * (n * (n - 1.0)).sqrt() / (n - 2.0))
}

/// Bias-adjusted excess kurtosis (G2). Needs four observations and spread.
pub fn excess_kurtosis(values: &[f64]) -> Option<f64> {
    let n = values.len() as f64;
    if values.len() < 4 {
        return None;
    }
    let m = mean(values);
    let m2 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    let m4 = values.iter().map(|v| (v - m).powi(4)).sum::<f64>() / n;
    if m2 <= f64::EPSILON {
        return None;
    }
    let g2 = m4 / (m2 * m2) - 3.0;
    Some(((n + 1.0) * g2 + 6.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0)))
}

/// Ranks starting at 1, ties receiving their average rank.
pub fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }
    ranks
}

/// Standardize to mean 0 / sd 1. A constant input maps to zeros.
pub fn z_scores(values: &[f64]) -> Vec<f64> {
    let m = mean(values);
    let sd = std_dev(values);
    if !sd.is_finite() || sd <= f64::EPSILON {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - m) / sd).collect()
}

/// Five-number summary plus mean and standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub n: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

pub fn summarize(values: &[f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }
    let s = sorted(values);
    Some(Summary {
        n: s.len(),
        mean: mean(&s),
        std_dev: std_dev(&s),
        min: s[0],
        q1: quantile_sorted(&s, 0.25),
        median: quantile_sorted(&s, 0.5),
        q3: quantile_sorted(&s, 0.75),
        max: s[s.len() - 1],
    })
}

/// Tukey fences (1.5 IQR) and the number of values outside them.
pub fn iqr_outliers(values: &[f64]) -> (f64, f64, usize) {
    let s = sorted(values);
    let q1 = quantile_sorted(&s, 0.25);
    let q3 = quantile_sorted(&s, 0.75);
    let iqr = q3 - q1;
    let (lower, upper) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
    let count = s.iter().filter(|v| **v < lower || **v > upper).count();
    (lower, upper, count)
}

/// Equal-width histogram over a sorted sample: `(start, end, count)` per bin.
pub fn histogram(sorted_values: &[f64], bins: usize) -> Vec<(f64, f64, usize)> {
    let (Some(&min), Some(&max)) = (sorted_values.first(), sorted_values.last()) else {
        return Vec::new();
    };
    if (max - min).abs() < f64::EPSILON {
        return vec![(min, max, sorted_values.len())];
    }

    let bin_count = bins.max(5);
    let width = (max - min) / bin_count as f64;
    let mut counts = vec![0usize; bin_count];
    for value in sorted_values {
        let index = (((value - min) / width) as usize).min(bin_count - 1);
        counts[index] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(idx, count)| {
            (
                min + idx as f64 * width,
                min + (idx as f64 + 1.0) * width,
                count,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_mean_and_variance() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(approx(mean(&data), 5.0));
        assert!(approx(variance(&data), 32.0 / 7.0));
        assert!(variance(&[1.0]).is_nan());
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn test_quantiles() {
        let s = [1.0, 2.0, 3.0, 4.0];
        assert!(approx(quantile_sorted(&s, 0.5), 2.5));
        assert!(approx(quantile_sorted(&s, 0.25), 1.75));
        assert!(approx(median(&[5.0, 1.0, 3.0]), 3.0));
    }

    #[test]
    fn test_ranks_with_ties() {
        assert_eq!(ranks(&[10.0, 20.0, 10.0, 30.0]), vec![1.5, 3.0, 1.5, 4.0]);
    }

    #[test]
    fn test_skewness_sign() {
        let right = [1.0, 1.0, 1.0, 2.0, 2.0, 3.0, 10.0];
        assert!(skewness(&right).unwrap() > 0.0);
        assert!(skewness(&[1.0, 1.0, 1.0]).is_none());
        assert!(excess_kurtosis(&[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn test_z_scores_of_constant() {
        assert_eq!(z_scores(&[3.0, 3.0]), vec![0.0, 0.0]);
        let z = z_scores(&[1.0, 2.0, 3.0]);
        assert!(approx(z[0], -1.0) && approx(z[2], 1.0));
    }

    #[test]
    fn test_iqr_outliers() {
        let (_, upper, count) = iqr_outliers(&[1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 50.0]);
        assert_eq!(count, 1);
        assert!(upper < 50.0);
    }

    #[test]
    fn test_histogram_counts_everything() {
        let s = sorted(&[1.0, 2.0, 2.5, 3.0, 9.0, 10.0]);
        let bins = histogram(&s, 5);
        assert_eq!(bins.len(), 5);
        assert_eq!(bins.iter().map(|b| b.2).sum::<usize>(), 6);
    }
}
