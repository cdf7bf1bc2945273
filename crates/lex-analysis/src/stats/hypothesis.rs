//! Classical hypothesis tests with their effect sizes.

use super::descriptive::{mean, quantile_sorted, sorted, variance};
use super::distributions::{chi2_upper, f_upper, t_critical, t_two_sided};

/// Result of an F-type test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FTest {
    pub f: f64,
    pub df1: f64,
    pub df2: f64,
    pub p_value: f64,
}

/// Levene's test for equal variances, centred on group medians (Brown-Forsythe).
pub fn levene(groups: &[Vec<f64>]) -> Option<FTest> {
    if groups.len() < 2 || groups.iter().any(|g| g.len() < 2) {
        return None;
    }

    let deviations: Vec<Vec<f64>> = groups
        .iter()
        .map(|group| {
            let median = quantile_sorted(&sorted(group), 0.5);
            group.iter().map(|v| (v - median).abs()).collect()
        })
        .collect();

    let table = one_way_anova(&deviations)?;
    Some(FTest {
        f: table.f,
        df1: table.df_between,
        df2: table.df_within,
        p_value: table.p_value,
    })
}

/// One-way ANOVA decomposition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnovaTable {
    pub ss_between: f64,
    pub ss_within: f64,
    pub df_between: f64,
    pub df_within: f64,
    pub f: f64,
    pub p_value: f64,
    pub eta_squared: f64,
}

pub fn one_way_anova(groups: &[Vec<f64>]) -> Option<AnovaTable> {
    let k = groups.len();
    let n: usize = groups.iter().map(Vec::len).sum();
    if k < 2 || n <= k || groups.iter().any(Vec::is_empty) {
        return None;
    }

    let grand_mean = groups.iter().flatten().sum::<f64>() / n as f64;
    let ss_between: f64 = groups
        .iter()
        .map(|g| g.len() as f64 * (mean(g) - grand_mean).powi(2))
        .sum();
    let ss_within: f64 = groups
        .iter()
        .map(|g| {
            let m = mean(g);
            g.iter().map(|v| (v - m).powi(2)).sum::<f64>()
        })
        .sum();

    let df_between = (k - 1) as f64;
    let df_within = (n - k) as f64;
    let ms_within = ss_within / df_within;
    if !ms_within.is_finite() || ms_within <= 0.0 {
        return None;
    }

    let f = (ss_between / df_between) / ms_within;
    let p_value = f_upper(f, df_between, df_within)?;
    let ss_total = ss_between + ss_within;

    Some(AnovaTable {
        ss_between,
        ss_within,
        df_between,
        df_within,
        f,
        p_value,
        eta_squared: if ss_total > 0.0 { ss_between / ss_total } else { 0.0 },
    })
}

/// Result of a t-test on a mean difference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTest {
    pub t: f64,
    pub df: f64,
    pub p_value: f64,
    pub mean_difference: f64,
    pub std_error: f64,
    /// Confidence interval of the mean difference.
    pub ci: Option<(f64, f64)>,
}

fn t_from_difference(diff: f64, se: f64, df: f64, level: f64) -> Option<TTest> {
    if !se.is_finite() || se <= 0.0 || df <= 0.0 {
        return None;
    }
    let t = diff / se;
    let p_value = t_two_sided(t, df)?;
    let ci = t_critical(df, level).map(|crit| (diff - crit * se, diff + crit * se));
    Some(TTest {
        t,
        df,
        p_value,
        mean_difference: diff,
        std_error: se,
        ci,
    })
}

/// Student's t-test with pooled variance.
pub fn student_t(a: &[f64], b: &[f64], level: f64) -> Option<TTest> {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    if a.len() < 2 || b.len() < 2 {
        return None;
    }
    let df = n1 + n2 - 2.0;
    let pooled = ((n1 - 1.0) * variance(a) + (n2 - 1.0) * variance(b)) / df;
    let se = (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();
    t_from_difference(mean(a) - mean(b), se, df, level)
}

/// Welch's t-test (unequal variances, Satterthwaite degrees of freedom).
pub fn welch_t(a: &[f64], b: &[f64], level: f64) -> Option<TTest> {
    if a.len() < 2 || b.len() < 2 {
        return None;
    }
    let v1 = variance(a) / a.len() as f64;
    let v2 = variance(b) / b.len() as f64;
    let se = (v1 + v2).sqrt();
    let df = (v1 + v2).powi(2)
        / (v1.powi(2) / (a.len() as f64 - 1.0) + v2.powi(2) / (b.len() as f64 - 1.0));
    t_from_difference(mean(a) - mean(b), se, df, level)
}

/// Paired t-test on `a - b`.
pub fn paired_t(a: &[f64], b: &[f64], level: f64) -> Option<TTest> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let diffs: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
    let se = (variance(&diffs) / diffs.len() as f64).sqrt();
    t_from_difference(mean(&diffs), se, (diffs.len() - 1) as f64, level)
}

/// Cohen's d with the pooled standard deviation.
pub fn cohens_d(a: &[f64], b: &[f64]) -> Option<f64> {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    if a.len() < 2 || b.len() < 2 {
        return None;
    }
    let pooled = (((n1 - 1.0) * variance(a) + (n2 - 1.0) * variance(b)) / (n1 + n2 - 2.0)).sqrt();
    if pooled <= f64::EPSILON {
        return None;
    }
    Some((mean(a) - mean(b)) / pooled)
}

/// Cohen's d_z for paired data: mean difference over SD of differences.
pub fn cohens_dz(a: &[f64], b: &[f64]) -> Option<f64> {
    let diffs: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
    let sd = variance(&diffs).sqrt();
    if !sd.is_finite() || sd <= f64::EPSILON {
        return None;
    }
    Some(mean(&diffs) / sd)
}

/// Pearson chi-square test of independence on a contingency table.
#[derive(Debug, Clone, PartialEq)]
pub struct ChiSquare {
    pub statistic: f64,
    pub df: f64,
    pub p_value: f64,
    pub cramers_v: f64,
    pub n: usize,
    pub expected: Vec<Vec<f64>>,
    /// Share of cells whose expected count is below 5.
    pub low_expected_share: f64,
}

pub fn chi_square_independence(counts: &[Vec<usize>]) -> Option<ChiSquare> {
    let rows = counts.len();
    let cols = counts.first().map(Vec::len).unwrap_or(0);
    if rows < 2 || cols < 2 {
        return None;
    }

    let row_totals: Vec<f64> = counts
        .iter()
        .map(|r| r.iter().sum::<usize>() as f64)
        .collect();
    let col_totals: Vec<f64> = (0..cols)
        .map(|j| counts.iter().map(|r| r[j]).sum::<usize>() as f64)
        .collect();
    let n: f64 = row_totals.iter().sum();
    if n <= 0.0 || row_totals.iter().any(|t| *t == 0.0) || col_totals.iter().any(|t| *t == 0.0)
    {
        return None;
    }

    let mut statistic = 0.0;
    let mut low = 0usize;
    let mut expected = vec![vec![0.0; cols]; rows];
    for i in 0..rows {
        for j in 0..cols {
            let e = row_totals[i] * col_totals[j] / n;
            expected[i][j] = e;
            if e < 5.0 {
                low += 1;
            }
            statistic += (counts[i][j] as f64 - e).powi(2) / e;
        }
    }

    let df = ((rows - 1) * (cols - 1)) as f64;
    let min_dim = (rows.min(cols) - 1) as f64;
    Some(ChiSquare {
        statistic,
        df,
        p_value: chi2_upper(statistic, df)?,
        cramers_v: (statistic / (n * min_dim)).sqrt().min(1.0),
        n: n as usize,
        expected,
        low_expected_share: low as f64 / (rows * cols) as f64,
    })
}

/// Jarque-Bera normality test: `(statistic, p_value)`.
pub fn jarque_bera(values: &[f64]) -> Option<(f64, f64)> {
    let n = values.len() as f64;
    if values.len() < 8 {
        return None;
    }
    let m = mean(values);
    let m2 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    if m2 <= f64::EPSILON {
        return None;
    }
    let m3 = values.iter().map(|v| (v - m).powi(3)).sum::<f64>() / n;
    let m4 = values.iter().map(|v| (v - m).powi(4)).sum::<f64>() / n;
    let skew = m3 / m2.powf(1.5);
    let kurt = m4 / (m2 * m2) - 3.0;
    let jb = n / 6.0 * (skew * skew + kurt * kurt / 4.0);
    Some((jb, chi2_upper(jb, 2.0)?))
}
