//! Tail probabilities and quantiles backed by `statrs`.
//!
//! Every function returns `None` instead of NaN when the distribution
//! cannot be built (non-positive degrees of freedom) or the input is not finite.

use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};

fn finite(p: f64) -> Option<f64> {
    p.is_finite().then_some(p.clamp(0.0, 1.0))
}

/// Two-sided p-value of a t statistic.
pub fn t_two_sided(t: f64, df: f64) -> Option<f64> {
    if t.is_nan() || df <= 0.0 {
        return None;
    }
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    finite(2.0 * dist.sf(t.abs()))
}

/// Critical t value for a two-sided interval at `level` confidence.
pub fn t_critical(df: f64, level: f64) -> Option<f64> {
    if df <= 0.0 {
        return None;
    }
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    let q = dist.inverse_cdf(1.0 - (1.0 - level) / 2.0);
    q.is_finite().then_some(q)
}

/// Upper-tail p-value of an F statistic.
pub fn f_upper(f: f64, df1: f64, df2: f64) -> Option<f64> {
    if f.is_nan() || df1 <= 0.0 || df2 <= 0.0 {
        return None;
    }
    let dist = FisherSnedecor::new(df1, df2).ok()?;
    finite(dist.sf(f.max(0.0)))
}

/// Upper-tail p-value of a chi-square statistic.
pub fn chi2_upper(x: f64, df: f64) -> Option<f64> {
    if x.is_nan() || df <= 0.0 {
        return None;
    }
    let dist = ChiSquared::new(df).ok()?;
    finite(dist.sf(x.max(0.0)))
}

/// Two-sided p-value of a standard normal statistic.
pub fn normal_two_sided(z: f64) -> Option<f64> {
    if z.is_nan() {
        return None;
    }
    let dist = Normal::new(0.0, 1.0).ok()?;
    finite(2.0 * dist.sf(z.abs()))
}

/// Standard normal quantile.
pub fn normal_quantile(p: f64) -> Option<f64> {
    if !(p > 0.0 && p < 1.0) {
        return None;
    }
    let dist = Normal::new(0.0, 1.0).ok()?;
    let q = dist.inverse_cdf(p);
    q.is_finite().then_some(q)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_t_two_sided_symmetry() {
        let p_pos = t_two_sided(2.0, 10.0).unwrap();
        let p_neg = t_two_sided(-2.0, 10.0).unwrap();
        assert!((p_pos - p_neg).abs() < 1e-12);
        assert!((p_pos - 0.0734).abs() < 1e-3);
        assert!(t_two_sided(1.0, 0.0).is_none());
    }

    #[test]
    fn test_critical_values() {
        let t = t_critical(1000.0, 0.95).unwrap();
        assert!((t - 1.962).abs() < 1e-2);
        let z = normal_quantile(0.975).unwrap();
        assert!((z - 1.96).abs() < 1e-2);
    }

    #[test]
    fn test_chi2_and_f_tails() {
        assert!((chi2_upper(3.841, 1.0).unwrap() - 0.05).abs() < 1e-3);
        assert!((f_upper(4.0, 1.0, 1e6).unwrap() - 0.0455).abs() < 1e-3);
        assert!(normal_two_sided(f64::NAN).is_none());
    }
}
