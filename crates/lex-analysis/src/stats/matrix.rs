//! Matrix helpers for latent-structure and regression computations.

use super::correlation::pearson;
use super::distributions::chi2_upper;
use nalgebra::{DMatrix, SymmetricEigen};

/// Correlation matrix of equally long, missing-free columns.
///
/// Returns `None` if any column is constant.
pub fn correlation_matrix(columns: &[Vec<f64>]) -> Option<DMatrix<f64>> {
    let p = columns.len();
    let mut m = DMatrix::identity(p, p);
    for i in 0..p {
        for j in (i + 1)..p {
            let r = pearson(&columns[i], &columns[j])?;
            m[(i, j)] = r;
            m[(j, i)] = r;
        }
    }
    Some(m)
}

/// Eigen-decomposition of a symmetric matrix, sorted by descending eigenvalue.
///
/// Eigenvector signs are normalised so each vector's largest-magnitude
/// entry is positive.
pub fn sorted_eigen(m: &DMatrix<f64>) -> (Vec<f64>, DMatrix<f64>) {
    let eigen = SymmetricEigen::new(m.clone());
    let n = eigen.eigenvalues.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let values = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
    let mut vectors = DMatrix::zeros(m.nrows(), n);
    for (col, &i) in order.iter().enumerate() {
        let v = eigen.eigenvectors.column(i);
        let pivot = v.iter().copied().fold(0.0_f64, |acc, x| {
            if x.abs() > acc.abs() { x } else { acc }
        });
        let sign = if pivot < 0.0 { -1.0 } else { 1.0 };
        for row in 0..m.nrows() {
            vectors[(row, col)] = v[row] * sign;
        }
    }
    (values, vectors)
}

/// Kaiser-Meyer-Olkin sampling adequacy: overall KMO and per-variable MSA.
///
/// `None` when the correlation matrix is singular.
pub fn kmo(r: &DMatrix<f64>) -> Option<(f64, Vec<f64>)> {
    let inv = r.clone().try_inverse()?;
    let p = r.nrows();
    let mut partial = DMatrix::zeros(p, p);
    for i in 0..p {
        for j in 0..p {
            if i != j {
                let denom = (inv[(i, i)] * inv[(j, j)]).sqrt();
                if !denom.is_finite() || denom <= 0.0 {
                    return None;
                }
                partial[(i, j)] = -inv[(i, j)] / denom;
            }
        }
    }

    let mut r2_total = 0.0;
    let mut p2_total = 0.0;
    let mut msa = Vec::with_capacity(p);
    for i in 0..p {
        let mut r2 = 0.0;
        let mut p2 = 0.0;
        for j in 0..p {
            if i != j {
                r2 += r[(i, j)].powi(2);
                p2 += partial[(i, j)].powi(2);
            }
        }
        r2_total += r2;
        p2_total += p2;
        msa.push(if r2 + p2 > 0.0 { r2 / (r2 + p2) } else { 0.0 });
    }

    let overall = r2_total / (r2_total + p2_total);
    overall.is_finite().then_some((overall, msa))
}

/// Bartlett's test of sphericity: `(chi_square, df, p_value)`.
pub fn bartlett_sphericity(r: &DMatrix<f64>, n: usize) -> Option<(f64, f64, f64)> {
    let p = r.nrows() as f64;
    let det = r.determinant();
    if !det.is_finite() || det <= 0.0 || n < 2 {
        return None;
    }
    let chi = -((n as f64 - 1.0) - (2.0 * p + 5.0) / 6.0) * det.ln();
    let df = p * (p - 1.0) / 2.0;
    Some((chi, df, chi2_upper(chi, df)?))
}

/// Varimax rotation of a loading matrix (variables x factors).
pub fn varimax(loadings: &DMatrix<f64>, max_iterations: usize) -> DMatrix<f64> {
    let (p, k) = loadings.shape();
    if k < 2 {
        return loadings.clone();
    }

    let mut rotation = DMatrix::<f64>::identity(k, k);
    let mut objective = 0.0;
    for _ in 0..max_iterations {
        let lambda = loadings * &rotation;
        let mut target = lambda.map(|x| x.powi(3));
        for j in 0..k {
            let col_ss: f64 = lambda.column(j).iter().map(|x| x * x).sum();
            for i in 0..p {
                target[(i, j)] -= lambda[(i, j)] * col_ss / p as f64;
            }
        }

        let svd = (loadings.transpose() * target).svd(true, true);
        let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
            break;
        };
        rotation = u * v_t;

        let next = svd.singular_values.sum();
        if next < objective * (1.0 + 1e-6) {
            break;
        }
        objective = next;
    }
    loadings * rotation
}

/// Build a design matrix (rows x [1, predictors...]).
pub fn design_matrix(rows: &[Vec<f64>], intercept: bool) -> DMatrix<f64> {
    let offset = usize::from(intercept);
    let width = rows.first().map(Vec::len).unwrap_or(0) + offset;
    DMatrix::from_fn(rows.len(), width, |i, j| {
        if intercept && j == 0 {
            1.0
        } else {
            rows[i][j - offset]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_eigen_descending() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.5, 1.0]);
        let (values, vectors) = sorted_eigen(&m);
        assert!((values[0] - 1.5).abs() < 1e-9);
        assert!((values[1] - 0.5).abs() < 1e-9);
        assert!(vectors[(0, 0)] > 0.0 && vectors[(1, 0)] > 0.0);
    }

    #[test]
    fn test_kmo_of_singular_matrix_is_none() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        assert!(kmo(&m).is_none());
        assert!(bartlett_sphericity(&m, 10).is_none());
    }

    #[test]
    fn test_kmo_in_unit_range() {
        let m = DMatrix::from_row_slice(
            3,
            3,
            &[1.0, 0.6, 0.5, 0.6, 1.0, 0.55, 0.5, 0.55, 1.0],
        );
        let (overall, msa) = kmo(&m).unwrap();
        assert!(overall > 0.5 && overall < 1.0);
        assert_eq!(msa.len(), 3);
    }

    #[test]
    fn test_bartlett_identity_not_significant() {
        let (chi, df, p) = bartlett_sphericity(&DMatrix::identity(3, 3), 50).unwrap();
        assert!(chi.abs() < 1e-9);
        assert_eq!(df, 3.0);
        assert!(p > 0.99);
    }

    #[test]
    fn test_varimax_preserves_communalities() {
        let loadings = DMatrix::from_row_slice(4, 2, &[0.7, 0.3, 0.6, 0.4, 0.3, 0.7, 0.2, 0.8]);
        let rotated = varimax(&loadings, 100);
        for i in 0..4 {
            let before: f64 = loadings.row(i).iter().map(|x| x * x).sum();
            let after: f64 = rotated.row(i).iter().map(|x| x * x).sum();
            assert!((before - after).abs() < 1e-9);
        }
    }

    #[test]
    fn test_design_matrix_with_intercept() {
        let x = design_matrix(&[vec![2.0, 3.0], vec![4.0, 5.0]], true);
        assert_eq!(x.shape(), (2, 3));
        assert_eq!(x[(1, 0)], 1.0);
        assert_eq!(x[(1, 2)], 5.0);
    }
}
