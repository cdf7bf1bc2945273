//! Pairwise-deletion helpers.
//!
//! Every helper here keeps a row only when it is present in *all* of the
//! vectors handed to it, and nothing else. Callers pass exactly the variables
//! one computation uses, so unrelated missingness never shrinks N.

/// Values of `x` and `y` for rows where both are present.
pub fn paired(x: &[Option<f64>], y: &[Option<f64>]) -> (Vec<f64>, Vec<f64>) {
    x.iter()
        .zip(y.iter())
        .filter_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) => Some((*a, *b)),
            _ => None,
        })
        .unzip()
}

/// Numeric values paired with a label, for rows where both are present.
pub fn labelled(values: &[Option<f64>], labels: &[Option<String>]) -> Vec<(String, f64)> {
    values
        .iter()
        .zip(labels.iter())
        .filter_map(|(v, l)| match (v, l) {
            (Some(v), Some(l)) => Some((l.clone(), *v)),
            _ => None,
        })
        .collect()
}

/// Row indices present in every column.
pub fn complete_indices(columns: &[Vec<Option<f64>>]) -> Vec<usize> {
    let height = columns.iter().map(Vec::len).min().unwrap_or(0);
    (0..height)
        .filter(|&row| columns.iter().all(|col| col[row].is_some()))
        .collect()
}

/// Restrict every column to rows present in all of them.
///
/// Returns the surviving columns (same order as the input) and the
/// original row indices they came from.
pub fn complete_columns(columns: &[Vec<Option<f64>>]) -> (Vec<Vec<f64>>, Vec<usize>) {
    let rows = complete_indices(columns);
    let cols = columns
        .iter()
        .map(|col| rows.iter().filter_map(|&r| col[r]).collect())
        .collect();
    (cols, rows)
}

/// Row-major view of complete cases.
pub fn complete_rows(columns: &[Vec<Option<f64>>]) -> (Vec<Vec<f64>>, Vec<usize>) {
    let rows = complete_indices(columns);
    let data = rows
        .iter()
        .map(|&r| columns.iter().filter_map(|col| col[r]).collect())
        .collect();
    (data, rows)
}

/// Present values of a single column.
pub fn present(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paired_uses_rows_present_in_both() {
        let a = vec![Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)];
        let b = vec![Some(2.0), None, Some(3.0), Some(4.0), Some(5.0)];

        let (x, y) = paired(&a, &b);
        assert_eq!(x, vec![1.0, 4.0, 5.0]);
        assert_eq!(y, vec![2.0, 4.0, 5.0]);
    }

    #[test]
    fn test_complete_rows_ignores_other_columns() {
        let a = vec![Some(1.0), None, Some(3.0)];
        let b = vec![Some(1.0), Some(2.0), Some(3.0)];

        let (rows, idx) = complete_rows(&[a.clone(), b]);
        assert_eq!(idx, vec![0, 2]);
        assert_eq!(rows, vec![vec![1.0, 1.0], vec![3.0, 3.0]]);

        let (cols, _) = complete_columns(&[a]);
        assert_eq!(cols, vec![vec![1.0, 3.0]]);
    }

    #[test]
    fn test_labelled() {
        let v = vec![Some(1.0), Some(2.0), None];
        let l = vec![Some("a".to_string()), None, Some("b".to_string())];
        assert_eq!(labelled(&v, &l), vec![("a".to_string(), 1.0)]);
    }
}
