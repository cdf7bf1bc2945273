//! Association: correlation matrices and contingency tables.

use super::{StatisticComputer, alpha, guard_sample, label_column, numeric_columns};
use crate::config::EngineConfig;
use crate::dataset::{Dataset, paired};
use crate::error::Result;
use crate::request::{AnalysisMethod, MethodFamily, Role};
use crate::result::{
    Cell, FailureReason, FigureDescriptor, FigureKind, FigureSeries, Finding, RawOutput, Table,
};
use crate::stats::format::{correlation_label, cramers_v_label, significance_marker};
use crate::stats::hypothesis::chi_square_independence;
use crate::stats::{CorrelationKind, CorrelationTest, correlation_test};
use crate::validation::BoundRequest;
use std::collections::BTreeSet;
use tracing::debug;

const MIN_PAIRWISE: usize = 3;
const MIN_CROSSTAB: usize = 5;
const CI_LEVEL: f64 = 0.95;

/// Handles `correlation` and `crosstab`.
pub struct AssociationComputer;

impl StatisticComputer for AssociationComputer {
    fn family(&self) -> MethodFamily {
        MethodFamily::Association
    }

    fn compute(
        &self,
        dataset: &Dataset,
        request: &BoundRequest,
        config: &EngineConfig,
    ) -> Result<RawOutput> {
        match request.method {
            AnalysisMethod::Crosstab => crosstab(dataset, request, alpha(request, config)),
            _ => correlation(dataset, request, alpha(request, config)),
        }
    }
}

/// One cell of the correlation matrix, computed on its own pairwise rows.
struct PairCell {
    i: usize,
    j: usize,
    n: usize,
    test: Option<CorrelationTest>,
}

fn correlation(dataset: &Dataset, request: &BoundRequest, alpha: f64) -> Result<RawOutput> {
    let names = request.columns(Role::Variables);
    let kind = request
        .parameters
        .str("method")
        .and_then(CorrelationKind::parse)
        .unwrap_or_default();
    let columns = numeric_columns(dataset, request, Role::Variables)?;

    let mut cells = Vec::new();
    for i in 0..columns.len() {
        for j in (i + 1)..columns.len() {
            let (x, y) = paired(&columns[i], &columns[j]);
            let test = if x.len() >= MIN_PAIRWISE {
                correlation_test(&x, &y, kind, CI_LEVEL)
            } else {
                None
            };
            cells.push(PairCell {
                i,
                j,
                n: x.len(),
                test,
            });
        }
    }

    let computed: Vec<&PairCell> = cells.iter().filter(|c| c.test.is_some()).collect();
    if computed.is_empty() {
        let largest = cells.iter().map(|c| c.n).max().unwrap_or(0);
        if let Some(failed) = guard_sample(MIN_PAIRWISE, largest) {
            return Ok(failed);
        }
        return Ok(RawOutput::failure(FailureReason::ZeroVariance(
            "no variable pair has variation in both variables".to_string(),
        )));
    }

    let mut raw = RawOutput::new();
    for cell in cells.iter().filter(|c| c.test.is_none()) {
        let reason = if cell.n < MIN_PAIRWISE {
            format!("only {} paired observations", cell.n)
        } else {
            "one variable is constant".to_string()
        };
        raw.warn(format!(
            "Correlation {} x {} not computed: {}",
            names[cell.i], names[cell.j], reason
        ));
    }

    let size = names.len();
    let mut r = vec![vec![Cell::Empty; size]; size];
    let mut p = vec![vec![Cell::Empty; size]; size];
    let mut n = vec![vec![Cell::Empty; size]; size];
    for (idx, column) in columns.iter().enumerate() {
        r[idx][idx] = Cell::from(1.0);
        n[idx][idx] = Cell::from(column.iter().flatten().count());
    }

    let mut pairs = Table::new(
        "Pairwise correlations",
        [
            "variable_1", "variable_2", "r", "p_value", "n", "ci_lower", "ci_upper", "strength",
            "significance",
        ],
    );
    for cell in &cells {
        n[cell.i][cell.j] = Cell::from(cell.n);
        n[cell.j][cell.i] = Cell::from(cell.n);
        let Some(test) = cell.test else {
            continue;
        };
        for (a, b) in [(cell.i, cell.j), (cell.j, cell.i)] {
            r[a][b] = Cell::from(test.r);
            p[a][b] = Cell::from(test.p_value);
        }
        pairs.push_row(vec![
            Cell::from(names[cell.i].as_str()),
            Cell::from(names[cell.j].as_str()),
            Cell::from(test.r),
            Cell::from(test.p_value),
            Cell::from(test.n),
            Cell::from(test.ci.map(|c| c.0)),
            Cell::from(test.ci.map(|c| c.1)),
            Cell::from(correlation_label(test.r)),
            Cell::from(significance_marker(test.p_value)),
        ]);
    }

    let matrix = |title: &str, body: Vec<Vec<Cell>>| {
        let mut table = Table::new(
            title,
            std::iter::once("variable".to_string()).chain(names.iter().cloned()),
        );
        for (name, row) in names.iter().zip(body) {
            let mut cells = vec![Cell::from(name.as_str())];
            cells.extend(row);
            table.push_row(cells);
        }
        table
    };

    let strongest = computed
        .iter()
        .filter_map(|c| c.test.map(|t| (*c, t)))
        .max_by(|a, b| a.1.r.abs().total_cmp(&b.1.r.abs()));
    if let Some((cell, test)) = strongest {
        raw.finding("r", test.r);
        raw.finding("p_value", test.p_value);
        raw.finding("n", test.n);
        raw.finding("variable_1", names[cell.i].as_str());
        raw.finding("variable_2", names[cell.j].as_str());
        raw.finding("strength", correlation_label(test.r));
        raw.finding("significant", test.p_value < alpha);
        if let Some((lower, upper)) = test.ci {
            raw.finding(
                "ci",
                Finding::Interval {
                    lower,
                    upper,
                    level: CI_LEVEL,
                },
            );
        }
    }
    let significant = computed
        .iter()
        .filter(|c| c.test.is_some_and(|t| t.p_value < alpha))
        .count();
    raw.finding("pairs_computed", computed.len());
    raw.finding("pairs_significant", significant);
    raw.finding(
        "method",
        match kind {
            CorrelationKind::Pearson => "pearson",
            CorrelationKind::Spearman => "spearman",
        },
    );

    if computed.len() == cells.len() {
        let mut heatmap = FigureDescriptor::new(FigureKind::Heatmap, "Correlation matrix");
        for (idx, name) in names.iter().enumerate() {
            heatmap = heatmap.with_series(FigureSeries {
                name: name.clone(),
                labels: names.to_vec(),
                x: Vec::new(),
                y: r[idx]
                    .iter()
                    .map(|c| match c {
                        Cell::Number(v) => *v,
                        _ => 0.0,
                    })
                    .collect(),
            });
        }
        raw.figure(heatmap);
    }

    raw.table("correlation_matrix", matrix("Correlation coefficients", r));
    raw.table("p_values", matrix("Two-sided p-values", p));
    raw.table("pairwise_n", matrix("Pairwise N", n));
    raw.table("pairs", pairs);

    debug!(
        "Computed {} of {} correlation pairs",
        computed.len(),
        cells.len()
    );
    if computed.len() < cells.len() {
        let missing = cells.len() - computed.len();
        return Ok(raw.partial(format!("{} variable pair(s) could not be correlated", missing)));
    }
    Ok(raw.succeed())
}

fn crosstab(dataset: &Dataset, request: &BoundRequest, alpha: f64) -> Result<RawOutput> {
    let (Some(row_name), Some(col_name)) =
        (request.column(Role::Row), request.column(Role::Column))
    else {
        return Ok(RawOutput::failure(FailureReason::DegenerateInput(
            "crosstab needs a row and a column variable".to_string(),
        )));
    };
    let rows = label_column(dataset, row_name)?;
    let cols = label_column(dataset, col_name)?;

    let pairs: Vec<(&String, &String)> = rows
        .iter()
        .zip(cols.iter())
        .filter_map(|(a, b)| Some((a.as_ref()?, b.as_ref()?)))
        .collect();
    if let Some(failed) = guard_sample(MIN_CROSSTAB, pairs.len()) {
        return Ok(failed);
    }

    let row_levels: Vec<&String> = pairs
        .iter()
        .map(|(a, _)| *a)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let col_levels: Vec<&String> = pairs
        .iter()
        .map(|(_, b)| *b)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut counts = vec![vec![0usize; col_levels.len()]; row_levels.len()];
    for (a, b) in &pairs {
        if let (Ok(i), Ok(j)) = (row_levels.binary_search(a), col_levels.binary_search(b)) {
            counts[i][j] += 1;
        }
    }

    let Some(chi) = chi_square_independence(&counts) else {
        return Ok(RawOutput::failure(FailureReason::DegenerateInput(format!(
            "'{}' x '{}' needs at least two observed levels on each axis",
            row_name, col_name
        ))));
    };

    let mut raw = RawOutput::new();
    if chi.low_expected_share > 0.2 {
        raw.warn(format!(
            "{:.0}% of expected counts are below 5; the chi-square approximation may be unreliable",
            chi.low_expected_share * 100.0
        ));
    }

    let header = || {
        std::iter::once(row_name.to_string())
            .chain(col_levels.iter().map(|l| l.to_string()))
            .chain(std::iter::once("total".to_string()))
    };
    let mut observed = Table::new("Observed counts", header());
    let mut expected = Table::new("Expected counts", header());
    let mut row_percent = Table::new("Row percentages", header());
    for (i, level) in row_levels.iter().enumerate() {
        let total: usize = counts[i].iter().sum();
        let mut obs = vec![Cell::from(level.as_str())];
        let mut exp = vec![Cell::from(level.as_str())];
        let mut pct = vec![Cell::from(level.as_str())];
        for j in 0..col_levels.len() {
            obs.push(Cell::from(counts[i][j]));
            exp.push(Cell::from(chi.expected[i][j]));
            pct.push(Cell::from(counts[i][j] as f64 / total as f64 * 100.0));
        }
        obs.push(Cell::from(total));
        exp.push(Cell::from(total));
        pct.push(Cell::from(100.0));
        observed.push_row(obs);
        expected.push_row(exp);
        row_percent.push_row(pct);
    }

    let mut figure = FigureDescriptor::new(
        FigureKind::Bar,
        format!("{} by {}", row_name, col_name),
    );
    for (j, level) in col_levels.iter().enumerate() {
        figure = figure.with_series(FigureSeries {
            name: level.to_string(),
            labels: row_levels.iter().map(|l| l.to_string()).collect(),
            x: Vec::new(),
            y: counts.iter().map(|row| row[j] as f64).collect(),
        });
    }

    raw.finding("chi_square", chi.statistic);
    raw.finding("df", chi.df);
    raw.finding("p_value", chi.p_value);
    raw.finding("cramers_v", chi.cramers_v);
    raw.finding("n", chi.n);
    raw.finding("association", cramers_v_label(chi.cramers_v));
    raw.finding("significant", chi.p_value < alpha);
    raw.table("observed", observed);
    raw.table("expected", expected);
    raw.table("row_percent", row_percent);
    raw.figure(figure);
    Ok(raw.succeed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::AnalysisRequest;
    use crate::result::Status;
    use crate::validation::MethodValidator;
    use polars::prelude::*;
    use pretty_assertions::assert_eq;

    fn run(dataset: &Dataset, request: AnalysisRequest) -> RawOutput {
        let bound = MethodValidator::new().validate(dataset, &request).unwrap();
        AssociationComputer
            .compute(dataset, &bound, &EngineConfig::default())
            .unwrap()
    }

    // ===== Correlation =====

    #[test]
    fn test_pairwise_n_ignores_unrelated_missingness() {
        let df = df![
            "a" => [Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)],
            "b" => [Some(2.0), None, Some(3.0), Some(4.0), Some(5.0)],
        ]
        .unwrap();
        let dataset = Dataset::from_frame(df);
        let raw = run(
            &dataset,
            AnalysisRequest::new(AnalysisMethod::Correlation).bind_all(Role::Variables, ["a", "b"]),
        );
        assert_eq!(raw.status, Some(Status::Success));
        assert_eq!(raw.findings["n"].as_f64(), Some(3.0));
        assert_eq!(raw.tables["pairwise_n"].rows[0][2], Cell::Number(3.0));
    }

    #[test]
    fn test_below_floor_pairwise_sample_fails() {
        let df = df![
            "a" => [Some(1.0), Some(2.0), Some(3.0), None, None],
            "b" => [None, None, Some(3.0), Some(4.0), Some(5.0)],
        ]
        .unwrap();
        let dataset = Dataset::from_frame(df);
        let raw = run(
            &dataset,
            AnalysisRequest::new(AnalysisMethod::Correlation).bind_all(Role::Variables, ["a", "b"]),
        );
        assert_eq!(raw.status, Some(Status::Failed));
        assert_eq!(
            raw.failure,
            Some(FailureReason::InsufficientPairwiseSample {
                required: 3,
                found: 1
            })
        );
    }

    #[test]
    fn test_spearman_with_partial_pairs() {
        let df = df![
            "a" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            "b" => [2.0, 1.0, 4.0, 3.0, 6.0, 5.0],
            "c" => [1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
        ]
        .unwrap();
        let dataset = Dataset::from_frame(df);
        let raw = run(
            &dataset,
            AnalysisRequest::new(AnalysisMethod::Correlation)
                .bind_all(Role::Variables, ["a", "b", "c"])
                .param("method", "spearman"),
        );
        assert_eq!(raw.status, Some(Status::Partial));
        assert_eq!(raw.findings["pairs_computed"].as_f64(), Some(1.0));
        assert!(raw.warnings.iter().any(|w| w.contains("constant")));
    }

    // ===== Crosstab =====

    #[test]
    fn test_crosstab_counts_and_effect_size() {
        let df = df![
            "gender" => ["m", "m", "m", "f", "f", "f", "m", "f"],
            "answer" => ["yes", "yes", "no", "no", "no", "no", "yes", "yes"],
        ]
        .unwrap();
        let dataset = Dataset::from_frame(df);
        let raw = run(
            &dataset,
            AnalysisRequest::new(AnalysisMethod::Crosstab)
                .bind(Role::Row, "gender")
                .bind(Role::Column, "answer"),
        );
        assert_eq!(raw.status, Some(Status::Success));
        assert_eq!(raw.findings["n"].as_f64(), Some(8.0));
        assert_eq!(raw.findings["df"].as_f64(), Some(1.0));
        // f: no=3 yes=1; m: no=1 yes=3
        assert_eq!(raw.tables["observed"].rows[0][1], Cell::Number(3.0));
        assert!(raw.warnings.iter().any(|w| w.contains("below 5")));
    }

    #[test]
    fn test_crosstab_single_level_is_degenerate() {
        let df = df![
            "row" => ["a", "a", "a", "a", "a", "a"],
            "col" => ["x", "y", "x", "y", "x", "y"],
        ]
        .unwrap();
        let dataset = Dataset::from_frame(df);
        let raw = run(
            &dataset,
            AnalysisRequest::new(AnalysisMethod::Crosstab)
                .bind(Role::Row, "row")
                .bind(Role::Column, "col"),
        );
        assert!(matches!(raw.failure, Some(FailureReason::DegenerateInput(_))));
    }
}
