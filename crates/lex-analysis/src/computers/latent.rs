//! Latent structure: exploratory factor analysis and PCA on the correlation matrix.
//!
//! Both methods report sampling adequacy (KMO) and Bartlett's sphericity
//! test before any loadings. An inadequate or singular correlation matrix
//! does not stop the extraction: the result is `partial` with a warning.

use super::{StatisticComputer, alpha, guard_sample, numeric_columns};
use crate::config::EngineConfig;
use crate::dataset::{Dataset, complete_columns};
use crate::error::Result;
use crate::request::{AnalysisMethod, MethodFamily, Role};
use crate::result::{
    Cell, FailureReason, FigureDescriptor, FigureKind, FigureSeries, RawOutput, Table,
};
use crate::stats::format::{format_p_value, kmo_label};
use crate::stats::matrix::{bartlett_sphericity, correlation_matrix, kmo, sorted_eigen, varimax};
use crate::stats::std_dev;
use crate::validation::BoundRequest;
use nalgebra::DMatrix;
use tracing::{debug, warn};

/// Handles `factor_analysis` and `pca`.
pub struct LatentStructureComputer;

impl StatisticComputer for LatentStructureComputer {
    fn family(&self) -> MethodFamily {
        MethodFamily::LatentStructure
    }

    fn compute(
        &self,
        dataset: &Dataset,
        request: &BoundRequest,
        config: &EngineConfig,
    ) -> Result<RawOutput> {
        let names = request.columns(Role::Variables);
        let (columns, rows) = complete_columns(&numeric_columns(dataset, request, Role::Variables)?);
        if let Some(failed) = guard_sample(names.len(), rows.len()) {
            return Ok(failed);
        }
        if let Some((name, _)) = names
            .iter()
            .zip(&columns)
            .find(|(_, c)| std_dev(c) <= f64::EPSILON)
        {
            return Ok(RawOutput::failure(FailureReason::ZeroVariance(format!(
                "'{}' is constant over the complete cases",
                name
            ))));
        }
        let Some(r) = correlation_matrix(&columns) else {
            return Ok(RawOutput::failure(FailureReason::ZeroVariance(
                "correlation matrix could not be formed".to_string(),
            )));
        };

        let mut raw = RawOutput::new();
        let adequate = adequacy(&mut raw, &r, rows.len(), alpha(request, config), config);

        let (eigenvalues, vectors) = sorted_eigen(&r);
        let eigenvalues: Vec<f64> = eigenvalues.into_iter().map(|e| e.max(0.0)).collect();
        let p = names.len();
        let kaiser = eigenvalues.iter().filter(|e| **e > 1.0).count().max(1);
        let key = match request.method {
            AnalysisMethod::Pca => "n_components",
            _ => "n_factors",
        };
        let k = request.parameters.usize(key).unwrap_or(kaiser).clamp(1, p);
        debug!("Extracting {} of {} components (Kaiser: {})", k, p, kaiser);

        let loadings = DMatrix::from_fn(p, k, |i, j| vectors[(i, j)] * eigenvalues[j].sqrt());
        let retained: f64 = eigenvalues[..k].iter().sum();

        raw.finding(key, k);
        raw.finding("variance_explained", retained / p as f64);
        raw.finding("n", rows.len());
        raw.table("eigenvalues", eigen_table(&eigenvalues));
        raw.figure(scree(&eigenvalues));

        match request.method {
            AnalysisMethod::Pca => {
                raw.table("loadings", loading_table("Component loadings", "PC", names, &loadings));
            }
            _ => {
                let rotation = request
                    .parameters
                    .str("rotation")
                    .unwrap_or("varimax")
                    .to_ascii_lowercase();
                let rotated = if rotation == "varimax" && k > 1 {
                    varimax(&loadings, config.max_iterations)
                } else {
                    loadings.clone()
                };
                raw.finding("rotation", if k > 1 { rotation.as_str() } else { "none" });
                raw.table(
                    "loadings",
                    loading_table("Factor loadings", "Factor", names, &rotated),
                );
                raw.table("communalities", communality_table(names, &rotated));
            }
        }

        if adequate {
            Ok(raw.succeed())
        } else {
            Ok(raw.partial("Variable set is not well suited to factoring; interpret loadings with care"))
        }
    }
}

/// Record KMO and Bartlett findings; `false` when either signals inadequacy.
fn adequacy(
    raw: &mut RawOutput,
    r: &DMatrix<f64>,
    n: usize,
    alpha: f64,
    config: &EngineConfig,
) -> bool {
    let mut adequate = true;
    match kmo(r) {
        Some((overall, msa)) => {
            raw.finding("kmo", overall);
            raw.finding("kmo_label", kmo_label(overall));
            if overall < config.kmo_threshold {
                raw.warn(format!(
                    "KMO = {:.3} is below {:.2}",
                    overall, config.kmo_threshold
                ));
                adequate = false;
            }
            let mut table = Table::new("Sampling adequacy", ["variable_index", "msa"]);
            for (idx, value) in msa.into_iter().enumerate() {
                table.push_row(vec![Cell::from(idx + 1), Cell::from(value)]);
            }
            raw.table("msa", table);
        }
        None => {
            warn!("Correlation matrix is singular; KMO unavailable");
            raw.warn("Correlation matrix is singular; KMO and Bartlett's test unavailable");
            adequate = false;
        }
    }

    if let Some((chi, df, p)) = bartlett_sphericity(r, n) {
        raw.finding("bartlett_chi_square", chi);
        raw.finding("bartlett_df", df);
        raw.finding("bartlett_p_value", p);
        if p >= alpha {
            raw.warn(format!(
                "Bartlett's test is not significant (p = {}); variables may be uncorrelated",
                format_p_value(p)
            ));
            adequate = false;
        }
    }
    adequate
}

fn eigen_table(eigenvalues: &[f64]) -> Table {
    let total: f64 = eigenvalues.iter().sum();
    let mut table = Table::new(
        "Eigenvalues",
        ["component", "eigenvalue", "variance_percent", "cumulative_percent"],
    );
    let mut cumulative = 0.0;
    for (idx, value) in eigenvalues.iter().enumerate() {
        let share = value / total * 100.0;
        cumulative += share;
        table.push_row(vec![
            Cell::from(idx + 1),
            Cell::from(*value),
            Cell::from(share),
            Cell::from(cumulative),
        ]);
    }
    table
}

fn scree(eigenvalues: &[f64]) -> FigureDescriptor {
    FigureDescriptor::new(FigureKind::Scree, "Scree plot").with_series(FigureSeries {
        name: "eigenvalue".to_string(),
        labels: Vec::new(),
        x: (1..=eigenvalues.len()).map(|i| i as f64).collect(),
        y: eigenvalues.to_vec(),
    })
}

fn loading_table(title: &str, prefix: &str, names: &[String], loadings: &DMatrix<f64>) -> Table {
    let mut table = Table::new(
        title,
        std::iter::once("variable".to_string())
            .chain((1..=loadings.ncols()).map(|j| format!("{}{}", prefix, j))),
    );
    for (i, name) in names.iter().enumerate() {
        let mut row = vec![Cell::from(name.as_str())];
        row.extend(loadings.row(i).iter().map(|v| Cell::from(*v)));
        table.push_row(row);
    }
    table
}

fn communality_table(names: &[String], loadings: &DMatrix<f64>) -> Table {
    let mut table = Table::new("Communalities", ["variable", "communality"]);
    for (i, name) in names.iter().enumerate() {
        let h2: f64 = loadings.row(i).iter().map(|v| v * v).sum();
        table.push_row(vec![Cell::from(name.as_str()), Cell::from(h2)]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::AnalysisRequest;
    use crate::result::Status;
    use crate::validation::MethodValidator;
    use polars::prelude::*;

    fn factor_data() -> Dataset {
        // two latent factors, three indicators each
        let f1 = [1.0, 2.0, 3.0, 4.0, 5.0, 2.0, 3.0, 4.0, 1.0, 5.0, 3.0, 2.0];
        let f2 = [3.0, 1.0, 4.0, 2.0, 5.0, 5.0, 1.0, 3.0, 2.0, 4.0, 1.0, 5.0];
        let noise = [0.1, -0.2, 0.3, -0.1, 0.2, 0.0, -0.3, 0.1, 0.2, -0.2, 0.1, -0.1];
        let col = |base: &[f64; 12], shift: usize, scale: f64| -> Vec<f64> {
            (0..12)
                .map(|i| base[i] * scale + noise[(i + shift) % 12])
                .collect()
        };
        let df = df![
            "a1" => col(&f1, 0, 1.0),
            "a2" => col(&f1, 3, 0.9),
            "a3" => col(&f1, 6, 1.1),
            "b1" => col(&f2, 1, 1.0),
            "b2" => col(&f2, 4, 0.8),
            "b3" => col(&f2, 7, 1.2),
        ]
        .unwrap();
        Dataset::from_frame(df)
    }

    fn run(method: AnalysisMethod) -> RawOutput {
        let dataset = factor_data();
        let request = AnalysisRequest::new(method)
            .bind_all(Role::Variables, ["a1", "a2", "a3", "b1", "b2", "b3"]);
        let bound = MethodValidator::new().validate(&dataset, &request).unwrap();
        LatentStructureComputer
            .compute(&dataset, &bound, &EngineConfig::default())
            .unwrap()
    }

    #[test]
    fn test_pca_reports_adequacy_and_loadings() {
        let raw = run(AnalysisMethod::Pca);
        assert!(raw.findings.contains_key("bartlett_p_value"));
        assert!(raw.findings.contains_key("n_components"));
        let explained = raw.findings["variance_explained"].as_f64().unwrap();
        assert!(explained > 0.0 && explained <= 1.0);
        assert_eq!(raw.tables["loadings"].rows.len(), 6);
        assert_eq!(raw.figures[0].kind, FigureKind::Scree);
    }

    #[test]
    fn test_factor_analysis_two_factors() {
        let raw = run(AnalysisMethod::FactorAnalysis);
        assert_eq!(raw.findings["n_factors"].as_f64(), Some(2.0));
        assert_eq!(raw.findings["rotation"].as_text(), Some("varimax"));
        assert_eq!(raw.tables["communalities"].rows.len(), 6);
    }

    #[test]
    fn test_uncorrelated_variables_are_partial() {
        let df = df![
            "x" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            "y" => [2.0, 5.0, 1.0, 6.0, 3.0, 4.0],
            "z" => [6.0, 1.0, 4.0, 3.0, 5.0, 2.0],
        ]
        .unwrap();
        let dataset = Dataset::from_frame(df);
        let request =
            AnalysisRequest::new(AnalysisMethod::Pca).bind_all(Role::Variables, ["x", "y", "z"]);
        let bound = MethodValidator::new().validate(&dataset, &request).unwrap();
        let raw = LatentStructureComputer
            .compute(&dataset, &bound, &EngineConfig::default())
            .unwrap();
        assert_eq!(raw.status, Some(Status::Partial));
        assert!(!raw.warnings.is_empty());
    }

    #[test]
    fn test_constant_variable_fails() {
        let df = df![
            "x" => [1.0, 2.0, 3.0, 4.0],
            "y" => [2.0, 2.0, 2.0, 2.0],
            "z" => [4.0, 1.0, 3.0, 2.0],
        ]
        .unwrap();
        let dataset = Dataset::from_frame(df);
        let request =
            AnalysisRequest::new(AnalysisMethod::Pca).bind_all(Role::Variables, ["x", "y", "z"]);
        let bound = MethodValidator::new().validate(&dataset, &request).unwrap();
        let raw = LatentStructureComputer
            .compute(&dataset, &bound, &EngineConfig::default())
            .unwrap();
        assert!(matches!(raw.failure, Some(FailureReason::ZeroVariance(_))));
    }
}
