//! Descriptive statistics and frequency tables.

use super::{StatisticComputer, alpha, label_column};
use crate::config::EngineConfig;
use crate::dataset::{Dataset, present};
use crate::error::Result;
use crate::request::{AnalysisMethod, MethodFamily, Role};
use crate::result::{
    Cell, FailureReason, FigureDescriptor, FigureKind, FigureSeries, RawOutput, Table,
};
use crate::stats::descriptive::{excess_kurtosis, histogram, iqr_outliers, skewness, sorted};
use crate::stats::format::format_p_value;
use crate::stats::hypothesis::jarque_bera;
use crate::stats::summarize;
use crate::validation::BoundRequest;
use std::collections::BTreeMap;
use tracing::debug;

const HISTOGRAM_BINS: usize = 10;

/// Handles `descriptive` and `frequency`.
pub struct DescriptiveComputer;

impl StatisticComputer for DescriptiveComputer {
    fn family(&self) -> MethodFamily {
        MethodFamily::Descriptive
    }

    fn compute(
        &self,
        dataset: &Dataset,
        request: &BoundRequest,
        config: &EngineConfig,
    ) -> Result<RawOutput> {
        match request.method {
            AnalysisMethod::Frequency => frequencies(dataset, request),
            _ => descriptives(dataset, request, alpha(request, config)),
        }
    }
}

fn descriptives(dataset: &Dataset, request: &BoundRequest, alpha: f64) -> Result<RawOutput> {
    let variables = request.columns(Role::Variables);
    let mut raw = RawOutput::new();
    let mut table = Table::new(
        "Descriptive statistics",
        [
            "variable", "n", "missing", "mean", "sd", "min", "q1", "median", "q3", "max",
            "skewness", "kurtosis", "outliers", "normality_p",
        ],
    );

    let mut described = 0usize;
    for name in variables {
        let values = present(&dataset.numeric(name)?);
        let Some(summary) = summarize(&values) else {
            raw.warn(format!("'{}' has no numeric values", name));
            continue;
        };
        described += 1;

        let normality = jarque_bera(&values);
        if let Some((_, p)) = normality
            && p < alpha
        {
            raw.warn(format!(
                "'{}' departs from normality (Jarque-Bera p = {})",
                name,
                format_p_value(p)
            ));
        }
        let (_, _, outliers) = iqr_outliers(&values);

        table.push_row(vec![
            Cell::from(name.as_str()),
            Cell::from(summary.n),
            Cell::from(dataset.height() - summary.n),
            Cell::from(summary.mean),
            Cell::from(summary.std_dev),
            Cell::from(summary.min),
            Cell::from(summary.q1),
            Cell::from(summary.median),
            Cell::from(summary.q3),
            Cell::from(summary.max),
            Cell::from(skewness(&values)),
            Cell::from(excess_kurtosis(&values)),
            Cell::from(outliers),
            Cell::from(normality.map(|(_, p)| p)),
        ]);

        let bins = histogram(&sorted(&values), HISTOGRAM_BINS);
        raw.figure(
            FigureDescriptor::new(FigureKind::Histogram, format!("Distribution of {}", name))
                .with_series(FigureSeries {
                    name: name.clone(),
                    labels: Vec::new(),
                    x: bins.iter().map(|(lo, hi, _)| (lo + hi) / 2.0).collect(),
                    y: bins.iter().map(|(_, _, count)| *count as f64).collect(),
                }),
        );

        if variables.len() == 1 {
            raw.finding("mean", summary.mean);
            raw.finding("std_dev", summary.std_dev);
            raw.finding("median", summary.median);
            raw.finding("n", summary.n);
        }
    }

    if described == 0 {
        return Ok(RawOutput::failure(FailureReason::DegenerateInput(
            "no variable has numeric values".to_string(),
        )));
    }

    debug!("Described {} of {} variables", described, variables.len());
    raw.finding("n_variables", described);
    raw.finding("n_rows", dataset.height());
    raw.table("descriptives", table);
    Ok(raw.succeed())
}

fn frequencies(dataset: &Dataset, request: &BoundRequest) -> Result<RawOutput> {
    let variables = request.columns(Role::Variables);
    let mut raw = RawOutput::new();

    for name in variables {
        let values = label_column(dataset, name)?;
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for label in values.iter().flatten() {
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
        let valid: usize = counts.values().sum();
        let missing = values.len() - valid;

        let mut ordered: Vec<(String, usize)> = counts.into_iter().collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut table = Table::new(
            format!("Frequencies of {}", name),
            ["level", "count", "percent", "valid_percent", "cumulative_percent"],
        );
        let mut cumulative = 0.0;
        for (level, count) in &ordered {
            let valid_percent = *count as f64 / valid as f64 * 100.0;
            cumulative += valid_percent;
            table.push_row(vec![
                Cell::from(level.as_str()),
                Cell::from(*count),
                Cell::from(*count as f64 / values.len() as f64 * 100.0),
                Cell::from(valid_percent),
                Cell::from(cumulative),
            ]);
        }
        if missing > 0 {
            table.push_row(vec![
                Cell::from("(missing)"),
                Cell::from(missing),
                Cell::from(missing as f64 / values.len() as f64 * 100.0),
                Cell::Empty,
                Cell::Empty,
            ]);
        }

        raw.figure(
            FigureDescriptor::new(FigureKind::Bar, format!("Frequencies of {}", name)).with_series(
                FigureSeries {
                    name: name.clone(),
                    labels: ordered.iter().map(|(l, _)| l.clone()).collect(),
                    x: Vec::new(),
                    y: ordered.iter().map(|(_, c)| *c as f64).collect(),
                },
            ),
        );
        if variables.len() == 1 {
            raw.finding("levels", ordered.len());
            if let Some((mode, _)) = ordered.first() {
                raw.finding("mode", mode.as_str());
            }
        }
        raw.table(format!("frequency_{}", name), table);
    }

    raw.finding("n_variables", variables.len());
    raw.finding("n_rows", dataset.height());
    Ok(raw.succeed())
}
