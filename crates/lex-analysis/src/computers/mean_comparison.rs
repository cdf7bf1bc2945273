//! Mean comparison: independent and paired t-tests, one-way ANOVA.

use super::{StatisticComputer, alpha, guard_sample, numeric_columns};
use crate::config::EngineConfig;
use crate::dataset::{Dataset, labelled, paired};
use crate::error::Result;
use crate::request::{AnalysisMethod, MethodFamily, Role};
use crate::result::{
    Cell, FailureReason, FigureDescriptor, FigureKind, FigureSeries, RawOutput, Table,
};
use crate::stats::descriptive::{mean, std_dev};
use crate::stats::format::{cohens_d_label, eta_squared_label, format_p_value};
use crate::stats::hypothesis::{
    TTest, cohens_d, cohens_dz, levene, one_way_anova, paired_t, student_t, welch_t,
};
use crate::validation::BoundRequest;
use std::collections::BTreeMap;
use tracing::debug;

const MIN_PER_GROUP: usize = 2;

/// Handles `independent_t_test`, `paired_t_test` and `anova`.
pub struct MeanComparisonComputer;

impl StatisticComputer for MeanComparisonComputer {
    fn family(&self) -> MethodFamily {
        MethodFamily::MeanComparison
    }

    fn compute(
        &self,
        dataset: &Dataset,
        request: &BoundRequest,
        config: &EngineConfig,
    ) -> Result<RawOutput> {
        let alpha = alpha(request, config);
        match request.method {
            AnalysisMethod::PairedTTest => paired_test(dataset, request, alpha),
            AnalysisMethod::Anova => anova(dataset, request, alpha),
            _ => independent_test(dataset, request, alpha),
        }
    }
}

/// Values of the dependent variable split by the grouping variable's levels.
fn grouped(dataset: &Dataset, request: &BoundRequest) -> Result<BTreeMap<String, Vec<f64>>> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let (Some(value), Some(group)) = (
        request.column(Role::Dependent),
        request.column(Role::Grouping),
    ) else {
        return Ok(groups);
    };
    for (label, v) in labelled(&dataset.numeric(value)?, &dataset.categorical(group)?) {
        groups.entry(label).or_default().push(v);
    }
    Ok(groups)
}

fn descriptives_table(groups: &[(&str, &[f64])]) -> Table {
    let mut table = Table::new(
        "Group descriptives",
        ["group", "n", "mean", "sd", "se", "min", "max"],
    );
    for (name, values) in groups {
        let sd = std_dev(values);
        table.push_row(vec![
            Cell::from(*name),
            Cell::from(values.len()),
            Cell::from(mean(values)),
            Cell::from(sd),
            Cell::from(sd / (values.len() as f64).sqrt()),
            Cell::from(values.iter().copied().reduce(f64::min)),
            Cell::from(values.iter().copied().reduce(f64::max)),
        ]);
    }
    table
}

fn means_figure(title: String, groups: &[(&str, &[f64])]) -> FigureDescriptor {
    FigureDescriptor::new(FigureKind::Bar, title).with_series(FigureSeries {
        name: "mean".to_string(),
        labels: groups.iter().map(|(n, _)| n.to_string()).collect(),
        x: Vec::new(),
        y: groups.iter().map(|(_, v)| mean(v)).collect(),
    })
}

fn record_t_test(raw: &mut RawOutput, test: &TTest, alpha: f64) {
    raw.finding("t", test.t);
    raw.finding("df", test.df);
    raw.finding("p_value", test.p_value);
    raw.finding("mean_difference", test.mean_difference);
    raw.finding("std_error", test.std_error);
    raw.finding("significant", test.p_value < alpha);
    if let Some((lower, upper)) = test.ci {
        raw.finding("ci_lower", lower);
        raw.finding("ci_upper", upper);
    }
}

fn independent_test(dataset: &Dataset, request: &BoundRequest, alpha: f64) -> Result<RawOutput> {
    let mut groups = grouped(dataset, request)?;
    let names: Vec<String> = match request.parameters.list("groups") {
        Some(named) => named,
        None => groups.keys().cloned().collect(),
    };
    let [first, second] = names.as_slice() else {
        return Ok(RawOutput::failure(FailureReason::DegenerateInput(format!(
            "expected two groups, found {}",
            names.len()
        ))));
    };
    let a = groups.remove(first).unwrap_or_default();
    let b = groups.remove(second).unwrap_or_default();
    if let Some(failed) = guard_sample(MIN_PER_GROUP, a.len().min(b.len())) {
        return Ok(failed);
    }

    let mut raw = RawOutput::new();
    let homogeneity = levene(&[a.clone(), b.clone()]);
    let equal_variances = homogeneity.is_none_or(|l| l.p_value >= alpha);
    let test = if equal_variances {
        student_t(&a, &b, 1.0 - alpha)
    } else {
        raw.warn(format!(
            "Group variances differ (Levene p = {}); Welch's t-test used",
            format_p_value(homogeneity.map(|l| l.p_value).unwrap_or(f64::NAN))
        ));
        welch_t(&a, &b, 1.0 - alpha)
    };
    let (Some(test), Some(d)) = (test, cohens_d(&a, &b)) else {
        return Ok(RawOutput::failure(FailureReason::ZeroVariance(
            "both groups are constant".to_string(),
        )));
    };

    record_t_test(&mut raw, &test, alpha);
    raw.finding("cohens_d", d);
    raw.finding("effect_size", cohens_d_label(d));
    raw.finding("n", a.len() + b.len());
    raw.finding("test", if equal_variances { "student" } else { "welch" });
    raw.finding("group_1", first.as_str());
    raw.finding("group_2", second.as_str());
    if let Some(l) = homogeneity {
        raw.finding("levene_f", l.f);
        raw.finding("levene_p", l.p_value);
    }

    let summary = [(first.as_str(), a.as_slice()), (second.as_str(), b.as_slice())];
    raw.table("group_descriptives", descriptives_table(&summary));
    raw.figure(means_figure(
        format!("Mean {} by group", request.column(Role::Dependent).unwrap_or("value")),
        &summary,
    ));
    Ok(raw.succeed())
}

fn paired_test(dataset: &Dataset, request: &BoundRequest, alpha: f64) -> Result<RawOutput> {
    let names = request.columns(Role::Variables);
    let columns = numeric_columns(dataset, request, Role::Variables)?;
    let (Some(first), Some(second)) = (columns.first(), columns.get(1)) else {
        return Ok(RawOutput::failure(FailureReason::DegenerateInput(
            "paired t-test needs two variables".to_string(),
        )));
    };
    let (a, b) = paired(first, second);
    if let Some(failed) = guard_sample(MIN_PER_GROUP, a.len()) {
        return Ok(failed);
    }

    let (Some(test), Some(d)) = (paired_t(&a, &b, 1.0 - alpha), cohens_dz(&a, &b)) else {
        return Ok(RawOutput::failure(FailureReason::ZeroVariance(
            "paired differences are constant".to_string(),
        )));
    };

    let mut raw = RawOutput::new();
    record_t_test(&mut raw, &test, alpha);
    raw.finding("cohens_d", d);
    raw.finding("effect_size", cohens_d_label(d));
    raw.finding("n", a.len());

    let diffs: Vec<f64> = a.iter().zip(&b).map(|(x, y)| x - y).collect();
    let summary = [
        (names[0].as_str(), a.as_slice()),
        (names[1].as_str(), b.as_slice()),
        ("difference", diffs.as_slice()),
    ];
    raw.table("descriptives", descriptives_table(&summary));
    raw.figure(means_figure("Paired means".to_string(), &summary[..2]));
    Ok(raw.succeed())
}

fn anova(dataset: &Dataset, request: &BoundRequest, alpha: f64) -> Result<RawOutput> {
    let mut raw = RawOutput::new();
    let mut groups: Vec<(String, Vec<f64>)> = Vec::new();
    for (name, values) in grouped(dataset, request)? {
        if values.len() < MIN_PER_GROUP {
            raw.warn(format!(
                "Group '{}' has {} observation(s) and was excluded",
                name,
                values.len()
            ));
        } else {
            groups.push((name, values));
        }
    }
    if let Some(failed) = guard_sample(2, groups.len()) {
        return Ok(failed);
    }

    let samples: Vec<Vec<f64>> = groups.iter().map(|(_, v)| v.clone()).collect();
    let Some(table) = one_way_anova(&samples) else {
        return Ok(RawOutput::failure(FailureReason::ZeroVariance(
            "no variation within groups".to_string(),
        )));
    };
    debug!("ANOVA over {} groups: F = {:.3}", groups.len(), table.f);

    raw.finding("f", table.f);
    raw.finding("df_between", table.df_between);
    raw.finding("df_within", table.df_within);
    raw.finding("p_value", table.p_value);
    raw.finding("eta_squared", table.eta_squared);
    raw.finding("effect_size", eta_squared_label(table.eta_squared));
    raw.finding("n", samples.iter().map(Vec::len).sum::<usize>());
    raw.finding("groups", groups.len());
    raw.finding("significant", table.p_value < alpha);

    if let Some(l) = levene(&samples) {
        raw.finding("levene_f", l.f);
        raw.finding("levene_p", l.p_value);
        if l.p_value < alpha {
            raw.warn(format!(
                "Group variances differ (Levene p = {}); interpret F with care",
                format_p_value(l.p_value)
            ));
        }
    }

    let mut source = Table::new("ANOVA", ["source", "ss", "df", "ms", "f", "p_value"]);
    source.push_row(vec![
        Cell::from("between"),
        Cell::from(table.ss_between),
        Cell::from(table.df_between),
        Cell::from(table.ss_between / table.df_between),
        Cell::from(table.f),
        Cell::from(table.p_value),
    ]);
    source.push_row(vec![
        Cell::from("within"),
        Cell::from(table.ss_within),
        Cell::from(table.df_within),
        Cell::from(table.ss_within / table.df_within),
        Cell::Empty,
        Cell::Empty,
    ]);
    source.push_row(vec![
        Cell::from("total"),
        Cell::from(table.ss_between + table.ss_within),
        Cell::from(table.df_between + table.df_within),
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
    ]);

    let summary: Vec<(&str, &[f64])> = groups
        .iter()
        .map(|(n, v)| (n.as_str(), v.as_slice()))
        .collect();
    raw.table("anova", source);
    raw.table("group_descriptives", descriptives_table(&summary));
    raw.figure(means_figure(
        format!("Mean {} by group", request.column(Role::Dependent).unwrap_or("value")),
        &summary,
    ));
    Ok(raw.succeed())
}
