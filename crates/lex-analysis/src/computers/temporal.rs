//! Time-series trend: least-squares slope over a sortable time axis.

use super::{StatisticComputer, alpha, guard_sample};
use crate::config::EngineConfig;
use crate::dataset::{ColumnKind, Dataset, paired};
use crate::error::{AnalysisError, Result};
use crate::request::{MethodFamily, Role};
use crate::result::{Cell, FigureDescriptor, FigureKind, FigureSeries, RawOutput, Table};
use crate::stats::descriptive::mean;
use crate::stats::distributions::t_two_sided;
use crate::stats::format::format_p_value;
use crate::validation::BoundRequest;
use chrono::DateTime;
use tracing::debug;

const DEFAULT_WINDOW: usize = 3;
const MS_PER_DAY: f64 = 86_400_000.0;

/// Handles `trend`.
pub struct TemporalComputer;

impl StatisticComputer for TemporalComputer {
    fn family(&self) -> MethodFamily {
        MethodFamily::Temporal
    }

    fn compute(
        &self,
        dataset: &Dataset,
        request: &BoundRequest,
        config: &EngineConfig,
    ) -> Result<RawOutput> {
        let (Some(time), Some(value)) = (request.column(Role::Time), request.column(Role::Value))
        else {
            return Err(AnalysisError::Internal(
                "trend request lacks time or value column".to_string(),
            ));
        };
        let is_datetime = dataset.column_kind(time) == Some(ColumnKind::Datetime);
        let (times, values) = paired(&dataset.timestamps(time)?, &dataset.numeric(value)?);
        let points = aggregate(times, values);
        if let Some(failed) = guard_sample(3, points.len()) {
            return Ok(failed);
        }

        let mut raw = RawOutput::new();
        let duplicates = points.iter().filter(|p| p.count > 1).count();
        if duplicates > 0 {
            raw.warn(format!(
                "{} timestamps occur more than once; their values were averaged",
                duplicates
            ));
        }

        // datetime slopes are per day since the first observation
        let origin = points[0].time;
        let xs: Vec<f64> = points
            .iter()
            .map(|p| if is_datetime { (p.time - origin) / MS_PER_DAY } else { p.time })
            .collect();
        let ys: Vec<f64> = points.iter().map(|p| p.value).collect();
        let line = fit_line(&xs, &ys);
        debug!("Trend slope {:.4} over {} points", line.slope, points.len());

        let alpha = alpha(request, config);
        let direction = if line.p_value < alpha && line.slope > 0.0 {
            "up"
        } else if line.p_value < alpha && line.slope < 0.0 {
            "down"
        } else {
            "flat"
        };
        if line.constant {
            raw.warn("Values are constant over time");
        }

        raw.finding("slope", line.slope);
        raw.finding("intercept", line.intercept);
        raw.finding("r_squared", line.r_squared);
        raw.finding("p_value", line.p_value);
        raw.finding("direction", direction);
        raw.finding("n_points", points.len());
        raw.finding("time_unit", if is_datetime { "day" } else { "time unit" });
        raw.finding("first_value", ys[0]);
        raw.finding("last_value", ys[ys.len() - 1]);
        if ys[0].abs() > f64::EPSILON {
            raw.finding("percent_change", (ys[ys.len() - 1] - ys[0]) / ys[0].abs() * 100.0);
        }

        let window = request
            .parameters
            .usize("window")
            .unwrap_or(DEFAULT_WINDOW)
            .min(points.len());
        let smoothed = moving_average(&ys, window);
        let labels: Vec<String> = points
            .iter()
            .map(|p| time_label(p.time, is_datetime))
            .collect();
        let fitted: Vec<f64> = xs.iter().map(|x| line.intercept + line.slope * x).collect();

        let mut table = Table::new(
            format!("Trend of {}", value),
            ["time", "value", "observations", "fitted", "moving_average"],
        );
        for i in 0..points.len() {
            table.push_row(vec![
                Cell::from(labels[i].as_str()),
                Cell::from(ys[i]),
                Cell::from(points[i].count),
                Cell::from(fitted[i]),
                Cell::from(smoothed[i]),
            ]);
        }
        raw.table("series", table);

        let series = |name: &str, y: Vec<f64>| FigureSeries {
            name: name.to_string(),
            labels: labels.clone(),
            x: xs.clone(),
            y,
        };
        let mut figure = FigureDescriptor::new(FigureKind::Line, format!("{} over time", value))
            .with_series(series(value, ys.clone()))
            .with_series(series("linear trend", fitted));
        if window >= 2 {
            let ma: Vec<f64> = smoothed.iter().map(|v| v.unwrap_or(f64::NAN)).collect();
            figure = figure.with_series(series(&format!("moving average ({})", window), ma));
        }
        raw.figure(figure);

        if direction == "flat" && !line.constant {
            raw.warn(format!(
                "No significant trend (p = {})",
                format_p_value(line.p_value)
            ));
        }
        Ok(raw.succeed())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Point {
    time: f64,
    value: f64,
    count: usize,
}

/// Sort by time and average the values sharing a timestamp.
fn aggregate(times: Vec<f64>, values: Vec<f64>) -> Vec<Point> {
    let mut pairs: Vec<(f64, f64)> = times.into_iter().zip(values).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut points: Vec<Point> = Vec::new();
    for (time, value) in pairs {
        match points.last_mut() {
            Some(last) if last.time == time => {
                last.value += value;
                last.count += 1;
            }
            _ => points.push(Point {
                time,
                value,
                count: 1,
            }),
        }
    }
    for point in &mut points {
        point.value /= point.count as f64;
    }
    points
}

struct Line {
    slope: f64,
    intercept: f64,
    r_squared: f64,
    p_value: f64,
    constant: bool,
}

/// Simple regression of `ys` on `xs`; `xs` must hold at least 3 distinct values.
fn fit_line(xs: &[f64], ys: &[f64]) -> Line {
    let n = xs.len() as f64;
    let (mx, my) = (mean(xs), mean(ys));
    let sxx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
    let sxy: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    let syy: f64 = ys.iter().map(|y| (y - my).powi(2)).sum();
    let slope = sxy / sxx;
    let intercept = my - slope * mx;

    if syy <= f64::EPSILON {
        return Line {
            slope: 0.0,
            intercept: my,
            r_squared: 0.0,
            p_value: 1.0,
            constant: true,
        };
    }
    let sse = (syy - slope * sxy).max(0.0);
    let p_value = if sse <= syy * 1e-12 {
        0.0
    } else {
        let se = (sse / (n - 2.0) / sxx).sqrt();
        t_two_sided(slope / se, n - 2.0).unwrap_or(1.0)
    };
    Line {
        slope,
        intercept,
        r_squared: 1.0 - sse / syy,
        p_value,
        constant: false,
    }
}

/// Trailing moving average; the first `window - 1` positions are empty.
fn moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            (window >= 1 && i + 1 >= window).then(|| mean(&values[i + 1 - window..=i]))
        })
        .collect()
}

fn time_label(time: f64, is_datetime: bool) -> String {
    if !is_datetime {
        return format!("{}", time);
    }
    DateTime::from_timestamp_millis(time as i64)
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| format!("{}", time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{AnalysisMethod, AnalysisRequest};
    use crate::validation::MethodValidator;
    use polars::prelude::*;

    fn run(dataset: &Dataset) -> RawOutput {
        let request = AnalysisRequest::new(AnalysisMethod::Trend)
            .bind(Role::Time, "t")
            .bind(Role::Value, "v");
        let bound = MethodValidator::new().validate(dataset, &request).unwrap();
        TemporalComputer
            .compute(dataset, &bound, &EngineConfig::default())
            .unwrap()
    }

    #[test]
    fn test_upward_trend() {
        let df = df![
            "t" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            "v" => [10.0, 12.1, 13.9, 16.2, 18.0, 19.8],
        ]
        .unwrap();
        let raw = run(&Dataset::from_frame(df));
        assert_eq!(raw.findings["direction"].as_text(), Some("up"));
        assert!((raw.findings["slope"].as_f64().unwrap() - 2.0).abs() < 0.1);
        assert_eq!(raw.tables["series"].rows.len(), 6);
        assert_eq!(raw.figures[0].series.len(), 3);
    }

    #[test]
    fn test_duplicate_timestamps_are_averaged() {
        let df = df![
            "t" => [3.0, 1.0, 2.0, 2.0, 4.0],
            "v" => [5.0, 1.0, 2.0, 4.0, 4.0],
        ]
        .unwrap();
        let raw = run(&Dataset::from_frame(df));
        assert_eq!(raw.findings["n_points"].as_f64(), Some(4.0));
        let table = &raw.tables["series"];
        assert_eq!(table.rows[1][1], Cell::from(3.0));
        assert_eq!(table.rows[1][2], Cell::from(2usize));
        assert!(raw.warnings.iter().any(|w| w.contains("averaged")));
    }

    #[test]
    fn test_noise_is_flat() {
        let df = df![
            "t" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            "v" => [5.0, 3.0, 6.0, 2.0, 5.0, 4.0],
        ]
        .unwrap();
        let raw = run(&Dataset::from_frame(df));
        assert_eq!(raw.findings["direction"].as_text(), Some("flat"));
    }

    #[test]
    fn test_constant_values() {
        let df = df!["t" => [1.0, 2.0, 3.0], "v" => [7.0, 7.0, 7.0]].unwrap();
        let raw = run(&Dataset::from_frame(df));
        assert_eq!(raw.findings["slope"].as_f64(), Some(0.0));
        assert_eq!(raw.findings["direction"].as_text(), Some("flat"));
    }

    #[test]
    fn test_moving_average_window() {
        let ma = moving_average(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(ma, vec![None, Some(1.5), Some(2.5), Some(3.5)]);
    }

    #[test]
    fn test_datetime_labels() {
        assert_eq!(time_label(0.0, true), "1970-01-01");
        assert_eq!(time_label(3.0, false), "3");
    }
}
