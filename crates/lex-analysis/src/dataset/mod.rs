//! Read-only, schema-typed view over a Polars `DataFrame`.
//!
//! [`Dataset`] is the ingestion boundary of the engine. It pairs the frame
//! with a declared [`ColumnKind`] per column (inferred from dtypes unless the
//! caller overrides it) and the set of columns hinted as reverse-coded
//! questionnaire items.
//!
//! Extraction methods return one `Option` per row, so missingness stays
//! per cell. Non-finite floats are read as missing.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_analysis::dataset::{ColumnKind, Dataset};
//! use polars::prelude::*;
//!
//! let df = df!["gender" => [1, 2, 1], "score" => [3.0, 4.5, 2.0]]?;
//! let dataset = Dataset::from_frame(df)
//!     .with_kind("gender", ColumnKind::Categorical)?
//!     .with_reverse_hints(["q7"]);
//! ```

mod pairwise;
mod schema;

pub use pairwise::{complete_columns, complete_indices, complete_rows, labelled, paired, present};
pub use schema::{ColumnKind, ColumnSpec};

use crate::error::{AnalysisError, Result};
use crate::utils::{infer_column_kind, is_temporal_dtype, parse_flag};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Immutable tabular input to the engine.
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
    columns: Vec<ColumnSpec>,
    reverse_hints: BTreeSet<String>,
}

impl Dataset {
    /// Wrap a frame, inferring each column's kind from its dtype.
    pub fn from_frame(frame: DataFrame) -> Self {
        let columns = frame
            .get_columns()
            .iter()
            .map(|col| ColumnSpec {
                name: col.name().to_string(),
                kind: infer_column_kind(col.dtype()),
            })
            .collect();

        Self {
            frame,
            columns,
            reverse_hints: BTreeSet::new(),
        }
    }

    /// Override the declared kind of one column.
    pub fn with_kind(mut self, column: &str, kind: ColumnKind) -> Result<Self> {
        let spec = self
            .columns
            .iter_mut()
            .find(|c| c.name == column)
            .ok_or_else(|| AnalysisError::ColumnNotFound(column.to_string()))?;
        spec.kind = kind;
        Ok(self)
    }

    /// Declare columns that are known to be reverse-coded items.
    pub fn with_reverse_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reverse_hints.extend(hints.into_iter().map(Into::into));
        self
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column_kind(&self, name: &str) -> Option<ColumnKind> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.kind)
    }

    pub fn reverse_hints(&self) -> &BTreeSet<String> {
        &self.reverse_hints
    }

    pub fn is_reverse_hinted(&self, name: &str) -> bool {
        self.reverse_hints.contains(name)
    }

    fn series(&self, name: &str) -> Result<&Series> {
        self.frame
            .column(name)
            .map(|c| c.as_materialized_series())
            .map_err(|_| AnalysisError::ColumnNotFound(name.to_string()))
    }

    /// Read a column as floats.
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let series = self.series(name)?;
        let casted = series.cast(&DataType::Float64)?;
        let values = casted.f64()?;
        Ok(values
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect())
    }

    /// Read a column as text labels.
    pub fn categorical(&self, name: &str) -> Result<Vec<Option<String>>> {
        let series = self.series(name)?;
        let casted = series.cast(&DataType::String)?;
        let values = casted.str()?;
        Ok(values
            .into_iter()
            .map(|v| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string))
            .collect())
    }

    /// Read a column as multi-select flags.
    ///
    /// Booleans are taken as-is, numbers are selected when non-zero, and text
    /// is parsed with common yes/no markers. Unparseable text is missing.
    pub fn flags(&self, name: &str) -> Result<Vec<Option<bool>>> {
        let series = self.series(name)?;
        match series.dtype() {
            DataType::Boolean => Ok(series.bool()?.into_iter().collect()),
            dtype if crate::utils::is_numeric_dtype(dtype) => Ok(self
                .numeric(name)?
                .into_iter()
                .map(|v| v.map(|x| x != 0.0))
                .collect()),
            _ => Ok(self
                .categorical(name)?
                .into_iter()
                .map(|v| v.and_then(|s| parse_flag(&s)))
                .collect()),
        }
    }

    /// Read a time axis as sortable floats.
    ///
    /// Temporal columns become epoch milliseconds; anything else is read
    /// numerically (period indices, years, ...).
    pub fn timestamps(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let series = self.series(name)?;
        if !is_temporal_dtype(series.dtype()) {
            return self.numeric(name);
        }

        let casted = series
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(|e| AnalysisError::ColumnConversion {
                column: name.to_string(),
                target: "datetime".to_string(),
                reason: e.to_string(),
            })?;
        let values = casted.datetime()?;
        Ok(values
            .physical()
            .into_iter()
            .map(|v| v.map(|ms| ms as f64))
            .collect())
    }

    /// Per-row presence for a column, read according to its declared kind.
    pub fn presence(&self, name: &str) -> Result<Vec<bool>> {
        let kind = self
            .column_kind(name)
            .ok_or_else(|| AnalysisError::ColumnNotFound(name.to_string()))?;
        Ok(match kind {
            ColumnKind::Numeric => self.numeric(name)?.iter().map(Option::is_some).collect(),
            ColumnKind::Datetime => self.timestamps(name)?.iter().map(Option::is_some).collect(),
            ColumnKind::MultiSelect => self.flags(name)?.iter().map(Option::is_some).collect(),
            ColumnKind::Categorical => {
                self.categorical(name)?.iter().map(Option::is_some).collect()
            }
        })
    }

    /// Number of non-missing cells in a column.
    pub fn non_missing_count(&self, name: &str) -> Result<usize> {
        Ok(self.presence(name)?.into_iter().filter(|p| *p).count())
    }

    /// Number of rows present in every listed column.
    pub fn complete_count(&self, names: &[String]) -> Result<usize> {
        let mut mask = vec![true; self.height()];
        for name in names {
            for (keep, present) in mask.iter_mut().zip(self.presence(name)?) {
                *keep &= present;
            }
        }
        Ok(mask.into_iter().filter(|k| *k).count())
    }

    /// Distinct non-missing labels in a column.
    pub fn levels(&self, name: &str) -> Result<Vec<String>> {
        let levels: BTreeSet<String> = self.categorical(name)?.into_iter().flatten().collect();
        Ok(levels.into_iter().collect())
    }

    /// Per-group count of rows where both `value` and `group` are present.
    pub fn group_counts(&self, value: &str, group: &str) -> Result<BTreeMap<String, usize>> {
        let present = self.presence(value)?;
        let labels = self.categorical(group)?;
        let mut counts = BTreeMap::new();
        for (ok, label) in present.into_iter().zip(labels) {
            if let (true, Some(label)) = (ok, label) {
                *counts.entry(label).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

static_assertions::assert_impl_all!(Dataset: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    fn survey() -> Dataset {
        let df = df![
            "age" => [Some(21.0), None, Some(35.0), Some(f64::NAN)],
            "gender" => [Some("f"), Some("m"), None, Some("f")],
            "owns_car" => [true, false, true, false],
            "q1" => [1i32, 2, 3, 4],
        ]
        .unwrap();
        Dataset::from_frame(df)
    }

    #[test]
    fn test_kind_inference() {
        let ds = survey();
        assert_eq!(ds.column_kind("age"), Some(ColumnKind::Numeric));
        assert_eq!(ds.column_kind("gender"), Some(ColumnKind::Categorical));
        assert_eq!(ds.column_kind("owns_car"), Some(ColumnKind::MultiSelect));
        assert_eq!(ds.column_kind("missing"), None);
    }

    #[test]
    fn test_with_kind_override() {
        let ds = survey().with_kind("q1", ColumnKind::Categorical).unwrap();
        assert_eq!(ds.column_kind("q1"), Some(ColumnKind::Categorical));
        assert_eq!(ds.levels("q1").unwrap(), vec!["1", "2", "3", "4"]);

        assert!(matches!(
            survey().with_kind("nope", ColumnKind::Numeric),
            Err(AnalysisError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_numeric_treats_nan_as_missing() {
        let ds = survey();
        assert_eq!(ds.numeric("age").unwrap(), vec![Some(21.0), None, Some(35.0), None]);
        assert_eq!(ds.non_missing_count("age").unwrap(), 2);
    }

    #[test]
    fn test_flags_from_boolean() {
        let ds = survey();
        assert_eq!(
            ds.flags("owns_car").unwrap(),
            vec![Some(true), Some(false), Some(true), Some(false)]
        );
    }

    #[test]
    fn test_complete_and_group_counts() {
        let ds = survey();
        let cols = vec!["age".to_string(), "gender".to_string()];
        assert_eq!(ds.complete_count(&cols).unwrap(), 1);

        let counts = ds.group_counts("q1", "gender").unwrap();
        assert_eq!(counts.get("f"), Some(&2));
        assert_eq!(counts.get("m"), Some(&1));
    }

    #[test]
    fn test_reverse_hints() {
        let ds = survey().with_reverse_hints(["q1"]);
        assert!(ds.is_reverse_hinted("q1"));
        assert!(!ds.is_reverse_hinted("age"));
    }
}
