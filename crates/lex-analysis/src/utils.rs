//! Shared helpers for reading Polars dtypes.

use crate::dataset::ColumnKind;
use polars::prelude::*;

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType carries a point in time.
#[inline]
pub fn is_temporal_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

/// Infer the analysis kind of a column from its physical dtype.
///
/// Booleans are read as multi-select flags; anything that is neither
/// numeric, temporal nor boolean is treated as categorical.
pub fn infer_column_kind(dtype: &DataType) -> ColumnKind {
    if is_numeric_dtype(dtype) {
        ColumnKind::Numeric
    } else if is_temporal_dtype(dtype) {
        ColumnKind::Datetime
    } else if matches!(dtype, DataType::Boolean) {
        ColumnKind::MultiSelect
    } else {
        ColumnKind::Categorical
    }
}

/// Parse a flag-like text cell ("1", "yes", "true", "selected", ...).
///
/// Returns `None` for text that is neither a positive nor a negative marker.
pub fn parse_flag(text: &str) -> Option<bool> {
    const POSITIVE: [&str; 6] = ["1", "1.0", "true", "yes", "y", "selected"];
    const NEGATIVE: [&str; 6] = ["0", "0.0", "false", "no", "n", "unselected"];

    let lower = text.trim().to_ascii_lowercase();
    if POSITIVE.contains(&lower.as_str()) {
        Some(true)
    } else if NEGATIVE.contains(&lower.as_str()) || lower.is_empty() {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_column_kind() {
        assert_eq!(infer_column_kind(&DataType::Int64), ColumnKind::Numeric);
        assert_eq!(infer_column_kind(&DataType::Float32), ColumnKind::Numeric);
        assert_eq!(infer_column_kind(&DataType::Date), ColumnKind::Datetime);
        assert_eq!(infer_column_kind(&DataType::Boolean), ColumnKind::MultiSelect);
        assert_eq!(infer_column_kind(&DataType::String), ColumnKind::Categorical);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("Yes"), Some(true));
        assert_eq!(parse_flag(" 1 "), Some(true));
        assert_eq!(parse_flag("false"), Some(false));
        assert_eq!(parse_flag(""), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
