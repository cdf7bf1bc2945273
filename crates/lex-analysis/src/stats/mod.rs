//! Numerical building blocks used by the statistic computers.
//!
//! Everything here works on plain, already missing-filtered slices and
//! returns `Option` where a statistic is undefined for the given input
//! (too few observations, zero spread, singular matrix). Computers turn
//! `None` into a typed [`crate::result::FailureReason`].

pub mod correlation;
pub mod descriptive;
pub mod distributions;
pub mod format;
pub mod hypothesis;
pub mod matrix;

pub use correlation::{CorrelationKind, CorrelationTest, correlation_test, pearson, spearman};
pub use descriptive::{Summary, mean, median, std_dev, summarize, variance};
pub use format::{clean_p_value, format_p_value, significance_marker};
