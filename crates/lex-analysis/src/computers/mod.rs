//! Statistic computers, one per method family.
//!
//! A computer is a stateless strategy: it reads the columns a
//! [`BoundRequest`] names, applies the family's missing-data and
//! minimum-sample policies, and returns a [`RawOutput`] for the normalizer.
//! Computation problems (singular matrices, zero variance, too few pairwise
//! rows) are reported through the output's status and
//! [`FailureReason`]; an `Err` is reserved for failures to read the input.

mod association;
mod descriptive;
mod latent;
mod mean_comparison;
pub mod models;
mod predictive;
mod questionnaire;
mod temporal;
mod unsupervised;

pub use association::AssociationComputer;
pub use descriptive::DescriptiveComputer;
pub use latent::LatentStructureComputer;
pub use mean_comparison::MeanComparisonComputer;
pub use predictive::PredictiveComputer;
pub use questionnaire::{QuestionnaireComputer, ReverseCorrection, detect_and_correct};
pub use temporal::TemporalComputer;
pub use unsupervised::UnsupervisedComputer;

use crate::config::EngineConfig;
use crate::dataset::{ColumnKind, Dataset};
use crate::error::Result;
use crate::request::{MethodFamily, Role};
use crate::result::{FailureReason, RawOutput};
use crate::validation::BoundRequest;

/// Computes the statistics of one method family.
pub trait StatisticComputer: Send + Sync {
    /// The family this computer handles.
    fn family(&self) -> MethodFamily;

    /// Compute raw output for a validated request.
    fn compute(
        &self,
        dataset: &Dataset,
        request: &BoundRequest,
        config: &EngineConfig,
    ) -> Result<RawOutput>;
}

/// The computer responsible for a method family.
pub fn computer_for(family: MethodFamily) -> &'static dyn StatisticComputer {
    match family {
        MethodFamily::Descriptive => &DescriptiveComputer,
        MethodFamily::Association => &AssociationComputer,
        MethodFamily::MeanComparison => &MeanComparisonComputer,
        MethodFamily::LatentStructure => &LatentStructureComputer,
        MethodFamily::Predictive => &PredictiveComputer,
        MethodFamily::Unsupervised => &UnsupervisedComputer,
        MethodFamily::Temporal => &TemporalComputer,
        MethodFamily::Questionnaire => &QuestionnaireComputer,
    }
}

/// Significance level for a request: the `alpha` parameter or the configured default.
pub(crate) fn alpha(request: &BoundRequest, config: &EngineConfig) -> f64 {
    request.parameters.f64("alpha").unwrap_or(config.alpha)
}

/// Read every column bound to `role` as floats.
pub(crate) fn numeric_columns(
    dataset: &Dataset,
    request: &BoundRequest,
    role: Role,
) -> Result<Vec<Vec<Option<f64>>>> {
    request
        .columns(role)
        .iter()
        .map(|c| dataset.numeric(c))
        .collect()
}

/// Labels of a categorical or multi-select column, one per row.
pub(crate) fn label_column(dataset: &Dataset, name: &str) -> Result<Vec<Option<String>>> {
    if dataset.column_kind(name) == Some(ColumnKind::MultiSelect) {
        return Ok(dataset
            .flags(name)?
            .into_iter()
            .map(|f| f.map(|selected| if selected { "selected" } else { "not selected" }.to_string()))
            .collect());
    }
    dataset.categorical(name)
}

/// Failed output when a filtered sample is below the method floor.
pub(crate) fn guard_sample(required: usize, found: usize) -> Option<RawOutput> {
    (found < required).then(|| {
        RawOutput::failure(FailureReason::InsufficientPairwiseSample { required, found })
    })
}
