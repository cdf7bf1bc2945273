//! Role requirements per analysis method.

use crate::dataset::ColumnKind;
use crate::request::{AnalysisMethod, Role};

/// What one role of a method accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleSpec {
    pub role: Role,
    pub kinds: &'static [ColumnKind],
    pub min: usize,
    pub max: Option<usize>,
}

impl RoleSpec {
    const fn new(role: Role, kinds: &'static [ColumnKind], min: usize, max: Option<usize>) -> Self {
        Self {
            role,
            kinds,
            min,
            max,
        }
    }

    /// Human-readable list of accepted kinds.
    pub fn expected(&self) -> String {
        self.kinds
            .iter()
            .map(ColumnKind::as_str)
            .collect::<Vec<_>>()
            .join(" or ")
    }

    pub fn count_text(&self) -> String {
        match self.max {
            Some(max) if max == self.min => format!("exactly {}", max),
            Some(max) => format!("{} to {}", self.min, max),
            None => format!("at least {}", self.min),
        }
    }
}

const NUMERIC: &[ColumnKind] = &[ColumnKind::Numeric];
const GROUPING: &[ColumnKind] = &[ColumnKind::Categorical, ColumnKind::MultiSelect];
const LABELS: &[ColumnKind] = &[
    ColumnKind::Categorical,
    ColumnKind::MultiSelect,
    ColumnKind::Numeric,
];
const TIME: &[ColumnKind] = &[ColumnKind::Datetime, ColumnKind::Numeric];
const FLAGS: &[ColumnKind] = &[ColumnKind::MultiSelect, ColumnKind::Numeric];

const ONE: Option<usize> = Some(1);

const DESCRIPTIVE: &[RoleSpec] = &[RoleSpec::new(Role::Variables, NUMERIC, 1, None)];
const FREQUENCY: &[RoleSpec] = &[RoleSpec::new(Role::Variables, GROUPING, 1, None)];
const CORRELATION: &[RoleSpec] = &[RoleSpec::new(Role::Variables, NUMERIC, 2, None)];
const CROSSTAB: &[RoleSpec] = &[
    RoleSpec::new(Role::Row, GROUPING, 1, ONE),
    RoleSpec::new(Role::Column, GROUPING, 1, ONE),
];
const GROUP_COMPARISON: &[RoleSpec] = &[
    RoleSpec::new(Role::Dependent, NUMERIC, 1, ONE),
    RoleSpec::new(Role::Grouping, GROUPING, 1, ONE),
];
const PAIRED: &[RoleSpec] = &[RoleSpec::new(Role::Variables, NUMERIC, 2, Some(2))];
const REGRESSION: &[RoleSpec] = &[
    RoleSpec::new(Role::Dependent, NUMERIC, 1, ONE),
    RoleSpec::new(Role::Independent, NUMERIC, 1, None),
];
const CLASSIFICATION: &[RoleSpec] = &[
    RoleSpec::new(Role::Dependent, LABELS, 1, ONE),
    RoleSpec::new(Role::Independent, NUMERIC, 1, None),
];
const LATENT: &[RoleSpec] = &[RoleSpec::new(Role::Variables, NUMERIC, 3, None)];
const UNSUPERVISED: &[RoleSpec] = &[RoleSpec::new(Role::Variables, NUMERIC, 2, None)];
const TREND: &[RoleSpec] = &[
    RoleSpec::new(Role::Time, TIME, 1, ONE),
    RoleSpec::new(Role::Value, NUMERIC, 1, ONE),
];
const MULTI_SELECT: &[RoleSpec] = &[RoleSpec::new(Role::Items, FLAGS, 2, None)];
const SCALE_ITEMS: &[RoleSpec] = &[RoleSpec::new(Role::Items, NUMERIC, 2, None)];

/// Roles a method accepts. A role with `min > 0` is required.
pub fn role_specs(method: AnalysisMethod) -> &'static [RoleSpec] {
    use AnalysisMethod::*;
    match method {
        Descriptive => DESCRIPTIVE,
        Frequency => FREQUENCY,
        Correlation => CORRELATION,
        Crosstab => CROSSTAB,
        IndependentTTest | Anova => GROUP_COMPARISON,
        PairedTTest => PAIRED,
        LinearRegression | RegressionComparison => REGRESSION,
        LogisticRegression | ClassificationComparison => CLASSIFICATION,
        FactorAnalysis | Pca => LATENT,
        Clustering | DimensionalityReduction => UNSUPERVISED,
        Trend => TREND,
        MultiSelect => MULTI_SELECT,
        Reliability | QuestionnaireQuality => SCALE_ITEMS,
    }
}
