//! Analysis requests: which method to run, on which columns, with which parameters.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Every analysis the engine can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMethod {
    Descriptive,
    Frequency,
    Correlation,
    Crosstab,
    IndependentTTest,
    PairedTTest,
    Anova,
    LinearRegression,
    LogisticRegression,
    FactorAnalysis,
    Pca,
    Clustering,
    DimensionalityReduction,
    ClassificationComparison,
    RegressionComparison,
    Trend,
    MultiSelect,
    Reliability,
    QuestionnaireQuality,
}

/// Groups of methods that share one statistic computer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodFamily {
    Descriptive,
    Association,
    MeanComparison,
    LatentStructure,
    Predictive,
    Unsupervised,
    Temporal,
    Questionnaire,
}

/// Findings a method promises in its result envelope.
#[derive(Debug, Clone, Copy)]
pub struct MethodContract {
    /// Must be present for `success` or `partial`.
    pub required: &'static [&'static str],
    /// Expected on `success`; absence downgrades to `partial`.
    pub optional: &'static [&'static str],
}

const ALGORITHM_FINDINGS: &[&str] = &["algorithms_requested", "algorithms_succeeded", "n"];
const COMPARISON_FINDINGS: &[&str] = &[
    "algorithms_requested",
    "algorithms_succeeded",
    "n",
    "best_algorithm",
];
const ADEQUACY_FINDINGS: &[&str] = &["kmo", "bartlett_chi_square", "bartlett_p_value"];

impl AnalysisMethod {
    pub const ALL: [AnalysisMethod; 19] = [
        AnalysisMethod::Descriptive,
        AnalysisMethod::Frequency,
        AnalysisMethod::Correlation,
        AnalysisMethod::Crosstab,
        AnalysisMethod::IndependentTTest,
        AnalysisMethod::PairedTTest,
        AnalysisMethod::Anova,
        AnalysisMethod::LinearRegression,
        AnalysisMethod::LogisticRegression,
        AnalysisMethod::FactorAnalysis,
        AnalysisMethod::Pca,
        AnalysisMethod::Clustering,
        AnalysisMethod::DimensionalityReduction,
        AnalysisMethod::ClassificationComparison,
        AnalysisMethod::RegressionComparison,
        AnalysisMethod::Trend,
        AnalysisMethod::MultiSelect,
        AnalysisMethod::Reliability,
        AnalysisMethod::QuestionnaireQuality,
    ];

    /// Stable identifier, identical to the serde name.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Descriptive => "descriptive",
            Self::Frequency => "frequency",
            Self::Correlation => "correlation",
            Self::Crosstab => "crosstab",
            Self::IndependentTTest => "independent_t_test",
            Self::PairedTTest => "paired_t_test",
            Self::Anova => "anova",
            Self::LinearRegression => "linear_regression",
            Self::LogisticRegression => "logistic_regression",
            Self::FactorAnalysis => "factor_analysis",
            Self::Pca => "pca",
            Self::Clustering => "clustering",
            Self::DimensionalityReduction => "dimensionality_reduction",
            Self::ClassificationComparison => "classification_comparison",
            Self::RegressionComparison => "regression_comparison",
            Self::Trend => "trend",
            Self::MultiSelect => "multi_select",
            Self::Reliability => "reliability",
            Self::QuestionnaireQuality => "questionnaire_quality",
        }
    }

    /// Human-readable name used in narratives.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Descriptive => "Descriptive statistics",
            Self::Frequency => "Frequency analysis",
            Self::Correlation => "Correlation analysis",
            Self::Crosstab => "Crosstab (chi-square) analysis",
            Self::IndependentTTest => "Independent-samples t-test",
            Self::PairedTTest => "Paired-samples t-test",
            Self::Anova => "One-way ANOVA",
            Self::LinearRegression => "Linear regression",
            Self::LogisticRegression => "Logistic regression",
            Self::FactorAnalysis => "Exploratory factor analysis",
            Self::Pca => "Principal component analysis",
            Self::Clustering => "Cluster analysis",
            Self::DimensionalityReduction => "Dimensionality reduction",
            Self::ClassificationComparison => "Classification model comparison",
            Self::RegressionComparison => "Regression model comparison",
            Self::Trend => "Trend analysis",
            Self::MultiSelect => "Multi-select item analysis",
            Self::Reliability => "Reliability analysis",
            Self::QuestionnaireQuality => "Questionnaire quality assessment",
        }
    }

    pub fn family(&self) -> MethodFamily {
        match self {
            Self::Descriptive | Self::Frequency => MethodFamily::Descriptive,
            Self::Correlation | Self::Crosstab => MethodFamily::Association,
            Self::IndependentTTest | Self::PairedTTest | Self::Anova => {
                MethodFamily::MeanComparison
            }
            Self::FactorAnalysis | Self::Pca => MethodFamily::LatentStructure,
            Self::LinearRegression
            | Self::LogisticRegression
            | Self::ClassificationComparison
            | Self::RegressionComparison => MethodFamily::Predictive,
            Self::Clustering | Self::DimensionalityReduction => MethodFamily::Unsupervised,
            Self::Trend => MethodFamily::Temporal,
            Self::MultiSelect | Self::Reliability | Self::QuestionnaireQuality => {
                MethodFamily::Questionnaire
            }
        }
    }

    /// Whether the method runs several independent algorithms.
    pub fn is_multi_algorithm(&self) -> bool {
        matches!(
            self,
            Self::Clustering
                | Self::DimensionalityReduction
                | Self::ClassificationComparison
                | Self::RegressionComparison
        )
    }

    /// Findings this method's results carry.
    /// Algorithm names a multi-algorithm method accepts; all run by default.
    pub fn algorithms(&self) -> &'static [&'static str] {
        match self {
            Self::Clustering => &["kmeans", "hierarchical", "dbscan"],
            Self::DimensionalityReduction => &["pca", "mds"],
            Self::ClassificationComparison => {
                &["logistic_regression", "naive_bayes", "knn", "decision_tree"]
            }
            Self::RegressionComparison => &["linear_regression", "ridge", "knn", "decision_tree"],
            _ => &[],
        }
    }

    pub fn contract(&self) -> MethodContract {
        let (required, optional): (&'static [&'static str], &'static [&'static str]) = match self
        {
            Self::Descriptive => (&["n_variables", "n_rows"], &[]),
            Self::Frequency => (&["n_variables"], &[]),
            Self::Correlation => (&["r", "p_value", "n", "pairs_computed"], &[]),
            Self::Crosstab => (&["chi_square", "df", "p_value", "cramers_v", "n"], &[]),
            Self::IndependentTTest => (
                &["t", "df", "p_value", "cohens_d", "mean_difference", "n"],
                &["levene_f", "levene_p", "ci_lower", "ci_upper"],
            ),
            Self::PairedTTest => (
                &["t", "df", "p_value", "cohens_d", "mean_difference", "n"],
                &["ci_lower", "ci_upper"],
            ),
            Self::Anova => (
                &["f", "df_between", "df_within", "p_value", "eta_squared", "n"],
                &["levene_f", "levene_p"],
            ),
            Self::LinearRegression => (&["r_squared", "adj_r_squared", "f", "p_value", "n"], &[]),
            Self::LogisticRegression => (
                &["auc", "log_likelihood", "pseudo_r_squared", "accuracy", "n"],
                &[],
            ),
            Self::FactorAnalysis => (&["n_factors", "variance_explained", "n"], ADEQUACY_FINDINGS),
            Self::Pca => (&["n_components", "variance_explained", "n"], ADEQUACY_FINDINGS),
            Self::Clustering | Self::DimensionalityReduction => (ALGORITHM_FINDINGS, &[]),
            Self::ClassificationComparison | Self::RegressionComparison => {
                (COMPARISON_FINDINGS, &[])
            }
            Self::Trend => (
                &["slope", "intercept", "r_squared", "p_value", "direction", "n_points"],
                &[],
            ),
            Self::MultiSelect => (&["respondents", "options", "mean_selections"], &[]),
            Self::Reliability => (&["cronbach_alpha", "n_items", "n"], &[]),
            Self::QuestionnaireQuality => (
                &[
                    "raw_alpha",
                    "corrected_alpha",
                    "reverse_items_flagged",
                    "overall_score",
                    "n_items",
                    "n",
                ],
                &[],
            ),
        };
        MethodContract { required, optional }
    }
}

impl fmt::Display for AnalysisMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for AnalysisMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .iter()
            .find(|m| m.id() == wanted)
            .copied()
            .ok_or_else(|| format!("unknown analysis method '{}'", s))
    }
}

/// The part a column plays in an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Outcome / target variable
    Dependent,
    /// Predictors / features
    Independent,
    /// Group membership for mean comparisons
    Grouping,
    /// Generic analysed variables (correlation, PCA, clustering, ...)
    Variables,
    /// Row variable of a crosstab
    Row,
    /// Column variable of a crosstab
    Column,
    /// Time axis of a trend
    Time,
    /// Measured value of a trend
    Value,
    /// Scale or multi-select items
    Items,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Dependent => "dependent",
            Role::Independent => "independent",
            Role::Grouping => "grouping",
            Role::Variables => "variables",
            Role::Row => "row",
            Role::Column => "column",
            Role::Time => "time",
            Role::Value => "value",
            Role::Items => "items",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dependent" | "target" | "y" => Ok(Role::Dependent),
            "independent" | "features" | "predictors" | "x" => Ok(Role::Independent),
            "grouping" | "group" => Ok(Role::Grouping),
            "variables" | "vars" => Ok(Role::Variables),
            "row" => Ok(Role::Row),
            "column" | "col" => Ok(Role::Column),
            "time" => Ok(Role::Time),
            "value" => Ok(Role::Value),
            "items" => Ok(Role::Items),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// One `{role, column}` pair of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableBinding {
    pub role: Role,
    pub column: String,
}

/// Method-specific parameters, kept as JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, Value>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Numeric parameter; numeric strings are accepted.
    pub fn f64(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Non-negative integer parameter.
    pub fn usize(&self, key: &str) -> Option<usize> {
        self.f64(key)
            .filter(|v| *v >= 0.0 && v.fract() == 0.0)
            .map(|v| v as usize)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.as_str()
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// List parameter given either as a JSON array or a comma-separated string.
    pub fn list(&self, key: &str) -> Option<Vec<String>> {
        match self.0.get(key)? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s.trim().to_string()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect(),
            ),
            Value::String(s) => Some(
                s.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// A request to run one analysis method.
///
/// # Example
///
/// ```rust,ignore
/// use lex_analysis::request::{AnalysisMethod, AnalysisRequest, Role};
///
/// let request = AnalysisRequest::new(AnalysisMethod::IndependentTTest)
///     .bind(Role::Dependent, "income")
///     .bind(Role::Grouping, "gender")
///     .param("alpha", 0.01);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub method: AnalysisMethod,
    #[serde(default)]
    pub bindings: Vec<VariableBinding>,
    #[serde(default)]
    pub parameters: Parameters,
}

impl AnalysisRequest {
    pub fn new(method: AnalysisMethod) -> Self {
        Self {
            method,
            bindings: Vec::new(),
            parameters: Parameters::new(),
        }
    }

    /// Bind one column to a role. Repeated calls append in order.
    pub fn bind(mut self, role: Role, column: impl Into<String>) -> Self {
        self.bindings.push(VariableBinding {
            role,
            column: column.into(),
        });
        self
    }

    /// Bind several columns to the same role.
    pub fn bind_all<I, S>(mut self, role: Role, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            self = self.bind(role, column);
        }
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key, value);
        self
    }

    /// Columns bound to a role, in binding order.
    pub fn columns_for(&self, role: Role) -> Vec<&str> {
        self.bindings
            .iter()
            .filter(|b| b.role == role)
            .map(|b| b.column.as_str())
            .collect()
    }
}
