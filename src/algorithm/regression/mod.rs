//! Survey-weighted regression
//!
//! Models are described by a [`ModelSpec`]: an outcome, a [`Family`] and a
//! list of predictor [`Term`]s. The runner assembles the design matrix,
//! hands it to a [`GlmSolver`] and turns the fit into uniform result
//! records. A fit that fails becomes a [`ModelOutcome::Failed`] instead of an
//! error, so one bad model never stops a grid.

pub mod design;
pub mod runner;
pub mod sensitivity;
pub mod solver;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Variable;

pub use design::{DesignMatrix, INTERCEPT};
pub use runner::{RegressionReport, RegressionRunner};
pub use sensitivity::{
    AvailableCaseCount, OverdispersionTest, SensitivityPlan, SensitivityReport, StratumFit,
    ZeroProportion, run_sensitivity,
};
pub use solver::{FitError, GlmFit, GlmSolver, IrlsSolver};

/// Link between the linear predictor and the mean
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// `eta = mu`
    Identity,
    /// `eta = ln(mu)`
    Log,
    /// `eta = ln(mu / (1 - mu))`
    Logit,
}

/// Error distribution and link of a model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Family {
    /// Binary outcome, logit link
    BinomialLogit,
    /// Count outcome, log link
    Poisson,
    /// Overdispersed count outcome with fixed `alpha`, log link
    NegativeBinomial {
        /// Dispersion, variance = mu + alpha * mu^2
        alpha: f64,
    },
    /// Weighted least squares
    Gaussian,
}

impl Family {
    /// Link function of the family
    #[must_use]
    pub const fn link(self) -> Link {
        match self {
            Self::BinomialLogit => Link::Logit,
            Self::Poisson | Self::NegativeBinomial { .. } => Link::Log,
            Self::Gaussian => Link::Identity,
        }
    }

    /// Short name for result tables
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BinomialLogit => "logistic",
            Self::Poisson => "poisson",
            Self::NegativeBinomial { .. } => "negative_binomial",
            Self::Gaussian => "linear",
        }
    }

    /// Label of the exponentiated coefficient, if it has one
    #[must_use]
    pub const fn ratio_label(self) -> Option<&'static str> {
        match self {
            Self::BinomialLogit => Some("OR"),
            Self::Poisson | Self::NegativeBinomial { .. } => Some("IRR"),
            Self::Gaussian => None,
        }
    }

    /// Whether coefficients are reported with exp() ratios
    #[must_use]
    pub const fn has_ratio_scale(self) -> bool {
        self.ratio_label().is_some()
    }

    /// Check the family parameters; the negative binomial `alpha` must be
    /// finite and positive
    pub fn validate(self) -> Result<(), FitError> {
        match self {
            Self::NegativeBinomial { alpha } if !(alpha.is_finite() && alpha > 0.0) => {
                Err(FitError::InvalidFamily {
                    family: self.name().to_string(),
                    message: format!("alpha must be positive, got {alpha}"),
                })
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeBinomial { alpha } => write!(f, "negative_binomial(alpha={alpha})"),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// One predictor of a model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Term {
    /// The variable as is; categorical variables expand to dummies
    Variable(Variable),
    /// A continuous variable minus a centering constant
    Centered {
        /// Continuous variable
        variable: Variable,
        /// Value subtracted from every observation
        at: f64,
    },
}

impl Term {
    /// Variable the term reads
    #[must_use]
    pub const fn variable(self) -> Variable {
        match self {
            Self::Variable(variable) | Self::Centered { variable, .. } => variable,
        }
    }

    /// Column name of the term, e.g. `age_c70`
    #[must_use]
    pub fn name(self) -> String {
        match self {
            Self::Variable(variable) => variable.name().to_string(),
            Self::Centered { variable, at } => format!("{}_c{at}", variable.name()),
        }
    }
}

impl From<Variable> for Term {
    fn from(variable: Variable) -> Self {
        Self::Variable(variable)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A model to fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model name used in results and logs
    pub name: String,
    /// Outcome variable
    pub outcome: Variable,
    /// Error distribution and link
    pub family: Family,
    /// Predictors in column order
    pub predictors: Vec<Term>,
}

impl ModelSpec {
    /// Create a model specification
    pub fn new(
        name: impl Into<String>,
        outcome: Variable,
        family: Family,
        predictors: Vec<Term>,
    ) -> Self {
        Self {
            name: name.into(),
            outcome,
            family,
            predictors,
        }
    }

    /// Exposure of the model, its first predictor
    #[must_use]
    pub fn exposure(&self) -> Option<Term> {
        self.predictors.first().copied()
    }

    /// Variables the model needs observed on a row
    #[must_use]
    pub fn variables(&self) -> Vec<Variable> {
        let mut variables = vec![self.outcome];
        for term in &self.predictors {
            if !variables.contains(&term.variable()) {
                variables.push(term.variable());
            }
        }
        variables
    }
}

/// Named list of covariates added to every exposure of a grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentSet {
    /// Set name, e.g. `Model 2`
    pub name: String,
    /// Covariate terms
    pub covariates: Vec<Term>,
}

impl AdjustmentSet {
    /// Create an adjustment set
    pub fn new(name: impl Into<String>, covariates: Vec<Term>) -> Self {
        Self {
            name: name.into(),
            covariates,
        }
    }
}

/// Every exposure crossed with every adjustment set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureGrid {
    /// Common outcome
    pub outcome: Variable,
    /// Common family
    pub family: Family,
    /// Exposures, one model per exposure and set
    pub exposures: Vec<Term>,
    /// Adjustment sets
    pub adjustment_sets: Vec<AdjustmentSet>,
}

impl ExposureGrid {
    /// Model for one exposure under one adjustment set
    ///
    /// The exposure comes first; covariates that repeat it are left out.
    #[must_use]
    pub fn spec(&self, exposure: Term, set: &AdjustmentSet) -> ModelSpec {
        let mut predictors = vec![exposure];
        predictors.extend(
            set.covariates
                .iter()
                .copied()
                .filter(|term| term.variable() != exposure.variable()),
        );
        ModelSpec::new(set.name.clone(), self.outcome, self.family, predictors)
    }
}

/// Models to fit for a study
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPlan {
    /// Exposure by adjustment-set grid
    pub grid: Option<ExposureGrid>,
    /// Individually specified models
    pub models: Vec<ModelSpec>,
    /// Reference levels replacing the per-variable defaults
    pub reference_overrides: BTreeMap<Variable, String>,
}

impl ModelPlan {
    /// Whether the plan fits nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grid.is_none() && self.models.is_empty()
    }

    /// Families of the grid and of every individual model
    pub fn families(&self) -> impl Iterator<Item = Family> + '_ {
        self.grid
            .iter()
            .map(|grid| grid.family)
            .chain(self.models.iter().map(|spec| spec.family))
    }
}

/// One estimated coefficient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    /// Design column name
    pub term: String,
    /// Point estimate on the link scale
    pub estimate: f64,
    /// Standard error
    pub std_error: f64,
    /// Lower 95% bound
    pub ci_lower: f64,
    /// Upper 95% bound
    pub ci_upper: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// exp(estimate) for log and logit links
    pub ratio: Option<f64>,
    /// exp(ci_lower)
    pub ratio_ci_lower: Option<f64>,
    /// exp(ci_upper)
    pub ratio_ci_upper: Option<f64>,
}

/// Fit statistics of one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitStatistics {
    /// Rows used
    pub n_obs: usize,
    /// Sum of the weights of the rows used
    pub weighted_n: f64,
    /// Rows dropped for missing values or weights
    pub n_dropped: usize,
    /// Residual degrees of freedom
    pub df_resid: f64,
    /// IRLS iterations
    pub iterations: usize,
    /// Deviance
    pub deviance: f64,
    /// Pearson chi-square
    pub pearson_chi2: f64,
    /// R^2 (linear models)
    pub r_squared: Option<f64>,
    /// Adjusted R^2 (linear models)
    pub adj_r_squared: Option<f64>,
    /// Overall F statistic (linear models)
    pub f_statistic: Option<f64>,
    /// p-value of the F statistic
    pub f_p_value: Option<f64>,
}

/// Coefficients and statistics of a fitted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    /// Model name
    pub model: String,
    /// Outcome variable
    pub outcome: Variable,
    /// Family
    pub family: Family,
    /// Coefficients in design column order, intercept first
    pub coefficients: Vec<Coefficient>,
    /// Fit statistics
    pub statistics: FitStatistics,
}

impl ModelSummary {
    /// Coefficient by design column name
    #[must_use]
    pub fn coefficient(&self, term: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.term == term)
    }

    /// Coefficients belonging to a term (one, or one per dummy)
    pub fn term_coefficients(&self, term: Term) -> impl Iterator<Item = &Coefficient> {
        let name = term.name();
        let prefix = format!("{name}[");
        self.coefficients
            .iter()
            .filter(move |c| c.term == name || c.term.starts_with(&prefix))
    }
}

/// Result of attempting one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelOutcome {
    /// The model was estimated
    Fitted(ModelSummary),
    /// The model could not be estimated
    Failed {
        /// Model name
        model: String,
        /// Why it failed
        reason: String,
    },
}

impl ModelOutcome {
    /// Model name
    #[must_use]
    pub fn model(&self) -> &str {
        match self {
            Self::Fitted(summary) => &summary.model,
            Self::Failed { model, .. } => model,
        }
    }

    /// Summary when the model was estimated
    #[must_use]
    pub fn summary(&self) -> Option<&ModelSummary> {
        match self {
            Self::Fitted(summary) => Some(summary),
            Self::Failed { .. } => None,
        }
    }

    /// Whether the model failed
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Status of a result record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelStatus {
    /// Numbers are available
    Estimated,
    /// Not reported
    Failed {
        /// Why the model failed
        reason: String,
    },
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Estimated => write!(f, "Estimated"),
            Self::Failed { .. } => write!(f, "NR"),
        }
    }
}

/// One exposure coefficient of one model, flat for tables and files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResultRecord {
    /// Exposure term
    pub exposure: String,
    /// Design column (the exposure itself or one of its dummies)
    pub term: String,
    /// Model name
    pub model: String,
    /// Outcome variable
    pub outcome: Variable,
    /// Family name
    pub family: String,
    /// Point estimate on the link scale
    pub estimate: Option<f64>,
    /// Standard error
    pub std_error: Option<f64>,
    /// Lower 95% bound
    pub ci_lower: Option<f64>,
    /// Upper 95% bound
    pub ci_upper: Option<f64>,
    /// Two-sided p-value
    pub p_value: Option<f64>,
    /// exp(estimate) for log and logit links
    pub ratio: Option<f64>,
    /// exp(ci_lower)
    pub ratio_ci_lower: Option<f64>,
    /// exp(ci_upper)
    pub ratio_ci_upper: Option<f64>,
    /// Rows used
    pub n: Option<usize>,
    /// Sum of weights of the rows used
    pub weighted_n: Option<f64>,
    /// Whether numbers are available
    pub status: ModelStatus,
}

impl ModelResultRecord {
    /// Records for one exposure of one attempted model
    ///
    /// A failed model yields one record with no numbers.
    #[must_use]
    pub fn from_outcome(outcome: &ModelOutcome, spec: &ModelSpec, exposure: Term) -> Vec<Self> {
        let failed = |reason: String| Self {
            exposure: exposure.name(),
            term: exposure.name(),
            model: spec.name.clone(),
            outcome: spec.outcome,
            family: spec.family.name().to_string(),
            estimate: None,
            std_error: None,
            ci_lower: None,
            ci_upper: None,
            p_value: None,
            ratio: None,
            ratio_ci_lower: None,
            ratio_ci_upper: None,
            n: None,
            weighted_n: None,
            status: ModelStatus::Failed { reason },
        };

        let summary = match outcome {
            ModelOutcome::Fitted(summary) => summary,
            ModelOutcome::Failed { reason, .. } => return vec![failed(reason.clone())],
        };

        let records: Vec<Self> = summary
            .term_coefficients(exposure)
            .map(|c| Self {
                exposure: exposure.name(),
                term: c.term.clone(),
                model: spec.name.clone(),
                outcome: spec.outcome,
                family: spec.family.name().to_string(),
                estimate: Some(c.estimate),
                std_error: Some(c.std_error),
                ci_lower: Some(c.ci_lower),
                ci_upper: Some(c.ci_upper),
                p_value: Some(c.p_value),
                ratio: c.ratio,
                ratio_ci_lower: c.ratio_ci_lower,
                ratio_ci_upper: c.ratio_ci_upper,
                n: Some(summary.statistics.n_obs),
                weighted_n: Some(summary.statistics.weighted_n),
                status: ModelStatus::Estimated,
            })
            .collect();

        if records.is_empty() {
            vec![failed("exposure has no estimable coefficient".to_string())]
        } else {
            records
        }
    }

    /// Whether numbers are available
    #[must_use]
    pub const fn is_estimated(&self) -> bool {
        matches!(self.status, ModelStatus::Estimated)
    }
}

fn nr(value: Option<f64>, digits: usize) -> String {
    value.map_or_else(|| "NR".to_string(), |v| format!("{v:.digits$}"))
}

impl fmt::Display for ModelResultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (point, lower, upper) = if self.ratio.is_some() {
            (self.ratio, self.ratio_ci_lower, self.ratio_ci_upper)
        } else {
            (self.estimate, self.ci_lower, self.ci_upper)
        };
        write!(
            f,
            "{} | {} | {}: {} ({}, {}), p = {}",
            self.model,
            self.term,
            self.outcome,
            nr(point, 2),
            nr(lower, 2),
            nr(upper, 2),
            nr(self.p_value, 4)
        )
    }
}
