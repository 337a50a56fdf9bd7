//! Sensitivity analyses for a count outcome
//!
//! The primary negative binomial model is refitted under alternative
//! assumptions: a Poisson error model, age strata, and other definitions of
//! the exposure. Zero inflation, overdispersion and available-case counts are
//! reported alongside.

use std::fmt;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::algorithm::regression::runner::RegressionRunner;
use crate::algorithm::regression::solver::GlmSolver;
use crate::algorithm::regression::{
    Family, ModelOutcome, ModelResultRecord, ModelSpec, Term,
};
use crate::models::{SubjectRecord, Variable};

/// Settings of the sensitivity analyses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPlan {
    /// Count outcome
    pub outcome: Variable,
    /// Primary exposure
    pub exposure: Term,
    /// Covariates of the primary model
    pub covariates: Vec<Term>,
    /// Dispersion of the negative binomial refits
    pub nb_alpha: f64,
    /// Categorical variable defining the strata
    pub stratify_by: Variable,
    /// Strata with fewer records are not fitted
    pub min_stratum_size: usize,
    /// Exposures replacing the primary exposure one at a time
    pub alternative_exposures: Vec<Variable>,
    /// Covariates of the alternative-exposure models
    pub alternative_covariates: Vec<Term>,
    /// Variables whose available-case counts are reported
    pub available_case_variables: Vec<Variable>,
    /// Pearson dispersion ratio above which the outcome is overdispersed
    pub overdispersion_threshold: f64,
}

impl SensitivityPlan {
    fn predictors(&self) -> Vec<Term> {
        let mut predictors = vec![self.exposure];
        predictors.extend(self.covariates.iter().copied());
        predictors
    }

    fn spec(&self, name: impl Into<String>, family: Family, predictors: Vec<Term>) -> ModelSpec {
        ModelSpec::new(name, self.outcome, family, predictors)
    }

    fn negative_binomial(&self) -> Family {
        Family::NegativeBinomial {
            alpha: self.nb_alpha,
        }
    }
}

/// Pearson dispersion of the Poisson model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverdispersionTest {
    /// Pearson chi-square
    pub pearson_chi2: f64,
    /// Residual degrees of freedom
    pub df_resid: f64,
    /// chi-square / df
    pub ratio: f64,
    /// Whether the ratio exceeds the threshold
    pub overdispersed: bool,
}

/// Share of zero counts in the outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZeroProportion {
    /// Records with an observed outcome
    pub n: usize,
    /// Records with a zero outcome
    pub n_zero: usize,
    /// Percent zero
    pub percent_zero: f64,
    /// Unweighted mean
    pub mean: f64,
    /// Unweighted sample variance
    pub variance: Option<f64>,
}

impl ZeroProportion {
    /// Compute over the observed outcome values
    #[must_use]
    pub fn compute(records: &[SubjectRecord], outcome: Variable) -> Option<Self> {
        let values: Vec<f64> = records
            .iter()
            .filter_map(|r| r.value(outcome).as_number())
            .collect();
        if values.is_empty() {
            return None;
        }
        let n = values.len();
        let n_zero = values.iter().filter(|v| **v == 0.0).count();
        let mean = values.iter().sum::<f64>() / n as f64;
        let variance = (n > 1).then(|| {
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        });
        Some(Self {
            n,
            n_zero,
            percent_zero: n_zero as f64 / n as f64 * 100.0,
            mean,
            variance,
        })
    }
}

/// Refit of the primary model within one stratum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StratumFit {
    /// Stratum level
    pub stratum: String,
    /// Records in the stratum
    pub n: usize,
    /// Exposure coefficients, or a failure record
    pub results: Vec<ModelResultRecord>,
}

/// Records with an observed value of a variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableCaseCount {
    /// Variable
    pub variable: Variable,
    /// Records with the variable observed
    pub n_available: usize,
    /// Percent of all records
    pub percent: f64,
}

/// Results of the sensitivity analyses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityReport {
    /// Exposure coefficients of the Poisson and negative binomial models
    pub count_models: Vec<ModelResultRecord>,
    /// Dispersion of the Poisson model, when it was estimated
    pub overdispersion: Option<OverdispersionTest>,
    /// Zero counts of the outcome
    pub zero_proportion: Option<ZeroProportion>,
    /// Stratified refits in level order
    pub strata: Vec<StratumFit>,
    /// Coefficients of the alternative exposures
    pub alternative_exposures: Vec<ModelResultRecord>,
    /// Complete-case sample size of the primary model
    pub complete_case_n: usize,
    /// Available-case counts
    pub available_cases: Vec<AvailableCaseCount>,
}

fn overdispersion(outcome: &ModelOutcome, threshold: f64) -> Option<OverdispersionTest> {
    let statistics = &outcome.summary()?.statistics;
    if statistics.df_resid <= 0.0 {
        return None;
    }
    let ratio = statistics.pearson_chi2 / statistics.df_resid;
    Some(OverdispersionTest {
        pearson_chi2: statistics.pearson_chi2,
        df_resid: statistics.df_resid,
        ratio,
        overdispersed: ratio > threshold,
    })
}

/// Run every sensitivity analysis of a plan
pub fn run_sensitivity<S: GlmSolver>(
    runner: &RegressionRunner<S>,
    records: &[SubjectRecord],
    plan: &SensitivityPlan,
) -> SensitivityReport {
    let predictors = plan.predictors();

    // Poisson against negative binomial
    let poisson = plan.spec("Poisson", Family::Poisson, predictors.clone());
    let negative_binomial = plan.spec("Negative Binomial", plan.negative_binomial(), predictors.clone());
    let outcomes = runner.fit_all(records, &[poisson.clone(), negative_binomial.clone()]);
    let mut count_models = ModelResultRecord::from_outcome(&outcomes[0], &poisson, plan.exposure);
    count_models.extend(ModelResultRecord::from_outcome(
        &outcomes[1],
        &negative_binomial,
        plan.exposure,
    ));
    let overdispersion = overdispersion(&outcomes[0], plan.overdispersion_threshold);
    if let Some(test) = &overdispersion {
        info!(
            "Pearson dispersion of the Poisson model: {:.2} (overdispersed: {})",
            test.ratio, test.overdispersed
        );
    }
    let complete_case_n = outcomes[1]
        .summary()
        .or_else(|| outcomes[0].summary())
        .map_or(0, |s| s.statistics.n_obs);

    // Strata
    let strata = plan
        .stratify_by
        .levels()
        .iter()
        .filter_map(|level| {
            let subset: Vec<SubjectRecord> = records
                .iter()
                .filter(|r| r.level(plan.stratify_by) == Some(*level))
                .cloned()
                .collect();
            if subset.is_empty() {
                return None;
            }
            let spec = plan.spec(
                format!("{} {level}", plan.stratify_by.label()),
                plan.negative_binomial(),
                predictors.clone(),
            );
            let outcome = if subset.len() < plan.min_stratum_size {
                warn!(
                    "Stratum {level} of {} has {} records, below the minimum of {}",
                    plan.stratify_by,
                    subset.len(),
                    plan.min_stratum_size
                );
                ModelOutcome::Failed {
                    model: spec.name.clone(),
                    reason: format!(
                        "stratum has {} records, fewer than {}",
                        subset.len(),
                        plan.min_stratum_size
                    ),
                }
            } else {
                runner.fit(&subset, &spec)
            };
            Some(StratumFit {
                stratum: (*level).to_string(),
                n: subset.len(),
                results: ModelResultRecord::from_outcome(&outcome, &spec, plan.exposure),
            })
        })
        .collect();

    // Alternative exposures
    let alternative_specs: Vec<ModelSpec> = plan
        .alternative_exposures
        .iter()
        .map(|exposure| {
            let mut predictors = vec![Term::Variable(*exposure)];
            predictors.extend(plan.alternative_covariates.iter().copied());
            plan.spec(exposure.label(), plan.negative_binomial(), predictors)
        })
        .collect();
    let alternative_outcomes = runner.fit_all(records, &alternative_specs);
    let alternative_exposures = alternative_specs
        .iter()
        .zip(&alternative_outcomes)
        .flat_map(|(spec, outcome)| {
            ModelResultRecord::from_outcome(outcome, spec, spec.predictors[0])
        })
        .collect();

    let total = records.len();
    let available_cases = plan
        .available_case_variables
        .iter()
        .map(|variable| {
            let n_available = records.iter().filter(|r| !r.is_missing(*variable)).count();
            AvailableCaseCount {
                variable: *variable,
                n_available,
                percent: if total == 0 {
                    0.0
                } else {
                    n_available as f64 / total as f64 * 100.0
                },
            }
        })
        .collect();

    SensitivityReport {
        count_models,
        overdispersion,
        zero_proportion: ZeroProportion::compute(records, plan.outcome),
        strata,
        alternative_exposures,
        complete_case_n,
        available_cases,
    }
}

impl fmt::Display for SensitivityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sensitivity Analyses:")?;
        for record in &self.count_models {
            writeln!(f, "  {record}")?;
        }
        if let Some(test) = &self.overdispersion {
            writeln!(
                f,
                "  Pearson chi2 / df = {:.2} / {:.0} = {:.2}{}",
                test.pearson_chi2,
                test.df_resid,
                test.ratio,
                if test.overdispersed { " (overdispersed)" } else { "" }
            )?;
        }
        if let Some(zeros) = &self.zero_proportion {
            writeln!(
                f,
                "  Zero counts: {} of {} ({:.1}%)",
                zeros.n_zero, zeros.n, zeros.percent_zero
            )?;
        }
        for stratum in &self.strata {
            writeln!(f, "  Stratum {} (n = {}):", stratum.stratum, stratum.n)?;
            for record in &stratum.results {
                writeln!(f, "    {record}")?;
            }
        }
        for record in &self.alternative_exposures {
            writeln!(f, "  {record}")?;
        }
        writeln!(f, "  Complete cases: {}", self.complete_case_n)?;
        for count in &self.available_cases {
            writeln!(
                f,
                "  {:<30} {:>7} ({:.1}%)",
                count.variable.label(),
                count.n_available,
                count.percent
            )?;
        }
        Ok(())
    }
}
