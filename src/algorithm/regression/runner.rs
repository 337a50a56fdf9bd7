//! Fitting model specifications over an analytic sample

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use indicatif::ParallelProgressIterator;
use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::algorithm::regression::design::DesignMatrix;
use crate::algorithm::regression::solver::{FitError, GlmSolver, IrlsSolver};
use crate::algorithm::regression::{
    ExposureGrid, FitStatistics, ModelOutcome, ModelPlan, ModelResultRecord, ModelSpec,
    ModelSummary,
};
use crate::models::{SubjectRecord, Variable};
use crate::utils::logging::{
    create_model_progress_bar, finish_progress_bar, log_operation_complete, log_operation_start,
};

/// Results of a model plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    /// Exposure coefficients of the exposure grid
    pub grid: Vec<ModelResultRecord>,
    /// Individually specified models in plan order
    pub models: Vec<ModelOutcome>,
    /// Exposure coefficients of the individually specified models
    pub model_results: Vec<ModelResultRecord>,
}

impl RegressionReport {
    /// Every exposure result record, grid first
    pub fn results(&self) -> impl Iterator<Item = &ModelResultRecord> {
        self.grid.iter().chain(&self.model_results)
    }

    /// Number of attempted models that failed
    #[must_use]
    pub fn n_failed(&self) -> usize {
        self.models.iter().filter(|m| m.is_failed()).count()
            + self.grid.iter().filter(|r| !r.is_estimated()).count()
    }
}

impl fmt::Display for RegressionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.grid.is_empty() {
            writeln!(f, "Exposure grid:")?;
            for record in &self.grid {
                writeln!(f, "  {record}")?;
            }
        }
        for outcome in &self.models {
            match outcome {
                ModelOutcome::Fitted(summary) => {
                    writeln!(
                        f,
                        "{} ({}, {}): n = {}",
                        summary.model, summary.outcome, summary.family, summary.statistics.n_obs
                    )?;
                    for c in &summary.coefficients {
                        writeln!(
                            f,
                            "  {:<40} {:>9.4} ({:.4}, {:.4}) p = {:.4}",
                            c.term, c.estimate, c.ci_lower, c.ci_upper, c.p_value
                        )?;
                    }
                    if let Some(r2) = summary.statistics.r_squared {
                        writeln!(f, "  R^2 = {r2:.4}")?;
                    }
                }
                ModelOutcome::Failed { model, reason } => {
                    writeln!(f, "{model}: NR ({reason})")?;
                }
            }
        }
        Ok(())
    }
}

/// Fits model specifications with a [`GlmSolver`]
#[derive(Debug, Clone)]
pub struct RegressionRunner<S: GlmSolver = IrlsSolver> {
    solver: S,
    reference_overrides: BTreeMap<Variable, String>,
    show_progress: bool,
}

impl RegressionRunner<IrlsSolver> {
    /// Create a runner with the default IRLS solver
    #[must_use]
    pub fn new() -> Self {
        Self::with_solver(IrlsSolver::default())
    }
}

impl Default for RegressionRunner<IrlsSolver> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: GlmSolver> RegressionRunner<S> {
    /// Create a runner with a custom solver
    pub fn with_solver(solver: S) -> Self {
        Self {
            solver,
            reference_overrides: BTreeMap::new(),
            show_progress: false,
        }
    }

    /// Replace default reference levels for dummy coding
    #[must_use]
    pub fn with_reference_overrides(mut self, overrides: BTreeMap<Variable, String>) -> Self {
        self.reference_overrides = overrides;
        self
    }

    /// Draw a progress bar while fitting several models
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    fn try_fit(&self, records: &[SubjectRecord], spec: &ModelSpec) -> Result<ModelSummary, FitError> {
        spec.family.validate()?;
        let design = DesignMatrix::build(records, spec, &self.reference_overrides)?;
        debug!(
            "{}: {} rows, {} columns, {} dropped",
            spec.name,
            design.n_obs(),
            design.columns.len(),
            design.n_dropped
        );
        let fit = self.solver.fit(&design, spec.family)?;
        let coefficients = fit.coefficients(&design.columns, spec.family)?;

        Ok(ModelSummary {
            model: spec.name.clone(),
            outcome: spec.outcome,
            family: spec.family,
            coefficients,
            statistics: FitStatistics {
                n_obs: design.n_obs(),
                weighted_n: design.weighted_n(),
                n_dropped: design.n_dropped,
                df_resid: fit.df_resid,
                iterations: fit.iterations,
                deviance: fit.deviance,
                pearson_chi2: fit.pearson_chi2,
                r_squared: fit.r_squared,
                adj_r_squared: fit.adj_r_squared,
                f_statistic: fit.f_statistic,
                f_p_value: fit.f_p_value,
            },
        })
    }

    /// Fit one model; failures become [`ModelOutcome::Failed`]
    pub fn fit(&self, records: &[SubjectRecord], spec: &ModelSpec) -> ModelOutcome {
        match self.try_fit(records, spec) {
            Ok(summary) => ModelOutcome::Fitted(summary),
            Err(error) => {
                warn!("Model '{}' ({}) not estimated: {error}", spec.name, spec.outcome);
                ModelOutcome::Failed {
                    model: spec.name.clone(),
                    reason: error.to_string(),
                }
            }
        }
    }

    /// Fit several models in parallel, keeping their order
    pub fn fit_all(&self, records: &[SubjectRecord], specs: &[ModelSpec]) -> Vec<ModelOutcome> {
        let pb = create_model_progress_bar(specs.len() as u64, Some("Fitting models"), self.show_progress);
        let outcomes: Vec<ModelOutcome> = specs
            .par_iter()
            .progress_with(pb.clone())
            .map(|spec| self.fit(records, spec))
            .collect();
        finish_progress_bar(&pb, Some("Models fitted"));
        outcomes
    }

    /// Fit every exposure under every adjustment set
    ///
    /// Records come out exposure-major, then in adjustment-set order.
    pub fn exposure_grid(
        &self,
        records: &[SubjectRecord],
        grid: &ExposureGrid,
    ) -> Vec<ModelResultRecord> {
        let specs: Vec<(ModelSpec, _)> = grid
            .exposures
            .iter()
            .flat_map(|exposure| {
                grid.adjustment_sets
                    .iter()
                    .map(move |set| (grid.spec(*exposure, set), *exposure))
            })
            .collect();
        let models: Vec<ModelSpec> = specs.iter().map(|(spec, _)| spec.clone()).collect();
        let outcomes = self.fit_all(records, &models);

        specs
            .iter()
            .zip(&outcomes)
            .flat_map(|((spec, exposure), outcome)| {
                ModelResultRecord::from_outcome(outcome, spec, *exposure)
            })
            .collect()
    }

    /// Fit the grid and the individual models of a plan
    pub fn run_plan(&self, records: &[SubjectRecord], plan: &ModelPlan) -> RegressionReport {
        let start = Instant::now();
        log_operation_start("Fitting model plan on", &format!("{} records", records.len()));

        let grid = plan
            .grid
            .as_ref()
            .map(|grid| self.exposure_grid(records, grid))
            .unwrap_or_default();
        let models = self.fit_all(records, &plan.models);
        let model_results = plan
            .models
            .iter()
            .zip(&models)
            .filter_map(|(spec, outcome)| {
                spec.exposure()
                    .map(|exposure| ModelResultRecord::from_outcome(outcome, spec, exposure))
            })
            .flatten()
            .collect();

        let report = RegressionReport {
            grid,
            models,
            model_results,
        };
        log_operation_complete(
            "fitted",
            "model plan",
            report.grid.len() + report.models.len(),
            Some(start.elapsed()),
        );
        report
    }
}
