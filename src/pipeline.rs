//! End-to-end study runs
//!
//! A [`Pipeline`] owns a validated [`StudyConfig`] and a rayon pool sized by
//! it. [`Pipeline::build_cohort`] goes from CSV tables to the analytic
//! sample; [`Pipeline::analyze`] computes descriptive tables, models and
//! sensitivity analyses over it.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use itertools::Itertools;
use log::info;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::algorithm::cohort::{CohortFilter, CohortFlow};
use crate::algorithm::derive::derive_all;
use crate::algorithm::descriptive::DescriptiveReport;
use crate::algorithm::merge::CycleMerger;
use crate::algorithm::regression::{
    RegressionReport, RegressionRunner, SensitivityReport, run_sensitivity,
};
use crate::config::StudyConfig;
use crate::error::util::validate_directory;
use crate::error::{PipelineError, Result};
use crate::loader::TableLoader;
use crate::models::{SubjectRecord, Variable, extract_records};
use crate::output::{RunMetadata, write_analytic, write_json};
use crate::schema::{Cycle, RawField};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Analytic sample with its provenance
#[derive(Debug, Clone)]
pub struct AnalyticCohort {
    /// Records that passed every exclusion stage
    pub records: Vec<SubjectRecord>,
    /// Participant flow
    pub flow: CohortFlow,
    /// Pooled cycles
    pub cycles: Vec<Cycle>,
    /// Configured cycles that could not be loaded
    pub skipped_cycles: Vec<Cycle>,
    /// Rows in the pooled table before any exclusion
    pub n_pooled: usize,
    /// Raw fields absent from every pooled cycle
    pub unavailable_fields: Vec<RawField>,
}

/// Everything computed from an analytic sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyReport {
    /// Study name
    pub study: String,
    /// Participant flow
    pub flow: CohortFlow,
    /// Descriptive tables, when planned
    pub descriptive: Option<DescriptiveReport>,
    /// Model results
    pub regression: RegressionReport,
    /// Sensitivity analyses, when planned
    pub sensitivity: Option<SensitivityReport>,
}

impl fmt::Display for StudyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Study: {}", self.study)?;
        write!(f, "{}", self.flow)?;
        if let Some(descriptive) = &self.descriptive {
            write!(f, "{descriptive}")?;
        }
        write!(f, "{}", self.regression)?;
        if let Some(sensitivity) = &self.sensitivity {
            write!(f, "{sensitivity}")?;
        }
        Ok(())
    }
}

/// Configured study ready to run
#[derive(Debug)]
pub struct Pipeline {
    config: StudyConfig,
    pool: ThreadPool,
}

impl Pipeline {
    /// Validate a configuration and build the worker pool
    pub fn new(config: StudyConfig) -> Result<Self> {
        config.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.threads())
            .build()
            .map_err(|e| PipelineError::InvalidConfig(format!("cannot build thread pool: {e}")))?;
        Ok(Self { config, pool })
    }

    /// Study configuration
    #[must_use]
    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    /// Load, merge, derive and filter the configured cycles
    pub fn build_cohort(&self) -> Result<AnalyticCohort> {
        self.pool.install(|| -> Result<AnalyticCohort> {
            let start = Instant::now();
            log_operation_start("Building cohort for", &self.config.name);
            validate_directory(&self.config.loader.data_dir, "survey tables")?;

            let loader = TableLoader::new(self.config.loader.clone());
            let merger = CycleMerger::new(
                loader,
                self.config.cycles.clone(),
                self.config.domains.clone(),
            );
            let pooled = merger.pool()?;
            let unavailable_fields = pooled.unavailable_fields();
            if !unavailable_fields.is_empty() {
                info!(
                    "{} declared fields are absent from every cycle",
                    unavailable_fields.len()
                );
            }

            let raw = extract_records(&pooled)?;
            let derive = self.config.derive.with_cycles(pooled.n_cycles());
            let records = derive_all(raw, &derive);

            let filter = CohortFilter::new(self.config.stages.clone())?
                .with_unavailable_fields(unavailable_fields.clone());
            let result = filter.apply(records);

            log_operation_complete(
                "built",
                "analytic cohort",
                result.records.len(),
                Some(start.elapsed()),
            );
            Ok(AnalyticCohort {
                records: result.records,
                flow: result.flow,
                n_pooled: pooled.num_rows(),
                cycles: pooled.cycles,
                skipped_cycles: pooled.skipped_cycles,
                unavailable_fields,
            })
        })
    }

    /// Compute the configured descriptive tables, models and sensitivity
    /// analyses
    pub fn analyze(&self, cohort: &AnalyticCohort) -> StudyReport {
        self.pool.install(|| {
            let records = &cohort.records;
            let descriptive = (!self.config.descriptive.is_empty())
                .then(|| DescriptiveReport::build(records, &self.config.descriptive));

            let runner = RegressionRunner::new()
                .with_reference_overrides(self.config.models.reference_overrides.clone())
                .with_progress(self.config.show_progress);
            let regression = runner.run_plan(records, &self.config.models);
            let sensitivity = self
                .config
                .sensitivity
                .as_ref()
                .map(|plan| run_sensitivity(&runner, records, plan));

            StudyReport {
                study: self.config.name.clone(),
                flow: cohort.flow.clone(),
                descriptive,
                regression,
                sensitivity,
            }
        })
    }

    /// Build the cohort, analyze it and write artifacts to the output
    /// directory when one is configured
    pub fn run(&self) -> Result<StudyReport> {
        let cohort = self.build_cohort()?;
        let report = self.analyze(&cohort);
        if let Some(dir) = &self.config.output_dir {
            self.write_outputs(&cohort, &report, dir)?;
        }
        Ok(report)
    }

    /// Write the analytic table and JSON results into a directory
    pub fn write_outputs(
        &self,
        cohort: &AnalyticCohort,
        report: &StudyReport,
        dir: &Path,
    ) -> Result<()> {
        let analytic = write_analytic(&cohort.records, dir, self.config.output_format)?;
        write_json(&report.flow, &dir.join("flow.json"))?;
        if let Some(descriptive) = &report.descriptive {
            write_json(descriptive, &dir.join("descriptive.json"))?;
        }
        write_json(&report.regression, &dir.join("models.json"))?;
        if let Some(sensitivity) = &report.sensitivity {
            write_json(sensitivity, &dir.join("sensitivity.json"))?;
        }

        let metadata = RunMetadata {
            study: self.config.name.clone(),
            generated_at: chrono::Utc::now(),
            cycles: cohort.cycles.clone(),
            skipped_cycles: cohort.skipped_cycles.clone(),
            n_pooled: cohort.n_pooled,
            n_analytic: cohort.records.len(),
            unavailable_fields: cohort.unavailable_fields.clone(),
            missing_percent: RunMetadata::missing_percentages(
                &cohort.records,
                &analysis_variables(&self.config),
            ),
        };
        write_json(&metadata, &dir.join("metadata.json"))?;
        info!("Wrote study outputs next to {}", analytic.display());
        Ok(())
    }
}

/// Every variable the configuration describes or models, in first-use order
fn analysis_variables(config: &StudyConfig) -> Vec<Variable> {
    let plan = &config.descriptive;
    let mut variables: Vec<Variable> = plan
        .stratify_by
        .into_iter()
        .chain(plan.continuous.iter().copied())
        .chain(plan.categorical.iter().copied())
        .chain(plan.outcomes.iter().map(|o| o.variable))
        .collect();
    if let Some(grid) = &config.models.grid {
        variables.push(grid.outcome);
        variables.extend(grid.exposures.iter().map(|t| t.variable()));
        for set in &grid.adjustment_sets {
            variables.extend(set.covariates.iter().map(|t| t.variable()));
        }
    }
    for spec in &config.models.models {
        variables.extend(spec.variables());
    }
    variables.into_iter().unique().collect()
}
