//! Cohort assembly through ordered exclusion stages
//!
//! The filter runs its stages strictly in order and records a checkpoint
//! after each one, so the flow counts can only stay level or fall.

pub mod flow;
pub mod outliers;
pub mod stages;

use std::time::Instant;

use log::info;
use rayon::prelude::*;

use crate::error::{PipelineError, Result};
use crate::models::{SubjectRecord, Variable, VariableKind};
use crate::schema::RawField;
use crate::utils::logging::{log_operation_complete, log_operation_start, log_recovery};

pub use flow::{Checkpoint, CohortFlow};
pub use outliers::{OutlierScreen, OutlierStatistics};
pub use stages::{DEFAULT_Z_THRESHOLD, ExclusionStage, FilterCriteria};

/// Records that passed every stage, with the flow that produced them
#[derive(Debug, Clone)]
pub struct CohortResult {
    /// Analytic sample
    pub records: Vec<SubjectRecord>,
    /// Checkpoints per stage
    pub flow: CohortFlow,
}

/// Ordered exclusion pipeline
#[derive(Debug, Clone)]
pub struct CohortFilter {
    stages: Vec<ExclusionStage>,
    unavailable: Vec<RawField>,
}

impl CohortFilter {
    /// Create a filter after checking the stage order
    ///
    /// The first stage must be [`ExclusionStage::TotalPopulation`], and an
    /// outlier rejection stage must follow a complete-case stage so its
    /// statistics are computed on complete data. Outlier stages screen
    /// continuous variables with a positive threshold.
    pub fn new(stages: Vec<ExclusionStage>) -> Result<Self> {
        match stages.first() {
            Some(ExclusionStage::TotalPopulation) => {}
            _ => {
                return Err(PipelineError::InvalidConfig(
                    "the first exclusion stage must be the total population".to_string(),
                ));
            }
        }

        let mut complete_case_seen = false;
        for stage in &stages {
            match stage {
                ExclusionStage::CompleteCase { .. } => complete_case_seen = true,
                ExclusionStage::OutlierRejection {
                    variables,
                    z_threshold,
                } => {
                    if !complete_case_seen {
                        return Err(PipelineError::InvalidConfig(
                            "outlier rejection must come after a complete-case stage".to_string(),
                        ));
                    }
                    check_screen(variables, *z_threshold)?;
                }
                ExclusionStage::OutlierMasking {
                    variables,
                    z_threshold,
                } => check_screen(variables, *z_threshold)?,
                _ => {}
            }
        }

        Ok(Self {
            stages,
            unavailable: Vec::new(),
        })
    }

    /// Declare raw fields that are absent from the whole pool
    #[must_use]
    pub fn with_unavailable_fields(mut self, unavailable: Vec<RawField>) -> Self {
        self.unavailable = unavailable;
        self
    }

    /// Configured stages
    #[must_use]
    pub fn stages(&self) -> &[ExclusionStage] {
        &self.stages
    }

    /// Run every stage in order
    pub fn apply(&self, records: Vec<SubjectRecord>) -> CohortResult {
        let start = Instant::now();
        log_operation_start("Applying exclusion stages to", &format!("{} records", records.len()));

        let mut records = records;
        let mut flow = CohortFlow::new();

        for stage in &self.stages {
            let name = stage.name();
            let Some(effective) = stage.restricted_to_available(&self.unavailable) else {
                log_recovery(
                    &name,
                    "source fields are absent from every cycle, stage passed through",
                );
                flow.record(name, records.len(), true);
                continue;
            };

            let missing = stage.unavailable_variables(&self.unavailable);
            if !missing.is_empty() {
                log_recovery(
                    &name,
                    &format!(
                        "not applied to unavailable variables: {}",
                        missing
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                );
            }

            records = match &effective {
                ExclusionStage::TotalPopulation => records,
                sample_stage if sample_stage.is_sample_level() => {
                    screen_sample(sample_stage, records, &mut flow)
                }
                row_stage => records
                    .into_par_iter()
                    .filter(|record| row_stage.meets_criteria(record))
                    .collect(),
            };

            info!("{name}: {} records", records.len());
            flow.record(name, records.len(), false);
        }

        log_operation_complete("applied", "exclusion stages", records.len(), Some(start.elapsed()));
        CohortResult { records, flow }
    }
}

fn check_screen(variables: &[Variable], z_threshold: f64) -> Result<()> {
    if z_threshold.is_nan() || z_threshold <= 0.0 {
        return Err(PipelineError::InvalidConfig(
            "outlier z threshold must be positive".to_string(),
        ));
    }
    if let Some(variable) = variables
        .iter()
        .find(|variable| variable.kind() != VariableKind::Continuous)
    {
        return Err(PipelineError::InvalidConfig(format!(
            "outlier screening needs continuous variables, '{variable}' is not"
        )));
    }
    Ok(())
}

/// Run an outlier stage, appending its statistics to the flow
fn screen_sample(
    stage: &ExclusionStage,
    records: Vec<SubjectRecord>,
    flow: &mut CohortFlow,
) -> Vec<SubjectRecord> {
    let (records, statistics) = match stage {
        ExclusionStage::OutlierRejection {
            variables,
            z_threshold,
        } => OutlierScreen::fit(&records, variables, *z_threshold).apply(records),
        ExclusionStage::OutlierMasking {
            variables,
            z_threshold,
        } => OutlierScreen::fit(&records, variables, *z_threshold).mask(records),
        _ => return records,
    };
    flow.outlier_statistics.extend(statistics);
    records
}
