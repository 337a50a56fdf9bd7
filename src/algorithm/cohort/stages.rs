//! Exclusion stages
//!
//! Each stage is a named inclusion criterion. Row stages decide on one record
//! at a time through [`FilterCriteria`]. Outlier rejection and outlier masking
//! need statistics of the whole surviving sample and are applied by the
//! cohort filter; masking nulls extreme values and keeps every row.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::types::Sex;
use crate::models::{SubjectRecord, Variable};
use crate::schema::RawField;

/// Defines a criterion for filtering records
pub trait FilterCriteria<T> {
    /// Determine if an entity meets the filter criteria
    fn meets_criteria(&self, entity: &T) -> bool;
}

/// Default |z| above which a value counts as an outlier
pub const DEFAULT_Z_THRESHOLD: f64 = 4.0;

fn default_z_threshold() -> f64 {
    DEFAULT_Z_THRESHOLD
}

/// One named stage of the exclusion pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ExclusionStage {
    /// Baseline count, excludes nothing
    TotalPopulation,
    /// Age at or above a threshold
    MinimumAge {
        /// Minimum age in years (inclusive)
        years: f64,
    },
    /// One sex only
    Sex {
        /// Sex to keep
        sex: Sex,
    },
    /// Complete periodontal exam (`OHDDESTS` = 1, or `OHDEXSTS` = 1)
    PerioExamComplete,
    /// Reliable first-day dietary recall (`DR1DRSTZ` = 1)
    DietRecallReliable,
    /// Outcome variable observed
    OutcomeAvailable {
        /// Outcome that must be present
        outcome: Variable,
    },
    /// Every listed variable observed
    CompleteCase {
        /// Variables that must be present
        variables: Vec<Variable>,
    },
    /// Reject rows with |z| above the threshold on any monitored variable
    OutlierRejection {
        /// Monitored continuous variables
        variables: Vec<Variable>,
        /// |z| threshold
        #[serde(default = "default_z_threshold")]
        z_threshold: f64,
    },
    /// Set values with |z| above the threshold to missing, keeping the rows
    OutlierMasking {
        /// Monitored continuous variables
        variables: Vec<Variable>,
        /// |z| threshold
        #[serde(default = "default_z_threshold")]
        z_threshold: f64,
    },
}

impl ExclusionStage {
    /// Stage name used in the flow record
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::TotalPopulation => "Total population".to_string(),
            Self::MinimumAge { years } => format!("Age >= {years}"),
            Self::Sex { sex } => format!("{sex} only"),
            Self::PerioExamComplete => "Periodontal exam complete".to_string(),
            Self::DietRecallReliable => "Reliable dietary recall".to_string(),
            Self::OutcomeAvailable { outcome } => format!("{} available", outcome.label()),
            Self::CompleteCase { .. } => "Complete covariates".to_string(),
            Self::OutlierRejection { z_threshold, .. } => {
                format!("No outliers (|z| > {z_threshold})")
            }
            Self::OutlierMasking { z_threshold, .. } => {
                format!("Outlier values masked (|z| > {z_threshold})")
            }
        }
    }

    /// Whether the stage works on sample statistics instead of single rows
    #[must_use]
    pub const fn is_sample_level(&self) -> bool {
        matches!(
            self,
            Self::OutlierRejection { .. } | Self::OutlierMasking { .. }
        )
    }

    /// The stage as it can run when some raw fields are absent from the pool
    ///
    /// Returns `None` when the stage has nothing left to check. Variable
    /// lists are narrowed to the variables that can still be computed.
    #[must_use]
    pub fn restricted_to_available(&self, unavailable: &[RawField]) -> Option<Self> {
        let field_available = |field: RawField| !unavailable.contains(&field);
        match self {
            Self::TotalPopulation => Some(self.clone()),
            Self::MinimumAge { .. } => field_available(RawField::Age).then(|| self.clone()),
            Self::Sex { .. } => field_available(RawField::Sex).then(|| self.clone()),
            Self::PerioExamComplete => {
                field_available(RawField::PerioExamStatus).then(|| self.clone())
            }
            Self::DietRecallReliable => {
                field_available(RawField::DietRecallStatus).then(|| self.clone())
            }
            Self::OutcomeAvailable { outcome } => {
                outcome.is_available(unavailable).then(|| self.clone())
            }
            Self::CompleteCase { variables } => {
                let variables = available(variables, unavailable);
                (!variables.is_empty()).then_some(Self::CompleteCase { variables })
            }
            Self::OutlierRejection {
                variables,
                z_threshold,
            } => {
                let variables = available(variables, unavailable);
                (!variables.is_empty()).then_some(Self::OutlierRejection {
                    variables,
                    z_threshold: *z_threshold,
                })
            }
            Self::OutlierMasking {
                variables,
                z_threshold,
            } => {
                let variables = available(variables, unavailable);
                (!variables.is_empty()).then_some(Self::OutlierMasking {
                    variables,
                    z_threshold: *z_threshold,
                })
            }
        }
    }

    /// Variables of the stage that cannot be computed from the pool
    #[must_use]
    pub fn unavailable_variables(&self, unavailable: &[RawField]) -> Vec<Variable> {
        match self {
            Self::OutcomeAvailable { outcome } => vec![*outcome],
            Self::CompleteCase { variables }
            | Self::OutlierRejection { variables, .. }
            | Self::OutlierMasking { variables, .. } => variables.clone(),
            _ => Vec::new(),
        }
        .into_iter()
        .filter(|variable| !variable.is_available(unavailable))
        .collect()
    }
}

fn available(variables: &[Variable], unavailable: &[RawField]) -> Vec<Variable> {
    variables
        .iter()
        .copied()
        .filter(|variable| variable.is_available(unavailable))
        .collect()
}

impl FilterCriteria<SubjectRecord> for ExclusionStage {
    /// Row-level decision; sample-level stages let every row through here
    fn meets_criteria(&self, record: &SubjectRecord) -> bool {
        match self {
            Self::TotalPopulation
            | Self::OutlierRejection { .. }
            | Self::OutlierMasking { .. } => true,
            Self::MinimumAge { years } => record.derived.age.is_some_and(|age| age >= *years),
            Self::Sex { sex } => record.derived.sex == Some(*sex),
            Self::PerioExamComplete => record.raw.code(RawField::PerioExamStatus) == Some(1),
            Self::DietRecallReliable => record.raw.code(RawField::DietRecallStatus) == Some(1),
            Self::OutcomeAvailable { outcome } => !record.is_missing(*outcome),
            Self::CompleteCase { variables } => {
                variables.iter().all(|variable| !record.is_missing(*variable))
            }
        }
    }
}

impl fmt::Display for ExclusionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
