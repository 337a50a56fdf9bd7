//! A Rust library for pooling NHANES survey cycles into an analytic cohort,
//! with STROBE flow accounting, survey-weighted descriptive statistics and
//! weighted regression.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod schema;
pub mod utils;

// Re-export the most common types for easier use
// Core types
pub use config::{DeriveConfig, LoaderConfig, OutputFormat, StudyConfig};
pub use error::{PipelineError, Result};
pub use pipeline::{AnalyticCohort, Pipeline, StudyReport};

// Data model
pub use models::{RawRecord, SubjectRecord, Value, Variable, VariableKind};
pub use schema::{Cycle, Domain, RawField};

// Stages
pub use algorithm::cohort::{CohortFilter, CohortFlow, ExclusionStage};
pub use algorithm::derive::{derive_all, derive_record};
pub use algorithm::descriptive::{DescriptivePlan, DescriptiveReport, DescriptiveTable};
pub use algorithm::merge::{CycleMerger, PooledTable};
pub use algorithm::periodontitis::{PerioStatus, classify_periodontitis};
pub use algorithm::regression::{
    Family, ModelOutcome, ModelPlan, ModelResultRecord, ModelSpec, RegressionRunner, Term,
};
pub use loader::TableLoader;

// Arrow types
pub use arrow::record_batch::RecordBatch;
