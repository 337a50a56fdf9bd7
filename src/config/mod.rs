//! Configuration for the cohort pipeline.
//!
//! Every component receives its configuration explicitly at construction.
//! The structs deserialize from JSON so a run can be described in a file, and
//! the [`presets`] module builds the two bundled studies.

pub mod presets;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::algorithm::cohort::{CohortFilter, ExclusionStage};
use crate::algorithm::descriptive::DescriptivePlan;
use crate::algorithm::regression::{Family, ModelPlan, SensitivityPlan};
use crate::error::util::safe_read_bytes;
use crate::error::{PipelineError, Result};
use crate::schema::{Cycle, Domain};

/// Configuration for the table loader
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Directory holding the `{DOMAIN}_{CYCLE}` tables
    pub data_dir: PathBuf,
    /// File extension of the tables, without the dot
    pub extension: String,
    /// Fail when a table lacks a declared column instead of warning
    pub strict_schema: bool,
    /// Batch size used by the CSV reader
    pub batch_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            extension: "csv".to_string(),
            strict_schema: false,
            batch_size: 8192,
        }
    }
}

impl LoaderConfig {
    /// Loader configuration for a data directory with default settings
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }
}

/// Configuration for variable derivation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeriveConfig {
    /// Number of cycles in the pool; the pipeline sets it from the pooled table
    pub n_cycles: usize,
    /// Count borderline diabetes (`DIQ010` = 3) as diabetes
    pub borderline_diabetes_as_yes: bool,
    /// Upper cap of the income to poverty ratio
    pub poverty_ratio_cap: f64,
}

impl Default for DeriveConfig {
    fn default() -> Self {
        Self {
            n_cycles: 1,
            borderline_diabetes_as_yes: false,
            poverty_ratio_cap: 5.0,
        }
    }
}

impl DeriveConfig {
    /// Copy of this configuration for a pool of `n_cycles` cycles
    #[must_use]
    pub fn with_cycles(&self, n_cycles: usize) -> Self {
        Self {
            n_cycles,
            ..self.clone()
        }
    }
}

/// Format of the analytic table written at the end of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Comma-separated text with a header row
    #[default]
    Csv,
    /// Apache Parquet
    Parquet,
}

/// Complete description of one study run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Study name used in logs and output metadata
    pub name: String,
    /// Table loader settings
    pub loader: LoaderConfig,
    /// Cycles to pool, in order
    pub cycles: Vec<Cycle>,
    /// Domains to load per cycle; must include `DEMO`
    pub domains: Vec<Domain>,
    /// Variable derivation settings
    pub derive: DeriveConfig,
    /// Ordered exclusion stages
    pub stages: Vec<ExclusionStage>,
    /// Descriptive tables to compute
    pub descriptive: DescriptivePlan,
    /// Regression models to fit
    pub models: ModelPlan,
    /// Sensitivity analyses, if any
    pub sensitivity: Option<SensitivityPlan>,
    /// Worker threads for parallel stages; defaults to the number of CPUs
    pub threads: Option<usize>,
    /// Directory for output artifacts; nothing is written when unset
    pub output_dir: Option<PathBuf>,
    /// Format of the analytic table
    pub output_format: OutputFormat,
    /// Draw progress bars while fitting models
    pub show_progress: bool,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            name: "study".to_string(),
            loader: LoaderConfig::default(),
            cycles: Vec::new(),
            domains: vec![Domain::Demo],
            derive: DeriveConfig::default(),
            stages: vec![ExclusionStage::TotalPopulation],
            descriptive: DescriptivePlan::default(),
            models: ModelPlan::default(),
            sensitivity: None,
            threads: None,
            output_dir: None,
            output_format: OutputFormat::default(),
            show_progress: false,
        }
    }
}

impl StudyConfig {
    /// Load a study configuration from a JSON file and validate it
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = safe_read_bytes(path, "study configuration")?;
        let config: Self = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration describes a runnable study
    pub fn validate(&self) -> Result<()> {
        if self.cycles.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "at least one cycle must be configured".to_string(),
            ));
        }
        if !self.domains.contains(&Domain::Demo) {
            return Err(PipelineError::InvalidConfig(
                "the DEMO domain is mandatory".to_string(),
            ));
        }
        if self.threads == Some(0) {
            return Err(PipelineError::InvalidConfig(
                "threads must be at least 1".to_string(),
            ));
        }
        let cap = self.derive.poverty_ratio_cap;
        if cap.is_nan() || cap <= 0.0 {
            return Err(PipelineError::InvalidConfig(
                "poverty ratio cap must be positive".to_string(),
            ));
        }
        CohortFilter::new(self.stages.clone())?;

        let sensitivity_family = self.sensitivity.as_ref().map(|plan| Family::NegativeBinomial {
            alpha: plan.nb_alpha,
        });
        for family in self.models.families().chain(sensitivity_family) {
            family
                .validate()
                .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
        }
        Ok(())
    }

    /// Number of worker threads to use
    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get)
    }
}

impl fmt::Display for StudyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Study Configuration: {}", self.name)?;
        writeln!(f, "  Data Directory: {}", self.loader.data_dir.display())?;
        writeln!(
            f,
            "  Cycles: {}",
            self.cycles
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        )?;
        writeln!(
            f,
            "  Domains: {}",
            self.domains
                .iter()
                .map(|d| d.prefix())
                .collect::<Vec<_>>()
                .join(", ")
        )?;
        writeln!(f, "  Strict Schema: {}", self.loader.strict_schema)?;
        writeln!(
            f,
            "  Borderline Diabetes As Yes: {}",
            self.derive.borderline_diabetes_as_yes
        )?;
        writeln!(f, "  Exclusion Stages:")?;
        for stage in &self.stages {
            writeln!(f, "    - {}", stage.name())?;
        }
        if let Some(grid) = &self.models.grid {
            writeln!(
                f,
                "  Model Grid: {} exposures x {} adjustment sets",
                grid.exposures.len(),
                grid.adjustment_sets.len()
            )?;
        }
        writeln!(f, "  Models: {}", self.models.models.len())?;
        writeln!(f, "  Sensitivity Analyses: {}", self.sensitivity.is_some())?;
        writeln!(f, "  Threads: {}", self.threads())?;
        if let Some(dir) = &self.output_dir {
            writeln!(f, "  Output Directory: {}", dir.display())?;
        }
        Ok(())
    }
}
