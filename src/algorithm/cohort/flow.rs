//! Participant flow accounting
//!
//! The flow is an append-only list of (stage, count) checkpoints in stage
//! order, together with anything needed to audit how the counts came about.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::algorithm::cohort::outliers::OutlierStatistics;

/// Count of records remaining after one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Stage name
    pub stage: String,
    /// Records remaining after the stage
    pub count: usize,
    /// Records removed by the stage
    pub excluded: usize,
    /// The stage could not run on this pool and removed nothing
    pub skipped: bool,
}

/// Ordered checkpoints of an exclusion pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortFlow {
    checkpoints: Vec<Checkpoint>,
    /// Statistics of every outlier stage that ran, in stage order
    pub outlier_statistics: Vec<OutlierStatistics>,
}

impl CohortFlow {
    /// Create an empty flow
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a checkpoint after a stage
    pub fn record(&mut self, stage: impl Into<String>, count: usize, skipped: bool) {
        let excluded = self
            .checkpoints
            .last()
            .map_or(0, |previous| previous.count.saturating_sub(count));
        self.checkpoints.push(Checkpoint {
            stage: stage.into(),
            count,
            excluded,
            skipped,
        });
    }

    /// Checkpoints in stage order
    #[must_use]
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// Count at the first checkpoint
    #[must_use]
    pub fn initial_count(&self) -> usize {
        self.checkpoints.first().map_or(0, |c| c.count)
    }

    /// Count at the last checkpoint
    #[must_use]
    pub fn final_count(&self) -> usize {
        self.checkpoints.last().map_or(0, |c| c.count)
    }

    /// Count after a named stage
    #[must_use]
    pub fn count_after(&self, stage: &str) -> Option<usize> {
        self.checkpoints
            .iter()
            .find(|c| c.stage == stage)
            .map(|c| c.count)
    }

    /// Whether counts never increase from one stage to the next
    #[must_use]
    pub fn is_monotonic(&self) -> bool {
        self.checkpoints
            .windows(2)
            .all(|pair| pair[1].count <= pair[0].count)
    }
}

impl fmt::Display for CohortFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Participant Flow:")?;
        for checkpoint in &self.checkpoints {
            write!(f, "  {:<40} n = {:>7}", checkpoint.stage, checkpoint.count)?;
            if checkpoint.excluded > 0 {
                write!(f, "  (excluded {})", checkpoint.excluded)?;
            }
            if checkpoint.skipped {
                write!(f, "  [skipped]")?;
            }
            writeln!(f)?;
        }
        for stats in &self.outlier_statistics {
            writeln!(
                f,
                "  Outlier screen {}: n = {}, mean = {}, sd = {}, {} = {}",
                stats.variable,
                stats.n,
                stats.mean.map_or_else(|| "NA".to_string(), |m| format!("{m:.2}")),
                stats.sd.map_or_else(|| "NA".to_string(), |s| format!("{s:.2}")),
                if stats.masked { "masked" } else { "rejected" },
                stats.rejected
            )?;
        }
        Ok(())
    }
}
