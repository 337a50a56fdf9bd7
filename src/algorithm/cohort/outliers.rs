//! Sample-level outlier screening
//!
//! Mean and sample standard deviation are computed once per monitored
//! variable over the rows that reach the stage. A value is an outlier when it
//! lies more than `z_threshold` standard deviations from the mean; the screen
//! either rejects rows holding an outlier or masks the outlying values. A
//! variable with fewer than two values or zero spread flags nothing.

use serde::{Deserialize, Serialize};

use crate::algorithm::cohort::stages::FilterCriteria;
use crate::models::{SubjectRecord, Variable};

/// Statistics used to screen one variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierStatistics {
    /// Monitored variable
    pub variable: Variable,
    /// Number of observed values
    pub n: usize,
    /// Mean of the observed values
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1 denominator)
    pub sd: Option<f64>,
    /// Values that exceeded the threshold
    pub rejected: usize,
    /// Outlying values were set to missing instead of rejecting rows
    #[serde(default)]
    pub masked: bool,
}

impl OutlierStatistics {
    /// Compute mean and sample SD of a variable over the records
    #[must_use]
    pub fn compute(records: &[SubjectRecord], variable: Variable) -> Self {
        let values: Vec<f64> = records
            .iter()
            .filter_map(|record| record.value(variable).as_number())
            .collect();
        let n = values.len();
        if n == 0 {
            return Self {
                variable,
                n,
                mean: None,
                sd: None,
                rejected: 0,
                masked: false,
            };
        }

        let mean = values.iter().sum::<f64>() / n as f64;
        let sd = (n >= 2).then(|| {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        });
        Self {
            variable,
            n,
            mean: Some(mean),
            sd,
            rejected: 0,
            masked: false,
        }
    }

    /// |z| of a value, when the variable can be screened
    #[must_use]
    pub fn z_score(&self, value: f64) -> Option<f64> {
        let mean = self.mean?;
        let sd = self.sd.filter(|sd| *sd > 0.0 && sd.is_finite())?;
        Some(((value - mean) / sd).abs())
    }
}

/// Outlier screen over several variables with a shared threshold
#[derive(Debug, Clone)]
pub struct OutlierScreen {
    /// Per-variable statistics
    pub statistics: Vec<OutlierStatistics>,
    /// |z| threshold
    pub z_threshold: f64,
}

impl OutlierScreen {
    /// Compute the screen over the records that reach the stage
    #[must_use]
    pub fn fit(records: &[SubjectRecord], variables: &[Variable], z_threshold: f64) -> Self {
        Self {
            statistics: variables
                .iter()
                .map(|variable| OutlierStatistics::compute(records, *variable))
                .collect(),
            z_threshold,
        }
    }

    fn exceeds(&self, stats: &OutlierStatistics, record: &SubjectRecord) -> bool {
        record
            .value(stats.variable)
            .as_number()
            .and_then(|value| stats.z_score(value))
            .is_some_and(|z| z > self.z_threshold)
    }

    /// Split records into kept rows, counting rejections per variable
    #[must_use]
    pub fn apply(mut self, records: Vec<SubjectRecord>) -> (Vec<SubjectRecord>, Vec<OutlierStatistics>) {
        let mut rejected = vec![0usize; self.statistics.len()];
        let kept: Vec<SubjectRecord> = records
            .into_iter()
            .filter(|record| {
                let mut keep = true;
                for (idx, stats) in self.statistics.iter().enumerate() {
                    if self.exceeds(stats, record) {
                        rejected[idx] += 1;
                        keep = false;
                    }
                }
                keep
            })
            .collect();

        for (stats, count) in self.statistics.iter_mut().zip(rejected) {
            stats.rejected = count;
        }
        (kept, self.statistics)
    }

    /// Set outlying values to missing, keeping every record
    ///
    /// All statistics are computed before any value is masked, so masking one
    /// variable never shifts the screen of another.
    #[must_use]
    pub fn mask(mut self, records: Vec<SubjectRecord>) -> (Vec<SubjectRecord>, Vec<OutlierStatistics>) {
        let mut masked = vec![0usize; self.statistics.len()];
        let records: Vec<SubjectRecord> = records
            .into_iter()
            .map(|mut record| {
                for (idx, stats) in self.statistics.iter().enumerate() {
                    if self.exceeds(stats, &record) && record.clear(stats.variable) {
                        masked[idx] += 1;
                    }
                }
                record
            })
            .collect();

        for (stats, count) in self.statistics.iter_mut().zip(masked) {
            stats.rejected = count;
            stats.masked = true;
        }
        (records, self.statistics)
    }
}

impl FilterCriteria<SubjectRecord> for OutlierScreen {
    fn meets_criteria(&self, record: &SubjectRecord) -> bool {
        !self
            .statistics
            .iter()
            .any(|stats| self.exceeds(stats, record))
    }
}
