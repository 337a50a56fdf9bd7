//! Descriptive tables
//!
//! A [`DescriptiveTable`] has an overall column plus one column per level of
//! the stratifying variable. Records whose stratum is missing only count
//! towards the overall column.

use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::algorithm::descriptive::WeightedSample;
use crate::models::{SubjectRecord, Variable, VariableKind};

/// Label of the unstratified column
pub const OVERALL: &str = "Overall";

/// Weighted summary of a continuous variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousSummary {
    /// Summarized variable
    pub variable: Variable,
    /// Observations with a value and a positive weight
    pub n: usize,
    /// Weighted mean
    pub mean: Option<f64>,
    /// Weighted standard deviation
    pub sd: Option<f64>,
    /// Weighted median
    pub median: Option<f64>,
    /// Weighted 25th percentile
    pub q1: Option<f64>,
    /// Weighted 75th percentile
    pub q3: Option<f64>,
}

impl ContinuousSummary {
    /// Summarize a variable over the records, weighted by the pooled weight
    #[must_use]
    pub fn compute(records: &[SubjectRecord], variable: Variable) -> Self {
        let sample = WeightedSample::from_pairs(
            records
                .iter()
                .map(|record| (record.value(variable).as_number(), record.weight())),
        );
        Self {
            variable,
            n: sample.len(),
            mean: sample.mean(),
            sd: sample.sd(),
            median: sample.percentile(50.0),
            q1: sample.percentile(25.0),
            q3: sample.percentile(75.0),
        }
    }
}

/// Count and weighted percentage of one level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSummary {
    /// Level label
    pub level: String,
    /// Unweighted count
    pub n: usize,
    /// Weighted percentage of the observed total
    pub percent: Option<f64>,
}

/// Weighted distribution of a categorical or binary variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalSummary {
    /// Summarized variable
    pub variable: Variable,
    /// Every declared level, in declaration order
    pub levels: Vec<LevelSummary>,
    /// Records without an observed level
    pub n_missing: usize,
}

impl CategoricalSummary {
    /// Summarize a variable over the records, weighted by the pooled weight
    #[must_use]
    pub fn compute(records: &[SubjectRecord], variable: Variable) -> Self {
        let declared = variable.levels();
        let mut counts = vec![0usize; declared.len()];
        let mut weights = vec![0.0f64; declared.len()];
        let mut n_missing = 0;

        for record in records {
            let Some(level) = record.level(variable) else {
                n_missing += 1;
                continue;
            };
            let Some(idx) = declared.iter().position(|declared| *declared == level) else {
                n_missing += 1;
                continue;
            };
            counts[idx] += 1;
            if let Some(weight) = record.weight().filter(|w| w.is_finite() && *w > 0.0) {
                weights[idx] += weight;
            }
        }

        let total: f64 = weights.iter().sum();
        let levels = declared
            .iter()
            .zip(counts.into_iter().zip(weights))
            .map(|(level, (n, weight))| LevelSummary {
                level: (*level).to_string(),
                n,
                percent: (total > 0.0).then(|| weight / total * 100.0),
            })
            .collect();

        Self {
            variable,
            levels,
            n_missing,
        }
    }

    /// Summary of one level by label
    #[must_use]
    pub fn level(&self, label: &str) -> Option<&LevelSummary> {
        self.levels.iter().find(|level| level.level == label)
    }
}

/// Outcome dichotomized at a threshold, e.g. 14 or more unhealthy days
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeThreshold {
    /// Continuous outcome
    pub variable: Variable,
    /// Values at or above this count as the high group
    pub threshold: f64,
}

impl OutcomeThreshold {
    /// Create an outcome threshold
    #[must_use]
    pub const fn new(variable: Variable, threshold: f64) -> Self {
        Self {
            variable,
            threshold,
        }
    }
}

/// Summary of an outcome plus the share at or above its threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    /// Outcome and threshold
    pub outcome: OutcomeThreshold,
    /// Continuous summary of the outcome
    pub summary: ContinuousSummary,
    /// Observations with no days (value of zero)
    pub n_zero: usize,
    /// Observations at or above the threshold
    pub n_at_or_above: usize,
    /// Weighted percentage at or above the threshold
    pub percent_at_or_above: Option<f64>,
}

impl OutcomeSummary {
    /// Summarize an outcome over the records
    #[must_use]
    pub fn compute(records: &[SubjectRecord], outcome: OutcomeThreshold) -> Self {
        let mut n_zero = 0;
        let mut n_at_or_above = 0;
        let mut weight_above = 0.0;
        let mut weight_total = 0.0;

        for record in records {
            let Some(value) = record.value(outcome.variable).as_number() else {
                continue;
            };
            let weight = record.weight().filter(|w| w.is_finite() && *w > 0.0);
            if value == 0.0 {
                n_zero += 1;
            }
            if value >= outcome.threshold {
                n_at_or_above += 1;
            }
            if let Some(weight) = weight {
                weight_total += weight;
                if value >= outcome.threshold {
                    weight_above += weight;
                }
            }
        }

        Self {
            outcome,
            summary: ContinuousSummary::compute(records, outcome.variable),
            n_zero,
            n_at_or_above,
            percent_at_or_above: (weight_total > 0.0).then(|| weight_above / weight_total * 100.0),
        }
    }
}

/// Variables to describe and how to stratify them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptivePlan {
    /// Categorical or binary variable defining the strata
    pub stratify_by: Option<Variable>,
    /// Continuous variables
    pub continuous: Vec<Variable>,
    /// Categorical and binary variables
    pub categorical: Vec<Variable>,
    /// Outcomes dichotomized at a threshold
    pub outcomes: Vec<OutcomeThreshold>,
}

impl DescriptivePlan {
    /// Whether the plan asks for anything
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.continuous.is_empty() && self.categorical.is_empty() && self.outcomes.is_empty()
    }
}

/// One column of a descriptive table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    /// `Overall` or the stratum level
    pub stratum: String,
    /// Records in the column
    pub n: usize,
    /// Sum of pooled weights in the column
    pub weighted_n: f64,
    /// Continuous rows
    pub continuous: Vec<ContinuousSummary>,
    /// Categorical rows
    pub categorical: Vec<CategoricalSummary>,
}

impl TableColumn {
    fn build(stratum: &str, records: &[SubjectRecord], plan: &DescriptivePlan) -> Self {
        Self {
            stratum: stratum.to_string(),
            n: records.len(),
            weighted_n: records
                .iter()
                .filter_map(SubjectRecord::weight)
                .filter(|w| w.is_finite() && *w > 0.0)
                .sum(),
            continuous: plan
                .continuous
                .iter()
                .map(|variable| ContinuousSummary::compute(records, *variable))
                .collect(),
            categorical: plan
                .categorical
                .iter()
                .map(|variable| CategoricalSummary::compute(records, *variable))
                .collect(),
        }
    }
}

/// Stratified descriptive table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveTable {
    /// Stratifying variable, if any
    pub stratify_by: Option<Variable>,
    /// Overall column followed by one column per stratum level
    pub columns: Vec<TableColumn>,
}

impl DescriptiveTable {
    /// Build the table for a plan
    #[must_use]
    pub fn build(records: &[SubjectRecord], plan: &DescriptivePlan) -> Self {
        let mut strata: Vec<(String, Vec<SubjectRecord>)> = vec![(OVERALL.to_string(), records.to_vec())];
        if let Some(variable) = plan.stratify_by {
            if variable.kind() == VariableKind::Continuous {
                log::warn!("Cannot stratify by continuous variable {variable}, overall column only");
            } else {
                for level in variable.levels() {
                    let members: Vec<SubjectRecord> = records
                        .iter()
                        .filter(|record| record.level(variable) == Some(*level))
                        .cloned()
                        .collect();
                    strata.push(((*level).to_string(), members));
                }
            }
        }

        let columns = strata
            .par_iter()
            .map(|(stratum, members)| TableColumn::build(stratum, members, plan))
            .collect();

        Self {
            stratify_by: plan.stratify_by,
            columns,
        }
    }

    /// Column by stratum label
    #[must_use]
    pub fn column(&self, stratum: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|column| column.stratum == stratum)
    }
}

/// Descriptive table plus outcome summaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveReport {
    /// Stratified table
    pub table: DescriptiveTable,
    /// Outcome summaries over the whole sample
    pub outcomes: Vec<OutcomeSummary>,
}

impl DescriptiveReport {
    /// Compute everything the plan asks for
    #[must_use]
    pub fn build(records: &[SubjectRecord], plan: &DescriptivePlan) -> Self {
        Self {
            table: DescriptiveTable::build(records, plan),
            outcomes: plan
                .outcomes
                .iter()
                .map(|outcome| OutcomeSummary::compute(records, *outcome))
                .collect(),
        }
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "NA".to_string(), |v| format!("{v:.1}"))
}

impl fmt::Display for DescriptiveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Descriptive Summary:")?;
        for column in &self.table.columns {
            writeln!(f, "  {} (n = {}):", column.stratum, column.n)?;
            for summary in &column.continuous {
                writeln!(
                    f,
                    "    {}: {} ({})",
                    summary.variable.label(),
                    fmt_opt(summary.mean),
                    fmt_opt(summary.sd)
                )?;
            }
            for summary in &column.categorical {
                let levels = summary
                    .levels
                    .iter()
                    .map(|level| format!("{} {}%", level.level, fmt_opt(level.percent)))
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(f, "    {}: {levels}", summary.variable.label())?;
            }
        }
        for outcome in &self.outcomes {
            writeln!(
                f,
                "  {} >= {}: {} ({}%)",
                outcome.outcome.variable.label(),
                outcome.outcome.threshold,
                outcome.n_at_or_above,
                fmt_opt(outcome.percent_at_or_above)
            )?;
        }
        Ok(())
    }
}
