//! Survey-weighted descriptive statistics
//!
//! Every function ignores observations with a missing value or a missing or
//! non-positive weight, and returns `None` when nothing is left to compute
//! from.

pub mod table;

use rustc_hash::FxHashMap;

pub use table::{
    CategoricalSummary, ContinuousSummary, DescriptivePlan, DescriptiveReport, DescriptiveTable,
    LevelSummary, OutcomeSummary, OutcomeThreshold, TableColumn,
};

/// Paired values and weights that are usable for weighted statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightedSample {
    values: Vec<f64>,
    weights: Vec<f64>,
}

impl WeightedSample {
    /// Keep pairs with a finite value and a finite positive weight
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Option<f64>, Option<f64>)>,
    {
        let mut sample = Self::default();
        for (value, weight) in pairs {
            let (Some(value), Some(weight)) = (value, weight) else {
                continue;
            };
            if value.is_finite() && weight.is_finite() && weight > 0.0 {
                sample.values.push(value);
                sample.weights.push(weight);
            }
        }
        sample
    }

    /// Build a sample from parallel value and weight slices
    #[must_use]
    pub fn new(values: &[Option<f64>], weights: &[Option<f64>]) -> Self {
        Self::from_pairs(values.iter().copied().zip(weights.iter().copied()))
    }

    /// Number of usable observations
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no observation is usable
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sum of the weights
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Weighted mean
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let total = self.total_weight();
        let sum: f64 = self
            .values
            .iter()
            .zip(&self.weights)
            .map(|(x, w)| x * w)
            .sum();
        Some(sum / total)
    }

    /// Weighted standard deviation with the reliability-weights correction
    ///
    /// `sqrt(Σw(x−m)²/Σw · Σw/(Σw − Σw²/Σw))`; needs two observations.
    #[must_use]
    pub fn sd(&self) -> Option<f64> {
        if self.len() < 2 {
            return None;
        }
        let mean = self.mean()?;
        let total = self.total_weight();
        let squares: f64 = self.weights.iter().map(|w| w * w).sum();
        let denominator = total - squares / total;
        if denominator <= 0.0 {
            return None;
        }
        let spread: f64 = self
            .values
            .iter()
            .zip(&self.weights)
            .map(|(x, w)| w * (x - mean).powi(2))
            .sum();
        Some((spread / total * (total / denominator)).sqrt())
    }

    /// Weighted percentile, `p` in 0..=100
    ///
    /// Values are sorted and the first value whose cumulative weight reaches
    /// `p / 100` of the total is returned.
    #[must_use]
    pub fn percentile(&self, p: f64) -> Option<f64> {
        if self.is_empty() || !(0.0..=100.0).contains(&p) {
            return None;
        }
        let mut pairs: Vec<(f64, f64)> = self
            .values
            .iter()
            .copied()
            .zip(self.weights.iter().copied())
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let target = p / 100.0 * self.total_weight();
        let mut cumulative = 0.0;
        for (value, weight) in &pairs {
            cumulative += weight;
            if cumulative >= target {
                return Some(*value);
            }
        }
        pairs.last().map(|(value, _)| *value)
    }
}

/// Weighted mean of the usable observations
#[must_use]
pub fn weighted_mean(values: &[Option<f64>], weights: &[Option<f64>]) -> Option<f64> {
    WeightedSample::new(values, weights).mean()
}

/// Weighted standard deviation of the usable observations
#[must_use]
pub fn weighted_sd(values: &[Option<f64>], weights: &[Option<f64>]) -> Option<f64> {
    WeightedSample::new(values, weights).sd()
}

/// Weighted percentile of the usable observations
#[must_use]
pub fn weighted_percentile(values: &[Option<f64>], weights: &[Option<f64>], p: f64) -> Option<f64> {
    WeightedSample::new(values, weights).percentile(p)
}

/// Weighted median, the 50th weighted percentile
#[must_use]
pub fn weighted_median(values: &[Option<f64>], weights: &[Option<f64>]) -> Option<f64> {
    weighted_percentile(values, weights, 50.0)
}

/// Weighted percentage of each observed category, in first-seen order
///
/// The denominator is the weight of the observations with an observed
/// category, so the percentages sum to 100.
#[must_use]
pub fn weighted_percentages<'a>(
    categories: &[Option<&'a str>],
    weights: &[Option<f64>],
) -> Option<Vec<(&'a str, f64)>> {
    let mut order: Vec<(&'a str, f64)> = Vec::new();
    let mut index: FxHashMap<&'a str, usize> = FxHashMap::default();
    let mut total = 0.0;

    for (category, weight) in categories.iter().zip(weights) {
        let (Some(category), Some(weight)) = (*category, *weight) else {
            continue;
        };
        if !weight.is_finite() || weight <= 0.0 {
            continue;
        }
        total += weight;
        let idx = *index.entry(category).or_insert_with(|| {
            order.push((category, 0.0));
            order.len() - 1
        });
        order[idx].1 += weight;
    }

    if total <= 0.0 {
        return None;
    }
    Some(
        order
            .into_iter()
            .map(|(category, weight)| (category, weight / total * 100.0))
            .collect(),
    )
}
