//! Design matrix assembly
//!
//! Rows missing any model variable, or without a positive weight, are
//! dropped. Categorical terms expand to treatment dummies named
//! `variable[level]` for every observed level except the reference.

use std::collections::BTreeMap;

use itertools::Itertools;
use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::algorithm::regression::solver::FitError;
use crate::algorithm::regression::{Family, ModelSpec, Term};
use crate::models::{SubjectRecord, Variable, VariableKind};

/// Name of the intercept column
pub const INTERCEPT: &str = "Intercept";

/// Numeric model inputs for one fit
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    /// Predictor columns, intercept first
    pub x: DMatrix<f64>,
    /// Outcome
    pub y: DVector<f64>,
    /// Survey weights
    pub weights: DVector<f64>,
    /// Column names of `x`
    pub columns: Vec<String>,
    /// Records dropped for missing values or weights
    pub n_dropped: usize,
}

enum Column {
    Numeric { term: Term, offset: f64 },
    Dummy { variable: Variable, level: &'static str },
}

fn reference_level(
    variable: Variable,
    observed: &[&'static str],
    overrides: &BTreeMap<Variable, String>,
) -> &'static str {
    let requested = overrides
        .get(&variable)
        .map(String::as_str)
        .or_else(|| variable.default_reference());
    match requested.and_then(|r| observed.iter().find(|level| **level == r)) {
        Some(level) => *level,
        None => {
            // Fall back to the first observed level in display order
            let fallback = observed[0];
            debug!(
                "Reference level {:?} of {variable} not observed, using {fallback}",
                requested
            );
            fallback
        }
    }
}

fn zero_variance(name: impl Into<String>) -> FitError {
    FitError::ZeroVariance {
        variable: name.into(),
    }
}

impl DesignMatrix {
    /// Build the design for a model over the given records
    pub fn build(
        records: &[SubjectRecord],
        spec: &ModelSpec,
        reference_overrides: &BTreeMap<Variable, String>,
    ) -> Result<Self, FitError> {
        if spec.outcome.kind() == VariableKind::Categorical {
            return Err(FitError::InvalidOutcome {
                outcome: spec.outcome.to_string(),
                family: spec.family.name().to_string(),
                message: "categorical outcomes are not supported".to_string(),
            });
        }

        let variables = spec.variables();
        let rows: Vec<&SubjectRecord> = records
            .iter()
            .filter(|record| {
                record
                    .weight()
                    .is_some_and(|w| w.is_finite() && w > 0.0)
                    && variables.iter().all(|v| !record.is_missing(*v))
            })
            .collect();
        let n_dropped = records.len() - rows.len();
        if rows.is_empty() {
            return Err(FitError::EmptyDesign);
        }

        let y = DVector::from_iterator(
            rows.len(),
            rows.iter()
                .map(|r| r.value(spec.outcome).as_number().unwrap_or(f64::NAN)),
        );
        Self::check_outcome(spec, &y)?;

        let mut columns = Vec::new();
        for term in &spec.predictors {
            let variable = term.variable();
            match variable.kind() {
                VariableKind::Categorical => {
                    let observed: Vec<&'static str> = variable
                        .levels()
                        .iter()
                        .copied()
                        .filter(|level| rows.iter().any(|r| r.level(variable) == Some(*level)))
                        .collect();
                    if observed.len() < 2 {
                        return Err(zero_variance(variable.name()));
                    }
                    let reference = reference_level(variable, &observed, reference_overrides);
                    columns.extend(
                        observed
                            .into_iter()
                            .filter(|level| *level != reference)
                            .map(|level| Column::Dummy { variable, level }),
                    );
                }
                VariableKind::Continuous | VariableKind::Binary => {
                    let offset = match term {
                        Term::Centered { at, .. } => *at,
                        Term::Variable(_) => 0.0,
                    };
                    let distinct = rows
                        .iter()
                        .filter_map(|r| r.value(variable).as_number())
                        .map(f64::to_bits)
                        .unique()
                        .take(2)
                        .count();
                    if distinct < 2 {
                        return Err(zero_variance(term.name()));
                    }
                    columns.push(Column::Numeric {
                        term: *term,
                        offset,
                    });
                }
            }
        }

        let p = columns.len() + 1;
        let n = rows.len();
        if n <= p {
            return Err(FitError::InsufficientData { n, p });
        }

        let x = DMatrix::from_fn(n, p, |i, j| {
            if j == 0 {
                return 1.0;
            }
            let record = rows[i];
            match &columns[j - 1] {
                Column::Numeric { term, offset } => record
                    .value(term.variable())
                    .as_number()
                    .map_or(f64::NAN, |v| v - offset),
                Column::Dummy { variable, level } => {
                    if record.level(*variable) == Some(*level) {
                        1.0
                    } else {
                        0.0
                    }
                }
            }
        });

        let weights = DVector::from_iterator(n, rows.iter().map(|r| r.weight().unwrap_or(0.0)));

        let names = std::iter::once(INTERCEPT.to_string())
            .chain(columns.iter().map(|column| match column {
                Column::Numeric { term, .. } => term.name(),
                Column::Dummy { variable, level } => format!("{}[{level}]", variable.name()),
            }))
            .collect();

        Ok(Self {
            x,
            y,
            weights,
            columns: names,
            n_dropped,
        })
    }

    fn check_outcome(spec: &ModelSpec, y: &DVector<f64>) -> Result<(), FitError> {
        let invalid = |message: &str| FitError::InvalidOutcome {
            outcome: spec.outcome.to_string(),
            family: spec.family.name().to_string(),
            message: message.to_string(),
        };
        if y.iter().any(|v| !v.is_finite()) {
            return Err(invalid("non-numeric values"));
        }
        match spec.family {
            Family::BinomialLogit if y.iter().any(|v| *v != 0.0 && *v != 1.0) => {
                return Err(invalid("values must be 0 or 1"));
            }
            Family::Poisson | Family::NegativeBinomial { .. } if y.iter().any(|v| *v < 0.0) => {
                return Err(invalid("counts must be non-negative"));
            }
            _ => {}
        }
        if y.iter().all(|v| *v == y[0]) {
            return Err(zero_variance(spec.outcome.name()));
        }
        Ok(())
    }

    /// Rows used
    #[must_use]
    pub fn n_obs(&self) -> usize {
        self.y.len()
    }

    /// Sum of the weights of the rows used
    #[must_use]
    pub fn weighted_n(&self) -> f64 {
        self.weights.sum()
    }
}
