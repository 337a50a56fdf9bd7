//! Weighted GLM estimation
//!
//! [`IrlsSolver`] fits the binomial, Poisson and negative binomial families
//! by iteratively reweighted least squares with frequency weights, and the
//! Gaussian family by a single weighted least squares solve with analytic
//! weights.

use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, Normal, StudentsT};

use crate::algorithm::regression::design::DesignMatrix;
use crate::algorithm::regression::{Coefficient, Family, Link};

/// Reasons a single model cannot be estimated
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    /// No row has every model variable and a positive weight
    #[error("no complete observations")]
    EmptyDesign,

    /// A variable does not vary over the rows used
    #[error("{variable} has zero variance")]
    ZeroVariance {
        /// Column or variable name
        variable: String,
    },

    /// Fewer rows than parameters
    #[error("{n} observations for {p} parameters")]
    InsufficientData {
        /// Rows used
        n: usize,
        /// Parameters
        p: usize,
    },

    /// The outcome cannot be modelled with the family
    #[error("outcome {outcome} is not valid for the {family} family: {message}")]
    InvalidOutcome {
        /// Outcome variable
        outcome: String,
        /// Family name
        family: String,
        /// What was wrong
        message: String,
    },

    /// The weighted cross-product matrix is not positive definite
    #[error("design matrix is singular")]
    Singular,

    /// IRLS stopped at the iteration limit
    #[error("did not converge after {iterations} iterations")]
    NotConverged {
        /// Iterations run
        iterations: usize,
    },

    /// An estimate or statistic is NaN or infinite
    #[error("non-finite {0}")]
    NonFinite(&'static str),

    /// The family parameters cannot define a model
    #[error("invalid {family} family: {message}")]
    InvalidFamily {
        /// Family name
        family: String,
        /// What was wrong
        message: String,
    },
}

/// Reference distribution of the Wald statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaldReference {
    /// Standard normal
    Normal,
    /// Student t with the residual degrees of freedom
    StudentsT(f64),
}

/// Raw estimates of one fit
#[derive(Debug, Clone, PartialEq)]
pub struct GlmFit {
    /// Coefficients in design column order
    pub beta: DVector<f64>,
    /// Scaled covariance of the coefficients
    pub covariance: DMatrix<f64>,
    /// Fitted means
    pub fitted: DVector<f64>,
    /// Iterations run
    pub iterations: usize,
    /// Deviance
    pub deviance: f64,
    /// Pearson chi-square
    pub pearson_chi2: f64,
    /// Residual degrees of freedom
    pub df_resid: f64,
    /// Dispersion used for the covariance
    pub scale: f64,
    /// Distribution of the Wald statistics
    pub reference: WaldReference,
    /// R^2 (Gaussian only)
    pub r_squared: Option<f64>,
    /// Adjusted R^2 (Gaussian only)
    pub adj_r_squared: Option<f64>,
    /// Overall F statistic (Gaussian only)
    pub f_statistic: Option<f64>,
    /// p-value of the F statistic
    pub f_p_value: Option<f64>,
}

impl GlmFit {
    /// Coefficient table with 95% Wald intervals and two-sided p-values
    pub fn coefficients(
        &self,
        columns: &[String],
        family: Family,
    ) -> Result<Vec<Coefficient>, FitError> {
        let (critical, tail): (f64, Box<dyn Fn(f64) -> f64>) = match self.reference {
            WaldReference::Normal => {
                let normal = Normal::new(0.0, 1.0).map_err(|_| FitError::NonFinite("normal"))?;
                let critical = normal.inverse_cdf(0.975);
                (critical, Box::new(move |z: f64| 2.0 * (1.0 - normal.cdf(z.abs()))))
            }
            WaldReference::StudentsT(df) => {
                let t = StudentsT::new(0.0, 1.0, df)
                    .map_err(|_| FitError::NonFinite("degrees of freedom"))?;
                let critical = t.inverse_cdf(0.975);
                (critical, Box::new(move |z: f64| 2.0 * (1.0 - t.cdf(z.abs()))))
            }
        };

        let ratio = family.has_ratio_scale();
        columns
            .iter()
            .enumerate()
            .map(|(j, term)| {
                let estimate = self.beta[j];
                let variance = self.covariance[(j, j)];
                if !estimate.is_finite() || !variance.is_finite() || variance < 0.0 {
                    return Err(FitError::NonFinite("coefficient"));
                }
                let std_error = variance.sqrt();
                let ci_lower = estimate - critical * std_error;
                let ci_upper = estimate + critical * std_error;
                let p_value = if std_error > 0.0 {
                    tail(estimate / std_error)
                } else {
                    0.0
                };
                Ok(Coefficient {
                    term: term.clone(),
                    estimate,
                    std_error,
                    ci_lower,
                    ci_upper,
                    p_value,
                    ratio: ratio.then(|| estimate.exp()),
                    ratio_ci_lower: ratio.then(|| ci_lower.exp()),
                    ratio_ci_upper: ratio.then(|| ci_upper.exp()),
                })
            })
            .collect()
    }
}

/// Estimator behind the regression runner
pub trait GlmSolver: Send + Sync {
    /// Fit one family to a design
    fn fit(&self, design: &DesignMatrix, family: Family) -> Result<GlmFit, FitError>;
}

/// Iteratively reweighted least squares
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrlsSolver {
    /// Iteration limit
    pub max_iterations: usize,
    /// Relative deviance change that counts as converged
    pub tolerance: f64,
}

impl Default for IrlsSolver {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-8,
        }
    }
}

const MU_EPSILON: f64 = 1e-10;
const ETA_MAX: f64 = 700.0;
const RANK_TOLERANCE: f64 = 1e-7;

fn inverse_link(link: Link, eta: f64) -> f64 {
    match link {
        Link::Identity => eta,
        Link::Log => eta.clamp(-ETA_MAX, ETA_MAX).exp().max(MU_EPSILON),
        Link::Logit => {
            let mu = 1.0 / (1.0 + (-eta.clamp(-ETA_MAX, ETA_MAX)).exp());
            mu.clamp(MU_EPSILON, 1.0 - MU_EPSILON)
        }
    }
}

fn link_fn(link: Link, mu: f64) -> f64 {
    match link {
        Link::Identity => mu,
        Link::Log => mu.ln(),
        Link::Logit => (mu / (1.0 - mu)).ln(),
    }
}

/// d mu / d eta at mu
fn mu_derivative(link: Link, mu: f64) -> f64 {
    match link {
        Link::Identity => 1.0,
        Link::Log => mu,
        Link::Logit => mu * (1.0 - mu),
    }
}

fn variance(family: Family, mu: f64) -> f64 {
    match family {
        Family::BinomialLogit => mu * (1.0 - mu),
        Family::Poisson => mu,
        Family::NegativeBinomial { alpha } => mu + alpha * mu * mu,
        Family::Gaussian => 1.0,
    }
}

/// `y * ln(y / mu)` with `0 * ln(0) = 0`
fn y_log_y(y: f64, mu: f64) -> f64 {
    if y > 0.0 { y * (y / mu).ln() } else { 0.0 }
}

fn unit_deviance(family: Family, y: f64, mu: f64) -> f64 {
    match family {
        Family::BinomialLogit => 2.0 * (y_log_y(y, mu) + y_log_y(1.0 - y, 1.0 - mu)),
        Family::Poisson => 2.0 * (y_log_y(y, mu) - (y - mu)),
        Family::NegativeBinomial { alpha } => {
            2.0 * (y_log_y(y, mu)
                - (y + 1.0 / alpha) * ((1.0 + alpha * y) / (1.0 + alpha * mu)).ln())
        }
        Family::Gaussian => (y - mu).powi(2),
    }
}

fn deviance(family: Family, y: &DVector<f64>, mu: &DVector<f64>, w: &DVector<f64>) -> f64 {
    y.iter()
        .zip(mu.iter())
        .zip(w.iter())
        .map(|((&y, &mu), &w)| w * unit_deviance(family, y, mu))
        .sum()
}

fn pearson_chi2(family: Family, y: &DVector<f64>, mu: &DVector<f64>, w: &DVector<f64>) -> f64 {
    y.iter()
        .zip(mu.iter())
        .zip(w.iter())
        .map(|((&y, &mu), &w)| w * (y - mu).powi(2) / variance(family, mu))
        .sum()
}

/// Solve the weighted normal equations `X'WX b = X'Wz`
///
/// Returns the solution and `(X'WX)^-1`.
fn weighted_least_squares(
    x: &DMatrix<f64>,
    z: &DVector<f64>,
    w: &DVector<f64>,
) -> Result<(DVector<f64>, DMatrix<f64>), FitError> {
    let mut xtw = x.transpose();
    for (j, mut column) in xtw.column_iter_mut().enumerate() {
        column *= w[j];
    }
    let xtwx = &xtw * x;
    let xtwz = &xtw * z;

    let cholesky = xtwx.cholesky().ok_or(FitError::Singular)?;
    let pivots = cholesky.l_dirty().diagonal();
    let largest = pivots.amax();
    if !largest.is_finite() || pivots.iter().any(|d| !(*d > RANK_TOLERANCE * largest)) {
        return Err(FitError::Singular);
    }
    let beta = cholesky.solve(&xtwz);
    if beta.iter().any(|b| !b.is_finite()) {
        return Err(FitError::NonFinite("coefficient"));
    }
    Ok((beta, cholesky.inverse()))
}

impl IrlsSolver {
    fn fit_gaussian(&self, design: &DesignMatrix) -> Result<GlmFit, FitError> {
        let (x, y, w) = (&design.x, &design.y, &design.weights);
        let (n, p) = x.shape();
        let (beta, inverse) = weighted_least_squares(x, y, w)?;
        let fitted = x * &beta;

        let df_resid = (n - p) as f64;
        let ssr = deviance(Family::Gaussian, y, &fitted, w);
        let scale = ssr / df_resid;

        let total_weight = w.sum();
        let y_bar = y.dot(w) / total_weight;
        let tss: f64 = y
            .iter()
            .zip(w.iter())
            .map(|(&y, &w)| w * (y - y_bar).powi(2))
            .sum();

        let (r_squared, adj_r_squared, f_statistic, f_p_value) = if tss > 0.0 {
            let r2 = 1.0 - ssr / tss;
            let adj = 1.0 - (n as f64 - 1.0) / df_resid * (1.0 - r2);
            let df_model = (p - 1) as f64;
            if p > 1 && ssr > 0.0 {
                let f = ((tss - ssr) / df_model) / scale;
                let p_value = FisherSnedecor::new(df_model, df_resid)
                    .ok()
                    .map(|dist| 1.0 - dist.cdf(f));
                (Some(r2), Some(adj), Some(f), p_value)
            } else {
                (Some(r2), Some(adj), None, None)
            }
        } else {
            (None, None, None, None)
        };

        Ok(GlmFit {
            beta,
            covariance: inverse * scale,
            fitted,
            iterations: 1,
            deviance: ssr,
            pearson_chi2: ssr,
            df_resid,
            scale,
            reference: WaldReference::StudentsT(df_resid),
            r_squared,
            adj_r_squared,
            f_statistic,
            f_p_value,
        })
    }

    fn fit_irls(&self, design: &DesignMatrix, family: Family) -> Result<GlmFit, FitError> {
        let (x, y, prior) = (&design.x, &design.y, &design.weights);
        let p = x.ncols();
        let link = family.link();

        let y_mean = y.dot(prior) / prior.sum();
        let mut mu = y.map(|y| match family {
            Family::BinomialLogit => (y + 0.5) / 2.0,
            _ => ((y + y_mean) / 2.0).max(MU_EPSILON),
        });
        let mut eta = mu.map(|mu| link_fn(link, mu));
        let mut dev = deviance(family, y, &mu, prior);

        let mut beta = DVector::zeros(p);
        let mut inverse = DMatrix::zeros(p, p);
        let mut converged = false;
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;
            let derivative = mu.map(|mu| mu_derivative(link, mu));
            let z = DVector::from_fn(y.len(), |i, _| eta[i] + (y[i] - mu[i]) / derivative[i]);
            let w = DVector::from_fn(y.len(), |i, _| {
                prior[i] * derivative[i].powi(2) / variance(family, mu[i])
            });

            (beta, inverse) = weighted_least_squares(x, &z, &w)?;
            eta = x * &beta;
            mu = eta.map(|eta| inverse_link(link, eta));

            let new_dev = deviance(family, y, &mu, prior);
            if !new_dev.is_finite() {
                return Err(FitError::NonFinite("deviance"));
            }
            let change = (new_dev - dev).abs() / (new_dev.abs() + 0.1);
            dev = new_dev;
            if change < self.tolerance {
                converged = true;
                break;
            }
        }

        if !converged {
            return Err(FitError::NotConverged { iterations });
        }

        // Frequency weights count as replicated observations
        let df_resid = prior.sum() - p as f64;
        let pearson = pearson_chi2(family, y, &mu, prior);

        Ok(GlmFit {
            beta,
            covariance: inverse,
            fitted: mu,
            iterations,
            deviance: dev,
            pearson_chi2: pearson,
            df_resid,
            scale: 1.0,
            reference: WaldReference::Normal,
            r_squared: None,
            adj_r_squared: None,
            f_statistic: None,
            f_p_value: None,
        })
    }
}

impl GlmSolver for IrlsSolver {
    fn fit(&self, design: &DesignMatrix, family: Family) -> Result<GlmFit, FitError> {
        let (n, p) = design.x.shape();
        if n <= p {
            return Err(FitError::InsufficientData { n, p });
        }
        match family {
            Family::Gaussian => self.fit_gaussian(design),
            _ => self.fit_irls(design, family),
        }
    }
}
