//! Epsilon-insensitive support vector regression
//!
//! Solved in the dual by coordinate descent. The bias is folded into the
//! kernel (`K + 1`), which removes the equality constraint and leaves a box
//! constrained problem with a closed-form update per coordinate.

use super::models::{check_fit_shapes, check_n_features, Regressor};
use crate::error::{FlightError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maximum number of samples for eager kernel matrix computation.
/// Beyond this, training returns an error to prevent OOM.
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// Kernel function type
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum KernelType {
    /// K(x, y) = x · y
    Linear,
    /// K(x, y) = exp(-γ ||x - y||²)
    #[default]
    Rbf,
}

/// SVR configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMConfig {
    /// Regularization parameter (C)
    pub c: f64,
    /// Kernel function
    pub kernel: KernelType,
    /// RBF width; `None` uses `1 / (n_features * var(X))`
    pub gamma: Option<f64>,
    /// Tube half-width
    pub epsilon: f64,
    /// Tolerance on the largest coordinate step
    pub tol: f64,
    /// Maximum number of sweeps
    pub max_iter: usize,
    /// Seed for the coordinate order
    pub random_state: Option<u64>,
}

impl Default for SVMConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: KernelType::Rbf,
            gamma: None,
            epsilon: 0.1,
            tol: 1e-3,
            max_iter: 1000,
            random_state: Some(42),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMRegressor {
    config: SVMConfig,
    support_vectors: Option<Array2<f64>>,
    dual_coef: Option<Array1<f64>>,
    gamma: f64,
    is_fitted: bool,
}

impl Default for SVMRegressor {
    fn default() -> Self {
        Self::new(SVMConfig::default())
    }
}

impl SVMRegressor {
    pub fn new(config: SVMConfig) -> Self {
        Self {
            config,
            support_vectors: None,
            dual_coef: None,
            gamma: 1.0,
            is_fitted: false,
        }
    }

    pub fn config(&self) -> &SVMConfig {
        &self.config
    }

    /// Get number of support vectors
    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors.as_ref().map_or(0, |sv| sv.nrows())
    }

    fn resolve_gamma(&self, x: &Array2<f64>) -> f64 {
        if let Some(gamma) = self.config.gamma {
            return gamma;
        }
        let variance = x.var(0.0);
        if variance > 0.0 {
            1.0 / (x.ncols() as f64 * variance)
        } else {
            1.0
        }
    }

    /// Kernel value plus one for the implicit bias
    fn kernel(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        let k = match self.config.kernel {
            KernelType::Linear => a.dot(&b),
            KernelType::Rbf => {
                let sq: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
                (-self.gamma * sq).exp()
            }
        };
        k + 1.0
    }

    fn compute_kernel_matrix(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let mut k = Array2::zeros((n, n));
        k.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(i, mut row)| {
                for j in 0..n {
                    row[j] = self.kernel(x.row(i), x.row(j));
                }
            });
        k
    }

    fn validate_params(&self) -> Result<()> {
        if !(self.config.c > 0.0) {
            return Err(FlightError::InvalidParameter {
                name: "c".to_string(),
                value: self.config.c.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if !(self.config.epsilon >= 0.0) {
            return Err(FlightError::InvalidParameter {
                name: "epsilon".to_string(),
                value: self.config.epsilon.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }
        Ok(())
    }
}

fn soft_threshold(val: f64, threshold: f64) -> f64 {
    if val > threshold {
        val - threshold
    } else if val < -threshold {
        val + threshold
    } else {
        0.0
    }
}

impl Regressor for SVMRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_shapes(x, y)?;
        self.validate_params()?;

        let n = x.nrows();
        if n > MAX_KERNEL_MATRIX_SAMPLES {
            return Err(FlightError::TrainingError(format!(
                "{} samples exceed the SVR kernel matrix limit of {}",
                n, MAX_KERNEL_MATRIX_SAMPLES
            )));
        }

        self.gamma = self.resolve_gamma(x);
        let kernel = self.compute_kernel_matrix(x);
        let c = self.config.c;
        let epsilon = self.config.epsilon;

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        // beta = alpha - alpha*, f = K beta
        let mut beta = Array1::<f64>::zeros(n);
        let mut f = Array1::<f64>::zeros(n);
        let mut order: Vec<usize> = (0..n).collect();
        let mut sweeps = 0;

        for _ in 0..self.config.max_iter {
            sweeps += 1;
            order.shuffle(&mut rng);
            let mut max_step = 0.0f64;

            for &i in &order {
                let k_ii = kernel[[i, i]];
                if k_ii <= 0.0 {
                    continue;
                }
                let r = f[i] - k_ii * beta[i] - y[i];
                let new_beta = (-soft_threshold(r, epsilon) / k_ii).clamp(-c, c);
                let step = new_beta - beta[i];
                if step != 0.0 {
                    f.scaled_add(step, &kernel.row(i));
                    beta[i] = new_beta;
                    max_step = max_step.max(step.abs());
                }
            }

            if max_step < self.config.tol {
                break;
            }
        }

        let support: Vec<usize> = (0..n).filter(|&i| beta[i].abs() > 1e-12).collect();
        debug!(sweeps, n_support = support.len(), "SVR converged");

        self.support_vectors = Some(x.select(Axis(0), &support));
        self.dual_coef = Some(beta.select(Axis(0), &support));
        self.is_fitted = true;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (sv, coef) = match (&self.support_vectors, &self.dual_coef) {
            (Some(sv), Some(coef)) if self.is_fitted => (sv, coef),
            _ => return Err(FlightError::ModelNotFitted),
        };
        check_n_features(sv.ncols(), x)?;

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                sv.rows()
                    .into_iter()
                    .zip(coef.iter())
                    .map(|(row, &b)| b * self.kernel(x.row(i), row))
                    .sum::<f64>()
            })
            .collect();
        Ok(Array1::from_vec(predictions))
    }
}
