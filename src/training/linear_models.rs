//! Linear regressors: ordinary least squares, ridge and lasso

use super::models::{check_fit_shapes, check_n_features, Regressor};
use crate::error::{FlightError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Attempts at adding diagonal jitter before giving up on a factorization
const MAX_JITTER_ATTEMPTS: usize = 8;

/// Solve the symmetric positive semi-definite system `A x = b` by Cholesky
/// factorization. A near-singular `A` (collinear or constant features) is
/// retried with a growing diagonal jitter.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }
    if n == 0 {
        return Some(Array1::zeros(0));
    }

    let mean_diag = (a.diag().iter().map(|v| v.abs()).sum::<f64>() / n as f64).max(1e-12);
    let mut jitter = 0.0;
    for attempt in 0..=MAX_JITTER_ATTEMPTS {
        if let Some(l) = cholesky_factor(a, jitter) {
            return Some(substitute(&l, b));
        }
        jitter = mean_diag * 1e-10 * 10f64.powi(attempt as i32);
    }
    None
}

/// Lower-triangular `L` with `L Lᵀ = A + jitter·I`
fn cholesky_factor(a: &Array2<f64>, jitter: f64) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] + jitter - sum;
                if !(diag > 1e-14) {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Forward then backward substitution with a Cholesky factor
fn substitute(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();

    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }
    x
}

/// Column means of `x` and mean of `y`, plus both centered
fn center(x: &Array2<f64>, y: &Array1<f64>) -> (Array2<f64>, Array1<f64>, Array1<f64>, f64) {
    let x_mean = x
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(x.ncols()));
    let y_mean = y.mean().unwrap_or(0.0);
    let x_centered = x - &x_mean.view().insert_axis(Axis(0));
    let y_centered = y - y_mean;
    (x_centered, y_centered, x_mean, y_mean)
}

/// Fitted coefficients shared by every linear model
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LinearFit {
    coefficients: Array1<f64>,
    intercept: f64,
}

impl LinearFit {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_n_features(self.coefficients.len(), x)?;
        Ok(x.dot(&self.coefficients) + self.intercept)
    }
}

/// Penalized normal equations `(XᵀX + alpha·I) w = Xᵀy` on centered data
fn solve_normal_equations(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Result<LinearFit> {
    let (x_c, y_c, x_mean, y_mean) = center(x, y);

    let mut xtx = x_c.t().dot(&x_c);
    for i in 0..xtx.nrows() {
        xtx[[i, i]] += alpha;
    }
    let xty = x_c.t().dot(&y_c);

    let coefficients = cholesky_solve(&xtx, &xty).ok_or_else(|| {
        FlightError::TrainingError("normal equations are singular".to_string())
    })?;
    let intercept = y_mean - coefficients.dot(&x_mean);

    Ok(LinearFit {
        coefficients,
        intercept,
    })
}

/// Ordinary least squares
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearRegression {
    fit: Option<LinearFit>,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.fit.as_ref().map(|f| &f.coefficients)
    }

    pub fn intercept(&self) -> Option<f64> {
        self.fit.as_ref().map(|f| f.intercept)
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_shapes(x, y)?;
        self.fit = Some(solve_normal_equations(x, y, 0.0)?);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.fit
            .as_ref()
            .ok_or(FlightError::ModelNotFitted)?
            .predict(x)
    }
}

/// L2-penalized least squares
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub alpha: f64,
    fit: Option<LinearFit>,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, fit: None }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.fit.as_ref().map(|f| &f.coefficients)
    }
}

impl Regressor for RidgeRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_shapes(x, y)?;
        if !(self.alpha >= 0.0) {
            return Err(FlightError::InvalidParameter {
                name: "alpha".to_string(),
                value: self.alpha.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }
        self.fit = Some(solve_normal_equations(x, y, self.alpha)?);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.fit
            .as_ref()
            .ok_or(FlightError::ModelNotFitted)?
            .predict(x)
    }
}

/// L1-penalized least squares by cyclic coordinate descent.
///
/// Minimizes `1/(2n)·‖y - Xw - b‖² + alpha·‖w‖₁`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoRegression {
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
    fit: Option<LinearFit>,
}

impl Default for LassoRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl LassoRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            max_iter: 1000,
            tol: 1e-4,
            fit: None,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.fit.as_ref().map(|f| &f.coefficients)
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
}

impl Regressor for LassoRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_shapes(x, y)?;
        if !(self.alpha >= 0.0) {
            return Err(FlightError::InvalidParameter {
                name: "alpha".to_string(),
                value: self.alpha.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }

        let n_samples = x.nrows();
        let n_features = x.ncols();
        let (x_c, y_c, x_mean, y_mean) = center(x, y);

        let col_norms: Vec<f64> = (0..n_features)
            .map(|j| x_c.column(j).mapv(|v| v * v).sum())
            .collect();
        let lambda = self.alpha * n_samples as f64;

        let mut w = Array1::<f64>::zeros(n_features);
        let mut residual = y_c.clone();

        for _ in 0..self.max_iter {
            let mut max_step = 0.0f64;
            for j in 0..n_features {
                if col_norms[j] < 1e-15 {
                    continue;
                }
                let column = x_c.column(j);
                let rho = column.dot(&residual) + col_norms[j] * w[j];
                let new_wj = Self::soft_threshold(rho, lambda) / col_norms[j];
                let step = new_wj - w[j];
                if step != 0.0 {
                    residual.scaled_add(-step, &column);
                    w[j] = new_wj;
                    max_step = max_step.max(step.abs());
                }
            }
            if max_step < self.tol {
                break;
            }
        }

        let intercept = y_mean - w.dot(&x_mean);
        self.fit = Some(LinearFit {
            coefficients: w,
            intercept,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.fit
            .as_ref()
            .ok_or(FlightError::ModelNotFitted)?
            .predict(x)
    }
}
