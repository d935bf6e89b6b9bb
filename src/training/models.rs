//! Regressor trait and regression metrics

use crate::error::{FlightError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Regression metrics for one data partition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Coefficient of determination
    pub r2_score: f64,
    /// Mean absolute error
    pub mae_score: f64,
    /// Mean squared error
    pub mse_score: f64,
    /// Root mean squared error
    pub rmse_score: f64,
}

impl RegressionMetrics {
    /// Compute all four metrics from true and predicted targets
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(FlightError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(FlightError::DataError(
                "cannot score an empty partition".to_string(),
            ));
        }

        let n = y_true.len() as f64;
        let errors: Vec<f64> = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| t - p)
            .collect();

        let mse = errors.iter().map(|e| e * e).sum::<f64>() / n;
        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        Ok(Self {
            r2_score: r2_score(y_true, y_pred),
            mae_score: mae,
            mse_score: mse,
            rmse_score: mse.sqrt(),
        })
    }
}

/// R² score. A constant target scores 1.0 on a perfect fit and 0.0 otherwise.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len() as f64;
    if n == 0.0 {
        return f64::NAN;
    }
    let y_mean = y_true.sum() / n;
    let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Common interface of every estimator on the training menu
pub trait Regressor: Send + Sync {
    /// Fit to a feature matrix and target vector
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict targets for a feature matrix
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// R² of the predictions on `x` against `y`
    fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let y_pred = self.predict(x)?;
        Ok(r2_score(y, &y_pred))
    }
}

/// Shared shape check for `fit`
pub(crate) fn check_fit_shapes(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(FlightError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(FlightError::TrainingError(
            "cannot fit on an empty training set".to_string(),
        ));
    }
    if x.ncols() == 0 {
        return Err(FlightError::ShapeError {
            expected: "at least one feature column".to_string(),
            actual: "0 feature columns".to_string(),
        });
    }
    Ok(())
}

/// Shared feature-count check for `predict`
pub(crate) fn check_n_features(expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(FlightError::ShapeError {
            expected: format!("{} features", expected),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_regression_metrics() {
        let y_true = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let y_pred = array![1.1, 2.0, 2.9, 4.1, 5.0];

        let metrics = RegressionMetrics::compute(&y_true, &y_pred).unwrap();

        assert_relative_eq!(metrics.mse_score, 0.006, epsilon = 1e-12);
        assert_relative_eq!(metrics.rmse_score, 0.006f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(metrics.mae_score, 0.06, epsilon = 1e-12);
        assert!(metrics.r2_score > 0.99);
    }

    #[test]
    fn test_r2_constant_target() {
        let y = array![3.0, 3.0, 3.0];
        assert_eq!(r2_score(&y, &y), 1.0);
        assert_eq!(r2_score(&y, &array![3.0, 3.0, 4.0]), 0.0);
    }

    #[test]
    fn test_metrics_length_mismatch() {
        let err = RegressionMetrics::compute(&array![1.0, 2.0], &array![1.0]).unwrap_err();
        assert!(matches!(err, FlightError::ShapeError { .. }));
    }
}
