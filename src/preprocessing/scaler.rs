//! Standard (z-score) scaling of dense feature matrices

use crate::error::{FlightError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Scales each column to zero mean and unit variance.
///
/// Uses the population standard deviation; a constant column gets scale 1.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the scaler to the data
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(FlightError::PreprocessingError(
                "cannot fit a scaler on zero rows".to_string(),
            ));
        }
        let mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()));
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 0.0 && s.is_finite() { s } else { 1.0 });

        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, scale) = match (&self.mean, &self.scale) {
            (Some(mean), Some(scale)) => (mean, scale),
            _ => return Err(FlightError::ModelNotFitted),
        };
        if x.ncols() != mean.len() {
            return Err(FlightError::ShapeError {
                expected: format!("{} columns", mean.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok((x - mean) / scale)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_standard_scaling() {
        let x = array![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();

        // Population std of [1, 2, 3] is sqrt(2/3)
        let std = (2.0f64 / 3.0).sqrt();
        assert_relative_eq!(scaled[[0, 0]], -1.0 / std, epsilon = 1e-12);
        assert_relative_eq!(scaled[[2, 0]], 1.0 / std, epsilon = 1e-12);

        // Constant column: centered, scale 1
        assert_eq!(scaled.column(1).to_vec(), vec![0.0, 0.0, 0.0]);
        assert_eq!(scaler.scale().unwrap()[1], 1.0);
    }

    #[test]
    fn test_transform_uses_fitted_statistics() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&array![[0.0], [2.0]]).unwrap();

        let out = scaler.transform(&array![[4.0]]).unwrap();
        assert_relative_eq!(out[[0, 0]], 3.0);
    }

    #[test]
    fn test_transform_before_fit() {
        let scaler = StandardScaler::new();
        assert!(matches!(
            scaler.transform(&array![[1.0]]),
            Err(FlightError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_width_mismatch() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&array![[1.0, 2.0]]).unwrap();
        assert!(matches!(
            scaler.transform(&array![[1.0]]),
            Err(FlightError::ShapeError { .. })
        ));
    }
}
