//! Fitted preprocessor and estimator bundled for prediction

use crate::error::{FlightError, Result};
use crate::preprocessing::FeaturePreprocessor;
use crate::training::{Estimator, Regressor};
use crate::utils::{load_object, save_object};
use ndarray::Array1;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Predicts fares from raw feature tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FareModel {
    preprocessor: FeaturePreprocessor,
    estimator: Estimator,
}

impl FareModel {
    /// Bundle a fitted preprocessor with an estimator fitted on its output
    pub fn new(preprocessor: FeaturePreprocessor, estimator: Estimator) -> Result<Self> {
        if !preprocessor.is_fitted() {
            return Err(FlightError::ModelNotFitted);
        }
        Ok(Self {
            preprocessor,
            estimator,
        })
    }

    /// Transform `df` with the bundled preprocessor, then predict
    pub fn predict(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let start = Instant::now();
        let x = self.preprocessor.transform(df)?;
        let predictions = self.estimator.predict(&x)?;
        debug!(
            rows = df.height(),
            latency_ms = start.elapsed().as_secs_f64() * 1000.0,
            "fare prediction"
        );
        Ok(predictions)
    }

    pub fn preprocessor(&self) -> &FeaturePreprocessor {
        &self.preprocessor
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    /// Persist the bundle
    pub fn save(&self, path: &Path) -> Result<()> {
        save_object(path, self)
    }

    /// Load a bundle written by [`FareModel::save`]
    pub fn load(path: &Path) -> Result<Self> {
        load_object(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::EstimatorSpec;
    use polars::prelude::*;
    use tempfile::TempDir;

    fn fitted() -> (FareModel, DataFrame) {
        let features = df!(
            "airline" => &["A", "B", "A", "B", "C", "C"],
            "days_left" => &[1.0, 5.0, 10.0, 20.0, 30.0, 40.0]
        )
        .unwrap();
        let y = Array1::from_vec(vec![900.0, 700.0, 600.0, 450.0, 300.0, 250.0]);

        let mut preprocessor = FeaturePreprocessor::new();
        let x = preprocessor.fit_transform(&features).unwrap();
        let mut estimator = EstimatorSpec::LinearRegression.build(None);
        estimator.fit(&x, &y).unwrap();

        (FareModel::new(preprocessor, estimator).unwrap(), features)
    }

    #[test]
    fn test_predict_matches_manual_composition() {
        let (model, features) = fitted();
        let manual = model
            .estimator()
            .predict(&model.preprocessor().transform(&features).unwrap())
            .unwrap();
        assert_eq!(model.predict(&features).unwrap(), manual);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("model.bin");
        let (model, features) = fitted();

        model.save(&path).unwrap();
        let loaded = FareModel::load(&path).unwrap();
        assert_eq!(loaded.predict(&features).unwrap(), model.predict(&features).unwrap());
    }

    #[test]
    fn test_unfitted_preprocessor_rejected() {
        let result = FareModel::new(
            FeaturePreprocessor::new(),
            EstimatorSpec::LinearRegression.build(None),
        );
        assert!(matches!(result, Err(FlightError::ModelNotFitted)));
    }
}
