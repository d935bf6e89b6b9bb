//! AdaBoost regressor (AdaBoost.R2)
//!
//! Each round fits a shallow regression tree on a weighted bootstrap of the
//! training set, then raises the weight of samples with large relative error.
//! Prediction is the weighted median of the per-round predictions.

use super::decision_tree::DecisionTreeRegressor;
use super::models::{check_fit_shapes, check_n_features, Regressor};
use crate::error::{FlightError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::distributions::{Distribution, WeightedIndex};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Depth of each weak learner
const BASE_MAX_DEPTH: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaBoostRegressor {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub random_state: Option<u64>,
    estimators: Vec<DecisionTreeRegressor>,
    estimator_weights: Vec<f64>,
    n_features: usize,
    pub is_fitted: bool,
}

impl Default for AdaBoostRegressor {
    fn default() -> Self {
        Self::new(50, 1.0)
    }
}

impl AdaBoostRegressor {
    pub fn new(n_estimators: usize, learning_rate: f64) -> Self {
        Self {
            n_estimators,
            learning_rate,
            random_state: None,
            estimators: Vec::new(),
            estimator_weights: Vec::new(),
            n_features: 0,
            is_fitted: false,
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Number of weak learners kept after early stopping
    pub fn n_fitted_estimators(&self) -> usize {
        self.estimators.len()
    }

    fn validate_params(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(FlightError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if !(self.learning_rate > 0.0) {
            return Err(FlightError::InvalidParameter {
                name: "learning_rate".to_string(),
                value: self.learning_rate.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    fn weighted_median(&self, values: &[f64]) -> f64 {
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

        let total: f64 = self.estimator_weights.iter().sum();
        let half = 0.5 * total;
        let mut cumulative = 0.0;
        for &idx in &order {
            cumulative += self.estimator_weights[idx];
            if cumulative >= half {
                return values[idx];
            }
        }
        order.last().map_or(0.0, |&idx| values[idx])
    }
}

impl Regressor for AdaBoostRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_shapes(x, y)?;
        self.validate_params()?;

        let n_samples = x.nrows();
        self.n_features = x.ncols();
        self.estimators.clear();
        self.estimator_weights.clear();

        let mut rng = match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let mut weights = Array1::from_elem(n_samples, 1.0 / n_samples as f64);

        for round in 0..self.n_estimators {
            let sampler = WeightedIndex::new(weights.iter()).map_err(|e| {
                FlightError::TrainingError(format!("invalid sample weights: {}", e))
            })?;
            let indices: Vec<usize> = (0..n_samples).map(|_| sampler.sample(&mut rng)).collect();

            let mut tree = DecisionTreeRegressor::new()
                .with_max_depth(Some(BASE_MAX_DEPTH))
                .with_random_state(round as u64);
            tree.fit(&x.select(Axis(0), &indices), &y.select(Axis(0), &indices))?;

            let predictions = tree.predict(x)?;
            let mut errors = (&predictions - y).mapv(f64::abs);
            let max_error = errors.iter().cloned().fold(0.0, f64::max);

            if max_error <= 0.0 {
                // Perfect fit, nothing left to reweight
                self.estimators.push(tree);
                self.estimator_weights.push(1.0);
                break;
            }
            errors /= max_error;

            let estimator_error = weights.dot(&errors);
            if estimator_error >= 0.5 {
                debug!(round, estimator_error, "AdaBoost stopped early");
                if self.estimators.is_empty() {
                    self.estimators.push(tree);
                    self.estimator_weights.push(1.0);
                }
                break;
            }

            let beta = estimator_error / (1.0 - estimator_error);
            let estimator_weight = if beta > 0.0 {
                self.learning_rate * (1.0 / beta).ln()
            } else {
                1.0
            };

            self.estimators.push(tree);
            self.estimator_weights.push(estimator_weight);

            if beta <= 0.0 {
                break;
            }

            for (w, e) in weights.iter_mut().zip(errors.iter()) {
                *w *= beta.powf((1.0 - e) * self.learning_rate);
            }
            let total = weights.sum();
            if !(total > 0.0) {
                break;
            }
            weights /= total;
        }

        self.is_fitted = true;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(FlightError::ModelNotFitted);
        }
        check_n_features(self.n_features, x)?;

        let per_estimator: Vec<Array1<f64>> = self
            .estimators
            .iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<_>>()?;

        let mut column = vec![0.0; per_estimator.len()];
        Ok((0..x.nrows())
            .map(|i| {
                for (slot, preds) in column.iter_mut().zip(&per_estimator) {
                    *slot = preds[i];
                }
                self.weighted_median(&column)
            })
            .collect())
    }
}
