//! Exhaustive hyperparameter search scored by k-fold cross-validation

use super::cross_validation::{cross_val_score, KFold};
use super::estimator::{Estimator, EstimatorSpec, ParamGrid};
use super::models::Regressor;
use crate::error::{FlightError, Result};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use tracing::debug;

/// Outcome of a grid search
#[derive(Debug, Clone)]
pub struct GridSearchResult {
    /// Winning parameter combination
    pub best_spec: EstimatorSpec,
    /// Mean cross-validated R² of the winner
    pub best_score: f64,
    /// Combinations evaluated
    pub n_candidates: usize,
}

/// Grid search over a [`ParamGrid`]
#[derive(Debug, Clone)]
pub struct GridSearch {
    cv_folds: usize,
    random_state: Option<u64>,
}

impl Default for GridSearch {
    fn default() -> Self {
        Self::new(3)
    }
}

impl GridSearch {
    pub fn new(cv_folds: usize) -> Self {
        Self {
            cv_folds,
            random_state: None,
        }
    }

    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }

    /// Score every combination, keep the best mean R² (earliest on ties),
    /// then refit it on all of `x`.
    pub fn fit(
        &self,
        base: &EstimatorSpec,
        grid: &ParamGrid,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<(Estimator, GridSearchResult)> {
        let specs = grid.candidates(base)?;
        let splits = KFold::new(self.cv_folds).split(x.nrows())?;
        let seed = self.random_state;

        let scores: Vec<Result<f64>> = specs
            .par_iter()
            .map(|spec| {
                let fold_scores = cross_val_score(|| spec.build(seed), x, y, &splits)?;
                Ok(fold_scores.iter().sum::<f64>() / fold_scores.len() as f64)
            })
            .collect();

        let mut best: Option<(usize, f64)> = None;
        let mut last_error = None;
        for (idx, score) in scores.into_iter().enumerate() {
            match score {
                Ok(score) => {
                    debug!(params = %specs[idx], score, "grid point scored");
                    if score.is_nan() {
                        continue;
                    }
                    if best.map_or(true, |(_, b)| score > b) {
                        best = Some((idx, score));
                    }
                }
                Err(e) => {
                    debug!(params = %specs[idx], error = %e, "grid point failed");
                    last_error = Some(e);
                }
            }
        }

        let (best_idx, best_score) = match (best, last_error) {
            (Some(best), _) => best,
            (None, Some(e)) => return Err(e),
            (None, None) => {
                return Err(FlightError::TrainingError(format!(
                    "no grid point of {} produced a finite score",
                    base
                )))
            }
        };

        let best_spec = specs[best_idx].clone();
        let mut estimator = best_spec.build(seed);
        estimator.fit(x, y)?;

        Ok((
            estimator,
            GridSearchResult {
                best_spec,
                best_score,
                n_candidates: specs.len(),
            },
        ))
    }
}
