//! K-nearest-neighbors regressor (brute force)

use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::models::{check_fit_shapes, check_n_features, Regressor};
use crate::error::{FlightError, Result};

/// Distance metric for KNN
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean distance (L2)
    #[default]
    Euclidean,
    /// Manhattan distance (L1)
    Manhattan,
    /// Minkowski distance with parameter p
    Minkowski(f64),
}

/// Weighting scheme for neighbors
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum WeightScheme {
    /// All neighbors have equal weight
    #[default]
    Uniform,
    /// Closer neighbors have more weight (inverse distance)
    Distance,
}

/// KNN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNConfig {
    /// Number of neighbors
    pub n_neighbors: usize,
    /// Distance metric
    pub metric: DistanceMetric,
    /// Weighting scheme
    pub weights: WeightScheme,
}

impl Default for KNNConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            metric: DistanceMetric::Euclidean,
            weights: WeightScheme::Uniform,
        }
    }
}

/// K-nearest-neighbors regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNRegressor {
    config: KNNConfig,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl Default for KNNRegressor {
    fn default() -> Self {
        Self::new(KNNConfig::default())
    }
}

impl KNNRegressor {
    pub fn new(config: KNNConfig) -> Self {
        Self {
            config,
            x_train: None,
            y_train: None,
        }
    }

    /// Create with default config and specified k
    pub fn with_k(k: usize) -> Self {
        Self::new(KNNConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &KNNConfig {
        &self.config
    }
}

impl Regressor for KNNRegressor {
    /// Stores the training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_shapes(x, y)?;
        if self.config.n_neighbors == 0 {
            return Err(FlightError::InvalidParameter {
                name: "n_neighbors".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if let DistanceMetric::Minkowski(p) = self.config.metric {
            if p.is_nan() || p < 1.0 {
                return Err(FlightError::InvalidParameter {
                    name: "metric".to_string(),
                    value: format!("Minkowski({})", p),
                    reason: "p must be at least 1".to_string(),
                });
            }
        }
        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    /// Mean target of the nearest training rows, parallel over queries
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (x_train, y_train) = match (&self.x_train, &self.y_train) {
            (Some(x_train), Some(y_train)) => (x_train, y_train),
            _ => return Err(FlightError::ModelNotFitted),
        };
        check_n_features(x_train.ncols(), x)?;

        let k = self.config.n_neighbors.min(x_train.nrows());
        let metric = self.config.metric;
        let weights = self.config.weights;

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let neighbors = find_k_nearest(x.row(i), x_train, y_train, k, metric);
                weighted_mean_from(&neighbors, weights)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }
}

/// Max-heap entry keyed by distance
#[derive(PartialEq)]
struct DistTarget(f64, f64);

impl Eq for DistTarget {}

impl PartialOrd for DistTarget {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DistTarget {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Keep the k smallest distances in a max-heap, O(n log k)
fn find_k_nearest(
    point: ArrayView1<f64>,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    k: usize,
    metric: DistanceMetric,
) -> Vec<(f64, f64)> {
    let mut heap = BinaryHeap::with_capacity(k + 1);
    for (row, &target) in x_train.rows().into_iter().zip(y_train.iter()) {
        let dist = compute_distance(point, row, metric);
        if heap.len() < k {
            heap.push(DistTarget(dist, target));
        } else if let Some(top) = heap.peek() {
            if dist < top.0 {
                heap.pop();
                heap.push(DistTarget(dist, target));
            }
        }
    }
    heap.into_iter().map(|d| (d.0, d.1)).collect()
}

fn compute_distance(a: ArrayView1<f64>, b: ArrayView1<f64>, metric: DistanceMetric) -> f64 {
    let pairs = a.iter().zip(b.iter());
    match metric {
        DistanceMetric::Euclidean => pairs.map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt(),
        DistanceMetric::Manhattan => pairs.map(|(x, y)| (x - y).abs()).sum(),
        DistanceMetric::Minkowski(p) => pairs
            .map(|(x, y)| (x - y).abs().powf(p))
            .sum::<f64>()
            .powf(1.0 / p),
    }
}

fn weighted_mean_from(neighbors: &[(f64, f64)], weights: WeightScheme) -> f64 {
    let uniform = || neighbors.iter().map(|(_, y)| y).sum::<f64>() / neighbors.len() as f64;
    match weights {
        WeightScheme::Uniform => uniform(),
        WeightScheme::Distance => {
            // An exact match takes the whole vote
            let exact: Vec<f64> = neighbors
                .iter()
                .filter(|(d, _)| *d == 0.0)
                .map(|(_, y)| *y)
                .collect();
            if !exact.is_empty() {
                return exact.iter().sum::<f64>() / exact.len() as f64;
            }
            let (weighted_sum, weight_total) = neighbors
                .iter()
                .fold((0.0, 0.0), |(s, t), &(d, y)| (s + y / d, t + 1.0 / d));
            if weight_total > 0.0 {
                weighted_sum / weight_total
            } else {
                uniform()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_knn_regressor_uniform() {
        let x = array![[0.0], [1.0], [2.0], [10.0], [11.0]];
        let y = array![1.0, 2.0, 3.0, 20.0, 30.0];

        let mut model = KNNRegressor::with_k(2);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&array![[0.4], [10.6]]).unwrap();
        assert_relative_eq!(predictions[0], 1.5);
        assert_relative_eq!(predictions[1], 25.0);
    }

    #[test]
    fn test_k_larger_than_training_set() {
        let x = array![[0.0], [1.0]];
        let y = array![2.0, 4.0];

        let mut model = KNNRegressor::default();
        model.fit(&x, &y).unwrap();

        assert_relative_eq!(model.predict(&array![[5.0]]).unwrap()[0], 3.0);
    }

    #[test]
    fn test_distance_weights_exact_match() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![5.0, 7.0, 9.0];

        let mut model = KNNRegressor::new(KNNConfig {
            n_neighbors: 3,
            weights: WeightScheme::Distance,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        assert_relative_eq!(model.predict(&array![[1.0]]).unwrap()[0], 7.0);
    }

    #[test]
    fn test_manhattan_distance() {
        let d = compute_distance(
            array![0.0, 0.0].view(),
            array![3.0, 4.0].view(),
            DistanceMetric::Manhattan,
        );
        assert_relative_eq!(d, 7.0);
    }

    #[test]
    fn test_minkowski_p_validated() {
        let mut model = KNNRegressor::new(KNNConfig {
            metric: DistanceMetric::Minkowski(0.5),
            ..Default::default()
        });
        assert!(matches!(
            model.fit(&array![[0.0], [1.0]], &array![1.0, 2.0]),
            Err(FlightError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_predict_before_fit() {
        let model = KNNRegressor::default();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(FlightError::ModelNotFitted)
        ));
    }
}
