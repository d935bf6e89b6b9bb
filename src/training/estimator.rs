//! Typed estimator menu
//!
//! [`EstimatorSpec`] names an algorithm together with its hyperparameters,
//! [`ParamGrid`] the values to search for it, and [`Estimator`] is the
//! fitted model produced from a spec.

use super::adaboost::AdaBoostRegressor;
use super::decision_tree::DecisionTreeRegressor;
use super::gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
use super::knn::{DistanceMetric, KNNConfig, KNNRegressor, WeightScheme};
use super::linear_models::{LassoRegression, LinearRegression, RidgeRegression};
use super::models::Regressor;
use super::random_forest::RandomForestRegressor;
use super::svm::{KernelType, SVMConfig, SVMRegressor};
use crate::error::{FlightError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An algorithm and its hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimatorSpec {
    LinearRegression,
    Ridge {
        alpha: f64,
    },
    Lasso {
        alpha: f64,
    },
    Svr {
        kernel: KernelType,
        c: f64,
        epsilon: f64,
    },
    KNeighbors {
        n_neighbors: usize,
        #[serde(default)]
        metric: DistanceMetric,
        #[serde(default)]
        weights: WeightScheme,
    },
    DecisionTree {
        max_depth: Option<usize>,
        min_samples_split: usize,
        min_samples_leaf: usize,
    },
    RandomForest {
        n_estimators: usize,
        max_depth: Option<usize>,
        min_samples_split: usize,
        min_samples_leaf: usize,
    },
    AdaBoost {
        n_estimators: usize,
        learning_rate: f64,
    },
    GradientBoosting {
        n_estimators: usize,
        learning_rate: f64,
        max_depth: usize,
        subsample: f64,
        colsample_bytree: f64,
    },
}

impl EstimatorSpec {
    pub fn ridge() -> Self {
        EstimatorSpec::Ridge { alpha: 1.0 }
    }

    pub fn lasso() -> Self {
        EstimatorSpec::Lasso { alpha: 1.0 }
    }

    pub fn svr() -> Self {
        let config = SVMConfig::default();
        EstimatorSpec::Svr {
            kernel: config.kernel,
            c: config.c,
            epsilon: config.epsilon,
        }
    }

    pub fn k_neighbors() -> Self {
        let config = KNNConfig::default();
        EstimatorSpec::KNeighbors {
            n_neighbors: config.n_neighbors,
            metric: config.metric,
            weights: config.weights,
        }
    }

    pub fn decision_tree() -> Self {
        EstimatorSpec::DecisionTree {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }

    pub fn random_forest() -> Self {
        EstimatorSpec::RandomForest {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }

    pub fn adaboost() -> Self {
        EstimatorSpec::AdaBoost {
            n_estimators: 50,
            learning_rate: 1.0,
        }
    }

    pub fn gradient_boosting() -> Self {
        Self::from_boosting_config(&GradientBoostingConfig::default())
    }

    pub fn stochastic_gradient_boosting() -> Self {
        Self::from_boosting_config(&GradientBoostingConfig::stochastic())
    }

    fn from_boosting_config(config: &GradientBoostingConfig) -> Self {
        EstimatorSpec::GradientBoosting {
            n_estimators: config.n_estimators,
            learning_rate: config.learning_rate,
            max_depth: config.max_depth,
            subsample: config.subsample,
            colsample_bytree: config.colsample_bytree,
        }
    }

    /// Unfitted estimator for this spec. `seed` pins every random choice.
    pub fn build(&self, seed: Option<u64>) -> Estimator {
        match *self {
            EstimatorSpec::LinearRegression => Estimator::LinearRegression(LinearRegression::new()),
            EstimatorSpec::Ridge { alpha } => Estimator::Ridge(RidgeRegression::new(alpha)),
            EstimatorSpec::Lasso { alpha } => Estimator::Lasso(LassoRegression::new(alpha)),
            EstimatorSpec::Svr { kernel, c, epsilon } => Estimator::Svr(SVMRegressor::new(SVMConfig {
                kernel,
                c,
                epsilon,
                random_state: seed.or(SVMConfig::default().random_state),
                ..SVMConfig::default()
            })),
            EstimatorSpec::KNeighbors {
                n_neighbors,
                metric,
                weights,
            } => Estimator::KNeighbors(KNNRegressor::new(KNNConfig {
                n_neighbors,
                metric,
                weights,
            })),
            EstimatorSpec::DecisionTree {
                max_depth,
                min_samples_split,
                min_samples_leaf,
            } => {
                let mut tree = DecisionTreeRegressor::new()
                    .with_max_depth(max_depth)
                    .with_min_samples_split(min_samples_split)
                    .with_min_samples_leaf(min_samples_leaf);
                if let Some(seed) = seed {
                    tree = tree.with_random_state(seed);
                }
                Estimator::DecisionTree(tree)
            }
            EstimatorSpec::RandomForest {
                n_estimators,
                max_depth,
                min_samples_split,
                min_samples_leaf,
            } => {
                let mut forest = RandomForestRegressor::new(n_estimators)
                    .with_max_depth(max_depth)
                    .with_min_samples_split(min_samples_split)
                    .with_min_samples_leaf(min_samples_leaf);
                if let Some(seed) = seed {
                    forest = forest.with_random_state(seed);
                }
                Estimator::RandomForest(forest)
            }
            EstimatorSpec::AdaBoost {
                n_estimators,
                learning_rate,
            } => {
                let mut model = AdaBoostRegressor::new(n_estimators, learning_rate);
                if let Some(seed) = seed {
                    model = model.with_random_state(seed);
                }
                Estimator::AdaBoost(model)
            }
            EstimatorSpec::GradientBoosting {
                n_estimators,
                learning_rate,
                max_depth,
                subsample,
                colsample_bytree,
            } => Estimator::GradientBoosting(GradientBoostingRegressor::new(
                GradientBoostingConfig {
                    n_estimators,
                    learning_rate,
                    max_depth,
                    subsample,
                    colsample_bytree,
                    random_state: seed,
                    ..GradientBoostingConfig::default()
                },
            )),
        }
    }
}

impl fmt::Display for EstimatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimatorSpec::LinearRegression => write!(f, "LinearRegression"),
            EstimatorSpec::Ridge { alpha } => write!(f, "Ridge(alpha={})", alpha),
            EstimatorSpec::Lasso { alpha } => write!(f, "Lasso(alpha={})", alpha),
            EstimatorSpec::Svr { kernel, c, epsilon } => {
                write!(f, "SVR(kernel={:?}, C={}, epsilon={})", kernel, c, epsilon)
            }
            EstimatorSpec::KNeighbors {
                n_neighbors,
                metric,
                weights,
            } => write!(
                f,
                "KNeighbors(n_neighbors={}, metric={:?}, weights={:?})",
                n_neighbors, metric, weights
            ),
            EstimatorSpec::DecisionTree {
                max_depth,
                min_samples_split,
                min_samples_leaf,
            } => write!(
                f,
                "DecisionTree(max_depth={:?}, min_samples_split={}, min_samples_leaf={})",
                max_depth, min_samples_split, min_samples_leaf
            ),
            EstimatorSpec::RandomForest {
                n_estimators,
                max_depth,
                min_samples_split,
                min_samples_leaf,
            } => write!(
                f,
                "RandomForest(n_estimators={}, max_depth={:?}, min_samples_split={}, min_samples_leaf={})",
                n_estimators, max_depth, min_samples_split, min_samples_leaf
            ),
            EstimatorSpec::AdaBoost {
                n_estimators,
                learning_rate,
            } => write!(
                f,
                "AdaBoost(n_estimators={}, learning_rate={})",
                n_estimators, learning_rate
            ),
            EstimatorSpec::GradientBoosting {
                n_estimators,
                learning_rate,
                max_depth,
                subsample,
                colsample_bytree,
            } => write!(
                f,
                "GradientBoosting(n_estimators={}, learning_rate={}, max_depth={}, subsample={}, colsample_bytree={})",
                n_estimators, learning_rate, max_depth, subsample, colsample_bytree
            ),
        }
    }
}

/// Hyperparameter values to search for one algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamGrid {
    RandomForest {
        n_estimators: Vec<usize>,
        max_depth: Vec<Option<usize>>,
        min_samples_split: Vec<usize>,
        min_samples_leaf: Vec<usize>,
    },
    AdaBoost {
        n_estimators: Vec<usize>,
        learning_rate: Vec<f64>,
    },
    GradientBoosting {
        n_estimators: Vec<usize>,
        learning_rate: Vec<f64>,
        max_depth: Vec<usize>,
    },
}

impl ParamGrid {
    pub fn random_forest() -> Self {
        ParamGrid::RandomForest {
            n_estimators: vec![50, 100, 200],
            max_depth: vec![None, Some(10), Some(20), Some(30)],
            min_samples_split: vec![2, 5, 10],
            min_samples_leaf: vec![1, 2, 4],
        }
    }

    pub fn adaboost() -> Self {
        ParamGrid::AdaBoost {
            n_estimators: vec![50, 100, 200],
            learning_rate: vec![0.01, 0.1, 0.2, 0.3],
        }
    }

    pub fn gradient_boosting() -> Self {
        ParamGrid::GradientBoosting {
            n_estimators: vec![100, 200],
            learning_rate: vec![0.05, 0.1],
            max_depth: vec![3, 5],
        }
    }

    /// Number of parameter combinations
    pub fn len(&self) -> usize {
        match self {
            ParamGrid::RandomForest {
                n_estimators,
                max_depth,
                min_samples_split,
                min_samples_leaf,
            } => n_estimators.len() * max_depth.len() * min_samples_split.len() * min_samples_leaf.len(),
            ParamGrid::AdaBoost {
                n_estimators,
                learning_rate,
            } => n_estimators.len() * learning_rate.len(),
            ParamGrid::GradientBoosting {
                n_estimators,
                learning_rate,
                max_depth,
            } => n_estimators.len() * learning_rate.len() * max_depth.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every combination applied to `base`, in row-major order of the grid
    /// axes. Parameters the grid does not mention keep their base value.
    pub fn candidates(&self, base: &EstimatorSpec) -> Result<Vec<EstimatorSpec>> {
        if self.is_empty() {
            return Err(FlightError::ConfigError(format!(
                "parameter grid for {} has an empty axis",
                base
            )));
        }

        let specs = match (self, base) {
            (
                ParamGrid::RandomForest {
                    n_estimators,
                    max_depth,
                    min_samples_split,
                    min_samples_leaf,
                },
                EstimatorSpec::RandomForest { .. },
            ) => {
                let mut specs = Vec::with_capacity(self.len());
                for &n in n_estimators {
                    for &depth in max_depth {
                        for &split in min_samples_split {
                            for &leaf in min_samples_leaf {
                                specs.push(EstimatorSpec::RandomForest {
                                    n_estimators: n,
                                    max_depth: depth,
                                    min_samples_split: split,
                                    min_samples_leaf: leaf,
                                });
                            }
                        }
                    }
                }
                specs
            }
            (
                ParamGrid::AdaBoost {
                    n_estimators,
                    learning_rate,
                },
                EstimatorSpec::AdaBoost { .. },
            ) => n_estimators
                .iter()
                .flat_map(|&n| {
                    learning_rate.iter().map(move |&lr| EstimatorSpec::AdaBoost {
                        n_estimators: n,
                        learning_rate: lr,
                    })
                })
                .collect(),
            (
                ParamGrid::GradientBoosting {
                    n_estimators,
                    learning_rate,
                    max_depth,
                },
                EstimatorSpec::GradientBoosting {
                    subsample,
                    colsample_bytree,
                    ..
                },
            ) => {
                let mut specs = Vec::with_capacity(self.len());
                for &n in n_estimators {
                    for &lr in learning_rate {
                        for &depth in max_depth {
                            specs.push(EstimatorSpec::GradientBoosting {
                                n_estimators: n,
                                learning_rate: lr,
                                max_depth: depth,
                                subsample: *subsample,
                                colsample_bytree: *colsample_bytree,
                            });
                        }
                    }
                }
                specs
            }
            _ => {
                return Err(FlightError::ConfigError(format!(
                    "parameter grid does not apply to {}",
                    base
                )))
            }
        };
        Ok(specs)
    }
}

/// One entry of the training menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Name reported in logs, tracking and the training artifact
    pub name: String,
    pub spec: EstimatorSpec,
    #[serde(default)]
    pub grid: Option<ParamGrid>,
}

impl Candidate {
    pub fn new(name: impl Into<String>, spec: EstimatorSpec) -> Self {
        Self {
            name: name.into(),
            spec,
            grid: None,
        }
    }

    pub fn with_grid(mut self, grid: ParamGrid) -> Self {
        self.grid = Some(grid);
        self
    }
}

/// The default menu, in selection order
pub fn default_menu() -> Vec<Candidate> {
    vec![
        Candidate::new("LinearRegression", EstimatorSpec::LinearRegression),
        Candidate::new("Ridge", EstimatorSpec::ridge()),
        Candidate::new("Lasso", EstimatorSpec::lasso()),
        Candidate::new("SVR", EstimatorSpec::svr()),
        Candidate::new("KNeighborsRegressor", EstimatorSpec::k_neighbors()),
        Candidate::new("DecisionTreeRegressor", EstimatorSpec::decision_tree()),
        Candidate::new("RandomForestRegressor", EstimatorSpec::random_forest())
            .with_grid(ParamGrid::random_forest()),
        Candidate::new("AdaBoostRegressor", EstimatorSpec::adaboost())
            .with_grid(ParamGrid::adaboost()),
        Candidate::new("GradientBoostingRegressor", EstimatorSpec::gradient_boosting())
            .with_grid(ParamGrid::gradient_boosting()),
        Candidate::new(
            "StochasticGradientBoostingRegressor",
            EstimatorSpec::stochastic_gradient_boosting(),
        ),
    ]
}

/// A fitted (or fit-ready) model from the menu
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Estimator {
    LinearRegression(LinearRegression),
    Ridge(RidgeRegression),
    Lasso(LassoRegression),
    Svr(SVMRegressor),
    KNeighbors(KNNRegressor),
    DecisionTree(DecisionTreeRegressor),
    RandomForest(RandomForestRegressor),
    AdaBoost(AdaBoostRegressor),
    GradientBoosting(GradientBoostingRegressor),
}

impl Estimator {
    fn as_regressor(&self) -> &dyn Regressor {
        match self {
            Estimator::LinearRegression(m) => m,
            Estimator::Ridge(m) => m,
            Estimator::Lasso(m) => m,
            Estimator::Svr(m) => m,
            Estimator::KNeighbors(m) => m,
            Estimator::DecisionTree(m) => m,
            Estimator::RandomForest(m) => m,
            Estimator::AdaBoost(m) => m,
            Estimator::GradientBoosting(m) => m,
        }
    }

    fn as_regressor_mut(&mut self) -> &mut dyn Regressor {
        match self {
            Estimator::LinearRegression(m) => m,
            Estimator::Ridge(m) => m,
            Estimator::Lasso(m) => m,
            Estimator::Svr(m) => m,
            Estimator::KNeighbors(m) => m,
            Estimator::DecisionTree(m) => m,
            Estimator::RandomForest(m) => m,
            Estimator::AdaBoost(m) => m,
            Estimator::GradientBoosting(m) => m,
        }
    }
}

impl Estimator {
    /// Normalized per-feature importances, for the tree-based estimators
    pub fn feature_importances(&self) -> Option<Vec<f64>> {
        match self {
            Estimator::DecisionTree(m) => m.feature_importances().map(|imp| imp.to_vec()),
            Estimator::RandomForest(m) => m.feature_importances().map(|imp| imp.to_vec()),
            Estimator::GradientBoosting(m) if m.n_trees() > 0 => {
                Some(m.feature_importances().to_vec())
            }
            _ => None,
        }
    }
}

impl Regressor for Estimator {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.as_regressor_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.as_regressor().predict(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_candidates_cartesian_product() {
        let grid = ParamGrid::AdaBoost {
            n_estimators: vec![10, 20],
            learning_rate: vec![0.1, 0.5, 1.0],
        };
        let specs = grid.candidates(&EstimatorSpec::adaboost()).unwrap();

        assert_eq!(specs.len(), 6);
        assert_eq!(
            specs[0],
            EstimatorSpec::AdaBoost {
                n_estimators: 10,
                learning_rate: 0.1
            }
        );
        assert_eq!(
            specs[5],
            EstimatorSpec::AdaBoost {
                n_estimators: 20,
                learning_rate: 1.0
            }
        );
    }

    #[test]
    fn test_default_grid_sizes() {
        assert_eq!(ParamGrid::random_forest().len(), 108);
        assert_eq!(ParamGrid::adaboost().len(), 12);
    }

    #[test]
    fn test_grid_keeps_base_subsampling() {
        let grid = ParamGrid::GradientBoosting {
            n_estimators: vec![5],
            learning_rate: vec![0.1],
            max_depth: vec![2],
        };
        let specs = grid
            .candidates(&EstimatorSpec::stochastic_gradient_boosting())
            .unwrap();
        match &specs[0] {
            EstimatorSpec::GradientBoosting { subsample, .. } => assert_eq!(*subsample, 0.8),
            other => panic!("unexpected spec {}", other),
        }
    }

    #[test]
    fn test_gradient_boosting_grid_follows_axis_order() {
        let grid = ParamGrid::GradientBoosting {
            n_estimators: vec![10],
            learning_rate: vec![0.05, 0.1],
            max_depth: vec![3, 5],
        };
        let specs = grid.candidates(&EstimatorSpec::gradient_boosting()).unwrap();

        let order: Vec<(f64, usize)> = specs
            .iter()
            .map(|spec| match spec {
                EstimatorSpec::GradientBoosting {
                    learning_rate,
                    max_depth,
                    ..
                } => (*learning_rate, *max_depth),
                other => panic!("unexpected spec {}", other),
            })
            .collect();
        assert_eq!(order, vec![(0.05, 3), (0.05, 5), (0.1, 3), (0.1, 5)]);
    }

    #[test]
    fn test_k_neighbors_spec_configures_metric_and_weights() {
        let yaml = "name: Neighbors\nspec:\n  kind: k_neighbors\n  n_neighbors: 3\n  metric: Manhattan\n  weights: Distance\n";
        let candidate: Candidate = serde_yaml::from_str(yaml).unwrap();

        match candidate.spec.build(None) {
            Estimator::KNeighbors(model) => {
                assert_eq!(model.config().n_neighbors, 3);
                assert_eq!(model.config().metric, DistanceMetric::Manhattan);
                assert_eq!(model.config().weights, WeightScheme::Distance);
            }
            other => panic!("unexpected estimator {:?}", other),
        }

        // Metric and weights default when omitted
        let yaml = "kind: k_neighbors\nn_neighbors: 4\n";
        let spec: EstimatorSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            spec,
            EstimatorSpec::KNeighbors {
                n_neighbors: 4,
                metric: DistanceMetric::Euclidean,
                weights: WeightScheme::Uniform,
            }
        );
    }

    #[test]
    fn test_mismatched_grid_rejected() {
        let result = ParamGrid::adaboost().candidates(&EstimatorSpec::LinearRegression);
        assert!(matches!(result, Err(FlightError::ConfigError(_))));
    }

    #[test]
    fn test_empty_axis_rejected() {
        let grid = ParamGrid::AdaBoost {
            n_estimators: vec![],
            learning_rate: vec![0.1],
        };
        assert!(grid.candidates(&EstimatorSpec::adaboost()).is_err());
    }

    #[test]
    fn test_default_menu_order() {
        let names: Vec<String> = default_menu().into_iter().map(|c| c.name).collect();
        assert_eq!(names.len(), 10);
        assert_eq!(names[0], "LinearRegression");
        assert_eq!(names[6], "RandomForestRegressor");
    }

    #[test]
    fn test_spec_yaml_roundtrip() {
        let yaml = "name: Forest\nspec:\n  kind: random_forest\n  n_estimators: 10\n  max_depth: ~\n  min_samples_split: 2\n  min_samples_leaf: 1\n";
        let candidate: Candidate = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(candidate.grid, None);
        assert!(matches!(
            candidate.spec,
            EstimatorSpec::RandomForest {
                n_estimators: 10,
                max_depth: None,
                ..
            }
        ));
    }

    #[test]
    fn test_feature_importances_only_for_trees() {
        use ndarray::array;
        let x = Array2::from_shape_fn((8, 2), |(i, j)| if j == 0 { i as f64 } else { 1.0 });
        let y = array![1.0, 1.0, 1.0, 1.0, 5.0, 5.0, 5.0, 5.0];

        let mut forest = EstimatorSpec::RandomForest {
            n_estimators: 5,
            max_depth: Some(2),
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
        .build(Some(3));
        assert!(forest.feature_importances().is_none());
        forest.fit(&x, &y).unwrap();
        let importances = forest.feature_importances().unwrap();
        assert_eq!(importances.len(), 2);
        assert!(importances[0] > importances[1]);

        let mut linear = EstimatorSpec::LinearRegression.build(None);
        linear.fit(&x, &y).unwrap();
        assert!(linear.feature_importances().is_none());
    }

    #[test]
    fn test_estimator_dispatch() {
        use ndarray::array;
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![1.0, 3.0, 5.0, 7.0];

        let mut estimator = EstimatorSpec::LinearRegression.build(None);
        estimator.fit(&x, &y).unwrap();
        assert!(estimator.score(&x, &y).unwrap() > 0.9999);
    }
}
