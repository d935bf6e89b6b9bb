//! Regression estimators and model selection
//!
//! Provides the estimators on the training menu:
//! - Linear models (OLS, Ridge, Lasso)
//! - Support vector regression
//! - K-Nearest Neighbors
//! - Decision trees and Random Forests
//! - AdaBoost and gradient boosting
//!
//! plus k-fold cross-validation and grid search over typed parameter grids.

mod models;
pub mod adaboost;
pub mod cross_validation;
pub mod decision_tree;
pub mod estimator;
pub mod gradient_boosting;
pub mod knn;
pub mod linear_models;
pub mod random_forest;
pub mod search;
pub mod svm;

pub use adaboost::AdaBoostRegressor;
pub use cross_validation::{cross_val_score, CVSplit, KFold};
pub use decision_tree::{DecisionTreeRegressor, TreeNode};
pub use estimator::{default_menu, Candidate, Estimator, EstimatorSpec, ParamGrid};
pub use gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
pub use knn::{DistanceMetric, KNNConfig, KNNRegressor, WeightScheme};
pub use linear_models::{LassoRegression, LinearRegression, RidgeRegression};
pub use models::{r2_score, RegressionMetrics, Regressor};
pub use random_forest::RandomForestRegressor;
pub use search::{GridSearch, GridSearchResult};
pub use svm::{KernelType, SVMConfig, SVMRegressor};
