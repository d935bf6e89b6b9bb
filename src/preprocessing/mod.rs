//! Data preprocessing module
//!
//! Turns raw feature tables into dense numeric matrices:
//! - One-hot encoding of categorical columns
//! - Mean imputation of numeric nulls
//! - Standard scaling of every output column

mod encoder;
mod pipeline;
mod scaler;

pub use encoder::{CategoryMap, OneHotEncoder};
pub use pipeline::{ColumnType, FeaturePreprocessor};
pub use scaler::StandardScaler;
