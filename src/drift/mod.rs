//! Drift detection module
//!
//! Compares the distribution of each numeric column between a base table
//! and a current table and reports which columns drifted.

mod ks;
mod report;

pub use ks::KolmogorovSmirnovTest;
pub use report::{detect_dataset_drift, ColumnDrift, DriftReport};

use crate::error::Result;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Drift detection result for one column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftResult {
    /// Whether drift was detected
    pub drift_detected: bool,
    /// Test statistic
    pub statistic: f64,
    /// P-value of the equality hypothesis
    pub p_value: f64,
    /// Significance level used for detection
    pub threshold: f64,
}

/// Trait for two-sample drift detectors
pub trait DriftDetector: Send + Sync {
    /// Detect drift between reference and current samples
    fn detect(&self, reference: &Array1<f64>, current: &Array1<f64>) -> Result<DriftResult>;

    /// Get the threshold used for detection
    fn threshold(&self) -> f64;
}
