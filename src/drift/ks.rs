//! Two-sample Kolmogorov-Smirnov test

use super::{DriftDetector, DriftResult};
use crate::error::{FlightError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Two-sample Kolmogorov-Smirnov test with an asymptotic p-value.
///
/// Drift is flagged when `p_value <= alpha`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KolmogorovSmirnovTest {
    /// Significance level (alpha)
    alpha: f64,
}

impl KolmogorovSmirnovTest {
    /// Create new KS test
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    /// Largest gap between the two empirical CDFs. Both slices must be sorted.
    pub fn statistic(reference: &[f64], current: &[f64]) -> f64 {
        let n1 = reference.len() as f64;
        let n2 = current.len() as f64;
        let (mut i, mut j) = (0, 0);
        let mut max_gap = 0.0f64;

        while i < reference.len() && j < current.len() {
            let value = reference[i].min(current[j]);
            while i < reference.len() && reference[i] <= value {
                i += 1;
            }
            while j < current.len() && current[j] <= value {
                j += 1;
            }
            max_gap = max_gap.max((i as f64 / n1 - j as f64 / n2).abs());
        }
        max_gap
    }

    /// P-value for statistic `d` with sample sizes `n1` and `n2`, using the
    /// effective sample size correction of Stephens (1970).
    pub fn p_value(d: f64, n1: usize, n2: usize) -> f64 {
        let en = ((n1 * n2) as f64 / (n1 + n2) as f64).sqrt();
        kolmogorov_q((en + 0.12 + 0.11 / en) * d)
    }
}

impl Default for KolmogorovSmirnovTest {
    fn default() -> Self {
        Self::new(0.05)
    }
}

/// Complementary Kolmogorov distribution `Q_KS(z) = P(K > z)`
fn kolmogorov_q(z: f64) -> f64 {
    if z <= 0.0 {
        return 1.0;
    }
    let q = if z < 1.18 {
        let y = (-std::f64::consts::PI.powi(2) / (8.0 * z * z)).exp();
        let p = (2.0 * std::f64::consts::PI).sqrt() / z
            * (y + y.powi(9) + y.powi(25) + y.powi(49));
        1.0 - p
    } else {
        let x = (-2.0 * z * z).exp();
        2.0 * (x - x.powi(4) + x.powi(9))
    };
    q.clamp(0.0, 1.0)
}

impl DriftDetector for KolmogorovSmirnovTest {
    fn detect(&self, reference: &Array1<f64>, current: &Array1<f64>) -> Result<DriftResult> {
        if reference.is_empty() || current.is_empty() {
            return Err(FlightError::DataError(
                "KS test needs at least one value in each sample".to_string(),
            ));
        }
        if reference.iter().chain(current.iter()).any(|v| v.is_nan()) {
            return Err(FlightError::DataError(
                "KS test samples contain NaN".to_string(),
            ));
        }

        let mut ref_sorted = reference.to_vec();
        let mut cur_sorted = current.to_vec();
        ref_sorted.sort_by(f64::total_cmp);
        cur_sorted.sort_by(f64::total_cmp);

        let statistic = Self::statistic(&ref_sorted, &cur_sorted);
        let p_value = Self::p_value(statistic, ref_sorted.len(), cur_sorted.len());

        Ok(DriftResult {
            drift_detected: p_value <= self.alpha,
            statistic,
            p_value,
            threshold: self.alpha,
        })
    }

    fn threshold(&self) -> f64 {
        self.alpha
    }
}
