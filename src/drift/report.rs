//! Per-column dataset drift report

use super::DriftDetector;
use crate::error::{FlightError, Result};
use crate::utils::{column_as_f64, is_numeric_dtype};
use indexmap::IndexMap;
use ndarray::Array1;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Drift outcome for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDrift {
    /// Test p-value, absent when the test could not run
    pub p_value: Option<f64>,
    /// Whether the column drifted
    pub drift_status: bool,
    /// Why the test could not run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ColumnDrift {
    fn failed(error: &FlightError) -> Self {
        Self {
            p_value: None,
            drift_status: false,
            error: Some(error.to_string()),
        }
    }
}

/// Column name to drift outcome, in base-table column order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriftReport {
    columns: IndexMap<String, ColumnDrift>,
}

impl DriftReport {
    pub fn get(&self, column: &str) -> Option<&ColumnDrift> {
        self.columns.get(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ColumnDrift)> {
        self.columns.iter()
    }

    /// Names of drifted columns
    pub fn drifted_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|(_, c)| c.drift_status)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Names of columns whose test failed
    pub fn failed_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|(_, c)| c.error.is_some())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn any_drift(&self) -> bool {
        self.columns.values().any(|c| c.drift_status)
    }
}

fn non_null_values(df: &DataFrame, column: &str) -> Result<Array1<f64>> {
    let values: Vec<f64> = column_as_f64(df, column)?.into_iter().flatten().collect();
    Ok(Array1::from_vec(values))
}

fn test_column(
    base: &DataFrame,
    current: &DataFrame,
    column: &str,
    detector: &dyn DriftDetector,
) -> Result<ColumnDrift> {
    let reference = non_null_values(base, column)?;
    let current = non_null_values(current, column)?;
    let result = detector.detect(&reference, &current)?;
    Ok(ColumnDrift {
        p_value: Some(result.p_value),
        drift_status: result.drift_detected,
        error: None,
    })
}

/// Test every numeric column of `base` against the same column of `current`.
///
/// Non-numeric columns are skipped. A column whose test fails (missing from
/// `current`, no usable values) is recorded with its error and
/// `drift_status = false`; the remaining columns are still tested.
pub fn detect_dataset_drift(
    base: &DataFrame,
    current: &DataFrame,
    detector: &dyn DriftDetector,
) -> DriftReport {
    let mut columns = IndexMap::new();

    for column in base.get_columns() {
        if !is_numeric_dtype(column.dtype()) {
            continue;
        }
        let name = column.name().to_string();

        let outcome = match test_column(base, current, &name, detector) {
            Ok(outcome) => {
                debug!(column = %name, p_value = ?outcome.p_value, drift = outcome.drift_status, "drift test");
                outcome
            }
            Err(e) => {
                warn!(column = %name, error = %e, "drift test failed, recorded in report");
                ColumnDrift::failed(&e)
            }
        };
        columns.insert(name, outcome);
    }

    DriftReport { columns }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drift::KolmogorovSmirnovTest;
    use polars::prelude::*;

    #[test]
    fn test_report_covers_numeric_columns_only() {
        let base = df!(
            "airline" => &["A", "B", "C", "D"],
            "duration" => &[1.0, 2.0, 3.0, 4.0],
            "stops" => &[0i64, 1, 0, 1]
        )
        .unwrap();
        let current = base.clone();

        let report = detect_dataset_drift(&base, &current, &KolmogorovSmirnovTest::default());

        assert_eq!(report.len(), 2);
        assert!(report.get("airline").is_none());
        let duration = report.get("duration").unwrap();
        assert!(!duration.drift_status);
        assert_eq!(duration.p_value, Some(1.0));
        assert!(!report.any_drift());
    }

    #[test]
    fn test_missing_current_column_recorded_not_propagated() {
        let base = df!(
            "a" => &[1.0, 2.0, 3.0],
            "b" => &[4.0, 5.0, 6.0]
        )
        .unwrap();
        let current = df!("b" => &[4.0, 5.0, 6.0]).unwrap();

        let report = detect_dataset_drift(&base, &current, &KolmogorovSmirnovTest::default());

        assert_eq!(report.len(), 2);
        assert_eq!(report.failed_columns(), vec!["a"]);
        assert!(!report.get("a").unwrap().drift_status);
        assert!(report.get("b").unwrap().error.is_none());
    }

    #[test]
    fn test_all_null_column_recorded() {
        let base = df!("a" => &[None::<f64>, None]).unwrap();
        let report = detect_dataset_drift(&base, &base, &KolmogorovSmirnovTest::default());
        assert_eq!(report.failed_columns(), vec!["a"]);
    }

    #[test]
    fn test_report_serializes_as_column_map() {
        let base = df!("x" => &[1.0, 2.0, 3.0]).unwrap();
        let report = detect_dataset_drift(&base, &base, &KolmogorovSmirnovTest::default());

        let yaml = serde_yaml::to_string(&report).unwrap();
        assert!(yaml.starts_with("x:"));
        assert!(yaml.contains("drift_status: false"));
        assert!(!yaml.contains("error"));

        let parsed: DriftReport = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, report);
    }
}
