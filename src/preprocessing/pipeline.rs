//! Feature preprocessing pipeline

use super::{encoder::OneHotEncoder, scaler::StandardScaler};
use crate::error::{FlightError, Result};
use crate::utils::{column_as_f64, column_as_str, is_numeric_dtype};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// How a raw input column is turned into features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// Passed through, nulls replaced by the fitted mean
    Numeric,
    /// One-hot encoded
    Categorical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InputColumn {
    name: String,
    column_type: ColumnType,
    /// Mean of the training values, used for nulls
    fill_value: f64,
    /// Index into the encoder's category maps
    encoder_index: Option<usize>,
}

/// Turns a raw feature table into a dense scaled matrix.
///
/// String columns are one-hot encoded (sorted categories, first dropped,
/// unseen values all zeros), numeric columns are passed through, and every
/// output column is then standard-scaled. Output columns follow input column
/// order, with each categorical column expanded in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeaturePreprocessor {
    columns: Vec<InputColumn>,
    encoder: OneHotEncoder,
    scaler: StandardScaler,
    feature_names: Vec<String>,
    is_fitted: bool,
    /// Seconds spent in the last fit call
    fit_time: Option<f64>,
}

impl FeaturePreprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit on a table of training features
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let start = Instant::now();

        if df.width() == 0 {
            return Err(FlightError::PreprocessingError(
                "no feature columns to fit on".to_string(),
            ));
        }
        if df.height() == 0 {
            return Err(FlightError::PreprocessingError(
                "no rows to fit on".to_string(),
            ));
        }

        let mut columns = Vec::with_capacity(df.width());
        let mut categorical: Vec<(String, Vec<Option<String>>)> = Vec::new();

        for column in df.get_columns() {
            let name = column.name().to_string();
            if is_numeric_dtype(column.dtype()) {
                let values = column_as_f64(df, &name)?;
                let present: Vec<f64> = values.into_iter().flatten().collect();
                let fill_value = if present.is_empty() {
                    0.0
                } else {
                    present.iter().sum::<f64>() / present.len() as f64
                };
                columns.push(InputColumn {
                    name,
                    column_type: ColumnType::Numeric,
                    fill_value,
                    encoder_index: None,
                });
            } else {
                let values = column_as_str(df, &name)?;
                columns.push(InputColumn {
                    name: name.clone(),
                    column_type: ColumnType::Categorical,
                    fill_value: 0.0,
                    encoder_index: Some(categorical.len()),
                });
                categorical.push((name, values));
            }
        }

        let mut encoder = OneHotEncoder::default();
        encoder.fit(
            categorical
                .iter()
                .map(|(name, values)| (name.as_str(), values.as_slice())),
        )?;

        self.columns = columns;
        self.encoder = encoder;
        self.feature_names = self.build_feature_names();

        let raw = self.encode(df)?;
        self.scaler = StandardScaler::new();
        self.scaler.fit(&raw)?;
        self.is_fitted = true;

        let elapsed = start.elapsed().as_secs_f64();
        self.fit_time = Some(elapsed);
        debug!(
            inputs = self.columns.len(),
            categorical = categorical.len(),
            features = self.feature_names.len(),
            elapsed_secs = elapsed,
            "fitted feature preprocessor"
        );
        Ok(self)
    }

    /// Transform a feature table with the fitted encoding and scaling
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(FlightError::ModelNotFitted);
        }
        let raw = self.encode(df)?;
        self.scaler.transform(&raw)
    }

    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<Array2<f64>> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Number of output feature columns
    pub fn feature_width(&self) -> usize {
        self.feature_names.len()
    }

    /// Output feature names in column order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Input columns seen at fit time, with how each is treated
    pub fn input_columns(&self) -> Vec<(&str, ColumnType)> {
        self.columns
            .iter()
            .map(|c| (c.name.as_str(), c.column_type))
            .collect()
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn fit_time(&self) -> Option<f64> {
        self.fit_time
    }

    fn build_feature_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for column in &self.columns {
            match column.encoder_index {
                Some(index) => names.extend(self.encoder.feature_names(index)),
                None => names.push(column.name.clone()),
            }
        }
        names
    }

    /// Unscaled matrix: numeric values and one-hot blocks
    fn encode(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let n_rows = df.height();
        let mut out = Array2::<f64>::zeros((n_rows, self.feature_names.len()));
        let mut offset = 0;

        for column in &self.columns {
            if df.column(&column.name).is_err() {
                return Err(FlightError::FeatureNotFound(column.name.clone()));
            }
            match column.encoder_index {
                None => {
                    let values = column_as_f64(df, &column.name)?;
                    for (row, value) in values.into_iter().enumerate() {
                        out[[row, offset]] = match value {
                            Some(v) if v.is_finite() => v,
                            _ => column.fill_value,
                        };
                    }
                    offset += 1;
                }
                Some(index) => {
                    let values = column_as_str(df, &column.name)?;
                    for (row, value) in values.iter().enumerate() {
                        if let Some(position) = self.encoder.encode_value(index, value.as_deref())? {
                            out[[row, offset + position]] = 1.0;
                        }
                    }
                    offset += self.encoder.column_width(index);
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flights() -> DataFrame {
        df!(
            "airline" => &["IndiGo", "Air India", "IndiGo", "Vistara"],
            "duration" => &[2.5, 5.0, 2.0, 3.5],
            "stops" => &[0i64, 1, 0, 1]
        )
        .unwrap()
    }

    #[test]
    fn test_fit_layout() {
        let mut pre = FeaturePreprocessor::new();
        pre.fit(&flights()).unwrap();

        // Air India is the dropped first category
        assert_eq!(
            pre.feature_names(),
            &["airline_IndiGo", "airline_Vistara", "duration", "stops"]
        );
        assert_eq!(pre.feature_width(), 4);
        assert_eq!(
            pre.input_columns(),
            vec![
                ("airline", ColumnType::Categorical),
                ("duration", ColumnType::Numeric),
                ("stops", ColumnType::Numeric)
            ]
        );
    }

    #[test]
    fn test_transformed_columns_are_standardized() {
        let mut pre = FeaturePreprocessor::new();
        let x = pre.fit_transform(&flights()).unwrap();

        assert_eq!(x.dim(), (4, 4));
        for column in x.columns() {
            assert_relative_eq!(column.mean().unwrap(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_unseen_category_encodes_as_dropped() {
        let mut pre = FeaturePreprocessor::new();
        pre.fit(&flights()).unwrap();

        let seen = df!("airline" => &["Air India"], "duration" => &[3.0], "stops" => &[0i64]).unwrap();
        let unseen = df!("airline" => &["SpiceJet"], "duration" => &[3.0], "stops" => &[0i64]).unwrap();

        let a = pre.transform(&seen).unwrap();
        let b = pre.transform(&unseen).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_null_numeric_uses_training_mean() {
        let train = df!("x" => &[Some(1.0), Some(3.0), None]).unwrap();
        let mut pre = FeaturePreprocessor::new();
        let out = pre.fit_transform(&train).unwrap();

        // Null filled with 2.0, which is also the scaler mean
        assert_relative_eq!(out[[2, 0]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_column_is_error() {
        let mut pre = FeaturePreprocessor::new();
        pre.fit(&flights()).unwrap();

        let partial = df!("airline" => &["IndiGo"], "duration" => &[1.0]).unwrap();
        assert!(matches!(
            pre.transform(&partial),
            Err(FlightError::FeatureNotFound(name)) if name == "stops"
        ));
    }

    #[test]
    fn test_transform_before_fit() {
        let pre = FeaturePreprocessor::new();
        assert!(matches!(pre.transform(&flights()), Err(FlightError::ModelNotFitted)));
    }

    #[test]
    fn test_serde_round_trip_keeps_behavior() {
        let mut pre = FeaturePreprocessor::new();
        pre.fit(&flights()).unwrap();

        let bytes = bincode::serialize(&pre).unwrap();
        let restored: FeaturePreprocessor = bincode::deserialize(&bytes).unwrap();
        assert_eq!(
            restored.transform(&flights()).unwrap(),
            pre.transform(&flights()).unwrap()
        );
    }
}
