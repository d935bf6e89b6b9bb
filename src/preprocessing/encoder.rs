//! One-hot encoding of categorical columns

use crate::error::{FlightError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Fitted categories of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMap {
    /// Column name
    pub column: String,
    /// Sorted distinct categories seen at fit time
    pub categories: Vec<String>,
}

/// One-hot encoder.
///
/// Categories are sorted. With `drop_first` the first category of every
/// column is dropped (it becomes the all-zero encoding). Unseen categories
/// and nulls also encode as all zeros.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    drop_first: bool,
    maps: Vec<CategoryMap>,
    is_fitted: bool,
}

impl Default for OneHotEncoder {
    fn default() -> Self {
        Self::new(true)
    }
}

impl OneHotEncoder {
    pub fn new(drop_first: bool) -> Self {
        Self {
            drop_first,
            maps: Vec::new(),
            is_fitted: false,
        }
    }

    /// Learn the categories of each `(column, values)` pair
    pub fn fit<'a, I>(&mut self, columns: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (&'a str, &'a [Option<String>])>,
    {
        self.maps = columns
            .into_iter()
            .map(|(name, values)| {
                let categories: BTreeSet<&String> = values.iter().flatten().collect();
                CategoryMap {
                    column: name.to_string(),
                    categories: categories.into_iter().cloned().collect(),
                }
            })
            .collect();
        self.is_fitted = true;
        Ok(self)
    }

    /// Encoded categories of one column
    fn kept(&self, map: &CategoryMap) -> usize {
        if self.drop_first {
            map.categories.len().saturating_sub(1)
        } else {
            map.categories.len()
        }
    }

    /// Fitted categories in column order
    pub fn category_maps(&self) -> &[CategoryMap] {
        &self.maps
    }

    /// Output width contributed by the column at `index`
    pub fn column_width(&self, index: usize) -> usize {
        self.maps.get(index).map_or(0, |m| self.kept(m))
    }

    /// Output column names, `<column>_<category>`
    pub fn feature_names(&self, index: usize) -> Vec<String> {
        let Some(map) = self.maps.get(index) else {
            return Vec::new();
        };
        let skip = usize::from(self.drop_first);
        map.categories
            .iter()
            .skip(skip)
            .map(|c| format!("{}_{}", map.column, c))
            .collect()
    }

    /// Position of `value` in the encoded block of column `index`, if any
    pub fn encode_value(&self, index: usize, value: Option<&str>) -> Result<Option<usize>> {
        if !self.is_fitted {
            return Err(FlightError::ModelNotFitted);
        }
        let map = self.maps.get(index).ok_or_else(|| {
            FlightError::PreprocessingError(format!("no fitted categorical column at {}", index))
        })?;
        let Some(value) = value else {
            return Ok(None);
        };
        let position = map
            .categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok();
        Ok(match position {
            Some(0) if self.drop_first => None,
            Some(p) if self.drop_first => Some(p - 1),
            other => other,
        })
    }
}
