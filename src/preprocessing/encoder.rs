//! One-hot encoding of string columns

use crate::data::coerce_numeric;
use crate::error::{ChurnError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Name of the indicator column for `level` of `column`
pub fn encoded_column_name(column: &str, level: &str) -> String {
    format!("{}_{}", column, level)
}

/// One-hot encoder with optional first-level dropping
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    drop_first: bool,
    /// column -> encoded levels (sorted, first level already dropped when `drop_first`)
    levels: BTreeMap<String, Vec<String>>,
    is_fitted: bool,
}

impl OneHotEncoder {
    /// Create a new encoder
    pub fn new(drop_first: bool) -> Self {
        Self {
            drop_first,
            levels: BTreeMap::new(),
            is_fitted: false,
        }
    }

    /// Learn levels for every string column except `exclude`
    pub fn fit(&mut self, df: &DataFrame, exclude: &[&str]) -> Result<&mut Self> {
        self.levels.clear();

        for column in df.get_columns() {
            let name = column.name().as_str();
            let series = column.as_materialized_series();
            if exclude.contains(&name) || series.dtype() != &DataType::String {
                continue;
            }

            let distinct: BTreeSet<String> = series
                .str()?
                .into_iter()
                .flatten()
                .map(str::to_string)
                .collect();

            let skip = if self.drop_first { 1 } else { 0 };
            let kept: Vec<String> = distinct.into_iter().skip(skip).collect();
            self.levels.insert(name.to_string(), kept);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Encoded levels per column
    pub fn levels(&self) -> &BTreeMap<String, Vec<String>> {
        &self.levels
    }

    /// Replace each fitted string column with its indicator columns, keeping column order.
    /// Non-string columns become `f64` with nulls filled by 0.
    pub fn transform(&self, df: &DataFrame, exclude: &[&str]) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ChurnError::ModelNotFitted);
        }

        let mut columns: Vec<Column> = Vec::new();

        for column in df.get_columns() {
            let name = column.name().as_str();
            let series = column.as_materialized_series();

            if exclude.contains(&name) {
                columns.push(column.clone());
                continue;
            }

            match self.levels.get(name) {
                Some(levels) => {
                    let ca = series.str().map_err(|_| {
                        ChurnError::PreprocessingError(format!(
                            "column '{}' was categorical at fit time",
                            name
                        ))
                    })?;
                    for level in levels {
                        let values: Vec<i32> = ca
                            .into_iter()
                            .map(|v| if v == Some(level.as_str()) { 1 } else { 0 })
                            .collect();
                        columns.push(Series::new(encoded_column_name(name, level).into(), values).into());
                    }
                }
                None => {
                    let values: Vec<f64> = coerce_numeric(series)
                        .into_iter()
                        .map(|v| v.unwrap_or(0.0))
                        .collect();
                    columns.push(Series::new(name.into(), values).into());
                }
            }
        }

        Ok(DataFrame::new(columns)?)
    }
}
