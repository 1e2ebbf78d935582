//! Raw-table cleaning: whitespace, identifiers, numeric coercion and label normalization

use super::PreprocessingConfig;
use crate::data::coerce_numeric;
use crate::error::{ChurnError, Result};
use polars::prelude::*;
use tracing::{debug, info};

/// Clean a raw customer table into a typed table ready for feature building
pub fn preprocess_data(df: &DataFrame, config: &PreprocessingConfig) -> Result<DataFrame> {
    if df.column(&config.target_column).is_err() {
        return Err(ChurnError::PreprocessingError(format!(
            "target column '{}' not found",
            config.target_column
        )));
    }

    let mut columns: Vec<Column> = Vec::with_capacity(df.width());

    for column in df.get_columns() {
        let name = column.name().as_str();
        let series = column.as_materialized_series();

        if config.id_columns.iter().any(|c| c == name) {
            debug!(column = name, "Dropping identifier column");
            continue;
        }

        let cleaned = if name == config.target_column {
            normalize_label(series, config)?
        } else if config.coerce_numeric_columns.iter().any(|c| c == name) {
            let values: Vec<f64> = coerce_numeric(series)
                .into_iter()
                .map(|v| v.unwrap_or(config.fill_value))
                .collect();
            Series::new(name.into(), values)
        } else if series.dtype() == &DataType::String {
            trim_strings(series)?
        } else {
            series.clone()
        };

        columns.push(cleaned.into());
    }

    let cleaned = DataFrame::new(columns)?;
    info!(rows = cleaned.height(), columns = cleaned.width(), "Preprocessed data");
    Ok(cleaned)
}

fn trim_strings(series: &Series) -> Result<Series> {
    let ca = series.str()?;
    let values: Vec<Option<String>> = ca
        .into_iter()
        .map(|v| v.map(|s| s.trim().to_string()))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Map the label column to 0/1
fn normalize_label(series: &Series, config: &PreprocessingConfig) -> Result<Series> {
    let name = series.name().clone();

    let labels: Vec<i32> = if series.dtype() == &DataType::String {
        series
            .str()?
            .into_iter()
            .map(|v| match v.map(str::trim) {
                Some(s) if s == config.positive_label => Ok(1),
                Some(s) if s == config.negative_label => Ok(0),
                other => Err(ChurnError::PreprocessingError(format!(
                    "unexpected label in '{}': {:?}",
                    name, other
                ))),
            })
            .collect::<Result<_>>()?
    } else {
        coerce_numeric(series)
            .into_iter()
            .map(|v| match v {
                Some(x) if x == 0.0 || x == 1.0 => Ok(x as i32),
                other => Err(ChurnError::PreprocessingError(format!(
                    "label column '{}' is not 0/1: {:?}",
                    name, other
                ))),
            })
            .collect::<Result<_>>()?
    };

    Ok(Series::new(name, labels))
}

/// Read a normalized 0/1 label column as `f64`
pub fn label_values(df: &DataFrame, target: &str) -> Result<Vec<f64>> {
    let series = df
        .column(target)
        .map_err(|_| ChurnError::FeatureNotFound(target.to_string()))?
        .as_materialized_series();

    coerce_numeric(series)
        .into_iter()
        .map(|v| v.ok_or_else(|| ChurnError::DataError(format!("null label in '{}'", target))))
        .collect()
}
