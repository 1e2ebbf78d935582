//! Data loading and validation
//!
//! - [`DataLoader`] / [`DataSaver`] read and write CSV tables
//! - [`TelcoValidator`] runs the data-quality battery over a raw customer table

pub mod loader;
pub mod validation;

pub use loader::{DataLoader, DataSaver};
pub use validation::{
    validate_telco_data, NumericBounds, TelcoValidator, ValidationReport, Violation,
    REQUIRED_COLUMNS,
};

use polars::prelude::*;

/// Look up a column by name as a materialized series
pub(crate) fn series<'a>(df: &'a DataFrame, name: &str) -> Option<&'a Series> {
    df.column(name).ok().map(|c| c.as_materialized_series())
}

/// Coerce a column to numbers the lenient way: unparsable entries, nulls and NaN become `None`.
pub(crate) fn coerce_numeric(series: &Series) -> Vec<Option<f64>> {
    if let Ok(ca) = series.str() {
        return ca
            .into_iter()
            .map(|v| v.and_then(|s| s.trim().parse::<f64>().ok()))
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
    }

    match series.cast(&DataType::Float64) {
        Ok(casted) => match casted.f64() {
            Ok(ca) => ca
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()))
                .collect(),
            Err(_) => vec![None; series.len()],
        },
        Err(_) => vec![None; series.len()],
    }
}

/// Read a column as optional strings (numbers are rendered with polars' string cast)
pub(crate) fn string_values(series: &Series) -> Vec<Option<String>> {
    let casted = match series.cast(&DataType::String) {
        Ok(s) => s,
        Err(_) => return vec![None; series.len()],
    };
    match casted.str() {
        Ok(ca) => ca.into_iter().map(|v| v.map(str::to_string)).collect(),
        Err(_) => vec![None; series.len()],
    }
}
