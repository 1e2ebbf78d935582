//! Reconciles request payloads with the training-time feature list
//!
//! The feature list is the only source of truth: absent features are
//! zero-filled, extra columns are dropped and order is forced to the list.

use crate::error::{ChurnError, Result};
use crate::preprocessing::{encoded_column_name, PreprocessingArtifact};
use ndarray::Array2;
use polars::prelude::*;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A single JSON record as received by the API
pub type Record = Map<String, Value>;

#[derive(Debug, Clone)]
pub struct FeatureAligner {
    feature_columns: Vec<String>,
    categorical_levels: BTreeMap<String, Vec<String>>,
}

impl FeatureAligner {
    pub fn new(feature_columns: Vec<String>) -> Self {
        Self {
            feature_columns,
            categorical_levels: BTreeMap::new(),
        }
    }

    pub fn from_artifact(artifact: &PreprocessingArtifact) -> Self {
        Self {
            feature_columns: artifact.feature_columns.clone(),
            categorical_levels: artifact.categorical_levels.clone(),
        }
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    /// Select and reorder to the feature list, inserting absent features as zeros
    pub fn align(&self, df: &DataFrame) -> Result<DataFrame> {
        let height = df.height();
        let columns: Vec<Column> = self
            .feature_columns
            .iter()
            .map(|name| match df.column(name) {
                Ok(column) => column.clone(),
                Err(_) => Series::new(name.as_str().into(), vec![0.0f64; height]).into(),
            })
            .collect();
        Ok(DataFrame::new(columns)?)
    }

    /// One-hot expand raw categorical fields using the training levels.
    /// Encoded columns the caller already supplied are left untouched.
    pub fn expand_record(&self, record: &Record) -> Record {
        let mut expanded = record.clone();
        for (column, levels) in &self.categorical_levels {
            let Some(raw) = record.get(column) else { continue };
            let value = match raw {
                Value::String(s) => s.trim().to_string(),
                Value::Null => continue,
                other => other.to_string(),
            };

            for level in levels {
                let name = encoded_column_name(column, level);
                if !record.contains_key(&name) {
                    let hit = if value == *level { 1 } else { 0 };
                    expanded.insert(name, Value::from(hit));
                }
            }
            expanded.remove(column);
        }
        expanded
    }

    /// Build a table from records: one column per key seen, in first-seen order.
    /// Keys holding only numbers, booleans or nulls become `f64`; anything else becomes strings.
    pub fn records_to_frame(records: &[Record]) -> Result<DataFrame> {
        let mut keys: Vec<&String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }

        let columns = keys
            .into_iter()
            .map(|key| {
                let values: Vec<Option<&Value>> = records.iter().map(|r| r.get(key)).collect();
                let numeric = values.iter().all(|v| {
                    matches!(v, None | Some(Value::Null | Value::Number(_) | Value::Bool(_)))
                });

                let series = if numeric {
                    let data: Vec<Option<f64>> = values
                        .iter()
                        .map(|v| match v {
                            Some(Value::Number(n)) => n.as_f64(),
                            Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
                            _ => None,
                        })
                        .collect();
                    Series::new(key.as_str().into(), data)
                } else {
                    let data: Vec<Option<String>> = values
                        .iter()
                        .map(|v| match v {
                            None | Some(Value::Null) => None,
                            Some(Value::String(s)) => Some(s.clone()),
                            Some(other) => Some(other.to_string()),
                        })
                        .collect();
                    Series::new(key.as_str().into(), data)
                };
                series.into()
            })
            .collect::<Vec<Column>>();

        Ok(DataFrame::new(columns)?)
    }

    /// Expand, frame and align a batch of records
    pub fn align_records(&self, records: &[Record]) -> Result<DataFrame> {
        let expanded: Vec<Record> = records.iter().map(|r| self.expand_record(r)).collect();
        let frame = Self::records_to_frame(&expanded)?;
        if frame.width() == 0 {
            // no keys at all: every feature is zero-filled at the record count
            let columns: Vec<Column> = self
                .feature_columns
                .iter()
                .map(|name| Series::new(name.as_str().into(), vec![0.0f64; records.len()]).into())
                .collect();
            return Ok(DataFrame::new(columns)?);
        }
        self.align(&frame)
    }

    /// Numeric matrix of an aligned table; nulls read as 0, unparsable values are an error
    pub fn to_matrix(&self, aligned: &DataFrame) -> Result<Array2<f64>> {
        let n_rows = aligned.height();
        let col_data: Vec<Vec<f64>> = self
            .feature_columns
            .iter()
            .map(|name| {
                let series = aligned
                    .column(name)
                    .map_err(|_| ChurnError::FeatureNotFound(name.clone()))?
                    .as_materialized_series();
                numeric_values(series)
            })
            .collect::<Result<_>>()?;

        Ok(Array2::from_shape_fn((n_rows, col_data.len()), |(r, c)| col_data[c][r]))
    }
}

fn numeric_values(series: &Series) -> Result<Vec<f64>> {
    let name = series.name().as_str();
    if series.dtype() == &DataType::String {
        return series
            .str()?
            .into_iter()
            .map(|v| match v {
                None => Ok(0.0),
                Some(s) => s.trim().parse::<f64>().map_err(|_| {
                    ChurnError::InvalidInput(format!(
                        "column '{}' has non-numeric value '{}'",
                        name, s
                    ))
                }),
            })
            .collect();
    }

    let cast = series.cast(&DataType::Float64).map_err(|e| {
        ChurnError::InvalidInput(format!("column '{}' is not numeric: {}", name, e))
    })?;
    Ok(cast.f64()?.into_iter().map(|v| v.unwrap_or(0.0)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn names(df: &DataFrame) -> Vec<String> {
        df.get_column_names().iter().map(|s| s.to_string()).collect()
    }

    fn aligner() -> FeatureAligner {
        FeatureAligner::new(vec!["a".into(), "b".into(), "c".into()])
    }

    #[test]
    fn test_missing_filled_and_extras_dropped() {
        let aligned = aligner().align_records(&[record(json!({"a": 1, "d": 9}))]).unwrap();
        assert_eq!(names(&aligned), vec!["a", "b", "c"]);

        let x = aligner().to_matrix(&aligned).unwrap();
        assert_eq!(x.row(0).to_vec(), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_align_is_idempotent() {
        let df = df!("c" => &[3.0, 6.0], "a" => &[1.0, 4.0], "z" => &["x", "y"]).unwrap();
        let once = aligner().align(&df).unwrap();
        let twice = aligner().align(&once).unwrap();
        assert!(once.equals(&twice));
        assert_eq!(names(&once), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_batch_keeps_row_order() {
        let records = vec![record(json!({"a": 1})), record(json!({"b": 2, "a": 3}))];
        let aligned = aligner().align_records(&records).unwrap();
        let x = aligner().to_matrix(&aligned).unwrap();
        assert_eq!(x.row(0).to_vec(), vec![1.0, 0.0, 0.0]);
        assert_eq!(x.row(1).to_vec(), vec![3.0, 2.0, 0.0]);
    }

    #[test]
    fn test_empty_record() {
        let aligned = aligner().align_records(&[record(json!({}))]).unwrap();
        assert_eq!(aligned.shape(), (1, 3));
    }

    #[test]
    fn test_string_in_feature_column_is_rejected() {
        let aligned = aligner().align_records(&[record(json!({"a": "abc"}))]).unwrap();
        let err = aligner().to_matrix(&aligned).unwrap_err();
        assert!(matches!(err, ChurnError::InvalidInput(_)));
    }

    #[test]
    fn test_numeric_strings_and_nulls() {
        let aligned = aligner()
            .align_records(&[record(json!({"a": " 2.5", "b": null, "c": true}))])
            .unwrap();
        let x = aligner().to_matrix(&aligned).unwrap();
        assert_eq!(x.row(0).to_vec(), vec![2.5, 0.0, 1.0]);
    }

    #[test]
    fn test_categorical_expansion() {
        let mut levels = BTreeMap::new();
        levels.insert(
            "Contract".to_string(),
            vec!["One year".to_string(), "Two year".to_string()],
        );
        let artifact = PreprocessingArtifact::new(vec![
            "tenure".into(),
            "Contract_One year".into(),
            "Contract_Two year".into(),
        ])
        .with_categorical_levels(levels);
        let aligner = FeatureAligner::from_artifact(&artifact);

        let aligned = aligner
            .align_records(&[
                record(json!({"tenure": 5, "Contract": "Two year"})),
                record(json!({"tenure": 1, "Contract": "Month-to-month"})),
                record(json!({"tenure": 2, "Contract": "Two year", "Contract_Two year": 0})),
            ])
            .unwrap();
        let x = aligner.to_matrix(&aligned).unwrap();

        assert_eq!(x.row(0).to_vec(), vec![5.0, 0.0, 1.0]);
        assert_eq!(x.row(1).to_vec(), vec![1.0, 0.0, 0.0]);
        assert_eq!(x.row(2).to_vec(), vec![2.0, 0.0, 0.0]);
    }
}
