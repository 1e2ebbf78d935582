//! Training engine: encoded table → matrices → fitted booster

use super::cross_validation::{stratified_train_test_split, take_rows};
use super::models::save_model;
use super::xgboost::{XGBoostClassifier, XGBoostConfig};
use super::TrainingConfig;
use crate::error::{ChurnError, Result};
use crate::preprocessing::label_values;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Extract named columns from a DataFrame into a row-major `Array2<f64>`; nulls become 0.
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| {
            let column = df
                .column(col_name)
                .map_err(|_| ChurnError::FeatureNotFound(col_name.clone()))?;
            let values: Vec<f64> = column
                .as_materialized_series()
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect();
            Ok(values)
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_data[c][r]))
}

/// Stratified train/test matrices with the feature order they were built from
#[derive(Debug, Clone)]
pub struct DataSplit {
    pub feature_names: Vec<String>,
    pub x_train: Array2<f64>,
    pub y_train: Array1<f64>,
    pub x_test: Array2<f64>,
    pub y_test: Array1<f64>,
}

impl DataSplit {
    /// neg/pos ratio of the training labels, 1.0 when there are no positives
    pub fn scale_pos_weight(&self) -> f64 {
        class_ratio(&self.y_train)
    }
}

/// neg/pos ratio of 0/1 labels
pub fn class_ratio(y: &Array1<f64>) -> f64 {
    let pos = y.iter().filter(|&&v| v == 1.0).count();
    let neg = y.len() - pos;
    if pos == 0 {
        1.0
    } else {
        neg as f64 / pos as f64
    }
}

/// Main training engine
#[derive(Debug, Clone, Default)]
pub struct TrainEngine {
    config: TrainingConfig,
}

impl TrainEngine {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Feature names (every non-target column, in order), matrix and labels
    pub fn prepare_data(&self, df: &DataFrame) -> Result<(Vec<String>, Array2<f64>, Array1<f64>)> {
        let target = self.config.target_column.as_str();
        let feature_names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != target)
            .map(|name| name.to_string())
            .collect();

        if feature_names.is_empty() {
            return Err(ChurnError::DataError("no feature columns found".to_string()));
        }

        let x = columns_to_array2(df, &feature_names)?;
        let y = Array1::from_vec(label_values(df, target)?);
        Ok((feature_names, x, y))
    }

    /// Seeded stratified holdout split of an encoded table
    pub fn split(&self, df: &DataFrame) -> Result<DataSplit> {
        let (feature_names, x, y) = self.prepare_data(df)?;
        let (train_idx, test_idx) =
            stratified_train_test_split(&y, self.config.test_size, Some(self.config.random_state))?;

        let (x_train, y_train) = take_rows(&x, &y, &train_idx);
        let (x_test, y_test) = take_rows(&x, &y, &test_idx);

        info!(train = train_idx.len(), test = test_idx.len(), "Split data");
        Ok(DataSplit { feature_names, x_train, y_train, x_test, y_test })
    }

    /// Fit a booster on the training half of `split`
    pub fn fit(&self, split: &DataSplit, params: XGBoostConfig) -> Result<XGBoostClassifier> {
        let start = Instant::now();
        let mut model = XGBoostClassifier::new(params);
        model.fit(&split.x_train, &split.y_train)?;

        info!(
            n_estimators = model.config().n_estimators,
            features = split.feature_names.len(),
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Trained classifier"
        );
        Ok(model)
    }

    /// Split, fit and persist the model at `model_path`
    pub fn train_and_save(
        &self,
        df: &DataFrame,
        params: XGBoostConfig,
        model_path: impl AsRef<Path>,
    ) -> Result<(XGBoostClassifier, DataSplit)> {
        let split = self.split(df)?;
        let model = self.fit(&split, params)?;
        save_model(&model, model_path)?;
        Ok((model, split))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded_frame() -> DataFrame {
        let n = 40;
        let tenure: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let fiber: Vec<i32> = (0..n).map(|i| (i % 2) as i32).collect();
        let churn: Vec<i32> = (0..n).map(|i| if i < 10 { 1 } else { 0 }).collect();
        df!("tenure" => tenure, "InternetService_Fiber optic" => fiber, "Churn" => churn).unwrap()
    }

    #[test]
    fn test_prepare_data() {
        let engine = TrainEngine::default();
        let (names, x, y) = engine.prepare_data(&encoded_frame()).unwrap();
        assert_eq!(names, vec!["tenure".to_string(), "InternetService_Fiber optic".to_string()]);
        assert_eq!(x.dim(), (40, 2));
        assert_eq!(y.sum(), 10.0);
    }

    #[test]
    fn test_split_is_stratified_and_seeded() {
        let engine = TrainEngine::default();
        let a = engine.split(&encoded_frame()).unwrap();
        let b = engine.split(&encoded_frame()).unwrap();

        assert_eq!(a.x_test.nrows(), 8);
        assert_eq!(a.y_test.sum(), 2.0);
        assert_eq!(a.y_test, b.y_test);
        assert_eq!(a.x_test, b.x_test);
        assert!((a.scale_pos_weight() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_train_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifacts").join("model");
        let engine = TrainEngine::default();

        let (model, split) = engine
            .train_and_save(&encoded_frame(), XGBoostConfig::default().with_n_estimators(10), &path)
            .unwrap();

        assert!(path.exists());
        assert_eq!(model.n_features(), split.feature_names.len());
    }

    #[test]
    fn test_missing_target() {
        let df = df!("tenure" => &[1.0, 2.0]).unwrap();
        assert!(TrainEngine::default().prepare_data(&df).is_err());
    }

    #[test]
    fn test_columns_to_array2_fills_nulls() {
        let df = df!("a" => &[Some(1.0), None]).unwrap();
        let x = columns_to_array2(&df, &["a".to_string()]).unwrap();
        assert_eq!(x.column(0).to_vec(), vec![1.0, 0.0]);
    }
}
