//! Data preprocessing module
//!
//! Turns the raw customer table into model-ready features:
//! - Cleaning (identifier removal, whitespace trimming, numeric coercion)
//! - Label normalization to 0/1
//! - One-hot encoding with first-level dropping
//! - The persisted feature contract used by the serving layer

mod artifact;
mod cleaner;
mod config;
mod encoder;

pub use artifact::{PreprocessingArtifact, PREPROCESSING_ARTIFACT};
pub use cleaner::{label_values, preprocess_data};
pub use config::PreprocessingConfig;
pub use encoder::{encoded_column_name, OneHotEncoder};

use crate::error::{ChurnError, Result};
use polars::prelude::*;
use tracing::info;

/// Builds the encoded training table from a cleaned table
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    config: PreprocessingConfig,
    encoder: OneHotEncoder,
    feature_columns: Vec<String>,
    is_fitted: bool,
}

impl FeatureBuilder {
    pub fn new(config: PreprocessingConfig) -> Self {
        let encoder = OneHotEncoder::new(config.drop_first);
        Self {
            config,
            encoder,
            feature_columns: Vec::new(),
            is_fitted: false,
        }
    }

    /// Learn categorical levels from a cleaned table
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let target = self.config.target_column.as_str();
        if df.column(target).is_err() {
            return Err(ChurnError::FeatureNotFound(target.to_string()));
        }

        self.encoder.fit(df, &[target])?;

        let encoded = self.encoder.transform(&df.head(Some(0)), &[target])?;
        self.feature_columns = encoded
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != target)
            .map(|name| name.to_string())
            .collect();

        self.is_fitted = true;
        info!(
            features = self.feature_columns.len(),
            categorical = self.encoder.levels().len(),
            "Fitted feature builder"
        );
        Ok(self)
    }

    /// Encode a cleaned table; the target (when present) is moved to the last position
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ChurnError::ModelNotFitted);
        }

        let target = self.config.target_column.as_str();
        let encoded = self.encoder.transform(df, &[target])?;

        let mut columns: Vec<Column> = Vec::with_capacity(encoded.width());
        for name in &self.feature_columns {
            let column = encoded
                .column(name)
                .map_err(|_| ChurnError::FeatureNotFound(name.clone()))?;
            columns.push(column.clone());
        }
        if let Ok(label) = encoded.column(target) {
            columns.push(label.clone());
        }

        Ok(DataFrame::new(columns)?)
    }

    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Ordered feature columns, target excluded
    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    /// Feature contract for the serving layer
    pub fn artifact(&self) -> Result<PreprocessingArtifact> {
        if !self.is_fitted {
            return Err(ChurnError::ModelNotFitted);
        }
        Ok(PreprocessingArtifact::new(self.feature_columns.clone())
            .with_target(self.config.target_column.clone())
            .with_categorical_levels(self.encoder.levels().clone()))
    }
}
