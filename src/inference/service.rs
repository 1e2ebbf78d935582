//! Predict service: artifacts loaded once, shared read-only across requests

use super::align::{FeatureAligner, Record};
use super::InferenceConfig;
use crate::error::{ChurnError, Result};
use crate::preprocessing::PreprocessingArtifact;
use crate::training::{load_model, ChurnClassifier};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Probability and thresholded label for one customer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub probability_churn: f64,
    pub prediction: u8,
}

pub struct PredictService {
    aligner: FeatureAligner,
    model: Arc<dyn ChurnClassifier>,
    threshold: f64,
}

impl std::fmt::Debug for PredictService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictService")
            .field("features", &self.aligner.feature_columns().len())
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl PredictService {
    /// Build from an artifact and any classifier
    pub fn new(
        artifact: &PreprocessingArtifact,
        model: Arc<dyn ChurnClassifier>,
        threshold: f64,
    ) -> Result<Self> {
        if artifact.feature_columns.is_empty() {
            return Err(ChurnError::ConfigError(
                "`feature_columns` not found inside preprocessing artifact".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ChurnError::InvalidParameter {
                name: "threshold".to_string(),
                value: threshold.to_string(),
                reason: "must be in [0, 1]".to_string(),
            });
        }
        if let Some(n) = model.n_features() {
            if n != artifact.feature_columns.len() {
                return Err(ChurnError::ShapeError {
                    expected: format!("{} features (preprocessing artifact)", artifact.feature_columns.len()),
                    actual: format!("{} features (model)", n),
                });
            }
        }

        Ok(Self {
            aligner: FeatureAligner::from_artifact(artifact),
            model,
            threshold,
        })
    }

    /// Load both artifacts from `config.artifacts_dir`
    pub fn load(config: &InferenceConfig) -> Result<Self> {
        let artifact = PreprocessingArtifact::load(config.preprocessing_path())?;
        let model = load_model(config.model_path())?;
        let service = Self::new(&artifact, Arc::new(model), config.classification_threshold)?;

        info!(
            artifacts_dir = %config.artifacts_dir.display(),
            features = artifact.feature_columns.len(),
            threshold = config.classification_threshold,
            "Loaded predict service"
        );
        Ok(service)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn feature_columns(&self) -> &[String] {
        self.aligner.feature_columns()
    }

    fn score_aligned(&self, aligned: &DataFrame) -> Result<Vec<PredictionResult>> {
        let x = self.aligner.to_matrix(aligned)?;
        let proba = self.model.predict_proba(&x)?;
        Ok(proba
            .iter()
            .map(|&p| PredictionResult {
                probability_churn: p,
                prediction: u8::from(p >= self.threshold),
            })
            .collect())
    }

    pub fn predict_single(&self, record: &Record) -> Result<PredictionResult> {
        let mut results = self.predict_batch(std::slice::from_ref(record))?;
        results
            .pop()
            .ok_or_else(|| ChurnError::InferenceError("model returned no prediction".to_string()))
    }

    /// One result per record, in input order; any bad record fails the batch
    pub fn predict_batch(&self, records: &[Record]) -> Result<Vec<PredictionResult>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let aligned = self.aligner.align_records(records)?;
        let results = self.score_aligned(&aligned)?;
        debug!(rows = results.len(), elapsed_us = start.elapsed().as_micros() as u64, "Scored batch");
        Ok(results)
    }

    /// Score an already-encoded table (e.g. the processed CSV)
    pub fn predict_frame(&self, df: &DataFrame) -> Result<Vec<PredictionResult>> {
        let aligned = self.aligner.align(df)?;
        self.score_aligned(&aligned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};
    use serde_json::json;

    /// Returns the first feature as the probability
    struct EchoModel;

    impl ChurnClassifier for EchoModel {
        fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
            Ok(x.column(0).to_owned())
        }
    }

    fn service(threshold: f64) -> PredictService {
        let artifact = PreprocessingArtifact::new(vec!["p".into(), "b".into()]);
        PredictService::new(&artifact, Arc::new(EchoModel), threshold).unwrap()
    }

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let result = service(0.35).predict_single(&record(json!({"p": 0.35}))).unwrap();
        assert_eq!(result, PredictionResult { probability_churn: 0.35, prediction: 1 });

        let below = service(0.35).predict_single(&record(json!({"p": 0.3499}))).unwrap();
        assert_eq!(below.prediction, 0);
    }

    #[test]
    fn test_batch_order() {
        let results = service(0.5)
            .predict_batch(&[record(json!({"p": 0.9})), record(json!({"p": 0.1, "x": "extra"}))])
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].prediction, 1);
        assert_eq!(results[1].prediction, 0);
    }

    #[test]
    fn test_empty_batch() {
        assert!(service(0.5).predict_batch(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_bad_value_fails_whole_batch() {
        let err = service(0.5)
            .predict_batch(&[record(json!({"p": 0.9})), record(json!({"p": "high"}))])
            .unwrap_err();
        assert!(matches!(err, ChurnError::InvalidInput(_)));
    }

    #[test]
    fn test_load_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let config = InferenceConfig::new().with_artifacts_dir(dir.path());
        assert!(matches!(
            PredictService::load(&config),
            Err(ChurnError::ArtifactNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_threshold() {
        let artifact = PreprocessingArtifact::new(vec!["p".into()]);
        assert!(PredictService::new(&artifact, Arc::new(EchoModel), 1.5).is_err());
    }
}
