//! Model seam shared by training and serving

use super::xgboost::XGBoostClassifier;
use crate::error::{ChurnError, Result};
use ndarray::{Array1, Array2};
use std::path::Path;
use tracing::info;

/// File name of the model artifact inside the artifacts directory
pub const MODEL_ARTIFACT: &str = "model";

/// A fitted binary classifier exposing positive-class probabilities
pub trait ChurnClassifier: Send + Sync {
    /// Probability of churn for each row of `x`
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Number of input features the model expects, if known
    fn n_features(&self) -> Option<usize> {
        None
    }
}

impl ChurnClassifier for XGBoostClassifier {
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        XGBoostClassifier::predict_proba(self, x)
    }

    fn n_features(&self) -> Option<usize> {
        Some(XGBoostClassifier::n_features(self))
    }
}

/// Write a fitted model as JSON, creating parent directories
pub fn save_model(model: &XGBoostClassifier, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if !model.is_fitted() {
        return Err(ChurnError::ModelNotFitted);
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string(model)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), "Saved model artifact");
    Ok(())
}

/// Read a model written by [`save_model`]
pub fn load_model(path: impl AsRef<Path>) -> Result<XGBoostClassifier> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ChurnError::ArtifactNotFound {
            path: path.display().to_string(),
            hint: "run the train stage to generate it".to_string(),
        });
    }
    let json = std::fs::read_to_string(path)?;
    let model: XGBoostClassifier = serde_json::from_str(&json)
        .map_err(|e| ChurnError::SerializationError(format!("failed to load model: {}", e)))?;
    if !model.is_fitted() {
        return Err(ChurnError::ModelNotFitted);
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::XGBoostConfig;

    #[test]
    fn test_save_load_model() {
        let x = Array2::from_shape_vec((6, 1), vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]).unwrap();
        let y = Array1::from_vec(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let mut model = XGBoostClassifier::new(XGBoostConfig {
            n_estimators: 5,
            min_child_weight: 0.0,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MODEL_ARTIFACT);
        save_model(&model, &path).unwrap();
        let loaded = load_model(&path).unwrap();

        let before = model.predict_proba(&x).unwrap();
        let after = ChurnClassifier::predict_proba(&loaded, &x).unwrap();
        for (a, b) in before.iter().zip(after.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
        assert_eq!(ChurnClassifier::n_features(&loaded), Some(1));
    }

    #[test]
    fn test_missing_model() {
        let err = load_model("nowhere/model").unwrap_err();
        assert!(matches!(err, ChurnError::ArtifactNotFound { .. }));
    }

    #[test]
    fn test_unfitted_model_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let model = XGBoostClassifier::new(XGBoostConfig::default());
        assert!(save_model(&model, dir.path().join(MODEL_ARTIFACT)).is_err());
    }
}
