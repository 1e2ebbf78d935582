//! Inference configuration

use crate::preprocessing::PREPROCESSING_ARTIFACT;
use crate::training::MODEL_ARTIFACT;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Probability at or above which a customer is predicted to churn
pub const DEFAULT_THRESHOLD: f64 = 0.35;

/// Threshold from `CHURN_THRESHOLD`, falling back to [`DEFAULT_THRESHOLD`]
pub fn threshold_from_env() -> f64 {
    match std::env::var("CHURN_THRESHOLD") {
        Ok(raw) => match raw.trim().parse::<f64>() {
            Ok(t) if (0.0..=1.0).contains(&t) => t,
            _ => {
                warn!(value = %raw, "Ignoring invalid CHURN_THRESHOLD");
                DEFAULT_THRESHOLD
            }
        },
        Err(_) => DEFAULT_THRESHOLD,
    }
}

/// Configuration for the predict service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Directory holding `preprocessing.json` and `model`
    pub artifacts_dir: PathBuf,

    /// Threshold for binary classification
    pub classification_threshold: f64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: std::env::var("ARTIFACTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("artifacts")),
            classification_threshold: threshold_from_env(),
        }
    }
}

impl InferenceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = dir.into();
        self
    }

    /// Builder method to set classification threshold
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.classification_threshold = threshold;
        self
    }

    pub fn preprocessing_path(&self) -> PathBuf {
        self.artifacts_dir.join(PREPROCESSING_ARTIFACT)
    }

    pub fn model_path(&self) -> PathBuf {
        self.artifacts_dir.join(MODEL_ARTIFACT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let config = InferenceConfig::new().with_artifacts_dir("out").with_threshold(0.5);
        assert_eq!(config.preprocessing_path(), PathBuf::from("out/preprocessing.json"));
        assert_eq!(config.model_path(), PathBuf::from("out/model"));
        assert_eq!(config.classification_threshold, 0.5);
    }
}
