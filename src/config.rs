//! Pipeline-wide configuration: where data and artifacts live, and the shared knobs

use crate::inference::{threshold_from_env, InferenceConfig};
use crate::optimizer::BEST_PARAMS_ARTIFACT;
use crate::preprocessing::{PreprocessingConfig, PREPROCESSING_ARTIFACT};
use crate::training::{TrainingConfig, MODEL_ARTIFACT};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const RAW_DATA_FILE: &str = "WA_Fn-UseC_-Telco-Customer-Churn.csv";
pub const PROCESSED_DATA_FILE: &str = "telco_churn_processed.csv";

fn env_dir(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Raw Telco CSV
    pub raw_data_path: PathBuf,
    /// Encoded table written by the preprocess stage
    pub processed_data_path: PathBuf,
    pub artifacts_dir: PathBuf,
    /// Experiment tracker root
    pub runs_dir: PathBuf,
    pub target_column: String,
    pub random_state: u64,
    pub test_size: f64,
    pub threshold: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let data_dir = env_dir("DATA_DIR", "data");
        Self {
            raw_data_path: data_dir.join("raw").join(RAW_DATA_FILE),
            processed_data_path: data_dir.join("processed").join(PROCESSED_DATA_FILE),
            artifacts_dir: env_dir("ARTIFACTS_DIR", "artifacts"),
            runs_dir: env_dir("MLRUNS_DIR", "mlruns"),
            target_column: "Churn".to_string(),
            random_state: 42,
            test_size: 0.2,
            threshold: threshold_from_env(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay every path out under `root` (`data/`, `artifacts/`, `mlruns/`)
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            raw_data_path: root.join("data").join("raw").join(RAW_DATA_FILE),
            processed_data_path: root.join("data").join("processed").join(PROCESSED_DATA_FILE),
            artifacts_dir: root.join("artifacts"),
            runs_dir: root.join("mlruns"),
            ..Self::default()
        }
    }

    pub fn with_raw_data(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw_data_path = path.into();
        self
    }

    pub fn with_processed_data(mut self, path: impl Into<PathBuf>) -> Self {
        self.processed_data_path = path.into();
        self
    }

    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = dir.into();
        self
    }

    pub fn with_runs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.runs_dir = dir.into();
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn preprocessing_path(&self) -> PathBuf {
        self.artifacts_dir.join(PREPROCESSING_ARTIFACT)
    }

    pub fn model_path(&self) -> PathBuf {
        self.artifacts_dir.join(MODEL_ARTIFACT)
    }

    pub fn best_params_path(&self) -> PathBuf {
        self.artifacts_dir.join(BEST_PARAMS_ARTIFACT)
    }

    pub fn preprocessing_config(&self) -> PreprocessingConfig {
        PreprocessingConfig::new().with_target(self.target_column.clone())
    }

    pub fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            target_column: self.target_column.clone(),
            test_size: self.test_size,
            random_state: self.random_state,
            threshold: self.threshold,
        }
    }

    pub fn inference_config(&self) -> InferenceConfig {
        InferenceConfig::new()
            .with_artifacts_dir(&self.artifacts_dir)
            .with_threshold(self.threshold)
    }
}
