//! Persisted preprocessing metadata consumed at inference time

use crate::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// File name of the preprocessing artifact inside the artifacts directory
pub const PREPROCESSING_ARTIFACT: &str = "preprocessing.json";

/// Training-time feature contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingArtifact {
    /// Ordered feature columns the model was trained on
    pub feature_columns: Vec<String>,
    #[serde(default)]
    pub target_column: Option<String>,
    /// Raw categorical column -> encoded levels
    #[serde(default)]
    pub categorical_levels: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl PreprocessingArtifact {
    /// Artifact holding only a feature list
    pub fn new(feature_columns: Vec<String>) -> Self {
        Self {
            feature_columns,
            target_column: None,
            categorical_levels: BTreeMap::new(),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_column = Some(target.into());
        self
    }

    pub fn with_categorical_levels(mut self, levels: BTreeMap<String, Vec<String>>) -> Self {
        self.categorical_levels = levels;
        self
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), features = self.feature_columns.len(), "Saved preprocessing artifact");
        Ok(())
    }

    /// Load and check that a non-empty feature list is present
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ChurnError::ArtifactNotFound {
                path: path.display().to_string(),
                hint: "run the preprocess stage to generate it".to_string(),
            });
        }

        let json = std::fs::read_to_string(path)?;
        let artifact: Self = serde_json::from_str(&json).map_err(|e| {
            ChurnError::SerializationError(format!("failed to load preprocessing artifact: {}", e))
        })?;

        if artifact.feature_columns.is_empty() {
            return Err(ChurnError::ConfigError(
                "`feature_columns` not found inside preprocessing artifact".to_string(),
            ));
        }

        Ok(artifact)
    }
}
