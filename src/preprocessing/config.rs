//! Preprocessing configuration

use serde::{Deserialize, Serialize};

/// Configuration for cleaning and feature building
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Binary label column
    pub target_column: String,

    /// Identifier columns dropped before feature building
    pub id_columns: Vec<String>,

    /// Columns coerced to numbers during cleaning (unparsable → `fill_value`)
    pub coerce_numeric_columns: Vec<String>,

    /// Replacement for blank or non-numeric entries in coerced columns
    pub fill_value: f64,

    /// Label value mapped to 1
    pub positive_label: String,

    /// Label value mapped to 0
    pub negative_label: String,

    /// Drop the first (alphabetical) level of every one-hot encoded column
    pub drop_first: bool,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            target_column: "Churn".to_string(),
            id_columns: vec!["customerID".to_string()],
            coerce_numeric_columns: vec!["TotalCharges".to_string()],
            fill_value: 0.0,
            positive_label: "Yes".to_string(),
            negative_label: "No".to_string(),
            drop_first: true,
        }
    }
}

impl PreprocessingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the target column
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_column = target.into();
        self
    }

    /// Builder method to set the identifier columns
    pub fn with_id_columns(mut self, columns: Vec<String>) -> Self {
        self.id_columns = columns;
        self
    }

    /// Builder method to toggle dropping the first one-hot level
    pub fn with_drop_first(mut self, drop_first: bool) -> Self {
        self.drop_first = drop_first;
        self
    }
}
