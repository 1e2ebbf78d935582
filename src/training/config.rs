//! Training configuration

use serde::{Deserialize, Serialize};

/// Configuration for the final fit and its holdout evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Label column in the encoded table
    pub target_column: String,

    /// Fraction of rows held out for evaluation
    pub test_size: f64,

    /// Seed for the stratified split
    pub random_state: u64,

    /// Probability cut-off for positive predictions
    pub threshold: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            target_column: "Churn".to_string(),
            test_size: 0.2,
            random_state: 42,
            threshold: crate::inference::DEFAULT_THRESHOLD,
        }
    }
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_column = target.into();
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}
