//! Inference module
//!
//! Serves churn predictions from persisted artifacts:
//! - Feature alignment against the training-time column list
//! - Categorical expansion of raw request fields
//! - Thresholded probabilities for single records and batches

mod align;
mod config;
mod service;

pub use align::{FeatureAligner, Record};
pub use config::{threshold_from_env, InferenceConfig, DEFAULT_THRESHOLD};
pub use service::{PredictService, PredictionResult};
