//! Telco churn - customer churn prediction pipeline
//!
//! This crate provides the full path from a raw customer table to a served model:
//! - Data loading and rule-based validation
//! - Cleaning and one-hot feature building
//! - Gradient-boosted tree classifier with hyperparameter search
//! - Evaluation and a local experiment tracker
//! - Predict service, HTTP API and CLI
//!
//! # Modules
//!
//! ## Pipeline
//! - [`data`] - CSV loading and data validation
//! - [`preprocessing`] - Cleaning, encoding and the preprocessing artifact
//! - [`training`] - Booster, splits, metrics and evaluation
//! - [`optimizer`] - Trial loop, samplers and the churn tuner
//! - [`tracking`] - File-based experiment tracking
//! - [`pipeline`] - Stage orchestration
//!
//! ## Serving
//! - [`inference`] - Feature alignment and the predict service
//! - [`server`] - HTTP server with REST API and demo UI
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

// Pipeline
pub mod data;
pub mod preprocessing;
pub mod training;
pub mod optimizer;
pub mod tracking;
pub mod pipeline;

// Serving
pub mod inference;
pub mod server;
pub mod cli;

pub use error::{ChurnError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ChurnError, Result};

    // Configuration
    pub use crate::config::PipelineConfig;

    // Data
    pub use crate::data::{validate_telco_data, DataLoader, DataSaver, ValidationReport};

    // Preprocessing
    pub use crate::preprocessing::{
        preprocess_data, FeatureBuilder, PreprocessingArtifact, PreprocessingConfig,
    };

    // Training
    pub use crate::training::{
        ChurnClassifier, Evaluator, ModelMetrics, TrainEngine, TrainingConfig, XGBoostClassifier,
        XGBoostConfig,
    };

    // Optimization
    pub use crate::optimizer::{ChurnTuner, OptimizationConfig, SearchSpace, TuningMetric, TuningStrategy};

    // Experiment tracking
    pub use crate::tracking::{ExperimentTracker, Run, RunStatus};

    // Inference
    pub use crate::inference::{FeatureAligner, InferenceConfig, PredictService, PredictionResult};

    // Pipeline
    pub use crate::pipeline::{Pipeline, TrainOptions, TuneOptions};
}
