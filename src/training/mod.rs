//! Model training module
//!
//! Provides the churn classifier and everything around its fit:
//! - XGBoost-style gradient boosting on the logistic loss
//! - Stratified k-fold and holdout splitting
//! - Classification metrics (accuracy, precision, recall, F1, ROC AUC)
//! - The training engine and holdout evaluator

mod config;
mod engine;
mod evaluator;
mod models;
pub mod cross_validation;
pub mod metrics;
pub mod xgboost;

pub use config::TrainingConfig;
pub use cross_validation::{stratified_train_test_split, CVResults, CVSplit, CVStrategy, CrossValidator};
pub use engine::{class_ratio, columns_to_array2, DataSplit, TrainEngine};
pub use evaluator::{Evaluator, CLASSIFICATION_REPORT_ARTIFACT, CONFUSION_MATRIX_ARTIFACT, EVALUATION_RUN};
pub use metrics::{roc_auc, ConfusionMatrix, ModelMetrics};
pub use models::{load_model, save_model, ChurnClassifier, MODEL_ARTIFACT};
pub use xgboost::{XGBoostClassifier, XGBoostConfig};
