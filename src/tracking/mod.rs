//! Experiment tracking module
//!
//! Local, file-based run log similar to MLflow.

mod storage;
mod tracker;

pub use storage::{LocalStorage, StorageBackend, RUN_FILE};
pub use tracker::{ExperimentTracker, Run, RunStatus};
