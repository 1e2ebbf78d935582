//! Experiment tracker implementation
//!
//! Runs record params, metrics and artifact copies under a local directory.

use super::storage::{LocalStorage, StorageBackend};
use crate::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// A single tracked run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub run_name: String,
    pub status: RunStatus,
    /// RFC 3339
    pub start_time: String,
    pub end_time: Option<String>,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
    /// File names copied into the run directory
    pub artifacts: Vec<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Run {
    pub fn new(run_name: impl Into<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().simple().to_string(),
            run_name: run_name.into(),
            status: RunStatus::Running,
            start_time: now_rfc3339(),
            end_time: None,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            artifacts: Vec::new(),
            tags: BTreeMap::new(),
        }
    }

    pub fn log_param(&mut self, key: impl Into<String>, value: impl Display) {
        self.params.insert(key.into(), value.to_string());
    }

    pub fn log_params<K, V, I>(&mut self, params: I)
    where
        K: Into<String>,
        V: Display,
        I: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in params {
            self.log_param(k, v);
        }
    }

    /// Latest value wins
    pub fn log_metric(&mut self, key: impl Into<String>, value: f64) {
        self.metrics.insert(key.into(), value);
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }
}

/// Local MLflow-style experiment tracker
pub struct ExperimentTracker {
    storage: Box<dyn StorageBackend + Send + Sync>,
}

impl ExperimentTracker {
    /// Tracker writing under `root` (e.g. `mlruns/`)
    pub fn with_dir(root: impl Into<PathBuf>) -> Self {
        Self {
            storage: Box::new(LocalStorage::new(root)),
        }
    }

    pub fn with_storage(storage: Box<dyn StorageBackend + Send + Sync>) -> Self {
        Self { storage }
    }

    /// Open a run and persist its initial record
    pub fn start_run(&self, run_name: impl Into<String>) -> Result<Run> {
        let run = Run::new(run_name);
        self.storage.save_run(&run)?;
        info!(run_id = %run.run_id, run_name = %run.run_name, "Started run");
        Ok(run)
    }

    /// Copy a file into the run directory and record its name
    pub fn log_artifact(&self, run: &mut Run, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| ChurnError::InvalidInput(format!("not a file: {}", path.display())))?;

        if !path.is_file() {
            return Err(ChurnError::ArtifactNotFound {
                path: path.display().to_string(),
                hint: "artifact must exist before it is logged".to_string(),
            });
        }

        let dir = self.storage.run_dir(&run.run_id);
        std::fs::create_dir_all(&dir)?;
        std::fs::copy(path, dir.join(&file_name))?;

        debug!(run_id = %run.run_id, artifact = %file_name, "Logged artifact");
        if !run.artifacts.contains(&file_name) {
            run.artifacts.push(file_name);
        }
        Ok(())
    }

    /// Close the run with `status` and write its final record
    pub fn end_run(&self, mut run: Run, status: RunStatus) -> Result<Run> {
        run.status = status;
        run.end_time = Some(now_rfc3339());
        self.storage.save_run(&run)?;

        match status {
            RunStatus::Failed => warn!(run_id = %run.run_id, "Run failed"),
            _ => info!(run_id = %run.run_id, metrics = run.metrics.len(), "Finished run"),
        }
        Ok(run)
    }

    pub fn load_run(&self, run_id: &str) -> Result<Run> {
        self.storage.load_run(run_id)
    }

    pub fn list_runs(&self) -> Result<Vec<Run>> {
        self.storage.list_runs()
    }

    /// Finished run with the highest value of `metric`
    pub fn best_run(&self, metric: &str) -> Result<Option<Run>> {
        let runs = self.list_runs()?;
        Ok(runs
            .into_iter()
            .filter(|r| r.status == RunStatus::Finished && r.metrics.contains_key(metric))
            .max_by(|a, b| {
                let va = a.metrics.get(metric).copied().unwrap_or(f64::NEG_INFINITY);
                let vb = b.metrics.get(metric).copied().unwrap_or(f64::NEG_INFINITY);
                va.partial_cmp(&vb).unwrap_or(std::cmp::Ordering::Equal)
            }))
    }
}
