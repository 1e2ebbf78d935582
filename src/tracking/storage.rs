//! Storage backend for experiment runs

use super::tracker::Run;
use crate::error::{ChurnError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File holding a run's record inside its directory
pub const RUN_FILE: &str = "run.json";

/// Storage backend trait
pub trait StorageBackend {
    /// Directory owned by a run (artifacts are copied here)
    fn run_dir(&self, run_id: &str) -> PathBuf;

    /// Persist a run record
    fn save_run(&self, run: &Run) -> Result<()>;

    /// Load a run record by id
    fn load_run(&self, run_id: &str) -> Result<Run>;

    /// All stored runs, oldest first
    fn list_runs(&self) -> Result<Vec<Run>>;
}

/// Local file system storage: `<base_dir>/<run_id>/run.json`
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl StorageBackend for LocalStorage {
    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.base_dir.join(run_id)
    }

    fn save_run(&self, run: &Run) -> Result<()> {
        let dir = self.run_dir(&run.run_id);
        fs::create_dir_all(&dir)?;
        let json = serde_json::to_string_pretty(run)?;
        fs::write(dir.join(RUN_FILE), json)?;
        Ok(())
    }

    fn load_run(&self, run_id: &str) -> Result<Run> {
        let path = self.run_dir(run_id).join(RUN_FILE);
        if !path.exists() {
            return Err(ChurnError::ArtifactNotFound {
                path: path.display().to_string(),
                hint: "unknown run id".to_string(),
            });
        }
        let json = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn list_runs(&self) -> Result<Vec<Run>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path().join(RUN_FILE);
            if path.is_file() {
                let json = fs::read_to_string(&path)?;
                runs.push(serde_json::from_str::<Run>(&json)?);
            }
        }
        runs.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_storage_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        let mut run = Run::new("unit");
        run.log_param("max_depth", 4);
        run.log_metric("recall", 0.8);
        storage.save_run(&run).unwrap();

        assert!(storage.run_dir(&run.run_id).join(RUN_FILE).exists());
        let loaded = storage.load_run(&run.run_id).unwrap();
        assert_eq!(loaded.params["max_depth"], "4");
        assert_eq!(loaded.metrics["recall"], 0.8);
    }

    #[test]
    fn test_list_runs_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("missing"));
        assert!(storage.list_runs().unwrap().is_empty());
    }

    #[test]
    fn test_load_unknown_run() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert!(matches!(
            storage.load_run("nope"),
            Err(ChurnError::ArtifactNotFound { .. })
        ));
    }
}
