//! Holdout evaluation with persisted confusion matrix and report

use super::metrics::ModelMetrics;
use super::models::ChurnClassifier;
use crate::error::Result;
use crate::tracking::{ExperimentTracker, RunStatus};
use ndarray::{Array1, Array2};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFUSION_MATRIX_ARTIFACT: &str = "confusion_matrix.json";
pub const CLASSIFICATION_REPORT_ARTIFACT: &str = "classification_report.txt";

/// Tracker run name used for evaluation
pub const EVALUATION_RUN: &str = "xgb_churn_evaluation";

#[derive(Serialize)]
struct ConfusionMatrixFile {
    labels: [u8; 2],
    matrix: [[usize; 2]; 2],
    threshold: f64,
}

/// Scores a classifier at a fixed probability threshold
#[derive(Debug, Clone)]
pub struct Evaluator {
    threshold: f64,
}

impl Evaluator {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn evaluate(
        &self,
        model: &dyn ChurnClassifier,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<ModelMetrics> {
        let proba = model.predict_proba(x)?;
        let preds = proba.mapv(|p| if p >= self.threshold { 1.0 } else { 0.0 });
        ModelMetrics::compute_classification(y, &preds, Some(&proba))
    }

    /// Write `confusion_matrix.json` and the text report into `dir`
    pub fn write_artifacts(&self, metrics: &ModelMetrics, dir: impl AsRef<Path>) -> Result<(PathBuf, PathBuf)> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let cm_path = dir.join(CONFUSION_MATRIX_ARTIFACT);
        let cm = ConfusionMatrixFile {
            labels: [0, 1],
            matrix: metrics.confusion_matrix.as_matrix(),
            threshold: self.threshold,
        };
        std::fs::write(&cm_path, serde_json::to_string_pretty(&cm)?)?;

        let report_path = dir.join(CLASSIFICATION_REPORT_ARTIFACT);
        std::fs::write(&report_path, metrics.classification_report())?;

        Ok((cm_path, report_path))
    }

    /// Evaluate, persist artifacts and record everything in a tracker run
    pub fn evaluate_and_log(
        &self,
        model: &dyn ChurnClassifier,
        x: &Array2<f64>,
        y: &Array1<f64>,
        artifacts_dir: impl AsRef<Path>,
        tracker: &ExperimentTracker,
    ) -> Result<ModelMetrics> {
        let mut run = tracker.start_run(EVALUATION_RUN)?;
        run.log_param("threshold", self.threshold);
        run.log_param("n_test", y.len());

        let outcome = self.evaluate(model, x, y).and_then(|metrics| {
            let (cm_path, report_path) = self.write_artifacts(&metrics, &artifacts_dir)?;
            tracker.log_artifact(&mut run, &cm_path)?;
            tracker.log_artifact(&mut run, &report_path)?;
            Ok(metrics)
        });

        match outcome {
            Ok(metrics) => {
                for (name, value) in metrics.to_pairs() {
                    run.log_metric(name, value);
                }
                tracker.end_run(run, RunStatus::Finished)?;
                info!(
                    accuracy = metrics.accuracy,
                    precision = metrics.precision,
                    recall = metrics.recall,
                    f1 = metrics.f1_score,
                    roc_auc = ?metrics.roc_auc,
                    "Evaluation complete"
                );
                Ok(metrics)
            }
            Err(e) => {
                tracker.end_run(run, RunStatus::Failed)?;
                Err(e)
            }
        }
    }
}
