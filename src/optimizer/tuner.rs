//! Hyperparameter tuning of the churn classifier

use super::{
    HyperOptimizer, OptimizationConfig, OptimizeDirection, ParameterValue, SearchSpace, Study,
    TrialParams,
};
use crate::error::{ChurnError, Result};
use crate::tracking::{ExperimentTracker, RunStatus};
use crate::training::cross_validation::take_rows;
use crate::training::{
    class_ratio, stratified_train_test_split, CVResults, CVStrategy, CrossValidator, ModelMetrics,
    XGBoostClassifier, XGBoostConfig,
};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// File name of the tuning result inside the artifacts directory
pub const BEST_PARAMS_ARTIFACT: &str = "best_params.json";

/// Score maximized by the tuner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TuningMetric {
    Recall,
    Accuracy,
}

impl TuningMetric {
    fn score(&self, metrics: &ModelMetrics) -> f64 {
        match self {
            TuningMetric::Recall => metrics.recall,
            TuningMetric::Accuracy => metrics.accuracy,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TuningMetric::Recall => "recall",
            TuningMetric::Accuracy => "accuracy",
        }
    }
}

impl std::str::FromStr for TuningMetric {
    type Err = ChurnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "recall" => Ok(TuningMetric::Recall),
            "accuracy" => Ok(TuningMetric::Accuracy),
            other => Err(ChurnError::ConfigError(format!("unknown tuning metric '{}'", other))),
        }
    }
}

/// How each trial is scored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TuningStrategy {
    /// Stratified k-fold, mean score, labels at probability 0.5
    CrossValidation { folds: usize },
    /// Single stratified holdout, class-weighted, labels at `threshold`
    Holdout { test_size: f64, threshold: f64 },
}

impl Default for TuningStrategy {
    fn default() -> Self {
        TuningStrategy::CrossValidation { folds: 3 }
    }
}

/// Search space over the booster's hyperparameters
pub fn xgboost_search_space(extended: bool) -> SearchSpace {
    let space = SearchSpace::new()
        .int("n_estimators", 300, 800)
        .float("learning_rate", 0.01, 0.2)
        .int("max_depth", 3, 10)
        .float("subsample", 0.5, 1.0)
        .float("colsample_bytree", 0.5, 1.0);

    if extended {
        space
            .int("min_child_weight", 1, 10)
            .float("gamma", 0.0, 5.0)
            .float("reg_alpha", 0.0, 5.0)
            .float("reg_lambda", 0.0, 5.0)
    } else {
        space
    }
}

/// Overlay sampled parameters on a base booster configuration
pub fn xgboost_config_from_params(params: &TrialParams, base: &XGBoostConfig) -> Result<XGBoostConfig> {
    let mut config = base.clone();
    for (name, value) in params {
        let as_usize = |v: &ParameterValue| -> Result<usize> {
            v.as_int()
                .filter(|n| *n >= 0)
                .map(|n| n as usize)
                .ok_or_else(|| ChurnError::InvalidParameter {
                    name: name.clone(),
                    value: value.to_string(),
                    reason: "expected a non-negative integer".to_string(),
                })
        };
        let as_f64 = |v: &ParameterValue| v.as_float().unwrap_or_default();

        match name.as_str() {
            "n_estimators" => config.n_estimators = as_usize(value)?,
            "max_depth" => config.max_depth = as_usize(value)?,
            "learning_rate" => config.learning_rate = as_f64(value),
            "subsample" => config.subsample = as_f64(value),
            "colsample_bytree" => config.colsample_bytree = as_f64(value),
            "min_child_weight" => config.min_child_weight = as_f64(value),
            "gamma" => config.gamma = as_f64(value),
            "reg_alpha" => config.reg_alpha = as_f64(value),
            "reg_lambda" => config.reg_lambda = as_f64(value),
            "scale_pos_weight" => config.scale_pos_weight = as_f64(value),
            other => warn!(param = other, "Ignoring unknown booster parameter"),
        }
    }
    Ok(config)
}

/// Persisted outcome of a tuning session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningResult {
    pub best_params: TrialParams,
    pub best_value: f64,
    pub metric: TuningMetric,
    pub strategy: TuningStrategy,
    pub n_trials: usize,
    pub n_pruned: usize,
    pub study: Study,
}

impl TuningResult {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "Saved tuning result");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ChurnError::ArtifactNotFound {
                path: path.display().to_string(),
                hint: "run the tune stage to generate it".to_string(),
            });
        }
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Booster configuration for the final fit
    pub fn xgboost_config(&self, base: &XGBoostConfig) -> Result<XGBoostConfig> {
        xgboost_config_from_params(&self.best_params, base)
    }
}

/// Runs the trial loop over the booster
pub struct ChurnTuner {
    optimization: OptimizationConfig,
    strategy: TuningStrategy,
    metric: TuningMetric,
    search_space: SearchSpace,
    base: XGBoostConfig,
}

impl ChurnTuner {
    pub fn new(optimization: OptimizationConfig, strategy: TuningStrategy, metric: TuningMetric) -> Self {
        let base = XGBoostConfig {
            random_state: optimization.random_state,
            ..Default::default()
        };
        Self {
            optimization: optimization.with_direction(OptimizeDirection::Maximize),
            strategy,
            metric,
            search_space: xgboost_search_space(false),
            base,
        }
    }

    pub fn with_search_space(mut self, space: SearchSpace) -> Self {
        self.search_space = space;
        self
    }

    pub fn with_base_config(mut self, base: XGBoostConfig) -> Self {
        self.base = base;
        self
    }

    fn seed(&self) -> u64 {
        self.optimization.random_state.unwrap_or(42)
    }

    fn score_cross_validation(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        config: &XGBoostConfig,
        folds: usize,
    ) -> Result<f64> {
        let cv = CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: folds, shuffle: true })
            .with_random_state(self.seed());

        let mut scores = Vec::with_capacity(folds);
        for split in cv.split(x.nrows(), Some(y))? {
            let (x_train, y_train) = take_rows(x, y, &split.train_indices);
            let (x_test, y_test) = take_rows(x, y, &split.test_indices);

            let mut model = XGBoostClassifier::new(config.clone());
            model.fit(&x_train, &y_train)?;
            let proba = model.predict_proba(&x_test)?;
            let preds = model.predict(&x_test, 0.5)?;
            let metrics = ModelMetrics::compute_classification(&y_test, &preds, Some(&proba))?;
            scores.push(self.metric.score(&metrics));
        }
        Ok(CVResults::from_scores(scores).mean_score)
    }

    fn score_holdout(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        config: &XGBoostConfig,
        test_size: f64,
        threshold: f64,
    ) -> Result<f64> {
        let (train_idx, test_idx) = stratified_train_test_split(y, test_size, Some(self.seed()))?;
        let (x_train, y_train) = take_rows(x, y, &train_idx);
        let (x_test, y_test) = take_rows(x, y, &test_idx);

        let config = XGBoostConfig {
            scale_pos_weight: class_ratio(&y_train),
            ..config.clone()
        };
        let mut model = XGBoostClassifier::new(config);
        model.fit(&x_train, &y_train)?;

        let proba = model.predict_proba(&x_test)?;
        let preds = proba.mapv(|p| if p >= threshold { 1.0 } else { 0.0 });
        let metrics = ModelMetrics::compute_classification(&y_test, &preds, Some(&proba))?;
        Ok(self.metric.score(&metrics))
    }

    /// Score one sampled configuration
    pub fn objective(&self, x: &Array2<f64>, y: &Array1<f64>, params: &TrialParams) -> Result<f64> {
        let config = xgboost_config_from_params(params, &self.base)?;
        match &self.strategy {
            TuningStrategy::CrossValidation { folds } => self.score_cross_validation(x, y, &config, *folds),
            TuningStrategy::Holdout { test_size, threshold } => {
                self.score_holdout(x, y, &config, *test_size, *threshold)
            }
        }
    }

    /// Run the study; every trial is logged to `tracker` when given
    pub fn tune(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        tracker: Option<&ExperimentTracker>,
    ) -> Result<TuningResult> {
        if x.nrows() != y.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} labels", x.nrows()),
                actual: format!("{} labels", y.len()),
            });
        }

        info!(
            n_trials = self.optimization.n_trials,
            metric = self.metric.name(),
            strategy = ?self.strategy,
            "Starting hyperparameter search"
        );

        let mut optimizer = HyperOptimizer::new(self.optimization.clone(), self.search_space.clone());
        let study = optimizer.optimize(|params| self.objective(x, y, params))?.clone();

        if let Some(tracker) = tracker {
            for trial in &study.trials {
                let mut run = tracker.start_run(format!("trial_{}", trial.trial_id))?;
                run.log_params(trial.params.iter().map(|(k, v)| (k.clone(), *v)));
                run.set_tag("metric", self.metric.name());
                let status = match trial.value {
                    Some(value) => {
                        run.log_metric(self.metric.name(), value);
                        RunStatus::Finished
                    }
                    None => RunStatus::Failed,
                };
                tracker.end_run(run, status)?;
            }
        }

        let best = study.best_trial().ok_or_else(|| {
            ChurnError::OptimizationError("every trial failed; no best parameters".to_string())
        })?;
        let best_value = best.value.unwrap_or_default();
        let best_params = best.params.clone();

        info!(best_value, trials = study.trials.len(), pruned = study.n_pruned(), "Tuning finished");

        Ok(TuningResult {
            best_params,
            best_value,
            metric: self.metric,
            strategy: self.strategy.clone(),
            n_trials: study.trials.len(),
            n_pruned: study.n_pruned(),
            study,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> (Array2<f64>, Array1<f64>) {
        let n = 60;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 7) as f64 });
        let y = Array1::from_iter((0..n).map(|i| if i >= 45 { 1.0 } else { 0.0 }));
        (x, y)
    }

    fn small_space() -> SearchSpace {
        SearchSpace::new()
            .int("n_estimators", 5, 15)
            .float("learning_rate", 0.1, 0.3)
            .int("max_depth", 2, 3)
    }

    #[test]
    fn test_default_space_bounds() {
        let space = xgboost_search_space(false);
        assert_eq!(space.len(), 5);
        assert_eq!(xgboost_search_space(true).len(), 9);
    }

    #[test]
    fn test_config_from_params() {
        let mut params = TrialParams::new();
        params.insert("n_estimators".into(), ParameterValue::Int(400));
        params.insert("learning_rate".into(), ParameterValue::Float(0.05));
        params.insert("min_child_weight".into(), ParameterValue::Int(3));

        let config = xgboost_config_from_params(&params, &XGBoostConfig::default()).unwrap();
        assert_eq!(config.n_estimators, 400);
        assert_eq!(config.learning_rate, 0.05);
        assert_eq!(config.min_child_weight, 3.0);
        assert_eq!(config.max_depth, XGBoostConfig::default().max_depth);
    }

    #[test]
    fn test_negative_integer_rejected() {
        let mut params = TrialParams::new();
        params.insert("max_depth".into(), ParameterValue::Int(-1));
        assert!(xgboost_config_from_params(&params, &XGBoostConfig::default()).is_err());
    }

    #[test]
    fn test_tune_cross_validation() {
        let (x, y) = data();
        let tuner = ChurnTuner::new(
            OptimizationConfig::new().with_n_trials(3),
            TuningStrategy::CrossValidation { folds: 3 },
            TuningMetric::Recall,
        )
        .with_search_space(small_space());

        let result = tuner.tune(&x, &y, None).unwrap();
        assert_eq!(result.n_trials, 3);
        assert!((0.0..=1.0).contains(&result.best_value));
        assert!(result.best_params.contains_key("n_estimators"));
    }

    #[test]
    fn test_tune_holdout_logs_trials_and_saves() {
        let (x, y) = data();
        let dir = tempfile::tempdir().unwrap();
        let tracker = ExperimentTracker::with_dir(dir.path().join("mlruns"));

        let tuner = ChurnTuner::new(
            OptimizationConfig::new().with_n_trials(2),
            TuningStrategy::Holdout { test_size: 0.2, threshold: 0.35 },
            TuningMetric::Accuracy,
        )
        .with_search_space(small_space());

        let result = tuner.tune(&x, &y, Some(&tracker)).unwrap();
        assert_eq!(tracker.list_runs().unwrap().len(), 2);

        let path = dir.path().join(BEST_PARAMS_ARTIFACT);
        result.save(&path).unwrap();
        let loaded = TuningResult::load(&path).unwrap();
        assert_eq!(loaded.best_params, result.best_params);
        assert_eq!(loaded.metric, TuningMetric::Accuracy);

        let config = loaded.xgboost_config(&XGBoostConfig::default()).unwrap();
        assert!((5..=15).contains(&config.n_estimators));
    }

    #[test]
    fn test_all_trials_failing() {
        let (x, y) = data();
        let tuner = ChurnTuner::new(
            OptimizationConfig::new().with_n_trials(2),
            TuningStrategy::CrossValidation { folds: 3 },
            TuningMetric::Recall,
        )
        .with_search_space(SearchSpace::new().float("subsample", 1.5, 2.0));

        let err = tuner.tune(&x, &y, None).unwrap_err();
        assert!(matches!(err, ChurnError::OptimizationError(_)));
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!("Recall".parse::<TuningMetric>().unwrap(), TuningMetric::Recall);
        assert!("auc".parse::<TuningMetric>().is_err());
    }
}
