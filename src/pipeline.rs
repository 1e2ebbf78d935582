//! Stage orchestration: validate → preprocess → tune → train → evaluate
//!
//! Every stage reads its inputs from disk and writes its outputs back, so
//! stages can run independently from the CLI or chained by [`Pipeline::run`].

use crate::config::PipelineConfig;
use crate::data::{validate_telco_data, DataLoader, DataSaver, ValidationReport};
use crate::error::Result;
use crate::optimizer::{
    xgboost_search_space, ChurnTuner, OptimizationConfig, TuningMetric, TuningResult,
    TuningStrategy,
};
use crate::preprocessing::{preprocess_data, FeatureBuilder, PreprocessingArtifact};
use crate::tracking::{ExperimentTracker, RunStatus};
use crate::training::{
    load_model, DataSplit, Evaluator, ModelMetrics, TrainEngine, XGBoostClassifier,
    XGBoostConfig, MODEL_ARTIFACT,
};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

pub const TUNING_RUN: &str = "xgb_optuna_tuning";
pub const TRAINING_RUN: &str = "xgb_churn_training";

/// Knobs for the tune stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuneOptions {
    pub n_trials: usize,
    pub metric: TuningMetric,
    pub strategy: TuningStrategy,
    /// Also search `min_child_weight`, `gamma`, `reg_alpha` and `reg_lambda`
    pub extended_space: bool,
}

impl Default for TuneOptions {
    fn default() -> Self {
        Self {
            n_trials: 20,
            metric: TuningMetric::Recall,
            strategy: TuningStrategy::default(),
            extended_space: false,
        }
    }
}

/// Knobs for the train stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainOptions {
    /// Weight positives by the neg/pos ratio of the training split
    pub balanced: bool,
    /// Ignore `best_params.json` even when present
    pub ignore_best_params: bool,
}

/// What a full run produced
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub validation: ValidationReport,
    pub artifact: PreprocessingArtifact,
    pub tuning: Option<TuningResult>,
    pub metrics: ModelMetrics,
}

pub struct Pipeline {
    config: PipelineConfig,
    tracker: ExperimentTracker,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let tracker = ExperimentTracker::with_dir(&config.runs_dir);
        Self { config, tracker }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn tracker(&self) -> &ExperimentTracker {
        &self.tracker
    }

    fn load_raw(&self) -> Result<DataFrame> {
        DataLoader::new()
            .with_infer_schema_length(None)
            .load_csv(&self.config.raw_data_path)
    }

    fn load_processed(&self) -> Result<DataFrame> {
        DataLoader::new()
            .with_infer_schema_length(None)
            .load_csv(&self.config.processed_data_path)
    }

    fn split(&self) -> Result<DataSplit> {
        TrainEngine::new(self.config.training_config()).split(&self.load_processed()?)
    }

    /// Check the raw table; violations are reported, never raised
    pub fn validate(&self) -> Result<ValidationReport> {
        let df = self.load_raw()?;
        let report = validate_telco_data(&df);
        if report.success {
            info!(rows = df.height(), "Raw data passed validation");
        } else {
            warn!(failures = ?report.failures(), "Raw data failed validation");
        }
        Ok(report)
    }

    /// Clean and encode the raw table, then persist the processed CSV and the feature contract
    pub fn preprocess(&self) -> Result<PreprocessingArtifact> {
        let raw = self.load_raw()?;
        let cleaned = preprocess_data(&raw, &self.config.preprocessing_config())?;

        let mut builder = FeatureBuilder::new(self.config.preprocessing_config());
        let mut encoded = builder.fit_transform(&cleaned)?;
        DataSaver::save_csv(&mut encoded, &self.config.processed_data_path)?;

        let artifact = builder.artifact()?;
        artifact.save(self.config.preprocessing_path())?;

        info!(
            rows = encoded.height(),
            features = artifact.feature_columns.len(),
            path = %self.config.preprocessing_path().display(),
            "Saved preprocessing artifact"
        );
        Ok(artifact)
    }

    /// Search hyperparameters on the training split and persist the study
    pub fn tune(&self, options: &TuneOptions) -> Result<TuningResult> {
        let split = self.split()?;

        let optimization = OptimizationConfig::new()
            .with_n_trials(options.n_trials)
            .with_random_state(self.config.random_state);
        let tuner = ChurnTuner::new(optimization, options.strategy.clone(), options.metric)
            .with_search_space(xgboost_search_space(options.extended_space));

        let mut run = self.tracker.start_run(TUNING_RUN)?;
        run.set_tag("metric", options.metric.name());
        run.log_param("n_trials", options.n_trials);
        run.log_param("strategy", format!("{:?}", options.strategy));

        let result = match tuner.tune(&split.x_train, &split.y_train, Some(&self.tracker)) {
            Ok(result) => result,
            Err(e) => {
                self.tracker.end_run(run, RunStatus::Failed)?;
                return Err(e);
            }
        };

        let best_params_path = self.config.best_params_path();
        result.save(&best_params_path)?;

        run.log_params(result.best_params.iter().map(|(k, v)| (k.clone(), *v)));
        run.log_metric(format!("best_{}", options.metric.name()), result.best_value);
        run.log_metric("n_pruned", result.n_pruned as f64);
        self.tracker.log_artifact(&mut run, &best_params_path)?;
        self.tracker.end_run(run, RunStatus::Finished)?;

        Ok(result)
    }

    /// Booster configuration for the final fit: best params when tuned, defaults otherwise
    pub fn final_params(&self, options: &TrainOptions, split: &DataSplit) -> Result<XGBoostConfig> {
        let base = XGBoostConfig::default().with_random_state(self.config.random_state);
        let path = self.config.best_params_path();

        let mut params = if !options.ignore_best_params && path.exists() {
            info!(path = %path.display(), "Using tuned hyperparameters");
            TuningResult::load(&path)?.xgboost_config(&base)?
        } else {
            info!("Using default hyperparameters");
            base
        };
        if options.balanced {
            params.scale_pos_weight = split.scale_pos_weight();
        }
        Ok(params)
    }

    /// Fit the final classifier and persist it as the model artifact
    pub fn train(&self, options: &TrainOptions) -> Result<XGBoostClassifier> {
        let start = Instant::now();
        let engine = TrainEngine::new(self.config.training_config());
        let split = engine.split(&self.load_processed()?)?;
        let params = self.final_params(options, &split)?;

        let mut run = self.tracker.start_run(TRAINING_RUN)?;
        run.log_param("n_estimators", params.n_estimators);
        run.log_param("learning_rate", params.learning_rate);
        run.log_param("max_depth", params.max_depth);
        run.log_param("subsample", params.subsample);
        run.log_param("colsample_bytree", params.colsample_bytree);
        run.log_param("scale_pos_weight", params.scale_pos_weight);

        let outcome = engine.fit(&split, params).and_then(|model| {
            crate::training::save_model(&model, self.config.model_path())?;
            Ok(model)
        });

        match outcome {
            Ok(model) => {
                run.log_metric("train_secs", start.elapsed().as_secs_f64());
                self.tracker.log_artifact(&mut run, self.config.model_path())?;
                self.tracker.end_run(run, RunStatus::Finished)?;
                info!(path = %self.config.model_path().display(), "Saved {}", MODEL_ARTIFACT);
                Ok(model)
            }
            Err(e) => {
                self.tracker.end_run(run, RunStatus::Failed)?;
                Err(e)
            }
        }
    }

    /// Score the persisted model on the held-out split
    pub fn evaluate(&self) -> Result<ModelMetrics> {
        let split = self.split()?;
        let model = load_model(self.config.model_path())?;
        Evaluator::new(self.config.threshold).evaluate_and_log(
            &model,
            &split.x_test,
            &split.y_test,
            &self.config.artifacts_dir,
            &self.tracker,
        )
    }

    /// Every stage in order; `tune` is skipped when `None`
    pub fn run(&self, tune: Option<&TuneOptions>, train: &TrainOptions) -> Result<PipelineSummary> {
        let validation = self.validate()?;
        let artifact = self.preprocess()?;
        let tuning = tune.map(|options| self.tune(options)).transpose()?;
        self.train(train)?;
        let metrics = self.evaluate()?;

        Ok(PipelineSummary {
            validation,
            artifact,
            tuning,
            metrics,
        })
    }
}
