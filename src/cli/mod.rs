//! Telco churn CLI
//!
//! One subcommand per pipeline stage, plus `run` for the whole chain and `serve` for the API.

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::PathBuf;
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::optimizer::{TuningMetric, TuningResult, TuningStrategy};
use crate::pipeline::{Pipeline, TrainOptions, TuneOptions};
use crate::server::{run_server, ServerConfig};
use crate::training::ModelMetrics;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn step_failed() {
    println!("{}", "failed".red());
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<18} {}", muted(key), val.white());
}

/// Run a stage between a `›` line and its `done`/`failed` marker
fn stage<T>(label: &str, f: impl FnOnce() -> crate::error::Result<T>) -> anyhow::Result<(T, std::time::Duration)> {
    step_run(label);
    let start = Instant::now();
    match f() {
        Ok(value) => Ok((value, start.elapsed())),
        Err(e) => {
            step_failed();
            Err(e.into())
        }
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "telco-churn")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Telco customer churn: validate, preprocess, tune, train, evaluate and serve")]
#[command(long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub paths: PathArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Locations and shared knobs; unset flags fall back to env vars, then fixed relative paths
#[derive(Args, Debug, Clone, Default)]
pub struct PathArgs {
    /// Raw Telco CSV
    #[arg(long, global = true)]
    pub raw_data: Option<PathBuf>,

    /// Processed (encoded) CSV
    #[arg(long, global = true)]
    pub processed_data: Option<PathBuf>,

    /// Artifacts directory
    #[arg(long, global = true)]
    pub artifacts: Option<PathBuf>,

    /// Experiment runs directory
    #[arg(long, global = true)]
    pub runs: Option<PathBuf>,

    /// Churn probability threshold
    #[arg(long, global = true)]
    pub threshold: Option<f64>,
}

impl PathArgs {
    pub fn into_config(self) -> anyhow::Result<PipelineConfig> {
        let mut config = PipelineConfig::default();
        if let Some(path) = self.raw_data {
            config = config.with_raw_data(path);
        }
        if let Some(path) = self.processed_data {
            config = config.with_processed_data(path);
        }
        if let Some(dir) = self.artifacts {
            config = config.with_artifacts_dir(dir);
        }
        if let Some(dir) = self.runs {
            config = config.with_runs_dir(dir);
        }
        if let Some(threshold) = self.threshold {
            if !(0.0..=1.0).contains(&threshold) {
                anyhow::bail!("--threshold must be in [0, 1], got {}", threshold);
            }
            config = config.with_threshold(threshold);
        }
        Ok(config)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum MetricArg {
    Recall,
    Accuracy,
}

impl From<MetricArg> for TuningMetric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Recall => TuningMetric::Recall,
            MetricArg::Accuracy => TuningMetric::Accuracy,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Stratified k-fold cross-validation
    Cv,
    /// Single stratified holdout at the configured threshold
    Holdout,
}

#[derive(Args, Debug, Clone)]
pub struct TuneArgs {
    /// Number of trials
    #[arg(long, default_value = "20")]
    pub trials: usize,

    /// Score to maximize
    #[arg(long, value_enum, default_value = "recall")]
    pub metric: MetricArg,

    /// How each trial is scored
    #[arg(long, value_enum, default_value = "cv")]
    pub strategy: StrategyArg,

    /// Cross-validation folds
    #[arg(long, default_value = "3")]
    pub folds: usize,

    /// Holdout fraction
    #[arg(long, default_value = "0.2")]
    pub holdout_size: f64,

    /// Search regularization parameters too
    #[arg(long)]
    pub extended: bool,
}

impl TuneArgs {
    pub fn options(&self, threshold: f64) -> TuneOptions {
        let strategy = match self.strategy {
            StrategyArg::Cv => TuningStrategy::CrossValidation { folds: self.folds },
            StrategyArg::Holdout => TuningStrategy::Holdout {
                test_size: self.holdout_size,
                threshold,
            },
        };
        TuneOptions {
            n_trials: self.trials,
            metric: self.metric.into(),
            strategy,
            extended_space: self.extended,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct TrainArgs {
    /// Weight positives by the neg/pos ratio
    #[arg(long)]
    pub balanced: bool,

    /// Train with default hyperparameters even if best_params.json exists
    #[arg(long)]
    pub default_params: bool,
}

impl TrainArgs {
    pub fn options(&self) -> TrainOptions {
        TrainOptions {
            balanced: self.balanced,
            ignore_best_params: self.default_params,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate the raw dataset
    Validate,

    /// Clean and encode the raw dataset, writing the processed CSV and preprocessing artifact
    Preprocess,

    /// Search booster hyperparameters and save best_params.json
    Tune(TuneArgs),

    /// Train the final model
    Train(TrainArgs),

    /// Evaluate the saved model on the holdout split
    Evaluate,

    /// Run every stage in order
    Run {
        /// Skip hyperparameter search
        #[arg(long)]
        skip_tune: bool,

        #[command(flatten)]
        tune: TuneArgs,

        #[command(flatten)]
        train: TrainArgs,
    },

    /// Start the prediction API
    Serve {
        /// Server port (default: API_PORT or 8000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Server host (default: API_HOST or 0.0.0.0)
        #[arg(long)]
        host: Option<String>,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_validate(pipeline: &Pipeline) -> anyhow::Result<()> {
    section("Validate");

    let (report, elapsed) = stage("Checking raw data", || pipeline.validate())?;
    step_done(&format!("{:?}", elapsed));

    for warning in &report.warnings {
        println!("  {} {}", "!".yellow(), warning);
    }
    if report.success {
        println!("  {} {}", ok("✓"), "all checks passed");
        println!();
        return Ok(());
    }

    for failure in report.failures() {
        println!("  {} {}", "✗".red(), failure);
    }
    println!();
    anyhow::bail!("validation failed with {} violation(s)", report.violations.len())
}

pub fn cmd_preprocess(pipeline: &Pipeline) -> anyhow::Result<()> {
    section("Preprocess");

    let (artifact, elapsed) = stage("Cleaning and encoding", || pipeline.preprocess())?;
    step_done(&format!("{} features in {:?}", artifact.feature_columns.len(), elapsed));

    kv("Processed data", &pipeline.config().processed_data_path.display().to_string());
    kv("Artifact", &pipeline.config().preprocessing_path().display().to_string());
    println!();
    Ok(())
}

fn print_tuning(result: &TuningResult) {
    println!();
    for (name, value) in &result.best_params {
        kv(name, &value.to_string());
    }
    println!(
        "  {:<18} {}",
        muted(&format!("best {}", result.metric.name())),
        format!("{:.4}", result.best_value).white().bold()
    );
    kv("Trials", &format!("{} ({} pruned)", result.n_trials, result.n_pruned));
}

pub fn cmd_tune(pipeline: &Pipeline, args: &TuneArgs) -> anyhow::Result<()> {
    section("Tune");

    let options = args.options(pipeline.config().threshold);
    let label = format!("Running {} trials", args.trials);
    let (result, elapsed) = stage(&label, || pipeline.tune(&options))?;
    step_done(&format!("{:?}", elapsed));

    print_tuning(&result);
    kv("Saved", &pipeline.config().best_params_path().display().to_string());
    println!();
    Ok(())
}

pub fn cmd_train(pipeline: &Pipeline, args: &TrainArgs) -> anyhow::Result<()> {
    section("Train");

    let (model, elapsed) = stage("Fitting classifier", || pipeline.train(&args.options()))?;
    step_done(&format!("{:?}", elapsed));

    kv("Trees", &model.config().n_estimators.to_string());
    kv("Features", &model.n_features().to_string());
    kv("Model", &pipeline.config().model_path().display().to_string());
    println!();
    Ok(())
}

fn print_metrics(metrics: &ModelMetrics, threshold: f64) {
    println!();
    kv("Threshold", &format!("{:.2}", threshold));
    for (name, value) in metrics.to_pairs() {
        println!("  {:<18} {}", muted(name), format!("{:.4}", value).white().bold());
    }
    println!();
    for line in metrics.classification_report().lines() {
        println!("  {}", dim(line));
    }
}

pub fn cmd_evaluate(pipeline: &Pipeline) -> anyhow::Result<()> {
    section("Evaluate");

    let (metrics, elapsed) = stage("Scoring holdout split", || pipeline.evaluate())?;
    step_done(&format!("{} rows in {:?}", metrics.n_samples, elapsed));

    print_metrics(&metrics, pipeline.config().threshold);
    println!();
    Ok(())
}

pub fn cmd_run(
    pipeline: &Pipeline,
    skip_tune: bool,
    tune: &TuneArgs,
    train: &TrainArgs,
) -> anyhow::Result<()> {
    let start = Instant::now();

    // validation findings are shown but do not stop the run
    if let Err(e) = cmd_validate(pipeline) {
        println!("  {} {}", "!".yellow(), e);
    }
    cmd_preprocess(pipeline)?;
    if !skip_tune {
        cmd_tune(pipeline, tune)?;
    }
    cmd_train(pipeline, train)?;
    cmd_evaluate(pipeline)?;

    println!("  {} {}", ok("✓"), format!("pipeline finished in {:.1?}", start.elapsed()).white());
    println!();
    Ok(())
}

pub async fn cmd_serve(
    config: &PipelineConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let defaults = ServerConfig::default();
    let server_config = ServerConfig {
        host: host.unwrap_or(defaults.host),
        port: port.unwrap_or(defaults.port),
        artifacts_dir: config.artifacts_dir.clone(),
        classification_threshold: config.threshold,
    };

    section("Serve");
    kv("Address", &format!("http://{}:{}", server_config.host, server_config.port));
    kv("Artifacts", &config.artifacts_dir.display().to_string());
    println!();

    run_server(server_config).await
}
