//! Hyperparameter optimization module
//!
//! Provides a bounded, sequential trial loop:
//! - Search spaces over integer and float parameters
//! - Random and TPE-like samplers
//! - Study bookkeeping with pruned (failed) trials
//! - The churn tuner and its persisted result

mod config;
mod optimizer;
mod samplers;
mod search_space;
pub mod tuner;

pub use config::{OptimizationConfig, OptimizeDirection};
pub use optimizer::{HyperOptimizer, Study, TrialResult};
pub use samplers::{create_sampler, RandomSampler, Sampler, SamplerType, TPESampler};
pub use search_space::{Parameter, ParameterType, ParameterValue, SearchSpace, TrialParams};
pub use tuner::{
    xgboost_config_from_params, xgboost_search_space, ChurnTuner, TuningMetric, TuningResult,
    TuningStrategy, BEST_PARAMS_ARTIFACT,
};
