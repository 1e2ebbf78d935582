//! Sequential trial loop and study bookkeeping

use super::{
    config::{OptimizationConfig, OptimizeDirection},
    samplers::{create_sampler, Sampler},
    search_space::{SearchSpace, TrialParams},
};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of a single trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    pub trial_id: usize,
    pub params: TrialParams,
    /// Objective value; `None` when the trial failed
    pub value: Option<f64>,
    pub duration_secs: f64,
    /// Failed trials are recorded as pruned and never become best
    pub pruned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Study containing all trials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Study {
    pub trials: Vec<TrialResult>,
    pub best_trial_idx: Option<usize>,
    pub total_duration_secs: f64,
    pub direction: OptimizeDirection,
}

impl Study {
    pub fn new(direction: OptimizeDirection) -> Self {
        Self {
            trials: Vec::new(),
            best_trial_idx: None,
            total_duration_secs: 0.0,
            direction,
        }
    }

    pub fn best_trial(&self) -> Option<&TrialResult> {
        self.best_trial_idx.and_then(|idx| self.trials.get(idx))
    }

    pub fn best_value(&self) -> Option<f64> {
        self.best_trial().and_then(|t| t.value)
    }

    pub fn best_params(&self) -> Option<&TrialParams> {
        self.best_trial().map(|t| &t.params)
    }

    fn is_better(&self, value: f64, than: f64) -> bool {
        match self.direction {
            OptimizeDirection::Minimize => value < than,
            OptimizeDirection::Maximize => value > than,
        }
    }

    /// Add a trial result, updating the best index for completed trials
    pub fn add_trial(&mut self, result: TrialResult) {
        let idx = self.trials.len();

        if let (false, Some(value)) = (result.pruned, result.value) {
            let better = match self.best_value() {
                None => true,
                Some(best) => self.is_better(value, best),
            };
            if better {
                self.best_trial_idx = Some(idx);
            }
        }

        self.trials.push(result);
    }

    /// Completed `(params, value)` pairs fed back to the sampler
    pub fn history(&self) -> Vec<(TrialParams, f64)> {
        self.trials
            .iter()
            .filter(|t| !t.pruned)
            .filter_map(|t| t.value.map(|v| (t.params.clone(), v)))
            .collect()
    }

    pub fn n_pruned(&self) -> usize {
        self.trials.iter().filter(|t| t.pruned).count()
    }
}

/// Main hyperparameter optimizer
pub struct HyperOptimizer {
    config: OptimizationConfig,
    search_space: SearchSpace,
    sampler: Box<dyn Sampler>,
    study: Study,
}

impl HyperOptimizer {
    pub fn new(config: OptimizationConfig, search_space: SearchSpace) -> Self {
        let sampler = create_sampler(
            config.sampler.clone(),
            config.random_state,
            config.direction,
            config.n_startup_trials,
        );
        let study = Study::new(config.direction);

        Self { config, search_space, sampler, study }
    }

    /// Run trials sequentially; objective errors mark the trial as pruned
    pub fn optimize<F>(&mut self, mut objective: F) -> Result<&Study>
    where
        F: FnMut(&TrialParams) -> Result<f64>,
    {
        let start = Instant::now();
        let mut trials_without_improvement = 0;

        for trial_id in 0..self.config.n_trials {
            if let Some(t) = self.config.timeout_secs {
                if start.elapsed().as_secs_f64() > t {
                    info!(completed = trial_id, "Optimization timeout reached");
                    break;
                }
            }
            if let Some(p) = self.config.early_stopping_patience {
                if trials_without_improvement >= p {
                    info!(patience = p, "Early stopping: no improvement");
                    break;
                }
            }

            let trial_start = Instant::now();
            let params = self.sampler.sample(&self.search_space, &self.study.history());
            let previous_best = self.study.best_value();

            let result = match objective(&params) {
                Ok(value) if value.is_finite() => {
                    let improved = match previous_best {
                        None => true,
                        Some(best) => match self.config.direction {
                            OptimizeDirection::Minimize => value < best - self.config.min_improvement,
                            OptimizeDirection::Maximize => value > best + self.config.min_improvement,
                        },
                    };
                    if improved {
                        trials_without_improvement = 0;
                    } else {
                        trials_without_improvement += 1;
                    }
                    debug!(trial_id, value, "Trial complete");

                    TrialResult {
                        trial_id,
                        params,
                        value: Some(value),
                        duration_secs: trial_start.elapsed().as_secs_f64(),
                        pruned: false,
                        error: None,
                    }
                }
                outcome => {
                    let error = match outcome {
                        Ok(value) => format!("non-finite objective value {}", value),
                        Err(e) => e.to_string(),
                    };
                    warn!(trial_id, %error, "Trial failed, marking as pruned");
                    TrialResult {
                        trial_id,
                        params,
                        value: None,
                        duration_secs: trial_start.elapsed().as_secs_f64(),
                        pruned: true,
                        error: Some(error),
                    }
                }
            };

            self.study.add_trial(result);
            info!(
                trial_id,
                best = ?self.study.best_value(),
                "Trial {}/{} finished",
                trial_id + 1,
                self.config.n_trials
            );
        }

        self.study.total_duration_secs = start.elapsed().as_secs_f64();
        Ok(&self.study)
    }

    pub fn study(&self) -> &Study {
        &self.study
    }

    pub fn save_study(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.study)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_study(path: impl AsRef<Path>) -> Result<Study> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
