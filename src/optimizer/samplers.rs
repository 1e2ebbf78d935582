//! Sampling strategies for hyperparameter optimization

use super::config::OptimizeDirection;
use super::search_space::{SearchSpace, TrialParams};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Type of sampler to use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SamplerType {
    /// Random sampling
    Random,
    /// Tree-structured Parzen Estimator (simplified)
    TPE,
}

/// Trait for hyperparameter samplers
pub trait Sampler: Send + Sync {
    /// Sample the next set of hyperparameters given completed `(params, value)` pairs
    fn sample(&mut self, search_space: &SearchSpace, history: &[(TrialParams, f64)]) -> TrialParams;
}

fn seeded(seed: Option<u64>) -> Xoshiro256PlusPlus {
    match seed {
        Some(s) => Xoshiro256PlusPlus::seed_from_u64(s),
        None => Xoshiro256PlusPlus::from_entropy(),
    }
}

/// Random sampler
#[derive(Debug)]
pub struct RandomSampler {
    rng: Xoshiro256PlusPlus,
}

impl RandomSampler {
    pub fn new(seed: Option<u64>) -> Self {
        Self { rng: seeded(seed) }
    }
}

impl Sampler for RandomSampler {
    fn sample(&mut self, search_space: &SearchSpace, _history: &[(TrialParams, f64)]) -> TrialParams {
        search_space.sample(&mut self.rng)
    }
}

/// TPE-like sampler: random startup, then the candidate closest to the best `gamma` quantile
#[derive(Debug)]
pub struct TPESampler {
    rng: Xoshiro256PlusPlus,
    direction: OptimizeDirection,
    n_startup_trials: usize,
    gamma: f64,
    n_candidates: usize,
}

impl TPESampler {
    pub fn new(seed: Option<u64>, direction: OptimizeDirection) -> Self {
        Self {
            rng: seeded(seed),
            direction,
            n_startup_trials: 10,
            gamma: 0.25,
            n_candidates: 24,
        }
    }

    pub fn with_n_startup(mut self, n: usize) -> Self {
        self.n_startup_trials = n;
        self
    }

    /// Quantile of trials treated as good
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Completed trials ordered best first
    fn ranked<'a>(&self, history: &'a [(TrialParams, f64)]) -> Vec<&'a (TrialParams, f64)> {
        let mut sorted: Vec<_> = history.iter().filter(|(_, v)| v.is_finite()).collect();
        sorted.sort_by(|a, b| {
            let ord = a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal);
            match self.direction {
                OptimizeDirection::Minimize => ord,
                OptimizeDirection::Maximize => ord.reverse(),
            }
        });
        sorted
    }
}

impl Sampler for TPESampler {
    fn sample(&mut self, search_space: &SearchSpace, history: &[(TrialParams, f64)]) -> TrialParams {
        let ranked = self.ranked(history);
        if ranked.len() < self.n_startup_trials || ranked.is_empty() {
            return search_space.sample(&mut self.rng);
        }

        let n_good = ((ranked.len() as f64 * self.gamma).ceil() as usize).clamp(1, ranked.len());
        let (good, bad) = ranked.split_at(n_good);

        // l(x)/g(x) stand-in: closeness to good trials minus closeness to the rest
        let score = |candidate: &TrialParams| -> f64 {
            let closeness = |set: &[&(TrialParams, f64)]| -> f64 {
                if set.is_empty() {
                    return 0.0;
                }
                set.iter()
                    .map(|(p, _)| 1.0 / (1.0 + 10.0 * search_space.distance(candidate, p)))
                    .sum::<f64>()
                    / set.len() as f64
            };
            closeness(good) - 0.5 * closeness(bad)
        };

        let mut best = search_space.sample(&mut self.rng);
        let mut best_score = score(&best);
        for _ in 1..self.n_candidates {
            let candidate = search_space.sample(&mut self.rng);
            let s = score(&candidate);
            if s > best_score {
                best_score = s;
                best = candidate;
            }
        }
        best
    }
}

/// Create a sampler from type
pub fn create_sampler(
    sampler_type: SamplerType,
    seed: Option<u64>,
    direction: OptimizeDirection,
    n_startup_trials: usize,
) -> Box<dyn Sampler> {
    match sampler_type {
        SamplerType::Random => Box::new(RandomSampler::new(seed)),
        SamplerType::TPE => Box::new(TPESampler::new(seed, direction).with_n_startup(n_startup_trials)),
    }
}
