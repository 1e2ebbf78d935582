//! Gradient-boosted tree classifier with second-order approximation
//!
//! Each round fits a regression tree to the gradient and hessian of the
//! logistic loss:
//! - Regularized leaf weights: w* = -T(G) / (H + lambda), T = L1 soft-threshold
//! - Split gain: 0.5 * [T(GL)²/(HL+λ) + T(GR)²/(HR+λ) - T(G)²/(H+λ)], kept only above gamma
//! - Minimum child hessian (min_child_weight)
//! - Row and column subsampling per tree
//! - Positive-class reweighting (scale_pos_weight)

use crate::error::{ChurnError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Booster hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XGBoostConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// L1 regularization on leaf weights
    pub reg_alpha: f64,
    /// Minimum loss reduction to make a split
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    /// Weight applied to positive samples (neg/pos for balanced training)
    pub scale_pos_weight: f64,
    pub random_state: Option<u64>,
}

impl Default for XGBoostConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            scale_pos_weight: 1.0,
            random_state: Some(42),
        }
    }
}

impl XGBoostConfig {
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_scale_pos_weight(mut self, weight: f64) -> Self {
        self.scale_pos_weight = weight;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Reject values the booster cannot train with
    pub fn validate(&self) -> Result<()> {
        let invalid = |name: &str, value: String, reason: &str| ChurnError::InvalidParameter {
            name: name.to_string(),
            value,
            reason: reason.to_string(),
        };

        if self.n_estimators == 0 {
            return Err(invalid("n_estimators", "0".into(), "must be at least 1"));
        }
        if !(self.learning_rate > 0.0) {
            return Err(invalid("learning_rate", self.learning_rate.to_string(), "must be positive"));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(invalid("subsample", self.subsample.to_string(), "must be in (0, 1]"));
        }
        if !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0) {
            return Err(invalid(
                "colsample_bytree",
                self.colsample_bytree.to_string(),
                "must be in (0, 1]",
            ));
        }
        if self.reg_lambda < 0.0 || self.reg_alpha < 0.0 || self.gamma < 0.0 {
            return Err(invalid("regularization", format!(
                "lambda={}, alpha={}, gamma={}",
                self.reg_lambda, self.reg_alpha, self.gamma
            ), "must be non-negative"));
        }
        if !(self.scale_pos_weight > 0.0) {
            return Err(invalid(
                "scale_pos_weight",
                self.scale_pos_weight.to_string(),
                "must be positive",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum XGBNode {
    Leaf { weight: f64 },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<XGBNode>,
        right: Box<XGBNode>,
    },
}

impl XGBNode {
    fn predict(&self, sample: ArrayView1<'_, f64>) -> f64 {
        match self {
            XGBNode::Leaf { weight } => *weight,
            XGBNode::Split { feature, threshold, left, right } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }

    fn count_splits(&self, counts: &mut [f64]) {
        if let XGBNode::Split { feature, left, right, .. } = self {
            if let Some(c) = counts.get_mut(*feature) {
                *c += 1.0;
            }
            left.count_splits(counts);
            right.count_splits(counts);
        }
    }
}

struct Gradients<'a> {
    grad: &'a Array1<f64>,
    hess: &'a Array1<f64>,
}

/// Candidate split: (feature, threshold, gain)
type SplitCandidate = (usize, f64, f64);

/// Grow one tree with exact greedy split search
fn build_xgb_tree(
    x: &Array2<f64>,
    g: &Gradients<'_>,
    indices: &[usize],
    feature_indices: &[usize],
    depth: usize,
    config: &XGBoostConfig,
) -> XGBNode {
    let g_sum: f64 = indices.iter().map(|&i| g.grad[i]).sum();
    let h_sum: f64 = indices.iter().map(|&i| g.hess[i]).sum();
    let leaf = XGBNode::Leaf {
        weight: leaf_weight(g_sum, h_sum, config.reg_lambda, config.reg_alpha),
    };

    if depth >= config.max_depth || indices.len() < 2 || h_sum < config.min_child_weight {
        return leaf;
    }

    let best = feature_indices
        .par_iter()
        .filter_map(|&f| best_split_for_feature(x, g, indices, f, config))
        .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal));

    match best {
        Some((feature, threshold, gain)) if gain > config.gamma => {
            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
                indices.iter().partition(|&&i| x[[i, feature]] <= threshold);

            if left_idx.is_empty() || right_idx.is_empty() {
                return leaf;
            }

            let left = build_xgb_tree(x, g, &left_idx, feature_indices, depth + 1, config);
            let right = build_xgb_tree(x, g, &right_idx, feature_indices, depth + 1, config);

            XGBNode::Split {
                feature,
                threshold,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        _ => leaf,
    }
}

/// L1 soft-threshold of a gradient sum
fn soft_threshold(g: f64, alpha: f64) -> f64 {
    if g > alpha {
        g - alpha
    } else if g < -alpha {
        g + alpha
    } else {
        0.0
    }
}

fn leaf_weight(g_sum: f64, h_sum: f64, lambda: f64, alpha: f64) -> f64 {
    let denom = h_sum + lambda;
    if denom <= 0.0 {
        return 0.0;
    }
    -soft_threshold(g_sum, alpha) / denom
}

fn score(g: f64, h: f64, lambda: f64, alpha: f64) -> f64 {
    let t = soft_threshold(g, alpha);
    let denom = h + lambda;
    if denom <= 0.0 {
        0.0
    } else {
        t * t / denom
    }
}

fn best_split_for_feature(
    x: &Array2<f64>,
    g: &Gradients<'_>,
    indices: &[usize],
    feature: usize,
    config: &XGBoostConfig,
) -> Option<SplitCandidate> {
    let mut sorted: Vec<usize> = indices.to_vec();
    sorted.sort_by(|&a, &b| {
        x[[a, feature]]
            .partial_cmp(&x[[b, feature]])
            .unwrap_or(Ordering::Equal)
    });

    let g_total: f64 = sorted.iter().map(|&i| g.grad[i]).sum();
    let h_total: f64 = sorted.iter().map(|&i| g.hess[i]).sum();
    let parent = score(g_total, h_total, config.reg_lambda, config.reg_alpha);

    let mut g_left = 0.0;
    let mut h_left = 0.0;
    let mut best: Option<SplitCandidate> = None;

    for pair in sorted.windows(2) {
        let (idx, next) = (pair[0], pair[1]);
        g_left += g.grad[idx];
        h_left += g.hess[idx];

        let value = x[[idx, feature]];
        let next_value = x[[next, feature]];
        if (next_value - value).abs() < 1e-12 {
            continue;
        }

        let g_right = g_total - g_left;
        let h_right = h_total - h_left;
        if h_left < config.min_child_weight || h_right < config.min_child_weight {
            continue;
        }

        let gain = 0.5
            * (score(g_left, h_left, config.reg_lambda, config.reg_alpha)
                + score(g_right, h_right, config.reg_lambda, config.reg_alpha)
                - parent);

        if best.map_or(true, |(_, _, b)| gain > b) {
            best = Some((feature, (value + next_value) / 2.0, gain));
        }
    }

    best
}

fn subsample(rng: &mut Xoshiro256PlusPlus, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = (((n as f64) * ratio).ceil() as usize).max(1).min(n);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k);
    indices.sort_unstable();
    indices
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Binary classifier trained on the logistic loss
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBoostClassifier {
    config: XGBoostConfig,
    trees: Vec<XGBNode>,
    base_score: f64,
    n_features: usize,
}

impl XGBoostClassifier {
    pub fn new(config: XGBoostConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_score: 0.0,
            n_features: 0,
        }
    }

    pub fn config(&self) -> &XGBoostConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Fit on a feature matrix and 0/1 labels
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.config.validate()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples == 0 || n_features == 0 {
            return Err(ChurnError::TrainingError(
                "cannot fit on an empty feature matrix".to_string(),
            ));
        }
        if y.len() != n_samples {
            return Err(ChurnError::ShapeError {
                expected: format!("{} labels", n_samples),
                actual: format!("{} labels", y.len()),
            });
        }
        if y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(ChurnError::TrainingError("labels must be 0 or 1".to_string()));
        }

        self.n_features = n_features;

        let weights: Array1<f64> =
            y.mapv(|v| if v == 1.0 { self.config.scale_pos_weight } else { 1.0 });
        let w_total = weights.sum();
        let p = (weights.iter().zip(y.iter()).map(|(w, v)| w * v).sum::<f64>() / w_total)
            .clamp(1e-7, 1.0 - 1e-7);
        self.base_score = (p / (1.0 - p)).ln();

        let mut raw = Array1::from_elem(n_samples, self.base_score);
        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.trees.clear();
        for round in 0..self.config.n_estimators {
            let probs = raw.mapv(sigmoid);
            let grad: Array1<f64> = (&probs - y) * &weights;
            let hess: Array1<f64> = probs.mapv(|p| (p * (1.0 - p)).max(1e-7)) * &weights;

            let rows = subsample(&mut rng, n_samples, self.config.subsample);
            let cols = subsample(&mut rng, n_features, self.config.colsample_bytree);

            let tree = build_xgb_tree(
                x,
                &Gradients { grad: &grad, hess: &hess },
                &rows,
                &cols,
                0,
                &self.config,
            );

            for (i, row) in x.rows().into_iter().enumerate() {
                raw[i] += self.config.learning_rate * tree.predict(row);
            }
            self.trees.push(tree);

            if round % 100 == 0 {
                debug!(round, "Boosting round finished");
            }
        }

        Ok(())
    }

    fn check_input(&self, x: &Array2<f64>) -> Result<()> {
        if !self.is_fitted() {
            return Err(ChurnError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(ChurnError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    /// Positive-class probabilities
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_input(x)?;
        let lr = self.config.learning_rate;
        let probs: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| {
                let raw = self.base_score + self.trees.iter().map(|t| lr * t.predict(row)).sum::<f64>();
                sigmoid(raw)
            })
            .collect();
        Ok(Array1::from_vec(probs))
    }

    /// Labels using `probability >= threshold`
    pub fn predict(&self, x: &Array2<f64>, threshold: f64) -> Result<Array1<f64>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.mapv(|p| if p >= threshold { 1.0 } else { 0.0 }))
    }

    /// Split-count importances, normalized to sum to 1
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        if self.n_features == 0 {
            return None;
        }
        let mut counts = vec![0.0f64; self.n_features];
        for tree in &self.trees {
            tree.count_splits(&mut counts);
        }
        let total: f64 = counts.iter().sum();
        if total > 0.0 {
            counts.iter_mut().for_each(|c| *c /= total);
        }
        Some(Array1::from_vec(counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((50, 2), (0..100).map(|i| i as f64 * 0.1).collect()).unwrap();
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|r| if r[0] + r[1] > 5.0 { 1.0 } else { 0.0 })
            .collect();
        (x, y)
    }

    fn accuracy(model: &XGBoostClassifier, x: &Array2<f64>, y: &Array1<f64>) -> f64 {
        let preds = model.predict(x, 0.5).unwrap();
        let correct = preds.iter().zip(y.iter()).filter(|(p, a)| p == a).count();
        correct as f64 / y.len() as f64
    }

    #[test]
    fn test_classifier_fits() {
        let (x, y) = classification_data();
        let mut model = XGBoostClassifier::new(XGBoostConfig::default().with_n_estimators(50).with_max_depth(4));
        model.fit(&x, &y).unwrap();
        let acc = accuracy(&model, &x, &y);
        assert!(acc >= 0.9, "accuracy = {}", acc);
    }

    #[test]
    fn test_predict_proba_range() {
        let (x, y) = classification_data();
        let mut model = XGBoostClassifier::new(XGBoostConfig::default().with_n_estimators(20));
        model.fit(&x, &y).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.len(), x.nrows());
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_regularized_and_subsampled() {
        let (x, y) = classification_data();
        let config = XGBoostConfig {
            n_estimators: 30,
            reg_lambda: 5.0,
            reg_alpha: 1.0,
            gamma: 0.5,
            subsample: 0.7,
            colsample_bytree: 0.5,
            ..Default::default()
        };
        let mut model = XGBoostClassifier::new(config);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict_proba(&x).unwrap().len(), 50);
    }

    #[test]
    fn test_scale_pos_weight_raises_probabilities() {
        let (x, y) = classification_data();
        let mut plain = XGBoostClassifier::new(XGBoostConfig::default().with_n_estimators(5));
        let mut weighted =
            XGBoostClassifier::new(XGBoostConfig::default().with_n_estimators(5).with_scale_pos_weight(5.0));
        plain.fit(&x, &y).unwrap();
        weighted.fit(&x, &y).unwrap();

        let p = plain.predict_proba(&x).unwrap().mean().unwrap();
        let w = weighted.predict_proba(&x).unwrap().mean().unwrap();
        assert!(w > p);
    }

    #[test]
    fn test_same_seed_same_model() {
        let (x, y) = classification_data();
        let config = XGBoostConfig { subsample: 0.8, n_estimators: 10, ..Default::default() };
        let mut a = XGBoostClassifier::new(config.clone());
        let mut b = XGBoostClassifier::new(config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_unfitted_and_shape_errors() {
        let (x, y) = classification_data();
        let mut model = XGBoostClassifier::new(XGBoostConfig::default().with_n_estimators(3));
        assert!(matches!(model.predict_proba(&x), Err(ChurnError::ModelNotFitted)));

        model.fit(&x, &y).unwrap();
        let wrong = Array2::<f64>::zeros((2, 3));
        assert!(matches!(model.predict_proba(&wrong), Err(ChurnError::ShapeError { .. })));
    }

    #[test]
    fn test_invalid_config() {
        let (x, y) = classification_data();
        let mut model = XGBoostClassifier::new(XGBoostConfig { subsample: 0.0, ..Default::default() });
        assert!(matches!(model.fit(&x, &y), Err(ChurnError::InvalidParameter { .. })));
    }

    #[test]
    fn test_feature_importances_sum_to_one() {
        let (x, y) = classification_data();
        let mut model = XGBoostClassifier::new(XGBoostConfig::default().with_n_estimators(10));
        model.fit(&x, &y).unwrap();
        let imp = model.feature_importances().unwrap();
        assert!((imp.sum() - 1.0).abs() < 1e-9);
    }
}
