//! Binary classification metrics

use crate::error::{ChurnError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Write as _;

/// Confusion matrix counts for a binary problem (positive class = 1)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_positives: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut cm = Self::default();
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            match (*t > 0.5, *p > 0.5) {
                (true, true) => cm.true_positives += 1,
                (false, true) => cm.false_positives += 1,
                (false, false) => cm.true_negatives += 1,
                (true, false) => cm.false_negatives += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.true_negatives + self.false_positives + self.false_negatives + self.true_positives
    }

    /// Rows are actual labels (0, 1), columns predicted labels (0, 1)
    pub fn as_matrix(&self) -> [[usize; 2]; 2] {
        [
            [self.true_negatives, self.false_positives],
            [self.false_negatives, self.true_positives],
        ]
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}

/// Metrics for model evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// Only available when probabilities are supplied and both classes are present
    pub roc_auc: Option<f64>,
    pub confusion_matrix: ConfusionMatrix,
    pub n_samples: usize,
}

impl ModelMetrics {
    /// Compute metrics from hard labels and, optionally, positive-class probabilities
    pub fn compute_classification(
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        y_prob: Option<&Array1<f64>>,
    ) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(ChurnError::ValidationError("cannot score an empty label set".to_string()));
        }

        let cm = ConfusionMatrix::from_predictions(y_true, y_pred);
        let precision = ratio(cm.true_positives, cm.true_positives + cm.false_positives);
        let recall = ratio(cm.true_positives, cm.true_positives + cm.false_negatives);

        let roc_auc = match y_prob {
            Some(prob) => roc_auc(y_true, prob)?,
            None => None,
        };

        Ok(Self {
            accuracy: ratio(cm.true_positives + cm.true_negatives, cm.total()),
            precision,
            recall,
            f1_score: f1(precision, recall),
            roc_auc,
            confusion_matrix: cm,
            n_samples: y_true.len(),
        })
    }

    /// Metric pairs for the experiment tracker
    pub fn to_pairs(&self) -> Vec<(&'static str, f64)> {
        let mut pairs = vec![
            ("accuracy", self.accuracy),
            ("precision", self.precision),
            ("recall", self.recall),
            ("f1_score", self.f1_score),
        ];
        if let Some(auc) = self.roc_auc {
            pairs.push(("roc_auc", auc));
        }
        pairs
    }

    /// Per-class precision/recall/F1/support table
    pub fn classification_report(&self) -> String {
        let cm = &self.confusion_matrix;
        let rows = [
            (
                "0",
                ratio(cm.true_negatives, cm.true_negatives + cm.false_negatives),
                ratio(cm.true_negatives, cm.true_negatives + cm.false_positives),
                cm.true_negatives + cm.false_positives,
            ),
            (
                "1",
                self.precision,
                self.recall,
                cm.true_positives + cm.false_negatives,
            ),
        ];

        let mut report = String::new();
        let _ = writeln!(report, "{:>12} {:>10} {:>10} {:>10} {:>10}", "", "precision", "recall", "f1-score", "support");
        for (label, p, r, support) in rows {
            let _ = writeln!(report, "{:>12} {:>10.4} {:>10.4} {:>10.4} {:>10}", label, p, r, f1(p, r), support);
        }
        let _ = writeln!(report);
        let _ = writeln!(report, "{:>12} {:>10} {:>10} {:>10.4} {:>10}", "accuracy", "", "", self.accuracy, self.n_samples);
        if let Some(auc) = self.roc_auc {
            let _ = writeln!(report, "{:>12} {:>10} {:>10} {:>10.4}", "roc_auc", "", "", auc);
        }
        report
    }
}

/// Area under the ROC curve via the rank statistic; ties receive average ranks.
/// Returns `None` when only one class is present.
pub fn roc_auc(y_true: &Array1<f64>, y_prob: &Array1<f64>) -> Result<Option<f64>> {
    if y_true.len() != y_prob.len() {
        return Err(ChurnError::ShapeError {
            expected: format!("{} probabilities", y_true.len()),
            actual: format!("{} probabilities", y_prob.len()),
        });
    }

    let n_pos = y_true.iter().filter(|&&v| v > 0.5).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Ok(None);
    }

    let mut order: Vec<usize> = (0..y_prob.len()).collect();
    order.sort_by(|&a, &b| y_prob[a].partial_cmp(&y_prob[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; order.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && y_prob[order[j + 1]] == y_prob[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(t, _)| **t > 0.5)
        .map(|(_, r)| r)
        .sum();

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok(Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classification_metrics() {
        let y_true = array![1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];

        let m = ModelMetrics::compute_classification(&y_true, &y_pred, None).unwrap();

        assert_eq!(
            m.confusion_matrix,
            ConfusionMatrix { true_negatives: 3, false_positives: 1, false_negatives: 1, true_positives: 3 }
        );
        assert!((m.accuracy - 0.75).abs() < 1e-12);
        assert!((m.precision - 0.75).abs() < 1e-12);
        assert!((m.recall - 0.75).abs() < 1e-12);
        assert!((m.f1_score - 0.75).abs() < 1e-12);
        assert!(m.roc_auc.is_none());
    }

    #[test]
    fn test_no_positive_predictions() {
        let y_true = array![1.0, 0.0];
        let y_pred = array![0.0, 0.0];
        let m = ModelMetrics::compute_classification(&y_true, &y_pred, None).unwrap();
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.f1_score, 0.0);
    }

    #[test]
    fn test_roc_auc_perfect_and_ties() {
        let y = array![0.0, 0.0, 1.0, 1.0];
        assert_eq!(roc_auc(&y, &array![0.1, 0.2, 0.8, 0.9]).unwrap(), Some(1.0));
        assert_eq!(roc_auc(&y, &array![0.5, 0.5, 0.5, 0.5]).unwrap(), Some(0.5));
        assert_eq!(roc_auc(&y, &array![0.9, 0.8, 0.2, 0.1]).unwrap(), Some(0.0));
    }

    #[test]
    fn test_roc_auc_single_class() {
        assert_eq!(roc_auc(&array![1.0, 1.0], &array![0.3, 0.7]).unwrap(), None);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(ModelMetrics::compute_classification(&array![1.0], &array![1.0, 0.0], None).is_err());
    }

    #[test]
    fn test_report_mentions_both_classes() {
        let y_true = array![1.0, 0.0, 1.0, 0.0];
        let y_prob = array![0.9, 0.1, 0.4, 0.3];
        let y_pred = y_prob.mapv(|p| if p >= 0.35 { 1.0 } else { 0.0 });
        let m = ModelMetrics::compute_classification(&y_true, &y_pred, Some(&y_prob)).unwrap();
        let report = m.classification_report();
        assert!(report.contains("precision"));
        assert!(report.contains("roc_auc"));
        assert_eq!(m.to_pairs().len(), 5);
    }
}
