//! Classification metrics: reports and ROC curves

use crate::error::{ChurnError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-class precision/recall/F1 with support.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// sklearn-style classification report for a binary task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub negative: ClassMetrics,
    pub positive: ClassMetrics,
    pub accuracy: f64,
    pub n_samples: usize,
}

impl ClassificationReport {
    /// Build the report from true labels and hard 0/1 predictions.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(ChurnError::Shape {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(ChurnError::Validation("empty label vector".to_string()));
        }

        let (tp, fp, tn, fn_) = confusion_counts(y_true, y_pred);
        let n = y_true.len();

        let positive = class_metrics(tp, fp, fn_, tp + fn_);
        // Negative class swaps roles: "predicted negative" is the hit.
        let negative = class_metrics(tn, fn_, fp, tn + fp);

        Ok(Self {
            negative,
            positive,
            accuracy: (tp + tn) as f64 / n as f64,
            n_samples: n,
        })
    }
}

fn class_metrics(hits: usize, false_hits: usize, misses: usize, support: usize) -> ClassMetrics {
    let precision = if hits + false_hits > 0 {
        hits as f64 / (hits + false_hits) as f64
    } else {
        0.0
    };
    let recall = if hits + misses > 0 {
        hits as f64 / (hits + misses) as f64
    } else {
        0.0
    };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    ClassMetrics {
        precision,
        recall,
        f1,
        support,
    }
}

fn confusion_counts(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (usize, usize, usize, usize) {
    let mut tp = 0;
    let mut fp = 0;
    let mut tn = 0;
    let mut fn_ = 0;

    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        match (*t > 0.5, *p > 0.5) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (false, false) => tn += 1,
            (true, false) => fn_ += 1,
        }
    }

    (tp, fp, tn, fn_)
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (name, m) in [("0", &self.negative), ("1", &self.positive)] {
            writeln!(
                f,
                "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>32.2} {:>10}",
            "accuracy", self.accuracy, self.n_samples
        )
    }
}

/// ROC curve points plus the area under the curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocCurve {
    /// False-positive rates, non-decreasing from 0 to 1
    pub fpr: Vec<f64>,
    /// True-positive rates, non-decreasing from 0 to 1
    pub tpr: Vec<f64>,
    /// Trapezoidal area under the curve
    pub auc: f64,
}

/// Sweep classification thresholds over the scores to build an ROC curve.
pub fn roc_curve(y_true: &Array1<f64>, scores: &Array1<f64>) -> Result<RocCurve> {
    if y_true.len() != scores.len() {
        return Err(ChurnError::Shape {
            expected: format!("{} scores", y_true.len()),
            actual: format!("{} scores", scores.len()),
        });
    }

    let n_pos = y_true.iter().filter(|&&t| t > 0.5).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(ChurnError::Validation(
            "ROC needs both classes present".to_string(),
        ));
    }

    // Descending by score; each prefix is one threshold.
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut fpr = vec![0.0];
    let mut tpr = vec![0.0];
    let mut tp = 0usize;
    let mut fp = 0usize;

    let mut i = 0;
    while i < order.len() {
        // Consume ties in one step so the curve is threshold-consistent.
        let score = scores[order[i]];
        while i < order.len() && scores[order[i]] == score {
            if y_true[order[i]] > 0.5 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        fpr.push(fp as f64 / n_neg as f64);
        tpr.push(tp as f64 / n_pos as f64);
    }

    let mut auc = 0.0;
    for w in 0..fpr.len() - 1 {
        auc += (fpr[w + 1] - fpr[w]) * (tpr[w] + tpr[w + 1]) / 2.0;
    }

    Ok(RocCurve { fpr, tpr, auc })
}
