//! CART decision tree for binary classification

use crate::error::{ChurnError, Result};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Impurity criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criterion {
    Gini,
    Entropy,
}

/// Decision tree node. Leaves store the positive-class fraction so the
/// forest can average probabilities across trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        /// Fraction of positive (churn) samples in the leaf
        proba: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Binary classification tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth (None = unbounded)
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Candidate feature indices per split (None = all features)
    pub feature_subset: Option<Vec<usize>>,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: Criterion::Gini,
            feature_subset: None,
            n_features: 0,
            feature_importances: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Restrict candidate split features (used by the forest).
    pub fn with_feature_subset(mut self, subset: Vec<usize>) -> Self {
        self.feature_subset = Some(subset);
        self
    }

    /// Fit the tree on binary labels (0/1).
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(ChurnError::Shape {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(ChurnError::Validation("cannot fit on empty data".to_string()));
        }

        self.n_features = n_features;
        let mut importances = vec![0.0; n_features];

        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut importances));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = indices.len();
        let (pos, total) = positive_count(y, indices);

        let should_stop = n_samples < self.min_samples_split
            || self.max_depth.is_some_and(|d| depth >= d)
            || pos == 0
            || pos == total;

        if should_stop {
            return TreeNode::Leaf {
                proba: pos as f64 / total as f64,
                n_samples,
            };
        }

        if let Some((best_feature, best_threshold, best_gain)) = self.find_best_split(x, y, indices)
        {
            let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| x[[i, best_feature]] <= best_threshold);

            if left_indices.len() < self.min_samples_leaf
                || right_indices.len() < self.min_samples_leaf
            {
                return TreeNode::Leaf {
                    proba: pos as f64 / total as f64,
                    n_samples,
                };
            }

            importances[best_feature] += n_samples as f64 * best_gain;

            let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances));
            let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances));

            TreeNode::Split {
                feature_idx: best_feature,
                threshold: best_threshold,
                left,
                right,
                n_samples,
            }
        } else {
            TreeNode::Leaf {
                proba: pos as f64 / total as f64,
                n_samples,
            }
        }
    }

    /// Best (feature, threshold, impurity gain) over the candidate features,
    /// or None when no split improves impurity.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
    ) -> Option<(usize, f64, f64)> {
        let candidates: Vec<usize> = match &self.feature_subset {
            Some(subset) => subset.clone(),
            None => (0..x.ncols()).collect(),
        };

        let (pos, total) = positive_count(y, indices);
        let parent_impurity = self.impurity(pos, total);

        // Each candidate feature independently scans its thresholds.
        let feature_results: Vec<Option<(usize, f64, f64)>> = candidates
            .into_par_iter()
            .map(|feature_idx| {
                let mut values: Vec<f64> =
                    indices.iter().map(|&i| x[[i, feature_idx]]).collect();
                values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                values.dedup();

                let mut best_gain = 0.0f64;
                let mut best_threshold = 0.0f64;

                for window in values.windows(2) {
                    let threshold = (window[0] + window[1]) / 2.0;

                    let mut left_count = 0usize;
                    let mut left_pos = 0usize;
                    for &idx in indices {
                        if x[[idx, feature_idx]] <= threshold {
                            left_count += 1;
                            if y[idx] > 0.5 {
                                left_pos += 1;
                            }
                        }
                    }
                    let right_count = total - left_count;
                    let right_pos = pos - left_pos;

                    if left_count < self.min_samples_leaf || right_count < self.min_samples_leaf {
                        continue;
                    }

                    let n = total as f64;
                    let weighted = (left_count as f64 * self.impurity(left_pos, left_count)
                        + right_count as f64 * self.impurity(right_pos, right_count))
                        / n;

                    let gain = parent_impurity - weighted;
                    if gain > best_gain {
                        best_gain = gain;
                        best_threshold = threshold;
                    }
                }

                if best_gain > 0.0 {
                    Some((feature_idx, best_threshold, best_gain))
                } else {
                    None
                }
            })
            .collect();

        feature_results
            .into_iter()
            .flatten()
            .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
    }

    fn impurity(&self, pos: usize, total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let p = pos as f64 / total as f64;
        match self.criterion {
            Criterion::Gini => 2.0 * p * (1.0 - p),
            Criterion::Entropy => {
                let mut h = 0.0;
                if p > 0.0 {
                    h -= p * p.ln();
                }
                if p < 1.0 {
                    h -= (1.0 - p) * (1.0 - p).ln();
                }
                h
            }
        }
    }

    /// Positive-class probability per row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(ChurnError::ModelNotFitted)?;

        let proba: Vec<f64> = (0..x.nrows())
            .map(|i| {
                let sample = x.row(i).to_vec();
                Self::traverse(root, &sample)
            })
            .collect();

        Ok(Array1::from_vec(proba))
    }

    /// Hard 0/1 predictions at threshold 0.5.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    fn traverse(node: &TreeNode, sample: &[f64]) -> f64 {
        match node {
            TreeNode::Leaf { proba, .. } => *proba,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if sample[*feature_idx] <= *threshold {
                    Self::traverse(left, sample)
                } else {
                    Self::traverse(right, sample)
                }
            }
        }
    }

    /// Normalized impurity-decrease importances.
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }
}

fn positive_count(y: &Array1<f64>, indices: &[usize]) -> (usize, usize) {
    let pos = indices.iter().filter(|&&i| y[i] > 0.5).count();
    (pos, indices.len())
}
