//! Random forest classifier

use crate::error::{ChurnError, Result};
use super::tree::{Criterion, DecisionTree};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Bagged ensemble of classification trees with sqrt-feature subsampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Base seed; tree i uses `seed + i`
    pub random_state: u64,
    feature_importances: Option<Array1<f64>>,
    n_features: usize,
}

impl Default for RandomForestClassifier {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForestClassifier {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: Criterion::Gini,
            random_state: 42,
            feature_importances: None,
            n_features: 0,
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fit the forest on binary labels (0/1). Trees are built in parallel;
    /// each tree draws a bootstrap sample and a sqrt-sized feature subset
    /// from its own seeded RNG, so results are reproducible for a seed.
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
        let max_features = ((n_features as f64).sqrt().ceil() as usize).max(1);
        let base_seed = self.random_state;

        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                // Bootstrap sample with replacement
                let sample_indices: Vec<usize> = (0..n_samples)
                    .map(|_| (rng.next_u64() as usize) % n_samples)
                    .collect();

                let x_boot = x.select(Axis(0), &sample_indices);
                let y_boot: Array1<f64> =
                    Array1::from_vec(sample_indices.iter().map(|&i| y[i]).collect());

                // Feature subset for this tree
                let mut feature_indices: Vec<usize> = (0..n_features).collect();
                feature_indices.shuffle(&mut rng);
                feature_indices.truncate(max_features);
                feature_indices.sort_unstable();

                let mut tree = DecisionTree::new()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_criterion(self.criterion)
                    .with_feature_subset(feature_indices);

                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }

                tree.fit(&x_boot, &y_boot).ok();
                tree
            })
            .collect();

        self.trees = trees;
        self.compute_feature_importances();

        Ok(self)
    }

    fn compute_feature_importances(&mut self) {
        if self.trees.is_empty() {
            return;
        }

        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (i, &val) in imp.iter().enumerate() {
                    if i < self.n_features {
                        total[i] += val;
                    }
                }
            }
        }

        let n_trees = self.trees.len() as f64;
        for imp in &mut total {
            *imp /= n_trees;
        }

        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for imp in &mut total {
                *imp /= sum;
            }
        }

        self.feature_importances = Some(Array1::from_vec(total));
    }

    /// Positive-class probability per row, averaged across trees.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(ChurnError::ModelNotFitted);
        }

        let all_proba: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .filter_map(|tree| tree.predict_proba(x).ok())
            .collect();

        if all_proba.is_empty() {
            return Err(ChurnError::Validation(
                "no tree could make predictions".to_string(),
            ));
        }

        let n_samples = x.nrows();
        let n_trees = all_proba.len() as f64;
        let proba: Vec<f64> = (0..n_samples)
            .map(|i| all_proba.iter().map(|p| p[i]).sum::<f64>() / n_trees)
            .collect();

        Ok(Array1::from_vec(proba))
    }

    /// Hard 0/1 predictions at threshold 0.5.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Normalized mean-decrease-in-impurity importances.
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable_data() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.2],
            [0.3, 0.1],
            [1.0, 1.0],
            [1.1, 1.1],
            [1.2, 1.2],
            [1.3, 1.1],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_classifier_accuracy() {
        let (x, y) = separable_data();
        let mut forest = RandomForestClassifier::new(25).with_random_state(42);
        forest.fit(&x, &y).unwrap();

        let predictions = forest.predict(&x).unwrap();
        let accuracy = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 0.5)
            .count() as f64
            / y.len() as f64;

        assert!(accuracy >= 0.75, "accuracy too low: {}", accuracy);
    }

    #[test]
    fn test_proba_in_unit_interval() {
        let (x, y) = separable_data();
        let mut forest = RandomForestClassifier::new(10).with_random_state(42);
        forest.fit(&x, &y).unwrap();

        let proba = forest.predict_proba(&x).unwrap();
        for &p in proba.iter() {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_fit_deterministic_for_seed() {
        let (x, y) = separable_data();

        let mut a = RandomForestClassifier::new(15).with_random_state(7);
        a.fit(&x, &y).unwrap();
        let mut b = RandomForestClassifier::new(15).with_random_state(7);
        b.fit(&x, &y).unwrap();

        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_importances_normalized() {
        let (x, y) = separable_data();
        let mut forest = RandomForestClassifier::new(20).with_random_state(42);
        forest.fit(&x, &y).unwrap();

        let importances = forest.feature_importances().unwrap();
        assert_eq!(importances.len(), 2);
        let sum: f64 = importances.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_predict_before_fit_errors() {
        let forest = RandomForestClassifier::new(5);
        let x = array![[0.0, 0.0]];
        assert!(matches!(
            forest.predict(&x).unwrap_err(),
            ChurnError::ModelNotFitted
        ));
    }
}
