//! Model training
//!
//! Fits the logistic baseline and runs a stratified k-fold grid search over
//! the random-forest hyperparameters, then refits the winner on the full
//! training partition and persists both models as JSON artifacts.

use crate::config::ForestParamGrid;
use crate::error::{ChurnError, Result};
use crate::features::TrainTestSplit;
use crate::model::tree::Criterion;
use crate::model::{LogisticRegression, RandomForestClassifier};
use crate::persist;
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Logistic model artifact filename.
pub const LOGISTIC_MODEL_FILE: &str = "logistic_model.json";

/// Random-forest artifact filename.
pub const FOREST_MODEL_FILE: &str = "rfc_model.json";

/// One combination from the hyperparameter grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub use_entropy: bool,
}

impl ForestParams {
    fn build(&self, seed: u64) -> RandomForestClassifier {
        let criterion = if self.use_entropy {
            Criterion::Entropy
        } else {
            Criterion::Gini
        };
        RandomForestClassifier::new(self.n_estimators)
            .with_max_depth(self.max_depth)
            .with_criterion(criterion)
            .with_random_state(seed)
    }
}

/// Both fitted models plus the winning forest parameters.
#[derive(Debug, Clone)]
pub struct TrainedModels {
    pub logistic: LogisticRegression,
    pub forest: RandomForestClassifier,
    pub best_params: ForestParams,
    pub best_cv_accuracy: f64,
}

/// Train both models on the training partition and persist them under
/// `models_dir` as `logistic_model.json` and `rfc_model.json`.
pub fn train_models(
    split: &TrainTestSplit,
    grid: &ForestParamGrid,
    folds: usize,
    seed: u64,
    models_dir: &Path,
) -> Result<TrainedModels> {
    info!(
        rows = split.x_train.nrows(),
        features = split.x_train.ncols(),
        "training models"
    );

    let mut logistic = LogisticRegression::new().with_max_iter(3000);
    logistic.fit(&split.x_train, &split.y_train)?;
    info!("logistic regression fitted");

    let (best_params, best_cv_accuracy) =
        grid_search(&split.x_train, &split.y_train, grid, folds, seed)?;
    info!(
        n_estimators = best_params.n_estimators,
        max_depth = ?best_params.max_depth,
        entropy = best_params.use_entropy,
        cv_accuracy = best_cv_accuracy,
        "grid search complete"
    );

    let mut forest = best_params.build(seed);
    forest.fit(&split.x_train, &split.y_train)?;

    persist::save_json(&logistic, &models_dir.join(LOGISTIC_MODEL_FILE))?;
    persist::save_json(&forest, &models_dir.join(FOREST_MODEL_FILE))?;

    Ok(TrainedModels {
        logistic,
        forest,
        best_params,
        best_cv_accuracy,
    })
}

/// Exhaustive search over the grid, scored by mean stratified k-fold
/// accuracy. Ties keep the earlier combination, so the result is
/// deterministic for a seed.
pub fn grid_search(
    x: &Array2<f64>,
    y: &Array1<f64>,
    grid: &ForestParamGrid,
    folds: usize,
    seed: u64,
) -> Result<(ForestParams, f64)> {
    if grid.is_empty() {
        return Err(ChurnError::Validation("empty hyperparameter grid".to_string()));
    }

    let fold_indices = stratified_kfold(y, folds, seed)?;

    let mut best: Option<(ForestParams, f64)> = None;
    for &n_estimators in &grid.n_estimators {
        for &max_depth in &grid.max_depth {
            for &use_entropy in &grid.use_entropy {
                let params = ForestParams {
                    n_estimators,
                    max_depth,
                    use_entropy,
                };
                let score = cv_accuracy(x, y, &params, &fold_indices, seed)?;
                debug!(?params, score, "grid point scored");

                if best.as_ref().map_or(true, |(_, s)| score > *s) {
                    best = Some((params, score));
                }
            }
        }
    }

    best.ok_or_else(|| ChurnError::Validation("grid search produced no result".to_string()))
}

fn cv_accuracy(
    x: &Array2<f64>,
    y: &Array1<f64>,
    params: &ForestParams,
    folds: &[(Vec<usize>, Vec<usize>)],
    seed: u64,
) -> Result<f64> {
    let mut total = 0.0;
    for (train_idx, val_idx) in folds {
        let x_fold = x.select(Axis(0), train_idx);
        let y_fold = Array1::from_vec(train_idx.iter().map(|&i| y[i]).collect());
        let x_val = x.select(Axis(0), val_idx);
        let y_val = Array1::from_vec(val_idx.iter().map(|&i| y[i]).collect());

        let mut forest = params.build(seed);
        forest.fit(&x_fold, &y_fold)?;

        let predictions = forest.predict(&x_val)?;
        let correct = predictions
            .iter()
            .zip(y_val.iter())
            .filter(|(p, a)| (*p - *a).abs() < 0.5)
            .count();
        total += correct as f64 / y_val.len() as f64;
    }
    Ok(total / folds.len() as f64)
}

/// Stratified k-fold assignment: each class is shuffled with its own seeded
/// RNG pass and dealt round-robin, so fold class ratios track the whole set.
pub fn stratified_kfold(
    y: &Array1<f64>,
    k: usize,
    seed: u64,
) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
    if k < 2 {
        return Err(ChurnError::Validation(format!("need at least 2 folds, got {}", k)));
    }
    if y.len() < k {
        return Err(ChurnError::Validation(format!(
            "{} rows cannot fill {} folds",
            y.len(),
            k
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut pos: Vec<usize> = (0..y.len()).filter(|&i| y[i] > 0.5).collect();
    let mut neg: Vec<usize> = (0..y.len()).filter(|&i| y[i] <= 0.5).collect();
    pos.shuffle(&mut rng);
    neg.shuffle(&mut rng);

    let mut fold_members: Vec<Vec<usize>> = vec![Vec::new(); k];
    for (i, idx) in pos.into_iter().chain(neg).enumerate() {
        fold_members[i % k].push(idx);
    }

    let splits = (0..k)
        .map(|fold| {
            let val = fold_members[fold].clone();
            let train: Vec<usize> = fold_members
                .iter()
                .enumerate()
                .filter(|(f, _)| *f != fold)
                .flat_map(|(_, members)| members.iter().copied())
                .collect();
            (train, val)
        })
        .collect();

    Ok(splits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use tempfile::TempDir;

    fn sample_split(n: usize) -> TrainTestSplit {
        let x_train = Array2::from_shape_fn((n, 3), |(r, c)| {
            let base = if r % 2 == 0 { 0.0 } else { 5.0 };
            base + (r * 3 + c) as f64 * 0.01
        });
        let y_train = Array1::from_shape_fn(n, |i| (i % 2) as f64);
        let x_test = x_train.clone();
        let y_test = y_train.clone();
        TrainTestSplit {
            x_train,
            x_test,
            y_train,
            y_test,
        }
    }

    #[test]
    fn test_stratified_folds_cover_all_rows() {
        let y = Array1::from_shape_fn(20, |i| (i % 4 == 0) as usize as f64);
        let folds = stratified_kfold(&y, 5, 42).unwrap();

        assert_eq!(folds.len(), 5);
        for (train, val) in &folds {
            assert_eq!(train.len() + val.len(), 20);
            let mut all: Vec<usize> = train.iter().chain(val.iter()).copied().collect();
            all.sort_unstable();
            all.dedup();
            assert_eq!(all.len(), 20);
        }
    }

    #[test]
    fn test_stratified_folds_balance_classes() {
        // 10 positives and 10 negatives over 5 folds: 2 of each per fold.
        let y = Array1::from_shape_fn(20, |i| (i < 10) as usize as f64);
        let folds = stratified_kfold(&y, 5, 42).unwrap();

        for (_, val) in &folds {
            let pos = val.iter().filter(|&&i| y[i] > 0.5).count();
            assert_eq!(pos, 2);
            assert_eq!(val.len(), 4);
        }
    }

    #[test]
    fn test_kfold_rejects_degenerate_k() {
        let y = Array1::from_vec(vec![0.0, 1.0, 0.0]);
        assert!(stratified_kfold(&y, 1, 42).is_err());
        assert!(stratified_kfold(&y, 5, 42).is_err());
    }

    #[test]
    fn test_grid_search_picks_a_grid_member() {
        let split = sample_split(24);
        let grid = ForestParamGrid {
            n_estimators: vec![5, 10],
            max_depth: vec![Some(3)],
            use_entropy: vec![false],
        };

        let (params, score) = grid_search(&split.x_train, &split.y_train, &grid, 3, 42).unwrap();
        assert!(grid.n_estimators.contains(&params.n_estimators));
        assert_eq!(params.max_depth, Some(3));
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn test_grid_search_deterministic() {
        let split = sample_split(24);
        let grid = ForestParamGrid::small();

        let a = grid_search(&split.x_train, &split.y_train, &grid, 3, 42).unwrap();
        let b = grid_search(&split.x_train, &split.y_train, &grid, 3, 42).unwrap();
        assert_eq!(a.0, b.0);
        assert_eq!(a.1, b.1);
    }

    #[test]
    fn test_train_models_persists_both_artifacts() {
        let dir = TempDir::new().unwrap();
        let split = sample_split(24);

        let trained =
            train_models(&split, &ForestParamGrid::small(), 3, 42, dir.path()).unwrap();

        let logistic_path = dir.path().join(LOGISTIC_MODEL_FILE);
        let forest_path = dir.path().join(FOREST_MODEL_FILE);
        assert!(logistic_path.exists());
        assert!(forest_path.exists());

        let reloaded: RandomForestClassifier = persist::load_json(&forest_path).unwrap();
        assert_eq!(
            trained.forest.predict_proba(&split.x_test).unwrap(),
            reloaded.predict_proba(&split.x_test).unwrap()
        );
    }

    #[test]
    fn test_empty_grid_errors() {
        let split = sample_split(12);
        let grid = ForestParamGrid {
            n_estimators: vec![],
            max_depth: vec![Some(3)],
            use_entropy: vec![false],
        };
        assert!(grid_search(&split.x_train, &split.y_train, &grid, 3, 42).is_err());
    }
}
