//! End-to-end pipeline test on a small synthetic dataset.

use bankchurn::config::{
    ForestParamGrid, CATEGORICAL_COLUMNS, KEEP_COLUMNS, LABEL_COLUMN, TEST_FRACTION,
};
use bankchurn::harness::synthetic_bank_frame;
use bankchurn::model::{LogisticRegression, RandomForestClassifier};
use bankchurn::{data, eda, encoding, evaluate, features, persist, train};
use tempfile::TempDir;

#[test]
fn test_full_pipeline_on_twenty_rows() {
    let work = TempDir::new().unwrap();
    let eda_dir = work.path().join("images/eda");
    let results_dir = work.path().join("images/results");
    let models_dir = work.path().join("models");

    let df = data::derive_label(synthetic_bank_frame(20).unwrap()).unwrap();

    eda::perform_eda(&df, &eda_dir).unwrap();
    let images = std::fs::read_dir(&eda_dir).unwrap().count();
    assert!(images >= 5, "expected five EDA images, found {}", images);

    let encoded = encoding::encode_categoricals(&df, &CATEGORICAL_COLUMNS, LABEL_COLUMN).unwrap();
    let (x, y, names) = features::build_features(&encoded, &KEEP_COLUMNS, LABEL_COLUMN).unwrap();
    assert_eq!(x.ncols(), 19);
    assert_eq!(y.iter().filter(|&&v| v > 0.5).count(), 6); // 70/30 churn mix

    let split = features::train_test_split(&x, &y, TEST_FRACTION, 42).unwrap();
    assert_eq!(split.x_test.nrows(), 6); // ceil(0.3 * 20)
    assert_eq!(split.x_train.nrows(), 14);

    // With the 70/30 frame and seed 42 both partitions keep both classes.
    for labels in [&split.y_train, &split.y_test] {
        assert!(labels.iter().any(|&v| v > 0.5));
        assert!(labels.iter().any(|&v| v <= 0.5));
    }

    let trained =
        train::train_models(&split, &ForestParamGrid::small(), 3, 42, &models_dir).unwrap();

    // Exactly the two expected artifacts, both non-empty.
    let mut artifacts: Vec<String> = std::fs::read_dir(&models_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    artifacts.sort();
    assert_eq!(artifacts, vec!["logistic_model.json", "rfc_model.json"]);
    for name in &artifacts {
        let meta = std::fs::metadata(models_dir.join(name)).unwrap();
        assert!(meta.len() > 0, "{} is empty", name);
    }

    let eval = evaluate::evaluate_models(&trained, &split, &names, &results_dir).unwrap();
    assert!((0.0..=1.0).contains(&eval.logistic_roc.auc));
    assert!((0.0..=1.0).contains(&eval.forest_roc.auc));

    for file in [
        "logistic_results.txt",
        "rfc_results.txt",
        "logistic_roc_curve.png",
        "rfc_roc_curve.png",
        "roc_curve_result.png",
        "feature_importances.png",
    ] {
        assert!(results_dir.join(file).exists(), "missing {}", file);
    }
}

#[test]
fn test_reloaded_models_predict_identically() {
    let work = TempDir::new().unwrap();
    let models_dir = work.path().join("models");

    let df = data::derive_label(synthetic_bank_frame(30).unwrap()).unwrap();
    let encoded = encoding::encode_categoricals(&df, &CATEGORICAL_COLUMNS, LABEL_COLUMN).unwrap();
    let (x, y, _) = features::build_features(&encoded, &KEEP_COLUMNS, LABEL_COLUMN).unwrap();
    let split = features::train_test_split(&x, &y, TEST_FRACTION, 42).unwrap();

    let trained =
        train::train_models(&split, &ForestParamGrid::small(), 3, 42, &models_dir).unwrap();

    let logistic: LogisticRegression =
        persist::load_json(&models_dir.join(train::LOGISTIC_MODEL_FILE)).unwrap();
    let forest: RandomForestClassifier =
        persist::load_json(&models_dir.join(train::FOREST_MODEL_FILE)).unwrap();

    assert_eq!(
        trained.logistic.predict_proba(&split.x_test).unwrap(),
        logistic.predict_proba(&split.x_test).unwrap()
    );
    assert_eq!(
        trained.forest.predict_proba(&split.x_test).unwrap(),
        forest.predict_proba(&split.x_test).unwrap()
    );
}

#[test]
fn test_pipeline_deterministic_across_runs() {
    let df = data::derive_label(synthetic_bank_frame(30).unwrap()).unwrap();
    let encoded = encoding::encode_categoricals(&df, &CATEGORICAL_COLUMNS, LABEL_COLUMN).unwrap();
    let (x, y, _) = features::build_features(&encoded, &KEEP_COLUMNS, LABEL_COLUMN).unwrap();

    let a = features::train_test_split(&x, &y, TEST_FRACTION, 42).unwrap();
    let b = features::train_test_split(&x, &y, TEST_FRACTION, 42).unwrap();
    assert_eq!(a.x_train, b.x_train);

    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let trained_a =
        train::train_models(&a, &ForestParamGrid::small(), 3, 42, dir_a.path()).unwrap();
    let trained_b =
        train::train_models(&b, &ForestParamGrid::small(), 3, 42, dir_b.path()).unwrap();

    assert_eq!(
        trained_a.forest.predict_proba(&a.x_test).unwrap(),
        trained_b.forest.predict_proba(&b.x_test).unwrap()
    );
    assert_eq!(trained_a.best_params, trained_b.best_params);
}
