//! Model evaluation
//!
//! Produces the classification report text files, per-model and combined ROC
//! curve images, and the sorted feature-importance chart under the results
//! directory.

use crate::error::{ChurnError, Result};
use crate::features::TrainTestSplit;
use crate::model::{roc_curve, ClassificationReport, RocCurve};
use crate::persist;
use crate::plot;
use crate::train::TrainedModels;
use std::fs;
use std::path::Path;
use tracing::info;

/// Everything computed during evaluation, for callers that want the numbers
/// as well as the files.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub logistic_train: ClassificationReport,
    pub logistic_test: ClassificationReport,
    pub forest_train: ClassificationReport,
    pub forest_test: ClassificationReport,
    pub logistic_roc: RocCurve,
    pub forest_roc: RocCurve,
}

/// Evaluate both models on the split and write every results artifact into
/// `results_dir`.
pub fn evaluate_models(
    trained: &TrainedModels,
    split: &TrainTestSplit,
    feature_names: &[String],
    results_dir: &Path,
) -> Result<Evaluation> {
    fs::create_dir_all(results_dir)?;

    let logistic_train = report_for(
        &split.y_train,
        &trained.logistic.predict(&split.x_train)?,
    )?;
    let logistic_test = report_for(&split.y_test, &trained.logistic.predict(&split.x_test)?)?;
    let forest_train = report_for(&split.y_train, &trained.forest.predict(&split.x_train)?)?;
    let forest_test = report_for(&split.y_test, &trained.forest.predict(&split.x_test)?)?;

    write_report(
        &results_dir.join("logistic_results.txt"),
        "logistic regression",
        &logistic_train,
        &logistic_test,
    )?;
    write_report(
        &results_dir.join("rfc_results.txt"),
        "random forest",
        &forest_train,
        &forest_test,
    )?;

    info!(
        logistic_test_accuracy = logistic_test.accuracy,
        forest_test_accuracy = forest_test.accuracy,
        "test accuracy"
    );

    let logistic_scores = trained.logistic.predict_proba(&split.x_test)?;
    let forest_scores = trained.forest.predict_proba(&split.x_test)?;
    let logistic_roc = roc_curve(&split.y_test, &logistic_scores)?;
    let forest_roc = roc_curve(&split.y_test, &forest_scores)?;

    plot::roc_chart(
        &results_dir.join("logistic_roc_curve.png"),
        "Logistic Regression ROC",
        &[("Logistic Regression".to_string(), logistic_roc.clone())],
    )?;
    plot::roc_chart(
        &results_dir.join("rfc_roc_curve.png"),
        "Random Forest ROC",
        &[("Random Forest".to_string(), forest_roc.clone())],
    )?;
    plot::roc_chart(
        &results_dir.join("roc_curve_result.png"),
        "ROC Curves",
        &[
            ("Logistic Regression".to_string(), logistic_roc.clone()),
            ("Random Forest".to_string(), forest_roc.clone()),
        ],
    )?;

    let importances = trained
        .forest
        .feature_importances()
        .ok_or(ChurnError::ModelNotFitted)?;
    let ranking = feature_importance_ranking(feature_names, importances.as_slice().unwrap_or(&[]));
    let (names, values): (Vec<String>, Vec<f64>) = ranking.into_iter().unzip();
    plot::importance_chart(
        &results_dir.join("feature_importances.png"),
        "Feature Importance",
        &names,
        &values,
    )?;

    Ok(Evaluation {
        logistic_train,
        logistic_test,
        forest_train,
        forest_test,
        logistic_roc,
        forest_roc,
    })
}

fn report_for(
    y_true: &ndarray::Array1<f64>,
    y_pred: &ndarray::Array1<f64>,
) -> Result<ClassificationReport> {
    ClassificationReport::compute(y_true, y_pred)
}

fn write_report(
    path: &Path,
    model_name: &str,
    train: &ClassificationReport,
    test: &ClassificationReport,
) -> Result<()> {
    let contents = format!(
        "{} train results\n{}\n{} test results\n{}",
        model_name, train, model_name, test
    );
    persist::write_text_report(path, &contents)
}

/// Pair feature names with importances and sort descending. Names beyond the
/// importance vector (or vice versa) are dropped.
pub fn feature_importance_ranking(names: &[String], importances: &[f64]) -> Vec<(String, f64)> {
    let mut ranking: Vec<(String, f64)> = names
        .iter()
        .zip(importances.iter())
        .map(|(n, &v)| (n.clone(), v))
        .collect();
    ranking.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranking
}
