//! Churn pipeline entry point
//!
//! Runs the full workflow: load, EDA, encode, split, train, evaluate.

use bankchurn::config::{
    ForestParamGrid, CATEGORICAL_COLUMNS, CV_FOLDS, DATA_PATH, EDA_DIR, KEEP_COLUMNS,
    LABEL_COLUMN, MODELS_DIR, RANDOM_SEED, RESULTS_DIR, TEST_FRACTION,
};
use bankchurn::{data, eda, encoding, evaluate, features, train};
use clap::Parser;
use colored::*;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bankchurn", about = "Bank customer churn prediction pipeline")]
struct Cli {
    /// Input dataset CSV
    #[arg(long, default_value = DATA_PATH)]
    data: PathBuf,

    /// Directory for EDA images
    #[arg(long, default_value = EDA_DIR)]
    eda_dir: PathBuf,

    /// Directory for evaluation results
    #[arg(long, default_value = RESULTS_DIR)]
    results_dir: PathBuf,

    /// Directory for model artifacts
    #[arg(long, default_value = MODELS_DIR)]
    models_dir: PathBuf,

    /// Use the reduced hyperparameter grid for a quick run
    #[arg(long)]
    quick: bool,
}

fn step(n: usize, title: &str) {
    println!("{} {}", format!("[{}/6]", n).cyan(), title.white().bold());
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bankchurn=info".into()),
        )
        .init();

    let cli = Cli::parse();

    step(1, "Loading dataset");
    let df = data::load_dataset(&cli.data)?;
    println!("  {} rows, {} columns", df.height(), df.width());

    step(2, "Rendering EDA images");
    eda::perform_eda(&df, &cli.eda_dir)?;

    step(3, "Encoding categorical columns");
    let encoded = encoding::encode_categoricals(&df, &CATEGORICAL_COLUMNS, LABEL_COLUMN)?;

    step(4, "Building features and splitting");
    let (x, y, feature_names) = features::build_features(&encoded, &KEEP_COLUMNS, LABEL_COLUMN)?;
    let split = features::train_test_split(&x, &y, TEST_FRACTION, RANDOM_SEED)?;
    println!(
        "  train: {} rows, test: {} rows",
        split.x_train.nrows(),
        split.x_test.nrows()
    );

    step(5, "Training models");
    let grid = if cli.quick {
        ForestParamGrid::small()
    } else {
        ForestParamGrid::default()
    };
    let trained = train::train_models(&split, &grid, CV_FOLDS, RANDOM_SEED, &cli.models_dir)?;
    println!(
        "  best forest: {} trees, depth {:?}, cv accuracy {:.4}",
        trained.best_params.n_estimators,
        trained.best_params.max_depth,
        trained.best_cv_accuracy
    );

    step(6, "Evaluating models");
    let eval = evaluate::evaluate_models(&trained, &split, &feature_names, &cli.results_dir)?;
    println!(
        "  logistic test accuracy {:.4} (AUC {:.4})",
        eval.logistic_test.accuracy, eval.logistic_roc.auc
    );
    println!(
        "  forest   test accuracy {:.4} (AUC {:.4})",
        eval.forest_test.accuracy, eval.forest_roc.auc
    );

    println!("{}", "Pipeline complete".green().bold());
    Ok(())
}
