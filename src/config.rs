//! Fixed pipeline constants
//!
//! The pipeline has no runtime configuration surface: file paths, column
//! lists, the split fraction, and the random seed are build-time constants.
//! Functions take these as arguments so tests can substitute temp paths.

use serde::{Deserialize, Serialize};

/// Default input dataset.
pub const DATA_PATH: &str = "data/bank_data.csv";

/// EDA images directory.
pub const EDA_DIR: &str = "images/eda";

/// Results directory (ROC curves, reports, feature importances).
pub const RESULTS_DIR: &str = "images/results";

/// Trained model artifacts directory.
pub const MODELS_DIR: &str = "models";

/// Test-harness log file.
pub const TEST_LOG_PATH: &str = "logs/churn_tests.log";

/// Raw attrition status column in the input CSV.
pub const STATUS_COLUMN: &str = "Attrition_Flag";

/// Status value marking a retained customer; anything else counts as churned.
pub const EXISTING_CUSTOMER: &str = "Existing Customer";

/// Derived binary label column.
pub const LABEL_COLUMN: &str = "Churn";

/// Held-out fraction for the train/test split.
pub const TEST_FRACTION: f64 = 0.3;

/// Seed for every reproducible random operation (split, bootstrap, CV).
pub const RANDOM_SEED: u64 = 42;

/// Cross-validation folds for the forest grid search.
pub const CV_FOLDS: usize = 5;

/// Categorical columns receiving mean-target encoding.
pub const CATEGORICAL_COLUMNS: [&str; 5] = [
    "Gender",
    "Education_Level",
    "Marital_Status",
    "Income_Category",
    "Card_Category",
];

/// Final modeling columns, in fixed order. The trailing five are the
/// encoded counterparts of [`CATEGORICAL_COLUMNS`].
pub const KEEP_COLUMNS: [&str; 19] = [
    "Customer_Age",
    "Dependent_count",
    "Months_on_book",
    "Total_Relationship_Count",
    "Months_Inactive_12_mon",
    "Contacts_Count_12_mon",
    "Credit_Limit",
    "Total_Revolving_Bal",
    "Avg_Open_To_Buy",
    "Total_Amt_Chng_Q4_Q1",
    "Total_Trans_Amt",
    "Total_Trans_Ct",
    "Total_Ct_Chng_Q4_Q1",
    "Avg_Utilization_Ratio",
    "Gender_Churn",
    "Education_Level_Churn",
    "Marital_Status_Churn",
    "Income_Category_Churn",
    "Card_Category_Churn",
];

/// Hyperparameter grid for the random-forest search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestParamGrid {
    pub n_estimators: Vec<usize>,
    /// `None` means unbounded depth.
    pub max_depth: Vec<Option<usize>>,
    pub use_entropy: Vec<bool>,
}

impl Default for ForestParamGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![200, 500],
            max_depth: vec![Some(4), Some(5), Some(100)],
            use_entropy: vec![false, true],
        }
    }
}

impl ForestParamGrid {
    /// A small grid for quick runs and tests.
    pub fn small() -> Self {
        Self {
            n_estimators: vec![20],
            max_depth: vec![Some(4)],
            use_entropy: vec![false],
        }
    }

    /// Number of parameter combinations.
    pub fn len(&self) -> usize {
        self.n_estimators.len() * self.max_depth.len() * self.use_entropy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
