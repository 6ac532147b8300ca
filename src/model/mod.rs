//! Churn classifier implementations
//!
//! Binary classifiers trained on the engineered feature matrix:
//! - Logistic regression (full-batch gradient descent)
//! - CART decision tree (gini/entropy)
//! - Random forest (bootstrap aggregation over trees)
//!
//! plus the evaluation metrics shared by all of them.

pub mod forest;
pub mod logistic;
pub mod metrics;
pub mod tree;

pub use forest::RandomForestClassifier;
pub use logistic::LogisticRegression;
pub use metrics::{roc_curve, ClassificationReport, RocCurve};
pub use tree::DecisionTree;
