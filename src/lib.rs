//! Bank customer churn prediction pipeline
//!
//! Scripted end-to-end churn workflow over a bank customer dataset:
//! - [`data`] - CSV loading and binary label derivation
//! - [`eda`] - Exploratory analysis images (distributions, heatmap)
//! - [`encoding`] - Mean-target encoding of categorical columns
//! - [`features`] - Feature matrix assembly and seeded train/test split
//! - [`model`] - Logistic regression, decision tree, random forest, metrics
//! - [`train`] - Model fitting with stratified grid search
//! - [`evaluate`] - Reports, ROC curves, feature importances
//! - [`harness`] - Named pipeline checks with a per-check run log
//!
//! The pipeline is deterministic: the split, bootstrap sampling, and
//! cross-validation all derive from one fixed seed.

pub mod config;
pub mod data;
pub mod eda;
pub mod encoding;
pub mod error;
pub mod evaluate;
pub mod features;
pub mod harness;
pub mod model;
pub mod persist;
pub mod plot;
pub mod train;

pub use error::{ChurnError, Result};
