//! Exploratory data analysis
//!
//! Renders the five fixed EDA images into the output directory: churn and
//! customer-age histograms, marital-status proportions, total-transaction
//! histogram, and a Pearson correlation heatmap over the numeric columns.

use crate::error::{ChurnError, Result};
use crate::plot;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Render all EDA images for `df` into `out_dir`, creating it if needed.
/// Running twice produces identical images for the same frame.
pub fn perform_eda(df: &DataFrame, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)?;

    let churn = numeric_column(df, "Churn")?;
    plot::histogram(
        &out_dir.join("churn_distribution.png"),
        "Churn Distribution",
        &churn,
        2,
    )?;

    let ages = numeric_column(df, "Customer_Age")?;
    plot::histogram(
        &out_dir.join("customer_age_distribution.png"),
        "Customer Age Distribution",
        &ages,
        20,
    )?;

    let (labels, proportions) = value_proportions(df, "Marital_Status")?;
    plot::bar_chart(
        &out_dir.join("marital_status_distribution.png"),
        "Marital Status Distribution",
        &labels,
        &proportions,
    )?;

    let trans = numeric_column(df, "Total_Trans_Ct")?;
    plot::histogram(
        &out_dir.join("total_transaction_distribution.png"),
        "Total Transaction Count Distribution",
        &trans,
        20,
    )?;

    let (names, matrix) = correlation_matrix(df)?;
    plot::heatmap(&out_dir.join("heatmap.png"), "Correlation Heatmap", &names, &matrix)?;

    info!(dir = %out_dir.display(), "EDA images written");
    Ok(())
}

/// Extract a column as f64 values, dropping nulls.
fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| ChurnError::ColumnNotFound(name.to_string()))?;
    let cast = column
        .cast(&DataType::Float64)
        .map_err(|e| ChurnError::Data(e.to_string()))?;
    let values: Vec<f64> = cast
        .f64()
        .map_err(|e| ChurnError::Data(e.to_string()))?
        .into_iter()
        .flatten()
        .collect();
    Ok(values)
}

/// Value counts of a string column, normalized to proportions. Categories are
/// returned in alphabetical order so repeated runs render the same chart.
fn value_proportions(df: &DataFrame, name: &str) -> Result<(Vec<String>, Vec<f64>)> {
    let column = df
        .column(name)
        .map_err(|_| ChurnError::ColumnNotFound(name.to_string()))?;
    let ca = column.str().map_err(|e| ChurnError::Data(e.to_string()))?;

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total = 0usize;
    for v in ca.into_iter().flatten() {
        *counts.entry(v.to_string()).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return Err(ChurnError::Data(format!("column '{}' has no values", name)));
    }

    let labels: Vec<String> = counts.keys().cloned().collect();
    let proportions: Vec<f64> = counts.values().map(|&c| c as f64 / total as f64).collect();
    Ok((labels, proportions))
}

/// Pearson correlation matrix over the frame's numeric columns, in schema
/// order. Constant columns correlate 0 with everything and 1 with themselves.
pub fn correlation_matrix(df: &DataFrame) -> Result<(Vec<String>, Vec<Vec<f64>>)> {
    let mut names = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();

    for column in df.get_columns() {
        if column.dtype().is_primitive_numeric() {
            names.push(column.name().to_string());
            columns.push(numeric_column(df, column.name())?);
        }
    }
    if names.is_empty() {
        return Err(ChurnError::Data("no numeric columns for correlation".to_string()));
    }

    let n = names.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let r = pearson(&columns[i], &columns[j]);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }

    debug!(columns = n, "correlation matrix computed");
    Ok((names, matrix))
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..n {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}
