//! Mean-target encoding for categorical columns

use crate::error::{ChurnError, Result};
use polars::prelude::*;
use std::collections::HashMap;

/// Append a mean-target-encoded column for every categorical column.
///
/// For each column `C` in `categories`, rows are grouped by category value,
/// the arithmetic mean of `label` is computed per group over the full frame,
/// and a new `C_<label>` f64 column holds that mean for each row's category.
/// Source columns are left untouched. A category appearing once receives its
/// own label as the mean.
pub fn encode_categoricals(
    df: &DataFrame,
    categories: &[&str],
    label: &str,
) -> Result<DataFrame> {
    let target = label_values(df, label)?;
    let mut result = df.clone();

    for col_name in categories {
        let column = df
            .column(col_name)
            .map_err(|_| ChurnError::ColumnNotFound(col_name.to_string()))?;
        let ca = column
            .str()
            .map_err(|e| ChurnError::Data(e.to_string()))?;

        if ca.len() != target.len() {
            return Err(ChurnError::Shape {
                expected: format!("{} label values", ca.len()),
                actual: format!("{} label values", target.len()),
            });
        }

        let means = category_means(ca, &target);

        let encoded: Vec<f64> = ca
            .into_iter()
            .map(|v| v.and_then(|s| means.get(s).copied()).unwrap_or(0.0))
            .collect();

        let new_name = format!("{}_{}", col_name, label);
        let series = Series::new(new_name.into(), encoded);
        result
            .with_column(series)
            .map_err(|e| ChurnError::Data(e.to_string()))?;
    }

    tracing::info!(columns = categories.len(), "categorical columns encoded");
    Ok(result)
}

/// Extract the label column as f64, casting from any numeric type.
fn label_values(df: &DataFrame, label: &str) -> Result<Vec<f64>> {
    let column = df
        .column(label)
        .map_err(|_| ChurnError::ColumnNotFound(label.to_string()))?;
    let cast = column
        .cast(&DataType::Float64)
        .map_err(|e| ChurnError::Data(e.to_string()))?;
    let values: Vec<f64> = cast
        .f64()
        .map_err(|e| ChurnError::Data(e.to_string()))?
        .into_iter()
        .map(|v| v.unwrap_or(0.0))
        .collect();
    Ok(values)
}

/// Group-wise arithmetic mean of the label per category value.
fn category_means(ca: &StringChunked, target: &[f64]) -> HashMap<String, f64> {
    let mut sums: HashMap<String, f64> = HashMap::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for (cat, &t) in ca.into_iter().zip(target.iter()) {
        if let Some(c) = cat {
            *sums.entry(c.to_string()).or_insert(0.0) += t;
            *counts.entry(c.to_string()).or_insert(0) += 1;
        }
    }

    sums.into_iter()
        .map(|(k, sum)| {
            let count = counts.get(&k).copied().unwrap_or(1);
            (k, sum / count as f64)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> DataFrame {
        df!(
            "Gender" => &["M", "F", "M", "F", "M"],
            "Churn" => &[1i32, 0, 1, 1, 0]
        )
        .unwrap()
    }

    #[test]
    fn test_encoded_value_is_group_mean() {
        let df = sample_frame();
        let encoded = encode_categoricals(&df, &["Gender"], "Churn").unwrap();

        let col = encoded.column("Gender_Churn").unwrap().f64().unwrap();
        let values: Vec<f64> = col.into_iter().flatten().collect();

        // M: (1 + 1 + 0) / 3, F: (0 + 1) / 2
        let expected = [2.0 / 3.0, 0.5, 2.0 / 3.0, 0.5, 2.0 / 3.0];
        for (v, e) in values.iter().zip(expected.iter()) {
            assert!((v - e).abs() < 1e-12, "got {v}, expected {e}");
        }
    }

    #[test]
    fn test_original_column_unchanged() {
        let df = sample_frame();
        let encoded = encode_categoricals(&df, &["Gender"], "Churn").unwrap();

        let col = encoded.column("Gender").unwrap().str().unwrap();
        let values: Vec<&str> = col.into_iter().flatten().collect();
        assert_eq!(values, vec!["M", "F", "M", "F", "M"]);
    }

    #[test]
    fn test_singleton_category_gets_own_label() {
        let df = df!(
            "Card" => &["Blue", "Blue", "Platinum"],
            "Churn" => &[0i32, 1, 1]
        )
        .unwrap();

        let encoded = encode_categoricals(&df, &["Card"], "Churn").unwrap();
        let col = encoded.column("Card_Churn").unwrap().f64().unwrap();
        let values: Vec<f64> = col.into_iter().flatten().collect();

        assert!((values[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_label_column_errors() {
        let df = df!("Gender" => &["M", "F"]).unwrap();
        let err = encode_categoricals(&df, &["Gender"], "Churn").unwrap_err();
        assert!(matches!(err, ChurnError::ColumnNotFound(_)));
    }
}
