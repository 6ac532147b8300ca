//! Feature matrix assembly and the seeded train/test split

use crate::error::{ChurnError, Result};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Train/test partitions with row correspondence preserved.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
}

/// Extract the feature matrix and label vector from an encoded frame.
///
/// Columns are taken in the order of `keep_cols`; the returned name list
/// matches the matrix column order.
pub fn build_features(
    df: &DataFrame,
    keep_cols: &[&str],
    label: &str,
) -> Result<(Array2<f64>, Array1<f64>, Vec<String>)> {
    let names: Vec<String> = keep_cols.iter().map(|s| s.to_string()).collect();
    let x = columns_to_array2(df, keep_cols)?;

    let label_col = df
        .column(label)
        .map_err(|_| ChurnError::ColumnNotFound(label.to_string()))?;
    let cast = label_col
        .cast(&DataType::Float64)
        .map_err(|e| ChurnError::Data(e.to_string()))?;
    let y: Array1<f64> = cast
        .f64()
        .map_err(|e| ChurnError::Data(e.to_string()))?
        .into_iter()
        .map(|v| v.unwrap_or(0.0))
        .collect();

    Ok((x, y, names))
}

/// Extract named columns into a row-major `Array2<f64>`, casting each to f64.
pub fn columns_to_array2(df: &DataFrame, col_names: &[&str]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| {
            let column = df
                .column(col_name)
                .map_err(|_| ChurnError::ColumnNotFound(col_name.to_string()))?;
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
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]))
}

/// Shuffle-split rows into disjoint train/test partitions.
///
/// Indices are shuffled with a ChaCha8 RNG seeded from `seed`, the last
/// `ceil(test_fraction * n)` shuffled rows form the test partition.
/// Re-running with the same seed yields identical partitions.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    let n = x.nrows();
    if n != y.len() {
        return Err(ChurnError::Shape {
            expected: format!("y length = {}", n),
            actual: format!("y length = {}", y.len()),
        });
    }
    if !(0.0..1.0).contains(&test_fraction) {
        return Err(ChurnError::Validation(format!(
            "test fraction must be in [0, 1), got {}",
            test_fraction
        )));
    }

    let test_size = ((n as f64) * test_fraction).ceil() as usize;
    if test_size == 0 || test_size >= n {
        return Err(ChurnError::Validation(format!(
            "split of {} rows at fraction {} leaves an empty partition",
            n, test_fraction
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (train_idx, test_idx) = indices.split_at(n - test_size);

    let x_train = x.select(Axis(0), train_idx);
    let x_test = x.select(Axis(0), test_idx);
    let y_train = Array1::from_vec(train_idx.iter().map(|&i| y[i]).collect());
    let y_test = Array1::from_vec(test_idx.iter().map(|&i| y[i]).collect());

    Ok(TrainTestSplit {
        x_train,
        x_test,
        y_train,
        y_test,
    })
}
