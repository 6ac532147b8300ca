//! Dataset loading and label derivation

use crate::config::{EXISTING_CUSTOMER, LABEL_COLUMN, STATUS_COLUMN};
use crate::error::{ChurnError, Result};
use polars::prelude::*;
use std::path::Path;

/// Load the churn CSV at `path` and derive the binary label column.
///
/// The raw `Attrition_Flag` column holds `"Existing Customer"` /
/// `"Attrited Customer"`; the derived `Churn` column is 0 for existing
/// customers and 1 for everyone else. A missing file is logged and the
/// error propagated, never swallowed.
pub fn load_dataset(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        let err = ChurnError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("dataset not found: {}", path.display()),
        ));
        tracing::error!(path = %path.display(), "failed to load dataset");
        return Err(err);
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| ChurnError::Data(e.to_string()))?
        .finish()
        .map_err(|e| ChurnError::Data(e.to_string()))?;

    let df = derive_label(df)?;
    tracing::info!(rows = df.height(), cols = df.width(), "dataset loaded");
    Ok(df)
}

/// Append the binary `Churn` column derived from the attrition status.
pub fn derive_label(mut df: DataFrame) -> Result<DataFrame> {
    let status = df
        .column(STATUS_COLUMN)
        .map_err(|_| ChurnError::ColumnNotFound(STATUS_COLUMN.to_string()))?;

    let ca = status
        .str()
        .map_err(|e| ChurnError::Data(e.to_string()))?;

    let labels: Vec<i32> = ca
        .into_iter()
        .map(|v| match v {
            Some(s) if s == EXISTING_CUSTOMER => 0,
            _ => 1,
        })
        .collect();

    let series = Series::new(LABEL_COLUMN.into(), labels);
    df.with_column(series)
        .map_err(|e| ChurnError::Data(e.to_string()))?;

    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_sample_csv() -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        writeln!(file, "Attrition_Flag,Customer_Age").unwrap();
        writeln!(file, "Existing Customer,45").unwrap();
        writeln!(file, "Attrited Customer,51").unwrap();
        writeln!(file, "Existing Customer,33").unwrap();
        file
    }

    #[test]
    fn test_load_derives_label() {
        let file = create_sample_csv();
        let df = load_dataset(file.path()).unwrap();

        assert_eq!(df.height(), 3);
        let churn = df.column(LABEL_COLUMN).unwrap().i32().unwrap();
        let values: Vec<i32> = churn.into_iter().flatten().collect();
        assert_eq!(values, vec![0, 1, 0]);
    }

    #[test]
    fn test_missing_file_errors() {
        let err = load_dataset(Path::new("does/not/exist.csv")).unwrap_err();
        assert!(matches!(err, ChurnError::Io(_)));
    }

    #[test]
    fn test_missing_status_column_errors() {
        let df = df!("Customer_Age" => &[40i32, 50]).unwrap();
        let err = derive_label(df).unwrap_err();
        assert!(matches!(err, ChurnError::ColumnNotFound(_)));
    }
}
