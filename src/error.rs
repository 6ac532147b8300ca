//! Error types for the churn pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ChurnError>;

/// Main error type for the churn pipeline
#[derive(Error, Debug)]
pub enum ChurnError {
    #[error("Data error: {0}")]
    Data(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Plot error: {0}")]
    Plot(String),

    /// A harness postcondition did not hold. Recovered by the harness,
    /// fatal everywhere else.
    #[error("Check failed: {0}")]
    CheckFailed(String),
}

impl From<polars::error::PolarsError> for ChurnError {
    fn from(err: polars::error::PolarsError) -> Self {
        ChurnError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for ChurnError {
    fn from(err: serde_json::Error) -> Self {
        ChurnError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChurnError::Data("bad frame".to_string());
        assert_eq!(err.to_string(), "Data error: bad frame");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ChurnError = io_err.into();
        assert!(matches!(err, ChurnError::Io(_)));
    }

    #[test]
    fn test_check_failed_display() {
        let err = ChurnError::CheckFailed("no rows".to_string());
        assert_eq!(err.to_string(), "Check failed: no rows");
    }
}
