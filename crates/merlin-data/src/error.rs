//! Error types for the merlin-data crate.

use merlin_tensor::TensorError;
use thiserror::Error;

/// Errors raised while building, converting or persisting tabular data.
#[derive(Debug, Error)]
pub enum DataError {
    /// A referenced column does not exist.
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// A column with the same name already exists.
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    /// A column does not have the frame's row count.
    #[error("Length mismatch for column '{column}': expected {expected} rows, got {actual}")]
    LengthMismatch {
        /// The column name.
        column: String,
        /// The frame's row count.
        expected: usize,
        /// The column's length.
        actual: usize,
    },

    /// The frame index cannot be built or combined.
    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    /// An operation needs at least one row or column.
    #[error("Empty data: {0}")]
    Empty(String),

    /// A column has a type this crate cannot represent.
    #[error("Unsupported data type for column '{column}': {data_type}")]
    UnsupportedType {
        /// The column name.
        column: String,
        /// The data type.
        data_type: String,
    },

    /// A Parquet column contains nulls.
    #[error("Column '{0}' contains null values")]
    NullValues(String),

    /// An argument is out of its accepted range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No files matched a glob pattern.
    #[error("No files found matching pattern: {0}")]
    NoFilesFound(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A Parquet format error occurred.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// An Arrow error occurred.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// A glob pattern error occurred.
    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    /// A glob error occurred during iteration.
    #[error("Glob error: {0}")]
    Glob(#[from] glob::GlobError),

    /// A JSON (de)serialization error occurred.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A tensor conversion failed.
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

/// Result type alias for data operations.
pub type DataResult<T> = Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DataError::LengthMismatch {
            column: "item_id".to_string(),
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "Length mismatch for column 'item_id': expected 3 rows, got 2"
        );

        let err: DataError = TensorError::InvalidRank {
            expected: 2,
            got: 1,
        }
        .into();
        assert!(err.to_string().starts_with("Invalid rank"));
    }
}
