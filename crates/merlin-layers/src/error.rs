//! Error types for the merlin-layers crate.
//!
//! Numeric failures from `merlin-tensor` and data failures from
//! `merlin-data` are wrapped transparently, so callers see the underlying
//! message.

use merlin_data::DataError;
use merlin_tensor::TensorError;
use thiserror::Error;

/// Error type for block and index operations.
#[derive(Debug, Error)]
pub enum LayerError {
    /// Shape mismatch between expected and actual tensor shapes.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// The expected shape
        expected: Vec<usize>,
        /// The actual shape that was provided
        actual: Vec<usize>,
    },

    /// Invalid input dimension for the layer.
    #[error("Invalid input dimension: expected {expected}, got {actual}")]
    InvalidInputDimension {
        /// The expected input dimension
        expected: usize,
        /// The actual input dimension
        actual: usize,
    },

    /// Configuration error for the block.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// Input data violates a requirement of the block.
    #[error("Validation error: {message}")]
    ValidationError {
        /// Description of the violated requirement
        message: String,
    },

    /// A feature the block needs is missing from its inputs.
    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    /// A tensor the block needs is missing from the block context.
    #[error("Missing context tensor: {0}")]
    MissingContext(String),

    /// Embedding lookup error.
    #[error("Embedding lookup error: {message}")]
    EmbeddingError {
        /// Description of the embedding error
        message: String,
    },

    /// A tensor operation failed.
    #[error(transparent)]
    Tensor(#[from] TensorError),

    /// A data operation failed.
    #[error(transparent)]
    Data(#[from] DataError),
}

/// Result type alias for layer operations.
pub type LayerResult<T> = Result<T, LayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LayerError::ShapeMismatch {
            expected: vec![32, 64],
            actual: vec![32, 128],
        };
        assert!(err.to_string().contains("Shape mismatch"));

        let err = LayerError::ValidationError {
            message: "Please make sure that `data` contains unique indices".to_string(),
        };
        assert!(err.to_string().starts_with("Validation error"));

        let err = LayerError::MissingContext("query".to_string());
        assert_eq!(err.to_string(), "Missing context tensor: query");
    }

    #[test]
    fn test_tensor_error_is_transparent() {
        let err: LayerError = TensorError::IndexOutOfBounds { index: 5, len: 2 }.into();
        assert_eq!(
            err.to_string(),
            TensorError::IndexOutOfBounds { index: 5, len: 2 }.to_string()
        );
        assert!(matches!(err, LayerError::Tensor(_)));
    }
}
