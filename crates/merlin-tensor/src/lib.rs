//! Dense tensors for merlin-rs.
//!
//! This crate provides the numeric layer every merlin block runs on: a dense
//! `f32` [`Tensor`] backed by `ndarray`, plus the handful of operations the
//! retrieval and ranking blocks need (matrix multiply, top-k selection,
//! gather, one-hot).
//!
//! # Example
//!
//! ```rust
//! use merlin_tensor::{ops, Tensor};
//!
//! let candidates = Tensor::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
//! let queries = Tensor::from_rows(&[vec![0.2, 0.9]]).unwrap();
//!
//! let scores = queries.matmul_transposed(&candidates).unwrap();
//! let top = ops::top_k(&scores, 1).unwrap();
//! assert_eq!(top.indices[[0, 0]], 1);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod ops;
pub mod tensor;

pub use ops::TopK;
pub use tensor::Tensor;

/// Error types for tensor operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TensorError {
    /// Shape mismatch error.
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// The expected shape.
        expected: Vec<usize>,
        /// The actual shape.
        got: Vec<usize>,
    },

    /// The tensor does not have the required number of dimensions.
    #[error("Invalid rank: expected {expected}D tensor, got {got}D")]
    InvalidRank {
        /// The required rank.
        expected: usize,
        /// The actual rank.
        got: usize,
    },

    /// Invalid shape error.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// An index addressed a position past the end of an axis.
    #[error("Index {index} is out of bounds for axis of length {len}")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// Length of the indexed axis.
        len: usize,
    },
}

/// Result type for tensor operations.
pub type TensorResult<T> = Result<T, TensorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_then_select() {
        let candidates = Tensor::from_rows(&[
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ])
        .unwrap();
        let queries = Tensor::from_rows(&[vec![0.1, 0.7, 0.2], vec![0.9, 0.0, 0.5]]).unwrap();

        let scores = queries.matmul_transposed(&candidates).unwrap();
        assert_eq!(scores.shape(), &[2, 3]);

        let top = ops::top_k(&scores, 2).unwrap();
        assert_eq!(top.values.shape(), &[2, 2]);
        assert_eq!(top.indices.row(0).to_vec(), vec![1, 2]);
        assert_eq!(top.indices.row(1).to_vec(), vec![0, 2]);
    }

    #[test]
    fn test_tensor_error_display() {
        let err = TensorError::ShapeMismatch {
            expected: vec![2, 3],
            got: vec![3, 2],
        };
        assert!(err.to_string().contains("Shape mismatch"));

        let err = TensorError::InvalidRank {
            expected: 2,
            got: 3,
        };
        assert_eq!(err.to_string(), "Invalid rank: expected 2D tensor, got 3D");

        let err = TensorError::IndexOutOfBounds { index: 7, len: 3 };
        assert!(err.to_string().contains("out of bounds"));
    }
}
