//! Block traits.
//!
//! Two kinds of blocks make up a model:
//!
//! - [`Block`] maps a dense tensor to a dense tensor (dense layers, MLPs,
//!   interactions).
//! - [`FeatureBlock`] maps a batch of named feature columns to one tensor
//!   (embeddings, towers, whole encoders). A `FeatureBlock` that produces one
//!   row per input row is an *encoder* and can populate a candidate index.
//!
//! Blocks are inference-only and `Send + Sync`, so one encoder can run over
//! several dataset partitions at once.

use merlin_data::Schema;

pub use merlin_data::TabularData;

use crate::error::LayerResult;
use merlin_tensor::Tensor;

/// A block that transforms a dense tensor.
///
/// # Example
///
/// ```
/// use merlin_layers::block::Block;
/// use merlin_layers::dense::Dense;
/// use merlin_tensor::Tensor;
///
/// let layer = Dense::new(16, 4);
/// let output = layer.forward(&Tensor::zeros(&[8, 16])).unwrap();
/// assert_eq!(output.shape(), &[8, 4]);
/// ```
pub trait Block: Send + Sync {
    /// Applies the block to `input`.
    ///
    /// # Errors
    ///
    /// Returns a [`LayerError`](crate::error::LayerError) if the input shape
    /// is incompatible with the block.
    fn forward(&self, input: &Tensor) -> LayerResult<Tensor>;

    /// Returns the name of the block for logging purposes.
    fn name(&self) -> &str {
        "Block"
    }
}

/// A block that consumes named feature columns.
pub trait FeatureBlock: Send + Sync {
    /// Applies the block to a batch of features.
    fn call_features(&self, features: &TabularData) -> LayerResult<Tensor>;

    /// The columns this block reads, when known.
    ///
    /// Index construction uses it to find the item-id column.
    fn schema(&self) -> Option<&Schema> {
        None
    }

    /// Returns the name of the block for logging purposes.
    fn name(&self) -> &str {
        "FeatureBlock"
    }
}

/// Fetches a feature column as `[batch, 1]`.
pub(crate) fn feature_column(features: &TabularData, name: &str) -> LayerResult<Tensor> {
    let tensor = features
        .get(name)
        .ok_or_else(|| crate::error::LayerError::FeatureNotFound(name.to_string()))?;
    Ok(tensor.to_column()?)
}
