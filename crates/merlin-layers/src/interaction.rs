//! Pairwise feature interactions.

use ndarray::{Array2, Ix3};

use merlin_tensor::{Tensor, TensorError};

use crate::block::Block;
use crate::error::LayerResult;

/// Dot products between every pair of stacked feature vectors.
///
/// Maps `[batch, n, d]` to `[batch, n * (n - 1) / 2]`, keeping the strictly
/// upper-triangular entries of each `n x n` Gram matrix in row-major order
/// (`(0,1), (0,2), .., (1,2), ..`).
///
/// ```
/// use merlin_layers::block::Block;
/// use merlin_layers::interaction::DotProductInteraction;
/// use merlin_tensor::Tensor;
///
/// let stacked = Tensor::from_slice(&[1.0, 0.0, 2.0, 3.0, 1.0, 1.0], &[1, 3, 2]).unwrap();
/// let pairs = DotProductInteraction.forward(&stacked).unwrap();
/// assert_eq!(pairs.to_vec(), vec![2.0, 1.0, 5.0]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DotProductInteraction;

impl DotProductInteraction {
    /// Output width for `n` stacked features.
    pub fn output_dim(num_features: usize) -> usize {
        num_features * num_features.saturating_sub(1) / 2
    }
}

impl Block for DotProductInteraction {
    fn forward(&self, input: &Tensor) -> LayerResult<Tensor> {
        let stacked = input
            .as_ndarray()
            .view()
            .into_dimensionality::<Ix3>()
            .map_err(|_| TensorError::InvalidRank {
                expected: 3,
                got: input.ndim(),
            })?;
        let (batch, n, _) = stacked.dim();

        let mut output = Array2::<f32>::zeros((batch, Self::output_dim(n)));
        for (b, features) in stacked.outer_iter().enumerate() {
            let mut c = 0;
            for i in 0..n {
                for j in (i + 1)..n {
                    output[[b, c]] = features.row(i).dot(&features.row(j));
                    c += 1;
                }
            }
        }
        Ok(output.into())
    }

    fn name(&self) -> &str {
        "DotProductInteraction"
    }
}
