//! Model outputs prepared for metric computation.

use merlin_tensor::Tensor;

use crate::error::{LayerError, LayerResult};

/// Predictions paired with their targets.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionOutput {
    /// Scores, `[batch, n]`.
    pub predictions: Tensor,
    /// Targets aligned with `predictions`.
    pub targets: Tensor,
    /// Number of relevant items per row, `[batch, 1]`, when known.
    pub label_relevant_counts: Option<Tensor>,
}

impl PredictionOutput {
    /// Pairs predictions with targets of the same shape.
    pub fn new(predictions: Tensor, targets: Tensor) -> LayerResult<Self> {
        if predictions.shape() != targets.shape() {
            return Err(LayerError::ShapeMismatch {
                expected: predictions.shape().to_vec(),
                actual: targets.shape().to_vec(),
            });
        }
        Ok(Self {
            predictions,
            targets,
            label_relevant_counts: None,
        })
    }

    /// Attaches per-row relevant counts.
    pub fn with_label_relevant_counts(mut self, counts: Tensor) -> Self {
        self.label_relevant_counts = Some(counts);
        self
    }

    /// Number of rows.
    pub fn batch_size(&self) -> usize {
        self.predictions.shape().first().copied().unwrap_or(0)
    }
}
