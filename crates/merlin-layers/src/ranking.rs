//! Ranking helpers for retrieval evaluation.

use merlin_tensor::ops;
use merlin_tensor::Tensor;

use crate::error::{LayerError, LayerResult};
use crate::prediction::PredictionOutput;

pub use merlin_tensor::ops::one_hot;

/// Keeps the `k` highest predictions of every row together with their
/// labels.
///
/// `k` is clamped to the number of columns. The returned output holds the
/// sorted top-k predictions, the labels gathered at the same positions and,
/// as `label_relevant_counts`, the number of positive labels of each full
/// row (`[batch, 1]`).
///
/// # Errors
///
/// Fails unless `predictions` and `labels` are 2D tensors of equal shape.
///
/// # Examples
///
/// ```
/// use merlin_layers::ranking::extract_topk;
/// use merlin_tensor::Tensor;
///
/// let predictions = Tensor::from_rows(&[vec![0.1, 0.7, 0.3]]).unwrap();
/// let labels = Tensor::from_rows(&[vec![1.0, 0.0, 1.0]]).unwrap();
///
/// let top = extract_topk(2, &predictions, &labels).unwrap();
/// assert_eq!(top.predictions.to_vec(), vec![0.7, 0.3]);
/// assert_eq!(top.targets.to_vec(), vec![0.0, 1.0]);
/// assert_eq!(top.label_relevant_counts.unwrap().to_vec(), vec![2.0]);
/// ```
pub fn extract_topk(k: usize, predictions: &Tensor, labels: &Tensor) -> LayerResult<PredictionOutput> {
    if predictions.shape() != labels.shape() {
        return Err(LayerError::ShapeMismatch {
            expected: predictions.shape().to_vec(),
            actual: labels.shape().to_vec(),
        });
    }
    let top = ops::top_k(predictions, k)?;
    let targets = ops::gather_columns(labels, &top.indices)?;
    let counts = labels.sum_axis(1)?.to_column()?;
    Ok(PredictionOutput::new(top.values, targets)?.with_label_relevant_counts(counts))
}

/// Mean recall@k over the rows of `output`.
///
/// Per row: positives among the `k` highest predictions divided by the
/// row's relevant count (`label_relevant_counts` when present, otherwise the
/// positives of the row). Rows without relevant items count as zero.
pub fn recall_at_k(output: &PredictionOutput, k: usize) -> LayerResult<f32> {
    let top = extract_topk(k, &output.predictions, &output.targets)?;
    let hits = top.targets.sum_axis(1)?.to_vec();
    let relevant = match &output.label_relevant_counts {
        Some(counts) => counts.to_column()?.to_vec(),
        None => top
            .label_relevant_counts
            .map(|c| c.to_vec())
            .unwrap_or_default(),
    };
    if relevant.len() != hits.len() {
        return Err(LayerError::ShapeMismatch {
            expected: vec![hits.len(), 1],
            actual: vec![relevant.len(), 1],
        });
    }
    if hits.is_empty() {
        return Ok(0.0);
    }

    let total: f32 = hits
        .iter()
        .zip(&relevant)
        .map(|(&h, &r)| if r > 0.0 { h / r } else { 0.0 })
        .sum();
    Ok(total / hits.len() as f32)
}
