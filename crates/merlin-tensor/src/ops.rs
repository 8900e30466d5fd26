//! Common tensor operations.
//!
//! Activation functions, top-k selection and the gather helpers used to
//! remap selected positions back to identifiers or labels.

use std::cmp::Ordering;

use ndarray::{Array1, Array2};

use crate::tensor::Tensor;
use crate::{TensorError, TensorResult};

/// Applies the ReLU activation function element-wise.
///
/// ```
/// use merlin_tensor::{ops::relu, Tensor};
///
/// let t = Tensor::from_slice(&[-1.0, 0.0, 1.0, 2.0], &[4]).unwrap();
/// assert_eq!(relu(&t).to_vec(), vec![0.0, 0.0, 1.0, 2.0]);
/// ```
pub fn relu(tensor: &Tensor) -> Tensor {
    tensor.map(|x| x.max(0.0))
}

/// Applies the sigmoid activation function element-wise.
pub fn sigmoid(tensor: &Tensor) -> Tensor {
    tensor.map(|x| 1.0 / (1.0 + (-x).exp()))
}

/// Applies the hyperbolic tangent element-wise.
pub fn tanh(tensor: &Tensor) -> Tensor {
    tensor.map(f32::tanh)
}

/// Applies GELU (tanh approximation) element-wise.
pub fn gelu(tensor: &Tensor) -> Tensor {
    const SQRT_2_OVER_PI: f32 = 0.797_884_6;
    tensor.map(|x| 0.5 * x * (1.0 + (SQRT_2_OVER_PI * (x + 0.044_715 * x * x * x)).tanh()))
}

/// The result of [`top_k`]: the selected values and their column positions.
#[derive(Debug, Clone, PartialEq)]
pub struct TopK {
    /// Selected values, `[rows, k]`, each row in descending order.
    pub values: Tensor,
    /// Column positions of the selected values in the input, `[rows, k]`.
    pub indices: Array2<usize>,
}

/// Ranking order used by [`top_k`]: higher score first, ties broken by the
/// lower column position.
fn rank_order(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

/// Selects the `k` largest entries of every row of a 2D tensor.
///
/// `k` is clamped to the number of columns. Each output row is sorted by
/// descending value; equal values keep ascending column order. Comparison
/// uses IEEE total ordering, so a positive NaN ranks above every number.
///
/// # Errors
///
/// Returns [`TensorError::InvalidRank`] unless `scores` is 2D.
///
/// # Examples
///
/// ```
/// use merlin_tensor::{ops::top_k, Tensor};
///
/// let scores = Tensor::from_rows(&[vec![0.1, 0.9, 0.5]]).unwrap();
/// let top = top_k(&scores, 2).unwrap();
/// assert_eq!(top.values.to_vec(), vec![0.9, 0.5]);
/// assert_eq!(top.indices.row(0).to_vec(), vec![1, 2]);
/// ```
pub fn top_k(scores: &Tensor, k: usize) -> TensorResult<TopK> {
    let matrix = scores.as_matrix()?;
    let k = k.min(matrix.ncols());

    let mut values = Array2::<f32>::zeros((matrix.nrows(), k));
    let mut indices = Array2::<usize>::zeros((matrix.nrows(), k));

    for (r, row) in matrix.outer_iter().enumerate() {
        let mut ranked: Vec<(usize, f32)> = row.iter().copied().enumerate().collect();
        if k > 0 && k < ranked.len() {
            // Partition first so only k entries need a full sort.
            ranked.select_nth_unstable_by(k - 1, rank_order);
            ranked.truncate(k);
        }
        ranked.sort_unstable_by(rank_order);

        for (c, (index, value)) in ranked.into_iter().take(k).enumerate() {
            values[[r, c]] = value;
            indices[[r, c]] = index;
        }
    }

    Ok(TopK {
        values: values.into(),
        indices,
    })
}

/// Maps every position in `indices` to `table[position]`.
///
/// This is the identifier remap step of retrieval: top-k returns row
/// positions, the table holds the keys those rows belong to.
///
/// # Errors
///
/// Returns [`TensorError::IndexOutOfBounds`] if a position exceeds the table.
pub fn gather<T: Clone>(table: &Array1<T>, indices: &Array2<usize>) -> TensorResult<Array2<T>> {
    if let Some(&index) = indices.iter().find(|&&i| i >= table.len()) {
        return Err(TensorError::IndexOutOfBounds {
            index,
            len: table.len(),
        });
    }
    Ok(indices.map(|&i| table[i].clone()))
}

/// Gathers per-row columns: `out[r, c] = values[r, indices[r, c]]`.
///
/// # Errors
///
/// Fails if `values` is not 2D, the row counts differ, or a column position
/// is out of range.
pub fn gather_columns(values: &Tensor, indices: &Array2<usize>) -> TensorResult<Tensor> {
    let matrix = values.as_matrix()?;
    if matrix.nrows() != indices.nrows() {
        return Err(TensorError::ShapeMismatch {
            expected: vec![matrix.nrows(), indices.ncols()],
            got: vec![indices.nrows(), indices.ncols()],
        });
    }
    if let Some(&index) = indices.iter().find(|&&i| i >= matrix.ncols()) {
        return Err(TensorError::IndexOutOfBounds {
            index,
            len: matrix.ncols(),
        });
    }
    let gathered = Array2::from_shape_fn(indices.dim(), |(r, c)| matrix[[r, indices[[r, c]]]]);
    Ok(gathered.into())
}

/// One-hot encodes `labels` into a `[labels.len(), depth]` tensor.
///
/// ```
/// use merlin_tensor::ops::one_hot;
///
/// let t = one_hot(&[2, 0], 3).unwrap();
/// assert_eq!(t.to_vec(), vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
/// ```
pub fn one_hot(labels: &[usize], depth: usize) -> TensorResult<Tensor> {
    if let Some(&index) = labels.iter().find(|&&l| l >= depth) {
        return Err(TensorError::IndexOutOfBounds { index, len: depth });
    }
    let encoded = Array2::from_shape_fn((labels.len(), depth), |(r, c)| {
        if labels[r] == c {
            1.0
        } else {
            0.0
        }
    });
    Ok(encoded.into())
}
