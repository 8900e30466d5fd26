//! The [`Tensor`] type.
//!
//! A [`Tensor`] wraps an `ndarray::ArrayD<f32>`. Shape-dependent operations
//! return [`TensorResult`] instead of panicking so that blocks can surface
//! bad inputs to their callers.

use ndarray::{s, Array2, ArrayD, ArrayView2, Axis, Ix2, IxDyn};

use crate::{TensorError, TensorResult};

/// A dense, row-major `f32` tensor backed by ndarray's `ArrayD`.
///
/// # Examples
///
/// ```
/// use merlin_tensor::Tensor;
///
/// let t = Tensor::zeros(&[2, 3, 4]);
/// assert_eq!(t.shape(), &[2, 3, 4]);
/// assert_eq!(t.numel(), 24);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    data: ArrayD<f32>,
}

impl Tensor {
    /// Creates a tensor filled with zeros.
    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::zeros(IxDyn(shape)),
        }
    }

    /// Creates a tensor filled with ones.
    pub fn ones(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::ones(IxDyn(shape)),
        }
    }

    /// Creates a tensor filled with `value`.
    pub fn full(shape: &[usize], value: f32) -> Self {
        Self {
            data: ArrayD::from_elem(IxDyn(shape), value),
        }
    }

    /// Creates a tensor from row-major data.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::InvalidShape`] if `data.len()` is not the
    /// product of `shape`.
    ///
    /// # Examples
    ///
    /// ```
    /// use merlin_tensor::Tensor;
    ///
    /// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    /// assert_eq!(t.shape(), &[2, 3]);
    /// assert!(Tensor::from_vec(vec![1.0], &[2, 3]).is_err());
    /// ```
    pub fn from_vec(data: Vec<f32>, shape: &[usize]) -> TensorResult<Self> {
        let expected_len: usize = shape.iter().product();
        if data.len() != expected_len {
            return Err(TensorError::InvalidShape(format!(
                "data length {} does not match shape {:?} (expected {} elements)",
                data.len(),
                shape,
                expected_len
            )));
        }
        let data = ArrayD::from_shape_vec(IxDyn(shape), data)
            .map_err(|e| TensorError::InvalidShape(e.to_string()))?;
        Ok(Self { data })
    }

    /// Creates a tensor from a slice of row-major data.
    pub fn from_slice(data: &[f32], shape: &[usize]) -> TensorResult<Self> {
        Self::from_vec(data.to_vec(), shape)
    }

    /// Creates a 2D tensor from equally sized rows.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::ShapeMismatch`] if the rows have different
    /// lengths.
    pub fn from_rows(rows: &[Vec<f32>]) -> TensorResult<Self> {
        let ncols = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * ncols);
        for row in rows {
            if row.len() != ncols {
                return Err(TensorError::ShapeMismatch {
                    expected: vec![ncols],
                    got: vec![row.len()],
                });
            }
            data.extend_from_slice(row);
        }
        Self::from_vec(data, &[rows.len(), ncols])
    }

    /// Wraps an existing ndarray.
    pub fn from_ndarray(data: ArrayD<f32>) -> Self {
        Self { data }
    }

    /// Returns a reference to the underlying ndarray.
    pub fn as_ndarray(&self) -> &ArrayD<f32> {
        &self.data
    }

    /// Consumes the tensor and returns the underlying ndarray.
    pub fn into_ndarray(self) -> ArrayD<f32> {
        self.data
    }

    /// Returns the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Returns the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// Returns the total number of elements.
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Returns the elements in row-major order.
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    /// Returns the length of `axis`.
    pub fn dim(&self, axis: usize) -> TensorResult<usize> {
        self.shape()
            .get(axis)
            .copied()
            .ok_or(TensorError::IndexOutOfBounds {
                index: axis,
                len: self.ndim(),
            })
    }

    /// Views the tensor as a matrix.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::InvalidRank`] unless the tensor is 2D.
    pub fn as_matrix(&self) -> TensorResult<ArrayView2<'_, f32>> {
        self.data
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| TensorError::InvalidRank {
                expected: 2,
                got: self.ndim(),
            })
    }

    /// Returns the rows of a 2D tensor as vectors.
    pub fn to_rows(&self) -> TensorResult<Vec<Vec<f32>>> {
        let m = self.as_matrix()?;
        Ok(m.outer_iter().map(|row| row.to_vec()).collect())
    }

    /// Reshapes the tensor; the number of elements must be unchanged.
    pub fn reshape(&self, new_shape: &[usize]) -> TensorResult<Self> {
        let new_numel: usize = new_shape.iter().product();
        if new_numel != self.numel() {
            return Err(TensorError::InvalidShape(format!(
                "cannot reshape tensor of {} elements to shape {:?}",
                self.numel(),
                new_shape
            )));
        }
        Self::from_vec(self.to_vec(), new_shape)
    }

    /// Inserts a new axis of length one at `axis`.
    ///
    /// # Examples
    ///
    /// ```
    /// use merlin_tensor::Tensor;
    ///
    /// let t = Tensor::zeros(&[4, 8]);
    /// assert_eq!(t.expand_dims(1).unwrap().shape(), &[4, 1, 8]);
    /// ```
    pub fn expand_dims(&self, axis: usize) -> TensorResult<Self> {
        if axis > self.ndim() {
            return Err(TensorError::IndexOutOfBounds {
                index: axis,
                len: self.ndim() + 1,
            });
        }
        Ok(Self {
            data: self.data.clone().insert_axis(Axis(axis)),
        })
    }

    /// Coerces a `[n]` or `[n, 1]` tensor into a column `[n, 1]`.
    pub fn to_column(&self) -> TensorResult<Self> {
        match self.shape() {
            [n] => self.reshape(&[*n, 1]),
            [_, 1] => Ok(self.clone()),
            _ => Err(TensorError::ShapeMismatch {
                expected: vec![self.shape().first().copied().unwrap_or(0), 1],
                got: self.shape().to_vec(),
            }),
        }
    }

    /// Transposes a 2D tensor.
    pub fn transpose(&self) -> TensorResult<Self> {
        let m = self.as_matrix()?;
        Ok(Self {
            data: m.t().as_standard_layout().into_owned().into_dyn(),
        })
    }

    /// Matrix product `self · other` of two 2D tensors.
    pub fn matmul(&self, other: &Self) -> TensorResult<Self> {
        let a = self.as_matrix()?;
        let b = other.as_matrix()?;
        if a.ncols() != b.nrows() {
            return Err(TensorError::ShapeMismatch {
                expected: vec![a.ncols(), b.ncols()],
                got: vec![b.nrows(), b.ncols()],
            });
        }
        Ok(Self {
            data: a.dot(&b).into_dyn(),
        })
    }

    /// Matrix product `self · otherᵗ`; both tensors must have the same
    /// number of columns.
    ///
    /// # Examples
    ///
    /// ```
    /// use merlin_tensor::Tensor;
    ///
    /// let q = Tensor::from_rows(&[vec![1.0, 2.0]]).unwrap();
    /// let c = Tensor::from_rows(&[vec![3.0, 4.0], vec![1.0, 0.0]]).unwrap();
    /// assert_eq!(q.matmul_transposed(&c).unwrap().to_vec(), vec![11.0, 1.0]);
    /// ```
    pub fn matmul_transposed(&self, other: &Self) -> TensorResult<Self> {
        let a = self.as_matrix()?;
        let b = other.as_matrix()?;
        if a.ncols() != b.ncols() {
            return Err(TensorError::ShapeMismatch {
                expected: vec![b.nrows(), a.ncols()],
                got: vec![b.nrows(), b.ncols()],
            });
        }
        Ok(Self {
            data: a.dot(&b.t()).into_dyn(),
        })
    }

    /// Element-wise addition; `other` may broadcast into `self`'s shape
    /// (e.g. a `[n]` bias added to `[batch, n]`).
    pub fn add(&self, other: &Self) -> TensorResult<Self> {
        let rhs = other
            .data
            .broadcast(self.data.raw_dim())
            .ok_or_else(|| TensorError::ShapeMismatch {
                expected: self.shape().to_vec(),
                got: other.shape().to_vec(),
            })?;
        Ok(Self {
            data: &self.data + &rhs,
        })
    }

    /// Element-wise multiplication with the same broadcasting rule as
    /// [`Tensor::add`].
    pub fn mul(&self, other: &Self) -> TensorResult<Self> {
        let rhs = other
            .data
            .broadcast(self.data.raw_dim())
            .ok_or_else(|| TensorError::ShapeMismatch {
                expected: self.shape().to_vec(),
                got: other.shape().to_vec(),
            })?;
        Ok(Self {
            data: &self.data * &rhs,
        })
    }

    /// Multiplies every element by `scalar`.
    pub fn scale(&self, scalar: f32) -> Self {
        Self {
            data: &self.data * scalar,
        }
    }

    /// Applies `f` element-wise.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(f32) -> f32,
    {
        Self {
            data: self.data.mapv(f),
        }
    }

    /// Sum of all elements.
    pub fn sum(&self) -> f32 {
        self.data.sum()
    }

    /// Sums over `axis`, removing it.
    pub fn sum_axis(&self, axis: usize) -> TensorResult<Self> {
        if axis >= self.ndim() {
            return Err(TensorError::IndexOutOfBounds {
                index: axis,
                len: self.ndim(),
            });
        }
        Ok(Self {
            data: self.data.sum_axis(Axis(axis)),
        })
    }

    /// Concatenates tensors along an existing axis.
    ///
    /// # Examples
    ///
    /// ```
    /// use merlin_tensor::Tensor;
    ///
    /// let a = Tensor::ones(&[2, 1]);
    /// let b = Tensor::zeros(&[2, 3]);
    /// let c = Tensor::concat(&[&a, &b], 1).unwrap();
    /// assert_eq!(c.shape(), &[2, 4]);
    /// ```
    pub fn concat(tensors: &[&Tensor], axis: usize) -> TensorResult<Self> {
        if tensors.is_empty() {
            return Err(TensorError::InvalidShape(
                "cannot concatenate an empty list of tensors".to_string(),
            ));
        }
        let views: Vec<_> = tensors.iter().map(|t| t.data.view()).collect();
        let data = ndarray::concatenate(Axis(axis), &views)
            .map_err(|e| TensorError::InvalidShape(format!("concat along axis {axis}: {e}")))?;
        Ok(Self { data })
    }

    /// Stacks equally shaped tensors along a new axis.
    pub fn stack(tensors: &[&Tensor], axis: usize) -> TensorResult<Self> {
        if tensors.is_empty() {
            return Err(TensorError::InvalidShape(
                "cannot stack an empty list of tensors".to_string(),
            ));
        }
        let views: Vec<_> = tensors.iter().map(|t| t.data.view()).collect();
        let data = ndarray::stack(Axis(axis), &views)
            .map_err(|e| TensorError::InvalidShape(format!("stack along axis {axis}: {e}")))?;
        Ok(Self { data })
    }

    /// Gathers entries along the first axis.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::IndexOutOfBounds`] for any index past the
    /// first axis.
    pub fn select_rows(&self, indices: &[usize]) -> TensorResult<Self> {
        let len = self.dim(0)?;
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(TensorError::IndexOutOfBounds { index, len });
        }
        Ok(Self {
            data: self.data.select(Axis(0), indices),
        })
    }

    /// Returns column `index` of a 2D tensor as `[rows, 1]`.
    pub fn column(&self, index: usize) -> TensorResult<Self> {
        let m = self.as_matrix()?;
        if index >= m.ncols() {
            return Err(TensorError::IndexOutOfBounds {
                index,
                len: m.ncols(),
            });
        }
        Ok(Self {
            data: m.slice(s![.., index..index + 1]).to_owned().into_dyn(),
        })
    }
}

impl From<ArrayD<f32>> for Tensor {
    fn from(data: ArrayD<f32>) -> Self {
        Self::from_ndarray(data)
    }
}

impl From<Array2<f32>> for Tensor {
    fn from(data: Array2<f32>) -> Self {
        Self::from_ndarray(data.into_dyn())
    }
}

impl From<Tensor> for ArrayD<f32> {
    fn from(tensor: Tensor) -> Self {
        tensor.into_ndarray()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[&[f32]]) -> Tensor {
        Tensor::from_rows(&rows.iter().map(|r| r.to_vec()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn test_constructors() {
        assert!(Tensor::zeros(&[2, 3]).to_vec().iter().all(|&x| x == 0.0));
        assert!(Tensor::ones(&[3]).to_vec().iter().all(|&x| x == 1.0));
        assert_eq!(Tensor::full(&[2], 0.5).to_vec(), vec![0.5, 0.5]);

        let t = Tensor::from_rows(&[]).unwrap();
        assert_eq!(t.shape(), &[0, 0]);
    }

    #[test]
    fn test_from_rows_rejects_ragged_input() {
        let err = Tensor::from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, TensorError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_matmul_2d() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
        let b = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[3, 2]).unwrap();
        let c = a.matmul(&b).unwrap();

        assert_eq!(c.shape(), &[2, 2]);
        assert_eq!(c.to_vec(), vec![22.0, 28.0, 49.0, 64.0]);
    }

    #[test]
    fn test_matmul_rejects_bad_shapes() {
        let a = Tensor::zeros(&[2, 3]);
        let b = Tensor::zeros(&[2, 3]);
        assert!(matches!(
            a.matmul(&b),
            Err(TensorError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            Tensor::zeros(&[3]).matmul(&b),
            Err(TensorError::InvalidRank {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn test_matmul_transposed_matches_explicit_transpose() {
        let q = matrix(&[&[1.0, 2.0], &[0.5, -1.0]]);
        let c = matrix(&[&[3.0, 4.0], &[1.0, 0.0], &[0.0, 2.0]]);

        let direct = q.matmul_transposed(&c).unwrap();
        let explicit = q.matmul(&c.transpose().unwrap()).unwrap();
        assert_eq!(direct, explicit);
        assert_eq!(direct.shape(), &[2, 3]);
        assert!(q.matmul_transposed(&Tensor::zeros(&[3, 3])).is_err());
    }

    #[test]
    fn test_transpose_then_reshape_keeps_logical_order() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
        let transposed = t.transpose().unwrap();
        assert_eq!(transposed.shape(), &[3, 2]);
        assert_eq!(transposed.to_vec(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);

        let flat = transposed.reshape(&[6]).unwrap();
        assert_eq!(flat.to_vec(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert!(t.reshape(&[4]).is_err());
    }

    #[test]
    fn test_add_broadcasts_bias() {
        let x = Tensor::ones(&[2, 3]);
        let bias = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap();
        let y = x.add(&bias).unwrap();
        assert_eq!(y.to_vec(), vec![2.0, 3.0, 4.0, 2.0, 3.0, 4.0]);

        let bad = Tensor::ones(&[2]);
        assert!(x.add(&bad).is_err());
    }

    #[test]
    fn test_concat_and_stack() {
        let a = matrix(&[&[1.0], &[2.0]]);
        let b = matrix(&[&[3.0, 4.0], &[5.0, 6.0]]);
        let c = Tensor::concat(&[&a, &b], 1).unwrap();
        assert_eq!(c.to_vec(), vec![1.0, 3.0, 4.0, 2.0, 5.0, 6.0]);

        let s = Tensor::stack(&[&b, &b], 1).unwrap();
        assert_eq!(s.shape(), &[2, 2, 2]);

        assert!(Tensor::stack(&[&a, &b], 1).is_err());
        assert!(Tensor::concat(&[], 0).is_err());
    }

    #[test]
    fn test_select_rows() {
        let t = matrix(&[&[1.0, 0.0], &[0.0, 1.0], &[2.0, 2.0]]);
        let picked = t.select_rows(&[2, 0, 2]).unwrap();
        assert_eq!(picked.to_vec(), vec![2.0, 2.0, 1.0, 0.0, 2.0, 2.0]);

        assert_eq!(
            t.select_rows(&[3]).unwrap_err(),
            TensorError::IndexOutOfBounds { index: 3, len: 3 }
        );
    }

    #[test]
    fn test_column_and_to_column() {
        let t = matrix(&[&[1.0, 2.0], &[3.0, 4.0]]);
        assert_eq!(t.column(1).unwrap().to_vec(), vec![2.0, 4.0]);
        assert_eq!(t.column(1).unwrap().shape(), &[2, 1]);
        assert!(t.column(2).is_err());

        let v = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap();
        assert_eq!(v.to_column().unwrap().shape(), &[3, 1]);
        assert!(t.to_column().is_err());
    }

    #[test]
    fn test_expand_dims_and_sum_axis() {
        let t = matrix(&[&[1.0, 2.0], &[3.0, 4.0]]);
        assert_eq!(t.expand_dims(0).unwrap().shape(), &[1, 2, 2]);
        assert!(t.expand_dims(3).is_err());

        let summed = t.sum_axis(1).unwrap();
        assert_eq!(summed.to_vec(), vec![3.0, 7.0]);
        assert_eq!(t.sum(), 10.0);
    }
}
