//! In-memory columnar frames.
//!
//! A [`DataFrame`] holds equally long named [`Column`]s and an optional
//! integer index. It is the unit of work for a dataset partition and the
//! bridge between tabular data and tensors ([`DataFrame::to_tensor`],
//! [`DataFrame::to_tabular`], [`DataFrame::from_tensor`]).

use std::collections::{BTreeMap, HashSet};
use std::ops::Range;

use merlin_tensor::Tensor;

use crate::error::{DataError, DataResult};
use crate::schema::ColumnType;

/// A batch of named feature tensors, one `[rows, 1]` tensor per column.
pub type TabularData = BTreeMap<String, Tensor>;

/// A single typed column.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// 64-bit integer values.
    Int64(Vec<i64>),
    /// 32-bit float values.
    Float32(Vec<f32>),
}

impl Column {
    /// Number of values.
    pub fn len(&self) -> usize {
        match self {
            Column::Int64(v) => v.len(),
            Column::Float32(v) => v.len(),
        }
    }

    /// Whether the column is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The column's physical type.
    pub fn dtype(&self) -> ColumnType {
        match self {
            Column::Int64(_) => ColumnType::Int64,
            Column::Float32(_) => ColumnType::Float32,
        }
    }

    /// Integer values, if this is an integer column.
    pub fn as_i64(&self) -> Option<&[i64]> {
        match self {
            Column::Int64(v) => Some(v),
            Column::Float32(_) => None,
        }
    }

    /// Float values, if this is a float column.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            Column::Float32(v) => Some(v),
            Column::Int64(_) => None,
        }
    }

    /// Values cast to `f32`.
    pub fn to_f32(&self) -> Vec<f32> {
        match self {
            Column::Int64(v) => v.iter().map(|&x| x as f32).collect(),
            Column::Float32(v) => v.clone(),
        }
    }

    fn take(&self, rows: &[usize]) -> Column {
        match self {
            Column::Int64(v) => Column::Int64(rows.iter().map(|&r| v[r]).collect()),
            Column::Float32(v) => Column::Float32(rows.iter().map(|&r| v[r]).collect()),
        }
    }

    fn slice(&self, range: Range<usize>) -> Column {
        match self {
            Column::Int64(v) => Column::Int64(v[range].to_vec()),
            Column::Float32(v) => Column::Float32(v[range].to_vec()),
        }
    }

    fn key_bits(&self, row: usize) -> u64 {
        match self {
            Column::Int64(v) => v[row] as u64,
            Column::Float32(v) => u64::from(v[row].to_bits()),
        }
    }

    fn append(&mut self, name: &str, other: &Column) -> DataResult<()> {
        match (self, other) {
            (Column::Int64(a), Column::Int64(b)) => a.extend_from_slice(b),
            (Column::Float32(a), Column::Float32(b)) => a.extend_from_slice(b),
            (_, other) => {
                return Err(DataError::UnsupportedType {
                    column: name.to_string(),
                    data_type: format!("{:?} cannot be appended to a column of another type", other.dtype()),
                })
            }
        }
        Ok(())
    }
}

impl From<Vec<i64>> for Column {
    fn from(values: Vec<i64>) -> Self {
        Column::Int64(values)
    }
}

impl From<Vec<f32>> for Column {
    fn from(values: Vec<f32>) -> Self {
        Column::Float32(values)
    }
}

/// An explicit integer row index, e.g. the candidate ids of an item table.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameIndex {
    /// Name of the column the index was built from.
    pub name: Option<String>,
    /// One key per row.
    pub values: Vec<i64>,
}

/// A collection of equally long named columns with an optional index.
///
/// # Example
///
/// ```
/// use merlin_data::frame::{Column, DataFrame};
///
/// let mut frame = DataFrame::new()
///     .with_column("item_id", Column::Int64(vec![7, 3, 9]))
///     .unwrap()
///     .with_column("score", Column::Float32(vec![0.1, 0.2, 0.3]))
///     .unwrap();
/// frame.set_index("item_id").unwrap();
///
/// assert_eq!(frame.column_names(), vec!["score"]);
/// assert_eq!(frame.index_values(), vec![7, 3, 9]);
/// assert!(frame.has_unique_index());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFrame {
    columns: Vec<(String, Column)>,
    index: Option<FrameIndex>,
    num_rows: usize,
}

impl DataFrame {
    /// Creates an empty frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`DataFrame::insert_column`].
    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> DataResult<Self> {
        self.insert_column(name, column)?;
        Ok(self)
    }

    /// Appends a column.
    ///
    /// # Errors
    ///
    /// Fails if the name is taken or the length differs from the frame's
    /// row count.
    pub fn insert_column(&mut self, name: impl Into<String>, column: Column) -> DataResult<()> {
        let name = name.into();
        if self.contains(&name) {
            return Err(DataError::DuplicateColumn(name));
        }
        if self.is_shaped() && column.len() != self.num_rows {
            return Err(DataError::LengthMismatch {
                column: name,
                expected: self.num_rows,
                actual: column.len(),
            });
        }
        self.num_rows = column.len();
        self.columns.push((name, column));
        Ok(())
    }

    /// Removes and returns a column.
    pub fn remove_column(&mut self, name: &str) -> DataResult<Column> {
        let position = self
            .columns
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))?;
        let (_, column) = self.columns.remove(position);
        Ok(column)
    }

    fn is_shaped(&self) -> bool {
        !self.columns.is_empty() || self.index.is_some()
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> DataResult<&Column> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
            .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))
    }

    /// Whether a column exists.
    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Iterates over `(name, column)` pairs in order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(n, c)| (n.as_str(), c))
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of columns, excluding the index.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Whether the frame has no rows.
    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    /// The explicit index, if one was set.
    pub fn index(&self) -> Option<&FrameIndex> {
        self.index.as_ref()
    }

    /// Row keys: the explicit index, or row positions `0..num_rows`.
    pub fn index_values(&self) -> Vec<i64> {
        match &self.index {
            Some(index) => index.values.clone(),
            None => (0..self.num_rows as i64).collect(),
        }
    }

    /// Moves an integer column into the index.
    pub fn set_index(&mut self, name: &str) -> DataResult<()> {
        let values = match self.column(name)? {
            Column::Int64(values) => values.clone(),
            Column::Float32(_) => {
                return Err(DataError::InvalidIndex(format!(
                    "column '{name}' must be an integer column to be used as index"
                )))
            }
        };
        self.remove_column(name)?;
        self.index = Some(FrameIndex {
            name: Some(name.to_string()),
            values,
        });
        Ok(())
    }

    /// Sets an explicit index.
    pub fn with_index(mut self, name: Option<String>, values: Vec<i64>) -> DataResult<Self> {
        if self.is_shaped() && values.len() != self.num_rows {
            return Err(DataError::LengthMismatch {
                column: name.unwrap_or_else(|| "<index>".to_string()),
                expected: self.num_rows,
                actual: values.len(),
            });
        }
        self.num_rows = values.len();
        self.index = Some(FrameIndex { name, values });
        Ok(self)
    }

    /// Whether every row key is distinct.
    pub fn has_unique_index(&self) -> bool {
        match &self.index {
            Some(index) => {
                let distinct: HashSet<i64> = index.values.iter().copied().collect();
                distinct.len() == self.num_rows
            }
            None => true,
        }
    }

    /// Keeps only the named columns, in the given order. The index is kept.
    pub fn select(&self, names: &[&str]) -> DataResult<DataFrame> {
        let mut selected = DataFrame {
            columns: Vec::with_capacity(names.len()),
            index: self.index.clone(),
            num_rows: self.num_rows,
        };
        for name in names {
            selected.insert_column(*name, self.column(name)?.clone())?;
        }
        Ok(selected)
    }

    /// Rows `range.start..range.end`.
    pub fn slice(&self, range: Range<usize>) -> DataResult<DataFrame> {
        if range.start > range.end || range.end > self.num_rows {
            return Err(DataError::InvalidArgument(format!(
                "row range {range:?} is out of bounds for {} rows",
                self.num_rows
            )));
        }
        Ok(DataFrame {
            columns: self
                .columns
                .iter()
                .map(|(n, c)| (n.clone(), c.slice(range.clone())))
                .collect(),
            index: self.index.as_ref().map(|index| FrameIndex {
                name: index.name.clone(),
                values: index.values[range.clone()].to_vec(),
            }),
            num_rows: range.end - range.start,
        })
    }

    /// Drops rows whose values in `subset` repeat an earlier row. An empty
    /// subset compares all columns.
    pub fn drop_duplicates(&self, subset: &[&str]) -> DataResult<DataFrame> {
        let keys: Vec<&Column> = if subset.is_empty() {
            self.columns.iter().map(|(_, c)| c).collect()
        } else {
            subset
                .iter()
                .map(|name| self.column(name))
                .collect::<DataResult<_>>()?
        };

        let mut seen = HashSet::new();
        let rows: Vec<usize> = (0..self.num_rows)
            .filter(|&row| seen.insert(keys.iter().map(|c| c.key_bits(row)).collect::<Vec<_>>()))
            .collect();
        Ok(self.take_rows(&rows))
    }

    fn take_rows(&self, rows: &[usize]) -> DataFrame {
        DataFrame {
            columns: self
                .columns
                .iter()
                .map(|(n, c)| (n.clone(), c.take(rows)))
                .collect(),
            index: self.index.as_ref().map(|index| FrameIndex {
                name: index.name.clone(),
                values: rows.iter().map(|&r| index.values[r]).collect(),
            }),
            num_rows: rows.len(),
        }
    }

    /// Stacks frames vertically.
    ///
    /// All frames must have the same columns in the same order, and either
    /// all or none of them must carry an explicit index.
    pub fn concat(frames: &[DataFrame]) -> DataResult<DataFrame> {
        let first = frames
            .first()
            .ok_or_else(|| DataError::Empty("cannot concatenate zero frames".to_string()))?;
        let mut result = first.clone();

        for frame in &frames[1..] {
            if frame.column_names() != result.column_names() {
                return Err(DataError::InvalidArgument(format!(
                    "cannot concatenate frames with columns {:?} and {:?}",
                    result.column_names(),
                    frame.column_names()
                )));
            }
            for ((name, acc), (_, column)) in result.columns.iter_mut().zip(&frame.columns) {
                acc.append(name, column)?;
            }
            match (&mut result.index, &frame.index) {
                (Some(acc), Some(index)) if acc.name == index.name => {
                    acc.values.extend_from_slice(&index.values)
                }
                (None, None) => {}
                _ => {
                    return Err(DataError::InvalidIndex(
                        "cannot concatenate frames with different indexes".to_string(),
                    ))
                }
            }
            result.num_rows += frame.num_rows;
        }
        Ok(result)
    }

    /// Converts all columns into a `[rows, columns]` tensor, in column order.
    /// Integer columns are cast to `f32`; the index is not included.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Empty`] if the frame has no rows or no columns.
    pub fn to_tensor(&self) -> DataResult<Tensor> {
        if self.num_rows == 0 || self.columns.is_empty() {
            return Err(DataError::Empty(format!(
                "cannot convert a frame with {} rows and {} columns to a tensor",
                self.num_rows,
                self.columns.len()
            )));
        }
        let values: Vec<Vec<f32>> = self.columns.iter().map(|(_, c)| c.to_f32()).collect();
        let ncols = values.len();
        let mut data = Vec::with_capacity(self.num_rows * ncols);
        for row in 0..self.num_rows {
            data.extend(values.iter().map(|column| column[row]));
        }
        Ok(Tensor::from_vec(data, &[self.num_rows, ncols])?)
    }

    /// Converts every column into a `[rows, 1]` feature tensor.
    ///
    /// Integer columns are cast to `f32`, which holds integers exactly only
    /// below 2^24; larger ids lose precision.
    pub fn to_tabular(&self) -> DataResult<TabularData> {
        self.columns
            .iter()
            .map(|(name, column)| {
                let tensor = Tensor::from_vec(column.to_f32(), &[self.num_rows, 1])?;
                Ok((name.clone(), tensor))
            })
            .collect()
    }

    /// Builds a frame from a 2D tensor with float columns named `"0".."d-1"`.
    pub fn from_tensor(tensor: &Tensor) -> DataResult<DataFrame> {
        let matrix = tensor.as_matrix()?;
        let mut frame = DataFrame::new();
        for (j, column) in matrix.columns().into_iter().enumerate() {
            frame.insert_column(j.to_string(), Column::Float32(column.to_vec()))?;
        }
        if frame.columns.is_empty() {
            frame.num_rows = matrix.nrows();
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> DataFrame {
        DataFrame::new()
            .with_column("item_id", Column::Int64(vec![10, 20, 10, 30]))
            .unwrap()
            .with_column("category", Column::Int64(vec![1, 2, 1, 2]))
            .unwrap()
            .with_column("price", Column::Float32(vec![1.5, 2.5, 1.5, 4.0]))
            .unwrap()
    }

    #[test]
    fn test_insert_column_validates_length_and_name() {
        let mut frame = items();
        assert!(matches!(
            frame.insert_column("short", Column::Int64(vec![1])),
            Err(DataError::LengthMismatch { expected: 4, actual: 1, .. })
        ));
        assert!(matches!(
            frame.insert_column("price", Column::Float32(vec![0.0; 4])),
            Err(DataError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_set_index_and_uniqueness() {
        let mut frame = items();
        assert_eq!(frame.index_values(), vec![0, 1, 2, 3]);
        assert!(frame.has_unique_index());

        frame.set_index("item_id").unwrap();
        assert_eq!(frame.index().unwrap().name.as_deref(), Some("item_id"));
        assert_eq!(frame.index_values(), vec![10, 20, 10, 30]);
        assert!(!frame.has_unique_index());
        assert!(!frame.contains("item_id"));

        assert!(matches!(
            frame.set_index("price"),
            Err(DataError::InvalidIndex(_))
        ));
        assert!(matches!(
            frame.set_index("missing"),
            Err(DataError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_drop_duplicates() {
        let frame = items();
        let deduped = frame.drop_duplicates(&[]).unwrap();
        assert_eq!(deduped.num_rows(), 3);
        assert_eq!(
            deduped.column("item_id").unwrap().as_i64().unwrap(),
            &[10, 20, 30]
        );

        let by_category = frame.drop_duplicates(&["category"]).unwrap();
        assert_eq!(by_category.num_rows(), 2);
    }

    #[test]
    fn test_concat_and_slice() {
        let frame = items();
        let head = frame.slice(0..1).unwrap();
        let tail = frame.slice(1..4).unwrap();
        let joined = DataFrame::concat(&[head, tail]).unwrap();
        assert_eq!(joined, frame);

        assert!(frame.slice(2..5).is_err());

        let other = frame.select(&["price"]).unwrap();
        assert!(DataFrame::concat(&[frame.clone(), other]).is_err());

        let mut indexed = frame.clone();
        indexed.set_index("item_id").unwrap();
        let plain = frame.select(&["category", "price"]).unwrap();
        assert!(matches!(
            DataFrame::concat(&[indexed, plain]),
            Err(DataError::InvalidIndex(_))
        ));
    }

    #[test]
    fn test_to_tensor_is_row_major() {
        let mut frame = items();
        frame.set_index("item_id").unwrap();
        let tensor = frame.to_tensor().unwrap();
        assert_eq!(tensor.shape(), &[4, 2]);
        assert_eq!(
            tensor.to_vec(),
            vec![1.0, 1.5, 2.0, 2.5, 1.0, 1.5, 2.0, 4.0]
        );

        assert!(matches!(
            DataFrame::new().to_tensor(),
            Err(DataError::Empty(_))
        ));
    }

    #[test]
    fn test_tensor_roundtrip_names_columns_by_position() {
        let tensor = Tensor::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        let frame = DataFrame::from_tensor(&tensor).unwrap();
        assert_eq!(frame.column_names(), vec!["0", "1", "2"]);
        assert_eq!(frame.to_tensor().unwrap(), tensor);
    }

    #[test]
    fn test_to_tabular() {
        let tabular = items().to_tabular().unwrap();
        assert_eq!(tabular.len(), 3);
        assert_eq!(tabular["category"].shape(), &[4, 1]);
        assert_eq!(tabular["item_id"].to_vec(), vec![10.0, 20.0, 10.0, 30.0]);
    }
}
