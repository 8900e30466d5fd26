//! Partitioned datasets.
//!
//! A [`Dataset`] is an ordered list of [`DataFrame`] partitions plus an
//! optional [`Schema`]. Partitions are processed in parallel on the rayon
//! pool by [`Dataset::map_partitions`]; [`Dataset::to_frame`] materializes
//! them into one frame.
//!
//! # Example
//!
//! ```
//! use merlin_data::{Column, DataFrame, Dataset};
//!
//! let frame = DataFrame::new()
//!     .with_column("item_id", Column::Int64((0..10).collect()))
//!     .unwrap();
//! let dataset = Dataset::new(frame).repartition(3).unwrap();
//! assert_eq!(dataset.num_partitions(), 3);
//!
//! let sizes: Vec<usize> = dataset
//!     .map_partitions(|part| Ok::<_, merlin_data::DataError>(part.num_rows()))
//!     .unwrap();
//! assert_eq!(sizes, vec![4, 3, 3]);
//! ```

use rayon::prelude::*;

use crate::error::{DataError, DataResult};
use crate::frame::DataFrame;
use crate::schema::Schema;

/// An ordered collection of frame partitions.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    partitions: Vec<DataFrame>,
    schema: Option<Schema>,
}

impl Dataset {
    /// Creates a single-partition dataset.
    pub fn new(frame: DataFrame) -> Self {
        Self {
            partitions: vec![frame],
            schema: None,
        }
    }

    /// Creates a dataset from existing partitions.
    ///
    /// # Errors
    ///
    /// Fails if the partitions do not share the same column names.
    pub fn from_partitions(partitions: Vec<DataFrame>) -> DataResult<Self> {
        if let Some(first) = partitions.first() {
            let names = first.column_names();
            if let Some(other) = partitions.iter().find(|p| p.column_names() != names) {
                return Err(DataError::InvalidArgument(format!(
                    "partition columns {:?} differ from {:?}",
                    other.column_names(),
                    names
                )));
            }
        }
        Ok(Self {
            partitions,
            schema: None,
        })
    }

    /// Attaches a schema.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// The attached schema, if any.
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// The partitions, in order.
    pub fn partitions(&self) -> &[DataFrame] {
        &self.partitions
    }

    /// Number of partitions.
    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Total number of rows over all partitions.
    pub fn num_rows(&self) -> usize {
        self.partitions.iter().map(DataFrame::num_rows).sum()
    }

    /// Concatenates all partitions into one frame.
    pub fn to_frame(&self) -> DataResult<DataFrame> {
        DataFrame::concat(&self.partitions)
    }

    /// Splits the rows into `n` contiguous partitions of near-equal size.
    pub fn repartition(&self, n: usize) -> DataResult<Self> {
        if n == 0 {
            return Err(DataError::InvalidArgument(
                "number of partitions must be positive".to_string(),
            ));
        }
        let frame = self.to_frame()?;
        let rows = frame.num_rows();
        let base = rows / n;
        let extra = rows % n;

        let mut partitions = Vec::with_capacity(n);
        let mut start = 0;
        for i in 0..n {
            let len = base + usize::from(i < extra);
            partitions.push(frame.slice(start..start + len)?);
            start += len;
        }
        tracing::debug!(rows, partitions = n, "Repartitioned dataset");

        Ok(Self {
            partitions,
            schema: self.schema.clone(),
        })
    }

    /// Applies `f` to every partition in parallel.
    ///
    /// Results keep partition order. The first error stops the collection
    /// and is returned.
    pub fn map_partitions<F, R, E>(&self, f: F) -> Result<Vec<R>, E>
    where
        F: Fn(&DataFrame) -> Result<R, E> + Sync + Send,
        R: Send,
        E: Send,
    {
        tracing::debug!(
            partitions = self.partitions.len(),
            rows = self.num_rows(),
            "Mapping over dataset partitions"
        );
        self.partitions.par_iter().map(f).collect()
    }
}

impl From<DataFrame> for Dataset {
    fn from(frame: DataFrame) -> Self {
        Self::new(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Column;
    use crate::schema::ColumnSchema;

    fn frame(ids: Vec<i64>) -> DataFrame {
        let values = ids.iter().map(|&i| i as f32 * 0.5).collect();
        DataFrame::new()
            .with_column("item_id", Column::Int64(ids))
            .unwrap()
            .with_column("value", Column::Float32(values))
            .unwrap()
    }

    #[test]
    fn test_to_frame_concatenates_in_order() {
        let dataset = Dataset::from_partitions(vec![frame(vec![1, 2]), frame(vec![3])]).unwrap();
        assert_eq!(dataset.num_partitions(), 2);
        assert_eq!(dataset.num_rows(), 3);

        let merged = dataset.to_frame().unwrap();
        assert_eq!(merged.column("item_id").unwrap().as_i64().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_from_partitions_rejects_mismatched_columns() {
        let other = frame(vec![1]).select(&["value"]).unwrap();
        assert!(Dataset::from_partitions(vec![frame(vec![1]), other]).is_err());
    }

    #[test]
    fn test_repartition_preserves_rows_and_schema() {
        let dataset = Dataset::new(frame((0..7).collect()))
            .with_schema(Schema::new(vec![ColumnSchema::categorical("item_id", 7)]));
        let parts = dataset.repartition(3).unwrap();

        let sizes: Vec<usize> = parts.partitions().iter().map(DataFrame::num_rows).collect();
        assert_eq!(sizes, vec![3, 2, 2]);
        assert!(parts.schema().is_some());
        assert_eq!(parts.to_frame().unwrap(), dataset.to_frame().unwrap());

        assert!(dataset.repartition(0).is_err());
    }

    #[test]
    fn test_map_partitions_keeps_order_and_propagates_errors() {
        let dataset = Dataset::new(frame((0..100).collect())).repartition(8).unwrap();
        let firsts: Vec<i64> = dataset
            .map_partitions(|part| {
                Ok::<_, DataError>(part.column("item_id")?.as_i64().unwrap_or(&[])[0])
            })
            .unwrap();
        assert_eq!(firsts, vec![0, 13, 26, 39, 52, 64, 76, 88]);

        let result: Result<Vec<()>, DataError> =
            dataset.map_partitions(|part| part.column("missing").map(|_| ()));
        assert!(matches!(result, Err(DataError::ColumnNotFound(_))));
    }
}
