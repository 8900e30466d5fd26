//! Schema-driven synthetic data.
//!
//! Useful for smoke-testing models and indexes without real interaction
//! logs. Categorical columns draw ids uniformly from `0..cardinality`
//! (or `0..100` when the cardinality is unknown), continuous columns draw
//! from `[0, 1)`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dataset::Dataset;
use crate::error::{DataError, DataResult};
use crate::frame::{Column, DataFrame};
use crate::schema::{ColumnType, Schema};

/// Cardinality used for integer columns without one.
pub const DEFAULT_CARDINALITY: usize = 100;

/// A generated frame together with the schema that produced it.
#[derive(Debug, Clone)]
pub struct SyntheticData {
    schema: Schema,
    frame: DataFrame,
}

impl SyntheticData {
    /// Generates `rows` random rows for `schema`, deterministically for a
    /// given `seed`.
    ///
    /// # Errors
    ///
    /// List columns are not supported, and a categorical cardinality of zero
    /// leaves no id to draw.
    ///
    /// # Examples
    ///
    /// ```
    /// use merlin_data::{ColumnSchema, Schema, SyntheticData};
    ///
    /// let schema = Schema::new(vec![
    ///     ColumnSchema::categorical("item_id", 50),
    ///     ColumnSchema::continuous("price"),
    /// ]);
    /// let data = SyntheticData::generate(&schema, 8, 42).unwrap();
    /// assert_eq!(data.frame().num_rows(), 8);
    /// ```
    pub fn generate(schema: &Schema, rows: usize, seed: u64) -> DataResult<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut frame = DataFrame::new();

        for column in schema {
            if column.is_list {
                return Err(DataError::UnsupportedType {
                    column: column.name.clone(),
                    data_type: "list".to_string(),
                });
            }
            let values = match column.dtype {
                ColumnType::Int64 => {
                    let cardinality = column.cardinality.unwrap_or(DEFAULT_CARDINALITY);
                    if cardinality == 0 {
                        return Err(DataError::InvalidArgument(format!(
                            "column '{}' has a cardinality of zero",
                            column.name
                        )));
                    }
                    Column::Int64(
                        (0..rows)
                            .map(|_| rng.gen_range(0..cardinality as i64))
                            .collect(),
                    )
                }
                ColumnType::Float32 => Column::Float32((0..rows).map(|_| rng.gen::<f32>()).collect()),
            };
            frame.insert_column(column.name.clone(), values)?;
        }

        tracing::info!(rows, columns = schema.len(), seed, "Generated synthetic data");
        Ok(Self {
            schema: schema.clone(),
            frame,
        })
    }

    /// The schema the data was generated from.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The generated rows.
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Consumes the data into a single-partition dataset carrying the schema.
    pub fn into_dataset(self) -> Dataset {
        Dataset::new(self.frame).with_schema(self.schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnSchema, Tag};

    fn schema() -> Schema {
        Schema::new(vec![
            ColumnSchema::categorical("user_id", 10).with_tag(Tag::UserId),
            ColumnSchema::categorical("item_id", 3).with_tag(Tag::ItemId),
            ColumnSchema::new("clicks", ColumnType::Int64),
            ColumnSchema::continuous("price"),
        ])
    }

    #[test]
    fn test_values_respect_cardinality_and_range() {
        let data = SyntheticData::generate(&schema(), 500, 7).unwrap();
        let frame = data.frame();
        assert_eq!(frame.column_names(), vec!["user_id", "item_id", "clicks", "price"]);

        let items = frame.column("item_id").unwrap().as_i64().unwrap();
        assert!(items.iter().all(|&id| (0..3).contains(&id)));
        let clicks = frame.column("clicks").unwrap().as_i64().unwrap();
        assert!(clicks.iter().all(|&c| (0..DEFAULT_CARDINALITY as i64).contains(&c)));
        let prices = frame.column("price").unwrap().as_f32().unwrap();
        assert!(prices.iter().all(|&p| (0.0..1.0).contains(&p)));
    }

    #[test]
    fn test_same_seed_same_data() {
        let a = SyntheticData::generate(&schema(), 20, 1).unwrap();
        let b = SyntheticData::generate(&schema(), 20, 1).unwrap();
        let c = SyntheticData::generate(&schema(), 20, 2).unwrap();
        assert_eq!(a.frame(), b.frame());
        assert_ne!(a.frame(), c.frame());
    }

    #[test]
    fn test_rejects_list_and_empty_vocabulary() {
        let lists = Schema::new(vec![ColumnSchema::categorical("history", 10).with_value_count(1, 5)]);
        assert!(matches!(
            SyntheticData::generate(&lists, 4, 0),
            Err(DataError::UnsupportedType { .. })
        ));

        let empty = Schema::new(vec![ColumnSchema::categorical("item_id", 0)]);
        assert!(SyntheticData::generate(&empty, 4, 0).is_err());
    }

    #[test]
    fn test_into_dataset_keeps_schema() {
        let dataset = SyntheticData::generate(&schema(), 5, 3).unwrap().into_dataset();
        assert_eq!(dataset.num_rows(), 5);
        assert_eq!(dataset.schema(), Some(&schema()));
    }
}
