//! Continuous (dense numeric) features.

use merlin_data::{ColumnSchema, Schema, TabularData, Tag};
use merlin_tensor::Tensor;

use crate::block::{feature_column, FeatureBlock};
use crate::error::{LayerError, LayerResult};

/// Concatenates scalar continuous columns into `[batch, n_features]`.
///
/// ```
/// use merlin_data::{ColumnSchema, Schema, TabularData};
/// use merlin_layers::block::FeatureBlock;
/// use merlin_layers::continuous::ContinuousFeatures;
/// use merlin_tensor::Tensor;
///
/// let schema = Schema::new(vec![
///     ColumnSchema::continuous("price"),
///     ColumnSchema::continuous("age"),
/// ]);
/// let block = ContinuousFeatures::from_schema(&schema).unwrap();
///
/// let mut batch = TabularData::new();
/// batch.insert("price".into(), Tensor::from_slice(&[1.0, 2.0], &[2, 1]).unwrap());
/// batch.insert("age".into(), Tensor::from_slice(&[30.0, 40.0], &[2, 1]).unwrap());
/// assert_eq!(block.call_features(&batch).unwrap().to_vec(), vec![1.0, 30.0, 2.0, 40.0]);
/// ```
#[derive(Debug, Clone)]
pub struct ContinuousFeatures {
    schema: Schema,
}

impl ContinuousFeatures {
    /// Uses every column tagged [`Tag::Continuous`].
    pub fn from_schema(schema: &Schema) -> LayerResult<Self> {
        let selected = schema.select_by_tag(Tag::Continuous);
        if selected.is_empty() {
            return Err(LayerError::ConfigError {
                message: "schema has no continuous columns".to_string(),
            });
        }
        Ok(Self { schema: selected })
    }

    /// Uses the named columns, in order.
    pub fn from_features<S: AsRef<str>>(names: &[S]) -> LayerResult<Self> {
        if names.is_empty() {
            return Err(LayerError::ConfigError {
                message: "at least one continuous feature is required".to_string(),
            });
        }
        let schema = Schema::new(
            names
                .iter()
                .map(|name| ColumnSchema::continuous(name.as_ref()))
                .collect(),
        );
        Ok(Self { schema })
    }

    /// Number of output columns.
    pub fn output_dim(&self) -> usize {
        self.schema.len()
    }
}

impl FeatureBlock for ContinuousFeatures {
    fn call_features(&self, features: &TabularData) -> LayerResult<Tensor> {
        let columns = self
            .schema
            .iter()
            .map(|column| feature_column(features, &column.name))
            .collect::<LayerResult<Vec<_>>>()?;
        let refs: Vec<&Tensor> = columns.iter().collect();
        Ok(Tensor::concat(&refs, 1)?)
    }

    fn schema(&self) -> Option<&Schema> {
        Some(&self.schema)
    }

    fn name(&self) -> &str {
        "ContinuousFeatures"
    }
}
