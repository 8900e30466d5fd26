//! Matrix factorization: one embedding per query id and per item id, scored
//! by their dot product.

use merlin_data::{Schema, TabularData, Tag};
use merlin_tensor::Tensor;

use crate::block::FeatureBlock;
use crate::embedding::{EmbeddingFeatures, EmbeddingOptions};
use crate::error::{LayerError, LayerResult};

/// Output name of the query-side embedding.
pub const QUERY_OUTPUT: &str = "query";

/// Output name of the item-side embedding.
pub const ITEM_OUTPUT: &str = "item";

/// A two-tower block made of two embedding tables.
///
/// The query side embeds the first column tagged with the query tag
/// ([`Tag::UserId`] by default) and the item side the first column tagged
/// with the item tag ([`Tag::ItemId`] by default). [`Self::item_encoder`]
/// can populate a top-k index, while [`Self::query_encoder`] produces the
/// matching query embeddings.
///
/// # Example
///
/// ```
/// use merlin_data::{ColumnSchema, Schema, TabularData, Tag};
/// use merlin_layers::block::FeatureBlock;
/// use merlin_layers::matrix_factorization::MatrixFactorizationBlock;
/// use merlin_tensor::Tensor;
///
/// let schema = Schema::new(vec![
///     ColumnSchema::categorical("user_id", 10).with_tag(Tag::UserId),
///     ColumnSchema::categorical("item_id", 20).with_tag(Tag::ItemId),
/// ]);
/// let mf = MatrixFactorizationBlock::from_schema(&schema, 4).unwrap();
///
/// let mut batch = TabularData::new();
/// batch.insert("user_id".into(), Tensor::from_slice(&[1.0, 2.0], &[2, 1]).unwrap());
/// batch.insert("item_id".into(), Tensor::from_slice(&[5.0, 6.0], &[2, 1]).unwrap());
///
/// let embedded = mf.embed(&batch).unwrap();
/// assert_eq!(embedded["query"].shape(), &[2, 4]);
/// assert_eq!(mf.call_features(&batch).unwrap().shape(), &[2, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct MatrixFactorizationBlock {
    embeddings: EmbeddingFeatures,
    query_feature: String,
    item_feature: String,
}

impl MatrixFactorizationBlock {
    /// Builds `dim`-dimensional user-id and item-id embeddings.
    pub fn from_schema(schema: &Schema, dim: usize) -> LayerResult<Self> {
        Self::from_schema_with(schema, EmbeddingOptions::new(dim), Tag::UserId, Tag::ItemId)
    }

    /// Builds the block with custom embedding options and tags.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::ConfigError`] when no column carries one of the
    /// tags or a tagged column cannot be embedded.
    pub fn from_schema_with(
        schema: &Schema,
        options: EmbeddingOptions,
        query_tag: Tag,
        item_tag: Tag,
    ) -> LayerResult<Self> {
        let query = first_tagged(schema, query_tag)?;
        let item = first_tagged(schema, item_tag)?;
        let query_item = schema.select_by_name(&[query.as_str(), item.as_str()]);

        let embeddings = EmbeddingFeatures::from_schema(&query_item, &options)?;
        for feature in [&query, &item] {
            if embeddings.table(feature).is_none() {
                return Err(LayerError::ConfigError {
                    message: format!("column '{feature}' is not categorical"),
                });
            }
        }

        tracing::debug!(query = %query, item = %item, "Built matrix factorization block");
        Ok(Self {
            embeddings,
            query_feature: query,
            item_feature: item,
        })
    }

    /// Embeds the batch, returning the `"query"` and `"item"` embeddings.
    pub fn embed(&self, features: &TabularData) -> LayerResult<TabularData> {
        let mut embedded = self.embeddings.embed(features)?;
        let mut outputs = TabularData::new();
        for (feature, output) in [(&self.query_feature, QUERY_OUTPUT), (&self.item_feature, ITEM_OUTPUT)] {
            let tensor = embedded
                .remove(feature.as_str())
                .ok_or_else(|| LayerError::FeatureNotFound(feature.clone()))?;
            outputs.insert(output.to_string(), tensor);
        }
        Ok(outputs)
    }

    /// Encoder producing query embeddings.
    pub fn query_encoder(&self) -> LayerResult<EmbeddingFeatures> {
        self.embeddings.select(&[self.query_feature.as_str()])
    }

    /// Encoder producing item embeddings, tagged so an index can find the
    /// item-id column.
    pub fn item_encoder(&self) -> LayerResult<EmbeddingFeatures> {
        self.embeddings.select(&[self.item_feature.as_str()])
    }

    /// Name of the query-id column.
    pub fn query_feature(&self) -> &str {
        &self.query_feature
    }

    /// Name of the item-id column.
    pub fn item_feature(&self) -> &str {
        &self.item_feature
    }
}

fn first_tagged(schema: &Schema, tag: Tag) -> LayerResult<String> {
    schema
        .select_by_tag(tag)
        .first()
        .map(|column| column.name.clone())
        .ok_or_else(|| LayerError::ConfigError {
            message: format!("schema has no column tagged '{tag}'"),
        })
}

impl FeatureBlock for MatrixFactorizationBlock {
    /// Scores each row by the dot product of its query and item embeddings,
    /// `[batch, 1]`.
    fn call_features(&self, features: &TabularData) -> LayerResult<Tensor> {
        let embedded = self.embed(features)?;
        let (query, item) = (&embedded[QUERY_OUTPUT], &embedded[ITEM_OUTPUT]);
        Ok(query.mul(item)?.sum_axis(1)?.to_column()?)
    }

    fn schema(&self) -> Option<&Schema> {
        self.embeddings.schema()
    }

    fn name(&self) -> &str {
        "MatrixFactorizationBlock"
    }
}
