//! DLRM: continuous features through a bottom MLP, interacted with the
//! categorical embeddings by pairwise dot products.

use merlin_data::{Schema, TabularData};
use merlin_tensor::Tensor;

use crate::block::{Block, FeatureBlock};
use crate::continuous::ContinuousFeatures;
use crate::embedding::{Aggregation, EmbeddingFeatures, EmbeddingOptions};
use crate::error::{LayerError, LayerResult};
use crate::interaction::DotProductInteraction;
use crate::mlp::MLP;

/// The DLRM feature-interaction block.
///
/// The bottom MLP projects the concatenated continuous features to the
/// embedding dimension. That projection is stacked ahead of the categorical
/// embeddings as one more feature, every pair of the `n + 1` vectors is
/// reduced to a dot product and the optional top MLP runs on the result.
///
/// # Example
///
/// ```
/// use merlin_data::{ColumnSchema, Schema, TabularData};
/// use merlin_layers::activation::ActivationType;
/// use merlin_layers::block::FeatureBlock;
/// use merlin_layers::dlrm::DlrmBlock;
/// use merlin_layers::mlp::MLP;
/// use merlin_tensor::Tensor;
///
/// let schema = Schema::new(vec![
///     ColumnSchema::categorical("user_id", 10),
///     ColumnSchema::categorical("item_id", 10),
///     ColumnSchema::continuous("price"),
/// ]);
/// let bottom = MLP::from_dims(1, &[8, 4], ActivationType::ReLU).unwrap();
/// let dlrm = DlrmBlock::from_schema(&schema, bottom, None).unwrap();
///
/// let mut batch = TabularData::new();
/// batch.insert("user_id".into(), Tensor::from_slice(&[1.0, 2.0], &[2, 1]).unwrap());
/// batch.insert("item_id".into(), Tensor::from_slice(&[3.0, 4.0], &[2, 1]).unwrap());
/// batch.insert("price".into(), Tensor::from_slice(&[0.5, 0.7], &[2, 1]).unwrap());
///
/// // Three stacked vectors give three pairwise interactions.
/// assert_eq!(dlrm.call_features(&batch).unwrap().shape(), &[2, 3]);
/// ```
#[derive(Debug, Clone)]
pub struct DlrmBlock {
    continuous: ContinuousFeatures,
    embeddings: EmbeddingFeatures,
    bottom_mlp: MLP,
    top_mlp: Option<MLP>,
    interaction: DotProductInteraction,
    schema: Schema,
}

impl DlrmBlock {
    /// Assembles a DLRM block from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::ConfigError`] if the bottom MLP does not take
    /// the continuous width or does not produce the embedding dimension, or
    /// if the top MLP does not take the interaction width.
    pub fn new(
        continuous: ContinuousFeatures,
        embeddings: EmbeddingFeatures,
        bottom_mlp: MLP,
        top_mlp: Option<MLP>,
    ) -> LayerResult<Self> {
        if bottom_mlp.input_dim() != continuous.output_dim() {
            return Err(LayerError::ConfigError {
                message: format!(
                    "bottom MLP expects {} inputs but there are {} continuous features",
                    bottom_mlp.input_dim(),
                    continuous.output_dim()
                ),
            });
        }
        let dim = bottom_mlp.output_dim();
        if let Some(table) = embeddings.tables().iter().find(|t| t.dim() != dim) {
            return Err(LayerError::ConfigError {
                message: format!(
                    "embedding '{}' has dim {} but the bottom MLP outputs {dim}",
                    table.name(),
                    table.dim()
                ),
            });
        }
        let interactions = DotProductInteraction::output_dim(embeddings.tables().len() + 1);
        if let Some(top) = &top_mlp {
            if top.input_dim() != interactions {
                return Err(LayerError::ConfigError {
                    message: format!(
                        "top MLP expects {} inputs but the interaction produces {interactions}",
                        top.input_dim()
                    ),
                });
            }
        }

        let schema = match (continuous.schema(), embeddings.schema()) {
            (Some(c), Some(e)) => c.merge(e),
            _ => Schema::default(),
        };
        Ok(Self {
            continuous,
            embeddings: embeddings.with_aggregation(Aggregation::Stack),
            bottom_mlp,
            top_mlp,
            interaction: DotProductInteraction,
            schema,
        })
    }

    /// Builds the continuous and embedding parts from a schema, with every
    /// embedding sized to the bottom MLP's output.
    pub fn from_schema(schema: &Schema, bottom_mlp: MLP, top_mlp: Option<MLP>) -> LayerResult<Self> {
        let options = EmbeddingOptions::new(bottom_mlp.output_dim());
        let embeddings = EmbeddingFeatures::from_schema(schema, &options)?;
        let continuous = ContinuousFeatures::from_schema(schema)?;
        Self::new(continuous, embeddings, bottom_mlp, top_mlp)
    }

    /// Output width of the block.
    pub fn output_dim(&self) -> usize {
        match &self.top_mlp {
            Some(top) => top.output_dim(),
            None => DotProductInteraction::output_dim(self.embeddings.tables().len() + 1),
        }
    }
}

impl FeatureBlock for DlrmBlock {
    fn call_features(&self, features: &TabularData) -> LayerResult<Tensor> {
        let dense = self.continuous.call_features(features)?;
        let projected = self.bottom_mlp.forward(&dense)?.expand_dims(1)?;
        let embedded = self.embeddings.embed_stacked(features)?;
        let stacked = Tensor::concat(&[&projected, &embedded], 1)?;

        let interactions = self.interaction.forward(&stacked)?;
        match &self.top_mlp {
            Some(top) => top.forward(&interactions),
            None => Ok(interactions),
        }
    }

    fn schema(&self) -> Option<&Schema> {
        Some(&self.schema)
    }

    fn name(&self) -> &str {
        "DlrmBlock"
    }
}
