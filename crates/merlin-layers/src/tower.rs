//! Towers: a feature block followed by an optional MLP.

use std::fmt;

use merlin_data::{Schema, TabularData};
use merlin_tensor::Tensor;

use crate::block::{Block, FeatureBlock};
use crate::error::{LayerError, LayerResult};
use crate::mlp::MLP;

/// One side of a two-tower model.
///
/// ```
/// use merlin_data::{ColumnSchema, Schema, TabularData, Tag};
/// use merlin_layers::activation::ActivationType;
/// use merlin_layers::block::FeatureBlock;
/// use merlin_layers::embedding::{EmbeddingFeatures, EmbeddingOptions};
/// use merlin_layers::mlp::MLP;
/// use merlin_layers::tower::Tower;
/// use merlin_tensor::Tensor;
///
/// let schema = Schema::new(vec![ColumnSchema::categorical("item_id", 50).with_tag(Tag::ItemId)]);
/// let embeddings = EmbeddingFeatures::from_schema(&schema, &EmbeddingOptions::new(16)).unwrap();
/// let tower = Tower::new(embeddings)
///     .with_mlp(MLP::from_dims(16, &[8], ActivationType::None).unwrap())
///     .unwrap();
///
/// let mut batch = TabularData::new();
/// batch.insert("item_id".into(), Tensor::from_slice(&[3.0], &[1, 1]).unwrap());
/// assert_eq!(tower.call_features(&batch).unwrap().shape(), &[1, 8]);
/// ```
pub struct Tower {
    features: Box<dyn FeatureBlock>,
    mlp: Option<MLP>,
}

impl Tower {
    /// A tower without an MLP.
    pub fn new(features: impl FeatureBlock + 'static) -> Self {
        Self {
            features: Box::new(features),
            mlp: None,
        }
    }

    /// Appends an MLP.
    ///
    /// # Errors
    ///
    /// Fails if the tower already has one.
    pub fn with_mlp(mut self, mlp: MLP) -> LayerResult<Self> {
        if self.mlp.is_some() {
            return Err(LayerError::ConfigError {
                message: "tower already has an MLP".to_string(),
            });
        }
        self.mlp = Some(mlp);
        Ok(self)
    }

    /// The MLP, if any.
    pub fn mlp(&self) -> Option<&MLP> {
        self.mlp.as_ref()
    }
}

impl fmt::Debug for Tower {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tower")
            .field("features", &self.features.name())
            .field("mlp", &self.mlp)
            .finish()
    }
}

impl FeatureBlock for Tower {
    fn call_features(&self, features: &TabularData) -> LayerResult<Tensor> {
        let output = self.features.call_features(features)?;
        match &self.mlp {
            Some(mlp) => mlp.forward(&output),
            None => Ok(output),
        }
    }

    fn schema(&self) -> Option<&Schema> {
        self.features.schema()
    }

    fn name(&self) -> &str {
        "Tower"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationType;
    use crate::continuous::ContinuousFeatures;

    #[test]
    fn test_tower_without_mlp_passes_features_through() {
        let tower = Tower::new(ContinuousFeatures::from_features(&["a", "b"]).unwrap());
        let mut batch = TabularData::new();
        batch.insert("a".into(), Tensor::ones(&[2, 1]));
        batch.insert("b".into(), Tensor::zeros(&[2, 1]));
        assert_eq!(tower.call_features(&batch).unwrap().to_vec(), vec![1.0, 0.0, 1.0, 0.0]);
        assert_eq!(tower.schema().unwrap().column_names(), vec!["a", "b"]);
        assert!(format!("{tower:?}").contains("ContinuousFeatures"));
    }

    #[test]
    fn test_tower_rejects_second_mlp() {
        let mlp = MLP::from_dims(2, &[1], ActivationType::None).unwrap();
        let tower = Tower::new(ContinuousFeatures::from_features(&["a", "b"]).unwrap())
            .with_mlp(mlp.clone())
            .unwrap();
        assert_eq!(tower.mlp().unwrap().output_dim(), 1);
        assert!(tower.with_mlp(mlp).is_err());
    }
}
