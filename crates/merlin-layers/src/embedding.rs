//! Embedding tables for categorical features.
//!
//! - [`EmbeddingTable`] - a dense `[vocab, dim]` weight matrix indexed by
//!   categorical id
//! - [`EmbeddingOptions`] - dimension and initializer choices per feature
//! - [`EmbeddingFeatures`] - one table per categorical column of a schema,
//!   with the per-feature outputs combined by an [`Aggregation`]
//!
//! # Example
//!
//! ```
//! use merlin_data::{ColumnSchema, Schema, TabularData, Tag};
//! use merlin_layers::block::FeatureBlock;
//! use merlin_layers::embedding::{EmbeddingFeatures, EmbeddingOptions};
//! use merlin_tensor::Tensor;
//!
//! let schema = Schema::new(vec![
//!     ColumnSchema::categorical("user_id", 100).with_tag(Tag::UserId),
//!     ColumnSchema::categorical("item_id", 500).with_tag(Tag::ItemId),
//! ]);
//! let embeddings =
//!     EmbeddingFeatures::from_schema(&schema, &EmbeddingOptions::new(8).with_seed(1)).unwrap();
//!
//! let mut batch = TabularData::new();
//! batch.insert("user_id".into(), Tensor::from_slice(&[3.0, 7.0], &[2, 1]).unwrap());
//! batch.insert("item_id".into(), Tensor::from_slice(&[42.0, 0.0], &[2, 1]).unwrap());
//!
//! let output = embeddings.call_features(&batch).unwrap();
//! assert_eq!(output.shape(), &[2, 16]);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use merlin_data::{Schema, TabularData, Tag};
use merlin_tensor::Tensor;

use crate::block::{feature_column, FeatureBlock};
use crate::error::{LayerError, LayerResult};
use crate::initializer::Initializer;

/// Embedding dimension used when nothing else is configured.
pub const DEFAULT_EMBEDDING_DIM: usize = 64;

/// Smallest id that an `f32` feature tensor cannot hold exactly (2^24).
/// [`EmbeddingTable::lookup`] rejects ids at or above it.
pub const MAX_EXACT_TENSOR_ID: usize = 1 << 24;

/// Multiplier of the cardinality-based dimension heuristic.
pub const DEFAULT_INFER_MULTIPLIER: f32 = 2.0;

/// Embedding size heuristic: `ceil(cardinality^0.25 * multiplier)`, at
/// least 1.
///
/// ```
/// use merlin_layers::embedding::infer_embedding_dim;
///
/// assert_eq!(infer_embedding_dim(10_000, 2.0), 20);
/// assert_eq!(infer_embedding_dim(1, 2.0), 2);
/// ```
pub fn infer_embedding_dim(cardinality: usize, multiplier: f32) -> usize {
    let dim = ((cardinality as f64).sqrt().sqrt() * f64::from(multiplier)).ceil();
    (dim as usize).max(1)
}

/// A dense embedding table.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingTable {
    name: String,
    weights: Tensor,
}

impl EmbeddingTable {
    /// Creates a `[vocab_size, dim]` table filled by `initializer`.
    pub fn new(name: impl Into<String>, vocab_size: usize, dim: usize, initializer: Initializer) -> Self {
        Self {
            name: name.into(),
            weights: initializer.initialize(&[vocab_size, dim]),
        }
    }

    /// Like [`EmbeddingTable::new`] with a deterministic seed.
    pub fn new_seeded(
        name: impl Into<String>,
        vocab_size: usize,
        dim: usize,
        initializer: Initializer,
        seed: u64,
    ) -> Self {
        Self {
            name: name.into(),
            weights: initializer.initialize_seeded(&[vocab_size, dim], seed),
        }
    }

    /// Wraps existing weights.
    ///
    /// # Errors
    ///
    /// Fails unless `weights` is 2D.
    pub fn from_weights(name: impl Into<String>, weights: Tensor) -> LayerResult<Self> {
        weights.as_matrix()?;
        Ok(Self {
            name: name.into(),
            weights,
        })
    }

    /// The feature name the table belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows.
    pub fn vocab_size(&self) -> usize {
        self.weights.shape()[0]
    }

    /// Embedding dimension.
    pub fn dim(&self) -> usize {
        self.weights.shape()[1]
    }

    /// The `[vocab, dim]` weights.
    pub fn weights(&self) -> &Tensor {
        &self.weights
    }

    /// Looks up rows by id.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::EmbeddingError`] for ids outside `0..vocab_size`.
    pub fn lookup_ids(&self, ids: &[usize]) -> LayerResult<Tensor> {
        if let Some(&id) = ids.iter().find(|&&id| id >= self.vocab_size()) {
            return Err(LayerError::EmbeddingError {
                message: format!(
                    "id {id} is out of range for table '{}' with {} rows",
                    self.name,
                    self.vocab_size()
                ),
            });
        }
        Ok(self.weights.select_rows(ids)?)
    }

    /// Looks up a `[batch]` or `[batch, 1]` id tensor, returning
    /// `[batch, dim]`.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::EmbeddingError`] for negative, fractional or
    /// out-of-range ids, and for ids of [`MAX_EXACT_TENSOR_ID`] or more,
    /// which may have been rounded on their way into the tensor.
    pub fn lookup(&self, ids: &Tensor) -> LayerResult<Tensor> {
        let ids = ids
            .to_column()?
            .to_vec()
            .into_iter()
            .map(|value| {
                if value < 0.0 || value.fract() != 0.0 || !value.is_finite() {
                    Err(LayerError::EmbeddingError {
                        message: format!("'{}' received invalid id {value}", self.name),
                    })
                } else if value >= MAX_EXACT_TENSOR_ID as f32 {
                    Err(LayerError::EmbeddingError {
                        message: format!(
                            "'{}' received id {value}, ids of 2^24 or more are not exact in f32",
                            self.name
                        ),
                    })
                } else {
                    Ok(value as usize)
                }
            })
            .collect::<LayerResult<Vec<_>>>()?;
        self.lookup_ids(&ids)
    }
}

/// Dimension and initializer choices for [`EmbeddingFeatures`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingOptions {
    /// Dimension of features without an explicit entry in `dims`.
    #[serde(default = "default_dim")]
    pub default_dim: usize,
    /// Per-feature dimensions.
    #[serde(default)]
    pub dims: BTreeMap<String, usize>,
    /// Per-feature initializers; others use [`Initializer::EMBEDDING_DEFAULT`].
    #[serde(default)]
    pub initializers: BTreeMap<String, Initializer>,
    /// Derive dimensions from cardinalities instead of `default_dim`.
    #[serde(default)]
    pub infer_embedding_sizes: bool,
    /// Multiplier of the inference heuristic.
    #[serde(default = "default_multiplier")]
    pub infer_embedding_sizes_multiplier: f32,
    /// Seed for table initialization; table `i` uses `seed + i`.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_dim() -> usize {
    DEFAULT_EMBEDDING_DIM
}

fn default_multiplier() -> f32 {
    DEFAULT_INFER_MULTIPLIER
}

impl Default for EmbeddingOptions {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIM)
    }
}

impl EmbeddingOptions {
    /// Options with a default dimension.
    pub fn new(default_dim: usize) -> Self {
        Self {
            default_dim,
            dims: BTreeMap::new(),
            initializers: BTreeMap::new(),
            infer_embedding_sizes: false,
            infer_embedding_sizes_multiplier: DEFAULT_INFER_MULTIPLIER,
            seed: None,
        }
    }

    /// Overrides the dimension of one feature.
    pub fn with_dim(mut self, feature: impl Into<String>, dim: usize) -> Self {
        self.dims.insert(feature.into(), dim);
        self
    }

    /// Overrides the initializer of one feature.
    pub fn with_initializer(mut self, feature: impl Into<String>, initializer: Initializer) -> Self {
        self.initializers.insert(feature.into(), initializer);
        self
    }

    /// Enables cardinality-based dimensions.
    pub fn with_inferred_sizes(mut self, multiplier: f32) -> Self {
        self.infer_embedding_sizes = true;
        self.infer_embedding_sizes_multiplier = multiplier;
        self
    }

    /// Makes table initialization deterministic.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Dimension for `feature` with the given cardinality.
    pub fn dim_for(&self, feature: &str, cardinality: usize) -> usize {
        if let Some(&dim) = self.dims.get(feature) {
            dim
        } else if self.infer_embedding_sizes {
            infer_embedding_dim(cardinality, self.infer_embedding_sizes_multiplier)
        } else {
            self.default_dim
        }
    }

    /// Initializer for `feature`.
    pub fn initializer_for(&self, feature: &str) -> Initializer {
        self.initializers
            .get(feature)
            .copied()
            .unwrap_or(Initializer::EMBEDDING_DEFAULT)
    }
}

/// How per-feature embeddings are combined into one tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// `[batch, sum(dims)]`, features in schema order.
    #[default]
    Concat,
    /// `[batch, n_features, dim]`; every feature must share one dimension.
    Stack,
}

/// Embedding tables for the categorical columns of a schema.
#[derive(Debug, Clone)]
pub struct EmbeddingFeatures {
    schema: Schema,
    tables: Vec<EmbeddingTable>,
    aggregation: Aggregation,
}

impl EmbeddingFeatures {
    /// Creates one table per column tagged [`Tag::Categorical`] (or carrying
    /// a cardinality).
    ///
    /// # Errors
    ///
    /// Fails with [`LayerError::ConfigError`] if no column qualifies, a
    /// column has no cardinality, or a resolved dimension is zero.
    pub fn from_schema(schema: &Schema, options: &EmbeddingOptions) -> LayerResult<Self> {
        let columns: Vec<_> = schema
            .iter()
            .filter(|c| c.has_tag(Tag::Categorical) || c.cardinality.is_some())
            .collect();
        if columns.is_empty() {
            return Err(LayerError::ConfigError {
                message: "schema has no categorical columns to embed".to_string(),
            });
        }

        let mut tables = Vec::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            let cardinality = column.cardinality.ok_or_else(|| LayerError::ConfigError {
                message: format!("categorical column '{}' has no cardinality", column.name),
            })?;
            let dim = options.dim_for(&column.name, cardinality);
            if dim == 0 {
                return Err(LayerError::ConfigError {
                    message: format!("embedding dimension of '{}' must be positive", column.name),
                });
            }
            let initializer = options.initializer_for(&column.name);
            let table = match options.seed {
                Some(seed) => EmbeddingTable::new_seeded(
                    column.name.clone(),
                    cardinality,
                    dim,
                    initializer,
                    seed.wrapping_add(i as u64),
                ),
                None => EmbeddingTable::new(column.name.clone(), cardinality, dim, initializer),
            };
            tables.push(table);
        }

        tracing::debug!(features = tables.len(), "Built embedding tables");
        let names: Vec<&str> = tables.iter().map(|t| t.name()).collect();
        Ok(Self {
            schema: schema.select_by_name(&names),
            tables,
            aggregation: Aggregation::Concat,
        })
    }

    /// Builds from existing tables. Each table's name is its feature column.
    pub fn from_tables(schema: Schema, tables: Vec<EmbeddingTable>) -> LayerResult<Self> {
        if tables.is_empty() {
            return Err(LayerError::ConfigError {
                message: "at least one embedding table is required".to_string(),
            });
        }
        Ok(Self {
            schema,
            tables,
            aggregation: Aggregation::Concat,
        })
    }

    /// Sets how [`FeatureBlock::call_features`] combines the embeddings.
    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// The aggregation in use.
    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    /// The tables, in schema order.
    pub fn tables(&self) -> &[EmbeddingTable] {
        &self.tables
    }

    /// Looks up the table of `feature`.
    pub fn table(&self, feature: &str) -> Option<&EmbeddingTable> {
        self.tables.iter().find(|t| t.name() == feature)
    }

    /// Embedded feature names, in order.
    pub fn feature_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name()).collect()
    }

    /// Width of the aggregated output (sum of dims for concat, the shared
    /// dim for stack).
    pub fn output_dim(&self) -> usize {
        match self.aggregation {
            Aggregation::Concat => self.tables.iter().map(EmbeddingTable::dim).sum(),
            Aggregation::Stack => self.tables.first().map(EmbeddingTable::dim).unwrap_or(0),
        }
    }

    /// Keeps only the tables of the named features.
    pub fn select(&self, features: &[&str]) -> LayerResult<Self> {
        let tables = features
            .iter()
            .map(|name| {
                self.table(name)
                    .cloned()
                    .ok_or_else(|| LayerError::FeatureNotFound(name.to_string()))
            })
            .collect::<LayerResult<Vec<_>>>()?;
        Ok(Self {
            schema: self.schema.select_by_name(features),
            tables,
            aggregation: self.aggregation,
        })
    }

    /// Embeds every feature separately, `[batch, dim]` each.
    pub fn embed(&self, features: &TabularData) -> LayerResult<TabularData> {
        self.tables
            .iter()
            .map(|table| {
                let ids = feature_column(features, table.name())?;
                Ok((table.name().to_string(), table.lookup(&ids)?))
            })
            .collect()
    }

    /// Embeds every feature and stacks them into `[batch, n_features, dim]`.
    pub fn embed_stacked(&self, features: &TabularData) -> LayerResult<Tensor> {
        let embedded = self.embed_ordered(features)?;
        self.stack(&embedded)
    }

    fn embed_ordered(&self, features: &TabularData) -> LayerResult<Vec<Tensor>> {
        self.tables
            .iter()
            .map(|table| table.lookup(&feature_column(features, table.name())?))
            .collect()
    }

    fn stack(&self, embedded: &[Tensor]) -> LayerResult<Tensor> {
        let dims: Vec<usize> = self.tables.iter().map(EmbeddingTable::dim).collect();
        if dims.windows(2).any(|w| w[0] != w[1]) {
            return Err(LayerError::ConfigError {
                message: format!("stack aggregation needs equal embedding dims, got {dims:?}"),
            });
        }
        let refs: Vec<&Tensor> = embedded.iter().collect();
        Ok(Tensor::stack(&refs, 1)?)
    }
}

impl FeatureBlock for EmbeddingFeatures {
    fn call_features(&self, features: &TabularData) -> LayerResult<Tensor> {
        let embedded = self.embed_ordered(features)?;
        match self.aggregation {
            Aggregation::Concat => {
                let refs: Vec<&Tensor> = embedded.iter().collect();
                Ok(Tensor::concat(&refs, 1)?)
            }
            Aggregation::Stack => self.stack(&embedded),
        }
    }

    fn schema(&self) -> Option<&Schema> {
        Some(&self.schema)
    }

    fn name(&self) -> &str {
        "EmbeddingFeatures"
    }
}
