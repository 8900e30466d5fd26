//! Recommender building blocks for merlin-rs.
//!
//! This crate provides the blocks used to build and serve retrieval and
//! ranking models on top of [`merlin_data`] schemas:
//!
//! - **Embeddings**: Per-column embedding tables sized from the schema
//! - **Continuous features**: Concatenation of numeric columns
//! - **MLP**: Multi-layer perceptrons built from [`MLPConfig`]
//! - **DLRM**: Bottom MLP plus pairwise dot-product interactions
//! - **Matrix factorization**: Query and item embeddings scored by dot product
//! - **Towers**: A feature block followed by an optional MLP
//! - **Candidate indexes**: [`IndexBlock`] and [`TopKIndexBlock`] for top-k
//!   retrieval over precomputed candidate embeddings
//! - **Ranking helpers**: Top-k extraction and recall@k
//!
//! # Quick Start
//!
//! ```
//! use merlin_layers::prelude::*;
//!
//! let mlp = MLPConfig::new(8)
//!     .add_layer(4, ActivationType::ReLU)
//!     .add_layer(1, ActivationType::None)
//!     .build()
//!     .unwrap();
//! let output = mlp.forward(&Tensor::ones(&[2, 8])).unwrap();
//! assert_eq!(output.shape(), &[2, 1]);
//! ```
//!
//! # Retrieval
//!
//! An item encoder populates a [`TopKIndexBlock`]; query embeddings are then
//! scored against every candidate:
//!
//! ```
//! use merlin_data::{Column, ColumnSchema, DataFrame, Dataset, Schema, Tag};
//! use merlin_layers::prelude::*;
//!
//! let schema = Schema::new(vec![
//!     ColumnSchema::categorical("user_id", 10).with_tag(Tag::UserId),
//!     ColumnSchema::categorical("item_id", 10).with_tag(Tag::ItemId),
//! ]);
//! let mf = MatrixFactorizationBlock::from_schema(&schema, 4).unwrap();
//!
//! let items = DataFrame::new()
//!     .with_column("item_id", Column::Int64(vec![1, 4, 7]))
//!     .unwrap();
//! let index =
//!     TopKIndexBlock::from_block(&mf.item_encoder().unwrap(), &Dataset::new(items), 2, None)
//!         .unwrap();
//! assert_eq!(index.num_candidates(), 3);
//!
//! let top = index.score(&Tensor::ones(&[5, 4]), None).unwrap();
//! assert_eq!(top.ids.dim(), (5, 2));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod activation;
pub mod block;
pub mod context;
pub mod continuous;
pub mod dense;
pub mod dlrm;
pub mod embedding;
pub mod error;
pub mod index;
pub mod initializer;
pub mod interaction;
pub mod matrix_factorization;
pub mod mlp;
pub mod prediction;
pub mod ranking;
pub mod tower;

// Re-export main types at crate level
pub use activation::ActivationType;
pub use block::{Block, FeatureBlock, TabularData};
pub use context::{BlockContext, QUERY_CONTEXT_KEY};
pub use continuous::ContinuousFeatures;
pub use dense::Dense;
pub use dlrm::DlrmBlock;
pub use embedding::{
    infer_embedding_dim, Aggregation, EmbeddingFeatures, EmbeddingOptions, EmbeddingTable,
};
pub use error::{LayerError, LayerResult};
pub use index::{CandidateIndex, IndexBlock, IndexConfig, TopKIndexBlock, TopKResult};
pub use initializer::Initializer;
pub use interaction::DotProductInteraction;
pub use matrix_factorization::MatrixFactorizationBlock;
pub use merlin_tensor::Tensor;
pub use mlp::{MLPConfig, MLP};
pub use prediction::PredictionOutput;
pub use ranking::{extract_topk, recall_at_k};
pub use tower::Tower;

/// Prelude module for convenient imports.
///
/// ```
/// use merlin_layers::prelude::*;
/// ```
pub mod prelude {
    pub use crate::activation::ActivationType;
    pub use crate::block::{Block, FeatureBlock, TabularData};
    pub use crate::context::{BlockContext, QUERY_CONTEXT_KEY};
    pub use crate::continuous::ContinuousFeatures;
    pub use crate::dense::Dense;
    pub use crate::dlrm::DlrmBlock;
    pub use crate::embedding::{Aggregation, EmbeddingFeatures, EmbeddingOptions, EmbeddingTable};
    pub use crate::error::{LayerError, LayerResult};
    pub use crate::index::{CandidateIndex, IndexBlock, IndexConfig, TopKIndexBlock, TopKResult};
    pub use crate::initializer::Initializer;
    pub use crate::interaction::DotProductInteraction;
    pub use crate::matrix_factorization::MatrixFactorizationBlock;
    pub use crate::mlp::{MLPConfig, MLP};
    pub use crate::prediction::PredictionOutput;
    pub use crate::ranking::{extract_topk, recall_at_k};
    pub use crate::tower::Tower;
    pub use merlin_tensor::Tensor;
}
