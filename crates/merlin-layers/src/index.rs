//! Candidate indexes for retrieval.
//!
//! An index owns a `[num_candidates, dim]` table of candidate embeddings and
//! one identifier per row. [`IndexBlock`] stores and looks up candidates;
//! [`TopKIndexBlock`] adds a default `k` and scores query embeddings against
//! every candidate by dot product, returning the best `k` per query with
//! their identifiers.
//!
//! Both implement [`CandidateIndex`], the shared storage contract.
//!
//! # Example
//!
//! ```
//! use merlin_layers::index::{CandidateIndex, TopKIndexBlock};
//! use merlin_tensor::Tensor;
//!
//! let candidates = Tensor::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
//! let index = TopKIndexBlock::new(1, candidates, Some(vec![10, 20])).unwrap();
//!
//! let queries = Tensor::from_rows(&[vec![1.0, 0.0]]).unwrap();
//! let top = index.score(&queries, None).unwrap();
//! assert_eq!(top.scores.to_vec(), vec![1.0]);
//! assert_eq!(top.ids[[0, 0]], 10);
//! assert_eq!(index.num_candidates(), 2);
//! ```
//!
//! # Tie-breaking
//!
//! Candidates with equal scores are returned in ascending row order.

use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use merlin_data::{DataFrame, Dataset, Tag};
use merlin_tensor::{ops, Tensor};

use crate::block::{Block, FeatureBlock};
use crate::context::BlockContext;
use crate::error::{LayerError, LayerResult};
use crate::prediction::PredictionOutput;

/// Default number of candidates returned per query.
pub const DEFAULT_K: usize = 20;

const DUPLICATE_IDS_MESSAGE: &str = "Please make sure that `data` contains unique indices";

/// Storage contract shared by candidate indexes.
pub trait CandidateIndex {
    /// The `[num_candidates, dim]` candidate table.
    fn values(&self) -> &Tensor;

    /// One identifier per candidate row.
    fn ids(&self) -> &Array1<i64>;

    /// Replaces the table and identifiers together.
    ///
    /// `ids` defaults to row positions `0..rows`. Nothing is replaced when
    /// validation fails.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::ValidationError`] if `values` is not 2D or `ids`
    /// does not have one entry per row.
    fn update(&mut self, values: Tensor, ids: Option<Vec<i64>>) -> LayerResult<()>;

    /// Number of candidates.
    fn num_candidates(&self) -> usize {
        self.values().shape()[0]
    }

    /// Embedding dimension.
    fn dim(&self) -> usize {
        self.values().shape()[1]
    }

    /// Candidate rows at the given positions.
    ///
    /// # Errors
    ///
    /// An out-of-range position surfaces as the tensor layer's
    /// index-out-of-bounds error.
    fn lookup(&self, rows: &[usize]) -> LayerResult<Tensor> {
        Ok(self.values().select_rows(rows)?)
    }

    /// Copies the table into a single-partition dataset with columns
    /// `"0".."dim-1"` and a row-position index.
    fn to_dataset(&self) -> LayerResult<Dataset> {
        let rows = self.num_candidates() as i64;
        let frame = DataFrame::from_tensor(self.values())?.with_index(None, (0..rows).collect())?;
        Ok(Dataset::new(frame))
    }
}

/// Builds the `(values, ids)` pair, checking shapes.
fn validate_candidates(values: &Tensor, ids: Option<Vec<i64>>) -> LayerResult<Array1<i64>> {
    if values.ndim() != 2 {
        return Err(LayerError::ValidationError {
            message: format!(
                "The candidates embeddings tensor must be 2D (got {:?}).",
                values.shape()
            ),
        });
    }
    let rows = values.shape()[0];
    let ids = ids.unwrap_or_else(|| (0..rows as i64).collect());
    if ids.len() != rows {
        return Err(LayerError::ValidationError {
            message: format!(
                "Expected one identifier per candidate row ({rows}), got {}",
                ids.len()
            ),
        });
    }
    Ok(Array1::from(ids))
}

/// A table of candidate embeddings with their identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexBlock {
    values: Tensor,
    ids: Array1<i64>,
}

impl IndexBlock {
    /// Creates an index from a table and optional identifiers (defaulting to
    /// row positions).
    ///
    /// # Errors
    ///
    /// See [`CandidateIndex::update`].
    pub fn new(values: Tensor, ids: Option<Vec<i64>>) -> LayerResult<Self> {
        let ids = validate_candidates(&values, ids)?;
        Ok(Self { values, ids })
    }

    /// Builds an index from a keyed frame.
    ///
    /// Every column becomes a table column, in frame order; the frame index
    /// supplies the identifiers (row positions when the frame has none).
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::ValidationError`] when `check_unique_ids` is set
    /// and the index repeats a key, and a data error for an empty frame.
    pub fn from_frame(frame: &DataFrame, check_unique_ids: bool) -> LayerResult<Self> {
        if check_unique_ids && !frame.has_unique_index() {
            return Err(LayerError::ValidationError {
                message: DUPLICATE_IDS_MESSAGE.to_string(),
            });
        }
        let values = frame.to_tensor()?;
        let index = Self::new(values, Some(frame.index_values()))?;
        tracing::info!(
            candidates = index.num_candidates(),
            dim = index.dim(),
            "Built candidate index"
        );
        Ok(index)
    }

    /// Builds an index from every partition of a keyed dataset.
    pub fn from_dataset(dataset: &Dataset, check_unique_ids: bool) -> LayerResult<Self> {
        Self::from_frame(&dataset.to_frame()?, check_unique_ids)
    }

    /// Encodes the candidates of `dataset` with `block` and indexes the
    /// embeddings by `id_column`.
    ///
    /// When `id_column` is `None` the first column of the block's schema
    /// tagged [`Tag::ItemId`] is used. Partitions are encoded in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::ConfigError`] if no id column can be resolved,
    /// [`LayerError::ValidationError`] for duplicate ids, and any error of
    /// the block.
    pub fn from_block<B>(block: &B, dataset: &Dataset, id_column: Option<&str>) -> LayerResult<Self>
    where
        B: FeatureBlock + ?Sized,
    {
        let frame = encode_candidates(block, dataset, id_column)?;
        Self::from_frame(&frame, true)
    }
}

impl CandidateIndex for IndexBlock {
    fn values(&self) -> &Tensor {
        &self.values
    }

    fn ids(&self) -> &Array1<i64> {
        &self.ids
    }

    fn update(&mut self, values: Tensor, ids: Option<Vec<i64>>) -> LayerResult<()> {
        let ids = validate_candidates(&values, ids)?;
        self.values = values;
        self.ids = ids;
        tracing::info!(
            candidates = self.num_candidates(),
            dim = self.dim(),
            "Updated candidate index"
        );
        Ok(())
    }
}

impl Block for IndexBlock {
    /// Looks up candidate rows; `input` holds row positions.
    fn forward(&self, input: &Tensor) -> LayerResult<Tensor> {
        let rows = input
            .to_vec()
            .into_iter()
            .map(|value| {
                if value >= 0.0 && value.fract() == 0.0 {
                    Ok(value as usize)
                } else {
                    Err(LayerError::ValidationError {
                        message: format!("invalid candidate position {value}"),
                    })
                }
            })
            .collect::<LayerResult<Vec<_>>>()?;
        self.lookup(&rows)
    }

    fn name(&self) -> &str {
        "IndexBlock"
    }
}

/// Resolves the id column: the explicit name, else the block's first
/// item-id column.
fn resolve_id_column<B>(block: &B, id_column: Option<&str>) -> LayerResult<String>
where
    B: FeatureBlock + ?Sized,
{
    if let Some(name) = id_column {
        return Ok(name.to_string());
    }
    block
        .schema()
        .and_then(|schema| schema.select_by_tag(Tag::ItemId).first().map(|c| c.name.clone()))
        .ok_or_else(|| LayerError::ConfigError {
            message: format!(
                "no id column given and block '{}' exposes no column tagged '{}'",
                block.name(),
                Tag::ItemId
            ),
        })
}

/// Runs `block` over every partition, returning the id column followed by
/// the embedding columns `"0".."d-1"`, indexed by the id column.
fn encode_candidates<B>(block: &B, dataset: &Dataset, id_column: Option<&str>) -> LayerResult<DataFrame>
where
    B: FeatureBlock + ?Sized,
{
    let id_column = resolve_id_column(block, id_column)?;

    let encoded = dataset.map_partitions(|partition| -> LayerResult<Option<DataFrame>> {
        if partition.is_empty() {
            return Ok(None);
        }
        let ids = partition.column(&id_column)?.clone();
        let embeddings = block.call_features(&partition.to_tabular()?)?;
        if embeddings.ndim() != 2 || embeddings.shape()[0] != partition.num_rows() {
            return Err(LayerError::ShapeMismatch {
                expected: vec![partition.num_rows(), 0],
                actual: embeddings.shape().to_vec(),
            });
        }

        let mut frame = DataFrame::new().with_column(id_column.as_str(), ids)?;
        for (name, column) in DataFrame::from_tensor(&embeddings)?.columns() {
            frame.insert_column(name, column.clone())?;
        }
        Ok(Some(frame))
    })?;

    let partitions: Vec<DataFrame> = encoded.into_iter().flatten().collect();
    let mut frame = DataFrame::concat(&partitions)?;
    frame.set_index(&id_column)?;

    tracing::info!(
        block = block.name(),
        id_column = %id_column,
        partitions = dataset.num_partitions(),
        rows = frame.num_rows(),
        dim = frame.num_columns(),
        "Encoded candidates"
    );
    Ok(frame)
}

/// Scores and identifiers of the best candidates per query.
#[derive(Debug, Clone, PartialEq)]
pub struct TopKResult {
    /// `[queries, k]`, each row in descending order.
    pub scores: Tensor,
    /// `[queries, k]` candidate identifiers aligned with `scores`.
    pub ids: Array2<i64>,
}

/// Settings for building a [`TopKIndexBlock`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Default number of candidates per query.
    #[serde(default = "default_k")]
    pub k: usize,
    /// Reject candidate sets with repeated identifiers.
    #[serde(default = "default_check_unique_ids")]
    pub check_unique_ids: bool,
    /// Identifier column; inferred from the encoder's schema when absent.
    #[serde(default)]
    pub id_column: Option<String>,
}

fn default_k() -> usize {
    DEFAULT_K
}

fn default_check_unique_ids() -> bool {
    true
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            check_unique_ids: true,
            id_column: None,
        }
    }
}

impl IndexConfig {
    /// Parses a configuration from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> LayerResult<Self> {
        serde_json::from_str(json).map_err(|e| LayerError::ConfigError {
            message: format!("invalid index config: {e}"),
        })
    }

    /// Reads a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> LayerResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| LayerError::ConfigError {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_json_str(&json)
    }
}

/// A candidate index that retrieves the top-k candidates of each query.
#[derive(Debug, Clone, PartialEq)]
pub struct TopKIndexBlock {
    index: IndexBlock,
    k: usize,
}

impl TopKIndexBlock {
    /// Creates a top-k index over `values` with default `k`.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::ConfigError`] if `k` is zero and the errors of
    /// [`IndexBlock::new`].
    pub fn new(k: usize, values: Tensor, ids: Option<Vec<i64>>) -> LayerResult<Self> {
        Self::from_index(IndexBlock::new(values, ids)?, k)
    }

    /// Wraps an existing index.
    pub fn from_index(index: IndexBlock, k: usize) -> LayerResult<Self> {
        if k == 0 {
            return Err(LayerError::ConfigError {
                message: "k must be positive".to_string(),
            });
        }
        Ok(Self { index, k })
    }

    /// Builds from a keyed dataset; see [`IndexBlock::from_dataset`].
    pub fn from_dataset(dataset: &Dataset, k: usize, check_unique_ids: bool) -> LayerResult<Self> {
        Self::from_index(IndexBlock::from_dataset(dataset, check_unique_ids)?, k)
    }

    /// Builds from an encoder; see [`IndexBlock::from_block`].
    pub fn from_block<B>(
        block: &B,
        dataset: &Dataset,
        k: usize,
        id_column: Option<&str>,
    ) -> LayerResult<Self>
    where
        B: FeatureBlock + ?Sized,
    {
        Self::from_index(IndexBlock::from_block(block, dataset, id_column)?, k)
    }

    /// Builds from an encoder using `config`.
    pub fn from_config<B>(config: &IndexConfig, block: &B, dataset: &Dataset) -> LayerResult<Self>
    where
        B: FeatureBlock + ?Sized,
    {
        let frame = encode_candidates(block, dataset, config.id_column.as_deref())?;
        let index = IndexBlock::from_frame(&frame, config.check_unique_ids)?;
        Self::from_index(index, config.k)
    }

    /// The default number of candidates per query.
    pub fn k(&self) -> usize {
        self.k
    }

    /// The underlying index.
    pub fn index(&self) -> &IndexBlock {
        &self.index
    }

    /// Scores every query against every candidate and keeps the best `k`
    /// (the default `k` when `None`).
    ///
    /// `k` larger than the number of candidates returns all candidates.
    ///
    /// # Errors
    ///
    /// Fails with a tensor shape error if `queries` is not 2D or its width
    /// differs from the candidate dimension.
    pub fn score(&self, queries: &Tensor, k: Option<usize>) -> LayerResult<TopKResult> {
        let k = k.unwrap_or(self.k);
        if k > self.num_candidates() {
            tracing::debug!(
                k,
                candidates = self.num_candidates(),
                "Requested k exceeds candidate count, truncating"
            );
        }
        let scores = queries.matmul_transposed(self.values())?;
        let top = ops::top_k(&scores, k)?;
        let ids = ops::gather(self.ids(), &top.indices)?;
        Ok(TopKResult {
            scores: top.values,
            ids,
        })
    }

    /// Turns positive scores into a ranking-metric input.
    ///
    /// Column 0 of `predictions` is the score of each row's positive item.
    /// The top-k candidates of the query embeddings stored in `context`
    /// become the negatives. The output predictions are
    /// `[positive | top-k scores]`, the targets are one-hot in column 0 and
    /// every row has one relevant item. `label_relevant_counts` is a
    /// `[batch, 1]` column of ones, the same column layout
    /// [`crate::ranking::extract_topk`] produces.
    ///
    /// # Errors
    ///
    /// Fails if `predictions` is not 2D with at least one column, if the
    /// context has no query embeddings, or if the query and prediction
    /// batch sizes differ.
    pub fn evaluation_view(
        &self,
        predictions: &Tensor,
        context: &BlockContext,
    ) -> LayerResult<PredictionOutput> {
        let positives = predictions.column(0)?;
        let queries = context.query()?;
        let top = self.score(queries, Some(self.k))?;

        let batch = positives.shape()[0];
        if top.scores.shape()[0] != batch {
            return Err(LayerError::ShapeMismatch {
                expected: vec![batch, top.scores.shape()[1]],
                actual: top.scores.shape().to_vec(),
            });
        }

        let predictions = Tensor::concat(&[&positives, &top.scores], 1)?;
        let width = predictions.shape()[1];
        let targets = ops::one_hot(&vec![0; batch], width)?;
        Ok(PredictionOutput::new(predictions, targets)?
            .with_label_relevant_counts(Tensor::ones(&[batch, 1])))
    }

    /// Output shapes of [`Self::score`] for a batch of queries.
    pub fn output_shape(&self, batch_size: usize) -> ([usize; 2], [usize; 2]) {
        ([batch_size, self.k], [batch_size, self.k])
    }
}

impl CandidateIndex for TopKIndexBlock {
    fn values(&self) -> &Tensor {
        self.index.values()
    }

    fn ids(&self) -> &Array1<i64> {
        self.index.ids()
    }

    fn update(&mut self, values: Tensor, ids: Option<Vec<i64>>) -> LayerResult<()> {
        self.index.update(values, ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::QUERY_CONTEXT_KEY;
    use merlin_data::Column;
    use ndarray::array;
    use std::collections::HashSet;

    fn identity_index(k: usize) -> TopKIndexBlock {
        let values = Tensor::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        TopKIndexBlock::new(k, values, Some(vec![10, 20])).unwrap()
    }

    fn keyed_frame(ids: Vec<i64>) -> DataFrame {
        let n = ids.len();
        let mut frame = DataFrame::new()
            .with_column("item_id", Column::Int64(ids))
            .unwrap()
            .with_column("0", Column::Float32((0..n).map(|i| i as f32).collect()))
            .unwrap()
            .with_column("1", Column::Float32(vec![1.0; n]))
            .unwrap();
        frame.set_index("item_id").unwrap();
        frame
    }

    #[test]
    fn test_single_best_candidate() {
        let index = identity_index(1);
        let queries = Tensor::from_rows(&[vec![1.0, 0.0]]).unwrap();
        let top = index.score(&queries, None).unwrap();
        assert_eq!(top.scores.to_rows().unwrap(), vec![vec![1.0]]);
        assert_eq!(top.ids, array![[10]]);
    }

    #[test]
    fn test_all_candidates_sorted() {
        let index = identity_index(1);
        let queries = Tensor::from_rows(&[vec![1.0, 0.0]]).unwrap();
        let top = index.score(&queries, Some(2)).unwrap();
        assert_eq!(top.scores.to_vec(), vec![1.0, 0.0]);
        assert_eq!(top.ids, array![[10, 20]]);
    }

    #[test]
    fn test_score_shapes_order_and_ids() {
        let values = Tensor::from_rows(&[
            vec![0.1, 0.3],
            vec![0.9, -0.2],
            vec![0.4, 0.4],
            vec![-1.0, 0.5],
            vec![0.0, 0.0],
        ])
        .unwrap();
        let ids = vec![101, 202, 303, 404, 505];
        let index = TopKIndexBlock::new(3, values, Some(ids.clone())).unwrap();

        let queries = Tensor::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, -1.0]]).unwrap();
        let top = index.score(&queries, None).unwrap();
        assert_eq!(top.scores.shape(), &[3, 3]);
        assert_eq!(top.ids.dim(), (3, 3));

        for row in top.scores.to_rows().unwrap() {
            assert!(row.windows(2).all(|w| w[0] >= w[1]));
        }
        let known: HashSet<i64> = ids.into_iter().collect();
        assert!(top.ids.iter().all(|id| known.contains(id)));
        assert_eq!(top.ids.row(0).to_vec(), vec![202, 303, 101]);
    }

    #[test]
    fn test_k_is_truncated_to_candidates() {
        let index = identity_index(20);
        let queries = Tensor::from_rows(&[vec![0.5, 0.5], vec![0.0, 2.0]]).unwrap();
        let top = index.score(&queries, None).unwrap();
        assert_eq!(top.scores.shape(), &[2, 2]);
        // Equal scores keep ascending row order.
        assert_eq!(top.ids, array![[10, 20], [20, 10]]);
    }

    #[test]
    fn test_query_width_mismatch_is_tensor_error() {
        let index = identity_index(1);
        let queries = Tensor::zeros(&[1, 3]);
        assert!(matches!(
            index.score(&queries, None),
            Err(LayerError::Tensor(_))
        ));
    }

    #[test]
    fn test_zero_k_is_config_error() {
        let values = Tensor::zeros(&[2, 2]);
        assert!(matches!(
            TopKIndexBlock::new(0, values, None),
            Err(LayerError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_from_dataset_uses_index_as_ids() {
        let dataset = Dataset::new(keyed_frame(vec![7, 3, 9])).repartition(2).unwrap();
        let index = IndexBlock::from_dataset(&dataset, true).unwrap();
        assert_eq!(index.ids().to_vec(), vec![7, 3, 9]);
        assert_eq!(index.ids().len(), index.num_candidates());
        assert_eq!(index.values().shape(), &[3, 2]);
        assert_eq!(index.lookup(&[2]).unwrap().to_vec(), vec![2.0, 1.0]);
    }

    #[test]
    fn test_from_dataset_rejects_duplicate_ids() {
        let dataset = Dataset::new(keyed_frame(vec![1, 2, 1]));
        let err = IndexBlock::from_dataset(&dataset, true).unwrap_err();
        assert!(matches!(err, LayerError::ValidationError { .. }));
        assert!(err.to_string().contains("unique indices"));

        let unchecked = IndexBlock::from_dataset(&dataset, false).unwrap();
        assert_eq!(unchecked.ids().to_vec(), vec![1, 2, 1]);
    }

    #[test]
    fn test_from_dataset_without_index_uses_positions() {
        let frame = DataFrame::new()
            .with_column("0", Column::Float32(vec![0.5, 0.25]))
            .unwrap();
        let index = IndexBlock::from_dataset(&Dataset::new(frame), true).unwrap();
        assert_eq!(index.ids().to_vec(), vec![0, 1]);
    }

    #[test]
    fn test_empty_dataset_is_data_error() {
        let frame = DataFrame::new().with_column("0", Column::Float32(vec![])).unwrap();
        assert!(matches!(
            IndexBlock::from_dataset(&Dataset::new(frame), true),
            Err(LayerError::Data(_))
        ));
    }

    #[test]
    fn test_update_validates_before_replacing() {
        let mut index = identity_index(1);

        for shape in [&[4][..], &[2, 2, 2][..]] {
            let err = index.update(Tensor::zeros(shape), None).unwrap_err();
            assert!(matches!(err, LayerError::ValidationError { .. }));
        }
        let err = index.update(Tensor::zeros(&[3, 2]), Some(vec![1, 2])).unwrap_err();
        assert!(matches!(err, LayerError::ValidationError { .. }));
        assert_eq!(index.ids().to_vec(), vec![10, 20]);
        assert_eq!(index.num_candidates(), 2);

        index.update(Tensor::ones(&[3, 2]), None).unwrap();
        assert_eq!(index.ids().to_vec(), vec![0, 1, 2]);
        assert_eq!(index.values().shape(), &[3, 2]);
    }

    #[test]
    fn test_lookup_out_of_range_is_tensor_error() {
        let index = identity_index(1);
        assert_eq!(index.lookup(&[1, 0]).unwrap().to_vec(), vec![0.0, 1.0, 1.0, 0.0]);
        assert!(matches!(index.lookup(&[2]), Err(LayerError::Tensor(_))));
    }

    #[test]
    fn test_block_forward_looks_up_positions() {
        let index = identity_index(1).index().clone();
        let rows = Tensor::from_slice(&[1.0], &[1]).unwrap();
        assert_eq!(index.forward(&rows).unwrap().to_vec(), vec![0.0, 1.0]);
        assert!(index.forward(&Tensor::from_slice(&[-1.0], &[1]).unwrap()).is_err());
    }

    #[test]
    fn test_to_dataset_copies_table() {
        let index = identity_index(1);
        let frame = index.to_dataset().unwrap().to_frame().unwrap();
        assert_eq!(frame.column_names(), vec!["0", "1"]);
        assert_eq!(frame.index_values(), vec![0, 1]);
        assert_eq!(&frame.to_tensor().unwrap(), index.values());
    }

    #[test]
    fn test_evaluation_view() {
        let index = identity_index(2);
        let context = BlockContext::new().with(
            QUERY_CONTEXT_KEY,
            Tensor::from_rows(&[vec![1.0, 0.0], vec![0.2, 0.8]]).unwrap(),
        );
        let predictions = Tensor::from_rows(&[vec![0.7, -0.1, 0.3], vec![0.4, 0.0, 0.0]]).unwrap();

        let output = index.evaluation_view(&predictions, &context).unwrap();
        assert_eq!(
            output.predictions.to_rows().unwrap(),
            vec![vec![0.7, 1.0, 0.0], vec![0.4, 0.8, 0.2]]
        );
        assert_eq!(
            output.targets.to_rows().unwrap(),
            vec![vec![1.0, 0.0, 0.0], vec![1.0, 0.0, 0.0]]
        );
        let counts = output.label_relevant_counts.unwrap();
        assert_eq!(counts.shape(), &[2, 1]);
        assert_eq!(counts.to_vec(), vec![1.0, 1.0]);
    }

    #[test]
    fn test_evaluation_view_requires_query_and_positive_column() {
        let index = identity_index(1);
        let predictions = Tensor::ones(&[1, 1]);
        assert!(matches!(
            index.evaluation_view(&predictions, &BlockContext::new()),
            Err(LayerError::MissingContext(_))
        ));

        let context = BlockContext::new().with(QUERY_CONTEXT_KEY, Tensor::ones(&[1, 2]));
        assert!(index.evaluation_view(&Tensor::zeros(&[1, 0]), &context).is_err());
        assert!(index.evaluation_view(&Tensor::ones(&[2, 1]), &context).is_err());
    }

    #[test]
    fn test_output_shape() {
        assert_eq!(identity_index(5).output_shape(8), ([8, 5], [8, 5]));
    }

    #[test]
    fn test_index_config_defaults() {
        let config = IndexConfig::from_json_str(r#"{"id_column": "item_id"}"#).unwrap();
        assert_eq!(config.k, DEFAULT_K);
        assert!(config.check_unique_ids);
        assert_eq!(config.id_column.as_deref(), Some("item_id"));
        assert_eq!(IndexConfig::default().k, 20);
        assert!(IndexConfig::from_json_str("{\"k\": \"ten\"}").is_err());
    }
}
