//! Top-k Command Implementation
//!
//! Builds a [`TopKIndexBlock`] from a Parquet candidate table and scores a
//! Parquet table of query embeddings against it.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use merlin_data::{write_parquet, Column, DataFrame, Dataset};
use merlin_layers::{CandidateIndex, IndexConfig, TopKIndexBlock};

/// Column names of the written result table.
pub const OUTPUT_COLUMNS: [&str; 4] = ["query", "rank", "id", "score"];

/// Retrieve the top-k candidates for each query embedding
///
/// Every column of the candidate table other than the id column is an
/// embedding dimension. Every column of the query table is an embedding
/// dimension; queries are identified by the table's index, or by row
/// position when it has none. The result holds one `(query, rank, id, score)`
/// row per retrieved candidate.
///
/// # Example
///
/// ```bash
/// merlin topk \
///     --candidates 'items/*.parquet' \
///     --id-column item_id \
///     --queries queries.parquet \
///     --k 10 \
///     --output topk.parquet
/// ```
#[derive(Args, Debug, Clone)]
pub struct TopkCommand {
    /// Glob of Parquet files holding the candidate embeddings
    #[arg(long, env = "MERLIN_CANDIDATES")]
    pub candidates: String,

    /// Integer column identifying each candidate; the stored index is used when omitted
    #[arg(long)]
    pub id_column: Option<String>,

    /// Glob of Parquet files holding the query embeddings
    #[arg(long, env = "MERLIN_QUERIES")]
    pub queries: String,

    /// Number of candidates per query; overrides the config file
    #[arg(long, short = 'k')]
    pub k: Option<usize>,

    /// JSON index configuration
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Output Parquet file
    #[arg(long, short = 'o')]
    pub output: PathBuf,
}

impl TopkCommand {
    /// Resolves the index configuration from the config file and flags.
    pub fn index_config(&self) -> Result<IndexConfig> {
        let mut config = match &self.config {
            Some(path) => IndexConfig::from_json_file(path)
                .with_context(|| format!("Failed to load index config {}", path.display()))?,
            None => IndexConfig::default(),
        };
        if let Some(k) = self.k {
            config.k = k;
        }
        if self.id_column.is_some() {
            config.id_column = self.id_column.clone();
        }
        Ok(config)
    }

    /// Execute the top-k command
    pub fn run(&self) -> Result<()> {
        let config = self.index_config()?;
        info!(candidates = %self.candidates, queries = %self.queries, k = config.k, "Starting top-k retrieval");

        let index = self.load_index(&config)?;
        let queries = Dataset::read_parquet(&self.queries)
            .and_then(|dataset| dataset.to_frame())
            .with_context(|| format!("Failed to read queries {}", self.queries))?;
        let embeddings = queries.to_tensor().context("Query table has no embeddings")?;

        let top = index
            .score(&embeddings, None)
            .context("Failed to score queries against the candidates")?;

        let query_ids = queries.index_values();
        let k = top.ids.ncols();
        let scores = top.scores.to_vec();
        let mut frame_query = Vec::with_capacity(query_ids.len() * k);
        let mut frame_rank = Vec::with_capacity(query_ids.len() * k);
        for query in &query_ids {
            for rank in 0..k {
                frame_query.push(*query);
                frame_rank.push(rank as i64);
            }
        }

        let [query_col, rank_col, id_col, score_col] = OUTPUT_COLUMNS;
        let results = DataFrame::new()
            .with_column(query_col, Column::Int64(frame_query))?
            .with_column(rank_col, Column::Int64(frame_rank))?
            .with_column(id_col, Column::Int64(top.ids.iter().copied().collect()))?
            .with_column(score_col, Column::Float32(scores))?;
        write_parquet(&results, &self.output)
            .with_context(|| format!("Failed to write {}", self.output.display()))?;

        info!(
            queries = query_ids.len(),
            k,
            output = %self.output.display(),
            "Top-k retrieval complete"
        );
        Ok(())
    }

    fn load_index(&self, config: &IndexConfig) -> Result<TopKIndexBlock> {
        let dataset = Dataset::read_parquet(&self.candidates)
            .with_context(|| format!("Failed to read candidates {}", self.candidates))?;
        let mut frame = dataset.to_frame()?;
        if let Some(id_column) = &config.id_column {
            if frame.contains(id_column) {
                frame
                    .set_index(id_column)
                    .with_context(|| format!("Cannot use '{id_column}' as candidate id column"))?;
            } else if frame.index().and_then(|index| index.name.as_deref()) != Some(id_column.as_str()) {
                anyhow::bail!("Candidate table has no id column '{id_column}'");
            }
        }

        let index = TopKIndexBlock::from_dataset(&Dataset::new(frame), config.k, config.check_unique_ids)
            .context("Failed to build the candidate index")?;
        info!(
            candidates = index.num_candidates(),
            dim = index.dim(),
            "Loaded candidate index"
        );
        Ok(index)
    }
}
