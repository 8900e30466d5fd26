//! Synthetic Command Implementation

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use merlin_data::{Schema, SyntheticData};

/// Generate a synthetic dataset from a schema
///
/// Categorical columns draw ids below their cardinality and continuous
/// columns draw values in `[0, 1)`. The same seed always produces the same
/// rows.
///
/// # Example
///
/// ```bash
/// merlin synthetic --schema schema.json --rows 1000 --seed 7 --output data.parquet
/// ```
#[derive(Args, Debug, Clone)]
pub struct SyntheticCommand {
    /// JSON schema describing the columns to generate
    #[arg(long, short = 's', env = "MERLIN_SCHEMA")]
    pub schema: PathBuf,

    /// Number of rows
    #[arg(long, short = 'n', default_value = "1000")]
    pub rows: usize,

    /// Random seed
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// Number of output partitions; more than one writes a directory of files
    #[arg(long, default_value = "1")]
    pub partitions: usize,

    /// Output Parquet file, or directory when writing several partitions
    #[arg(long, short = 'o')]
    pub output: PathBuf,
}

impl SyntheticCommand {
    /// Execute the synthetic command
    pub fn run(&self) -> Result<()> {
        let schema = Schema::from_json_file(&self.schema)
            .with_context(|| format!("Failed to load schema {}", self.schema.display()))?;
        info!(
            columns = schema.len(),
            rows = self.rows,
            seed = self.seed,
            "Generating synthetic data"
        );

        let data = SyntheticData::generate(&schema, self.rows, self.seed)?;
        if self.partitions > 1 {
            let written = data
                .into_dataset()
                .repartition(self.partitions)?
                .write_parquet(&self.output)
                .with_context(|| format!("Failed to write {}", self.output.display()))?;
            info!(files = written.len(), output = %self.output.display(), "Wrote synthetic dataset");
        } else {
            merlin_data::write_parquet(data.frame(), &self.output)
                .with_context(|| format!("Failed to write {}", self.output.display()))?;
            info!(output = %self.output.display(), "Wrote synthetic dataset");
        }
        Ok(())
    }
}
