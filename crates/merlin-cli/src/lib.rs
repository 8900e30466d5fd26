//! Merlin CLI Library
//!
//! This crate provides the command-line interface for merlin-rs:
//!
//! - **Topk**: Retrieve the top-k candidates of query embeddings stored in Parquet
//! - **Synthetic**: Generate a synthetic dataset from a schema
//!
//! # Example
//!
//! ```bash
//! # Score queries against a candidate table keyed by item_id
//! merlin topk --candidates 'items/*.parquet' --id-column item_id \
//!     --queries 'queries/*.parquet' --k 10 --output topk.parquet
//!
//! # Generate 1000 rows of synthetic data
//! merlin synthetic --schema schema.json --rows 1000 --output data.parquet
//! ```

pub mod commands;

use clap::{Parser, Subcommand};

pub use commands::{SyntheticCommand, TopkCommand};

/// Merlin - retrieval utilities for recommender models
#[derive(Parser, Debug)]
#[command(name = "merlin")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Retrieve the top-k candidates for each query embedding
    Topk(TopkCommand),

    /// Generate a synthetic dataset from a schema
    Synthetic(SyntheticCommand),
}

/// Result type alias for CLI operations
pub type CliResult<T> = anyhow::Result<T>;
