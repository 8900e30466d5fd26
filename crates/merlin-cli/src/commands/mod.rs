//! CLI Command Implementations
//!
//! - [`topk`]: Top-k retrieval over Parquet candidate and query tables
//! - [`synthetic`]: Synthetic data generation

mod synthetic;
mod topk;

pub use synthetic::SyntheticCommand;
pub use topk::{TopkCommand, OUTPUT_COLUMNS};
