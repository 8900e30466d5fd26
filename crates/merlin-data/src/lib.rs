//! Tabular data for merlin-rs.
//!
//! This crate holds everything the model and index blocks consume or
//! produce outside of raw tensors:
//!
//! - [`schema`] - Column schemas and semantic [`Tag`]s
//! - [`frame`] - [`DataFrame`], typed columns and an optional integer index
//! - [`dataset`] - Partitioned [`Dataset`]s with parallel partition mapping
//! - [`parquet`] - Parquet persistence, one file per partition
//! - [`synthetic`] - Seeded random data derived from a schema
//!
//! # Example
//!
//! ```
//! use merlin_data::{Column, DataFrame, Dataset};
//!
//! let mut items = DataFrame::new()
//!     .with_column("item_id", Column::Int64(vec![101, 102, 103]))
//!     .unwrap()
//!     .with_column("0", Column::Float32(vec![0.5, 0.1, 0.9]))
//!     .unwrap();
//! items.set_index("item_id").unwrap();
//!
//! let dataset = Dataset::new(items);
//! let frame = dataset.to_frame().unwrap();
//! assert_eq!(frame.index_values(), vec![101, 102, 103]);
//! assert_eq!(frame.to_tensor().unwrap().shape(), &[3, 1]);
//! ```

#![warn(missing_docs)]

pub mod dataset;
pub mod error;
pub mod frame;
pub mod parquet;
pub mod schema;
pub mod synthetic;

pub use dataset::Dataset;
pub use error::{DataError, DataResult};
pub use frame::{Column, DataFrame, FrameIndex, TabularData};
pub use parquet::{read_parquet, write_parquet, INDEX_METADATA_KEY};
pub use schema::{ColumnSchema, ColumnType, Schema, Tag, ValueCount};
pub use synthetic::SyntheticData;
