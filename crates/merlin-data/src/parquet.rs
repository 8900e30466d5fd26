//! Parquet persistence for frames and datasets.
//!
//! Each partition of a [`Dataset`] maps to one Parquet file. An explicit
//! frame index is stored as a regular column and its name is recorded in the
//! Arrow schema metadata under [`INDEX_METADATA_KEY`], so reading the file
//! back restores the index.
//!
//! # Example
//!
//! ```no_run
//! use merlin_data::Dataset;
//!
//! let items = Dataset::read_parquet("data/items/*.parquet").unwrap();
//! println!("{} partitions, {} rows", items.num_partitions(), items.num_rows());
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema};
use arrow::record_batch::RecordBatch;
use glob::glob;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use crate::dataset::Dataset;
use crate::error::{DataError, DataResult};
use crate::frame::{Column, DataFrame};

/// Arrow schema metadata key naming the index column.
pub const INDEX_METADATA_KEY: &str = "merlin.index";

/// Column name used for an index without a name.
pub const DEFAULT_INDEX_COLUMN: &str = "__index__";

const PART_FILE_PREFIX: &str = "part_";

/// Writes a frame to a single Parquet file.
pub fn write_parquet(frame: &DataFrame, path: impl AsRef<Path>) -> DataResult<()> {
    let path = path.as_ref();
    let mut fields = Vec::with_capacity(frame.num_columns() + 1);
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(frame.num_columns() + 1);
    let mut metadata = HashMap::new();

    if let Some(index) = frame.index() {
        let name = index
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_INDEX_COLUMN.to_string());
        fields.push(Field::new(name.as_str(), DataType::Int64, false));
        arrays.push(Arc::new(Int64Array::from(index.values.clone())));
        metadata.insert(INDEX_METADATA_KEY.to_string(), name);
    }

    for (name, column) in frame.columns() {
        match column {
            Column::Int64(values) => {
                fields.push(Field::new(name, DataType::Int64, false));
                arrays.push(Arc::new(Int64Array::from(values.clone())));
            }
            Column::Float32(values) => {
                fields.push(Field::new(name, DataType::Float32, false));
                arrays.push(Arc::new(Float32Array::from(values.clone())));
            }
        }
    }

    if arrays.is_empty() {
        return Err(DataError::Empty(format!(
            "refusing to write a frame without columns to {}",
            path.display()
        )));
    }

    let schema = Arc::new(ArrowSchema::new(fields).with_metadata(metadata));
    let batch = RecordBatch::try_new(schema.clone(), arrays)?;

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;

    tracing::info!(
        path = %path.display(),
        rows = frame.num_rows(),
        columns = frame.num_columns(),
        "Wrote parquet file"
    );
    Ok(())
}

/// Reads a single Parquet file into a frame.
///
/// Integer columns (`Int32`/`Int64`) become [`Column::Int64`], float columns
/// (`Float32`/`Float64`) become [`Column::Float32`]. Other types and nulls
/// are rejected.
pub fn read_parquet(path: impl AsRef<Path>) -> DataResult<DataFrame> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let index_column = schema.metadata().get(INDEX_METADATA_KEY).cloned();

    let mut columns = schema
        .fields()
        .iter()
        .map(|field| {
            let column = match field.data_type() {
                DataType::Int32 | DataType::Int64 => Column::Int64(Vec::new()),
                DataType::Float32 | DataType::Float64 => Column::Float32(Vec::new()),
                other => {
                    return Err(DataError::UnsupportedType {
                        column: field.name().clone(),
                        data_type: other.to_string(),
                    })
                }
            };
            Ok((field.name().clone(), column))
        })
        .collect::<DataResult<Vec<_>>>()?;

    for batch in builder.build()? {
        let batch = batch?;
        for (i, (name, column)) in columns.iter_mut().enumerate() {
            append_array(name, column, batch.column(i))?;
        }
    }

    let mut frame = DataFrame::new();
    for (name, column) in columns {
        frame.insert_column(name, column)?;
    }
    match index_column.as_deref() {
        Some(DEFAULT_INDEX_COLUMN) => {
            let values = match frame.remove_column(DEFAULT_INDEX_COLUMN)? {
                Column::Int64(values) => values,
                Column::Float32(_) => {
                    return Err(DataError::InvalidIndex(format!(
                        "index column '{DEFAULT_INDEX_COLUMN}' is not an integer column"
                    )))
                }
            };
            frame = frame.with_index(None, values)?;
        }
        Some(name) => frame.set_index(name)?,
        None => {}
    }

    tracing::debug!(path = %path.display(), rows = frame.num_rows(), "Read parquet file");
    Ok(frame)
}

fn downcast<'a, T: 'static>(name: &str, array: &'a ArrayRef) -> DataResult<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| DataError::UnsupportedType {
            column: name.to_string(),
            data_type: array.data_type().to_string(),
        })
}

fn append_array(name: &str, column: &mut Column, array: &ArrayRef) -> DataResult<()> {
    if array.null_count() > 0 {
        return Err(DataError::NullValues(name.to_string()));
    }
    match (column, array.data_type()) {
        (Column::Int64(values), DataType::Int64) => {
            values.extend_from_slice(downcast::<Int64Array>(name, array)?.values());
        }
        (Column::Int64(values), DataType::Int32) => {
            let ints = downcast::<Int32Array>(name, array)?;
            values.extend(ints.values().iter().map(|&v| i64::from(v)));
        }
        (Column::Float32(values), DataType::Float32) => {
            values.extend_from_slice(downcast::<Float32Array>(name, array)?.values());
        }
        (Column::Float32(values), DataType::Float64) => {
            let floats = downcast::<Float64Array>(name, array)?;
            values.extend(floats.values().iter().map(|&v| v as f32));
        }
        (_, other) => {
            return Err(DataError::UnsupportedType {
                column: name.to_string(),
                data_type: other.to_string(),
            })
        }
    }
    Ok(())
}

impl Dataset {
    /// Reads every file matching a glob pattern, one partition per file,
    /// in lexicographic path order.
    pub fn read_parquet(pattern: &str) -> DataResult<Self> {
        let mut paths = glob(pattern)?.collect::<Result<Vec<PathBuf>, _>>()?;
        if paths.is_empty() {
            return Err(DataError::NoFilesFound(pattern.to_string()));
        }
        paths.sort();

        let partitions = paths
            .iter()
            .map(read_parquet)
            .collect::<DataResult<Vec<_>>>()?;
        tracing::info!(pattern, files = paths.len(), "Loaded parquet dataset");
        Self::from_partitions(partitions)
    }

    /// Writes each partition to `dir/part_<nnnnn>.parquet`, creating `dir`
    /// if needed. Returns the written paths.
    ///
    /// Part numbers are zero-padded so lexicographic order is partition
    /// order. Part files left in `dir` by an earlier write are removed first.
    pub fn write_parquet(&self, dir: impl AsRef<Path>) -> DataResult<Vec<PathBuf>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        remove_part_files(dir)?;
        self.partitions()
            .iter()
            .enumerate()
            .map(|(i, partition)| {
                let path = dir.join(part_file_name(i));
                write_parquet(partition, &path)?;
                Ok(path)
            })
            .collect()
    }
}

fn part_file_name(partition: usize) -> String {
    format!("{PART_FILE_PREFIX}{partition:05}.parquet")
}

fn remove_part_files(dir: &Path) -> DataResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_part = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(PART_FILE_PREFIX) && name.ends_with(".parquet"));
        if is_part && path.is_file() {
            tracing::debug!(path = %path.display(), "Removing stale partition file");
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}
