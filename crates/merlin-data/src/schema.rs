//! Column schemas and tags.
//!
//! A [`Schema`] is an ordered list of [`ColumnSchema`]s. Blocks use tags to
//! find the columns they operate on, e.g. the item-id column of an item
//! encoder or the categorical columns that need embedding tables.
//!
//! # Example
//!
//! ```
//! use merlin_data::schema::{ColumnSchema, Schema, Tag};
//!
//! let schema = Schema::new(vec![
//!     ColumnSchema::categorical("user_id", 1000).with_tag(Tag::UserId),
//!     ColumnSchema::categorical("item_id", 5000).with_tag(Tag::ItemId),
//!     ColumnSchema::continuous("price"),
//! ]);
//!
//! let ids = schema.select_by_tag(Tag::ItemId);
//! assert_eq!(ids.column_names(), vec!["item_id"]);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DataResult;

/// Semantic tags attached to columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
    /// Integer-encoded categorical feature.
    Categorical,
    /// Real-valued feature.
    Continuous,
    /// Variable-length list feature.
    List,
    /// Feature describing the item.
    Item,
    /// The item identifier.
    ItemId,
    /// Feature describing the user.
    User,
    /// The user identifier.
    UserId,
    /// Request context feature.
    Context,
    /// Training target.
    Target,
    /// Binary classification target.
    Binary,
    /// Regression target.
    Regression,
    /// Pre-computed embedding column.
    Embedding,
}

impl Tag {
    /// Returns the tag's serialized name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Categorical => "categorical",
            Tag::Continuous => "continuous",
            Tag::List => "list",
            Tag::Item => "item",
            Tag::ItemId => "item_id",
            Tag::User => "user",
            Tag::UserId => "user_id",
            Tag::Context => "context",
            Tag::Target => "target",
            Tag::Binary => "binary",
            Tag::Regression => "regression",
            Tag::Embedding => "embedding",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// 64-bit signed integers.
    #[default]
    Int64,
    /// 32-bit floats.
    Float32,
}

/// Bounds on the number of values of a list column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    /// Minimum list length.
    pub min: usize,
    /// Maximum list length.
    pub max: usize,
}

/// Schema of a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name.
    pub name: String,
    /// Semantic tags.
    #[serde(default)]
    pub tags: BTreeSet<Tag>,
    /// Physical type.
    #[serde(default)]
    pub dtype: ColumnType,
    /// Number of distinct values of a categorical column (ids are `0..cardinality`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<usize>,
    /// Whether the column holds lists.
    #[serde(default)]
    pub is_list: bool,
    /// List length bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_count: Option<ValueCount>,
    /// Fixed per-row shape, excluding the batch dimension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<usize>>,
}

impl ColumnSchema {
    /// Creates an untagged column.
    pub fn new(name: impl Into<String>, dtype: ColumnType) -> Self {
        Self {
            name: name.into(),
            tags: BTreeSet::new(),
            dtype,
            cardinality: None,
            is_list: false,
            value_count: None,
            shape: None,
        }
    }

    /// Creates an integer column tagged [`Tag::Categorical`].
    pub fn categorical(name: impl Into<String>, cardinality: usize) -> Self {
        let mut column = Self::new(name, ColumnType::Int64).with_tag(Tag::Categorical);
        column.cardinality = Some(cardinality);
        column
    }

    /// Creates a float column tagged [`Tag::Continuous`].
    pub fn continuous(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Float32).with_tag(Tag::Continuous)
    }

    /// Adds a tag.
    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.insert(tag);
        self
    }

    /// Adds several tags.
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// Marks the column as a list with the given length bounds.
    pub fn with_value_count(mut self, min: usize, max: usize) -> Self {
        self.is_list = true;
        self.value_count = Some(ValueCount { min, max });
        self.tags.insert(Tag::List);
        self
    }

    /// Sets a fixed per-row shape.
    pub fn with_shape(mut self, shape: Vec<usize>) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Returns whether the column carries `tag`.
    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }
}

/// An ordered collection of column schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<ColumnSchema>,
}

impl Schema {
    /// Creates a schema from columns. Later duplicates of a name are dropped.
    pub fn new(columns: Vec<ColumnSchema>) -> Self {
        let mut schema = Self::default();
        for column in columns {
            schema.push(column);
        }
        schema
    }

    /// Appends a column unless one with the same name exists.
    pub fn push(&mut self, column: ColumnSchema) {
        if self.get(&column.name).is_none() {
            self.columns.push(column);
        }
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterates over the columns in order.
    pub fn iter(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.columns.iter()
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Looks up a column by name.
    pub fn get(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The first column, if any.
    pub fn first(&self) -> Option<&ColumnSchema> {
        self.columns.first()
    }

    /// Columns carrying `tag`, in order.
    pub fn select_by_tag(&self, tag: Tag) -> Schema {
        Self {
            columns: self
                .columns
                .iter()
                .filter(|c| c.has_tag(tag))
                .cloned()
                .collect(),
        }
    }

    /// Columns with the given names, in schema order. Unknown names are ignored.
    pub fn select_by_name(&self, names: &[&str]) -> Schema {
        Self {
            columns: self
                .columns
                .iter()
                .filter(|c| names.contains(&c.name.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Columns not carrying `tag`.
    pub fn remove_by_tag(&self, tag: Tag) -> Schema {
        Self {
            columns: self
                .columns
                .iter()
                .filter(|c| !c.has_tag(tag))
                .cloned()
                .collect(),
        }
    }

    /// Concatenates two schemas, keeping the first occurrence of each name.
    pub fn merge(&self, other: &Schema) -> Schema {
        let mut merged = self.clone();
        for column in &other.columns {
            merged.push(column.clone());
        }
        merged
    }

    /// Expected tensor shape of every column for a batch of `batch_size` rows.
    ///
    /// List columns are `[batch, max_sequence_length]` (falling back to the
    /// column's maximum value count), columns with a fixed shape are
    /// `[batch, shape..]` and scalars are `[batch, 1]`.
    pub fn output_sizes(
        &self,
        batch_size: usize,
        max_sequence_length: Option<usize>,
    ) -> BTreeMap<String, Vec<usize>> {
        self.columns
            .iter()
            .map(|column| {
                let size = if column.is_list {
                    let len = max_sequence_length
                        .or(column.value_count.map(|vc| vc.max))
                        .unwrap_or(1);
                    vec![batch_size, len]
                } else if let Some(shape) = &column.shape {
                    std::iter::once(batch_size)
                        .chain(shape.iter().copied())
                        .collect()
                } else {
                    vec![batch_size, 1]
                };
                (column.name.clone(), size)
            })
            .collect()
    }

    /// Parses a schema from JSON.
    pub fn from_json_str(json: &str) -> DataResult<Self> {
        let parsed: Schema = serde_json::from_str(json)?;
        Ok(Self::new(parsed.columns))
    }

    /// Reads a schema from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> DataResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serializes the schema to pretty-printed JSON.
    pub fn to_json_string(&self) -> DataResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl std::ops::Add for Schema {
    type Output = Schema;

    fn add(self, other: Schema) -> Schema {
        self.merge(&other)
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a ColumnSchema;
    type IntoIter = std::slice::Iter<'a, ColumnSchema>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ecommerce_schema() -> Schema {
        Schema::new(vec![
            ColumnSchema::categorical("user_id", 100).with_tags([Tag::UserId, Tag::User]),
            ColumnSchema::categorical("item_id", 500).with_tags([Tag::ItemId, Tag::Item]),
            ColumnSchema::categorical("item_category", 20).with_tag(Tag::Item),
            ColumnSchema::continuous("item_price").with_tag(Tag::Item),
            ColumnSchema::new("click", ColumnType::Int64).with_tags([Tag::Target, Tag::Binary]),
        ])
    }

    #[test]
    fn test_select_by_tag_keeps_order() {
        let schema = ecommerce_schema();
        let item = schema.select_by_tag(Tag::Item);
        assert_eq!(
            item.column_names(),
            vec!["item_id", "item_category", "item_price"]
        );
        assert_eq!(
            schema.select_by_tag(Tag::ItemId).first().map(|c| c.name.as_str()),
            Some("item_id")
        );
        assert!(schema.select_by_tag(Tag::Context).is_empty());
    }

    #[test]
    fn test_merge_drops_duplicate_names() {
        let schema = ecommerce_schema();
        let query_item = schema.select_by_tag(Tag::UserId) + schema.select_by_tag(Tag::Item);
        assert_eq!(
            query_item.column_names(),
            vec!["user_id", "item_id", "item_category", "item_price"]
        );

        let again = query_item.merge(&schema.select_by_tag(Tag::ItemId));
        assert_eq!(again.len(), 4);
    }

    #[test]
    fn test_select_and_remove() {
        let schema = ecommerce_schema();
        let picked = schema.select_by_name(&["item_price", "user_id", "missing"]);
        assert_eq!(picked.column_names(), vec!["user_id", "item_price"]);

        let features = schema.remove_by_tag(Tag::Target);
        assert_eq!(features.len(), 4);
        assert!(features.get("click").is_none());
    }

    #[test]
    fn test_output_sizes() {
        let schema = Schema::new(vec![
            ColumnSchema::categorical("item_id", 10),
            ColumnSchema::categorical("history", 10).with_value_count(1, 20),
            ColumnSchema::new("image", ColumnType::Float32).with_shape(vec![4, 4]),
        ]);

        let sizes = schema.output_sizes(32, None);
        assert_eq!(sizes["item_id"], vec![32, 1]);
        assert_eq!(sizes["history"], vec![32, 20]);
        assert_eq!(sizes["image"], vec![32, 4, 4]);

        let sizes = schema.output_sizes(8, Some(5));
        assert_eq!(sizes["history"], vec![8, 5]);
    }

    #[test]
    fn test_json_roundtrip() {
        let schema = ecommerce_schema();
        let json = schema.to_json_string().unwrap();
        assert!(json.contains("\"item_id\""));
        let parsed = Schema::from_json_str(&json).unwrap();
        assert_eq!(parsed, schema);
    }

    #[test]
    fn test_json_defaults() {
        let json = r#"{"columns": [{"name": "price", "dtype": "float32", "tags": ["continuous"]}]}"#;
        let schema = Schema::from_json_str(json).unwrap();
        let price = schema.get("price").unwrap();
        assert!(price.has_tag(Tag::Continuous));
        assert_eq!(price.cardinality, None);
        assert!(!price.is_list);
    }
}
