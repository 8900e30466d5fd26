//! Tensors shared between blocks during one forward pass.

use std::collections::BTreeMap;

use merlin_tensor::Tensor;

use crate::error::{LayerError, LayerResult};

/// Context key under which a retrieval model stores its query embeddings.
pub const QUERY_CONTEXT_KEY: &str = "query";

/// Named tensors produced earlier in a forward pass.
///
/// A retrieval model writes the query embeddings of the batch here; the
/// evaluation view of a top-k index reads them back.
///
/// ```
/// use merlin_layers::context::{BlockContext, QUERY_CONTEXT_KEY};
/// use merlin_tensor::Tensor;
///
/// let mut context = BlockContext::new();
/// context.insert(QUERY_CONTEXT_KEY, Tensor::zeros(&[4, 8]));
/// assert_eq!(context.query().unwrap().shape(), &[4, 8]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BlockContext {
    tensors: BTreeMap<String, Tensor>,
}

impl BlockContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `tensor` under `name`, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor) {
        self.tensors.insert(name.into(), tensor);
    }

    /// Builder form of [`BlockContext::insert`].
    pub fn with(mut self, name: impl Into<String>, tensor: Tensor) -> Self {
        self.insert(name, tensor);
        self
    }

    /// Looks up a tensor.
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    /// Looks up a tensor, failing with [`LayerError::MissingContext`].
    pub fn require(&self, name: &str) -> LayerResult<&Tensor> {
        self.get(name)
            .ok_or_else(|| LayerError::MissingContext(name.to_string()))
    }

    /// The query embeddings stored under [`QUERY_CONTEXT_KEY`].
    pub fn query(&self) -> LayerResult<&Tensor> {
        self.require(QUERY_CONTEXT_KEY)
    }

    /// Whether a tensor named `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.tensors.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_query() {
        let context = BlockContext::new().with("item", Tensor::zeros(&[1, 2]));
        assert!(context.contains("item"));
        assert!(matches!(
            context.query(),
            Err(LayerError::MissingContext(key)) if key == QUERY_CONTEXT_KEY
        ));
    }

    #[test]
    fn test_insert_replaces() {
        let mut context = BlockContext::new();
        context.insert("query", Tensor::zeros(&[1, 2]));
        context.insert("query", Tensor::ones(&[3, 2]));
        assert_eq!(context.query().unwrap().shape(), &[3, 2]);
    }
}
