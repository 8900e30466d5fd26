//! Activation functions.

use serde::{Deserialize, Serialize};

use merlin_tensor::{ops, Tensor};

use crate::block::Block;
use crate::error::LayerResult;

/// Activation function types supported by dense layers and MLPs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationType {
    /// Rectified Linear Unit
    #[default]
    ReLU,
    /// Sigmoid function
    Sigmoid,
    /// Hyperbolic tangent
    Tanh,
    /// Gaussian Error Linear Unit
    GELU,
    /// No activation (identity)
    None,
}

impl ActivationType {
    /// Applies the activation element-wise.
    pub fn apply(&self, input: &Tensor) -> Tensor {
        match self {
            Self::ReLU => ops::relu(input),
            Self::Sigmoid => ops::sigmoid(input),
            Self::Tanh => ops::tanh(input),
            Self::GELU => ops::gelu(input),
            Self::None => input.clone(),
        }
    }
}

impl Block for ActivationType {
    fn forward(&self, input: &Tensor) -> LayerResult<Tensor> {
        Ok(self.apply(input))
    }

    fn name(&self) -> &str {
        match self {
            Self::ReLU => "ReLU",
            Self::Sigmoid => "Sigmoid",
            Self::Tanh => "Tanh",
            Self::GELU => "GELU",
            Self::None => "Identity",
        }
    }
}
