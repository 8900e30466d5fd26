//! Dense (fully connected) layer implementation.
//!
//! This module provides the [`Dense`] layer, which performs the transformation
//! `y = act(xW + b)` where W is the weight matrix and b is the bias vector.

use merlin_tensor::Tensor;

use crate::activation::ActivationType;
use crate::block::Block;
use crate::error::{LayerError, LayerResult};
use crate::initializer::Initializer;

/// A dense (fully connected) layer.
///
/// Performs the transformation `y = act(xW + b)` where:
/// - `x` is the input tensor of shape `[batch_size, in_features]`
/// - `W` is the weight matrix of shape `[in_features, out_features]`
/// - `b` is the bias vector of shape `[out_features]`
/// - `y` is the output tensor of shape `[batch_size, out_features]`
///
/// # Example
///
/// ```
/// use merlin_layers::activation::ActivationType;
/// use merlin_layers::block::Block;
/// use merlin_layers::dense::Dense;
/// use merlin_tensor::Tensor;
///
/// let layer = Dense::new(128, 64).with_activation(ActivationType::ReLU);
/// let output = layer.forward(&Tensor::zeros(&[32, 128])).unwrap();
/// assert_eq!(output.shape(), &[32, 64]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Dense {
    /// Weight matrix of shape [in_features, out_features]
    weights: Tensor,
    /// Bias vector of shape [out_features]
    bias: Option<Tensor>,
    /// Activation applied to the affine output
    activation: ActivationType,
    in_features: usize,
    out_features: usize,
}

impl Dense {
    /// Creates a dense layer with Glorot uniform weights and zero bias.
    pub fn new(in_features: usize, out_features: usize) -> Self {
        Self::new_with_initializer(
            in_features,
            out_features,
            Initializer::GlorotUniform,
            Initializer::Zeros,
            true,
        )
    }

    /// Creates a dense layer without bias.
    pub fn new_no_bias(in_features: usize, out_features: usize) -> Self {
        Self::new_with_initializer(
            in_features,
            out_features,
            Initializer::GlorotUniform,
            Initializer::Zeros,
            false,
        )
    }

    /// Creates a dense layer with custom initializers.
    ///
    /// # Arguments
    ///
    /// * `in_features` - Number of input features
    /// * `out_features` - Number of output features
    /// * `weight_init` - Initializer for the weight matrix
    /// * `bias_init` - Initializer for the bias vector
    /// * `use_bias` - Whether to use bias
    pub fn new_with_initializer(
        in_features: usize,
        out_features: usize,
        weight_init: Initializer,
        bias_init: Initializer,
        use_bias: bool,
    ) -> Self {
        Self {
            weights: weight_init.initialize(&[in_features, out_features]),
            bias: use_bias.then(|| bias_init.initialize(&[out_features])),
            activation: ActivationType::None,
            in_features,
            out_features,
        }
    }

    /// Creates a dense layer from explicit weights.
    ///
    /// # Errors
    ///
    /// Fails if `weights` is not 2D or `bias` does not have
    /// `weights.shape()[1]` entries.
    pub fn from_weights(weights: Tensor, bias: Option<Tensor>) -> LayerResult<Self> {
        let (in_features, out_features) = {
            let matrix = weights.as_matrix()?;
            (matrix.nrows(), matrix.ncols())
        };
        if let Some(bias) = &bias {
            if bias.shape() != &[out_features] {
                return Err(LayerError::ShapeMismatch {
                    expected: vec![out_features],
                    actual: bias.shape().to_vec(),
                });
            }
        }
        Ok(Self {
            weights,
            bias,
            activation: ActivationType::None,
            in_features,
            out_features,
        })
    }

    /// Sets the activation applied after the affine transform.
    pub fn with_activation(mut self, activation: ActivationType) -> Self {
        self.activation = activation;
        self
    }

    /// Number of input features.
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    /// Number of output features.
    pub fn out_features(&self) -> usize {
        self.out_features
    }

    /// The weight matrix.
    pub fn weights(&self) -> &Tensor {
        &self.weights
    }

    /// The bias vector, if the layer has one.
    pub fn bias(&self) -> Option<&Tensor> {
        self.bias.as_ref()
    }

    /// The activation.
    pub fn activation(&self) -> ActivationType {
        self.activation
    }
}

impl Block for Dense {
    fn forward(&self, input: &Tensor) -> LayerResult<Tensor> {
        if input.ndim() != 2 {
            return Err(LayerError::ShapeMismatch {
                expected: vec![0, self.in_features],
                actual: input.shape().to_vec(),
            });
        }
        if input.shape()[1] != self.in_features {
            return Err(LayerError::InvalidInputDimension {
                expected: self.in_features,
                actual: input.shape()[1],
            });
        }
        let mut output = input.matmul(&self.weights)?;
        if let Some(bias) = &self.bias {
            output = output.add(bias)?;
        }
        Ok(self.activation.apply(&output))
    }

    fn name(&self) -> &str {
        "Dense"
    }
}
