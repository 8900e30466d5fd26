//! Multi-layer perceptron (MLP) implementation.
//!
//! An [`MLP`] is a stack of [`Dense`] layers, each followed by its own
//! activation. Towers and DLRM use it as their bottom and top networks.

use serde::{Deserialize, Serialize};

use merlin_tensor::Tensor;

use crate::activation::ActivationType;
use crate::block::Block;
use crate::dense::Dense;
use crate::error::{LayerError, LayerResult};
use crate::initializer::Initializer;

/// Configuration for building an MLP.
///
/// # Example
///
/// ```
/// use merlin_layers::activation::ActivationType;
/// use merlin_layers::mlp::MLPConfig;
///
/// let config = MLPConfig::new(128)
///     .add_layer(64, ActivationType::ReLU)
///     .add_layer(32, ActivationType::ReLU)
///     .add_layer(10, ActivationType::None);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MLPConfig {
    /// Input dimension
    pub input_dim: usize,
    /// Layer configurations: (output_dim, activation)
    pub layers: Vec<(usize, ActivationType)>,
    /// Whether to use bias in dense layers
    #[serde(default = "default_use_bias")]
    pub use_bias: bool,
    /// Seed for weight initialization; layer `i` uses `seed + i`
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_use_bias() -> bool {
    true
}

impl MLPConfig {
    /// Creates a new MLP configuration with the specified input dimension.
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            layers: Vec::new(),
            use_bias: true,
            seed: None,
        }
    }

    /// Adds a layer to the MLP configuration.
    ///
    /// # Arguments
    ///
    /// * `output_dim` - The output dimension of this layer
    /// * `activation` - The activation function to use after this layer
    pub fn add_layer(mut self, output_dim: usize, activation: ActivationType) -> Self {
        self.layers.push((output_dim, activation));
        self
    }

    /// Sets whether to use bias in dense layers.
    pub fn with_bias(mut self, use_bias: bool) -> Self {
        self.use_bias = use_bias;
        self
    }

    /// Makes weight initialization deterministic.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> LayerResult<()> {
        if self.input_dim == 0 {
            return Err(LayerError::ConfigError {
                message: "Input dimension must be positive".to_string(),
            });
        }
        if self.layers.is_empty() {
            return Err(LayerError::ConfigError {
                message: "MLP must have at least one layer".to_string(),
            });
        }
        if let Some(i) = self.layers.iter().position(|(dim, _)| *dim == 0) {
            return Err(LayerError::ConfigError {
                message: format!("Layer {i} has zero output dimension"),
            });
        }
        Ok(())
    }

    /// Builds the MLP from this configuration.
    pub fn build(self) -> LayerResult<MLP> {
        MLP::from_config(self)
    }
}

/// A multi-layer perceptron.
///
/// # Example
///
/// ```
/// use merlin_layers::activation::ActivationType;
/// use merlin_layers::block::Block;
/// use merlin_layers::mlp::MLPConfig;
/// use merlin_tensor::Tensor;
///
/// let mlp = MLPConfig::new(128)
///     .add_layer(64, ActivationType::ReLU)
///     .add_layer(10, ActivationType::None)
///     .build()
///     .unwrap();
///
/// let output = mlp.forward(&Tensor::zeros(&[32, 128])).unwrap();
/// assert_eq!(output.shape(), &[32, 10]);
/// ```
#[derive(Debug, Clone)]
pub struct MLP {
    layers: Vec<Dense>,
    config: MLPConfig,
}

impl MLP {
    /// Creates an MLP from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    pub fn from_config(config: MLPConfig) -> LayerResult<Self> {
        config.validate()?;

        let mut layers = Vec::with_capacity(config.layers.len());
        let mut prev_dim = config.input_dim;
        for (i, &(output_dim, activation)) in config.layers.iter().enumerate() {
            let dense = match config.seed {
                Some(seed) => {
                    let weights = Initializer::GlorotUniform
                        .initialize_seeded(&[prev_dim, output_dim], seed.wrapping_add(i as u64));
                    let bias = config.use_bias.then(|| Tensor::zeros(&[output_dim]));
                    Dense::from_weights(weights, bias)?
                }
                None if config.use_bias => Dense::new(prev_dim, output_dim),
                None => Dense::new_no_bias(prev_dim, output_dim),
            };
            layers.push(dense.with_activation(activation));
            prev_dim = output_dim;
        }

        tracing::debug!(
            input_dim = config.input_dim,
            layers = layers.len(),
            output_dim = prev_dim,
            "Built MLP"
        );
        Ok(Self { layers, config })
    }

    /// Creates an MLP whose layers all use `activation`.
    ///
    /// # Arguments
    ///
    /// * `input_dim` - Input feature dimension
    /// * `dims` - Output size of every layer, in order
    /// * `activation` - Activation applied after every layer
    pub fn from_dims(input_dim: usize, dims: &[usize], activation: ActivationType) -> LayerResult<Self> {
        dims.iter()
            .fold(MLPConfig::new(input_dim), |config, &dim| config.add_layer(dim, activation))
            .build()
    }

    /// Returns the number of layers in the MLP.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Returns the dense layers.
    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    /// Returns the configuration used to build this MLP.
    pub fn config(&self) -> &MLPConfig {
        &self.config
    }

    /// Returns the input dimension.
    pub fn input_dim(&self) -> usize {
        self.config.input_dim
    }

    /// Returns the output dimension.
    pub fn output_dim(&self) -> usize {
        self.config.layers.last().map(|(d, _)| *d).unwrap_or(0)
    }
}

impl Block for MLP {
    fn forward(&self, input: &Tensor) -> LayerResult<Tensor> {
        let mut x = self.layers[0].forward(input)?;
        for layer in &self.layers[1..] {
            x = layer.forward(&x)?;
        }
        Ok(x)
    }

    fn name(&self) -> &str {
        "MLP"
    }
}
