//! Weight initialization.

use ndarray::ArrayD;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use merlin_tensor::Tensor;

/// How a weight tensor is filled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Initializer {
    /// Glorot/Xavier uniform initialization.
    #[default]
    GlorotUniform,
    /// All zeros.
    Zeros,
    /// All ones.
    Ones,
    /// Constant value.
    Constant(f32),
    /// Uniform in `[min, max)`.
    RandomUniform {
        /// Lower bound.
        min: f32,
        /// Upper bound.
        max: f32,
    },
    /// Normal distribution with samples beyond two standard deviations
    /// redrawn.
    TruncatedNormal {
        /// Mean.
        mean: f32,
        /// Standard deviation.
        stddev: f32,
    },
}

impl Initializer {
    /// Embedding tables default to a truncated normal with stddev 0.05.
    pub const EMBEDDING_DEFAULT: Initializer = Initializer::TruncatedNormal {
        mean: 0.0,
        stddev: 0.05,
    };

    /// Fills a tensor of `shape` using an entropy-seeded generator.
    pub fn initialize(&self, shape: &[usize]) -> Tensor {
        self.initialize_with(shape, &mut StdRng::from_entropy())
    }

    /// Fills a tensor of `shape` deterministically from `seed`.
    ///
    /// ```
    /// use merlin_layers::initializer::Initializer;
    ///
    /// let a = Initializer::GlorotUniform.initialize_seeded(&[4, 3], 7);
    /// let b = Initializer::GlorotUniform.initialize_seeded(&[4, 3], 7);
    /// assert_eq!(a, b);
    /// ```
    pub fn initialize_seeded(&self, shape: &[usize], seed: u64) -> Tensor {
        self.initialize_with(shape, &mut StdRng::seed_from_u64(seed))
    }

    /// Fills a tensor of `shape` drawing from `rng`.
    pub fn initialize_with<R: Rng + ?Sized>(&self, shape: &[usize], rng: &mut R) -> Tensor {
        let values = match *self {
            Initializer::Zeros => return Tensor::zeros(shape),
            Initializer::Ones => return Tensor::ones(shape),
            Initializer::Constant(value) => return Tensor::full(shape, value),
            Initializer::GlorotUniform => {
                let (fan_in, fan_out) = fan_in_out(shape);
                let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
                ArrayD::from_shape_simple_fn(shape, || uniform(rng, -limit, limit))
            }
            Initializer::RandomUniform { min, max } => {
                ArrayD::from_shape_simple_fn(shape, || uniform(rng, min, max))
            }
            Initializer::TruncatedNormal { mean, stddev } => {
                ArrayD::from_shape_simple_fn(shape, || truncated_normal(rng) * stddev + mean)
            }
        };
        Tensor::from_ndarray(values)
    }
}

fn fan_in_out(shape: &[usize]) -> (usize, usize) {
    match shape {
        [] => (1, 1),
        [dim] => ((*dim).max(1), (*dim).max(1)),
        [fan_in, fan_out, ..] => ((*fan_in).max(1), (*fan_out).max(1)),
    }
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    min + (max - min) * rng.gen::<f32>()
}

fn truncated_normal<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    loop {
        let z: f32 = rng.sample(StandardNormal);
        if z.abs() <= 2.0 {
            return z;
        }
    }
}
