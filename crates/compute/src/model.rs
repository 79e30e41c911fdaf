//! Reconstruction model seam.
//!
//! The scorer only needs a fixed-width `vector -> vector` transform. Any
//! model-serving client can implement [`Reconstructor`]; [`DenseAutoencoder`]
//! is a plain feed-forward network evaluated in-process from exported weights.

use std::path::Path;

use sentinel_core::ModelError;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Trait for reconstruction models.
///
/// Implementations must be stateless from the caller's perspective: the
/// scorer calls `reconstruct` from many threads at once.
pub trait Reconstructor: Send + Sync {
    /// Width of the vectors this model accepts and returns.
    fn input_dim(&self) -> usize;

    /// Reconstruct one feature vector. The result has `input_dim()` entries.
    fn reconstruct(&self, input: &[f64]) -> Result<Vec<f64>, ModelError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
        }
    }
}

/// One fully connected layer. `weights` is laid out `[input][output]`,
/// the same as a Keras `Dense` kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    fn input_dim(&self) -> usize {
        self.weights.len()
    }

    fn output_dim(&self) -> usize {
        self.bias.len()
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        let mut out = self.bias.clone();
        for (x, row) in input.iter().zip(&self.weights) {
            for (o, w) in out.iter_mut().zip(row) {
                *o += x * w;
            }
        }
        for o in &mut out {
            *o = self.activation.apply(*o);
        }
        out
    }
}

/// Feed-forward autoencoder loaded from a JSON weights file:
///
/// ```json
/// { "layers": [ { "weights": [[..], ..], "bias": [..], "activation": "relu" }, .. ] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseAutoencoder {
    layers: Vec<DenseLayer>,
}

impl DenseAutoencoder {
    /// Build from layers, checking that shapes chain and the network maps
    /// a vector back to its own width.
    pub fn new(layers: Vec<DenseLayer>) -> Result<Self, ModelError> {
        let Some(first) = layers.first() else {
            return Err(ModelError::Invalid("model has no layers".into()));
        };
        let input_dim = first.input_dim();
        if input_dim == 0 {
            return Err(ModelError::Invalid("input layer has zero width".into()));
        }

        let mut width = input_dim;
        for (i, layer) in layers.iter().enumerate() {
            if layer.input_dim() != width {
                return Err(ModelError::Invalid(format!(
                    "layer {i} expects {} inputs, previous layer produces {width}",
                    layer.input_dim()
                )));
            }
            if let Some(row) = layer.weights.iter().find(|r| r.len() != layer.output_dim()) {
                return Err(ModelError::Invalid(format!(
                    "layer {i} has a weight row of width {}, bias has {}",
                    row.len(),
                    layer.output_dim()
                )));
            }
            width = layer.output_dim();
        }

        if width != input_dim {
            return Err(ModelError::OutputWidth {
                expected: input_dim,
                found: width,
            });
        }

        Ok(Self { layers })
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        #[derive(Deserialize)]
        struct Raw {
            layers: Vec<DenseLayer>,
        }
        let raw: Raw = serde_json::from_str(json).map_err(|e| ModelError::Load(e.to_string()))?;
        Self::new(raw.layers)
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ModelError::Load(format!("{}: {e}", path.display())))?;
        let model = Self::from_json(&json)?;
        info!(
            "Loaded autoencoder from {} ({} layers, width {})",
            path.display(),
            model.layers.len(),
            model.input_dim()
        );
        Ok(model)
    }
}

impl Reconstructor for DenseAutoencoder {
    fn input_dim(&self) -> usize {
        self.layers.first().map(DenseLayer::input_dim).unwrap_or(0)
    }

    fn reconstruct(&self, input: &[f64]) -> Result<Vec<f64>, ModelError> {
        if input.len() != self.input_dim() {
            return Err(ModelError::Invalid(format!(
                "input has width {}, model expects {}",
                input.len(),
                self.input_dim()
            )));
        }
        Ok(self
            .layers
            .iter()
            .fold(input.to_vec(), |x, layer| layer.forward(&x)))
    }
}
