// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The layer sum type and its serialisable description.
//!
//! Every variant shares one contract:
//! - `forward(x)` caches `x` (replacing any previous input) and returns `y`.
//! - `backward(dy)` uses the cached input, accumulates parameter gradients
//!   and returns `dL/dx`.
//! - `update(params)` applies SGD with momentum and decay; parameter-free
//!   variants ignore it.

use crate::{
    Activation, ActivationLayer, ConnectedLayer, ConvolutionalLayer, LayerError, MaxPoolLayer,
    UpdateParams,
};
use rand::Rng;
use tensor_core::Tensor;

/// One stage of a linear pipeline.
#[derive(Debug, Clone)]
pub enum Layer {
    Activation(ActivationLayer),
    Connected(ConnectedLayer),
    Convolutional(ConvolutionalLayer),
    MaxPool(MaxPoolLayer),
}

impl Layer {
    pub fn activation(activation: Activation) -> Self {
        Self::Activation(ActivationLayer::new(activation))
    }

    pub fn connected<R: Rng + ?Sized>(
        inputs: usize,
        outputs: usize,
        rng: &mut R,
    ) -> Result<Self, LayerError> {
        ConnectedLayer::new(inputs, outputs, rng).map(Self::Connected)
    }

    pub fn convolutional<R: Rng + ?Sized>(
        filters: usize,
        channels: usize,
        size: usize,
        stride: usize,
        padding: usize,
        rng: &mut R,
    ) -> Result<Self, LayerError> {
        ConvolutionalLayer::new(filters, channels, size, stride, padding, rng)
            .map(Self::Convolutional)
    }

    pub fn maxpool(size: usize, stride: usize) -> Result<Self, LayerError> {
        MaxPoolLayer::new(size, stride).map(Self::MaxPool)
    }

    /// Short variant name, matching the `kind` tag of [`LayerSpec`].
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Activation(_) => "activation",
            Self::Connected(_) => "connected",
            Self::Convolutional(_) => "convolutional",
            Self::MaxPool(_) => "maxpool",
        }
    }

    /// Number of trainable scalars (0 for activation and pooling).
    pub fn num_parameters(&self) -> usize {
        match self {
            Self::Connected(l) => l.num_parameters(),
            Self::Convolutional(l) => l.num_parameters(),
            Self::Activation(_) | Self::MaxPool(_) => 0,
        }
    }

    /// Returns a concise, one-line description.
    pub fn summary(&self) -> String {
        match self {
            Self::Activation(l) => format!("activation ({})", l.activation()),
            Self::Connected(l) => format!(
                "connected {} -> {} ({} params)",
                l.inputs(),
                l.outputs(),
                l.num_parameters()
            ),
            Self::Convolutional(l) => format!(
                "convolutional {} filters {}x{}x{}, stride {}, padding {} ({} params)",
                l.filters(),
                l.size(),
                l.size(),
                l.channels(),
                l.stride(),
                l.padding(),
                l.num_parameters()
            ),
            Self::MaxPool(l) => format!("maxpool {}x{}, stride {}", l.size(), l.size(), l.stride()),
        }
    }

    pub fn forward(&mut self, x: &Tensor) -> Result<Tensor, LayerError> {
        match self {
            Self::Activation(l) => l.forward(x),
            Self::Connected(l) => l.forward(x),
            Self::Convolutional(l) => l.forward(x),
            Self::MaxPool(l) => l.forward(x),
        }
    }

    pub fn backward(&mut self, dy: &Tensor) -> Result<Tensor, LayerError> {
        match self {
            Self::Activation(l) => l.backward(dy),
            Self::Connected(l) => l.backward(dy),
            Self::Convolutional(l) => l.backward(dy),
            Self::MaxPool(l) => l.backward(dy),
        }
    }

    pub fn update(&mut self, params: UpdateParams) -> Result<(), LayerError> {
        match self {
            Self::Connected(l) => l.update(params),
            Self::Convolutional(l) => l.update(params),
            Self::Activation(_) | Self::MaxPool(_) => Ok(()),
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary())
    }
}

impl From<ActivationLayer> for Layer {
    fn from(l: ActivationLayer) -> Self {
        Self::Activation(l)
    }
}

impl From<ConnectedLayer> for Layer {
    fn from(l: ConnectedLayer) -> Self {
        Self::Connected(l)
    }
}

impl From<ConvolutionalLayer> for Layer {
    fn from(l: ConvolutionalLayer) -> Self {
        Self::Convolutional(l)
    }
}

impl From<MaxPoolLayer> for Layer {
    fn from(l: MaxPoolLayer) -> Self {
        Self::MaxPool(l)
    }
}

fn default_stride() -> usize {
    1
}

/// Serialisable description of a [`Layer`], tagged by `kind`.
///
/// ```toml
/// kind = "convolutional"
/// filters = 8
/// channels = 3
/// size = 3
/// padding = 1
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerSpec {
    Activation {
        activation: Activation,
    },
    Connected {
        inputs: usize,
        outputs: usize,
    },
    Convolutional {
        filters: usize,
        channels: usize,
        size: usize,
        #[serde(default = "default_stride")]
        stride: usize,
        #[serde(default)]
        padding: usize,
    },
    #[serde(rename = "maxpool", alias = "max_pool")]
    MaxPool {
        size: usize,
        #[serde(default = "default_stride")]
        stride: usize,
    },
}

impl LayerSpec {
    /// Constructs the described layer, drawing initial weights from `rng`.
    ///
    /// # Errors
    /// Returns [`LayerError::InvalidConfig`] for zero-sized dimensions.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Layer, LayerError> {
        match *self {
            Self::Activation { activation } => Ok(Layer::activation(activation)),
            Self::Connected { inputs, outputs } => Layer::connected(inputs, outputs, rng),
            Self::Convolutional {
                filters,
                channels,
                size,
                stride,
                padding,
            } => Layer::convolutional(filters, channels, size, stride, padding, rng),
            Self::MaxPool { size, stride } => Layer::maxpool(size, stride),
        }
    }
}
