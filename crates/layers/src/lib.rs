// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # layers
//!
//! Trainable building blocks with hand-derived gradients.
//!
//! Four variants share a forward / backward / update contract through the
//! [`Layer`] sum type:
//! - [`ActivationLayer`]: linear, logistic, ReLU, leaky ReLU, softmax.
//! - [`ConnectedLayer`]: `y = x·w + b`.
//! - [`ConvolutionalLayer`]: im2col convolution with per-filter bias.
//! - [`MaxPoolLayer`]: windowed maximum, gradient routed to the argmax.
//!
//! Each layer owns its parameters, their gradient accumulators and the input
//! of its most recent `forward`. [`UpdateParams`] carries the SGD
//! hyperparameters and [`LayerSpec`] describes a layer in configuration.

mod activation;
mod connected;
mod convolutional;
mod error;
mod layer;
mod maxpool;
mod update;

pub use activation::{Activation, ActivationLayer};
pub use connected::ConnectedLayer;
pub use convolutional::ConvolutionalLayer;
pub use error::LayerError;
pub use layer::{Layer, LayerSpec};
pub use maxpool::MaxPoolLayer;
pub use update::UpdateParams;
