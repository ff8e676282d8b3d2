// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! A linear pipeline of layers.
//!
//! ```text
//! forward:   x ──▶ layer 0 ──▶ layer 1 ──▶ … ──▶ y
//! backward:  dx ◀── layer 0 ◀── layer 1 ◀── … ◀── dy
//! update:    every layer, in any order
//! ```
//!
//! The network owns no loss: the caller turns `y` into `dL/dy`.

use crate::NetworkError;
use layers::{Layer, UpdateParams};
use tensor_core::Tensor;

/// An ordered, non-empty sequence of layers.
#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<Layer>,
}

impl Network {
    /// # Errors
    /// Returns [`NetworkError::Empty`] if `layers` is empty.
    pub fn new(layers: Vec<Layer>) -> Result<Self, NetworkError> {
        if layers.is_empty() {
            return Err(NetworkError::Empty);
        }
        let network = Self { layers };
        tracing::info!(
            "network: {} layers, {} parameters",
            network.len(),
            network.num_parameters()
        );
        Ok(network)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Always `false`; a network holds at least one layer.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    /// Total trainable scalars across all layers.
    pub fn num_parameters(&self) -> usize {
        self.layers.iter().map(Layer::num_parameters).sum()
    }

    /// Runs `x` through every layer in order.
    pub fn forward(&mut self, x: &Tensor) -> Result<Tensor, NetworkError> {
        let mut current = x.clone();
        for (index, layer) in self.layers.iter_mut().enumerate() {
            current = layer.forward(&current).map_err(|source| NetworkError::Layer {
                index,
                kind: layer.kind(),
                source,
            })?;
            tracing::trace!("layer {index} ({}) -> {}", layer.kind(), current.shape());
        }
        Ok(current)
    }

    /// Propagates `dy` from the last layer back to the first and returns
    /// the gradient with respect to the network input.
    pub fn backward(&mut self, dy: &Tensor) -> Result<Tensor, NetworkError> {
        let mut current = dy.clone();
        for (index, layer) in self.layers.iter_mut().enumerate().rev() {
            current = layer.backward(&current).map_err(|source| NetworkError::Layer {
                index,
                kind: layer.kind(),
                source,
            })?;
        }
        Ok(current)
    }

    /// Applies one SGD step to every trainable layer.
    pub fn update(&mut self, params: UpdateParams) -> Result<(), NetworkError> {
        for (index, layer) in self.layers.iter_mut().enumerate() {
            layer.update(params).map_err(|source| NetworkError::Layer {
                index,
                kind: layer.kind(),
                source,
            })?;
        }
        tracing::debug!("network updated (rate={})", params.rate);
        Ok(())
    }

    /// Returns a multi-line summary, one line per layer.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "network: {} layers, {} parameters",
            self.len(),
            self.num_parameters()
        );
        for (index, layer) in self.layers.iter().enumerate() {
            out.push_str(&format!("\n  [{index}] {}", layer.summary()));
        }
        out
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary())
    }
}
