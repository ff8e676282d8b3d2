// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Network configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! seed = 42
//!
//! [update]
//! rate = 0.01
//! momentum = 0.9
//! decay = 0.0005
//!
//! [[layers]]
//! kind = "convolutional"
//! filters = 8
//! channels = 1
//! size = 3
//! padding = 1
//!
//! [[layers]]
//! kind = "activation"
//! activation = "relu"
//!
//! [[layers]]
//! kind = "maxpool"
//! size = 2
//! stride = 2
//!
//! [[layers]]
//! kind = "connected"
//! inputs = 128
//! outputs = 10
//! ```

use crate::{Network, NetworkError};
use layers::{LayerSpec, UpdateParams};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;

/// Topology, initialisation seed and update hyperparameters of a network.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NetworkConfig {
    /// Seed for weight initialisation; equal seeds give equal networks.
    #[serde(default)]
    pub seed: u64,
    /// Hyperparameters passed to [`Network::update`] by the caller.
    #[serde(default)]
    pub update: UpdateParams,
    /// Layers in execution order.
    #[serde(default)]
    pub layers: Vec<LayerSpec>,
}

impl NetworkConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, NetworkError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            NetworkError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, NetworkError> {
        toml::from_str(toml_str)
            .map_err(|e| NetworkError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, NetworkError> {
        toml::to_string_pretty(self)
            .map_err(|e| NetworkError::Config(format!("TOML serialise error: {e}")))
    }

    /// Checks the update hyperparameters and that at least one layer is given.
    pub fn validate(&self) -> Result<(), NetworkError> {
        self.update
            .validate()
            .map_err(|e| NetworkError::Config(e.to_string()))?;
        if self.layers.is_empty() {
            return Err(NetworkError::Empty);
        }
        Ok(())
    }

    /// Builds the network, initialising weights from `seed`.
    pub fn build(&self) -> Result<Network, NetworkError> {
        self.validate()?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let layers = self
            .layers
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                spec.build(&mut rng)
                    .map_err(|e| NetworkError::Config(format!("layer {index}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Network::new(layers)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            update: UpdateParams::default(),
            layers: Vec::new(),
        }
    }
}
