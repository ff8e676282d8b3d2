// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # network
//!
//! Composes [`layers::Layer`]s into a linear pipeline.
//!
//! A [`Network`] runs `forward` through its layers in order, `backward` in
//! reverse, and `update` across all of them. [`NetworkConfig`] describes a
//! network in TOML (topology, initialisation seed, SGD hyperparameters).
//!
//! Loss functions, epochs and batching are left to the caller.
//!
//! # Example
//! ```
//! use network::NetworkConfig;
//! use tensor_core::Tensor;
//!
//! let config = NetworkConfig::from_toml(r#"
//!     seed = 1
//!
//!     [[layers]]
//!     kind = "connected"
//!     inputs = 4
//!     outputs = 3
//!
//!     [[layers]]
//!     kind = "activation"
//!     activation = "softmax"
//! "#)?;
//! let mut net = config.build()?;
//!
//! let x = Tensor::random_seeded(1.0, [2, 4], 7);
//! let y = net.forward(&x)?;
//! assert_eq!(y.shape().dims(), &[2, 3]);
//!
//! let dx = net.backward(&Tensor::zeros([2, 3]))?;
//! net.update(config.update)?;
//! assert_eq!(dx.shape(), x.shape());
//! # Ok::<(), network::NetworkError>(())
//! ```

mod config;
mod error;
mod network;

pub use config::NetworkConfig;
pub use error::NetworkError;
pub use network::Network;
