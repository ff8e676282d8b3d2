// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for network construction and execution.

/// Errors that can occur while building or running a [`Network`](crate::Network).
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// A layer failed during forward, backward or update.
    #[error("{kind} layer {index} failed: {source}")]
    Layer {
        index: usize,
        kind: &'static str,
        #[source]
        source: layers::LayerError,
    },

    /// The network has no layers.
    #[error("network has no layers")]
    Empty,

    /// Configuration error (unreadable file, bad TOML, invalid values).
    #[error("configuration error: {0}")]
    Config(String),
}
