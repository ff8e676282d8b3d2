// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for layer construction and execution.

use tensor_core::TensorError;

/// Errors that can occur when running a layer forward or backward.
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    /// A tensor operation inside the layer failed (shape or index misuse).
    #[error(transparent)]
    Tensor(#[from] TensorError),

    /// `backward` was called before any `forward` cached an input.
    #[error("{layer} layer has no cached input; call forward before backward")]
    MissingInput { layer: &'static str },

    /// The input or upstream gradient does not fit the layer's geometry.
    #[error("unexpected input for {layer} layer: {detail}")]
    UnexpectedInput { layer: &'static str, detail: String },

    /// Hyperparameters are invalid (zero-sized window, non-finite rate, ...).
    #[error("invalid layer configuration: {0}")]
    InvalidConfig(String),
}
