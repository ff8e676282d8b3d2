// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! SGD with momentum and L2 weight decay.
//!
//! Gradient accumulators double as the momentum buffer. After an update,
//! each accumulator holds `momentum` times the step it just applied, so the
//! next `backward` adds fresh gradients on top of that carry-over:
//!
//! ```text
//! dw ← dw + decay · w
//! w  ← w − rate · dw
//! dw ← momentum · dw
//! ```
//!
//! Biases follow the same rule without the decay term.

use crate::LayerError;
use tensor_core::{ops, Tensor, TensorError};

/// Hyperparameters of a single parameter update.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UpdateParams {
    /// Learning rate.
    pub rate: f32,
    /// Fraction of the previous step carried into the next one.
    #[serde(default)]
    pub momentum: f32,
    /// L2 penalty applied to weights (not biases).
    #[serde(default)]
    pub decay: f32,
}

impl UpdateParams {
    pub fn new(rate: f32, momentum: f32, decay: f32) -> Self {
        Self {
            rate,
            momentum,
            decay,
        }
    }

    /// Checks that every field is finite, `rate` and `decay` are
    /// non-negative, and `momentum` lies in `[0, 1]`.
    pub fn validate(&self) -> Result<(), LayerError> {
        let finite = self.rate.is_finite() && self.momentum.is_finite() && self.decay.is_finite();
        if !finite {
            return Err(LayerError::InvalidConfig(format!(
                "update parameters must be finite, got {self:?}"
            )));
        }
        if self.rate < 0.0 {
            return Err(LayerError::InvalidConfig(format!(
                "learning rate must be >= 0, got {}",
                self.rate
            )));
        }
        if !(0.0..=1.0).contains(&self.momentum) {
            return Err(LayerError::InvalidConfig(format!(
                "momentum must be in [0, 1], got {}",
                self.momentum
            )));
        }
        if self.decay < 0.0 {
            return Err(LayerError::InvalidConfig(format!(
                "decay must be >= 0, got {}",
                self.decay
            )));
        }
        Ok(())
    }
}

impl Default for UpdateParams {
    fn default() -> Self {
        Self {
            rate: 0.01,
            momentum: 0.9,
            decay: 0.0005,
        }
    }
}

/// Applies one update step to `param` using its accumulator `grad`.
///
/// `decay` is passed separately so biases can skip it.
pub(crate) fn sgd_step(
    param: &mut Tensor,
    grad: &mut Tensor,
    rate: f32,
    momentum: f32,
    decay: f32,
) -> Result<(), TensorError> {
    if decay != 0.0 {
        ops::axpy_inplace(decay, &param.view(), grad)?;
    }
    ops::axpy_inplace(-rate, &grad.view(), param)?;
    *grad = ops::scale(momentum, &grad.view());
    Ok(())
}
