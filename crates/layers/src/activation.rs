// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Elementwise activation functions and the parameter-free layer that
//! applies them.

use crate::LayerError;
use tensor_core::{ops, Tensor};

const LEAKY_SLOPE: f32 = 0.01;

const NAMES: &[&str] = &["linear", "logistic", "relu", "leaky_relu", "softmax"];

/// The nonlinearity an [`ActivationLayer`] applies.
///
/// Serialises as its snake_case name; deserialisation goes through
/// [`Activation::from_str_loose`], so configs may use aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Identity.
    Linear,
    /// `1 / (1 + e^-x)`.
    Logistic,
    /// `max(x, 0)`.
    Relu,
    /// `x` for positive inputs, `0.01 · x` otherwise.
    LeakyRelu,
    /// Row-wise softmax over the last dimension.
    Softmax,
}

impl Activation {
    /// Parses an activation name, accepting common aliases
    /// (`"sigmoid"`, `"identity"`, `"lrelu"`).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "linear" | "identity" | "none" => Some(Self::Linear),
            "logistic" | "sigmoid" => Some(Self::Logistic),
            "relu" => Some(Self::Relu),
            "leaky_relu" | "leakyrelu" | "lrelu" | "leaky" => Some(Self::LeakyRelu),
            "softmax" => Some(Self::Softmax),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Logistic => "logistic",
            Self::Relu => "relu",
            Self::LeakyRelu => "leaky_relu",
            Self::Softmax => "softmax",
        }
    }

    /// Applies the function to a single value. Softmax is not elementwise
    /// and is handled by the layer.
    #[inline]
    fn apply(self, x: f32) -> f32 {
        match self {
            Self::Linear | Self::Softmax => x,
            Self::Logistic => logistic(x),
            Self::Relu => x.max(0.0),
            Self::LeakyRelu => {
                if x > 0.0 {
                    x
                } else {
                    LEAKY_SLOPE * x
                }
            }
        }
    }

    /// Local derivative evaluated at the forward input `x`.
    ///
    /// Softmax reports 1: its Jacobian is folded into the paired loss.
    #[inline]
    fn derivative(self, x: f32) -> f32 {
        match self {
            Self::Linear | Self::Softmax => 1.0,
            Self::Logistic => {
                let s = logistic(x);
                s * (1.0 - s)
            }
            Self::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::LeakyRelu => {
                if x > 0.0 {
                    1.0
                } else {
                    LEAKY_SLOPE
                }
            }
        }
    }
}

impl<'de> serde::Deserialize<'de> for Activation {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::from_str_loose(&name).ok_or_else(|| serde::de::Error::unknown_variant(&name, NAMES))
    }
}

impl std::fmt::Display for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[inline]
fn logistic(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// A layer applying an [`Activation`] elementwise. Holds no parameters.
#[derive(Debug, Clone)]
pub struct ActivationLayer {
    activation: Activation,
    input: Option<Tensor>,
}

impl ActivationLayer {
    pub fn new(activation: Activation) -> Self {
        tracing::info!("activation layer: {activation}");
        Self {
            activation,
            input: None,
        }
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// The input cached by the most recent `forward`.
    pub fn input(&self) -> Option<&Tensor> {
        self.input.as_ref()
    }

    /// Applies the activation to `x` (any rank) and caches `x`.
    pub fn forward(&mut self, x: &Tensor) -> Result<Tensor, LayerError> {
        let y = match self.activation {
            Activation::Softmax => {
                let mut y = Tensor::zeros(x.shape().clone());
                ops::softmax(&x.view(), &mut y)?;
                y
            }
            act => {
                let mut y = x.clone();
                y.as_mut_slice().iter_mut().for_each(|v| *v = act.apply(*v));
                y
            }
        };
        tracing::debug!("{} forward {}", self.activation, x.shape());
        self.input = Some(x.clone());
        Ok(y)
    }

    /// Returns `f'(x) · dy` using the cached input.
    ///
    /// # Errors
    /// - [`LayerError::MissingInput`] if `forward` has not run.
    /// - [`LayerError::UnexpectedInput`] if `dy` does not match the cached shape.
    pub fn backward(&mut self, dy: &Tensor) -> Result<Tensor, LayerError> {
        let x = self.input.as_ref().ok_or(LayerError::MissingInput {
            layer: "activation",
        })?;
        if x.shape() != dy.shape() {
            return Err(LayerError::UnexpectedInput {
                layer: "activation",
                detail: format!("gradient shape {} != input shape {}", dy.shape(), x.shape()),
            });
        }

        let act = self.activation;
        let mut dx = dy.clone();
        for (d, &xv) in dx.as_mut_slice().iter_mut().zip(x.as_slice()) {
            *d *= act.derivative(xv);
        }
        tracing::debug!("{} backward {}", act, dy.shape());
        Ok(dx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const X: [f32; 6] = [-2.0, -0.5, 0.0, 0.5, 1.0, 3.0];
    const DY: [f32; 6] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

    fn run(activation: Activation) -> (Tensor, Tensor) {
        let x = Tensor::from_f32([2, 3], &X).unwrap();
        let dy = Tensor::from_f32([2, 3], &DY).unwrap();
        let mut layer = ActivationLayer::new(activation);
        let y = layer.forward(&x).unwrap();
        let dx = layer.backward(&dy).unwrap();
        (y, dx)
    }

    fn expect(values: &[f32]) -> Tensor {
        Tensor::from_f32([2, 3], values).unwrap()
    }

    #[test]
    fn test_linear() {
        let (y, dx) = run(Activation::Linear);
        assert!(y.all_close(&expect(&X), 1e-6));
        assert!(dx.all_close(&expect(&DY), 1e-6));
    }

    #[test]
    fn test_logistic() {
        let (y, dx) = run(Activation::Logistic);
        let y_expected = [0.119203, 0.377541, 0.5, 0.622459, 0.731059, 0.952574];
        let dx_expected = [0.104994, 0.470007, 0.75, 0.940015, 0.983060, 0.271060];
        assert!(y.all_close(&expect(&y_expected), 1e-5));
        assert!(dx.all_close(&expect(&dx_expected), 1e-5));
    }

    #[test]
    fn test_relu() {
        let (y, dx) = run(Activation::Relu);
        assert!(y.all_close(&expect(&[0.0, 0.0, 0.0, 0.5, 1.0, 3.0]), 1e-6));
        assert!(dx.all_close(&expect(&[0.0, 0.0, 0.0, 4.0, 5.0, 6.0]), 1e-6));
    }

    #[test]
    fn test_leaky_relu() {
        let (y, dx) = run(Activation::LeakyRelu);
        assert!(y.all_close(&expect(&[-0.02, -0.005, 0.0, 0.5, 1.0, 3.0]), 1e-6));
        assert!(dx.all_close(&expect(&[0.01, 0.02, 0.03, 4.0, 5.0, 6.0]), 1e-6));
    }

    #[test]
    fn test_softmax_rows() {
        let (y, dx) = run(Activation::Softmax);
        let y_expected = [0.077696, 0.348207, 0.574097, 0.067425, 0.111166, 0.821409];
        assert!(y.all_close(&expect(&y_expected), 1e-5));
        // Local derivative is the identity.
        assert!(dx.all_close(&expect(&DY), 1e-6));
    }

    #[test]
    fn test_forward_replaces_cache() {
        let mut layer = ActivationLayer::new(Activation::Relu);
        layer.forward(&Tensor::zeros([4])).unwrap();
        let x = Tensor::from_f32([2], &[1.0, -1.0]).unwrap();
        layer.forward(&x).unwrap();
        assert_eq!(layer.input(), Some(&x));

        let dx = layer.backward(&Tensor::from_f32([2], &[3.0, 3.0]).unwrap()).unwrap();
        assert_eq!(dx.as_slice(), &[3.0, 0.0]);
    }

    #[test]
    fn test_backward_before_forward() {
        let mut layer = ActivationLayer::new(Activation::Logistic);
        let err = layer.backward(&Tensor::zeros([3])).unwrap_err();
        assert!(matches!(err, LayerError::MissingInput { .. }));
    }

    #[test]
    fn test_backward_shape_mismatch() {
        let mut layer = ActivationLayer::new(Activation::Linear);
        layer.forward(&Tensor::zeros([2, 3])).unwrap();
        let err = layer.backward(&Tensor::zeros([3, 2])).unwrap_err();
        assert!(matches!(err, LayerError::UnexpectedInput { .. }));
    }

    #[test]
    fn test_from_str_loose() {
        assert_eq!(Activation::from_str_loose("sigmoid"), Some(Activation::Logistic));
        assert_eq!(Activation::from_str_loose("ReLU"), Some(Activation::Relu));
        assert_eq!(Activation::from_str_loose("lrelu"), Some(Activation::LeakyRelu));
        assert_eq!(Activation::from_str_loose("identity"), Some(Activation::Linear));
        assert_eq!(Activation::from_str_loose("tanh"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Activation::LeakyRelu), "leaky_relu");
        assert_eq!(format!("{}", Activation::Softmax), "softmax");
    }
}
