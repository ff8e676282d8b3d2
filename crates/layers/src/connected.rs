// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fully-connected (affine) layer: `y = x·w + b`.
//!
//! Inputs of any rank ≥ 1 are flattened to `[batch, features]` with
//! `batch = x.shape[0]`, so a `[N, C, H, W]` activation feeds a layer with
//! `C·H·W` inputs directly.

use crate::update::sgd_step;
use crate::{LayerError, UpdateParams};
use rand::Rng;
use tensor_core::{linalg, ops, Shape, Tensor, TensorView};

/// Affine layer with weights `[inputs, outputs]` and bias `[1, outputs]`.
#[derive(Debug, Clone)]
pub struct ConnectedLayer {
    w: Tensor,
    b: Tensor,
    dw: Tensor,
    db: Tensor,
    input: Option<Tensor>,
}

impl ConnectedLayer {
    /// Creates a layer with weights drawn uniformly from
    /// `[-sqrt(2/inputs), sqrt(2/inputs)]` and zero bias.
    ///
    /// # Errors
    /// Returns [`LayerError::InvalidConfig`] if either width is zero.
    pub fn new<R: Rng + ?Sized>(
        inputs: usize,
        outputs: usize,
        rng: &mut R,
    ) -> Result<Self, LayerError> {
        if inputs == 0 || outputs == 0 {
            return Err(LayerError::InvalidConfig(format!(
                "connected layer needs non-zero widths (got {inputs} -> {outputs})"
            )));
        }
        let scale = (2.0 / inputs as f32).sqrt();
        tracing::info!("connected layer: {inputs} -> {outputs}");
        Ok(Self {
            w: Tensor::random(scale, [inputs, outputs], rng),
            b: Tensor::zeros([1, outputs]),
            dw: Tensor::zeros([inputs, outputs]),
            db: Tensor::zeros([1, outputs]),
            input: None,
        })
    }

    /// Creates a layer from existing parameters with zeroed gradients.
    ///
    /// # Errors
    /// Returns [`LayerError::InvalidConfig`] unless `w` is `[inputs, outputs]`
    /// and `b` is `[1, outputs]`.
    pub fn from_parameters(w: Tensor, b: Tensor) -> Result<Self, LayerError> {
        let (inputs, outputs) = match w.shape().dims() {
            &[i, o] => (i, o),
            _ => {
                return Err(LayerError::InvalidConfig(format!(
                    "connected weights must be rank 2, got {}",
                    w.shape()
                )))
            }
        };
        if b.shape() != &Shape::matrix(1, outputs) {
            return Err(LayerError::InvalidConfig(format!(
                "connected bias must be [1, {outputs}], got {}",
                b.shape()
            )));
        }
        Ok(Self {
            dw: Tensor::zeros([inputs, outputs]),
            db: Tensor::zeros([1, outputs]),
            w,
            b,
            input: None,
        })
    }

    pub fn inputs(&self) -> usize {
        self.w.shape().dims()[0]
    }

    pub fn outputs(&self) -> usize {
        self.w.shape().dims()[1]
    }

    pub fn weights(&self) -> &Tensor {
        &self.w
    }

    pub fn bias(&self) -> &Tensor {
        &self.b
    }

    /// Accumulated weight gradient (momentum carry-over after `update`).
    pub fn weight_grad(&self) -> &Tensor {
        &self.dw
    }

    pub fn bias_grad(&self) -> &Tensor {
        &self.db
    }

    /// Number of trainable scalars.
    pub fn num_parameters(&self) -> usize {
        self.w.len() + self.b.len()
    }

    pub fn forward(&mut self, x: &Tensor) -> Result<Tensor, LayerError> {
        let x2 = self.as_matrix(x)?;
        let xw = linalg::matmul(&x2, &self.w.view())?;
        let y = ops::add(&xw.view(), &self.b.view())?;
        tracing::debug!("connected forward {} -> {}", x.shape(), y.shape());
        self.input = Some(x.clone());
        Ok(y)
    }

    /// Accumulates `db += Σ_rows dy` and `dw += xᵀ·dy`, then returns
    /// `dy·wᵀ` reshaped to the cached input's shape.
    pub fn backward(&mut self, dy: &Tensor) -> Result<Tensor, LayerError> {
        let x = self.input.as_ref().ok_or(LayerError::MissingInput {
            layer: "connected",
        })?;
        let x2 = x.reshape(matrix_shape(x))?;
        let expected = Shape::matrix(x2.shape().dims()[0], self.outputs());
        if dy.shape() != &expected {
            return Err(LayerError::UnexpectedInput {
                layer: "connected",
                detail: format!("gradient shape {} != {expected}", dy.shape()),
            });
        }

        let db = ops::sum_dim(&dy.view(), 0)?;
        ops::axpy_inplace(1.0, &db.view(), &mut self.db)?;

        let xt = linalg::transpose(&x2)?;
        let dw = linalg::matmul(&xt.view(), &dy.view())?;
        ops::axpy_inplace(1.0, &dw.view(), &mut self.dw)?;

        let wt = linalg::transpose(&self.w.view())?;
        let dx = linalg::matmul(&dy.view(), &wt.view())?;
        tracing::debug!("connected backward {} -> {}", dy.shape(), x.shape());
        Ok(dx.into_shape(x.shape().clone())?)
    }

    pub fn update(&mut self, params: UpdateParams) -> Result<(), LayerError> {
        let UpdateParams {
            rate,
            momentum,
            decay,
        } = params;
        sgd_step(&mut self.w, &mut self.dw, rate, momentum, decay)?;
        sgd_step(&mut self.b, &mut self.db, rate, momentum, 0.0)?;
        tracing::debug!("connected update: rate={rate}, momentum={momentum}, decay={decay}");
        Ok(())
    }

    fn as_matrix<'a>(&self, x: &'a Tensor) -> Result<TensorView<'a>, LayerError> {
        if x.rank() == 0 {
            return Err(LayerError::UnexpectedInput {
                layer: "connected",
                detail: "input must have a batch dimension".to_string(),
            });
        }
        let shape = matrix_shape(x);
        if shape.dims()[1] != self.inputs() {
            return Err(LayerError::UnexpectedInput {
                layer: "connected",
                detail: format!(
                    "input {} has {} features per row, layer expects {}",
                    x.shape(),
                    shape.dims()[1],
                    self.inputs()
                ),
            });
        }
        Ok(x.reshape(shape)?)
    }
}

/// `[size[0], len / size[0]]` for a tensor of rank ≥ 1.
fn matrix_shape(x: &Tensor) -> Shape {
    let rows = x.shape().dims().first().copied().unwrap_or(1);
    let cols = if rows == 0 { 0 } else { x.len() / rows };
    Shape::matrix(rows, cols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fixture() -> ConnectedLayer {
        let w = Tensor::from_f32([3, 2], &[0.5, -1.0, 1.0, 0.0, -0.5, 2.0]).unwrap();
        let b = Tensor::from_f32([1, 2], &[0.1, -0.2]).unwrap();
        let mut layer = ConnectedLayer::from_parameters(w, b).unwrap();
        layer.dw = Tensor::from_f32([3, 2], &[0.1, 0.0, 0.0, 0.1, 0.2, 0.0]).unwrap();
        layer.db = Tensor::from_f32([1, 2], &[0.5, 0.5]).unwrap();
        layer
    }

    fn x() -> Tensor {
        Tensor::from_f32([2, 3], &[1.0, -1.0, 2.0, 0.0, 1.0, 1.0]).unwrap()
    }

    #[test]
    fn test_forward() {
        let mut layer = fixture();
        let y = layer.forward(&x()).unwrap();
        let expected = Tensor::from_f32([2, 2], &[-1.4, 2.8, 0.6, 1.8]).unwrap();
        assert!(y.all_close(&expected, 1e-5));
    }

    #[test]
    fn test_backward_then_update() {
        let mut layer = fixture();
        layer.forward(&x()).unwrap();
        let dy = Tensor::from_f32([2, 2], &[1.0, 2.0, -1.0, 0.5]).unwrap();
        let dx = layer.backward(&dy).unwrap();
        let dx_expected = Tensor::from_f32([2, 3], &[-1.5, 1.0, 3.5, -1.0, -1.0, 1.5]).unwrap();
        assert!(dx.all_close(&dx_expected, 1e-5));

        let dw_acc = Tensor::from_f32([3, 2], &[1.1, 2.0, -2.0, -1.4, 1.2, 4.5]).unwrap();
        assert!(layer.weight_grad().all_close(&dw_acc, 1e-5));
        let db_acc = Tensor::from_f32([1, 2], &[0.5, 3.0]).unwrap();
        assert!(layer.bias_grad().all_close(&db_acc, 1e-5));

        layer.update(UpdateParams::new(1.0, 0.9, 0.5)).unwrap();

        let updated_w = Tensor::from_f32([3, 2], &[-0.85, -2.5, 2.5, 1.4, -1.45, -3.5]).unwrap();
        let updated_dw =
            Tensor::from_f32([3, 2], &[1.215, 1.35, -1.35, -1.26, 0.855, 4.95]).unwrap();
        let updated_b = Tensor::from_f32([1, 2], &[-0.4, -3.2]).unwrap();
        let updated_db = Tensor::from_f32([1, 2], &[0.45, 2.7]).unwrap();
        assert!(layer.weights().all_close(&updated_w, 1e-5));
        assert!(layer.weight_grad().all_close(&updated_dw, 1e-5));
        assert!(layer.bias().all_close(&updated_b, 1e-5));
        assert!(layer.bias_grad().all_close(&updated_db, 1e-5));
    }

    #[test]
    fn test_flattens_higher_rank_input() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut layer = ConnectedLayer::new(2 * 3 * 3, 4, &mut rng).unwrap();
        let x = Tensor::random(1.0, [5, 2, 3, 3], &mut rng);
        let y = layer.forward(&x).unwrap();
        assert_eq!(y.shape(), &Shape::matrix(5, 4));

        let dx = layer.backward(&Tensor::zeros([5, 4])).unwrap();
        assert_eq!(dx.shape(), x.shape());
    }

    #[test]
    fn test_init_scale() {
        let mut rng = StdRng::seed_from_u64(7);
        let layer = ConnectedLayer::new(8, 16, &mut rng).unwrap();
        let limit = (2.0f32 / 8.0).sqrt();
        assert_eq!(layer.weights().shape(), &Shape::matrix(8, 16));
        assert!(layer.weights().as_slice().iter().all(|v| v.abs() <= limit));
        assert!(layer.bias().as_slice().iter().all(|&v| v == 0.0));
        assert_eq!(layer.num_parameters(), 8 * 16 + 16);
    }

    #[test]
    fn test_wrong_feature_count() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut layer = ConnectedLayer::new(4, 2, &mut rng).unwrap();
        let err = layer.forward(&Tensor::zeros([3, 5])).unwrap_err();
        assert!(matches!(err, LayerError::UnexpectedInput { .. }));
    }

    #[test]
    fn test_rejects_zero_width() {
        let mut rng = StdRng::seed_from_u64(1);
        for (inputs, outputs) in [(0, 4), (4, 0), (0, 0)] {
            let err = ConnectedLayer::new(inputs, outputs, &mut rng).unwrap_err();
            assert!(matches!(err, LayerError::InvalidConfig(_)));
        }
    }

    #[test]
    fn test_backward_requires_forward() {
        let mut layer = fixture();
        let err = layer.backward(&Tensor::zeros([2, 2])).unwrap_err();
        assert!(matches!(err, LayerError::MissingInput { .. }));
    }

    #[test]
    fn test_backward_wrong_gradient_shape() {
        let mut layer = fixture();
        layer.forward(&x()).unwrap();
        let err = layer.backward(&Tensor::zeros([2, 3])).unwrap_err();
        assert!(matches!(err, LayerError::UnexpectedInput { .. }));
    }

    #[test]
    fn test_from_parameters_rejects_bad_bias() {
        let w = Tensor::zeros([3, 2]);
        assert!(ConnectedLayer::from_parameters(w.clone(), Tensor::zeros([2])).is_err());
        assert!(ConnectedLayer::from_parameters(Tensor::zeros([6]), Tensor::zeros([1, 2])).is_err());
    }
}
