// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! 2-D convolution expressed as patch extraction followed by a matrix product.
//!
//! For each image the filter bank, flattened to `[F, C·k·k]`, multiplies the
//! transposed patch matrix `[C·k·k, P]` to give `[F, P]`, which is already
//! the row-major layout of `[F, out_h, out_w]`.
//!
//! ```text
//! forward:   y_n  = W · colᵀ + b
//! backward:  dW  += dy_n · col
//!            db  += Σ_p dy_n
//!            dx_n = col2im(dy_nᵀ · W)
//! ```

use crate::update::sgd_step;
use crate::{LayerError, UpdateParams};
use rand::Rng;
use tensor_core::patch::{self, PatchGeometry};
use tensor_core::{linalg, ops, Shape, Tensor, TensorError, TensorView};

/// Convolutional layer with filters `[F, C, k, k]` and bias `[F]`.
#[derive(Debug, Clone)]
pub struct ConvolutionalLayer {
    filters: usize,
    channels: usize,
    size: usize,
    stride: usize,
    padding: usize,
    w: Tensor,
    b: Tensor,
    dw: Tensor,
    db: Tensor,
    input: Option<Tensor>,
}

impl ConvolutionalLayer {
    /// Creates `filters` filters of `size × size` over `channels` input
    /// channels. Weights are uniform in `±sqrt(2 / (size·size·channels))`,
    /// biases start at zero.
    ///
    /// # Errors
    /// Returns [`LayerError::InvalidConfig`] if any extent or the stride is zero.
    pub fn new<R: Rng + ?Sized>(
        filters: usize,
        channels: usize,
        size: usize,
        stride: usize,
        padding: usize,
        rng: &mut R,
    ) -> Result<Self, LayerError> {
        if filters == 0 || channels == 0 || size == 0 || stride == 0 {
            return Err(LayerError::InvalidConfig(format!(
                "convolution needs non-zero filters, channels, size and stride \
                 (got {filters}, {channels}, {size}, {stride})"
            )));
        }
        let scale = (2.0 / (size * size * channels) as f32).sqrt();
        tracing::info!(
            "convolutional layer: {filters} filters {size}x{size}x{channels}, stride {stride}, padding {padding}"
        );
        Ok(Self {
            filters,
            channels,
            size,
            stride,
            padding,
            w: Tensor::random(scale, [filters, channels, size, size], rng),
            b: Tensor::zeros([filters]),
            dw: Tensor::zeros([filters, channels, size, size]),
            db: Tensor::zeros([filters]),
            input: None,
        })
    }

    /// Replaces the filter bank and bias, e.g. with pretrained values.
    /// Gradient accumulators are left untouched.
    pub fn set_parameters(&mut self, w: Tensor, b: Tensor) -> Result<(), LayerError> {
        if w.shape() != self.w.shape() || b.shape() != self.b.shape() {
            return Err(LayerError::InvalidConfig(format!(
                "expected weights {} and bias {}, got {} and {}",
                self.w.shape(),
                self.b.shape(),
                w.shape(),
                b.shape()
            )));
        }
        self.w = w;
        self.b = b;
        Ok(())
    }

    pub fn filters(&self) -> usize {
        self.filters
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn padding(&self) -> usize {
        self.padding
    }

    pub fn weights(&self) -> &Tensor {
        &self.w
    }

    pub fn bias(&self) -> &Tensor {
        &self.b
    }

    pub fn weight_grad(&self) -> &Tensor {
        &self.dw
    }

    pub fn bias_grad(&self) -> &Tensor {
        &self.db
    }

    pub fn num_parameters(&self) -> usize {
        self.w.len() + self.b.len()
    }

    /// Output shape for an input of shape `input`, keeping its rank.
    pub fn output_shape(&self, input: &Shape) -> Result<Shape, LayerError> {
        let g = self.geometry(input)?;
        let spatial = Shape::new(vec![self.filters, g.out_height, g.out_width]);
        Ok(if input.rank() == 4 {
            spatial.with_leading(g.batch)
        } else {
            spatial
        })
    }

    /// Convolves `x` (`[C, H, W]` or `[N, C, H, W]`) with every filter.
    pub fn forward(&mut self, x: &Tensor) -> Result<Tensor, LayerError> {
        let g = self.geometry(x.shape())?;
        let out_shape = self.output_shape(x.shape())?;
        let wm = self.filter_matrix()?;
        let bias = self.b.reshape([self.filters, 1])?;

        let mut data = Vec::with_capacity(out_shape.num_elements());
        for image in images(x)? {
            let col = patch::extract_patches(&image, self.size, self.stride, self.padding)?;
            let col_t = linalg::transpose(&col.view())?;
            let y = linalg::matmul(&wm, &col_t.view())?;
            let y = ops::add(&y.view(), &bias)?;
            data.extend_from_slice(y.as_slice());
        }
        tracing::debug!(
            "convolutional forward {} -> {} ({} patches per image)",
            x.shape(),
            out_shape,
            g.patches_per_image()
        );

        self.input = Some(x.clone());
        Ok(Tensor::from_vec(out_shape, data)?)
    }

    /// Accumulates filter and bias gradients and returns `dL/dx`.
    pub fn backward(&mut self, dy: &Tensor) -> Result<Tensor, LayerError> {
        let x = self.input.take().ok_or(LayerError::MissingInput {
            layer: "convolutional",
        })?;
        let result = self.backward_with(&x, dy);
        self.input = Some(x);
        result
    }

    fn backward_with(&mut self, x: &Tensor, dy: &Tensor) -> Result<Tensor, LayerError> {
        let expected = self.output_shape(x.shape())?;
        if dy.shape() != &expected {
            return Err(LayerError::UnexpectedInput {
                layer: "convolutional",
                detail: format!("gradient shape {} != output shape {expected}", dy.shape()),
            });
        }
        let g = self.geometry(x.shape())?;
        let image_shape = Shape::new(vec![g.channels, g.height, g.width]);
        let dy_rows = Shape::matrix(self.filters, g.patches_per_image());
        let wm = self.filter_matrix()?.to_tensor();

        let mut dx = Vec::with_capacity(x.len());
        for (n, image) in images(x)?.into_iter().enumerate() {
            let dy_n = if dy.rank() == 4 {
                dy.get(n)?.reshape(dy_rows.clone())?
            } else {
                dy.reshape(dy_rows.clone())?
            };
            let col = patch::extract_patches(&image, self.size, self.stride, self.padding)?;

            let db = ops::sum_dim(&dy_n, 1)?.into_shape([self.filters])?;
            ops::axpy_inplace(1.0, &db.view(), &mut self.db)?;

            let dw = linalg::matmul(&dy_n, &col.view())?.into_shape(self.dw.shape().clone())?;
            ops::axpy_inplace(1.0, &dw.view(), &mut self.dw)?;

            let dy_t = linalg::transpose(&dy_n)?;
            let dcol = linalg::matmul(&dy_t.view(), &wm.view())?;
            let dx_n = patch::accumulate_patches(
                &dcol.view(),
                &image_shape,
                self.size,
                self.stride,
                self.padding,
            )?;
            dx.extend_from_slice(dx_n.as_slice());
        }
        tracing::debug!("convolutional backward {} -> {}", dy.shape(), x.shape());
        Ok(Tensor::from_vec(x.shape().clone(), dx)?)
    }

    pub fn update(&mut self, params: UpdateParams) -> Result<(), LayerError> {
        sgd_step(&mut self.w, &mut self.dw, params.rate, params.momentum, params.decay)?;
        sgd_step(&mut self.b, &mut self.db, params.rate, params.momentum, 0.0)?;
        tracing::debug!(
            "convolutional update: rate={}, momentum={}, decay={}",
            params.rate,
            params.momentum,
            params.decay
        );
        Ok(())
    }

    fn geometry(&self, input: &Shape) -> Result<PatchGeometry, LayerError> {
        let g = PatchGeometry::new(input, self.size, self.stride, self.padding)?;
        if g.channels != self.channels {
            return Err(LayerError::UnexpectedInput {
                layer: "convolutional",
                detail: format!(
                    "input {input} has {} channels, layer expects {}",
                    g.channels, self.channels
                ),
            });
        }
        Ok(g)
    }

    fn filter_matrix(&self) -> Result<TensorView<'_>, LayerError> {
        Ok(self
            .w
            .reshape([self.filters, self.channels * self.size * self.size])?)
    }
}

/// Splits a `[N, C, H, W]` tensor into per-image `[C, H, W]` views; a
/// rank-3 tensor is a single image.
fn images(x: &Tensor) -> Result<Vec<TensorView<'_>>, LayerError> {
    if x.rank() == 4 {
        let n = x.shape().dims()[0];
        Ok((0..n)
            .map(|i| x.get(i))
            .collect::<Result<Vec<_>, TensorError>>()?)
    } else {
        Ok(vec![x.view()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Direct nested-loop convolution over `[N, C, H, W]`.
    fn naive_forward(layer: &ConvolutionalLayer, x: &Tensor) -> Tensor {
        let out = layer.output_shape(x.shape()).unwrap();
        let (n, c, h, w) = {
            let d = x.shape().dims();
            (d[0], d[1], d[2], d[3])
        };
        let (oh, ow) = (out.dims()[2], out.dims()[3]);
        let (k, s, p) = (layer.size(), layer.stride(), layer.padding() as isize);
        let mut y = Tensor::zeros(out);
        for b in 0..n {
            for f in 0..layer.filters() {
                for i in 0..oh {
                    for j in 0..ow {
                        let mut acc = layer.bias().at(&[f]).unwrap();
                        for ch in 0..c {
                            for ki in 0..k {
                                for kj in 0..k {
                                    let ih = (i * s + ki) as isize - p;
                                    let iw = (j * s + kj) as isize - p;
                                    if ih < 0 || iw < 0 || ih as usize >= h || iw as usize >= w {
                                        continue;
                                    }
                                    acc += layer.weights().at(&[f, ch, ki, kj]).unwrap()
                                        * x.at(&[b, ch, ih as usize, iw as usize]).unwrap();
                                }
                            }
                        }
                        y.set(&[b, f, i, j], acc).unwrap();
                    }
                }
            }
        }
        y
    }

    /// Direct adjoint of [`naive_forward`] with respect to input and filters.
    fn naive_backward(layer: &ConvolutionalLayer, x: &Tensor, dy: &Tensor) -> (Tensor, Tensor) {
        let (n, c, h, w) = {
            let d = x.shape().dims();
            (d[0], d[1], d[2], d[3])
        };
        let (oh, ow) = (dy.shape().dims()[2], dy.shape().dims()[3]);
        let (k, s, p) = (layer.size(), layer.stride(), layer.padding() as isize);
        let mut dx = Tensor::zeros(x.shape().clone());
        let mut dw = Tensor::zeros(layer.weights().shape().clone());
        for b in 0..n {
            for f in 0..layer.filters() {
                for i in 0..oh {
                    for j in 0..ow {
                        let g = dy.at(&[b, f, i, j]).unwrap();
                        for ch in 0..c {
                            for ki in 0..k {
                                for kj in 0..k {
                                    let ih = (i * s + ki) as isize - p;
                                    let iw = (j * s + kj) as isize - p;
                                    if ih < 0 || iw < 0 || ih as usize >= h || iw as usize >= w {
                                        continue;
                                    }
                                    let xi = [b, ch, ih as usize, iw as usize];
                                    let wi = [f, ch, ki, kj];
                                    let wv = layer.weights().at(&wi).unwrap();
                                    let xv = x.at(&xi).unwrap();
                                    dx.set(&xi, dx.at(&xi).unwrap() + g * wv).unwrap();
                                    dw.set(&wi, dw.at(&wi).unwrap() + g * xv).unwrap();
                                }
                            }
                        }
                    }
                }
            }
        }
        (dx, dw)
    }

    fn layer_with_bias(
        filters: usize,
        channels: usize,
        size: usize,
        stride: usize,
        padding: usize,
        rng: &mut StdRng,
    ) -> ConvolutionalLayer {
        let mut layer =
            ConvolutionalLayer::new(filters, channels, size, stride, padding, rng).unwrap();
        let w = layer.weights().clone();
        let b = Tensor::random(1.0, [filters], rng);
        layer.set_parameters(w, b).unwrap();
        layer
    }

    #[test]
    fn test_forward_matches_direct_convolution() {
        let mut rng = StdRng::seed_from_u64(16);
        for &(size, stride, padding) in &[(3, 1, 1), (3, 2, 1), (2, 2, 0), (1, 1, 0)] {
            let mut layer = layer_with_bias(4, 3, size, stride, padding, &mut rng);
            let x = Tensor::random(1.0, [2, 3, 7, 6], &mut rng);
            let y = layer.forward(&x).unwrap();
            let expected = naive_forward(&layer, &x);
            assert_eq!(y.shape(), expected.shape());
            assert!(y.all_close(&expected, 1e-4), "size {size} stride {stride}");
        }
    }

    #[test]
    fn test_backward_matches_direct_adjoint() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut layer = layer_with_bias(16, 8, 3, 1, 1, &mut rng);
        let x = Tensor::random(1.0, [2, 8, 5, 5], &mut rng);
        let y = layer.forward(&x).unwrap();
        let dy = Tensor::random(1.0, y.shape().clone(), &mut rng);

        let dx = layer.backward(&dy).unwrap();
        let (dx_expected, dw_expected) = naive_backward(&layer, &x, &dy);
        assert!(dx.all_close(&dx_expected, 1e-3));
        assert!(layer.weight_grad().all_close(&dw_expected, 1e-3));

        let mut db_expected = dy.clone();
        for axis in [0, 2, 3] {
            db_expected = ops::sum_dim(&db_expected.view(), axis).unwrap();
        }
        let db_expected = db_expected.into_shape([16]).unwrap();
        assert!(layer.bias_grad().all_close(&db_expected, 1e-3));
    }

    #[test]
    fn test_unbatched_input_keeps_rank() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut layer = ConvolutionalLayer::new(5, 2, 3, 2, 1, &mut rng).unwrap();
        let x = Tensor::random(1.0, [2, 9, 9], &mut rng);
        let y = layer.forward(&x).unwrap();
        assert_eq!(y.shape(), &Shape::new(vec![5, 5, 5]));

        let batched = x.clone().into_shape([1, 2, 9, 9]).unwrap();
        let yb = layer.forward(&batched).unwrap();
        assert_eq!(yb.as_slice(), y.as_slice());

        let dx = layer.backward(&Tensor::zeros([1, 5, 5, 5])).unwrap();
        assert_eq!(dx.shape(), batched.shape());
    }

    #[test]
    fn test_update_follows_sgd_rule() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut layer = layer_with_bias(2, 1, 3, 1, 1, &mut rng);
        let x = Tensor::random(1.0, [1, 1, 4, 4], &mut rng);
        layer.forward(&x).unwrap();
        layer.backward(&Tensor::random(1.0, [1, 2, 4, 4], &mut rng)).unwrap();

        let (w0, b0) = (layer.weights().clone(), layer.bias().clone());
        let (dw0, db0) = (layer.weight_grad().clone(), layer.bias_grad().clone());
        layer.update(UpdateParams::new(1.0, 0.9, 0.5)).unwrap();

        for i in 0..w0.len() {
            let step = dw0.as_slice()[i] + 0.5 * w0.as_slice()[i];
            assert!((layer.weights().as_slice()[i] - (w0.as_slice()[i] - step)).abs() < 1e-5);
            assert!((layer.weight_grad().as_slice()[i] - 0.9 * step).abs() < 1e-5);
        }
        for i in 0..b0.len() {
            let step = db0.as_slice()[i];
            assert!((layer.bias().as_slice()[i] - (b0.as_slice()[i] - step)).abs() < 1e-5);
            assert!((layer.bias_grad().as_slice()[i] - 0.9 * step).abs() < 1e-5);
        }
    }

    #[test]
    fn test_init() {
        let mut rng = StdRng::seed_from_u64(5);
        let layer = ConvolutionalLayer::new(16, 8, 3, 1, 1, &mut rng).unwrap();
        let limit = (2.0f32 / 72.0).sqrt();
        assert_eq!(layer.weights().shape(), &Shape::new(vec![16, 8, 3, 3]));
        assert_eq!(layer.bias().shape(), &Shape::vector(16));
        assert!(layer.weights().as_slice().iter().all(|v| v.abs() <= limit));
        assert_eq!(layer.num_parameters(), 16 * 8 * 9 + 16);
    }

    #[test]
    fn test_rejects_bad_config_and_inputs() {
        let mut rng = StdRng::seed_from_u64(5);
        assert!(ConvolutionalLayer::new(4, 3, 0, 1, 0, &mut rng).is_err());
        assert!(ConvolutionalLayer::new(4, 3, 3, 0, 0, &mut rng).is_err());

        let mut layer = ConvolutionalLayer::new(4, 3, 3, 1, 1, &mut rng).unwrap();
        let err = layer.forward(&Tensor::zeros([1, 2, 5, 5])).unwrap_err();
        assert!(matches!(err, LayerError::UnexpectedInput { .. }));
        assert!(layer.forward(&Tensor::zeros([5, 5])).is_err());
        assert!(matches!(
            layer.backward(&Tensor::zeros([1, 4, 5, 5])).unwrap_err(),
            LayerError::MissingInput { .. }
        ));

        layer.forward(&Tensor::zeros([1, 3, 5, 5])).unwrap();
        let err = layer.backward(&Tensor::zeros([1, 4, 4, 4])).unwrap_err();
        assert!(matches!(err, LayerError::UnexpectedInput { .. }));
    }
}
