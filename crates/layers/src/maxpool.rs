// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Max pooling over square windows.
//!
//! Output extents are `(in − 1) / stride + 1` and windows start
//! `(size − 1) / 2` cells before their anchor. Probes that fall outside the
//! input are skipped rather than read as zero, so every window holds at
//! least its anchor cell.

use crate::LayerError;
use tensor_core::{Shape, Tensor};

/// Parameter-free max-pooling layer over `[C, H, W]` or `[N, C, H, W]`.
#[derive(Debug, Clone)]
pub struct MaxPoolLayer {
    size: usize,
    stride: usize,
    input: Option<Tensor>,
}

/// Plane-level view of a pooling pass: how many `H × W` planes there are and
/// how each maps to an `out_h × out_w` plane.
#[derive(Debug, Clone, Copy)]
struct PoolGeometry {
    planes: usize,
    height: usize,
    width: usize,
    out_height: usize,
    out_width: usize,
}

impl MaxPoolLayer {
    /// # Errors
    /// Returns [`LayerError::InvalidConfig`] if `size` or `stride` is zero.
    pub fn new(size: usize, stride: usize) -> Result<Self, LayerError> {
        if size == 0 || stride == 0 {
            return Err(LayerError::InvalidConfig(format!(
                "maxpool needs non-zero size and stride (got {size}, {stride})"
            )));
        }
        tracing::info!("maxpool layer: {size}x{size}, stride {stride}");
        Ok(Self {
            size,
            stride,
            input: None,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Output shape for an input of shape `input`, keeping its rank.
    pub fn output_shape(&self, input: &Shape) -> Result<Shape, LayerError> {
        let g = self.geometry(input)?;
        let mut dims = input.dims().to_vec();
        let rank = dims.len();
        dims[rank - 2] = g.out_height;
        dims[rank - 1] = g.out_width;
        Ok(Shape::new(dims))
    }

    pub fn forward(&mut self, x: &Tensor) -> Result<Tensor, LayerError> {
        let g = self.geometry(x.shape())?;
        let mut y = Tensor::zeros(self.output_shape(x.shape())?);

        let src = x.as_slice();
        let dst = y.as_mut_slice();
        self.for_each_window(&g, src, |out, arg| dst[out] = src[arg]);

        tracing::debug!("maxpool forward {} -> {}", x.shape(), y.shape());
        self.input = Some(x.clone());
        Ok(y)
    }

    /// Routes each output gradient to the input cell that won its window.
    ///
    /// When windows overlap (`stride < size`) a cell can win several
    /// windows; its gradient is the sum of theirs.
    pub fn backward(&mut self, dy: &Tensor) -> Result<Tensor, LayerError> {
        let x = self.input.as_ref().ok_or(LayerError::MissingInput { layer: "maxpool" })?;
        let expected = self.output_shape(x.shape())?;
        if dy.shape() != &expected {
            return Err(LayerError::UnexpectedInput {
                layer: "maxpool",
                detail: format!("gradient shape {} != output shape {expected}", dy.shape()),
            });
        }
        let g = self.geometry(x.shape())?;
        let mut dx = Tensor::zeros(x.shape().clone());

        let grad = dy.as_slice();
        let dst = dx.as_mut_slice();
        self.for_each_window(&g, x.as_slice(), |out, arg| dst[arg] += grad[out]);

        tracing::debug!("maxpool backward {} -> {}", dy.shape(), x.shape());
        Ok(dx)
    }

    fn geometry(&self, input: &Shape) -> Result<PoolGeometry, LayerError> {
        let dims = input.dims();
        if dims.len() != 3 && dims.len() != 4 {
            return Err(LayerError::UnexpectedInput {
                layer: "maxpool",
                detail: format!("expected [C, H, W] or [N, C, H, W], got {input}"),
            });
        }
        let rank = dims.len();
        let (height, width) = (dims[rank - 2], dims[rank - 1]);
        let planes = dims[..rank - 2].iter().product();
        let extent = |d: usize| if d == 0 { 0 } else { (d - 1) / self.stride + 1 };
        Ok(PoolGeometry {
            planes,
            height,
            width,
            out_height: extent(height),
            out_width: extent(width),
        })
    }

    /// Calls `visit(output_offset, argmax_offset)` for every output cell,
    /// where `argmax_offset` is the first input cell holding its window's
    /// maximum.
    fn for_each_window(
        &self,
        g: &PoolGeometry,
        src: &[f32],
        mut visit: impl FnMut(usize, usize),
    ) {
        let lead = ((self.size - 1) / 2) as isize;
        let in_plane = g.height * g.width;
        let out_plane = g.out_height * g.out_width;

        for p in 0..g.planes {
            for oh in 0..g.out_height {
                for ow in 0..g.out_width {
                    let mut best = f32::MIN;
                    let mut arg = None;
                    for i in 0..self.size {
                        for j in 0..self.size {
                            let ih = (oh * self.stride + i) as isize - lead;
                            let iw = (ow * self.stride + j) as isize - lead;
                            let inside = ih >= 0
                                && iw >= 0
                                && (ih as usize) < g.height
                                && (iw as usize) < g.width;
                            if !inside {
                                continue;
                            }
                            let offset = p * in_plane + ih as usize * g.width + iw as usize;
                            if arg.is_none() || src[offset] > best {
                                best = src[offset];
                                arg = Some(offset);
                            }
                        }
                    }
                    if let Some(arg) = arg {
                        visit(p * out_plane + oh * g.out_width + ow, arg);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Tensor {
        Tensor::from_f32(
            [1, 1, 4, 4],
            &[
                3.0, 1.0, 4.0, 1.0, //
                5.0, 9.0, 2.0, 6.0, //
                5.0, 3.0, 5.0, 8.0, //
                9.0, 7.0, 9.0, 3.0,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_pool_2x2_stride_2() {
        let mut layer = MaxPoolLayer::new(2, 2).unwrap();
        let y = layer.forward(&x()).unwrap();
        assert_eq!(y.shape(), &Shape::new(vec![1, 1, 2, 2]));
        assert_eq!(y.as_slice(), &[9.0, 6.0, 9.0, 9.0]);

        let dy = Tensor::from_f32([1, 1, 2, 2], &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let dx = layer.backward(&dy).unwrap();
        #[rustfmt::skip]
        let expected = [
            0.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 2.0,
            0.0, 0.0, 0.0, 0.0,
            3.0, 0.0, 4.0, 0.0,
        ];
        assert_eq!(dx.as_slice(), &expected);
    }

    #[test]
    fn test_overlapping_windows_accumulate() {
        // 3x3 windows at stride 2 all pick the 9 at (1, 1).
        let mut layer = MaxPoolLayer::new(3, 2).unwrap();
        let y = layer.forward(&x()).unwrap();
        assert_eq!(y.as_slice(), &[9.0, 9.0, 9.0, 9.0]);

        let dy = Tensor::from_f32([1, 1, 2, 2], &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let dx = layer.backward(&dy).unwrap();
        assert_eq!(dx.at(&[0, 0, 1, 1]).unwrap(), 10.0);
        assert_eq!(dx.as_slice().iter().sum::<f32>(), 10.0);
    }

    #[test]
    fn test_stride_1_keeps_extent() {
        let mut layer = MaxPoolLayer::new(3, 1).unwrap();
        let y = layer.forward(&x()).unwrap();
        #[rustfmt::skip]
        let expected = [
            9.0, 9.0, 9.0, 6.0,
            9.0, 9.0, 9.0, 8.0,
            9.0, 9.0, 9.0, 9.0,
            9.0, 9.0, 9.0, 9.0,
        ];
        assert_eq!(y.as_slice(), &expected);

        let dx = layer.backward(&Tensor::from_f32([1, 1, 4, 4], &[1.0; 16]).unwrap()).unwrap();
        #[rustfmt::skip]
        let routed = [
            0.0, 0.0, 0.0, 0.0,
            0.0, 9.0, 0.0, 1.0,
            0.0, 0.0, 0.0, 1.0,
            2.0, 0.0, 3.0, 0.0,
        ];
        assert_eq!(dx.as_slice(), &routed);
    }

    #[test]
    fn test_negative_inputs_and_channels() {
        let mut layer = MaxPoolLayer::new(2, 2).unwrap();
        let x = Tensor::from_f32(
            [2, 2, 2],
            &[-4.0, -3.0, -2.0, -1.0, -1.0, -2.0, -3.0, -4.0],
        )
        .unwrap();
        let y = layer.forward(&x).unwrap();
        assert_eq!(y.shape(), &Shape::new(vec![2, 1, 1]));
        assert_eq!(y.as_slice(), &[-1.0, -1.0]);
    }

    #[test]
    fn test_odd_extent() {
        let mut layer = MaxPoolLayer::new(2, 2).unwrap();
        let x = Tensor::random_seeded(1.0, [3, 2, 5, 7], 4);
        let y = layer.forward(&x).unwrap();
        assert_eq!(y.shape(), &Shape::new(vec![3, 2, 3, 4]));
    }

    #[test]
    fn test_errors() {
        assert!(MaxPoolLayer::new(0, 1).is_err());
        assert!(MaxPoolLayer::new(2, 0).is_err());

        let mut layer = MaxPoolLayer::new(2, 2).unwrap();
        assert!(matches!(
            layer.backward(&Tensor::zeros([1, 1, 2, 2])).unwrap_err(),
            LayerError::MissingInput { .. }
        ));
        assert!(layer.forward(&Tensor::zeros([4, 4])).is_err());

        layer.forward(&x()).unwrap();
        assert!(matches!(
            layer.backward(&Tensor::zeros([1, 1, 4, 4])).unwrap_err(),
            LayerError::UnexpectedInput { .. }
        ));
    }
}
