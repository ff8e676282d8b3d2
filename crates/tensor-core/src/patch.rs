// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Sliding-window patch transforms (im2col / col2im).
//!
//! [`extract_patches`] turns a `[C, H, W]` (or `[N, C, H, W]`) tensor into a
//! matrix with one row per output position and one column per receptive
//! field element, so convolution becomes a single matrix product.
//! [`accumulate_patches`] is its adjoint: it scatter-adds a patch matrix back
//! into spatial layout, summing contributions where windows overlap.
//!
//! Row order is batch, then output row, then output column. Column order is
//! channel, then kernel row, then kernel column. Padded positions read as 0
//! and are dropped on accumulation.

use crate::{Shape, Tensor, TensorError, TensorView};

/// Spatial extent produced by a window of `size` with `stride` and symmetric
/// zero `padding`: `⌊(input + 2·padding − size) / stride⌋ + 1`.
///
/// Returns `None` if the stride is zero or the window does not fit.
pub fn output_extent(input: usize, size: usize, stride: usize, padding: usize) -> Option<usize> {
    if stride == 0 || size == 0 {
        return None;
    }
    let padded = input + 2 * padding;
    if padded < size {
        return None;
    }
    Some((padded - size) / stride + 1)
}

/// Resolved geometry of a patch transform over one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchGeometry {
    pub batch: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
    pub size: usize,
    pub stride: usize,
    pub padding: usize,
    pub out_height: usize,
    pub out_width: usize,
}

impl PatchGeometry {
    /// Resolves the geometry for a `[C, H, W]` or `[N, C, H, W]` shape.
    ///
    /// # Errors
    /// Returns [`TensorError::RankMismatch`] for other ranks and
    /// [`TensorError::InvalidArgument`] if the window cannot be placed.
    pub fn new(
        spatial: &Shape,
        size: usize,
        stride: usize,
        padding: usize,
    ) -> Result<Self, TensorError> {
        let (batch, chw) = match spatial.dims() {
            [c, h, w] => (1, [*c, *h, *w]),
            [n, c, h, w] => (*n, [*c, *h, *w]),
            other => {
                return Err(TensorError::RankMismatch {
                    op: "patch transform",
                    expected: 3,
                    actual: other.len(),
                })
            }
        };
        let [channels, height, width] = chw;
        let invalid = || TensorError::InvalidArgument {
            op: "patch transform",
            detail: format!(
                "window {size} with stride {stride} and padding {padding} does not fit {spatial}"
            ),
        };
        let out_height = output_extent(height, size, stride, padding).ok_or_else(invalid)?;
        let out_width = output_extent(width, size, stride, padding).ok_or_else(invalid)?;
        Ok(Self {
            batch,
            channels,
            height,
            width,
            size,
            stride,
            padding,
            out_height,
            out_width,
        })
    }

    /// Output positions per image (patch-matrix rows per image).
    pub fn patches_per_image(&self) -> usize {
        self.out_height * self.out_width
    }

    /// Elements in one receptive field (patch-matrix columns).
    pub fn patch_len(&self) -> usize {
        self.channels * self.size * self.size
    }

    /// Shape of the full patch matrix.
    pub fn patch_matrix_shape(&self) -> Shape {
        Shape::matrix(self.batch * self.patches_per_image(), self.patch_len())
    }

    /// Calls `visit(patch_offset, image_offset)` for every in-bounds tap,
    /// where `patch_offset` indexes the patch matrix and `image_offset` the
    /// spatial tensor.
    fn for_each_tap(&self, mut visit: impl FnMut(usize, usize)) {
        let plane = self.height * self.width;
        let image = self.channels * plane;
        let patch_len = self.patch_len();
        let pad = self.padding as isize;

        for n in 0..self.batch {
            for oh in 0..self.out_height {
                for ow in 0..self.out_width {
                    let row = (n * self.out_height + oh) * self.out_width + ow;
                    let mut col = 0;
                    for c in 0..self.channels {
                        for ki in 0..self.size {
                            for kj in 0..self.size {
                                let ih = (oh * self.stride + ki) as isize - pad;
                                let iw = (ow * self.stride + kj) as isize - pad;
                                if ih >= 0
                                    && iw >= 0
                                    && (ih as usize) < self.height
                                    && (iw as usize) < self.width
                                {
                                    let offset = n * image
                                        + c * plane
                                        + ih as usize * self.width
                                        + iw as usize;
                                    visit(row * patch_len + col, offset);
                                }
                                col += 1;
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Extracts every `size × size` window of `input` into a patch matrix.
///
/// `input` is `[C, H, W]` or `[N, C, H, W]`; the result is
/// `[N · out_h · out_w, C · size · size]`.
pub fn extract_patches(
    input: &TensorView<'_>,
    size: usize,
    stride: usize,
    padding: usize,
) -> Result<Tensor, TensorError> {
    let geometry = PatchGeometry::new(input.shape(), size, stride, padding)?;
    let mut patches = Tensor::zeros(geometry.patch_matrix_shape());
    let src = input.as_slice();
    let dst = patches.as_mut_slice();
    geometry.for_each_tap(|p, i| dst[p] = src[i]);
    Ok(patches)
}

/// Scatter-adds a patch matrix back into a zeroed tensor of shape `spatial`.
///
/// Where windows overlap, contributions are summed.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if `patches` is not the patch
/// matrix shape that [`extract_patches`] would produce for `spatial`.
pub fn accumulate_patches(
    patches: &TensorView<'_>,
    spatial: &Shape,
    size: usize,
    stride: usize,
    padding: usize,
) -> Result<Tensor, TensorError> {
    let geometry = PatchGeometry::new(spatial, size, stride, padding)?;
    let expected = geometry.patch_matrix_shape();
    if patches.shape() != &expected {
        return Err(TensorError::ShapeMismatch {
            op: "accumulate_patches",
            lhs: patches.shape().clone(),
            rhs: expected,
        });
    }
    let mut output = Tensor::zeros(spatial.clone());
    let src = patches.as_slice();
    let dst = output.as_mut_slice();
    geometry.for_each_tap(|p, i| dst[i] += src[p]);
    Ok(output)
}
