// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reductions along a single dimension.

use crate::{Shape, Tensor, TensorError, TensorView};

/// Sums `input` along dimension `axis`, keeping that dimension with extent 1.
///
/// A `[3, 2, 5]` tensor reduced over axis 1 yields `[3, 1, 5]`.
///
/// # Errors
/// Returns [`TensorError::AxisOutOfBounds`] if `axis >= input.rank()`.
pub fn sum_dim(input: &TensorView<'_>, axis: usize) -> Result<Tensor, TensorError> {
    let dims = input.shape().dims();
    if axis >= dims.len() {
        return Err(TensorError::AxisOutOfBounds {
            op: "sum_dim",
            axis,
            rank: dims.len(),
        });
    }

    let outer: usize = dims[..axis].iter().product();
    let extent = dims[axis];
    let inner: usize = dims[axis + 1..].iter().product();

    let mut out_dims = dims.to_vec();
    out_dims[axis] = 1;
    let mut out = Tensor::zeros(Shape::new(out_dims));

    let src = input.as_slice();
    let dst = out.as_mut_slice();
    for o in 0..outer {
        let dst_row = &mut dst[o * inner..(o + 1) * inner];
        for k in 0..extent {
            let start = (o * extent + k) * inner;
            for (d, &s) in dst_row.iter_mut().zip(&src[start..start + inner]) {
                *d += s;
            }
        }
    }

    Ok(out)
}
