// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Broadcasting elementwise arithmetic and scaled accumulation.

use crate::{Tensor, TensorError, TensorView};

/// Binary operator applied elementwise by [`elementwise`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    #[inline]
    fn apply(self, a: f32, b: f32) -> f32 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
        }
    }

    fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
        }
    }
}

/// Combines `lhs` and `rhs` elementwise, broadcasting `rhs` into `lhs`.
///
/// Dimensions are aligned from the right; every extent of `rhs` must equal
/// the matching extent of `lhs` or be 1 (a missing leading dimension counts
/// as 1), and `rhs` is replicated along those dimensions. The result always
/// has `lhs`'s shape.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if `rhs` does not broadcast into
/// `lhs`, including pairs that would only broadcast to a larger shape such
/// as `[2, 1]` with `[1, 3]`.
pub fn elementwise(
    op: BinaryOp,
    lhs: &TensorView<'_>,
    rhs: &TensorView<'_>,
) -> Result<Tensor, TensorError> {
    let out_shape = lhs
        .shape()
        .broadcast_with(rhs.shape())
        .filter(|shape| shape == lhs.shape())
        .ok_or_else(|| TensorError::ShapeMismatch {
            op: op.name(),
            lhs: lhs.shape().clone(),
            rhs: rhs.shape().clone(),
        })?;

    let a = lhs.as_slice();
    let b = rhs.as_slice();

    // Same shape: plain zip.
    if lhs.shape() == rhs.shape() {
        let data = a.iter().zip(b).map(|(&x, &y)| op.apply(x, y)).collect();
        return Tensor::from_vec(out_shape, data);
    }

    let dims = out_shape.dims();
    let a_strides = lhs.shape().broadcast_strides(&out_shape);
    let b_strides = rhs.shape().broadcast_strides(&out_shape);
    let total = out_shape.num_elements();

    // Walk the output in row-major order with an odometer over `dims`,
    // advancing both source offsets by their (possibly zero) strides.
    let mut data = Vec::with_capacity(total);
    let mut index = vec![0usize; dims.len()];
    let (mut ai, mut bi) = (0usize, 0usize);
    for _ in 0..total {
        data.push(op.apply(a[ai], b[bi]));
        for d in (0..dims.len()).rev() {
            index[d] += 1;
            ai += a_strides[d];
            bi += b_strides[d];
            if index[d] < dims[d] {
                break;
            }
            ai -= a_strides[d] * dims[d];
            bi -= b_strides[d] * dims[d];
            index[d] = 0;
        }
    }

    Tensor::from_vec(out_shape, data)
}

/// `lhs + rhs` with broadcasting.
pub fn add(lhs: &TensorView<'_>, rhs: &TensorView<'_>) -> Result<Tensor, TensorError> {
    elementwise(BinaryOp::Add, lhs, rhs)
}

/// `lhs - rhs` with broadcasting.
pub fn sub(lhs: &TensorView<'_>, rhs: &TensorView<'_>) -> Result<Tensor, TensorError> {
    elementwise(BinaryOp::Sub, lhs, rhs)
}

/// `lhs * rhs` (elementwise) with broadcasting.
pub fn mul(lhs: &TensorView<'_>, rhs: &TensorView<'_>) -> Result<Tensor, TensorError> {
    elementwise(BinaryOp::Mul, lhs, rhs)
}

/// `lhs / rhs` (elementwise) with broadcasting.
pub fn div(lhs: &TensorView<'_>, rhs: &TensorView<'_>) -> Result<Tensor, TensorError> {
    elementwise(BinaryOp::Div, lhs, rhs)
}

/// Multiplies every element by `k`, returning a new tensor.
pub fn scale(k: f32, input: &TensorView<'_>) -> Tensor {
    let mut out = input.to_tensor();
    out.as_mut_slice().iter_mut().for_each(|x| *x *= k);
    out
}

/// `y ← y + alpha · x`, in place.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if `x` and `y` have different shapes.
pub fn axpy_inplace(alpha: f32, x: &TensorView<'_>, y: &mut Tensor) -> Result<(), TensorError> {
    if x.shape() != y.shape() {
        return Err(TensorError::ShapeMismatch {
            op: "axpy",
            lhs: x.shape().clone(),
            rhs: y.shape().clone(),
        });
    }
    for (dst, &src) in y.as_mut_slice().iter_mut().zip(x.as_slice()) {
        *dst += alpha * src;
    }
    Ok(())
}
