// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Gauss-Jordan inversion and normal-equation least squares.
//!
//! Singularity is a legitimate outcome here, not a programmer error, so it
//! is reported as `Ok(None)`. `Err` is reserved for shape misuse.

use super::{matmul, require_matrix, transpose};
use crate::{Shape, Tensor, TensorError, TensorView};

/// Concatenates `input` with the identity matrix of matching row count:
/// `[rows, cols]` becomes `[rows, cols + rows]`.
pub fn augment(input: &TensorView<'_>) -> Result<Tensor, TensorError> {
    require_matrix("augment", input)?;
    let dims = input.shape().dims();
    let (rows, cols) = (dims[0], dims[1]);
    let width = cols + rows;

    let mut output = Tensor::zeros(Shape::matrix(rows, width));
    let src = input.as_slice();
    let dst = output.as_mut_slice();
    for i in 0..rows {
        dst[i * width..i * width + cols].copy_from_slice(&src[i * cols..(i + 1) * cols]);
        dst[i * width + cols + i] = 1.0;
    }
    Ok(output)
}

/// Inverts a square matrix by Gauss-Jordan elimination with partial pivoting.
///
/// Returns `Ok(None)` when some pivot column has no nonzero entry at or
/// below the diagonal.
///
/// # Errors
/// Returns [`TensorError::RankMismatch`] or [`TensorError::ShapeMismatch`]
/// if `input` is not a square matrix.
pub fn invert(input: &TensorView<'_>) -> Result<Option<Tensor>, TensorError> {
    require_matrix("invert", input)?;
    let n = input.shape().dims()[0];
    if input.shape().dims()[1] != n {
        return Err(TensorError::ShapeMismatch {
            op: "invert",
            lhs: input.shape().clone(),
            rhs: Shape::matrix(n, n),
        });
    }

    let width = 2 * n;
    let mut c = augment(input)?.into_vec();
    // rows[k] is the buffer row currently holding logical row k; pivoting
    // swaps entries here instead of moving data.
    let mut rows: Vec<usize> = (0..n).collect();

    for k in 0..n {
        let mut best = 0.0f32;
        let mut pivot = None;
        for (i, &r) in rows.iter().enumerate().skip(k) {
            let val = c[r * width + k].abs();
            if val > best {
                best = val;
                pivot = Some(i);
            }
        }
        let Some(p) = pivot else {
            tracing::warn!(column = k, "no nonzero pivot, matrix is singular");
            return Ok(None);
        };
        rows.swap(p, k);

        let rk = rows[k] * width;
        let val = c[rk + k];
        c[rk + k] = 1.0;
        for j in k + 1..width {
            c[rk + j] /= val;
        }
        for &r in &rows[k + 1..] {
            eliminate(&mut c, r * width, rk, k, width);
        }
    }

    for k in (1..n).rev() {
        let rk = rows[k] * width;
        for &r in &rows[..k] {
            eliminate(&mut c, r * width, rk, k, width);
        }
    }

    let mut inverse = Tensor::zeros(Shape::matrix(n, n));
    let dst = inverse.as_mut_slice();
    for (i, &r) in rows.iter().enumerate() {
        dst[i * n..(i + 1) * n].copy_from_slice(&c[r * width + n..(r + 1) * width]);
    }
    Ok(Some(inverse))
}

/// Subtracts `c[ri + k]` times the pivot row `rk` from row `ri`, zeroing column `k`.
fn eliminate(c: &mut [f32], ri: usize, rk: usize, k: usize, width: usize) {
    let s = -c[ri + k];
    c[ri + k] = 0.0;
    for j in k + 1..width {
        let delta = s * c[rk + j];
        c[ri + j] += delta;
    }
}

/// Least-squares solution of `M · a = b` via the normal equations
/// `a = (MᵀM)⁻¹ Mᵀ b`.
///
/// Squaring the condition number makes this weaker than QR or SVD based
/// solvers on ill-conditioned systems.
///
/// Returns `Ok(None)` if `MᵀM` is singular.
pub fn solve_system(m: &TensorView<'_>, b: &TensorView<'_>) -> Result<Option<Tensor>, TensorError> {
    let mt = transpose(m)?;
    let mtm = matmul(&mt.view(), m)?;
    let Some(mtm_inv) = invert(&mtm.view())? else {
        return Ok(None);
    };
    let pseudo_inverse = matmul(&mtm_inv.view(), &mt.view())?;
    matmul(&pseudo_inverse.view(), b).map(Some)
}
