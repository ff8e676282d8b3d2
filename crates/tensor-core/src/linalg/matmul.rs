// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Matrix multiplication.

use crate::{Shape, Tensor, TensorError, TensorView};

/// Performs matrix multiplication: `lhs @ rhs`.
///
/// Both inputs must be 2-D with compatible inner dimensions: `lhs` is
/// `[M, K]`, `rhs` is `[K, N]`, and the result is `[M, N]` with
/// `C[i, j] = Σ_k A[i, k] · B[k, j]`.
///
/// # Errors
/// Returns [`TensorError::RankMismatch`] if either input is not 2-D.
/// Returns [`TensorError::ShapeMismatch`] if the inner dimensions differ.
pub fn matmul(lhs: &TensorView<'_>, rhs: &TensorView<'_>) -> Result<Tensor, TensorError> {
    super::require_matrix("matmul", lhs)?;
    super::require_matrix("matmul", rhs)?;

    if !lhs.shape().is_matmul_compatible(rhs.shape()) {
        return Err(TensorError::ShapeMismatch {
            op: "matmul",
            lhs: lhs.shape().clone(),
            rhs: rhs.shape().clone(),
        });
    }

    let lhs_dims = lhs.shape().dims();
    let rhs_dims = rhs.shape().dims();
    let (m, k, n) = (lhs_dims[0], lhs_dims[1], rhs_dims[1]);

    let mut output = Tensor::zeros(Shape::matrix(m, n));
    matmul_f32_generic(lhs.as_slice(), rhs.as_slice(), output.as_mut_slice(), m, k, n);
    Ok(output)
}

/// Generic (portable) f32 matrix multiplication into a zeroed `c`.
///
/// Uses an ikj loop order so the inner loop is a saxpy over a row of `b`
/// and a row of `c`, both sequential in memory.
fn matmul_f32_generic(a: &[f32], b: &[f32], c: &mut [f32], m: usize, k: usize, n: usize) {
    for i in 0..m {
        let c_row = &mut c[i * n..(i + 1) * n];
        for p in 0..k {
            let a_ip = a[i * k + p];
            let b_row = &b[p * n..(p + 1) * n];
            for (c_ij, &b_pj) in c_row.iter_mut().zip(b_row) {
                *c_ij += a_ip * b_pj;
            }
        }
    }
}
