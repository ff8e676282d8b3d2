// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Matrix transpose.

use crate::{Shape, Tensor, TensorError, TensorView};

/// Returns a new `[cols, rows]` matrix with `T[j, i] = M[i, j]`.
///
/// # Errors
/// Returns [`TensorError::RankMismatch`] if `input` is not 2-D.
pub fn transpose(input: &TensorView<'_>) -> Result<Tensor, TensorError> {
    super::require_matrix("transpose", input)?;
    let dims = input.shape().dims();
    let (rows, cols) = (dims[0], dims[1]);

    let mut output = Tensor::zeros(Shape::matrix(cols, rows));
    let src = input.as_slice();
    let dst = output.as_mut_slice();
    for i in 0..rows {
        for j in 0..cols {
            dst[j * rows + i] = src[i * cols + j];
        }
    }
    Ok(output)
}
