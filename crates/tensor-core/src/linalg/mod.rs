// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Linear algebra kernels on rank-2 tensors.

mod invert;
mod matmul;
mod transpose;

pub use invert::{augment, invert, solve_system};
pub use matmul::matmul;
pub use transpose::transpose;

use crate::{TensorError, TensorView};

fn require_matrix(op: &'static str, input: &TensorView<'_>) -> Result<(), TensorError> {
    if input.rank() != 2 {
        return Err(TensorError::RankMismatch {
            op,
            expected: 2,
            actual: input.rank(),
        });
    }
    Ok(())
}
