// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor arithmetic operations.
//!
//! Binary operations broadcast their operands and allocate a fresh result;
//! [`axpy_inplace`] and [`softmax`] write into a caller-provided tensor.

mod elementwise_op;
mod reduce_op;
mod softmax_op;

pub use elementwise_op::{add, axpy_inplace, div, elementwise, mul, scale, sub, BinaryOp};
pub use reduce_op::sum_dim;
pub use softmax_op::softmax;
