// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor operations.

use crate::Shape;

/// Errors that can occur during tensor operations.
///
/// Every variant is a programmer error (incompatible shapes, out-of-range
/// indices, bad arguments). A singular matrix is *not* an error: see
/// [`crate::linalg::invert`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TensorError {
    /// The provided buffer length does not match the element count of the shape.
    #[error("buffer size mismatch: expected {expected} elements, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Two tensors have incompatible shapes for the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// The operation requires a tensor of a specific rank.
    #[error("{op} expects rank {expected}, got rank {actual}")]
    RankMismatch {
        op: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A leading-dimension index is outside `0..extent`.
    #[error("index {index} out of bounds for {op} (extent {extent})")]
    IndexOutOfBounds {
        op: &'static str,
        index: usize,
        extent: usize,
    },

    /// A dimension (axis) argument is not smaller than the tensor rank.
    #[error("axis {axis} out of bounds for {op} on rank {rank} tensor")]
    AxisOutOfBounds {
        op: &'static str,
        axis: usize,
        rank: usize,
    },

    /// A scalar argument (window size, stride, ...) is invalid.
    #[error("invalid argument for {op}: {detail}")]
    InvalidArgument { op: &'static str, detail: String },
}

impl TensorError {
    /// Returns `true` for rank or extent mismatches.
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            Self::BufferSizeMismatch { .. } | Self::ShapeMismatch { .. } | Self::RankMismatch { .. }
        )
    }

    /// Returns `true` for out-of-range index or axis accesses.
    pub fn is_index_error(&self) -> bool {
        matches!(
            self,
            Self::IndexOutOfBounds { .. } | Self::AxisOutOfBounds { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let shape = TensorError::ShapeMismatch {
            op: "add",
            lhs: Shape::vector(3),
            rhs: Shape::vector(4),
        };
        assert!(shape.is_shape_error());
        assert!(!shape.is_index_error());

        let index = TensorError::IndexOutOfBounds {
            op: "get",
            index: 5,
            extent: 2,
        };
        assert!(index.is_index_error());
        assert!(!index.is_shape_error());
    }

    #[test]
    fn test_display() {
        let e = TensorError::ShapeMismatch {
            op: "matmul",
            lhs: Shape::matrix(2, 3),
            rhs: Shape::matrix(4, 2),
        };
        assert_eq!(e.to_string(), "incompatible shapes for matmul: [2, 3] vs [4, 2]");
    }
}
