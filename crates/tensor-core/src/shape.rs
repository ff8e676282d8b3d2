// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor shape descriptors and dimension utilities.

use std::fmt;

/// Describes the dimensionality of a [`crate::Tensor`].
///
/// Shapes are immutable once created and provide convenience methods for
/// computing strides, linear offsets, total element counts, and
/// broadcasting compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a new shape from the given dimensions.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![2, 3, 4]);
    /// assert_eq!(s.rank(), 3);
    /// assert_eq!(s.num_elements(), 24);
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// Creates a scalar shape (rank 0).
    pub fn scalar() -> Self {
        Self { dims: vec![] }
    }

    /// Creates a 1-D shape.
    pub fn vector(len: usize) -> Self {
        Self { dims: vec![len] }
    }

    /// Creates a 2-D shape (matrix).
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self {
            dims: vec![rows, cols],
        }
    }

    /// Returns the number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the total number of elements.
    ///
    /// For a scalar shape (rank 0), returns 1.
    pub fn num_elements(&self) -> usize {
        if self.dims.is_empty() {
            1
        } else {
            self.dims.iter().product()
        }
    }

    /// Returns the dimensions as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the size of a specific dimension, or `None` if out of bounds.
    pub fn dim(&self, index: usize) -> Option<usize> {
        self.dims.get(index).copied()
    }

    /// Computes row-major (C-order) strides for this shape.
    ///
    /// The stride for dimension `i` is the number of elements to skip
    /// in the flat buffer to advance one step along that dimension.
    pub fn strides(&self) -> Vec<usize> {
        let rank = self.dims.len();
        if rank == 0 {
            return vec![];
        }
        let mut strides = vec![0usize; rank];
        strides[rank - 1] = 1;
        for i in (0..rank - 1).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }

    /// Maps a multi-dimensional index to its offset in the row-major buffer.
    ///
    /// Returns `None` if the index has the wrong rank or any coordinate is
    /// outside its dimension.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![2, 3, 4]);
    /// assert_eq!(s.offset(&[1, 2, 3]), Some(23));
    /// assert_eq!(s.offset(&[2, 0, 0]), None);
    /// ```
    pub fn offset(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.dims.len() {
            return None;
        }
        let mut offset = 0usize;
        for (&i, &d) in index.iter().zip(&self.dims) {
            if i >= d {
                return None;
            }
            offset = offset * d + i;
        }
        Some(offset)
    }

    /// Returns the shape with the leading dimension removed.
    ///
    /// A scalar shape stays scalar.
    pub fn without_leading(&self) -> Shape {
        Shape::new(self.dims.iter().skip(1).copied().collect())
    }

    /// Returns the shape with `extent` prepended as a new leading dimension.
    pub fn with_leading(&self, extent: usize) -> Shape {
        let mut dims = Vec::with_capacity(self.dims.len() + 1);
        dims.push(extent);
        dims.extend_from_slice(&self.dims);
        Shape::new(dims)
    }

    /// Returns `true` if two shapes are broadcast-compatible.
    ///
    /// Shapes are compatible when, aligning dimensions from the right,
    /// each pair is either equal or one of them is 1. The relation is
    /// symmetric.
    pub fn is_broadcast_compatible(&self, other: &Shape) -> bool {
        let a = &self.dims;
        let b = &other.dims;
        let mut ai = a.len();
        let mut bi = b.len();
        while ai > 0 && bi > 0 {
            ai -= 1;
            bi -= 1;
            if a[ai] != b[bi] && a[ai] != 1 && b[bi] != 1 {
                return false;
            }
        }
        true
    }

    /// Computes the shape produced by broadcasting `self` against `other`,
    /// or `None` if the shapes are incompatible.
    ///
    /// When `other` fits into `self` (every aligned extent equal or 1), the
    /// result is `self`.
    pub fn broadcast_with(&self, other: &Shape) -> Option<Shape> {
        if !self.is_broadcast_compatible(other) {
            return None;
        }
        let rank = self.rank().max(other.rank());
        let lhs_pad = rank - self.rank();
        let rhs_pad = rank - other.rank();
        let dims = (0..rank)
            .map(|i| {
                let l = if i < lhs_pad { 1 } else { self.dims[i - lhs_pad] };
                let r = if i < rhs_pad { 1 } else { other.dims[i - rhs_pad] };
                if l == 1 {
                    r
                } else {
                    l
                }
            })
            .collect();
        Some(Shape::new(dims))
    }

    /// Strides for reading this shape as if it were broadcast to `target`.
    ///
    /// The returned vector has `target.rank()` entries; dimensions that are
    /// absent or singleton in `self` get stride 0 so the same element is
    /// replicated along them. `target` must be a broadcast of `self`.
    pub fn broadcast_strides(&self, target: &Shape) -> Vec<usize> {
        let own = self.strides();
        let pad = target.rank().saturating_sub(self.rank());
        (0..target.rank())
            .map(|i| {
                if i < pad || self.dims[i - pad] == 1 {
                    0
                } else {
                    own[i - pad]
                }
            })
            .collect()
    }

    /// Returns `true` if the shapes are compatible for a matrix multiply:
    /// `self` is `[M, K]` and `other` is `[K, N]`.
    pub fn is_matmul_compatible(&self, other: &Shape) -> bool {
        self.rank() == 2 && other.rank() == 2 && self.dims[1] == other.dims[0]
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

/// Convenience: `Shape::from(vec![2, 3])`.
impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

/// Convenience: `Shape::from(&[2, 3][..])`.
impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.to_vec())
    }
}

/// Convenience: `Shape::from([2, 3])`.
impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self::new(dims.to_vec())
    }
}
