// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Core tensor type and view abstractions.

use crate::{Shape, TensorError};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

/// An owned, n-dimensional tensor of `f32` stored in contiguous memory.
///
/// The shape is fixed at construction; the contents are mutable. The buffer
/// length always equals `shape.num_elements()` (1 for a rank-0 scalar).
///
/// # Memory Layout
/// Data is stored in row-major (C) order as a flat `Vec<f32>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    data: Vec<f32>,
}

impl Tensor {
    /// Creates a new tensor filled with zeros.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Shape, Tensor};
    /// let t = Tensor::zeros(Shape::matrix(2, 3));
    /// assert_eq!(t.len(), 6);
    /// assert!(t.as_slice().iter().all(|&x| x == 0.0));
    /// ```
    pub fn zeros(shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        let data = vec![0.0; shape.num_elements()];
        Self { shape, data }
    }

    /// Creates a rank-0 tensor holding a single value.
    pub fn scalar(value: f32) -> Self {
        Self {
            shape: Shape::scalar(),
            data: vec![value],
        }
    }

    /// Creates a tensor that takes ownership of `data`.
    ///
    /// Returns an error if `data.len()` does not match the shape's element count.
    pub fn from_vec(shape: impl Into<Shape>, data: Vec<f32>) -> Result<Self, TensorError> {
        let shape = shape.into();
        let expected = shape.num_elements();
        if data.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Creates a tensor by copying a slice of `f32` values.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Shape, Tensor};
    /// let t = Tensor::from_f32(Shape::vector(3), &[1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(t.as_slice(), &[1.0, 2.0, 3.0]);
    /// ```
    pub fn from_f32(shape: impl Into<Shape>, values: &[f32]) -> Result<Self, TensorError> {
        Self::from_vec(shape, values.to_vec())
    }

    /// Creates a tensor with values drawn uniformly from `[-scale, scale]`.
    ///
    /// # Panics
    /// Panics if `scale` is NaN or infinite.
    pub fn random<R: Rng + ?Sized>(scale: f32, shape: impl Into<Shape>, rng: &mut R) -> Self {
        assert!(scale.is_finite(), "random scale must be finite, got {scale}");
        let shape = shape.into();
        let bound = scale.abs();
        let dist = Uniform::new_inclusive(-bound, bound);
        let data = (0..shape.num_elements()).map(|_| dist.sample(rng)).collect();
        Self { shape, data }
    }

    /// Like [`Tensor::random`], using a fresh generator seeded with `seed`.
    ///
    /// The same seed always produces the same tensor.
    ///
    /// # Panics
    /// Panics if `scale` is NaN or infinite.
    pub fn random_seeded(scale: f32, shape: impl Into<Shape>, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::random(scale, shape, &mut rng)
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// Returns the total element count (1 for a scalar).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if some dimension has extent 0.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns an immutable view over the whole tensor.
    pub fn view(&self) -> TensorView<'_> {
        TensorView {
            shape: self.shape.clone(),
            data: &self.data,
        }
    }

    /// Returns a mutable view over the whole tensor.
    pub fn view_mut(&mut self) -> TensorViewMut<'_> {
        TensorViewMut {
            shape: self.shape.clone(),
            data: &mut self.data,
        }
    }

    /// Returns a view of the sub-tensor at `index` along the leading dimension.
    ///
    /// # Errors
    /// Returns [`TensorError::IndexOutOfBounds`] for a scalar tensor or when
    /// `index >= shape[0]`.
    pub fn get(&self, index: usize) -> Result<TensorView<'_>, TensorError> {
        self.view().get(index)
    }

    /// Mutable counterpart of [`Tensor::get`].
    pub fn get_mut(&mut self, index: usize) -> Result<TensorViewMut<'_>, TensorError> {
        let (shape, range) = leading_slice("get_mut", &self.shape, index)?;
        Ok(TensorViewMut {
            shape,
            data: &mut self.data[range],
        })
    }

    /// Reinterprets the tensor under a new shape without copying.
    ///
    /// # Errors
    /// Returns [`TensorError::ShapeMismatch`] if the element counts differ.
    pub fn reshape(&self, shape: impl Into<Shape>) -> Result<TensorView<'_>, TensorError> {
        self.view().reshape(shape)
    }

    /// Consumes the tensor and returns it under a new shape without copying.
    pub fn into_shape(self, shape: impl Into<Shape>) -> Result<Tensor, TensorError> {
        let shape = shape.into();
        check_reshape(&self.shape, &shape)?;
        Ok(Tensor {
            shape,
            data: self.data,
        })
    }

    /// Returns the element at a full multi-dimensional index.
    pub fn at(&self, index: &[usize]) -> Result<f32, TensorError> {
        let offset = element_offset(&self.shape, index)?;
        Ok(self.data[offset])
    }

    /// Overwrites the element at a full multi-dimensional index.
    pub fn set(&mut self, index: &[usize], value: f32) -> Result<(), TensorError> {
        let offset = element_offset(&self.shape, index)?;
        self.data[offset] = value;
        Ok(())
    }

    /// Returns the flat row-major buffer.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Returns the flat row-major buffer mutably.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the tensor and returns its buffer.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Fills the tensor with a constant value.
    pub fn fill(&mut self, value: f32) {
        self.data.iter_mut().for_each(|x| *x = value);
    }

    /// Returns `true` if both tensors have the same shape and every pair of
    /// elements differs by less than `tolerance`.
    pub fn all_close(&self, other: &Tensor, tolerance: f32) -> bool {
        self.view().all_close(&other.view(), tolerance)
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.view(), f)
    }
}

/// A borrowed, read-only view over a [`Tensor`]'s data.
///
/// Views are zero-copy and tied to the lifetime of the source tensor,
/// enforced by the borrow checker.
#[derive(Debug, Clone)]
pub struct TensorView<'a> {
    shape: Shape,
    data: &'a [f32],
}

impl<'a> TensorView<'a> {
    /// Creates a view from raw parts.
    ///
    /// Returns an error if `data.len()` does not match the shape.
    pub fn from_parts(shape: impl Into<Shape>, data: &'a [f32]) -> Result<Self, TensorError> {
        let shape = shape.into();
        if data.len() != shape.num_elements() {
            return Err(TensorError::BufferSizeMismatch {
                expected: shape.num_elements(),
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Returns the shape of the viewed data.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// Returns the total element count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the view holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the viewed elements in row-major order.
    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }

    /// Returns the sub-view at `index` along the leading dimension.
    pub fn get(&self, index: usize) -> Result<TensorView<'a>, TensorError> {
        let (shape, range) = leading_slice("get", &self.shape, index)?;
        Ok(TensorView {
            shape,
            data: &self.data[range],
        })
    }

    /// Reinterprets the view under a new shape with the same element count.
    pub fn reshape(&self, shape: impl Into<Shape>) -> Result<TensorView<'a>, TensorError> {
        let shape = shape.into();
        check_reshape(&self.shape, &shape)?;
        Ok(TensorView {
            shape,
            data: self.data,
        })
    }

    /// Copies the viewed data into a new, independent tensor.
    pub fn to_tensor(&self) -> Tensor {
        Tensor {
            shape: self.shape.clone(),
            data: self.data.to_vec(),
        }
    }

    /// Shape-and-value comparison with an absolute tolerance.
    pub fn all_close(&self, other: &TensorView<'_>, tolerance: f32) -> bool {
        self.shape == other.shape
            && self
                .data
                .iter()
                .zip(other.data)
                .all(|(a, b)| (a - b).abs() < tolerance)
    }
}

impl fmt::Display for TensorView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_nested(f, self.shape.dims(), self.data, 0)
    }
}

/// A borrowed, mutable view over part of a [`Tensor`].
#[derive(Debug)]
pub struct TensorViewMut<'a> {
    shape: Shape,
    data: &'a mut [f32],
}

impl TensorViewMut<'_> {
    /// Returns the shape of the viewed data.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the viewed elements in row-major order.
    pub fn as_slice(&self) -> &[f32] {
        &*self.data
    }

    /// Returns the viewed elements mutably.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut *self.data
    }

    /// Overwrites the viewed elements with the contents of `src`.
    ///
    /// # Errors
    /// Returns [`TensorError::BufferSizeMismatch`] if the element counts differ.
    /// Shapes only need to agree in element count.
    pub fn copy_from(&mut self, src: &TensorView<'_>) -> Result<(), TensorError> {
        if src.len() != self.data.len() {
            return Err(TensorError::BufferSizeMismatch {
                expected: self.data.len(),
                actual: src.len(),
            });
        }
        self.data.copy_from_slice(src.as_slice());
        Ok(())
    }
}

fn leading_slice(
    op: &'static str,
    shape: &Shape,
    index: usize,
) -> Result<(Shape, std::ops::Range<usize>), TensorError> {
    let extent = shape.dim(0).unwrap_or(0);
    if index >= extent {
        return Err(TensorError::IndexOutOfBounds { op, index, extent });
    }
    let sub = shape.without_leading();
    let step = sub.num_elements();
    Ok((sub, index * step..(index + 1) * step))
}

fn check_reshape(from: &Shape, to: &Shape) -> Result<(), TensorError> {
    if from.num_elements() != to.num_elements() {
        return Err(TensorError::ShapeMismatch {
            op: "reshape",
            lhs: from.clone(),
            rhs: to.clone(),
        });
    }
    Ok(())
}

fn element_offset(shape: &Shape, index: &[usize]) -> Result<usize, TensorError> {
    if index.len() != shape.rank() {
        return Err(TensorError::RankMismatch {
            op: "element access",
            expected: shape.rank(),
            actual: index.len(),
        });
    }
    shape.offset(index).ok_or_else(|| {
        let (index, extent) = index
            .iter()
            .zip(shape.dims())
            .map(|(&i, &d)| (i, d))
            .find(|&(i, d)| i >= d)
            .unwrap_or((0, 0));
        TensorError::IndexOutOfBounds {
            op: "element access",
            index,
            extent,
        }
    })
}

fn write_nested(
    f: &mut fmt::Formatter<'_>,
    dims: &[usize],
    data: &[f32],
    depth: usize,
) -> fmt::Result {
    let Some((&extent, rest)) = dims.split_first() else {
        return write!(f, "{:.4}", data[0]);
    };
    let step: usize = rest.iter().product();
    write!(f, "[")?;
    for i in 0..extent {
        if i > 0 {
            if rest.is_empty() {
                write!(f, ", ")?;
            } else {
                write!(f, ",\n{:indent$}", "", indent = depth + 1)?;
            }
        }
        write_nested(f, rest, &data[i * step..(i + 1) * step], depth + 1)?;
    }
    write!(f, "]")
}
