// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Lightweight `f32` tensors and the numeric kernels that neural-network
//! layers are built from.
//!
//! This crate provides:
//! - [`Tensor`]: an owned, row-major n-dimensional array, with borrowed
//!   [`TensorView`] / [`TensorViewMut`] sub-views.
//! - [`Shape`]: extents, strides, linear offsets and broadcasting rules.
//! - [`ops`]: broadcasting elementwise arithmetic, `axpy`, `sum_dim`, softmax.
//! - [`linalg`]: transpose, matrix multiply, Gauss-Jordan inversion and
//!   normal-equation least squares on rank-2 tensors.
//! - [`patch`]: im2col / col2im, so convolution becomes a matrix product.
//!
//! # Design Goals
//! - Zero-copy views wherever possible; the borrow checker keeps a view
//!   from outliving its tensor.
//! - Shape misuse fails fast with a typed [`TensorError`]; a singular matrix
//!   is a checkable `Ok(None)` rather than an error.
//! - Clean error types via `thiserror`.

mod error;
pub mod linalg;
pub mod ops;
pub mod patch;
mod shape;
mod tensor;

pub use error::TensorError;
pub use shape::Shape;
pub use tensor::{Tensor, TensorView, TensorViewMut};
