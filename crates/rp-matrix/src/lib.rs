//! `rp-matrix` - Dense matrices and local kernels for rowpar.
//!
//! This crate provides:
//! - A row-major `Matrix<T>` generic over the supported element types
//! - A `ComputeBackend` trait for local products, with a reference `CpuBackend`
//! - `AnyMatrix`, a dtype-erased matrix for callers that pick the type at runtime
//! - A seeded `Generator` for operands and zero-filled receive buffers
//! - Data type definitions (int32, boolean, float64)

pub mod any;
pub mod backend;
pub mod cpu;
pub mod dtype;
pub mod element;
pub mod error;
pub mod generate;
pub mod matrix;
pub mod shape;

// Re-export primary types at the crate root for convenience.
pub use any::AnyMatrix;
pub use backend::ComputeBackend;
pub use cpu::CpuBackend;
pub use dtype::DType;
pub use element::Element;
pub use error::{MatrixError, Result};
pub use generate::{generate_empty, Generator, MatrixKind};
pub use matrix::Matrix;
pub use shape::Shape;
