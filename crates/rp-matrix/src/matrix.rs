use std::ops::Range;

use crate::backend::ComputeBackend;
use crate::element::Element;
use crate::error::{MatrixError, Result};
use crate::shape::Shape;

/// A dense, row-major matrix.
///
/// Operations that require computation are dispatched to a `ComputeBackend`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    data: Vec<T>,
    shape: Shape,
}

impl<T: Element> Matrix<T> {
    /// Create a matrix from row-major data.
    ///
    /// # Errors
    /// Returns `LengthMismatch` if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        let shape = Shape::new(rows, cols);
        if data.len() != shape.numel() {
            return Err(MatrixError::LengthMismatch {
                what: "matrix data",
                expected: shape.numel(),
                got: data.len(),
            });
        }
        Ok(Matrix { data, shape })
    }

    /// Create a zero-filled matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix {
            data: vec![T::zero(); rows * cols],
            shape: Shape::new(rows, cols),
        }
    }

    /// Create a matrix by evaluating `f(row, col)` for every element, in
    /// row-major order.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Matrix {
            data,
            shape: Shape::new(rows, cols),
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn rows(&self) -> usize {
        self.shape.rows()
    }

    pub fn cols(&self) -> usize {
        self.shape.cols()
    }

    /// True if the matrix holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major element data.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Copy rows `rows` into a new matrix of shape `[rows.len() x cols]`.
    pub fn row_block(&self, rows: Range<usize>) -> Result<Matrix<T>> {
        let span = self.shape.row_span(rows.clone())?;
        Ok(Matrix {
            data: self.data[span].to_vec(),
            shape: Shape::new(rows.end - rows.start, self.cols()),
        })
    }

    /// Overwrite rows starting at `start` with the rows of `block`.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if `block` has a different width, or
    /// `RowsOutOfBounds` if it does not fit below `start`.
    pub fn write_rows(&mut self, start: usize, block: &Matrix<T>) -> Result<()> {
        if block.cols() != self.cols() {
            return Err(MatrixError::ShapeMismatch {
                expected: Shape::new(block.rows(), self.cols()),
                got: block.shape(),
            });
        }
        let span = self.shape.row_span(start..start + block.rows())?;
        self.data[span].copy_from_slice(&block.data);
        Ok(())
    }

    /// Matrix product `self @ other` using the given backend.
    ///
    /// self is [m, k], other is [k, n], result is [m, n].
    pub fn matmul<B: ComputeBackend>(
        &self,
        other: &Matrix<T>,
        backend: &B,
    ) -> Result<Matrix<T>> {
        let out = self.shape.matmul_shape(&other.shape)?;
        let data = backend.matmul(
            &self.data,
            &other.data,
            self.rows(),
            self.cols(),
            other.cols(),
        )?;
        Matrix::from_vec(out.rows(), out.cols(), data)
    }

    /// Element-wise comparison with a tolerance for inexact dtypes.
    /// Matrices of different shapes are never equal.
    pub fn approx_eq(&self, other: &Matrix<T>, tolerance: f64) -> bool {
        self.shape == other.shape
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(&a, &b)| T::approx_eq(a, b, tolerance))
    }
}
