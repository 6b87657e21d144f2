use crate::dtype::DType;
use crate::element::Element;
use crate::error::{MatrixError, Result};
use crate::matrix::Matrix;
use crate::shape::Shape;

/// A matrix whose element type is chosen at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyMatrix {
    I32(Matrix<i32>),
    Bool(Matrix<bool>),
    F64(Matrix<f64>),
}

impl AnyMatrix {
    /// Create a zero-filled matrix of the given dtype.
    pub fn zeros(dtype: DType, rows: usize, cols: usize) -> Self {
        match dtype {
            DType::I32 => AnyMatrix::I32(Matrix::zeros(rows, cols)),
            DType::Bool => AnyMatrix::Bool(Matrix::zeros(rows, cols)),
            DType::F64 => AnyMatrix::F64(Matrix::zeros(rows, cols)),
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            AnyMatrix::I32(_) => DType::I32,
            AnyMatrix::Bool(_) => DType::Bool,
            AnyMatrix::F64(_) => DType::F64,
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            AnyMatrix::I32(m) => m.shape(),
            AnyMatrix::Bool(m) => m.shape(),
            AnyMatrix::F64(m) => m.shape(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shape().numel() == 0
    }

    /// Unwrap into a typed matrix.
    ///
    /// # Errors
    /// Returns `DTypeMismatch` if the stored dtype is not `T::DTYPE`.
    pub fn into_typed<T: Element>(self) -> Result<Matrix<T>> {
        let got = self.dtype();
        T::from_any(self).ok_or(MatrixError::DTypeMismatch {
            expected: T::DTYPE,
            got,
        })
    }
}

impl From<Matrix<i32>> for AnyMatrix {
    fn from(m: Matrix<i32>) -> Self {
        AnyMatrix::I32(m)
    }
}

impl From<Matrix<bool>> for AnyMatrix {
    fn from(m: Matrix<bool>) -> Self {
        AnyMatrix::Bool(m)
    }
}

impl From<Matrix<f64>> for AnyMatrix {
    fn from(m: Matrix<f64>) -> Self {
        AnyMatrix::F64(m)
    }
}
