use thiserror::Error;

use crate::dtype::DType;
use crate::generate::MatrixKind;
use crate::shape::Shape;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatrixError {
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: Shape, got: Shape },
    #[error("dtype mismatch: expected {expected}, got {got}")]
    DTypeMismatch { expected: DType, got: DType },
    #[error("matmul dimension mismatch: [{m}x{k}] @ [{k2}x{n}]")]
    MatmulMismatch {
        m: usize,
        k: usize,
        k2: usize,
        n: usize,
    },
    #[error("{what}: buffer holds {got} elements, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("rows {start}..{end} out of bounds for matrix with {rows} rows")]
    RowsOutOfBounds {
        start: usize,
        end: usize,
        rows: usize,
    },
    #[error("{kind} matrices cannot be generated with dtype {dtype}")]
    UnsupportedKind { kind: MatrixKind, dtype: DType },
    #[error("{kind} matrices must be square, got {shape}")]
    NotSquare { kind: MatrixKind, shape: Shape },
    #[error("unknown dtype: {0}")]
    UnknownDType(String),
    #[error("unknown matrix kind: {0}")]
    UnknownKind(String),
}

pub type Result<T> = std::result::Result<T, MatrixError>;
