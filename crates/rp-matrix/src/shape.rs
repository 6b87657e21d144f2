use std::fmt;
use std::ops::Range;

use crate::error::{MatrixError, Result};

/// A two-dimensional matrix shape: `rows` x `cols`, row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    rows: usize,
    cols: usize,
}

impl Shape {
    /// Create a new shape.
    pub fn new(rows: usize, cols: usize) -> Self {
        Shape { rows, cols }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (the row width).
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.rows * self.cols
    }

    /// Flat element range covering rows `rows`.
    ///
    /// # Errors
    /// Returns `RowsOutOfBounds` if the range is inverted or extends past the
    /// last row.
    pub fn row_span(&self, rows: Range<usize>) -> Result<Range<usize>> {
        if rows.start > rows.end || rows.end > self.rows {
            return Err(MatrixError::RowsOutOfBounds {
                start: rows.start,
                end: rows.end,
                rows: self.rows,
            });
        }
        Ok(rows.start * self.cols..rows.end * self.cols)
    }

    /// Shape of the product `self @ other`.
    pub fn matmul_shape(&self, other: &Shape) -> Result<Shape> {
        if self.cols != other.rows {
            return Err(MatrixError::MatmulMismatch {
                m: self.rows,
                k: self.cols,
                k2: other.rows,
                n: other.cols,
            });
        }
        Ok(Shape::new(self.rows, other.cols))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}x{}]", self.rows, self.cols)
    }
}

impl From<(usize, usize)> for Shape {
    fn from((rows, cols): (usize, usize)) -> Self {
        Shape::new(rows, cols)
    }
}
