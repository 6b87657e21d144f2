use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::any::AnyMatrix;
use crate::cpu::CpuBackend;
use crate::dtype::DType;
use crate::element::Element;
use crate::error::{MatrixError, Result};
use crate::matrix::Matrix;
use crate::shape::Shape;

/// The family of operand matrices to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatrixKind {
    /// Independent uniform elements: int32 in [1, 100], bool with p = 0.5,
    /// float in [0, 1).
    #[default]
    Uniform,
    /// Graph adjacency counts (int32 only): 70% of entries are 0, 15% are 1,
    /// 10% are 2 and 5% are 3.
    Adjacency,
    /// Square float matrix `R @ S`, where `R` and `S` are the same uniform
    /// draw normalised by rows and by columns respectively.
    Stochastic,
}

impl MatrixKind {
    /// Check that a `rows` x `cols` matrix of this kind can be generated
    /// with element type `dtype`.
    ///
    /// # Errors
    /// `UnsupportedKind` for a dtype the kind is not defined over, and
    /// `NotSquare` for a non-square stochastic matrix.
    pub fn check(self, dtype: DType, rows: usize, cols: usize) -> Result<()> {
        let supported = match self {
            MatrixKind::Uniform => true,
            MatrixKind::Adjacency => dtype == DType::I32,
            MatrixKind::Stochastic => dtype == DType::F64,
        };
        if !supported {
            return Err(MatrixError::UnsupportedKind { kind: self, dtype });
        }
        if self == MatrixKind::Stochastic && rows != cols {
            return Err(MatrixError::NotSquare {
                kind: self,
                shape: Shape::new(rows, cols),
            });
        }
        Ok(())
    }
}

impl fmt::Display for MatrixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatrixKind::Uniform => write!(f, "uniform"),
            MatrixKind::Adjacency => write!(f, "adjacency"),
            MatrixKind::Stochastic => write!(f, "stochastic"),
        }
    }
}

impl FromStr for MatrixKind {
    type Err = MatrixError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uniform" => Ok(MatrixKind::Uniform),
            "adjacency" => Ok(MatrixKind::Adjacency),
            "stochastic" => Ok(MatrixKind::Stochastic),
            _ => Err(MatrixError::UnknownKind(s.to_string())),
        }
    }
}

/// Seeded generator for operand matrices.
///
/// Two generators built from the same seed produce the same sequence of
/// matrices, so a run is reproducible end to end.
pub struct Generator {
    rng: StdRng,
}

impl Generator {
    /// Create a new generator with the given seed for reproducibility.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate a `rows` x `cols` matrix of the given kind.
    ///
    /// # Errors
    /// Fails as [`MatrixKind::check`] does, before drawing anything.
    pub fn generate<T: Element>(
        &mut self,
        rows: usize,
        cols: usize,
        kind: MatrixKind,
    ) -> Result<Matrix<T>> {
        kind.check(T::DTYPE, rows, cols)?;
        match kind {
            MatrixKind::Uniform => Ok(Matrix::from_fn(rows, cols, |_, _| {
                T::random(&mut self.rng)
            })),
            MatrixKind::Adjacency => AnyMatrix::I32(self.adjacency(rows, cols)).into_typed(),
            MatrixKind::Stochastic => AnyMatrix::F64(self.stochastic(rows)?).into_typed(),
        }
    }

    /// Generate a matrix whose dtype is chosen at runtime.
    pub fn generate_any(
        &mut self,
        rows: usize,
        cols: usize,
        dtype: DType,
        kind: MatrixKind,
    ) -> Result<AnyMatrix> {
        Ok(match dtype {
            DType::I32 => self.generate::<i32>(rows, cols, kind)?.into(),
            DType::Bool => self.generate::<bool>(rows, cols, kind)?.into(),
            DType::F64 => self.generate::<f64>(rows, cols, kind)?.into(),
        })
    }

    fn adjacency(&mut self, rows: usize, cols: usize) -> Matrix<i32> {
        Matrix::from_fn(rows, cols, |_, _| match self.rng.gen_range(1..=100) {
            1..=69 => 0,
            70..=84 => 1,
            85..=94 => 2,
            _ => 3,
        })
    }

    fn stochastic(&mut self, dim: usize) -> Result<Matrix<f64>> {
        let draw = Matrix::from_fn(dim, dim, |_, _| f64::random(&mut self.rng));
        let by_rows = normalize_rows(&draw);
        let by_cols = normalize_cols(&draw);
        by_rows.matmul(&by_cols, &CpuBackend::new())
    }
}

/// Scale every row to sum to one. All-zero rows are left as they are.
fn normalize_rows(m: &Matrix<f64>) -> Matrix<f64> {
    let sums: Vec<f64> = m.data().chunks(m.cols().max(1)).map(|r| r.iter().sum()).collect();
    Matrix::from_fn(m.rows(), m.cols(), |i, j| {
        scale(m.data()[i * m.cols() + j], sums[i])
    })
}

/// Scale every column to sum to one. All-zero columns are left as they are.
fn normalize_cols(m: &Matrix<f64>) -> Matrix<f64> {
    let mut sums = vec![0.0; m.cols()];
    for row in m.data().chunks(m.cols().max(1)) {
        for (sum, v) in sums.iter_mut().zip(row) {
            *sum += v;
        }
    }
    Matrix::from_fn(m.rows(), m.cols(), |i, j| {
        scale(m.data()[i * m.cols() + j], sums[j])
    })
}

fn scale(v: f64, total: f64) -> f64 {
    if total == 0.0 {
        v
    } else {
        v / total
    }
}

/// A zero-filled matrix, used as a receive buffer.
pub fn generate_empty(rows: usize, cols: usize, dtype: DType) -> AnyMatrix {
    AnyMatrix::zeros(dtype, rows, cols)
}
