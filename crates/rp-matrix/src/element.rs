use std::fmt::Debug;

use rand::Rng;

use crate::any::AnyMatrix;
use crate::dtype::DType;
use crate::matrix::Matrix;

/// A scalar type that can be stored in a `Matrix` and multiplied by a
/// `ComputeBackend`.
///
/// Each implementation fixes the semiring used by matrix products:
/// `i32` wraps on overflow, `bool` uses OR as addition and AND as
/// multiplication, and `f64` uses ordinary IEEE arithmetic.
pub trait Element: Copy + Debug + PartialEq + Send + Sync + 'static {
    /// The runtime tag for this element type.
    const DTYPE: DType;

    /// Additive identity.
    fn zero() -> Self;

    /// Returns `acc + a * b` in this type's semiring.
    fn mul_add(acc: Self, a: Self, b: Self) -> Self;

    /// Draws one element from the uniform distribution used by the
    /// benchmark generator.
    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self;

    /// Compares two elements, allowing `tolerance` for inexact types.
    fn approx_eq(a: Self, b: Self, tolerance: f64) -> bool {
        let _ = tolerance;
        a == b
    }

    /// Wraps a typed matrix into an `AnyMatrix`.
    fn into_any(matrix: Matrix<Self>) -> AnyMatrix;

    /// Unwraps an `AnyMatrix` holding this element type.
    fn from_any(matrix: AnyMatrix) -> Option<Matrix<Self>>;
}

impl Element for i32 {
    const DTYPE: DType = DType::I32;

    fn zero() -> Self {
        0
    }

    fn mul_add(acc: Self, a: Self, b: Self) -> Self {
        acc.wrapping_add(a.wrapping_mul(b))
    }

    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        rng.gen_range(1..=100)
    }

    fn into_any(matrix: Matrix<Self>) -> AnyMatrix {
        AnyMatrix::I32(matrix)
    }

    fn from_any(matrix: AnyMatrix) -> Option<Matrix<Self>> {
        match matrix {
            AnyMatrix::I32(m) => Some(m),
            _ => None,
        }
    }
}

impl Element for bool {
    const DTYPE: DType = DType::Bool;

    fn zero() -> Self {
        false
    }

    fn mul_add(acc: Self, a: Self, b: Self) -> Self {
        acc | (a & b)
    }

    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        rng.gen_bool(0.5)
    }

    fn into_any(matrix: Matrix<Self>) -> AnyMatrix {
        AnyMatrix::Bool(matrix)
    }

    fn from_any(matrix: AnyMatrix) -> Option<Matrix<Self>> {
        match matrix {
            AnyMatrix::Bool(m) => Some(m),
            _ => None,
        }
    }
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;

    fn zero() -> Self {
        0.0
    }

    fn mul_add(acc: Self, a: Self, b: Self) -> Self {
        acc + a * b
    }

    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        rng.gen::<f64>()
    }

    /// Mixed absolute/relative comparison: `|a - b| <= tol * (1 + max(|a|, |b|))`.
    fn approx_eq(a: Self, b: Self, tolerance: f64) -> bool {
        if a == b {
            return true;
        }
        (a - b).abs() <= tolerance * (1.0 + a.abs().max(b.abs()))
    }

    fn into_any(matrix: Matrix<Self>) -> AnyMatrix {
        AnyMatrix::F64(matrix)
    }

    fn from_any(matrix: AnyMatrix) -> Option<Matrix<Self>> {
        match matrix {
            AnyMatrix::F64(m) => Some(m),
            _ => None,
        }
    }
}
