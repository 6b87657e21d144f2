use std::fmt::Debug;

use crate::element::Element;
use crate::error::Result;

/// Trait for pluggable local compute kernels.
///
/// Data is passed in as row-major slices and returned as an owned vector.
/// Workers are generic over their backend, so a backend can be swapped per
/// rank without touching the scheduling code.
pub trait ComputeBackend: Send + Sync + Debug {
    /// Matrix multiplication: C = A @ B, in the element type's semiring.
    ///
    /// - `a`: row-major data of shape [m, k]
    /// - `b`: row-major data of shape [k, n]
    /// - Returns: row-major data of shape [m, n]
    fn matmul<T: Element>(&self, a: &[T], b: &[T], m: usize, k: usize, n: usize)
        -> Result<Vec<T>>;
}
