use crate::backend::ComputeBackend;
use crate::element::Element;
use crate::error::{MatrixError, Result};

/// Pure-Rust CPU compute backend.
///
/// A single-threaded i-k-j triple loop. Each output element accumulates its
/// terms in ascending `k` order, so results are bit-identical no matter how
/// the rows of `a` are split across calls.
#[derive(Debug, Clone, Copy)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        CpuBackend
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuBackend {
    fn matmul<T: Element>(
        &self,
        a: &[T],
        b: &[T],
        m: usize,
        k: usize,
        n: usize,
    ) -> Result<Vec<T>> {
        if a.len() != m * k {
            return Err(MatrixError::LengthMismatch {
                what: "matmul lhs",
                expected: m * k,
                got: a.len(),
            });
        }
        if b.len() != k * n {
            return Err(MatrixError::LengthMismatch {
                what: "matmul rhs",
                expected: k * n,
                got: b.len(),
            });
        }

        let mut c = vec![T::zero(); m * n];
        if k == 0 || n == 0 {
            return Ok(c);
        }
        for (a_row, c_row) in a.chunks_exact(k).zip(c.chunks_exact_mut(n)) {
            for (p, &a_ip) in a_row.iter().enumerate() {
                let b_row = &b[p * n..(p + 1) * n];
                for (c_ij, &b_pj) in c_row.iter_mut().zip(b_row) {
                    *c_ij = T::mul_add(*c_ij, a_ip, b_pj);
                }
            }
        }
        Ok(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn backend() -> CpuBackend {
        CpuBackend::new()
    }

    #[test]
    fn test_matmul_identity() {
        let b = backend();
        let a = vec![1, 0, 0, 1];
        let x = vec![1, 2, 3, 4];
        let c = b.matmul(&a, &x, 2, 2, 2).unwrap();
        assert_eq!(c, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_matmul_rectangular() {
        let b = backend();
        // [1,2,3;4,5,6] @ [7,8;9,10;11,12] = [58,64;139,154]
        let a = vec![1, 2, 3, 4, 5, 6];
        let x = vec![7, 8, 9, 10, 11, 12];
        let c = b.matmul(&a, &x, 2, 3, 2).unwrap();
        assert_eq!(c, vec![58, 64, 139, 154]);
    }

    #[test]
    fn test_matmul_row_vector() {
        let b = backend();
        let row = vec![1.5, -2.0];
        let x = vec![2.0, 0.5, 1.0, 4.0];
        let c = b.matmul(&row, &x, 1, 2, 2).unwrap();
        assert_relative_eq!(c[0], 1.0);
        assert_relative_eq!(c[1], -7.25);
    }

    #[test]
    fn test_matmul_bool() {
        let b = backend();
        // Reachability in one step: row 0 reaches col 1 through k = 1.
        let a = vec![false, true, false, false];
        let x = vec![false, false, false, true];
        let c = b.matmul(&a, &x, 2, 2, 2).unwrap();
        assert_eq!(c, vec![false, true, false, false]);
    }

    #[test]
    fn test_matmul_i32_wraps() {
        let b = backend();
        let c = b.matmul(&[i32::MAX, 1], &[1, 1], 1, 2, 1).unwrap();
        assert_eq!(c, vec![i32::MIN]);
    }

    #[test]
    fn test_matmul_zero_inner_dimension() {
        let b = backend();
        let c = b.matmul::<i32>(&[], &[], 2, 0, 3).unwrap();
        assert_eq!(c, vec![0; 6]);
    }

    #[test]
    fn test_matmul_length_mismatch() {
        let b = backend();
        assert!(matches!(
            b.matmul(&[1, 2, 3], &[1, 2, 3, 4], 2, 2, 2),
            Err(MatrixError::LengthMismatch { what: "matmul lhs", .. })
        ));
        assert!(matches!(
            b.matmul(&[1, 2, 3, 4], &[1, 2, 3], 2, 2, 2),
            Err(MatrixError::LengthMismatch { what: "matmul rhs", .. })
        ));
    }
}
