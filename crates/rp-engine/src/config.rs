use rp_matrix::{Element, MatrixKind};

use crate::error::Result;
use crate::schedule::Policy;

/// Default float tolerance for validating float64 results.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Problem dimensions: `A` is [m, k], `B` is [k, n], `C` is [m, n].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dims {
    pub m: usize,
    pub k: usize,
    pub n: usize,
}

impl Dims {
    pub fn new(m: usize, k: usize, n: usize) -> Self {
        Dims { m, k, n }
    }

    /// Square problem of dimension `dim`, as the benchmark's `DIM` argument.
    pub fn square(dim: usize) -> Self {
        Dims::new(dim, dim, dim)
    }
}

/// Settings for one engine run, shared by every rank.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Scheduling policy used by the coordinator.
    pub policy: Policy,
    /// Operand family handed to the generator.
    pub kind: MatrixKind,
    /// Generator seed; equal seeds give equal operands.
    pub seed: u64,
    /// Compare C against a serially computed reference after assembly.
    pub validate: bool,
    /// Tolerance for float64 validation. Ignored for exact dtypes.
    pub tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            policy: Policy::Dynamic,
            kind: MatrixKind::Uniform,
            seed: 0,
            validate: false,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl EngineConfig {
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_kind(mut self, kind: MatrixKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Pre-dispatch checks for a group of `size` ranks over `rows` rows.
    /// See [`Policy::check_group`].
    pub fn validate_group(&self, size: usize, rows: usize) -> Result<()> {
        self.policy.check_group(size, rows)
    }

    /// Everything a rank can check before the operand broadcast: the group
    /// against the policy, and that both operands of `dims` can be generated
    /// as `T` with the configured kind. Every rank of a run calls this, so a
    /// rejected configuration fails on all of them at once.
    pub fn validate_run<T: Element>(&self, size: usize, dims: Dims) -> Result<()> {
        self.validate_group(size, dims.m)?;
        self.kind.check(T::DTYPE, dims.m, dims.k)?;
        self.kind.check(T::DTYPE, dims.k, dims.n)?;
        Ok(())
    }
}
