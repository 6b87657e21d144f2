use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::error::{EngineError, Result};

/// How the coordinator hands out rows of `A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Policy {
    /// Self-scheduling: one row per message, and an idle worker is handed the
    /// next unsent row as soon as its previous result arrives.
    #[default]
    Dynamic,
    /// One contiguous block per worker, sent up front; no redispatch.
    Static,
}

impl Policy {
    /// Pre-dispatch checks on a group of `size` ranks multiplying `rows` rows.
    ///
    /// Every rank runs the same check, so a rejected configuration fails on
    /// all ranks before anyone blocks on the operand broadcast.
    ///
    /// # Errors
    /// - `InsufficientWorkers` if `size < 2`.
    /// - `DegenerateSchedule` if the policy is `Static` and there are more
    ///   workers than rows.
    pub fn check_group(&self, size: usize, rows: usize) -> Result<()> {
        if size < 2 {
            return Err(EngineError::InsufficientWorkers { size });
        }
        let workers = size - 1;
        if *self == Policy::Static && workers > rows {
            return Err(EngineError::DegenerateSchedule { workers, rows });
        }
        Ok(())
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Dynamic => write!(f, "dynamic"),
            Policy::Static => write!(f, "static"),
        }
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dynamic" => Ok(Policy::Dynamic),
            "static" => Ok(Policy::Static),
            _ => Err(format!("unknown scheduling policy: {}", s)),
        }
    }
}

/// A contiguous half-open range of rows, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "inverted row range {}..{}", start, end);
        RowRange { start, end }
    }

    /// The range holding only `row`.
    pub fn single(row: usize) -> Self {
        RowRange::new(row, row + 1)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl fmt::Display for RowRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Split `rows` into `workers` contiguous blocks for the static policy.
///
/// Every block has `rows / workers` rows except the last, which also takes
/// the remainder: `rows - (workers - 1) * (rows / workers)`. The blocks are
/// disjoint and their union is exactly `[0, rows)`.
///
/// # Errors
/// - `InsufficientWorkers` if `workers == 0`.
/// - `DegenerateSchedule` if `workers > rows`, which would leave empty blocks.
pub fn block_partition(rows: usize, workers: usize) -> Result<Vec<RowRange>> {
    if workers == 0 {
        return Err(EngineError::InsufficientWorkers { size: 1 });
    }
    if workers > rows {
        return Err(EngineError::DegenerateSchedule { workers, rows });
    }

    let base = rows / workers;
    let blocks = (0..workers)
        .map(|w| {
            let start = w * base;
            let end = if w + 1 == workers { rows } else { start + base };
            RowRange::new(start, end)
        })
        .collect();
    Ok(blocks)
}
