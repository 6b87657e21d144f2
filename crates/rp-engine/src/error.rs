use rp_matrix::{MatrixError, Shape};
use thiserror::Error;

use crate::transport::{Rank, TransportError};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("insufficient workers: group of size {size} has no worker ranks (need at least 2)")]
    InsufficientWorkers { size: usize },
    #[error("degenerate schedule: {workers} workers cannot each take a block of {rows} rows")]
    DegenerateSchedule { workers: usize, rows: usize },
    #[error("tag collision: tag {tag} exchanged with rank {rank} does not name an outstanding row range (rows = {rows})")]
    TagCollision {
        tag: usize,
        rows: usize,
        rank: Rank,
    },
    #[error("shape mismatch from rank {rank}: expected {expected}, got {got}")]
    ShapeMismatch {
        rank: Rank,
        expected: Shape,
        got: Shape,
    },
    #[error("worker rank {rank} panicked")]
    WorkerPanicked { rank: Rank },
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("matrix error: {0}")]
    Matrix(#[from] MatrixError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
