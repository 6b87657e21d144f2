//! `rp-engine` - Row-parallel matrix multiplication over message passing.
//!
//! A coordinator (rank 0) owns the operands and the result, replicates `B`
//! to every worker, hands out rows of `A` under a scheduling policy and
//! assembles the returned rows into `C` by tag. Workers multiply whatever
//! rows they are given by their replica of `B`.
//!
//! This crate provides:
//! - A `Transport` trait modelling a fixed-size process group, with an
//!   in-process `LocalGroup` implementation (one thread per rank)
//! - The tag protocol that overloads one integer as correlation id, row
//!   index and termination signal
//! - `Coordinator` and `Worker`, generic over transport and compute backend
//! - `run`, which executes a whole multiplication on a local group

pub mod config;
pub mod coordinator;
pub mod error;
pub mod run;
pub mod schedule;
pub mod tag;
pub mod trace;
pub mod transport;
pub mod worker;

pub use config::{Dims, EngineConfig};
pub use coordinator::{Coordinator, Outcome};
pub use error::{EngineError, Result};
pub use run::{run, run_rank, run_typed, RunReport};
pub use schedule::{block_partition, Policy, RowRange};
pub use tag::{Assignment, TagProtocol};
pub use trace::{DispatchEvent, DispatchTrace};
pub use transport::{
    Envelope, LocalGroup, LocalTransport, Rank, Source, TagSelector, Transport, TransportError,
    COORDINATOR,
};
pub use worker::{Worker, WorkerStats};
