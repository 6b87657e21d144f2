pub mod local;

pub use local::{LocalGroup, LocalTransport};

use rp_matrix::{Element, Matrix, Shape};
use thiserror::Error;

/// Process identity within a group, in `[0, size)`.
pub type Rank = usize;

/// Rank 0 coordinates; every other rank is a worker.
pub const COORDINATOR: Rank = 0;

/// Which sender a receive will accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Any,
    Rank(Rank),
}

impl Source {
    pub fn matches(&self, rank: Rank) -> bool {
        match self {
            Source::Any => true,
            Source::Rank(r) => *r == rank,
        }
    }
}

/// Which tag a receive will accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSelector {
    Any,
    Tag(usize),
}

impl TagSelector {
    pub fn matches(&self, tag: usize) -> bool {
        match self {
            TagSelector::Any => true,
            TagSelector::Tag(t) => *t == tag,
        }
    }
}

/// A received point-to-point message.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    /// Rank that sent the message.
    pub source: Rank,
    /// Raw tag, decoded by the `TagProtocol`.
    pub tag: usize,
    pub payload: Matrix<T>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("rank {rank} is not a member of a group of size {size}")]
    InvalidRank { rank: Rank, size: usize },
    #[error("peer disconnected while rank {rank} was waiting")]
    Disconnected { rank: Rank },
    #[error("broadcast buffer on rank {rank} is {got}, root sent {expected}")]
    BroadcastShape {
        rank: Rank,
        expected: Shape,
        got: Shape,
    },
}

/// A fixed-size process group with tagged point-to-point messaging and
/// collectives, in the manner of an MPI communicator.
///
/// Messages between one (sender, receiver) pair are delivered in send
/// order. No order holds across senders. Receives block with no timeout.
pub trait Transport<T: Element>: Send {
    /// This endpoint's rank.
    fn rank(&self) -> Rank;

    /// Number of ranks in the group.
    fn size(&self) -> usize;

    /// Send `payload` to `dest` with `tag`. Does not wait for the receiver.
    fn send(&self, dest: Rank, tag: usize, payload: Matrix<T>) -> Result<(), TransportError>;

    /// Block until a message matching `source` and `tag` arrives.
    fn recv(&mut self, source: Source, tag: TagSelector) -> Result<Envelope<T>, TransportError>;

    /// Collective: replicate `buffer` from `root` into `buffer` on every
    /// other rank. Non-root buffers must already have the root's shape.
    fn broadcast(&mut self, buffer: &mut Matrix<T>, root: Rank) -> Result<(), TransportError>;

    /// Collective: block until every rank in the group has called `barrier`.
    fn barrier(&self) -> Result<(), TransportError>;
}
