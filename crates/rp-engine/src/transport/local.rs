use std::collections::{BTreeSet, VecDeque};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Barrier};

use rp_matrix::{Element, Matrix};
use tracing::trace;

use super::{Envelope, Rank, Source, TagSelector, Transport, TransportError};

/// What travels on a local channel: a payload, or notice that the sending
/// endpoint was dropped.
enum Packet<P> {
    Data(P),
    Hangup(Rank),
}

/// Factory for in-process groups where every rank runs on its own thread.
pub struct LocalGroup;

impl LocalGroup {
    /// Create the endpoints of a group with `size` ranks. Endpoint `i` has
    /// rank `i`; move each one to the thread that plays that rank.
    pub fn endpoints<T: Element>(size: usize) -> Vec<LocalTransport<T>> {
        let (inbox_txs, inbox_rxs): (Vec<Sender<Packet<Envelope<T>>>>, Vec<_>) =
            (0..size).map(|_| mpsc::channel()).unzip();
        let (bcast_txs, bcast_rxs): (Vec<Sender<Packet<Matrix<T>>>>, Vec<_>) =
            (0..size).map(|_| mpsc::channel()).unzip();
        let barrier = Arc::new(Barrier::new(size.max(1)));

        inbox_rxs
            .into_iter()
            .zip(bcast_rxs)
            .enumerate()
            .map(|(rank, (inbox, collective))| LocalTransport {
                rank,
                peers: inbox_txs.clone(),
                collective_peers: bcast_txs.clone(),
                inbox,
                collective,
                backlog: VecDeque::new(),
                hung_up: BTreeSet::new(),
                barrier: Arc::clone(&barrier),
            })
            .collect()
    }
}

/// One rank's endpoint in a `LocalGroup`.
///
/// Every rank owns a single inbound channel that all peers write into, so a
/// wildcard receive is just the next message on that channel. Messages that
/// do not match a selective receive are parked in a backlog, which later
/// receives search first; this keeps per-sender order intact.
///
/// Every endpoint holds a sender to every inbox, so channels alone never
/// disconnect. Instead a dropped endpoint posts a hangup to each peer, and a
/// receive that can only be satisfied by ranks that have hung up fails with
/// `Disconnected`.
pub struct LocalTransport<T> {
    rank: Rank,
    peers: Vec<Sender<Packet<Envelope<T>>>>,
    collective_peers: Vec<Sender<Packet<Matrix<T>>>>,
    inbox: Receiver<Packet<Envelope<T>>>,
    collective: Receiver<Packet<Matrix<T>>>,
    backlog: VecDeque<Envelope<T>>,
    /// Ranks whose hangup has been read from the inbox.
    hung_up: BTreeSet<Rank>,
    barrier: Arc<Barrier>,
}

impl<T: Element> LocalTransport<T> {
    fn check_rank(&self, rank: Rank) -> Result<(), TransportError> {
        if rank >= self.peers.len() {
            return Err(TransportError::InvalidRank {
                rank,
                size: self.peers.len(),
            });
        }
        Ok(())
    }

    /// The rank to report if no peer left could satisfy `source`. Only
    /// meaningful once the inbox is drained: messages sent before a hangup
    /// arrive before it, so nothing more from a hung-up rank can be pending.
    fn unreachable(&self, source: Source) -> Option<Rank> {
        match source {
            Source::Rank(rank) => self.hung_up.contains(&rank).then_some(rank),
            Source::Any => {
                let others = self.peers.len().saturating_sub(1);
                (self.hung_up.len() >= others).then_some(self.rank)
            }
        }
    }
}

impl<T> Drop for LocalTransport<T> {
    fn drop(&mut self) {
        for (rank, (peer, collective)) in self.peers.iter().zip(&self.collective_peers).enumerate() {
            if rank == self.rank {
                continue;
            }
            // A peer that is already gone has nobody left to tell.
            let _ = peer.send(Packet::Hangup(self.rank));
            let _ = collective.send(Packet::Hangup(self.rank));
        }
    }
}

impl<T: Element> Transport<T> for LocalTransport<T> {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn send(&self, dest: Rank, tag: usize, payload: Matrix<T>) -> Result<(), TransportError> {
        self.check_rank(dest)?;
        trace!(source = self.rank, dest, tag, shape = %payload.shape(), "send");
        self.peers[dest]
            .send(Packet::Data(Envelope {
                source: self.rank,
                tag,
                payload,
            }))
            .map_err(|_| TransportError::Disconnected { rank: dest })
    }

    fn recv(&mut self, source: Source, tag: TagSelector) -> Result<Envelope<T>, TransportError> {
        if let Some(pos) = self
            .backlog
            .iter()
            .position(|e| source.matches(e.source) && tag.matches(e.tag))
        {
            if let Some(envelope) = self.backlog.remove(pos) {
                return Ok(envelope);
            }
        }

        loop {
            let packet = match self.inbox.try_recv() {
                Ok(packet) => packet,
                Err(TryRecvError::Empty) => {
                    if let Some(rank) = self.unreachable(source) {
                        return Err(TransportError::Disconnected { rank });
                    }
                    self.inbox
                        .recv()
                        .map_err(|_| TransportError::Disconnected { rank: self.rank })?
                }
                Err(TryRecvError::Disconnected) => {
                    return Err(TransportError::Disconnected { rank: self.rank })
                }
            };
            match packet {
                Packet::Data(envelope) => {
                    if source.matches(envelope.source) && tag.matches(envelope.tag) {
                        return Ok(envelope);
                    }
                    self.backlog.push_back(envelope);
                }
                Packet::Hangup(rank) => {
                    trace!(rank = self.rank, peer = rank, "peer hung up");
                    self.hung_up.insert(rank);
                }
            }
        }
    }

    fn broadcast(&mut self, buffer: &mut Matrix<T>, root: Rank) -> Result<(), TransportError> {
        self.check_rank(root)?;
        if self.rank == root {
            for (rank, peer) in self.collective_peers.iter().enumerate() {
                if rank == root {
                    continue;
                }
                peer.send(Packet::Data(buffer.clone()))
                    .map_err(|_| TransportError::Disconnected { rank })?;
            }
            return Ok(());
        }

        let received = loop {
            match self.collective.recv() {
                Ok(Packet::Data(matrix)) => break matrix,
                // Non-root ranks never write here except to hang up.
                Ok(Packet::Hangup(rank)) if rank != root => continue,
                Ok(Packet::Hangup(_)) | Err(_) => {
                    return Err(TransportError::Disconnected { rank: root })
                }
            }
        };
        if received.shape() != buffer.shape() {
            return Err(TransportError::BroadcastShape {
                rank: self.rank,
                expected: received.shape(),
                got: buffer.shape(),
            });
        }
        *buffer = received;
        Ok(())
    }

    fn barrier(&self) -> Result<(), TransportError> {
        self.barrier.wait();
        Ok(())
    }
}
