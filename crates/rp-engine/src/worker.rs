use rp_matrix::{ComputeBackend, Element, Matrix, Shape};
use tracing::debug;

use crate::config::{Dims, EngineConfig};
use crate::error::{EngineError, Result};
use crate::schedule::Policy;
use crate::tag::{Assignment, TagProtocol};
use crate::transport::{Rank, Source, TagSelector, Transport, COORDINATOR};

/// Work a worker did before it exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerStats {
    pub rank: Rank,
    /// Work items answered.
    pub items: usize,
    /// Rows of A multiplied across all items.
    pub rows: usize,
}

/// A non-coordinator rank.
///
/// Holds a private replica of B and multiplies whatever rows of A it is sent.
pub struct Worker<T: Element, X: Transport<T>, B: ComputeBackend> {
    transport: X,
    backend: B,
    dims: Dims,
    policy: Policy,
    protocol: TagProtocol,
    b: Matrix<T>,
    stats: WorkerStats,
}

impl<T: Element, X: Transport<T>, B: ComputeBackend> Worker<T, X, B> {
    /// Prepare a worker for a run of shape `dims`.
    ///
    /// Runs the same checks as [`Coordinator::initialize`], so a
    /// configuration the coordinator rejects is rejected here too instead of
    /// blocking on the broadcast.
    ///
    /// [`Coordinator::initialize`]: crate::Coordinator::initialize
    pub fn new(transport: X, backend: B, dims: Dims, config: &EngineConfig) -> Result<Self> {
        config.validate_run::<T>(transport.size(), dims)?;
        let rank = transport.rank();
        Ok(Worker {
            transport,
            backend,
            dims,
            policy: config.policy,
            protocol: TagProtocol::new(dims.m),
            b: Matrix::zeros(dims.k, dims.n),
            stats: WorkerStats {
                rank,
                ..WorkerStats::default()
            },
        })
    }

    /// Receive the broadcast replica of B, then wait at the barrier.
    pub fn receive_operand(&mut self) -> Result<()> {
        self.transport.broadcast(&mut self.b, COORDINATOR)?;
        self.transport.barrier()?;
        Ok(())
    }

    /// Receive B, serve the policy's work loop and exit.
    pub fn run(mut self) -> Result<WorkerStats> {
        self.receive_operand()?;
        match self.policy {
            Policy::Dynamic => self.run_dynamic()?,
            Policy::Static => self.run_static()?,
        }
        debug!(
            rank = self.stats.rank,
            items = self.stats.items,
            rows = self.stats.rows,
            "worker finished"
        );
        Ok(self.stats)
    }

    /// Answer work items until the stop token arrives. A worker whose first
    /// message is the stop token exits having computed nothing.
    fn run_dynamic(&mut self) -> Result<()> {
        loop {
            let envelope = self
                .transport
                .recv(Source::Rank(COORDINATOR), TagSelector::Any)?;
            match self.protocol.decode(envelope.tag, envelope.source)? {
                Assignment::Work(start) => self.compute_and_reply(start, envelope.payload)?,
                Assignment::Stop => return Ok(()),
            }
        }
    }

    /// Answer exactly one block. There is no stop token under this policy.
    fn run_static(&mut self) -> Result<()> {
        let envelope = self
            .transport
            .recv(Source::Rank(COORDINATOR), TagSelector::Any)?;
        match self.protocol.decode(envelope.tag, envelope.source)? {
            Assignment::Work(start) => self.compute_and_reply(start, envelope.payload),
            Assignment::Stop => Err(self.protocol.collision(envelope.tag, envelope.source)),
        }
    }

    fn compute_and_reply(&mut self, start: usize, block: Matrix<T>) -> Result<()> {
        if block.cols() != self.dims.k {
            return Err(EngineError::ShapeMismatch {
                rank: COORDINATOR,
                expected: Shape::new(block.rows(), self.dims.k),
                got: block.shape(),
            });
        }

        let result = block.matmul(&self.b, &self.backend)?;
        self.transport.send(COORDINATOR, start, result)?;

        self.stats.items += 1;
        self.stats.rows += block.rows();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{LocalGroup, LocalTransport, TransportError};
    use rp_matrix::CpuBackend;
    use std::thread;

    type TestWorker = Worker<i32, LocalTransport<i32>, CpuBackend>;

    /// Spawn rank 1 of a two-rank group and return the coordinator endpoint,
    /// already past the broadcast of `b`.
    fn spawn_worker(
        dims: Dims,
        policy: Policy,
        mut b: Matrix<i32>,
    ) -> (LocalTransport<i32>, thread::JoinHandle<Result<WorkerStats>>) {
        let mut group = LocalGroup::endpoints::<i32>(2);
        let endpoint = group.pop().unwrap();
        let mut root = group.pop().unwrap();
        let config = EngineConfig::default().with_policy(policy);

        let handle = thread::spawn(move || {
            let worker: TestWorker = Worker::new(endpoint, CpuBackend::new(), dims, &config)?;
            worker.run()
        });
        root.broadcast(&mut b, COORDINATOR).unwrap();
        root.barrier().unwrap();
        (root, handle)
    }

    fn b_matrix() -> Matrix<i32> {
        // 3x2
        Matrix::from_vec(3, 2, vec![1, 2, 3, 4, 5, 6]).unwrap()
    }

    #[test]
    fn test_dynamic_worker_answers_until_stop() {
        let dims = Dims::new(4, 3, 2);
        let (mut root, handle) = spawn_worker(dims, Policy::Dynamic, b_matrix());

        root.send(1, 2, Matrix::from_vec(1, 3, vec![1, 0, 1]).unwrap()).unwrap();
        let reply = root.recv(Source::Rank(1), TagSelector::Any).unwrap();
        assert_eq!(reply.tag, 2);
        assert_eq!(reply.payload.data(), &[6, 8]);

        root.send(1, 0, Matrix::from_vec(1, 3, vec![0, 1, 0]).unwrap()).unwrap();
        let reply = root.recv(Source::Rank(1), TagSelector::Any).unwrap();
        assert_eq!(reply.tag, 0);
        assert_eq!(reply.payload.data(), &[3, 4]);

        root.send(1, 4, Matrix::zeros(0, 3)).unwrap();
        let stats = handle.join().unwrap().unwrap();
        assert_eq!(stats, WorkerStats { rank: 1, items: 2, rows: 2 });
    }

    #[test]
    fn test_dynamic_worker_stop_only() {
        let (root, handle) = spawn_worker(Dims::new(1, 3, 2), Policy::Dynamic, b_matrix());
        root.send(1, 1, Matrix::zeros(0, 3)).unwrap();
        let stats = handle.join().unwrap().unwrap();
        assert_eq!(stats.items, 0);
        assert_eq!(stats.rows, 0);
    }

    #[test]
    fn test_static_worker_answers_one_block() {
        let dims = Dims::new(2, 3, 2);
        let (mut root, handle) = spawn_worker(dims, Policy::Static, b_matrix());

        root.send(1, 0, Matrix::from_vec(2, 3, vec![1, 1, 1, 2, 0, 0]).unwrap())
            .unwrap();
        let reply = root.recv(Source::Any, TagSelector::Any).unwrap();
        assert_eq!(reply.tag, 0);
        assert_eq!(reply.payload.shape(), Shape::new(2, 2));
        assert_eq!(reply.payload.data(), &[9, 12, 2, 4]);

        let stats = handle.join().unwrap().unwrap();
        assert_eq!(stats, WorkerStats { rank: 1, items: 1, rows: 2 });
    }

    #[test]
    fn test_tag_beyond_sentinel_is_collision() {
        let (root, handle) = spawn_worker(Dims::new(2, 3, 2), Policy::Dynamic, b_matrix());
        root.send(1, 3, Matrix::zeros(1, 3)).unwrap();
        let err = handle.join().unwrap().unwrap_err();
        assert!(matches!(err, EngineError::TagCollision { tag: 3, rows: 2, rank: 0 }));
    }

    #[test]
    fn test_row_with_wrong_width_is_shape_mismatch() {
        let (root, handle) = spawn_worker(Dims::new(2, 3, 2), Policy::Dynamic, b_matrix());
        root.send(1, 0, Matrix::zeros(1, 4)).unwrap();
        let err = handle.join().unwrap().unwrap_err();
        assert!(matches!(err, EngineError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_static_worker_rejects_stop_token() {
        let (root, handle) = spawn_worker(Dims::new(2, 3, 2), Policy::Static, b_matrix());
        root.send(1, 2, Matrix::zeros(0, 3)).unwrap();
        let err = handle.join().unwrap().unwrap_err();
        assert!(matches!(err, EngineError::TagCollision { tag: 2, .. }));
    }

    #[test]
    fn test_worker_exits_when_coordinator_goes_away() {
        let (mut root, handle) = spawn_worker(Dims::new(3, 3, 2), Policy::Dynamic, b_matrix());
        root.send(1, 0, Matrix::from_vec(1, 3, vec![1, 1, 1]).unwrap()).unwrap();
        let reply = root.recv(Source::Rank(1), TagSelector::Any).unwrap();
        assert_eq!(reply.payload.data(), &[9, 12]);

        // No stop token: the coordinator just disappears mid-run.
        drop(root);
        let err = handle.join().unwrap().unwrap_err();
        assert!(matches!(
            err,
            EngineError::Transport(TransportError::Disconnected { rank: 0 })
        ));
    }

    #[test]
    fn test_worker_rejects_unsupported_kind() {
        let mut group = LocalGroup::endpoints::<bool>(3);
        let endpoint = group.remove(2);
        let config = EngineConfig::default().with_kind(rp_matrix::MatrixKind::Stochastic);
        let err = Worker::new(endpoint, CpuBackend::new(), Dims::square(2), &config)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            EngineError::Matrix(rp_matrix::MatrixError::UnsupportedKind { .. })
        ));
    }

    #[test]
    fn test_worker_rejects_degenerate_static_group() {
        let mut group = LocalGroup::endpoints::<i32>(4);
        let endpoint = group.remove(1);
        let config = EngineConfig::default().with_policy(Policy::Static);
        let err = TestWorker::new(endpoint, CpuBackend::new(), Dims::new(2, 2, 2), &config)
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::DegenerateSchedule { workers: 3, rows: 2 }));
    }
}
