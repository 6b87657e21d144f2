use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rp_matrix::{CpuBackend, Element, Generator, Matrix, MatrixError, Shape};
use tracing::{debug, info, warn};

use crate::config::{Dims, EngineConfig};
use crate::error::{EngineError, Result};
use crate::schedule::{block_partition, Policy, RowRange};
use crate::tag::TagProtocol;
use crate::trace::{DispatchEvent, DispatchTrace};
use crate::transport::{Rank, Source, TagSelector, Transport, COORDINATOR};

/// What the coordinator hands back once C is assembled.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    /// The assembled product.
    pub c: Matrix<T>,
    /// Wall time from the end of the operand broadcast to full assembly.
    pub elapsed: Duration,
    /// Result of the reference check, if validation was requested.
    pub validated: Option<bool>,
    pub trace: DispatchTrace,
}

/// Rank 0's state for a single run.
///
/// Owns A, B and C, the table of outstanding work keyed by tag, and the
/// dispatch trace. Nothing outlives the run.
pub struct Coordinator<T: Element, X: Transport<T>> {
    transport: X,
    config: EngineConfig,
    dims: Dims,
    protocol: TagProtocol,
    a: Matrix<T>,
    b: Matrix<T>,
    c: Matrix<T>,
    /// tag -> (worker holding it, rows it covers)
    in_flight: BTreeMap<usize, (Rank, RowRange)>,
    trace: DispatchTrace,
    started: Option<Instant>,
    elapsed: Duration,
}

impl<T: Element, X: Transport<T>> Coordinator<T, X> {
    /// Check the run, then generate A ([m, k]) and B ([k, n]) from the
    /// configured seed and allocate a zeroed C.
    ///
    /// # Errors
    /// Everything [`EngineConfig::validate_run`] rejects is reported before
    /// anything is allocated.
    pub fn initialize(transport: X, dims: Dims, config: EngineConfig) -> Result<Self> {
        config.validate_run::<T>(transport.size(), dims)?;
        let mut generator = Generator::new(config.seed);
        let a = generator.generate::<T>(dims.m, dims.k, config.kind)?;
        let b = generator.generate::<T>(dims.k, dims.n, config.kind)?;
        Self::with_operands(transport, a, b, config)
    }

    /// Start a run over caller-supplied operands.
    pub fn with_operands(
        transport: X,
        a: Matrix<T>,
        b: Matrix<T>,
        config: EngineConfig,
    ) -> Result<Self> {
        debug_assert_eq!(transport.rank(), COORDINATOR);
        config.validate_group(transport.size(), a.rows())?;
        if a.cols() != b.rows() {
            return Err(MatrixError::MatmulMismatch {
                m: a.rows(),
                k: a.cols(),
                k2: b.rows(),
                n: b.cols(),
            }
            .into());
        }

        let dims = Dims::new(a.rows(), a.cols(), b.cols());
        info!(
            m = dims.m,
            k = dims.k,
            n = dims.n,
            dtype = %T::DTYPE,
            policy = %config.policy,
            workers = transport.size() - 1,
            "coordinator initialized"
        );
        Ok(Coordinator {
            transport,
            protocol: TagProtocol::new(dims.m),
            c: Matrix::zeros(dims.m, dims.n),
            a,
            b,
            dims,
            config,
            in_flight: BTreeMap::new(),
            trace: DispatchTrace::new(),
            started: None,
            elapsed: Duration::ZERO,
        })
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    pub fn a(&self) -> &Matrix<T> {
        &self.a
    }

    pub fn b(&self) -> &Matrix<T> {
        &self.b
    }

    /// Replicate B to every rank and wait at the barrier. The clock starts
    /// once the barrier releases.
    pub fn broadcast_operand(&mut self) -> Result<()> {
        self.transport.broadcast(&mut self.b, COORDINATOR)?;
        self.transport.barrier()?;
        self.started = Some(Instant::now());
        debug!(shape = %self.b.shape(), "operand broadcast complete");
        Ok(())
    }

    /// Run the configured policy until every row of C has been written.
    /// Broadcasts B first if that has not happened yet.
    pub fn dispatch(&mut self) -> Result<()> {
        let started = match self.started {
            Some(started) => started,
            None => {
                self.broadcast_operand()?;
                self.started.unwrap_or_else(Instant::now)
            }
        };

        match self.config.policy {
            Policy::Dynamic => self.dispatch_dynamic()?,
            Policy::Static => self.dispatch_static()?,
        }
        self.elapsed = started.elapsed();
        debug_assert!(self.in_flight.is_empty());

        info!(
            elapsed_ms = self.elapsed.as_secs_f64() * 1e3,
            results = self.trace.completed(),
            "dispatch complete"
        );
        Ok(())
    }

    /// Hand back C and the elapsed time, checking C against a serial
    /// reference product first if validation is enabled.
    pub fn finalize(self) -> Result<Outcome<T>> {
        let validated = if self.config.validate {
            let reference = self.a.matmul(&self.b, &CpuBackend::new())?;
            let ok = self.c.approx_eq(&reference, self.config.tolerance);
            if ok {
                info!("result matches reference product");
            } else {
                warn!("result differs from reference product");
            }
            Some(ok)
        } else {
            None
        };

        Ok(Outcome {
            c: self.c,
            elapsed: self.elapsed,
            validated,
            trace: self.trace,
        })
    }

    fn workers(&self) -> usize {
        self.transport.size() - 1
    }

    /// Self-scheduling: seed one row per worker, then give each returning
    /// worker the next unsent row, or the stop token once none remain.
    fn dispatch_dynamic(&mut self) -> Result<()> {
        let rows = self.dims.m;
        let workers = self.workers();
        let mut n_sent = 0;

        for worker in 1..=workers.min(rows) {
            self.assign(worker, RowRange::single(n_sent))?;
            n_sent += 1;
        }
        // Workers beyond the row count never get work.
        for worker in (rows + 1)..=workers {
            self.stop(worker)?;
        }

        for _ in 0..rows {
            let sender = self.accept()?;
            if n_sent < rows {
                self.assign(sender, RowRange::single(n_sent))?;
                n_sent += 1;
            } else {
                self.stop(sender)?;
            }
        }
        Ok(())
    }

    /// Static partition: one block per worker, then one receive per worker.
    fn dispatch_static(&mut self) -> Result<()> {
        let workers = self.workers();
        let blocks = block_partition(self.dims.m, workers)?;
        for (i, rows) in blocks.into_iter().enumerate() {
            self.assign(i + 1, rows)?;
        }
        for _ in 0..workers {
            self.accept()?;
        }
        Ok(())
    }

    fn assign(&mut self, worker: Rank, rows: RowRange) -> Result<()> {
        let tag = self.protocol.work_tag(rows.start, worker)?;
        if self.in_flight.contains_key(&tag) {
            return Err(self.protocol.collision(tag, worker));
        }
        let block = self.a.row_block(rows.as_range())?;
        self.transport.send(worker, tag, block)?;
        self.in_flight.insert(tag, (worker, rows));

        debug!(worker, tag, rows = %rows, "assigned");
        self.trace.record(DispatchEvent::Assigned { worker, tag, rows });
        Ok(())
    }

    fn stop(&mut self, worker: Rank) -> Result<()> {
        let token = Matrix::zeros(0, self.dims.k);
        self.transport.send(worker, self.protocol.stop_tag(), token)?;

        debug!(worker, "stopped");
        self.trace.record(DispatchEvent::Stopped { worker });
        Ok(())
    }

    /// Receive one result from any worker and write it into C by tag.
    /// Returns the sender so it can be given more work.
    fn accept(&mut self) -> Result<Rank> {
        let envelope = self.transport.recv(Source::Any, TagSelector::Any)?;
        let sender = envelope.source;
        let tag = self.protocol.decode_result(envelope.tag, sender)?;

        let rows = match self.in_flight.get(&tag) {
            Some(&(owner, rows)) if owner == sender => rows,
            _ => return Err(self.protocol.collision(tag, sender)),
        };
        let expected = Shape::new(rows.len(), self.dims.n);
        if envelope.payload.shape() != expected {
            return Err(EngineError::ShapeMismatch {
                rank: sender,
                expected,
                got: envelope.payload.shape(),
            });
        }

        self.c.write_rows(rows.start, &envelope.payload)?;
        self.in_flight.remove(&tag);

        debug!(worker = sender, tag, "completed");
        self.trace.record(DispatchEvent::Completed {
            worker: sender,
            tag,
        });
        Ok(sender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{LocalGroup, LocalTransport};
    use std::thread;

    fn coordinator(
        size: usize,
        a: Matrix<i32>,
        b: Matrix<i32>,
        policy: Policy,
    ) -> (Coordinator<i32, LocalTransport<i32>>, Vec<LocalTransport<i32>>) {
        let mut group = LocalGroup::endpoints::<i32>(size);
        let root = group.remove(0);
        let config = EngineConfig::default().with_policy(policy);
        (Coordinator::with_operands(root, a, b, config).unwrap(), group)
    }

    fn identity(n: usize) -> Matrix<i32> {
        Matrix::from_fn(n, n, |i, j| i32::from(i == j))
    }

    /// Receive B on a worker endpoint the way `Worker` does.
    fn join_broadcast(t: &mut LocalTransport<i32>, k: usize, n: usize) {
        let mut b = Matrix::zeros(k, n);
        t.broadcast(&mut b, COORDINATOR).unwrap();
        t.barrier().unwrap();
    }

    #[test]
    fn test_single_worker_group_is_rejected() {
        let group = LocalGroup::endpoints::<i32>(1);
        let root = group.into_iter().next().unwrap();
        let err = Coordinator::<i32, _>::initialize(root, Dims::square(3), EngineConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::InsufficientWorkers { size: 1 }));
    }

    #[test]
    fn test_operand_mismatch_is_rejected() {
        let mut group = LocalGroup::endpoints::<i32>(2);
        let root = group.remove(0);
        let a = Matrix::zeros(2, 3);
        let b = Matrix::zeros(2, 2);
        let err = Coordinator::with_operands(root, a, b, EngineConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::Matrix(MatrixError::MatmulMismatch { .. })));
    }

    #[test]
    fn test_initialize_generates_seeded_operands() {
        let mut g1 = LocalGroup::endpoints::<f64>(2);
        let mut g2 = LocalGroup::endpoints::<f64>(2);
        let config = EngineConfig::default().with_seed(99);
        let c1 = Coordinator::<f64, _>::initialize(g1.remove(0), Dims::new(3, 4, 2), config.clone())
            .unwrap();
        let c2 = Coordinator::<f64, _>::initialize(g2.remove(0), Dims::new(3, 4, 2), config).unwrap();
        assert_eq!(c1.a().shape(), Shape::new(3, 4));
        assert_eq!(c1.b().shape(), Shape::new(4, 2));
        assert_eq!(c1.a(), c2.a());
        assert_eq!(c1.b(), c2.b());
    }

    #[test]
    fn test_result_with_unknown_tag_is_collision() {
        let a = Matrix::from_fn(3, 2, |i, j| (i + j) as i32);
        let (mut coord, mut workers) = coordinator(2, a, identity(2), Policy::Dynamic);
        let mut fake = workers.remove(0);

        let handle = thread::spawn(move || {
            coord.broadcast_operand()?;
            coord.dispatch()
        });

        join_broadcast(&mut fake, 2, 2);
        let first = fake.recv(Source::Rank(COORDINATOR), TagSelector::Any).unwrap();
        assert_eq!(first.tag, 0);
        // Answer for row 2, which was never assigned.
        fake.send(COORDINATOR, 2, Matrix::zeros(1, 2)).unwrap();

        let err = handle.join().unwrap().unwrap_err();
        assert!(matches!(err, EngineError::TagCollision { tag: 2, rank: 1, .. }));
    }

    #[test]
    fn test_result_beyond_sentinel_is_collision() {
        let a = Matrix::from_fn(3, 2, |i, j| (i * j) as i32);
        let (mut coord, mut workers) = coordinator(2, a, identity(2), Policy::Dynamic);
        let mut fake = workers.remove(0);

        let handle = thread::spawn(move || coord.dispatch());

        join_broadcast(&mut fake, 2, 2);
        fake.recv(Source::Any, TagSelector::Any).unwrap();
        fake.send(COORDINATOR, 17, Matrix::zeros(1, 2)).unwrap();

        let err = handle.join().unwrap().unwrap_err();
        assert!(matches!(err, EngineError::TagCollision { tag: 17, rows: 3, .. }));
    }

    #[test]
    fn test_result_with_wrong_width_is_shape_mismatch() {
        let a = Matrix::from_fn(2, 2, |i, j| (i + 2 * j) as i32);
        let (mut coord, mut workers) = coordinator(2, a, identity(2), Policy::Dynamic);
        let mut fake = workers.remove(0);

        let handle = thread::spawn(move || coord.dispatch());

        join_broadcast(&mut fake, 2, 2);
        let item = fake.recv(Source::Any, TagSelector::Any).unwrap();
        fake.send(COORDINATOR, item.tag, Matrix::zeros(1, 3)).unwrap();

        let err = handle.join().unwrap().unwrap_err();
        match err {
            EngineError::ShapeMismatch { rank, expected, got } => {
                assert_eq!(rank, 1);
                assert_eq!(expected, Shape::new(1, 2));
                assert_eq!(got, Shape::new(1, 3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_static_block_with_wrong_height_is_shape_mismatch() {
        let a = Matrix::from_fn(4, 2, |i, _| i as i32);
        let (mut coord, mut workers) = coordinator(3, a, identity(2), Policy::Static);
        let mut w2 = workers.pop().unwrap();
        let mut w1 = workers.pop().unwrap();

        let handle = thread::spawn(move || coord.dispatch());

        let h1 = thread::spawn(move || {
            join_broadcast(&mut w1, 2, 2);
            w1
        });
        join_broadcast(&mut w2, 2, 2);
        let _w1 = h1.join().unwrap();

        let block = w2.recv(Source::Any, TagSelector::Any).unwrap();
        assert_eq!(block.tag, 2);
        assert_eq!(block.payload.rows(), 2);
        // Reply with one row instead of two.
        w2.send(COORDINATOR, 2, Matrix::zeros(1, 2)).unwrap();

        let err = handle.join().unwrap().unwrap_err();
        assert!(matches!(err, EngineError::ShapeMismatch { rank: 2, .. }));
    }
}
