use std::thread::{self, JoinHandle};
use std::time::Duration;

use rp_matrix::{AnyMatrix, ComputeBackend, CpuBackend, DType, Element};
use tracing::{error, info};

use crate::config::{Dims, EngineConfig};
use crate::coordinator::{Coordinator, Outcome};
use crate::error::{EngineError, Result};
use crate::trace::DispatchTrace;
use crate::transport::{LocalGroup, Rank, Transport, COORDINATOR};
use crate::worker::{Worker, WorkerStats};

/// Result of a run whose dtype was chosen at runtime.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub result: AnyMatrix,
    /// Wall time from the end of the operand broadcast to full assembly.
    pub elapsed: Duration,
    pub validated: Option<bool>,
    pub trace: DispatchTrace,
}

impl RunReport {
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

impl<T: Element> From<Outcome<T>> for RunReport {
    fn from(outcome: Outcome<T>) -> Self {
        RunReport {
            result: T::into_any(outcome.c),
            elapsed: outcome.elapsed,
            validated: outcome.validated,
            trace: outcome.trace,
        }
    }
}

/// Multiply a generated `[m, k] @ [k, n]` problem on an in-process group of
/// `group_size` ranks (one coordinator, `group_size - 1` workers) using the
/// CPU backend.
pub fn run(group_size: usize, dims: Dims, dtype: DType, config: &EngineConfig) -> Result<RunReport> {
    let backend = CpuBackend::new();
    Ok(match dtype {
        DType::I32 => run_typed::<i32, _>(group_size, dims, config, backend)?.into(),
        DType::Bool => run_typed::<bool, _>(group_size, dims, config, backend)?.into(),
        DType::F64 => run_typed::<f64, _>(group_size, dims, config, backend)?.into(),
    })
}

/// Run one rank's part of a multiplication on an existing transport.
///
/// Rank 0 coordinates and returns the outcome; every other rank works and
/// returns `None`. All ranks of a group must call this with the same `dims`
/// and `config`.
pub fn run_rank<T, X, B>(
    transport: X,
    backend: B,
    dims: Dims,
    config: &EngineConfig,
) -> Result<Option<Outcome<T>>>
where
    T: Element,
    X: Transport<T>,
    B: ComputeBackend,
{
    if transport.rank() == COORDINATOR {
        coordinate(transport, dims, config).map(Some)
    } else {
        Worker::new(transport, backend, dims, config)?.run()?;
        Ok(None)
    }
}

/// Typed variant of [`run`] with a caller-chosen worker backend.
///
/// The run is validated before any thread is spawned. If the coordinator
/// fails mid-run the error is returned at once without joining the workers;
/// dropping the coordinator's endpoint makes any worker blocked on a receive
/// fail with `Disconnected` and exit.
pub fn run_typed<T, B>(
    group_size: usize,
    dims: Dims,
    config: &EngineConfig,
    backend: B,
) -> Result<Outcome<T>>
where
    T: Element,
    B: ComputeBackend + Clone + 'static,
{
    config.validate_run::<T>(group_size, dims)?;

    let mut endpoints = LocalGroup::endpoints::<T>(group_size);
    let root = endpoints.remove(0);
    // Operands are generated before any worker exists, so a generator error
    // cannot strand workers on the broadcast.
    let mut coordinator = Coordinator::initialize(root, dims, config.clone())?;

    let workers: Vec<(Rank, JoinHandle<Result<WorkerStats>>)> = endpoints
        .into_iter()
        .map(|endpoint| {
            let rank = endpoint.rank();
            let backend = backend.clone();
            let config = config.clone();
            let handle = thread::spawn(move || {
                Worker::new(endpoint, backend, dims, &config)?.run()
            });
            (rank, handle)
        })
        .collect();

    let outcome = match drive(&mut coordinator).and_then(|()| coordinator.finalize()) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "coordinator failed");
            return Err(e);
        }
    };

    for (rank, handle) in workers {
        match handle.join() {
            Ok(stats) => {
                let stats = stats?;
                info!(rank, items = stats.items, rows = stats.rows, "worker joined");
            }
            Err(_) => return Err(EngineError::WorkerPanicked { rank }),
        }
    }
    Ok(outcome)
}

fn coordinate<T: Element, X: Transport<T>>(
    transport: X,
    dims: Dims,
    config: &EngineConfig,
) -> Result<Outcome<T>> {
    let mut coordinator = Coordinator::initialize(transport, dims, config.clone())?;
    drive(&mut coordinator)?;
    coordinator.finalize()
}

fn drive<T: Element, X: Transport<T>>(coordinator: &mut Coordinator<T, X>) -> Result<()> {
    coordinator.broadcast_operand()?;
    coordinator.dispatch()
}
