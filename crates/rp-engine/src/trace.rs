use std::collections::BTreeMap;

use crate::schedule::RowRange;
use crate::transport::Rank;

/// One step of the coordinator's side of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchEvent {
    /// Rows were sent to `worker` under `tag`.
    Assigned {
        worker: Rank,
        tag: usize,
        rows: RowRange,
    },
    /// The result for `tag` came back from `worker` and was written into C.
    Completed { worker: Rank, tag: usize },
    /// `worker` was sent the termination token.
    Stopped { worker: Rank },
}

/// Ordered log of everything the coordinator sent and accepted in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchTrace {
    events: Vec<DispatchEvent>,
}

impl DispatchTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: DispatchEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[DispatchEvent] {
        &self.events
    }

    /// Row ranges in the order they were assigned.
    pub fn assignments(&self) -> Vec<(Rank, RowRange)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DispatchEvent::Assigned { worker, rows, .. } => Some((*worker, *rows)),
                _ => None,
            })
            .collect()
    }

    /// Number of results accepted.
    pub fn completed(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, DispatchEvent::Completed { .. }))
            .count()
    }

    /// Termination tokens sent to each worker.
    pub fn stops_per_worker(&self) -> BTreeMap<Rank, usize> {
        let mut stops = BTreeMap::new();
        for e in &self.events {
            if let DispatchEvent::Stopped { worker } = e {
                *stops.entry(*worker).or_insert(0) += 1;
            }
        }
        stops
    }

    /// The largest number of work items any single worker held at once.
    pub fn max_outstanding_per_worker(&self) -> usize {
        let mut outstanding: BTreeMap<Rank, usize> = BTreeMap::new();
        let mut max = 0;
        for e in &self.events {
            match e {
                DispatchEvent::Assigned { worker, .. } => {
                    let n = outstanding.entry(*worker).or_insert(0);
                    *n += 1;
                    max = max.max(*n);
                }
                DispatchEvent::Completed { worker, .. } => {
                    if let Some(n) = outstanding.get_mut(worker) {
                        *n = n.saturating_sub(1);
                    }
                }
                DispatchEvent::Stopped { .. } => {}
            }
        }
        max
    }

    /// True if no tag was ever assigned again while still in flight.
    pub fn tags_unique_in_flight(&self) -> bool {
        let mut in_flight = std::collections::BTreeSet::new();
        for e in &self.events {
            match e {
                DispatchEvent::Assigned { tag, .. } => {
                    if !in_flight.insert(*tag) {
                        return false;
                    }
                }
                DispatchEvent::Completed { tag, .. } => {
                    in_flight.remove(tag);
                }
                DispatchEvent::Stopped { .. } => {}
            }
        }
        true
    }
}
