//! The scheduling-tag protocol.
//!
//! A message tag carries three meanings at once: it correlates a request
//! with its response, it names the row (or block start) the payload belongs
//! to in `C`, and in dynamic mode the value `rows` means "stop". Valid row
//! tags live in `[0, rows)`; the sentinel sits just past them. Any other
//! value is a protocol defect.
//!
//! Raw tags are decoded into an `Assignment` the moment they are received,
//! so nothing downstream compares integers against the sentinel.

use crate::error::{EngineError, Result};
use crate::transport::Rank;

/// A decoded tag on a coordinator-to-worker message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// Compute the rows starting at this index.
    Work(usize),
    /// No more work; exit without replying.
    Stop,
}

/// Encodes and decodes tags for a run over `rows` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagProtocol {
    rows: usize,
}

impl TagProtocol {
    pub fn new(rows: usize) -> Self {
        TagProtocol { rows }
    }

    /// Number of rows in the run, which is also the stop sentinel.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Raw tag for work starting at `start`, sent to rank `to`.
    ///
    /// # Errors
    /// Returns `TagCollision` if `start` is not a valid row index: the tag
    /// would alias the stop sentinel or fall outside the protocol.
    pub fn work_tag(&self, start: usize, to: Rank) -> Result<usize> {
        if start >= self.rows {
            return Err(self.collision(start, to));
        }
        Ok(start)
    }

    /// Raw tag of the termination token.
    pub fn stop_tag(&self) -> usize {
        self.rows
    }

    /// Decode a tag received by a worker.
    ///
    /// # Errors
    /// Returns `TagCollision` for tags beyond the sentinel.
    pub fn decode(&self, tag: usize, from: Rank) -> Result<Assignment> {
        if tag < self.rows {
            Ok(Assignment::Work(tag))
        } else if tag == self.rows {
            Ok(Assignment::Stop)
        } else {
            Err(self.collision(tag, from))
        }
    }

    /// Decode a tag received by the coordinator on a result message.
    ///
    /// Results always answer a work item, so the sentinel is as invalid
    /// here as any out-of-domain tag.
    pub fn decode_result(&self, tag: usize, from: Rank) -> Result<usize> {
        match self.decode(tag, from)? {
            Assignment::Work(start) => Ok(start),
            Assignment::Stop => Err(self.collision(tag, from)),
        }
    }

    pub(crate) fn collision(&self, tag: usize, from: Rank) -> EngineError {
        EngineError::TagCollision {
            tag,
            rows: self.rows,
            rank: from,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_tags_decode_as_work() {
        let p = TagProtocol::new(4);
        for row in 0..4 {
            assert_eq!(p.decode(p.work_tag(row, 1).unwrap(), 0).unwrap(), Assignment::Work(row));
        }
    }

    #[test]
    fn test_sentinel_decodes_as_stop() {
        let p = TagProtocol::new(4);
        assert_eq!(p.stop_tag(), 4);
        assert_eq!(p.decode(4, 0).unwrap(), Assignment::Stop);
    }

    #[test]
    fn test_sentinel_never_aliases_a_row() {
        for rows in 0..16 {
            let p = TagProtocol::new(rows);
            assert!((0..rows).all(|r| p.work_tag(r, 1).unwrap() != p.stop_tag()));
        }
    }

    #[test]
    fn test_beyond_sentinel_is_collision() {
        let p = TagProtocol::new(4);
        assert!(matches!(
            p.decode(5, 2),
            Err(EngineError::TagCollision { tag: 5, rows: 4, rank: 2 })
        ));
    }

    #[test]
    fn test_result_with_sentinel_is_collision() {
        let p = TagProtocol::new(4);
        assert_eq!(p.decode_result(3, 1).unwrap(), 3);
        assert!(matches!(
            p.decode_result(4, 1),
            Err(EngineError::TagCollision { tag: 4, .. })
        ));
    }

    #[test]
    fn test_empty_run_only_knows_stop() {
        let p = TagProtocol::new(0);
        assert_eq!(p.decode(0, 0).unwrap(), Assignment::Stop);
        assert!(p.decode_result(0, 1).is_err());
    }

    #[test]
    fn test_work_tag_rejects_sentinel() {
        let p = TagProtocol::new(3);
        assert!(matches!(
            p.work_tag(3, 2),
            Err(EngineError::TagCollision { tag: 3, rows: 3, rank: 2 })
        ));
        assert!(p.work_tag(7, 1).is_err());
    }
}
