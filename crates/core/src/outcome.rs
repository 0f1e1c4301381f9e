//! Terminal outcome of a submission

use crate::error::EngineError;
use crate::types::Timestamp;

/// The final report for one submitted transaction, delivered through its
/// completion handle once the retry controller reaches a terminal state.
#[derive(Debug, Clone)]
pub enum TxnOutcome {
    /// The transaction committed.
    Committed {
        /// Attempts used, starting at 1 for a first-try commit.
        attempts: u32,
        /// The commit timestamp assigned under the gate.
        commit_ts: Timestamp,
    },
    /// The transaction reached a terminal failure: `RetryExceeded`,
    /// `Domain`, or `NotFound` at commit time.
    Failed(EngineError),
}

impl TxnOutcome {
    /// Whether the transaction committed.
    pub fn is_committed(&self) -> bool {
        matches!(self, TxnOutcome::Committed { .. })
    }

    /// Attempts used, if the transaction committed.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            TxnOutcome::Committed { attempts, .. } => Some(*attempts),
            TxnOutcome::Failed(_) => None,
        }
    }

    /// The commit timestamp, if the transaction committed.
    pub fn commit_ts(&self) -> Option<Timestamp> {
        match self {
            TxnOutcome::Committed { commit_ts, .. } => Some(*commit_ts),
            TxnOutcome::Failed(_) => None,
        }
    }

    /// The failure, if the transaction did not commit.
    pub fn failure(&self) -> Option<&EngineError> {
        match self {
            TxnOutcome::Committed { .. } => None,
            TxnOutcome::Failed(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_committed_accessors() {
        let outcome = TxnOutcome::Committed {
            attempts: 2,
            commit_ts: 17,
        };
        assert!(outcome.is_committed());
        assert_eq!(outcome.attempts(), Some(2));
        assert_eq!(outcome.commit_ts(), Some(17));
        assert!(outcome.failure().is_none());
    }

    #[test]
    fn test_failed_accessors() {
        let outcome = TxnOutcome::Failed(EngineError::Shutdown);
        assert!(!outcome.is_committed());
        assert_eq!(outcome.attempts(), None);
        assert!(matches!(outcome.failure(), Some(EngineError::Shutdown)));
    }
}
