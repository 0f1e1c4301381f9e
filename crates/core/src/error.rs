//! Error types for the engine
//!
//! A single `EngineError` enum covers the whole public surface. The split
//! that matters operationally is retryable vs terminal: `Conflict` is
//! recovered internally by the retry controller up to the attempt budget;
//! everything else surfaces on the submission's completion handle.
//!
//! Internal contract violations (non-monotonic append timestamps, a
//! duplicated commit timestamp) are panics, not errors — they indicate a
//! bug in the engine itself.

use crate::types::CellKey;
use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors exposed by the engine.
///
/// `Clone` is required because completion handles may be polled more than
/// once, and the retry controller boxes the last cause into
/// `RetryExceeded`.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The cell was never initialized (read, or write target at commit).
    #[error("cell {0} is not initialized")]
    NotFound(CellKey),

    /// `initialize` was called for a key that already has a cell.
    #[error("cell {0} is already initialized")]
    AlreadyInitialized(CellKey),

    /// Commit-time validation failed: at least one read observed a version
    /// that is no longer current. Retried internally.
    #[error("commit aborted: {stale_reads} stale read(s)")]
    Conflict {
        /// Number of read-set entries that failed validation. Zero means
        /// the probabilistic fast path declined the commit.
        stale_reads: usize,
    },

    /// The attempt budget was exhausted. Carries the last cause.
    #[error("transaction gave up after {attempts} attempt(s): {last}")]
    RetryExceeded {
        /// Attempts consumed (equals the configured budget).
        attempts: u32,
        /// The failure from the final attempt.
        last: Box<EngineError>,
    },

    /// An error raised by the transaction body, forwarded unchanged.
    #[error("transaction error: {0}")]
    Domain(String),

    /// The submission arrived after `shutdown`.
    #[error("engine is shut down")]
    Shutdown,
}

impl EngineError {
    /// Whether this error is a commit conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::Conflict { .. })
    }

    /// Whether the operation may succeed if re-run against fresh state.
    ///
    /// This is the predicate the retry controller consults: only conflicts
    /// qualify. Domain errors are forwarded to the submitter unchanged,
    /// and the remaining kinds require a different call to resolve.
    pub fn is_retryable(&self) -> bool {
        self.is_conflict()
    }

    /// Whether this error came from the transaction body rather than the
    /// engine.
    pub fn is_domain(&self) -> bool {
        matches!(self, EngineError::Domain(_))
    }

    /// Build a domain error from any displayable cause.
    pub fn domain(cause: impl std::fmt::Display) -> Self {
        EngineError::Domain(cause.to_string())
    }
}
