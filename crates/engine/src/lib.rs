//! Software-transactional-memory engine with MVCC and priority scheduling
//!
//! The engine executes transactional closures against a store of versioned
//! cells. Execution is optimistic: each attempt buffers reads and writes
//! privately, then a single process-wide commit gate validates the read
//! set and publishes the write set atomically. Conflicting attempts are
//! retried with back-off up to a budget. Submissions carry a priority and
//! are dispatched to a fixed worker pool, higher priority first, FIFO
//! within a class.
//!
//! Commit strategies, selectable per submission:
//! - **MVCC** — versioned history, snapshot reads at the attempt's start
//!   timestamp, historical reads via `snapshot_at`.
//! - **Mod-count** — per-cell modification counters, no history; a lighter
//!   variant when the past is not needed.
//! - **Fast-path** — a probabilistic first-attempt commit that skips
//!   validation, modeling hardware-assisted commit; falls back to MVCC.
//!   A benchmark knob, never the default.
//!
//! See `Engine` for the entry point.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod commit;
mod config;
mod context;
mod diagnostics;
mod engine;
mod handle;
mod retry;
mod scheduler;
mod store;
mod validation;

pub use commit::CommitCoordinator;
pub use config::{CommitStrategy, EngineConfig, SubmitOptions};
pub use context::TransactionContext;
pub use diagnostics::AccessLog;
pub use engine::Engine;
pub use handle::CompletionHandle;
pub use retry::RetryConfig;
pub use scheduler::{SchedulerStats, WorkerPool};
pub use store::VersionedStore;
pub use validation::{StaleRead, ValidationResult};

// Re-export the core vocabulary so downstream users need one import.
pub use cellgate_core::{
    CellHistory, CellKey, EngineError, Priority, Result, Timestamp, TxnOutcome, Versioned,
    WorkerId,
};
