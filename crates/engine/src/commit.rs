//! Commit coordination
//!
//! The coordinator owns the global commit clock and runs the whole
//! validate-and-publish sequence under the store's exclusive gate, so at
//! most one commit is in progress at any moment and commit order equals
//! clock order.
//!
//! Inside the gate, in order: validate the read set, check that every
//! write target exists (or may be created), advance the clock, publish.
//! Allocating the end timestamp after validation keeps the clock equal to
//! the maximum committed timestamp — aborted attempts leave no gaps —
//! and is indistinguishable from allocate-first under an exclusive gate.

use crate::config::CommitStrategy;
use crate::context::{ReadMode, TransactionContext};
use crate::store::VersionedStore;
use crate::validation::validate_read_set;
use cellgate_core::{EngineError, Result, Timestamp};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// The commit path resolved for one attempt. `CommitStrategy::HtmFast`
/// maps to `Fast` on the first attempt and `Mvcc` afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum CommitPath {
    Mvcc,
    ModCount,
    Fast { success_p: f64 },
}

impl CommitPath {
    /// Resolve the path for a given attempt of a submission.
    pub(crate) fn resolve(strategy: CommitStrategy, attempt: u32, htm_success_p: f64) -> Self {
        match strategy {
            CommitStrategy::Mvcc => CommitPath::Mvcc,
            CommitStrategy::ModCount => CommitPath::ModCount,
            CommitStrategy::HtmFast if attempt == 0 => CommitPath::Fast {
                success_p: htm_success_p,
            },
            CommitStrategy::HtmFast => CommitPath::Mvcc,
        }
    }

    /// How attempts running under this path read the store.
    pub(crate) fn read_mode(self) -> ReadMode {
        match self {
            CommitPath::ModCount => ReadMode::Latest,
            CommitPath::Mvcc | CommitPath::Fast { .. } => ReadMode::Snapshot,
        }
    }
}

/// Owner of the global commit clock and the commit protocol.
///
/// The clock advances by exactly one per successful commit and never
/// decreases. It is loaded freely (to stamp attempt start timestamps) but
/// stored only while the commit gate is held.
pub struct CommitCoordinator {
    clock: AtomicU64,
}

impl CommitCoordinator {
    /// Create a coordinator with the clock at zero.
    pub fn new() -> Self {
        CommitCoordinator {
            clock: AtomicU64::new(0),
        }
    }

    /// Current clock value (the maximum committed timestamp).
    pub fn now(&self) -> Timestamp {
        self.clock.load(Ordering::SeqCst)
    }

    /// Advance the clock for a commit that is about to publish. Callers
    /// must hold the commit gate.
    fn tick(&self) -> Timestamp {
        self.clock
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_add(1))
            .expect("commit clock overflow")
            + 1
    }

    /// Run the commit protocol for one attempt.
    ///
    /// On success, returns the commit timestamp and every buffered write
    /// is published with that tag. On `Conflict` or `NotFound`, nothing
    /// was published.
    pub(crate) fn commit<V: Clone>(
        &self,
        store: &VersionedStore<V>,
        ctx: &TransactionContext<V>,
        path: CommitPath,
        create_on_commit: bool,
    ) -> Result<Timestamp> {
        // Read-only transactions publish nothing and always commit at
        // their snapshot; the clock advances only when cells change.
        if ctx.write_count() == 0 {
            return Ok(self.now());
        }

        let mut gate = store.commit_guard();

        if let CommitPath::Fast { success_p } = path {
            // Simulated hardware commit: a Bernoulli trial stands in for
            // the read validation, reported as a conflict with no stale
            // reads when it declines.
            if !rand::thread_rng().gen_bool(success_p) {
                trace!("fast-path trial declined");
                return Err(EngineError::Conflict { stale_reads: 0 });
            }
        } else {
            let validation = validate_read_set(ctx.read_set(), &gate);
            if !validation.is_valid() {
                debug!(
                    stale_reads = validation.conflict_count(),
                    "commit aborted by validation"
                );
                return Err(EngineError::Conflict {
                    stale_reads: validation.conflict_count(),
                });
            }
        }

        // Every write target must exist unless implicit creation is on.
        // Checked before anything is published so an abort is all-or-nothing.
        if !create_on_commit {
            for (key, _) in ctx.writes() {
                if !gate.contains(key) {
                    return Err(EngineError::NotFound(key));
                }
            }
        }

        let end_ts = self.tick();
        for (key, value) in ctx.writes() {
            if !gate.contains(key) {
                gate.create(key, end_ts, value.clone());
            } else {
                match path {
                    CommitPath::ModCount => {
                        gate.bump(key, value.clone());
                    }
                    CommitPath::Mvcc | CommitPath::Fast { .. } => {
                        gate.append(key, end_ts, value.clone());
                    }
                }
            }
        }

        trace!(commit_ts = end_ts, writes = ctx.write_count(), "committed");
        Ok(end_ts)
    }
}

impl Default for CommitCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
