//! Engine facade
//!
//! Ties the store, commit coordinator, retry controller, and worker pool
//! together behind the public surface: initialize cells, submit
//! transactional closures with a priority, wait for quiescence, probe
//! committed state, shut down.

use crate::commit::{CommitCoordinator, CommitPath};
use crate::config::{EngineConfig, SubmitOptions};
use crate::context::TransactionContext;
use crate::diagnostics::AccessLog;
use crate::handle::{completion_pair, CompletionHandle};
use crate::retry::{run_to_outcome, Submission};
use crate::scheduler::{SchedulerStats, WorkerPool};
use crate::store::VersionedStore;
use cellgate_core::{CellKey, Result, Timestamp, WorkerId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// The transactional-memory engine.
///
/// Generic over the cell scalar `V`; one engine holds one scalar type.
/// All methods take `&self` — wrap the engine in an `Arc` to share it
/// across submitting threads.
///
/// # Example
///
/// ```
/// use cellgate_engine::{Engine, EngineConfig, SubmitOptions};
///
/// let engine: Engine<i64> = Engine::new(EngineConfig::default().with_workers(2));
/// engine.initialize(100, 5).unwrap();
/// engine.initialize(200, 10).unwrap();
///
/// let handle = engine
///     .submit(
///         |tx| {
///             let a = tx.read(100)?;
///             let b = tx.read(200)?;
///             tx.write(100, a + 1);
///             tx.write(200, b + 1);
///             Ok(())
///         },
///         SubmitOptions::new().with_label("increment"),
///     )
///     .unwrap();
///
/// assert!(handle.wait().is_committed());
/// assert_eq!(engine.snapshot(100).unwrap(), 6);
/// engine.shutdown();
/// ```
pub struct Engine<V> {
    store: Arc<VersionedStore<V>>,
    coordinator: Arc<CommitCoordinator>,
    pool: WorkerPool,
    access_log: Arc<AccessLog>,
    config: EngineConfig,
}

impl<V: Clone + Send + Sync + 'static> Engine<V> {
    /// Build an engine and spawn its worker pool.
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            store: Arc::new(VersionedStore::new()),
            coordinator: Arc::new(CommitCoordinator::new()),
            pool: WorkerPool::new(config.workers),
            access_log: Arc::new(AccessLog::new()),
            config,
        }
    }

    /// Engine with the default configuration.
    pub fn with_defaults() -> Self {
        Engine::new(EngineConfig::default())
    }

    /// Create a cell with an initial value at timestamp 0.
    pub fn initialize(&self, key: CellKey, value: V) -> Result<()> {
        self.store.initialize(key, value)
    }

    /// Schedule a transactional closure.
    ///
    /// The body must be re-callable: it runs exactly once per attempt, up
    /// to the attempt budget. Returns immediately with a handle carrying
    /// the eventual outcome; dropping the handle makes the submission
    /// fire-and-forget.
    pub fn submit<F>(&self, body: F, options: SubmitOptions) -> Result<CompletionHandle>
    where
        F: Fn(&mut TransactionContext<V>) -> Result<()> + Send + Sync + 'static,
    {
        let store = Arc::clone(&self.store);
        let coordinator = Arc::clone(&self.coordinator);
        let access_log = Arc::clone(&self.access_log);
        let strategy = options.commit_strategy.unwrap_or(self.config.commit_strategy);
        let retry = match options.max_attempts {
            Some(attempts) => self.config.retry.clone().with_max_attempts(attempts),
            None => self.config.retry.clone(),
        };
        let htm_success_p = self.config.htm_success_p;
        let create_on_commit = self.config.create_on_commit;
        let label = options.label;
        let (sender, handle) = completion_pair();

        self.pool.submit(options.priority, move |worker| {
            debug!(worker, label = label.as_str(), "dispatching transaction");
            let (outcome, access_set) = run_to_outcome(Submission {
                store: &store,
                coordinator: &coordinator,
                body: &body,
                strategy,
                htm_success_p,
                create_on_commit,
                retry: &retry,
                label: &label,
            });
            access_log.record(worker, access_set);
            sender.resolve(outcome);
        })?;

        Ok(handle)
    }

    /// Begin a transaction for manual control (probes, tests, setup).
    ///
    /// The context reads snapshots at the current clock; pass it to
    /// [`commit`](Self::commit) to publish. Prefer `submit` for anything
    /// that needs retry or scheduling.
    pub fn begin(&self) -> TransactionContext<V> {
        let path = CommitPath::resolve(self.config.commit_strategy, 1, self.config.htm_success_p);
        TransactionContext::new(
            Arc::clone(&self.store),
            self.coordinator.now(),
            path.read_mode(),
        )
    }

    /// Commit a manually controlled transaction through the validating
    /// path. Returns the commit timestamp.
    pub fn commit(&self, ctx: &TransactionContext<V>) -> Result<Timestamp> {
        // Attempt 1 of the configured strategy: never the fast path.
        let path = CommitPath::resolve(self.config.commit_strategy, 1, self.config.htm_success_p);
        self.coordinator
            .commit(&self.store, ctx, path, self.config.create_on_commit)
    }

    /// Block until every submission has reached a terminal outcome.
    pub fn wait_for_quiescence(&self) {
        self.pool.wait_for_quiescence();
    }

    /// Bounded quiescence wait; returns whether the pool drained.
    pub fn wait_for_quiescence_timeout(&self, timeout: Duration) -> bool {
        self.pool.wait_for_quiescence_timeout(timeout)
    }

    /// Latest committed value of a cell.
    pub fn snapshot(&self, key: CellKey) -> Result<V> {
        self.store.latest(key).map(|(value, _)| value)
    }

    /// Committed value of a cell as of timestamp `ts` (MVCC histories).
    pub fn snapshot_at(&self, key: CellKey, ts: Timestamp) -> Result<V> {
        self.store.read_at(key, ts).map(|(value, _)| value)
    }

    /// Number of retained versions for a cell.
    pub fn version_count(&self, key: CellKey) -> usize {
        self.store.version_count(key)
    }

    /// Current commit-clock value.
    pub fn clock(&self) -> Timestamp {
        self.coordinator.now()
    }

    /// Scheduler counter snapshot.
    pub fn stats(&self) -> SchedulerStats {
        self.pool.stats()
    }

    /// Per-worker access sets recorded by the most recent attempts.
    pub fn access_sets(&self) -> HashMap<WorkerId, Vec<CellKey>> {
        self.access_log.snapshot()
    }

    /// Stop the workers. Pending submissions that have not started are
    /// discarded (their handles never resolve); in-flight attempts
    /// complete. Idempotent, and also run on drop.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}
