//! Retry controller: the attempt loop around one submission
//!
//! Each attempt gets a fresh context bound to the clock value at that
//! moment; conflicts trigger a capped-exponential back-off sleep and a
//! re-run of the body. Errors raised by the body are terminal by default
//! and forwarded unchanged; `retry_on_error` restores the retrying
//! behavior for workloads that want it.

use crate::commit::{CommitCoordinator, CommitPath};
use crate::config::CommitStrategy;
use crate::context::TransactionContext;
use crate::store::VersionedStore;
use cellgate_core::{CellKey, EngineError, Result, TxnOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1
}

fn default_backoff_cap_ms() -> u64 {
    8
}

/// Attempt budget and back-off schedule for a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per submission (at least 1).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base back-off in milliseconds; attempt `k` sleeps `base << k`.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Upper bound on a single back-off sleep, in milliseconds.
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,
    /// Whether body errors are retried like conflicts. Off by default:
    /// a domain error surfaces unchanged on the completion handle.
    #[serde(default)]
    pub retry_on_error: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            retry_on_error: false,
        }
    }
}

impl RetryConfig {
    /// Config with the default schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attempt budget (clamped to at least 1).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the back-off base.
    pub fn with_backoff_base_ms(mut self, base_ms: u64) -> Self {
        self.backoff_base_ms = base_ms;
        self
    }

    /// Set the back-off cap.
    pub fn with_backoff_cap_ms(mut self, cap_ms: u64) -> Self {
        self.backoff_cap_ms = cap_ms;
        self
    }

    /// Retry body errors instead of surfacing them.
    pub fn with_retry_on_error(mut self, retry: bool) -> Self {
        self.retry_on_error = retry;
        self
    }

    /// Back-off before re-running attempt `attempt + 1`.
    pub(crate) fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.min(63);
        let multiplier = 1u64 << shift;
        let delay_ms = self.backoff_base_ms.saturating_mul(multiplier);
        Duration::from_millis(delay_ms.min(self.backoff_cap_ms))
    }
}

/// Everything the retry loop needs to run one submission.
pub(crate) struct Submission<'a, V, F> {
    pub store: &'a Arc<VersionedStore<V>>,
    pub coordinator: &'a CommitCoordinator,
    pub body: &'a F,
    pub strategy: CommitStrategy,
    pub htm_success_p: f64,
    pub create_on_commit: bool,
    pub retry: &'a RetryConfig,
    pub label: &'a str,
}

/// Run the attempt loop to a terminal outcome.
///
/// The body runs exactly once per attempt. Returns the outcome together
/// with the last attempt's access set for the observational log.
pub(crate) fn run_to_outcome<V, F>(submission: Submission<'_, V, F>) -> (TxnOutcome, Vec<CellKey>)
where
    V: Clone,
    F: Fn(&mut TransactionContext<V>) -> Result<()>,
{
    let Submission {
        store,
        coordinator,
        body,
        strategy,
        htm_success_p,
        create_on_commit,
        retry,
        label,
    } = submission;

    let mut last_cause = EngineError::Conflict { stale_reads: 0 };
    let mut last_access = Vec::new();

    for attempt in 0..retry.max_attempts {
        let path = CommitPath::resolve(strategy, attempt, htm_success_p);
        let mut ctx =
            TransactionContext::new(Arc::clone(store), coordinator.now(), path.read_mode());

        let aborted = match body(&mut ctx) {
            Ok(()) => None,
            Err(e) => Some(e),
        };
        last_access = ctx.access_set();

        match aborted {
            None => match coordinator.commit(store, &ctx, path, create_on_commit) {
                Ok(commit_ts) => {
                    return (
                        TxnOutcome::Committed {
                            attempts: attempt + 1,
                            commit_ts,
                        },
                        last_access,
                    );
                }
                Err(e) if e.is_retryable() => {
                    debug!(label, attempt, "commit conflict, backing off");
                    last_cause = e;
                }
                Err(e) => return (TxnOutcome::Failed(e), last_access),
            },
            Some(e) if retry.retry_on_error => {
                debug!(label, attempt, error = %e, "body error treated as retryable");
                last_cause = e;
            }
            Some(e) => return (TxnOutcome::Failed(e), last_access),
        }

        if attempt + 1 < retry.max_attempts {
            std::thread::sleep(retry.delay_for(attempt));
        }
    }

    warn!(
        label,
        attempts = retry.max_attempts,
        cause = %last_cause,
        "retry budget exhausted"
    );
    (
        TxnOutcome::Failed(EngineError::RetryExceeded {
            attempts: retry.max_attempts,
            last: Box::new(last_cause),
        }),
        last_access,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(pairs: &[(u64, i64)]) -> (Arc<VersionedStore<i64>>, CommitCoordinator) {
        let store = Arc::new(VersionedStore::new());
        for &(key, value) in pairs {
            store.initialize(key, value).unwrap();
        }
        (store, CommitCoordinator::new())
    }

    fn submission<'a, F>(
        store: &'a Arc<VersionedStore<i64>>,
        coordinator: &'a CommitCoordinator,
        body: &'a F,
        retry: &'a RetryConfig,
    ) -> Submission<'a, i64, F> {
        Submission {
            store,
            coordinator,
            body,
            strategy: CommitStrategy::Mvcc,
            htm_success_p: 0.9,
            create_on_commit: false,
            retry,
            label: "test",
        }
    }

    #[test]
    fn test_delay_schedule_is_capped_exponential() {
        let retry = RetryConfig::new()
            .with_backoff_base_ms(1)
            .with_backoff_cap_ms(8);
        assert_eq!(retry.delay_for(0), Duration::from_millis(1));
        assert_eq!(retry.delay_for(1), Duration::from_millis(2));
        assert_eq!(retry.delay_for(2), Duration::from_millis(4));
        assert_eq!(retry.delay_for(3), Duration::from_millis(8));
        assert_eq!(retry.delay_for(10), Duration::from_millis(8));
        // Shift saturation far past u64 width
        assert_eq!(retry.delay_for(200), Duration::from_millis(8));
    }

    #[test]
    fn test_first_attempt_commit() {
        let (store, coord) = setup(&[(1, 0)]);
        let retry = RetryConfig::default();
        let body = |tx: &mut TransactionContext<i64>| {
            let v = tx.read(1)?;
            tx.write(1, v + 1);
            Ok(())
        };
        let (outcome, access) = run_to_outcome(submission(&store, &coord, &body, &retry));
        assert!(outcome.is_committed());
        assert_eq!(outcome.attempts(), Some(1));
        assert_eq!(access, vec![1]);
        assert_eq!(store.latest(1).unwrap().0, 1);
    }

    #[test]
    fn test_domain_error_is_terminal_and_not_retried() {
        let (store, coord) = setup(&[(1, 0)]);
        let retry = RetryConfig::default().with_max_attempts(5);
        let runs = std::sync::atomic::AtomicU32::new(0);
        let body = |_tx: &mut TransactionContext<i64>| {
            runs.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Err(EngineError::domain("insufficient funds"))
        };
        let (outcome, _) = run_to_outcome(submission(&store, &coord, &body, &retry));
        assert!(matches!(
            outcome.failure(),
            Some(EngineError::Domain(msg)) if msg.contains("insufficient funds")
        ));
        // Exactly one invocation: no retry on domain errors by default
        assert_eq!(runs.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_retry_on_error_exhausts_budget() {
        let (store, coord) = setup(&[(1, 0)]);
        let retry = RetryConfig::default()
            .with_max_attempts(3)
            .with_backoff_base_ms(0)
            .with_retry_on_error(true);
        let runs = std::sync::atomic::AtomicU32::new(0);
        let body = |_tx: &mut TransactionContext<i64>| {
            runs.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Err(EngineError::domain("always fails"))
        };
        let (outcome, _) = run_to_outcome(submission(&store, &coord, &body, &retry));
        match outcome.failure() {
            Some(EngineError::RetryExceeded { attempts, last }) => {
                assert_eq!(*attempts, 3);
                assert!(last.is_domain());
            }
            other => panic!("expected RetryExceeded, got {:?}", other),
        }
        assert_eq!(runs.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[test]
    fn test_adversarial_conflict_exhausts_budget() {
        let (store, coord) = setup(&[(1, 0)]);
        let retry = RetryConfig::default()
            .with_max_attempts(4)
            .with_backoff_base_ms(0);
        // Every attempt reads the cell and then a rival advances it before
        // the attempt commits.
        let body = |tx: &mut TransactionContext<i64>| {
            let v = tx.read(1)?;
            let mut rival = TransactionContext::new(
                Arc::clone(&store),
                coord.now(),
                crate::context::ReadMode::Snapshot,
            );
            rival.write(1, v + 100);
            coord
                .commit(&store, &rival, CommitPath::Mvcc, false)
                .unwrap();
            tx.write(1, v + 1);
            Ok(())
        };
        let (outcome, _) = run_to_outcome(submission(&store, &coord, &body, &retry));
        match outcome.failure() {
            Some(EngineError::RetryExceeded { attempts, last }) => {
                assert_eq!(*attempts, 4);
                assert!(last.is_conflict());
            }
            other => panic!("expected RetryExceeded, got {:?}", other),
        }
    }

    #[test]
    fn test_conflict_then_success_uses_two_attempts() {
        let (store, coord) = setup(&[(1, 0)]);
        let retry = RetryConfig::default()
            .with_max_attempts(3)
            .with_backoff_base_ms(0);
        let sabotaged = std::sync::atomic::AtomicBool::new(false);
        let body = |tx: &mut TransactionContext<i64>| {
            let v = tx.read(1)?;
            if !sabotaged.swap(true, std::sync::atomic::Ordering::SeqCst) {
                let mut rival = TransactionContext::new(
                    Arc::clone(&store),
                    coord.now(),
                    crate::context::ReadMode::Snapshot,
                );
                rival.write(1, 50);
                coord
                    .commit(&store, &rival, CommitPath::Mvcc, false)
                    .unwrap();
            }
            tx.write(1, v + 1);
            Ok(())
        };
        let (outcome, _) = run_to_outcome(submission(&store, &coord, &body, &retry));
        assert_eq!(outcome.attempts(), Some(2));
        // Second attempt read the rival's 50 and wrote 51
        assert_eq!(store.latest(1).unwrap().0, 51);
    }

    #[test]
    fn test_not_found_at_commit_is_terminal() {
        let (store, coord) = setup(&[]);
        let retry = RetryConfig::default().with_max_attempts(5);
        let runs = std::sync::atomic::AtomicU32::new(0);
        let body = |tx: &mut TransactionContext<i64>| {
            runs.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            tx.write(42, 1);
            Ok(())
        };
        let (outcome, _) = run_to_outcome(submission(&store, &coord, &body, &retry));
        assert!(matches!(outcome.failure(), Some(EngineError::NotFound(42))));
        assert_eq!(runs.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
