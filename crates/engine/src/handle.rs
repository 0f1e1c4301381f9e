//! Completion handles for submitted transactions
//!
//! `submit` is fire-and-forget at the queue level, but returns a handle
//! the caller may keep to learn the terminal outcome. The handle resolves
//! exactly once; dropping it is fine. A submission discarded by shutdown
//! never resolves its handle, so prefer the timeout variants around
//! shutdown.

use cellgate_core::TxnOutcome;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct CompletionState {
    slot: Mutex<Option<TxnOutcome>>,
    ready: Condvar,
}

/// Resolving side, held by the worker that runs the submission.
pub(crate) struct CompletionSender {
    state: Arc<CompletionState>,
}

impl CompletionSender {
    /// Publish the terminal outcome and wake every waiter.
    pub(crate) fn resolve(self, outcome: TxnOutcome) {
        let mut slot = self.state.slot.lock();
        debug_assert!(slot.is_none(), "completion resolved twice");
        *slot = Some(outcome);
        self.state.ready.notify_all();
    }
}

/// Waiting side, returned to the submitter.
#[derive(Clone)]
pub struct CompletionHandle {
    state: Arc<CompletionState>,
}

impl CompletionHandle {
    /// Block until the submission reaches a terminal outcome.
    pub fn wait(&self) -> TxnOutcome {
        let mut slot = self.state.slot.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            self.state.ready.wait(&mut slot);
        }
    }

    /// Block up to `timeout`; `None` if the outcome is not available yet.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<TxnOutcome> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.state.slot.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return Some(outcome.clone());
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let _ = self.state.ready.wait_for(&mut slot, deadline - now);
        }
    }

    /// Non-blocking probe.
    pub fn try_get(&self) -> Option<TxnOutcome> {
        self.state.slot.lock().clone()
    }
}

/// Create a linked sender/handle pair.
pub(crate) fn completion_pair() -> (CompletionSender, CompletionHandle) {
    let state = Arc::new(CompletionState {
        slot: Mutex::new(None),
        ready: Condvar::new(),
    });
    (
        CompletionSender {
            state: Arc::clone(&state),
        },
        CompletionHandle { state },
    )
}
