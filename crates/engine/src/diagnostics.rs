//! Observational access-set bookkeeping
//!
//! Tracks, per worker, the cells touched by the most recent attempt that
//! worker ran. Purely diagnostic: nothing here influences dispatch order
//! or commit validation.

use cellgate_core::{CellKey, WorkerId};
use dashmap::DashMap;
use std::collections::HashMap;

/// Per-worker record of the last attempt's access set (reads and writes).
#[derive(Default)]
pub struct AccessLog {
    sets: DashMap<WorkerId, Vec<CellKey>>,
}

impl AccessLog {
    /// Empty log.
    pub fn new() -> Self {
        AccessLog::default()
    }

    /// Record the access set of an attempt that just finished on `worker`.
    pub fn record(&self, worker: WorkerId, keys: Vec<CellKey>) {
        self.sets.insert(worker, keys);
    }

    /// Copy of the current per-worker access sets.
    pub fn snapshot(&self) -> HashMap<WorkerId, Vec<CellKey>> {
        self.sets
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Worker pairs whose recorded access sets share at least one cell.
    pub fn overlapping_workers(&self) -> Vec<(WorkerId, WorkerId)> {
        let snapshot = self.snapshot();
        let mut workers: Vec<&WorkerId> = snapshot.keys().collect();
        workers.sort_unstable();

        let mut pairs = Vec::new();
        for (i, &a) in workers.iter().enumerate() {
            for &b in &workers[i + 1..] {
                let set_a = &snapshot[a];
                if snapshot[b].iter().any(|key| set_a.contains(key)) {
                    pairs.push((*a, *b));
                }
            }
        }
        pairs
    }

    /// Drop all recorded sets.
    pub fn clear(&self) {
        self.sets.clear();
    }
}
