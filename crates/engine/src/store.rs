//! Versioned cell store
//!
//! The store owns every cell for the life of the process and is the only
//! long-lived shared state in the engine. Cells are keyed by `CellKey` and
//! hold an ascending version history (`CellHistory`).
//!
//! Locking follows the baseline gate discipline: reads take the cell map
//! in shared mode, and the commit coordinator takes it exclusively for the
//! whole validate-and-publish sequence via [`VersionedStore::commit_guard`].
//! Values are cloned out under the shared lock, so no reference into the
//! map ever outlives a lock and map growth cannot invalidate in-flight
//! accesses.

use cellgate_core::{CellHistory, CellKey, EngineError, Result, Timestamp, Versioned};
use parking_lot::{RwLock, RwLockWriteGuard};
use std::collections::HashMap;

/// Shared store of versioned cells.
pub struct VersionedStore<V> {
    cells: RwLock<HashMap<CellKey, CellHistory<V>>>,
}

impl<V: Clone> VersionedStore<V> {
    /// Create an empty store.
    pub fn new() -> Self {
        VersionedStore {
            cells: RwLock::new(HashMap::new()),
        }
    }

    /// Create a cell with an initial version at timestamp 0.
    ///
    /// Fails with `AlreadyInitialized` if the key exists.
    pub fn initialize(&self, key: CellKey, value: V) -> Result<()> {
        let mut cells = self.cells.write();
        if cells.contains_key(&key) {
            return Err(EngineError::AlreadyInitialized(key));
        }
        cells.insert(key, CellHistory::new(Versioned::new(0, value)));
        Ok(())
    }

    /// Read the newest version whose timestamp is `<= ts`.
    ///
    /// Fails with `NotFound` if the key is absent or no version existed at
    /// `ts`.
    pub fn read_at(&self, key: CellKey, ts: Timestamp) -> Result<(V, Timestamp)> {
        let cells = self.cells.read();
        cells
            .get(&key)
            .and_then(|history| history.read_at(ts))
            .map(|v| (v.value.clone(), v.ts))
            .ok_or(EngineError::NotFound(key))
    }

    /// Read the current value and its version tag.
    pub fn latest(&self, key: CellKey) -> Result<(V, Timestamp)> {
        let cells = self.cells.read();
        cells
            .get(&key)
            .map(|history| {
                let v = history.latest();
                (v.value.clone(), v.ts)
            })
            .ok_or(EngineError::NotFound(key))
    }

    /// Number of versions retained for `key` (0 if the cell is absent).
    pub fn version_count(&self, key: CellKey) -> usize {
        self.cells.read().get(&key).map_or(0, |h| h.len())
    }

    /// Number of cells in the store.
    pub fn cell_count(&self) -> usize {
        self.cells.read().len()
    }

    /// Take the commit gate: exclusive access for validate-and-publish.
    ///
    /// At most one commit is in progress at any moment; readers block for
    /// the duration of the guard.
    pub(crate) fn commit_guard(&self) -> CommitGuard<'_, V> {
        CommitGuard {
            cells: self.cells.write(),
        }
    }
}

impl<V: Clone> Default for VersionedStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive view of the cell map held for the duration of one commit.
///
/// Only the commit coordinator constructs this; every mutation of the
/// store happens through it.
pub(crate) struct CommitGuard<'a, V> {
    cells: RwLockWriteGuard<'a, HashMap<CellKey, CellHistory<V>>>,
}

impl<V: Clone> CommitGuard<'_, V> {
    /// Version tag of the current newest entry, or `None` if the cell is
    /// absent.
    pub(crate) fn current_version(&self, key: CellKey) -> Option<Timestamp> {
        self.cells.get(&key).map(|h| h.latest().ts)
    }

    /// Whether the cell exists.
    pub(crate) fn contains(&self, key: CellKey) -> bool {
        self.cells.contains_key(&key)
    }

    /// Append a new version to an existing cell.
    ///
    /// # Panics
    ///
    /// Panics if the cell is absent or `ts` is not strictly newer than the
    /// cell's newest timestamp — both are coordinator bugs.
    pub(crate) fn append(&mut self, key: CellKey, ts: Timestamp, value: V) {
        self.cells
            .get_mut(&key)
            .expect("append to a cell that was validated as present")
            .append(ts, value);
    }

    /// Replace an existing cell's value, advancing its per-cell counter.
    /// Returns the new version tag.
    pub(crate) fn bump(&mut self, key: CellKey, value: V) -> Timestamp {
        self.cells
            .get_mut(&key)
            .expect("bump of a cell that was validated as present")
            .bump(value)
    }

    /// Create a cell as part of a commit (implicit-create policy only).
    pub(crate) fn create(&mut self, key: CellKey, ts: Timestamp, value: V) {
        let prior = self
            .cells
            .insert(key, CellHistory::new(Versioned::new(ts, value)));
        debug_assert!(prior.is_none(), "create over an existing cell");
    }
}
