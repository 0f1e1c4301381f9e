//! Version history container for cells
//!
//! `CellHistory<V>` wraps a non-empty `Vec<Versioned<V>>` ordered by
//! ascending commit timestamp. The last entry is the current value; older
//! entries serve snapshot reads at a past timestamp.

use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

/// A single committed version of a cell: the value plus the commit
/// timestamp that published it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Versioned<V> {
    /// Commit timestamp of this version. `0` for the initial version.
    pub ts: Timestamp,
    /// The value as of `ts`.
    pub value: V,
}

impl<V> Versioned<V> {
    /// Create a version entry.
    pub fn new(ts: Timestamp, value: V) -> Self {
        Versioned { ts, value }
    }
}

/// A non-empty sequence of versions for one cell, ascending by timestamp.
///
/// Timestamps within a history strictly increase. `append` enforces this
/// with a panic: the commit coordinator is the only writer and hands out
/// monotonically increasing timestamps, so a violation is an engine bug,
/// not a recoverable error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellHistory<V> {
    versions: Vec<Versioned<V>>,
}

impl<V> CellHistory<V> {
    /// Create a history with a single initial version.
    pub fn new(initial: Versioned<V>) -> Self {
        CellHistory {
            versions: vec![initial],
        }
    }

    /// The current (newest) version.
    pub fn latest(&self) -> &Versioned<V> {
        self.versions
            .last()
            .expect("cell history is never empty")
    }

    /// The newest version whose timestamp is `<= ts`, or `None` if the
    /// cell did not exist yet at `ts`.
    pub fn read_at(&self, ts: Timestamp) -> Option<&Versioned<V>> {
        let idx = self.versions.partition_point(|v| v.ts <= ts);
        if idx == 0 {
            None
        } else {
            Some(&self.versions[idx - 1])
        }
    }

    /// Append a new version.
    ///
    /// # Panics
    ///
    /// Panics if `ts` is not strictly greater than the newest timestamp.
    pub fn append(&mut self, ts: Timestamp, value: V) {
        let last = self.latest().ts;
        assert!(
            ts > last,
            "non-monotonic version append: {} after {}",
            ts,
            last
        );
        self.versions.push(Versioned::new(ts, value));
    }

    /// Replace the current value in place, advancing the per-cell counter
    /// by one and discarding older versions. Returns the new version tag.
    ///
    /// This is the mod-count publication path: no history is retained, the
    /// version tag is a per-cell modification counter rather than a global
    /// commit timestamp.
    pub fn bump(&mut self, value: V) -> Timestamp {
        let next = self.latest().ts + 1;
        self.versions.clear();
        self.versions.push(Versioned::new(next, value));
        next
    }

    /// Number of retained versions.
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Histories are never empty; provided for clippy symmetry.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// All retained versions, ascending by timestamp.
    pub fn versions(&self) -> &[Versioned<V>] {
        &self.versions
    }
}
