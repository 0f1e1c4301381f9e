//! Read-set validation at commit time
//!
//! First-committer-wins: a transaction may publish only if every version
//! it observed is still the newest committed version of that cell. Blind
//! writes (write without read) never conflict.

use crate::store::CommitGuard;
use cellgate_core::{CellKey, Timestamp, Versioned};
use std::collections::HashMap;

/// One read-set entry that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleRead {
    /// The conflicted cell.
    pub key: CellKey,
    /// Version tag recorded when the attempt read the cell.
    pub observed: Timestamp,
    /// Newest committed version tag at validation time.
    pub current: Timestamp,
}

/// Accumulated result of validating one attempt's read set.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// Every stale read found. Empty means the attempt may publish.
    pub conflicts: Vec<StaleRead>,
}

impl ValidationResult {
    /// A passing result with no conflicts.
    pub fn ok() -> Self {
        ValidationResult::default()
    }

    /// Whether the attempt may publish.
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Number of stale reads.
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }
}

/// Compare each observed version against the cell's current newest version
/// under the commit gate. A missing cell counts as version 0, mirroring
/// the read side (cells are never removed, so this only matters for the
/// implicit-create policy).
pub(crate) fn validate_read_set<V>(
    read_set: &HashMap<CellKey, Versioned<V>>,
    gate: &CommitGuard<'_, V>,
) -> ValidationResult
where
    V: Clone,
{
    let mut result = ValidationResult::ok();
    for (key, observed) in read_set {
        let current = gate.current_version(*key).unwrap_or(0);
        if current != observed.ts {
            result.conflicts.push(StaleRead {
                key: *key,
                observed: observed.ts,
                current,
            });
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::VersionedStore;

    #[test]
    fn test_unchanged_reads_pass() {
        let store: VersionedStore<i64> = VersionedStore::new();
        store.initialize(1, 10).unwrap();
        store.initialize(2, 20).unwrap();

        let mut read_set = HashMap::new();
        read_set.insert(1, Versioned::new(0, 10));
        read_set.insert(2, Versioned::new(0, 20));

        let gate = store.commit_guard();
        let result = validate_read_set(&read_set, &gate);
        assert!(result.is_valid());
    }

    #[test]
    fn test_advanced_cell_conflicts() {
        let store: VersionedStore<i64> = VersionedStore::new();
        store.initialize(1, 10).unwrap();
        store.commit_guard().append(1, 4, 11);

        let mut read_set = HashMap::new();
        read_set.insert(1, Versioned::new(0, 10));

        let gate = store.commit_guard();
        let result = validate_read_set(&read_set, &gate);
        assert_eq!(result.conflict_count(), 1);
        assert_eq!(
            result.conflicts[0],
            StaleRead {
                key: 1,
                observed: 0,
                current: 4
            }
        );
    }

    #[test]
    fn test_empty_read_set_always_passes() {
        let store: VersionedStore<i64> = VersionedStore::new();
        let read_set: HashMap<_, Versioned<i64>> = HashMap::new();
        let gate = store.commit_guard();
        assert!(validate_read_set(&read_set, &gate).is_valid());
    }
}
