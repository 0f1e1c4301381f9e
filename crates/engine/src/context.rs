//! Transaction context: the record of a single attempt
//!
//! A context buffers the effects of one attempt so that nothing touches
//! the store until commit. Reads go through three layers in order:
//!
//! 1. the write buffer (read-your-own-writes, no read-set entry),
//! 2. the read set (re-reads return the first observed value, which keeps
//!    reads stable for the whole attempt even while committers advance the
//!    store),
//! 3. the store, at the attempt's start timestamp (snapshot mode) or at
//!    the current head (mod-count mode).
//!
//! A context lives for exactly one attempt; retries build a fresh one.

use crate::store::VersionedStore;
use cellgate_core::{CellKey, Result, Timestamp, Versioned};
use std::collections::HashMap;
use std::sync::Arc;

/// How reads resolve against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadMode {
    /// Read the newest version with timestamp `<= start_ts` (MVCC and
    /// fast-path strategies).
    Snapshot,
    /// Read the current head (mod-count strategy; no history is kept, so
    /// within-attempt stability comes from the read-set cache).
    Latest,
}

/// Per-attempt read set, write buffer, and commit bookkeeping.
///
/// Handed to the transaction body as `&mut TransactionContext<V>`; the
/// body calls [`read`](Self::read) and [`write`](Self::write) and returns
/// `Ok(())` to request a commit.
pub struct TransactionContext<V> {
    store: Arc<VersionedStore<V>>,
    start_ts: Timestamp,
    read_mode: ReadMode,
    read_set: HashMap<CellKey, Versioned<V>>,
    write_set: HashMap<CellKey, V>,
    write_order: Vec<CellKey>,
}

impl<V: Clone> TransactionContext<V> {
    pub(crate) fn new(
        store: Arc<VersionedStore<V>>,
        start_ts: Timestamp,
        read_mode: ReadMode,
    ) -> Self {
        TransactionContext {
            store,
            start_ts,
            read_mode,
            read_set: HashMap::new(),
            write_set: HashMap::new(),
            write_order: Vec::new(),
        }
    }

    /// The global clock value captured when this attempt began.
    pub fn start_ts(&self) -> Timestamp {
        self.start_ts
    }

    /// Read a cell.
    ///
    /// Returns the buffered value if this attempt already wrote the key,
    /// the previously observed value if it already read the key, and
    /// otherwise consults the store. Fails with `NotFound` for a cell that
    /// was never initialized.
    pub fn read(&mut self, key: CellKey) -> Result<V> {
        if let Some(buffered) = self.write_set.get(&key) {
            return Ok(buffered.clone());
        }
        if let Some(observed) = self.read_set.get(&key) {
            return Ok(observed.value.clone());
        }

        let (value, version) = match self.read_mode {
            ReadMode::Snapshot => self.store.read_at(key, self.start_ts)?,
            ReadMode::Latest => self.store.latest(key)?,
        };
        self.read_set
            .insert(key, Versioned::new(version, value.clone()));
        Ok(value)
    }

    /// Buffer a write. Nothing reaches the store until commit, and no
    /// read-set entry is recorded (blind writes do not conflict).
    pub fn write(&mut self, key: CellKey, value: V) {
        if self.write_set.insert(key, value).is_none() {
            self.write_order.push(key);
        }
    }

    /// Number of distinct keys read from the store.
    pub fn read_count(&self) -> usize {
        self.read_set.len()
    }

    /// Number of distinct keys buffered for write.
    pub fn write_count(&self) -> usize {
        self.write_set.len()
    }

    /// Union of read and written keys, for the observational access log.
    pub fn access_set(&self) -> Vec<CellKey> {
        let mut keys: Vec<CellKey> = self.read_set.keys().copied().collect();
        for key in &self.write_order {
            if !self.read_set.contains_key(key) {
                keys.push(*key);
            }
        }
        keys.sort_unstable();
        keys
    }

    pub(crate) fn read_set(&self) -> &HashMap<CellKey, Versioned<V>> {
        &self.read_set
    }

    /// Buffered writes in insertion order.
    pub(crate) fn writes(&self) -> impl Iterator<Item = (CellKey, &V)> + '_ {
        self.write_order
            .iter()
            .map(move |key| (*key, &self.write_set[key]))
    }
}
