//! Foundational identifier types for the engine
//!
//! Cell keys are caller-chosen integers over a flat, sparse key space.
//! Timestamps are commit-clock values; the clock starts at zero and each
//! successful commit advances it by exactly one.

/// Identifier of a versioned cell. Chosen by the caller; the key space is
/// flat and sparse (an account number, a memory location, a wallet id).
pub type CellKey = u64;

/// A commit-clock value. Version tags on cell history entries are
/// timestamps; `0` marks the initial version written by `initialize`.
pub type Timestamp = u64;

/// Index of a worker thread inside the pool, `0..workers`.
pub type WorkerId = usize;

/// Submission priority. Higher values dispatch first; ties are broken by
/// submission order (FIFO within a priority class).
pub type Priority = i32;
