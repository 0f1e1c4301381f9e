//! Core types for the cellgate transactional-memory engine
//!
//! This crate defines the foundational vocabulary shared by the engine:
//! - `CellKey`, `Timestamp`, `WorkerId`, `Priority`: identifier aliases
//! - `Versioned<V>` / `CellHistory<V>`: the per-cell version sequence
//! - `EngineError`: the unified error hierarchy
//! - `TxnOutcome`: the terminal report of one submission

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod outcome;
pub mod types;
pub mod versioned;

pub use error::{EngineError, Result};
pub use outcome::TxnOutcome;
pub use types::{CellKey, Priority, Timestamp, WorkerId};
pub use versioned::{CellHistory, Versioned};
