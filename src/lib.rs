//! # cellgate
//!
//! A software-transactional-memory engine: versioned cells, optimistic
//! read/write buffering, a single commit gate with read-set validation,
//! bounded retry with back-off, and a priority-scheduled worker pool.
//!
//! # Quick start
//!
//! ```
//! use cellgate::{Engine, EngineConfig, SubmitOptions};
//!
//! let engine: Engine<f64> = Engine::new(EngineConfig::default().with_workers(2));
//! engine.initialize(1, 10_000.0).unwrap(); // account 1
//! engine.initialize(2, 20_000.0).unwrap(); // account 2
//!
//! // Transfer 5000 from account 1 to account 2, atomically.
//! let handle = engine
//!     .submit(
//!         |tx| {
//!             let from = tx.read(1)?;
//!             let to = tx.read(2)?;
//!             if from < 5_000.0 {
//!                 return Err(cellgate::EngineError::domain("insufficient funds"));
//!             }
//!             tx.write(1, from - 5_000.0);
//!             tx.write(2, to + 5_000.0);
//!             Ok(())
//!         },
//!         SubmitOptions::new().with_priority(10).with_label("transfer"),
//!     )
//!     .unwrap();
//!
//! assert!(handle.wait().is_committed());
//! assert_eq!(engine.snapshot(1).unwrap(), 5_000.0);
//! assert_eq!(engine.snapshot(2).unwrap(), 25_000.0);
//! engine.shutdown();
//! ```
//!
//! # Guarantees
//!
//! - **Serializability**: commits are linearized under a process-wide gate;
//!   commit order equals commit-timestamp order.
//! - **Snapshot isolation within an attempt**: re-reading a cell returns
//!   the value first observed, regardless of concurrent commits.
//! - **Atomicity**: a conflicted or failed attempt publishes nothing.
//! - **Priority dispatch**: higher priority first, FIFO within a class.
//!
//! The internal crates (`cellgate-core`, `cellgate-engine`) are not
//! stability boundaries; depend on this facade.

pub use cellgate_engine::*;
