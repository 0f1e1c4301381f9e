//! Multithreaded tests for the engine
//!
//! These exercise behavior under real concurrency:
//!
//! 1. **Conservation** — concurrent transfers never create or destroy money
//! 2. **Commit ordering** — timestamps are unique and strictly increasing
//!    under load
//! 3. **Contention** — a single hot cell converges to the exact total
//! 4. **Concurrent submitters** — the engine is shared safely across
//!    submitting threads

use cellgate_engine::{Engine, EngineConfig, EngineError, RetryConfig, SubmitOptions};
use std::collections::HashSet;
use std::sync::Arc;

fn contended_engine(workers: usize) -> Arc<Engine<i64>> {
    Arc::new(Engine::new(
        EngineConfig::default()
            .with_workers(workers)
            .with_retry(
                RetryConfig::new()
                    .with_max_attempts(200)
                    .with_backoff_base_ms(0),
            ),
    ))
}

// ============================================================================
// SECTION 1: Conservation under concurrent transfers
// ============================================================================

mod conservation {
    use super::*;

    #[test]
    fn test_transfers_preserve_total_balance() {
        let engine = contended_engine(4);
        let accounts = [1u64, 2, 3, 4];
        for &account in &accounts {
            engine.initialize(account, 100).unwrap();
        }

        let mut handles = Vec::new();
        for i in 0..24u64 {
            let from = accounts[(i % 4) as usize];
            let to = accounts[((i + 1) % 4) as usize];
            handles.push(
                engine
                    .submit(
                        move |tx| {
                            let a = tx.read(from)?;
                            let b = tx.read(to)?;
                            if a < 10 {
                                return Err(EngineError::domain("insufficient funds"));
                            }
                            tx.write(from, a - 10);
                            tx.write(to, b + 10);
                            Ok(())
                        },
                        SubmitOptions::new().with_label("transfer"),
                    )
                    .unwrap(),
            );
        }

        engine.wait_for_quiescence();
        let total: i64 = accounts
            .iter()
            .map(|&a| engine.snapshot(a).unwrap())
            .sum();
        assert_eq!(total, 400, "transfers must conserve the total");
        // Every submission reached a terminal outcome
        assert!(handles.iter().all(|h| h.try_get().is_some()));
        engine.shutdown();
    }
}

// ============================================================================
// SECTION 2: Commit timestamp ordering under load
// ============================================================================

mod ordering {
    use super::*;

    #[test]
    fn test_commit_timestamps_unique_and_dense() {
        let engine = contended_engine(4);
        engine.initialize(1, 0).unwrap();

        let handles: Vec<_> = (0..40)
            .map(|_| {
                engine
                    .submit(
                        |tx| {
                            let v = tx.read(1)?;
                            tx.write(1, v + 1);
                            Ok(())
                        },
                        SubmitOptions::new(),
                    )
                    .unwrap()
            })
            .collect();

        engine.wait_for_quiescence();
        let timestamps: Vec<u64> = handles
            .iter()
            .map(|h| h.wait().commit_ts().expect("all must commit"))
            .collect();

        // No two committed transactions share a timestamp, and with no
        // aborted publications the clock is dense: exactly 1..=40.
        let unique: HashSet<u64> = timestamps.iter().copied().collect();
        assert_eq!(unique.len(), 40);
        assert_eq!(*unique.iter().min().unwrap(), 1);
        assert_eq!(*unique.iter().max().unwrap(), 40);
        assert_eq!(engine.clock(), 40);
        engine.shutdown();
    }
}

// ============================================================================
// SECTION 3: Hot-cell contention
// ============================================================================

mod contention {
    use super::*;

    #[test]
    fn test_hot_cell_converges_to_exact_total() {
        let engine = contended_engine(8);
        engine.initialize(1, 0).unwrap();

        let handles: Vec<_> = (0..100)
            .map(|_| {
                engine
                    .submit(
                        |tx| {
                            let v = tx.read(1)?;
                            tx.write(1, v + 1);
                            Ok(())
                        },
                        SubmitOptions::new(),
                    )
                    .unwrap()
            })
            .collect();

        engine.wait_for_quiescence();
        assert!(handles.iter().all(|h| h.wait().is_committed()));
        assert_eq!(engine.snapshot(1).unwrap(), 100);
        engine.shutdown();
    }
}

// ============================================================================
// SECTION 4: Concurrent submitters
// ============================================================================

mod submitters {
    use super::*;

    #[test]
    fn test_engine_shared_across_submitting_threads() {
        let engine = contended_engine(4);
        engine.initialize(1, 0).unwrap();

        let mut threads = Vec::new();
        for _ in 0..4 {
            let engine = Arc::clone(&engine);
            threads.push(std::thread::spawn(move || {
                for _ in 0..25 {
                    engine
                        .submit(
                            |tx| {
                                let v = tx.read(1)?;
                                tx.write(1, v + 1);
                                Ok(())
                            },
                            SubmitOptions::new(),
                        )
                        .unwrap();
                }
            }));
        }
        for thread in threads {
            thread.join().unwrap();
        }

        engine.wait_for_quiescence();
        assert_eq!(engine.snapshot(1).unwrap(), 100);
        assert_eq!(engine.stats().completed, 100);
        engine.shutdown();
    }

    #[test]
    fn test_access_sets_cover_workers_that_ran() {
        let engine = contended_engine(2);
        engine.initialize(5, 0).unwrap();
        engine.initialize(6, 0).unwrap();

        for _ in 0..10 {
            engine
                .submit(
                    |tx| {
                        let a = tx.read(5)?;
                        let b = tx.read(6)?;
                        tx.write(5, a + 1);
                        tx.write(6, b + 1);
                        Ok(())
                    },
                    SubmitOptions::new(),
                )
                .unwrap();
        }

        engine.wait_for_quiescence();
        let sets = engine.access_sets();
        assert!(!sets.is_empty());
        for keys in sets.values() {
            assert_eq!(keys, &vec![5, 6]);
        }
        engine.shutdown();
    }
}
