//! Priority scheduler and worker pool
//!
//! A fixed pool of named worker threads consumes a priority queue of
//! submitted jobs: higher priority first, FIFO within a priority class
//! (enforced by a monotonically increasing sequence number). Workers wait
//! on a condvar when the queue is empty, pop the head by move, and run it
//! without holding the queue lock.
//!
//! Quiescence is the condition "nothing queued and nothing in flight";
//! waiters block on a second condvar that in-flight bookkeeping notifies.
//! An RAII guard pairs every pop with a decrement and a panicking job is
//! contained with `catch_unwind`, so a misbehaving closure cannot wedge
//! quiescence or kill its worker.
//!
//! `shutdown` discards jobs that have not started, lets in-flight jobs
//! finish, and joins the workers. Discarded jobs never resolve their
//! completion handles; use the timeout variants when that matters.

use cellgate_core::{EngineError, Priority, Result, WorkerId};
use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::error;

/// Point-in-time scheduler counters.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerStats {
    /// Jobs waiting in the queue.
    pub queued: usize,
    /// Jobs currently running on a worker.
    pub in_flight: usize,
    /// Jobs that ran to a terminal outcome since construction.
    pub completed: u64,
    /// Worker pool size.
    pub workers: usize,
}

struct Envelope {
    priority: Priority,
    sequence: u64,
    job: Box<dyn FnOnce(WorkerId) + Send>,
}

impl Eq for Envelope {}

impl PartialEq for Envelope {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

// Max-heap order: higher priority first, then earlier sequence first.
impl Ord for Envelope {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then(other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Envelope {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct PoolInner {
    queue: Mutex<BinaryHeap<Envelope>>,
    work_ready: Condvar,
    quiesced: Condvar,
    shutdown: AtomicBool,
    sequence: AtomicU64,
    queued: AtomicUsize,
    in_flight: AtomicUsize,
    completed: AtomicU64,
}

impl PoolInner {
    fn is_quiescent(&self) -> bool {
        self.queued.load(AtomicOrdering::Acquire) == 0
            && self.in_flight.load(AtomicOrdering::Acquire) == 0
    }
}

/// Fixed pool of workers draining a priority queue.
pub struct WorkerPool {
    inner: Arc<PoolInner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl WorkerPool {
    /// Spawn `size` workers named `cellgate-worker-N`.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let inner = Arc::new(PoolInner {
            queue: Mutex::new(BinaryHeap::new()),
            work_ready: Condvar::new(),
            quiesced: Condvar::new(),
            shutdown: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
            queued: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
        });

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let inner = Arc::clone(&inner);
            let handle = std::thread::Builder::new()
                .name(format!("cellgate-worker-{}", id))
                .spawn(move || worker_loop(id, &inner))
                .expect("failed to spawn worker thread");
            workers.push(handle);
        }

        WorkerPool {
            inner,
            workers: Mutex::new(workers),
            size,
        }
    }

    /// Enqueue a job and wake one worker. The queue is unbounded.
    ///
    /// Fails with `Shutdown` once `shutdown` has been called.
    pub fn submit(
        &self,
        priority: Priority,
        job: impl FnOnce(WorkerId) + Send + 'static,
    ) -> Result<()> {
        if self.inner.shutdown.load(AtomicOrdering::Acquire) {
            return Err(EngineError::Shutdown);
        }

        let sequence = self.inner.sequence.fetch_add(1, AtomicOrdering::Relaxed);
        let envelope = Envelope {
            priority,
            sequence,
            job: Box::new(job),
        };

        {
            let mut queue = self.inner.queue.lock();
            queue.push(envelope);
            self.inner.queued.fetch_add(1, AtomicOrdering::Release);
        }
        self.inner.work_ready.notify_one();
        Ok(())
    }

    /// Block until every submitted job has reached a terminal outcome.
    pub fn wait_for_quiescence(&self) {
        let mut queue = self.inner.queue.lock();
        while !self.inner.is_quiescent() {
            self.inner.quiesced.wait(&mut queue);
        }
    }

    /// Like [`wait_for_quiescence`](Self::wait_for_quiescence), bounded by
    /// `timeout`. Returns whether quiescence was reached.
    pub fn wait_for_quiescence_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut queue = self.inner.queue.lock();
        while !self.inner.is_quiescent() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            if self
                .inner
                .quiesced
                .wait_for(&mut queue, deadline - now)
                .timed_out()
                && !self.inner.is_quiescent()
            {
                return false;
            }
        }
        true
    }

    /// Stop the pool: jobs not yet started are discarded, in-flight jobs
    /// complete, workers are joined. Idempotent.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, AtomicOrdering::Release);

        // Lock the queue before notifying to close the window between a
        // worker's shutdown check and its condvar wait.
        {
            let mut queue = self.inner.queue.lock();
            let discarded = queue.len();
            queue.clear();
            self.inner.queued.store(0, AtomicOrdering::Release);
            if discarded > 0 {
                tracing::debug!(discarded, "shutdown discarded pending submissions");
            }
            self.inner.work_ready.notify_all();
        }

        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            let _ = handle.join();
        }

        // Workers are gone, so nothing is queued or in flight any more.
        let _queue = self.inner.queue.lock();
        self.inner.quiesced.notify_all();
    }

    /// Counter snapshot.
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            queued: self.inner.queued.load(AtomicOrdering::Relaxed),
            in_flight: self.inner.in_flight.load(AtomicOrdering::Relaxed),
            completed: self.inner.completed.load(AtomicOrdering::Relaxed),
            workers: self.size,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Pairs a popped job with its in-flight decrement so bookkeeping survives
/// a panicking job; notifies quiescence waiters when the pool drains.
struct InFlightGuard<'a> {
    inner: &'a PoolInner,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let prev = self.inner.in_flight.fetch_sub(1, AtomicOrdering::Release);
        self.inner.completed.fetch_add(1, AtomicOrdering::Relaxed);
        if prev == 1 && self.inner.queued.load(AtomicOrdering::Acquire) == 0 {
            let _queue = self.inner.queue.lock();
            self.inner.quiesced.notify_all();
        }
    }
}

fn worker_loop(worker_id: WorkerId, inner: &PoolInner) {
    loop {
        let envelope = {
            let mut queue = inner.queue.lock();
            loop {
                // Shutdown check precedes the pop: pending work that has
                // not started is discarded, not drained.
                if inner.shutdown.load(AtomicOrdering::Acquire) {
                    return;
                }
                if let Some(envelope) = queue.pop() {
                    inner.queued.fetch_sub(1, AtomicOrdering::Release);
                    inner.in_flight.fetch_add(1, AtomicOrdering::Release);
                    break envelope;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        let _guard = InFlightGuard { inner };
        let job = envelope.job;
        if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            job(worker_id)
        })) {
            error!(
                worker_id,
                "transaction job panicked: {:?}",
                panic.downcast_ref::<&str>().copied().unwrap_or("(non-string panic)")
            );
        }
    }
}
