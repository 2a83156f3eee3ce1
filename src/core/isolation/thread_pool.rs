//! Thread-pool isolation with dedicated worker threads.
//!
//! The pool enforces immediate accept-or-reject admission: a submission
//! claims a slot from a counting set sized `pool_size + queue_capacity`, or
//! fails at once. Admitted jobs are handed to workers over a bounded
//! crossbeam channel; the submitting thread never blocks waiting for a free
//! worker, only (optionally) for the worker's result.
//!
//! # Design
//!
//! - **No polling**: workers block on channel `recv`; dropping the pool drops
//!   the sender and unblocks every idle worker.
//! - **Slot accounting is RAII**: the admitted job owns its slot permit and
//!   returns it when the job finishes, on every exit path including panics.
//! - **Workers survive user panics**: a panicking primary action is caught so
//!   the pool never shrinks below its configured size.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, info, warn};

use super::semaphore::ExecutionSemaphore;

/// A unit of work handed to a worker thread.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
struct PoolCounters {
    active: AtomicU32,
    submitted: AtomicU64,
    completed: AtomicU64,
    rejected: AtomicU64,
}

/// Snapshot of pool utilization.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of worker threads.
    pub pool_size: usize,
    /// Queued submissions accepted beyond busy workers.
    pub queue_capacity: usize,
    /// Slots currently claimed (queued plus running).
    pub in_flight: u32,
    /// Jobs currently executing on a worker.
    pub active: u32,
    /// Total submissions admitted.
    pub submitted: u64,
    /// Total jobs run to completion.
    pub completed: u64,
    /// Total submissions rejected at admission.
    pub rejected: u64,
}

/// Fixed-size worker pool guarding one command key.
///
/// Created once per key by the registry and never torn down while the
/// registry lives. Dropping the pool disconnects the task channel, which
/// ends each worker loop after its current job.
#[derive(Debug)]
pub struct CommandThreadPool {
    /// Admission slots, sized `pool_size + queue_capacity`.
    slots: Arc<ExecutionSemaphore>,
    /// Task sender to the workers.
    task_tx: Sender<Job>,
    counters: Arc<PoolCounters>,
    pool_size: usize,
    queue_capacity: usize,
}

impl CommandThreadPool {
    /// Create a pool and spawn its worker threads.
    ///
    /// `name` identifies the guarded key in worker thread names and logs.
    #[must_use]
    pub(crate) fn new(name: &str, pool_size: usize, queue_capacity: usize) -> Self {
        let capacity = pool_size + queue_capacity;
        let (task_tx, task_rx) = bounded::<Job>(capacity);
        let counters = Arc::new(PoolCounters::default());

        for worker_id in 0..pool_size {
            // Workers are detached; dropping `task_tx` is what ends them.
            let _detached = spawn_worker(
                format!("cordon-{name}-{worker_id}"),
                task_rx.clone(),
                Arc::clone(&counters),
            );
        }

        info!(
            pool = name,
            pool_size = pool_size,
            queue_capacity = queue_capacity,
            "thread pool isolation initialized"
        );

        Self {
            slots: Arc::new(ExecutionSemaphore::new(u32::try_from(capacity).unwrap_or(u32::MAX))),
            task_tx,
            counters,
            pool_size,
            queue_capacity,
        }
    }

    /// Admit a job if a slot is free, handing it to a worker.
    ///
    /// Returns `false` when all workers and queue slots are busy; the job is
    /// dropped and the caller must treat the submission as rejected. Never
    /// blocks.
    pub(crate) fn try_execute(&self, job: Job) -> bool {
        let Some(slot) = ExecutionSemaphore::acquire(&self.slots) else {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        // The job carries its slot to the worker; finishing (or unwinding)
        // there returns it.
        let admitted: Job = Box::new(move || {
            let _slot = slot;
            job();
        });

        match self.task_tx.try_send(admitted) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                // Admission is bounded by the channel capacity, so this only
                // fires if the workers are gone. The dropped job releases
                // its slot.
                warn!("task channel unavailable, submission rejected");
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Slots currently claimed (queued plus running).
    #[must_use]
    pub fn in_flight(&self) -> u32 {
        self.slots.in_use()
    }

    /// Current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            pool_size: self.pool_size,
            queue_capacity: self.queue_capacity,
            in_flight: self.slots.in_use(),
            active: self.counters.active.load(Ordering::Relaxed),
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Spawn one worker thread looping on the task channel.
fn spawn_worker(
    worker_name: String,
    task_rx: Receiver<Job>,
    counters: Arc<PoolCounters>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name(worker_name)
        .spawn(move || {
            // Blocking recv; when the sender is dropped the loop ends.
            loop {
                let job = match task_rx.recv() {
                    Ok(job) => job,
                    Err(_) => {
                        debug!("worker channel closed, exiting");
                        break;
                    }
                };

                counters.active.fetch_add(1, Ordering::Relaxed);
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    warn!("primary action panicked on worker thread");
                }
                counters.active.fetch_sub(1, Ordering::Relaxed);
                counters.completed.fetch_add(1, Ordering::Relaxed);
            }
        })
        .expect("failed to spawn command worker thread")
}
