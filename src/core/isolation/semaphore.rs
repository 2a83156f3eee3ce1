//! Counting-permit isolation.
//!
//! Semaphore isolation bounds concurrency without introducing new threads:
//! the caller thread runs the primary action itself, but must first win a
//! permit. Acquisition is immediate success-or-reject; callers are never
//! queued.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// A counting permit set enforcing a hard concurrency bound.
///
/// Accounting is lock-free: a CAS loop claims a permit, a single atomic add
/// returns it. The in-use count never exceeds `max_concurrent` and never goes
/// negative.
#[derive(Debug)]
pub struct ExecutionSemaphore {
    /// Permits currently available.
    available: AtomicU32,
    /// Total permits.
    max_concurrent: u32,
}

impl ExecutionSemaphore {
    /// Create a permit set of the given size.
    #[must_use]
    pub fn new(max_concurrent: u32) -> Self {
        Self {
            available: AtomicU32::new(max_concurrent),
            max_concurrent,
        }
    }

    /// Try to claim a permit without blocking.
    ///
    /// Returns a guard that returns the permit on drop, or `None` when no
    /// permit is available. The guard owns a reference to the semaphore, so
    /// it may be moved to (and dropped on) another thread.
    #[must_use]
    pub fn acquire(semaphore: &Arc<Self>) -> Option<SemaphorePermit> {
        if semaphore.try_reserve() {
            Some(SemaphorePermit {
                semaphore: Arc::clone(semaphore),
            })
        } else {
            None
        }
    }

    /// Total permits.
    #[must_use]
    pub const fn max_concurrent(&self) -> u32 {
        self.max_concurrent
    }

    /// Permits currently claimed.
    #[must_use]
    pub fn in_use(&self) -> u32 {
        self.max_concurrent - self.available.load(Ordering::Acquire)
    }

    /// Permits currently available.
    #[must_use]
    pub fn available(&self) -> u32 {
        self.available.load(Ordering::Acquire)
    }

    /// Claim a permit via CAS loop. Returns false when none is available.
    fn try_reserve(&self) -> bool {
        let mut current = self.available.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return false;
            }
            match self.available.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    fn release(&self) {
        self.available.fetch_add(1, Ordering::Release);
    }
}

/// A claimed permit. Returned to the semaphore on drop, on every exit path
/// including panics in the guarded action.
#[derive(Debug)]
pub struct SemaphorePermit {
    semaphore: Arc<ExecutionSemaphore>,
}

impl Drop for SemaphorePermit {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_acquire_up_to_capacity() {
        let sem = Arc::new(ExecutionSemaphore::new(2));

        let first = ExecutionSemaphore::acquire(&sem);
        let second = ExecutionSemaphore::acquire(&sem);
        assert!(first.is_some());
        assert!(second.is_some());
        assert_eq!(sem.in_use(), 2);

        assert!(ExecutionSemaphore::acquire(&sem).is_none());
    }

    #[test]
    fn test_permit_released_on_drop() {
        let sem = Arc::new(ExecutionSemaphore::new(1));

        let permit = ExecutionSemaphore::acquire(&sem).expect("permit");
        assert_eq!(sem.available(), 0);
        drop(permit);
        assert_eq!(sem.available(), 1);
        assert_eq!(sem.in_use(), 0);
    }

    #[test]
    fn test_permit_released_on_panic() {
        let sem = Arc::new(ExecutionSemaphore::new(1));
        let sem_clone = Arc::clone(&sem);

        let result = thread::spawn(move || {
            let _permit = ExecutionSemaphore::acquire(&sem_clone).expect("permit");
            panic!("guarded action panicked");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(sem.in_use(), 0);
    }

    #[test]
    fn test_concurrent_acquire_never_exceeds_capacity() {
        let sem = Arc::new(ExecutionSemaphore::new(4));
        let mut handles = Vec::new();

        for _ in 0..16 {
            let sem = Arc::clone(&sem);
            handles.push(thread::spawn(move || {
                let mut claimed = 0_u32;
                for _ in 0..1000 {
                    if let Some(permit) = ExecutionSemaphore::acquire(&sem) {
                        assert!(sem.in_use() <= sem.max_concurrent());
                        claimed += 1;
                        drop(permit);
                    }
                }
                claimed
            }));
        }

        for handle in handles {
            handle.join().expect("worker thread");
        }
        assert_eq!(sem.in_use(), 0);
        assert_eq!(sem.available(), 4);
    }
}
