//! Bounded concurrency gate with deterministic slot accounting
//!
//! The gate caps how many partitions are actively fetching at any moment.
//! It wraps a tokio semaphore (FIFO-ish admission, no starvation) and keeps
//! an atomic count of active holders plus a high-water mark, so the
//! concurrency bound is directly observable in tests without any network I/O.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Admission gate limiting the number of concurrently fetching partitions
///
/// `acquire()` suspends the caller until a slot is free; dropping the
/// returned [`GatePermit`] frees the slot. Cloning is cheap: all state is
/// Arc-wrapped and clones share the same slots.
#[derive(Clone)]
pub struct ConcurrencyGate {
    slots: Arc<Semaphore>,
    capacity: usize,
    active: Arc<AtomicUsize>,
    high_water: Arc<AtomicUsize>,
}

/// RAII permit for one gate slot
///
/// The slot is released when the permit is dropped, including on early
/// return or panic inside the holding task.
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    active: Arc<AtomicUsize>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `capacity` concurrent holders
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; `Config::validate` rejects that before
    /// a gate is ever constructed.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "gate capacity must be at least 1");
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            active: Arc::new(AtomicUsize::new(0)),
            high_water: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Acquire a slot, suspending until one is free
    pub async fn acquire(&self) -> GatePermit {
        // The semaphore is never closed, so acquire_owned cannot fail.
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .unwrap_or_else(|_| unreachable!("gate semaphore is never closed"));

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now_active, Ordering::SeqCst);

        GatePermit {
            _permit: permit,
            active: Arc::clone(&self.active),
        }
    }

    /// The configured maximum number of concurrent holders
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// The largest number of slots ever held simultaneously
    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }
}
