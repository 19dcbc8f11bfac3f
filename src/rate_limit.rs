//! Admission control for CPU slots and memory.
//!
//! This module provides [`RateLimiter`], a blocking token-budget gate, and
//! two specializations: [`CpuRateLimiter`] bounding the number of concurrent
//! compression tasks and [`MemoryRateLimiter`] bounding the bytes of file
//! content held in memory.
//!
//! # Admission rule
//!
//! A request is admitted immediately when nothing is in use, whatever its
//! size, so a single item larger than the whole budget still makes progress.
//! Otherwise it waits until `used + size <= capacity`. Requests are served in
//! arrival order: a large request at the head of the queue holds back smaller
//! requests that arrived after it.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use parzip::rate_limit::RateLimiter;
//!
//! let limiter = Arc::new(RateLimiter::new(100));
//!
//! // Oversized requests are admitted when the limiter is idle.
//! let big = RateLimiter::reserve(&limiter, 250)?;
//! assert_eq!(limiter.used(), 250);
//!
//! // The reservation is released on drop.
//! drop(big);
//! assert_eq!(limiter.used(), 0);
//! # Ok::<(), parzip::Error>(())
//! ```

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::{Error, Result};

/// Default memory budget: 512 MiB.
pub const DEFAULT_MEMORY_LIMIT: u64 = 512 * 1024 * 1024;

#[derive(Debug, Default)]
struct LimiterState {
    used: u64,
    peak: u64,
    next_ticket: u64,
    serving: u64,
    stopped: bool,
}

/// A blocking token-budget gate.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u64,
    state: Mutex<LimiterState>,
    changed: Condvar,
}

impl RateLimiter {
    /// Creates a limiter with the given capacity.
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            state: Mutex::new(LimiterState::default()),
            changed: Condvar::new(),
        }
    }

    /// Returns the capacity.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Returns the amount currently admitted and not yet finished.
    pub fn used(&self) -> u64 {
        self.lock().used
    }

    /// Returns the highest amount in use at any one time.
    pub fn peak(&self) -> u64 {
        self.lock().peak
    }

    /// Returns true once [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Blocks until `size` units are admitted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the limiter is stopped before or while
    /// waiting.
    pub fn request(&self, size: u64) -> Result<()> {
        let mut state = self.lock();
        let ticket = state.next_ticket;
        state.next_ticket += 1;

        loop {
            if state.stopped {
                return Err(Error::Cancelled);
            }
            if state.serving == ticket
                && (state.used == 0 || state.used.saturating_add(size) <= self.capacity)
            {
                state.used += size;
                state.peak = state.peak.max(state.used);
                state.serving += 1;
                // The next ticket may fit as well.
                self.changed.notify_all();
                return Ok(());
            }
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Releases `size` units admitted by an earlier [`request`](Self::request).
    ///
    /// # Panics
    ///
    /// Panics if more is released than is in use.
    pub fn finish(&self, size: u64) {
        let mut state = self.lock();
        assert!(
            size <= state.used,
            "rate limiter released {size} units with only {} in use",
            state.used
        );
        state.used -= size;
        drop(state);
        self.changed.notify_all();
    }

    /// Stops admission: blocked and future requests fail with [`Error::Cancelled`].
    pub fn stop(&self) {
        self.lock().stopped = true;
        self.changed.notify_all();
    }

    /// Requests `size` units and returns a guard that finishes them on drop.
    pub fn reserve(this: &Arc<Self>, size: u64) -> Result<Reservation> {
        this.request(size)?;
        Ok(Reservation {
            limiter: Arc::clone(this),
            size,
        })
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        // A panic while holding the lock is an accounting failure that has
        // already been reported; the counters themselves stay consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Units admitted by a [`RateLimiter`], finished when dropped.
#[derive(Debug)]
#[must_use = "dropping a reservation releases it immediately"]
pub struct Reservation {
    limiter: Arc<RateLimiter>,
    size: u64,
}

impl Reservation {
    /// Returns the reserved amount.
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.limiter.finish(self.size);
    }
}

/// Bounds the number of concurrently running compression tasks.
#[derive(Debug, Clone)]
pub struct CpuRateLimiter {
    inner: Arc<RateLimiter>,
}

impl CpuRateLimiter {
    /// Creates a limiter with `jobs` slots; `0` uses the available parallelism.
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { default_jobs() } else { jobs };
        Self {
            inner: Arc::new(RateLimiter::new(jobs as u64)),
        }
    }

    /// Number of slots.
    pub fn jobs(&self) -> usize {
        self.inner.capacity() as usize
    }

    /// Blocks until one slot is free.
    pub fn request(&self) -> Result<()> {
        self.inner.request(1)
    }

    /// Releases one slot.
    pub fn finish(&self) {
        self.inner.finish(1);
    }

    /// Acquires one slot held until the guard is dropped.
    pub fn acquire(&self) -> Result<Reservation> {
        RateLimiter::reserve(&self.inner, 1)
    }

    /// Stops admission.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// The underlying limiter.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.inner
    }
}

/// Bounds the number of bytes of file content held in memory.
#[derive(Debug, Clone)]
pub struct MemoryRateLimiter {
    inner: Arc<RateLimiter>,
}

impl MemoryRateLimiter {
    /// Creates a limiter with a byte budget; `0` uses [`DEFAULT_MEMORY_LIMIT`].
    pub fn new(limit: u64) -> Self {
        let limit = if limit == 0 {
            DEFAULT_MEMORY_LIMIT
        } else {
            limit
        };
        Self {
            inner: Arc::new(RateLimiter::new(limit)),
        }
    }

    /// Byte budget.
    pub fn limit(&self) -> u64 {
        self.inner.capacity()
    }

    /// Blocks until `bytes` fit the budget.
    pub fn request(&self, bytes: u64) -> Result<()> {
        self.inner.request(bytes)
    }

    /// Releases `bytes`.
    pub fn finish(&self, bytes: u64) {
        self.inner.finish(bytes);
    }

    /// Reserves `bytes` until the guard is dropped.
    pub fn acquire(&self, bytes: u64) -> Result<Reservation> {
        RateLimiter::reserve(&self.inner, bytes)
    }

    /// Stops admission.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// The underlying limiter.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.inner
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
