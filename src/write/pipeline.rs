//! Shared state of one archive build.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use super::options::ZipOptions;
use crate::Error;
use crate::codec::BlockCompressor;
use crate::rate_limit::{CpuRateLimiter, MemoryRateLimiter};

/// Limiters, compressor and abort state shared by the producer, the worker
/// tasks and the sequencer.
///
/// The first error reported through [`fail`](Self::fail) is kept; later
/// ones are dropped. Failing also stops both limiters so that a producer
/// blocked on admission wakes up with [`Error::Cancelled`].
#[derive(Debug)]
pub(crate) struct Pipeline {
    pub(crate) cpu: CpuRateLimiter,
    pub(crate) memory: MemoryRateLimiter,
    pub(crate) compressor: BlockCompressor,
    aborted: AtomicBool,
    first_error: Mutex<Option<Error>>,
}

impl Pipeline {
    pub(crate) fn new(options: &ZipOptions) -> Self {
        Self {
            cpu: CpuRateLimiter::new(options.jobs),
            memory: MemoryRateLimiter::new(options.memory_limit),
            compressor: BlockCompressor::new(options.level),
            aborted: AtomicBool::new(false),
            first_error: Mutex::new(None),
        }
    }

    /// Records `err` unless an error is already recorded, then aborts.
    ///
    /// Must be called before dropping any channel end the failing
    /// component owns.
    pub(crate) fn fail(&self, err: Error) {
        if !err.is_cancelled() {
            let mut slot = self
                .first_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if slot.is_none() {
                log::debug!("aborting archive: {err}");
                *slot = Some(err);
            }
        }
        self.abort();
    }

    /// Raises the abort flag and stops admission.
    pub(crate) fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.cpu.stop();
        self.memory.stop();
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Takes the recorded error, or [`Error::Cancelled`] if none was recorded.
    pub(crate) fn take_error(&self) -> Error {
        self.first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or(Error::Cancelled)
    }
}
