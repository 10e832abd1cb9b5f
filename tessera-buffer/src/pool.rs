use std::sync::atomic::{AtomicUsize, Ordering};

use tessera_error::{TesseraResult, tessera_err};

/// Tracks the bytes currently allocated through the process-wide pool.
///
/// Allocation failure is reported as `OutOfMemory` rather than aborting, so
/// callers can surface it through their own status channel.
#[derive(Debug, Default)]
pub struct MemoryPool {
    bytes_allocated: AtomicUsize,
}

impl MemoryPool {
    /// Allocate `nbytes` of zeroed memory, charged to this pool.
    ///
    /// The returned vector is backed by `u64` words so that any native
    /// element type up to 8 bytes wide can be viewed over it.
    pub fn allocate(&self, nbytes: usize) -> TesseraResult<Vec<u64>> {
        let nwords = nbytes.div_ceil(size_of::<u64>());
        let mut words = Vec::new();
        words
            .try_reserve_exact(nwords)
            .map_err(|_| tessera_err!(OutOfMemory: "failed to allocate {} bytes", nbytes))?;
        words.resize(nwords, 0u64);
        self.bytes_allocated.fetch_add(nbytes, Ordering::Relaxed);
        Ok(words)
    }

    /// Return `nbytes` to the pool's accounting.
    pub fn release(&self, nbytes: usize) {
        self.bytes_allocated.fetch_sub(nbytes, Ordering::Relaxed);
    }

    /// Bytes currently charged to this pool.
    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated.load(Ordering::Relaxed)
    }
}

/// The process-wide memory pool used by [`crate::Buffer`] allocation.
pub fn memory_pool() -> &'static MemoryPool {
    static POOL: MemoryPool = MemoryPool {
        bytes_allocated: AtomicUsize::new(0),
    };
    &POOL
}
