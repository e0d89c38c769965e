//! ## blockpool-core::alloc::stats
//! **Allocation statistics and tracking**
//!
//! Operation counters for a pool session plus the point-in-time
//! [`PoolStats`] snapshot returned by `PoolAllocator::stats`.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

/// Operation counters for one pool session.
///
/// Counters are atomics so they can be read without taking the pool lock.
#[derive(Debug, Default)]
pub struct MemoryStats {
    allocations: AtomicUsize,
    failed_allocations: AtomicUsize,
    frees: AtomicUsize,
    rejected_frees: AtomicUsize,
    splits: AtomicUsize,
    merges: AtomicUsize,
    relocations: AtomicUsize,
}

impl MemoryStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_allocations(&self) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_failed_allocations(&self) {
        self.failed_allocations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_frees(&self) {
        self.frees.fetch_add(1, Ordering::Relaxed);
    }

    /// Untracked handles and double frees.
    #[inline]
    pub fn increment_rejected_frees(&self) {
        self.rejected_frees.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_splits(&self) {
        self.splits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_merges(&self, count: usize) {
        self.merges.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_relocations(&self) {
        self.relocations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    pub fn failed_allocations(&self) -> usize {
        self.failed_allocations.load(Ordering::Relaxed)
    }

    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::Relaxed)
    }

    pub fn rejected_frees(&self) -> usize {
        self.rejected_frees.load(Ordering::Relaxed)
    }

    pub fn splits(&self) -> usize {
        self.splits.load(Ordering::Relaxed)
    }

    pub fn merges(&self) -> usize {
        self.merges.load(Ordering::Relaxed)
    }

    pub fn relocations(&self) -> usize {
        self.relocations.load(Ordering::Relaxed)
    }

    /// Zeroes every counter. Called when a session is torn down.
    pub fn reset(&self) {
        for counter in [
            &self.allocations,
            &self.failed_allocations,
            &self.frees,
            &self.rejected_frees,
            &self.splits,
            &self.merges,
            &self.relocations,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Point-in-time view of a pool session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub capacity: usize,
    pub in_use_bytes: usize,
    pub free_bytes: usize,
    pub blocks: usize,
    pub free_blocks: usize,
    pub largest_free: usize,
    pub allocations: usize,
    pub failed_allocations: usize,
    pub frees: usize,
    pub rejected_frees: usize,
    pub splits: usize,
    pub merges: usize,
    pub relocations: usize,
}

impl PoolStats {
    /// Share of free bytes not contained in the largest free block, in
    /// `[0.0, 1.0]`.
    pub fn fragmentation(&self) -> f64 {
        if self.free_bytes == 0 {
            return 0.0;
        }
        1.0 - self.largest_free as f64 / self.free_bytes as f64
    }
}
