//! ## blockpool-core::alloc::pool
//! **First-fit pool allocator session**
//!
//! A [`PoolAllocator`] owns one arena and the block directory partitioning
//! it. Every operation takes the session lock for its full duration,
//! `resize` included, so the directory is never observed mid-mutation.
use std::fmt;
use std::ops::Range;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::arena::Arena;
use super::directory::{Block, BlockInfo, Directory, Located};
use super::stats::{MemoryStats, PoolStats};
use crate::error::{AuditError, PoolError};

/// Default split threshold: four machine words, the footprint of a block
/// record (size, availability, start, link).
pub const DEFAULT_SPLIT_OVERHEAD: usize = 4 * std::mem::size_of::<usize>();

/// Offset of an allocated block inside the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle(usize);

impl Handle {
    #[inline]
    pub const fn from_offset(offset: usize) -> Self {
        Self(offset)
    }

    #[inline]
    pub const fn offset(self) -> usize {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Which free neighbours a released block is merged with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoalescePolicy {
    /// Merge only with free successors.
    Forward,
    /// Merge with free successors and a free predecessor.
    #[default]
    Bidirectional,
}

/// How a free of an already free block is reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoubleFreePolicy {
    /// Idempotent: answer [`Release::AlreadyFree`].
    #[default]
    Ignore,
    /// Answer [`PoolError::DoubleFree`].
    Reject,
}

/// Tunables of a pool session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocatorOptions {
    /// A free block is split only when it exceeds the request by more than
    /// this many bytes.
    pub split_overhead: usize,
    pub coalesce: CoalescePolicy,
    pub double_free: DoubleFreePolicy,
}

impl Default for AllocatorOptions {
    fn default() -> Self {
        Self {
            split_overhead: DEFAULT_SPLIT_OVERHEAD,
            coalesce: CoalescePolicy::default(),
            double_free: DoubleFreePolicy::default(),
        }
    }
}

/// Outcome of a successful [`PoolAllocator::free`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Release {
    /// The block was already free; nothing changed.
    AlreadyFree,
    /// The block was released; `merged` neighbouring records were absorbed.
    Released { merged: usize },
}

#[derive(Debug)]
struct PoolState {
    arena: Arena,
    directory: Directory,
}

impl PoolState {
    fn in_use_block(&self, handle: Handle) -> Result<&Block, PoolError> {
        let located = self
            .directory
            .locate(handle.0)
            .ok_or(PoolError::Untracked(handle))?;
        let block = self.directory.get(located.id);
        if block.available {
            return Err(PoolError::NotAllocated(handle));
        }
        Ok(block)
    }

    fn checked_range(
        &self,
        handle: Handle,
        offset: usize,
        len: usize,
    ) -> Result<Range<usize>, PoolError> {
        let block = self.in_use_block(handle)?;
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= block.size)
            .ok_or(PoolError::OutOfBounds {
                handle,
                offset,
                len,
                size: block.size,
            })?;
        Ok(block.start + offset..block.start + end)
    }
}

/// A manually managed allocator over one fixed-size byte arena.
///
/// The session starts uninitialized when built with [`PoolAllocator::new`];
/// [`PoolAllocator::init`] reserves the arena and [`PoolAllocator::teardown`]
/// releases it again. Handles are arena offsets: after a teardown every
/// outstanding handle is dangling, and presenting one to a re-initialized
/// session is undefined by contract (it may alias a newer block).
#[derive(Debug)]
pub struct PoolAllocator {
    state: Mutex<Option<PoolState>>,
    options: AllocatorOptions,
    stats: MemoryStats,
}

impl PoolAllocator {
    /// Creates an uninitialized session.
    pub fn new(options: AllocatorOptions) -> Self {
        Self {
            state: Mutex::new(None),
            options,
            stats: MemoryStats::new(),
        }
    }

    /// Creates a session with default options and initializes it with
    /// `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Result<Self, PoolError> {
        Self::with_options(capacity, AllocatorOptions::default())
    }

    pub fn with_options(capacity: usize, options: AllocatorOptions) -> Result<Self, PoolError> {
        let pool = Self::new(options);
        pool.init(capacity)?;
        Ok(pool)
    }

    pub fn options(&self) -> AllocatorOptions {
        self.options
    }

    /// Reserves the arena and creates a single free block covering it.
    ///
    /// Fails with [`PoolError::AlreadyInitialized`] on a live session, which
    /// is left untouched, and with [`PoolError::BackingStorage`] (fatal) when
    /// the arena cannot be reserved.
    pub fn init(&self, capacity: usize) -> Result<(), PoolError> {
        let mut state = self.state.lock();
        if let Some(live) = state.as_ref() {
            return Err(PoolError::AlreadyInitialized {
                capacity: live.directory.capacity(),
            });
        }

        let arena = Arena::reserve(capacity)?;
        *state = Some(PoolState {
            arena,
            directory: Directory::new(capacity),
        });
        self.stats.reset();
        info!(capacity, "Pool session initialized");
        Ok(())
    }

    /// Releases the arena and every block record. Outstanding handles become
    /// dangling.
    pub fn teardown(&self) -> Result<(), PoolError> {
        let mut state = self.state.lock();
        let released = state.take().ok_or(PoolError::NotInitialized)?;
        info!(
            capacity = released.directory.capacity(),
            blocks = released.directory.len(),
            "Pool session torn down"
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Arena capacity, or `None` when the session is not initialized.
    pub fn capacity(&self) -> Option<usize> {
        self.state
            .lock()
            .as_ref()
            .map(|state| state.directory.capacity())
    }

    /// Allocates at least `size` bytes from the first free block large enough.
    ///
    /// A zero-sized request yields `Ok(None)`.
    pub fn allocate(&self, size: usize) -> Result<Option<Handle>, PoolError> {
        if size == 0 {
            return Ok(None);
        }
        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or(PoolError::NotInitialized)?;
        self.allocate_locked(state, size).map(Some)
    }

    /// Returns the block behind `handle` to the pool and coalesces it with
    /// its free neighbours.
    ///
    /// Untracked handles are reported and ignored. Freeing an already free
    /// block follows [`DoubleFreePolicy`].
    pub fn free(&self, handle: Handle) -> Result<Release, PoolError> {
        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or(PoolError::NotInitialized)?;
        self.free_locked(state, handle)
    }

    /// Grows the block behind `handle` to at least `new_size` bytes.
    ///
    /// - `None` behaves like [`PoolAllocator::allocate`].
    /// - `new_size == 0` frees the block and yields `Ok(None)`.
    /// - A block already large enough keeps its handle.
    /// - Otherwise the contents move to a new block. If no block fits, the
    ///   original stays allocated with its bytes intact.
    pub fn resize(
        &self,
        handle: Option<Handle>,
        new_size: usize,
    ) -> Result<Option<Handle>, PoolError> {
        let Some(handle) = handle else {
            return self.allocate(new_size);
        };

        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or(PoolError::NotInitialized)?;

        if new_size == 0 {
            self.free_locked(state, handle)?;
            return Ok(None);
        }

        let old_size = state.in_use_block(handle)?.size;
        if old_size >= new_size {
            debug!(%handle, old_size, new_size, "Resize satisfied in place");
            return Ok(Some(handle));
        }

        let relocated = self.allocate_locked(state, new_size)?;
        state
            .arena
            .copy_within(handle.0, relocated.0, old_size.min(new_size));
        self.free_locked(state, handle)?;
        self.stats.increment_relocations();
        debug!(from = %handle, to = %relocated, new_size, "Block relocated");
        Ok(Some(relocated))
    }

    /// Copies `bytes` into the block behind `handle`, starting at `offset`.
    pub fn write(&self, handle: Handle, offset: usize, bytes: &[u8]) -> Result<(), PoolError> {
        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or(PoolError::NotInitialized)?;
        let range = state.checked_range(handle, offset, bytes.len())?;
        state.arena.slice_mut(range).copy_from_slice(bytes);
        Ok(())
    }

    /// Fills `buf` from the block behind `handle`, starting at `offset`.
    pub fn read(&self, handle: Handle, offset: usize, buf: &mut [u8]) -> Result<(), PoolError> {
        let guard = self.state.lock();
        let state = guard.as_ref().ok_or(PoolError::NotInitialized)?;
        let range = state.checked_range(handle, offset, buf.len())?;
        buf.copy_from_slice(state.arena.slice(range));
        Ok(())
    }

    /// Runs `f` over the full byte range of the block behind `handle`.
    pub fn with_block<R>(&self, handle: Handle, f: impl FnOnce(&[u8]) -> R) -> Result<R, PoolError> {
        let guard = self.state.lock();
        let state = guard.as_ref().ok_or(PoolError::NotInitialized)?;
        let size = state.in_use_block(handle)?.size;
        Ok(f(state.arena.slice(handle.0..handle.0 + size)))
    }

    pub fn with_block_mut<R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Result<R, PoolError> {
        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or(PoolError::NotInitialized)?;
        let size = state.in_use_block(handle)?.size;
        Ok(f(state.arena.slice_mut(handle.0..handle.0 + size)))
    }

    /// Usable size of the block behind `handle`. May exceed the requested
    /// size when the block was not split.
    pub fn block_size(&self, handle: Handle) -> Result<usize, PoolError> {
        let guard = self.state.lock();
        let state = guard.as_ref().ok_or(PoolError::NotInitialized)?;
        Ok(state.in_use_block(handle)?.size)
    }

    /// Directory snapshot in address order.
    pub fn blocks(&self) -> Result<Vec<BlockInfo>, PoolError> {
        let guard = self.state.lock();
        let state = guard.as_ref().ok_or(PoolError::NotInitialized)?;
        Ok(state.directory.snapshot())
    }

    /// Checks the partition invariants of the directory. Neighbouring free
    /// blocks count as a violation only under bidirectional coalescing: a
    /// forward-only free settles its successors but may leave a free
    /// predecessor behind. An uninitialized session has nothing to audit.
    pub fn audit(&self) -> Result<(), AuditError> {
        let guard = self.state.lock();
        match guard.as_ref() {
            Some(state) => state
                .directory
                .audit(self.options.coalesce == CoalescePolicy::Bidirectional),
            None => Ok(()),
        }
    }

    pub fn stats(&self) -> PoolStats {
        let guard = self.state.lock();
        let mut stats = PoolStats {
            allocations: self.stats.allocations(),
            failed_allocations: self.stats.failed_allocations(),
            frees: self.stats.frees(),
            rejected_frees: self.stats.rejected_frees(),
            splits: self.stats.splits(),
            merges: self.stats.merges(),
            relocations: self.stats.relocations(),
            ..PoolStats::default()
        };

        if let Some(state) = guard.as_ref() {
            stats.capacity = state.directory.capacity();
            stats.blocks = state.directory.len();
            for (_, block) in state.directory.iter() {
                if block.available {
                    stats.free_bytes += block.size;
                    stats.free_blocks += 1;
                    stats.largest_free = stats.largest_free.max(block.size);
                } else {
                    stats.in_use_bytes += block.size;
                }
            }
        }
        stats
    }

    fn allocate_locked(&self, state: &mut PoolState, size: usize) -> Result<Handle, PoolError> {
        let Some(id) = state.directory.first_fit(size) else {
            self.stats.increment_failed_allocations();
            let largest_free = state.directory.largest_free();
            debug!(requested = size, largest_free, "Pool exhausted");
            return Err(PoolError::Exhausted {
                requested: size,
                largest_free,
            });
        };

        let threshold = size
            .saturating_add(self.options.split_overhead)
            .saturating_add(1);
        if state.directory.get(id).size >= threshold && state.directory.split(id, size).is_some() {
            self.stats.increment_splits();
        }

        state.directory.set_available(id, false);
        self.stats.increment_allocations();

        let block = state.directory.get(id);
        let handle = Handle(block.start);
        debug!(%handle, requested = size, size = block.size, "Block allocated");
        Ok(handle)
    }

    fn free_locked(&self, state: &mut PoolState, handle: Handle) -> Result<Release, PoolError> {
        let Some(located) = state.directory.locate(handle.0) else {
            self.stats.increment_rejected_frees();
            warn!(%handle, "Tried to free untracked memory");
            return Err(PoolError::Untracked(handle));
        };

        if state.directory.get(located.id).available {
            self.stats.increment_rejected_frees();
            warn!(%handle, "Block is already free");
            return match self.options.double_free {
                DoubleFreePolicy::Ignore => Ok(Release::AlreadyFree),
                DoubleFreePolicy::Reject => Err(PoolError::DoubleFree(handle)),
            };
        }

        state.directory.set_available(located.id, true);
        let merged = coalesce(&mut state.directory, located, self.options.coalesce);
        self.stats.increment_frees();
        self.stats.add_merges(merged);
        debug!(%handle, merged, "Block freed");
        Ok(Release::Released { merged })
    }
}

/// Merges the freshly freed block with its free successors until an in-use
/// block or the end of the chain, then, under the bidirectional policy, into
/// a free predecessor. Returns the number of records absorbed.
fn coalesce(directory: &mut Directory, freed: Located, policy: CoalescePolicy) -> usize {
    let mut merged = 0;
    while directory.absorb_next(freed.id) {
        merged += 1;
    }

    if policy == CoalescePolicy::Bidirectional {
        if let Some(prev) = freed.prev {
            if directory.get(prev).available && directory.absorb_next(prev) {
                merged += 1;
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn layout(pool: &PoolAllocator) -> Vec<(usize, usize, bool)> {
        pool.blocks()
            .unwrap()
            .into_iter()
            .map(|b| (b.start, b.size, b.available))
            .collect()
    }

    fn alloc(pool: &PoolAllocator, size: usize) -> Handle {
        pool.allocate(size).unwrap().unwrap()
    }

    fn forward_only() -> AllocatorOptions {
        AllocatorOptions {
            coalesce: CoalescePolicy::Forward,
            ..AllocatorOptions::default()
        }
    }

    #[test]
    fn test_init_creates_single_free_block() {
        let pool = PoolAllocator::with_capacity(512).unwrap();
        assert!(pool.is_initialized());
        assert_eq!(pool.capacity(), Some(512));
        assert_eq!(layout(&pool), vec![(0, 512, true)]);
        pool.audit().unwrap();
    }

    #[test]
    fn test_init_rejects_zero_capacity() {
        let pool = PoolAllocator::new(AllocatorOptions::default());
        assert_eq!(pool.init(0), Err(PoolError::ZeroCapacity));
        assert!(!pool.is_initialized());
    }

    #[test]
    fn test_init_reports_unobtainable_storage() {
        let pool = PoolAllocator::new(AllocatorOptions::default());
        let err = pool.init(usize::MAX).unwrap_err();
        assert!(err.is_fatal());
        assert!(!pool.is_initialized());
    }

    #[test]
    fn test_reinit_without_teardown_is_rejected() {
        let pool = PoolAllocator::with_capacity(128).unwrap();
        let handle = alloc(&pool, 16);

        assert_eq!(
            pool.init(256),
            Err(PoolError::AlreadyInitialized { capacity: 128 })
        );
        // The live session is untouched.
        assert_eq!(pool.capacity(), Some(128));
        assert_eq!(pool.block_size(handle), Ok(16));
    }

    #[test]
    fn test_teardown_then_fresh_session() {
        let pool = PoolAllocator::with_capacity(256).unwrap();
        let handle = alloc(&pool, 64);
        pool.write(handle, 0, &[0xAB; 64]).unwrap();
        alloc(&pool, 32);

        pool.teardown().unwrap();
        assert!(!pool.is_initialized());
        assert_eq!(pool.allocate(8), Err(PoolError::NotInitialized));
        assert_eq!(pool.free(handle), Err(PoolError::NotInitialized));
        assert_eq!(pool.teardown(), Err(PoolError::NotInitialized));

        pool.init(512).unwrap();
        assert_eq!(layout(&pool), vec![(0, 512, true)]);
        let stats = pool.stats();
        assert_eq!(stats.allocations, 0);
        assert_eq!(stats.splits, 0);

        let fresh = alloc(&pool, 64);
        let mut buf = [0xFF; 64];
        pool.read(fresh, 0, &mut buf).unwrap();
        assert_eq!(buf, [0; 64]);
    }

    #[test]
    fn test_allocate_zero_is_no_allocation() {
        let pool = PoolAllocator::with_capacity(64).unwrap();
        assert_eq!(pool.allocate(0), Ok(None));
        assert_eq!(layout(&pool), vec![(0, 64, true)]);
        assert_eq!(pool.stats().allocations, 0);
    }

    #[test]
    fn test_first_fit_picks_lowest_address() {
        let pool = PoolAllocator::with_capacity(400).unwrap();
        let a = alloc(&pool, 100);
        let _b = alloc(&pool, 50);
        let c = alloc(&pool, 250);
        pool.free(a).unwrap();
        pool.free(c).unwrap();
        assert_eq!(
            layout(&pool),
            vec![(0, 100, true), (100, 50, false), (150, 250, true)]
        );

        let handle = alloc(&pool, 50);
        assert_eq!(handle.offset(), 0);
    }

    #[test]
    fn test_split_leaves_free_remainder() {
        let pool = PoolAllocator::with_capacity(1000).unwrap();
        let handle = alloc(&pool, 50);
        assert_eq!(handle.offset(), 0);
        assert_eq!(layout(&pool), vec![(0, 50, false), (50, 950, true)]);
        assert_eq!(pool.stats().splits, 1);
    }

    #[test]
    fn test_small_remainder_is_not_split() {
        let options = AllocatorOptions {
            split_overhead: 950,
            ..AllocatorOptions::default()
        };
        let pool = PoolAllocator::with_options(1000, options).unwrap();
        let handle = alloc(&pool, 50);
        assert_eq!(layout(&pool), vec![(0, 1000, false)]);
        assert_eq!(pool.block_size(handle), Ok(1000));
        assert_eq!(pool.stats().splits, 0);
    }

    #[test]
    fn test_split_threshold_boundary() {
        let largest_split = 100 - DEFAULT_SPLIT_OVERHEAD - 1;

        let pool = PoolAllocator::with_capacity(100).unwrap();
        alloc(&pool, largest_split);
        assert_eq!(
            layout(&pool),
            vec![(0, largest_split, false), (largest_split, 100 - largest_split, true)]
        );

        let pool = PoolAllocator::with_capacity(100).unwrap();
        alloc(&pool, largest_split + 1);
        assert_eq!(layout(&pool), vec![(0, 100, false)]);
    }

    #[test]
    fn test_exhaustion_leaves_directory_unchanged() {
        let pool = PoolAllocator::with_capacity(64).unwrap();
        alloc(&pool, 40);
        let before = layout(&pool);

        assert_eq!(
            pool.allocate(40),
            Err(PoolError::Exhausted {
                requested: 40,
                largest_free: 0
            })
        );
        assert_eq!(layout(&pool), before);
        assert_eq!(pool.stats().failed_allocations, 1);
        pool.audit().unwrap();
    }

    #[test]
    fn test_coalesce_in_either_order() {
        for reverse in [false, true] {
            let pool = PoolAllocator::with_capacity(300).unwrap();
            let a = alloc(&pool, 100);
            let b = alloc(&pool, 100);
            let _c = alloc(&pool, 100);

            let (first, second) = if reverse { (b, a) } else { (a, b) };
            pool.free(first).unwrap();
            pool.free(second).unwrap();

            assert_eq!(layout(&pool), vec![(0, 200, true), (200, 100, false)]);
            pool.audit().unwrap();
            assert_eq!(alloc(&pool, 200).offset(), 0);
        }
    }

    #[test]
    fn test_free_merges_with_both_neighbours() {
        let pool = PoolAllocator::with_capacity(600).unwrap();
        let a = alloc(&pool, 100);
        let b = alloc(&pool, 100);
        let c = alloc(&pool, 100);
        let _d = alloc(&pool, 100);

        pool.free(a).unwrap();
        pool.free(c).unwrap();
        assert_eq!(pool.free(b), Ok(Release::Released { merged: 2 }));
        assert_eq!(
            layout(&pool),
            vec![(0, 300, true), (300, 100, false), (400, 200, true)]
        );
    }

    #[test]
    fn test_forward_only_coalescing_keeps_predecessor_apart() {
        let pool = PoolAllocator::with_options(300, forward_only()).unwrap();
        let a = alloc(&pool, 100);
        let b = alloc(&pool, 100);
        let _c = alloc(&pool, 100);

        pool.free(a).unwrap();
        pool.free(b).unwrap();
        assert_eq!(
            layout(&pool),
            vec![(0, 100, true), (100, 100, true), (200, 100, false)]
        );
        // Legal under forward-only coalescing.
        pool.audit().unwrap();
        assert!(matches!(
            pool.allocate(200),
            Err(PoolError::Exhausted { largest_free: 100, .. })
        ));
    }

    #[test]
    fn test_forward_only_coalescing_absorbs_successors() {
        let pool = PoolAllocator::with_options(300, forward_only()).unwrap();
        let a = alloc(&pool, 100);
        let b = alloc(&pool, 100);
        let _c = alloc(&pool, 100);

        pool.free(b).unwrap();
        assert_eq!(pool.free(a), Ok(Release::Released { merged: 1 }));
        assert_eq!(layout(&pool), vec![(0, 200, true), (200, 100, false)]);
    }

    #[test]
    fn test_forward_only_freed_block_has_no_free_successor() {
        let pool = PoolAllocator::with_options(500, forward_only()).unwrap();
        let a = alloc(&pool, 100);
        let b = alloc(&pool, 100);
        let c = alloc(&pool, 100);
        let d = alloc(&pool, 100);

        // Fragment the tail: d's successor is the free remainder.
        pool.free(d).unwrap();
        assert_eq!(layout(&pool)[3], (300, 200, true));

        pool.free(b).unwrap();
        pool.free(c).unwrap();
        // c swallowed the tail, b stays apart from it.
        assert_eq!(
            layout(&pool),
            vec![(0, 100, false), (100, 100, true), (200, 300, true)]
        );

        assert_eq!(pool.free(a), Ok(Release::Released { merged: 2 }));
        assert_eq!(layout(&pool), vec![(0, 500, true)]);
        pool.audit().unwrap();
    }

    #[traced_test]
    #[test]
    fn test_free_untracked_handle_is_reported() {
        let pool = PoolAllocator::with_capacity(256).unwrap();
        alloc(&pool, 64);
        let before = layout(&pool);

        let stray = Handle::from_offset(10);
        assert_eq!(pool.free(stray), Err(PoolError::Untracked(stray)));
        assert_eq!(layout(&pool), before);
        assert_eq!(pool.stats().rejected_frees, 1);
        assert!(logs_contain("Tried to free untracked memory"));
    }

    #[test]
    fn test_double_free_ignored_by_default() {
        let pool = PoolAllocator::with_capacity(256).unwrap();
        let handle = alloc(&pool, 64);
        alloc(&pool, 64);

        assert!(matches!(pool.free(handle), Ok(Release::Released { .. })));
        let before = layout(&pool);
        assert_eq!(pool.free(handle), Ok(Release::AlreadyFree));
        assert_eq!(layout(&pool), before);
    }

    #[test]
    fn test_double_free_rejected_by_policy() {
        let options = AllocatorOptions {
            double_free: DoubleFreePolicy::Reject,
            ..AllocatorOptions::default()
        };
        let pool = PoolAllocator::with_options(256, options).unwrap();
        let handle = alloc(&pool, 64);

        pool.free(handle).unwrap();
        assert_eq!(pool.free(handle), Err(PoolError::DoubleFree(handle)));
        pool.audit().unwrap();
    }

    #[test]
    fn test_resize_shrink_keeps_handle() {
        let pool = PoolAllocator::with_capacity(1000).unwrap();
        let handle = alloc(&pool, 100);
        assert_eq!(pool.resize(Some(handle), 50), Ok(Some(handle)));
        assert_eq!(pool.block_size(handle), Ok(100));
    }

    #[test]
    fn test_resize_grow_relocates_and_copies() {
        let pool = PoolAllocator::with_capacity(1000).unwrap();
        let handle = alloc(&pool, 100);
        let _blocker = alloc(&pool, 50);
        let pattern: Vec<u8> = (0..100).map(|i| i as u8).collect();
        pool.write(handle, 0, &pattern).unwrap();

        let moved = pool.resize(Some(handle), 500).unwrap().unwrap();
        assert_ne!(moved, handle);
        assert_eq!(moved.offset(), 150);

        let mut buf = vec![0; 100];
        pool.read(moved, 0, &mut buf).unwrap();
        assert_eq!(buf, pattern);

        // The old block went back to the pool.
        assert_eq!(pool.free(handle), Ok(Release::AlreadyFree));
        assert_eq!(pool.stats().relocations, 1);
        pool.audit().unwrap();
    }

    #[test]
    fn test_resize_failure_keeps_original_block() {
        let pool = PoolAllocator::with_capacity(256).unwrap();
        let handle = alloc(&pool, 100);
        pool.write(handle, 0, &[7; 100]).unwrap();

        assert_eq!(
            pool.resize(Some(handle), 200),
            Err(PoolError::Exhausted {
                requested: 200,
                largest_free: 156
            })
        );
        assert_eq!(pool.block_size(handle), Ok(100));
        pool.with_block(handle, |bytes| assert!(bytes.iter().all(|b| *b == 7)))
            .unwrap();
    }

    #[test]
    fn test_resize_degenerate_arguments() {
        let pool = PoolAllocator::with_capacity(256).unwrap();

        let handle = pool.resize(None, 32).unwrap().unwrap();
        assert_eq!(pool.block_size(handle), Ok(32));

        assert_eq!(pool.resize(Some(handle), 0), Ok(None));
        assert_eq!(layout(&pool), vec![(0, 256, true)]);
        assert_eq!(pool.resize(None, 0), Ok(None));
    }

    #[test]
    fn test_resize_invalid_handles() {
        let pool = PoolAllocator::with_capacity(256).unwrap();
        let handle = alloc(&pool, 32);
        let stray = Handle::from_offset(3);

        assert_eq!(
            pool.resize(Some(stray), 64),
            Err(PoolError::Untracked(stray))
        );
        pool.free(handle).unwrap();
        assert_eq!(
            pool.resize(Some(handle), 64),
            Err(PoolError::NotAllocated(handle))
        );
    }

    #[test]
    fn test_byte_access_bounds() {
        let pool = PoolAllocator::with_capacity(256).unwrap();
        let handle = alloc(&pool, 16);

        pool.write(handle, 12, &[1, 2, 3, 4]).unwrap();
        assert_eq!(
            pool.write(handle, 13, &[1, 2, 3, 4]),
            Err(PoolError::OutOfBounds {
                handle,
                offset: 13,
                len: 4,
                size: 16
            })
        );

        let mut buf = [0; 4];
        pool.read(handle, 12, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
        assert!(pool.read(handle, usize::MAX, &mut buf).is_err());

        pool.with_block_mut(handle, |bytes| bytes.fill(9)).unwrap();
        assert_eq!(pool.with_block(handle, |bytes| bytes.len()), Ok(16));

        pool.free(handle).unwrap();
        assert_eq!(
            pool.read(handle, 0, &mut buf),
            Err(PoolError::NotAllocated(handle))
        );
    }

    #[test]
    fn test_stats_snapshot() {
        let pool = PoolAllocator::with_capacity(1024).unwrap();
        let a = alloc(&pool, 100);
        let _b = alloc(&pool, 200);
        pool.free(a).unwrap();

        let stats = pool.stats();
        assert_eq!(stats.capacity, 1024);
        assert_eq!(stats.in_use_bytes, 200);
        assert_eq!(stats.free_bytes, 824);
        assert_eq!(stats.blocks, 3);
        assert_eq!(stats.free_blocks, 2);
        assert_eq!(stats.largest_free, 724);
        assert_eq!(stats.allocations, 2);
        assert_eq!(stats.frees, 1);
        assert_eq!(stats.splits, 2);
    }

    #[test]
    fn test_handle_display() {
        assert_eq!(Handle::from_offset(255).to_string(), "0xff");
    }
}
