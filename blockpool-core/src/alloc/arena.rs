//! ## blockpool-core::alloc::arena
//! **Fixed-capacity backing storage**
//!
//! The arena is reserved once when a session starts and never grows. Blocks
//! handed out by the allocator are plain offset ranges into it.

use std::ops::Range;

use crate::error::PoolError;

/// A contiguous, zero-initialised byte buffer of fixed capacity.
pub struct Arena {
    bytes: Box<[u8]>,
}

impl Arena {
    /// Reserves `capacity` bytes from the system allocator.
    ///
    /// Uses a fallible reservation so that an oversized request surfaces as
    /// [`PoolError::BackingStorage`] instead of aborting inside the global
    /// allocator.
    pub fn reserve(capacity: usize) -> Result<Self, PoolError> {
        if capacity == 0 {
            return Err(PoolError::ZeroCapacity);
        }

        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(capacity)
            .map_err(|_| PoolError::BackingStorage { size: capacity })?;
        bytes.resize(capacity, 0);

        Ok(Self {
            bytes: bytes.into_boxed_slice(),
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Returns the bytes in `range`. Callers guarantee the range lies inside
    /// a block tracked by the directory.
    #[inline]
    pub fn slice(&self, range: Range<usize>) -> &[u8] {
        &self.bytes[range]
    }

    #[inline]
    pub fn slice_mut(&mut self, range: Range<usize>) -> &mut [u8] {
        &mut self.bytes[range]
    }

    /// Copies `len` bytes from `src` to `dst` inside the arena. The ranges may
    /// overlap.
    #[inline]
    pub fn copy_within(&mut self, src: usize, dst: usize, len: usize) {
        self.bytes.copy_within(src..src + len, dst);
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity())
            .finish()
    }
}
