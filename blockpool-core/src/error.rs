use thiserror::Error;

use crate::alloc::Handle;

/// Errors reported by a pool allocator session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Pool capacity must be greater than zero")]
    ZeroCapacity,

    #[error("Failed to reserve {size} bytes of backing storage")]
    BackingStorage { size: usize },

    #[error("Pool session already initialized with {capacity} bytes; tear it down first")]
    AlreadyInitialized { capacity: usize },

    #[error("Pool session is not initialized")]
    NotInitialized,

    #[error("Pool exhausted: requested {requested} bytes, largest free block is {largest_free} bytes")]
    Exhausted { requested: usize, largest_free: usize },

    #[error("Handle {0} is not tracked by the block directory")]
    Untracked(Handle),

    #[error("Handle {0} refers to a free block")]
    NotAllocated(Handle),

    #[error("Double free of handle {0}")]
    DoubleFree(Handle),

    #[error("Access of {len} bytes at offset {offset} exceeds block {handle} of {size} bytes")]
    OutOfBounds {
        handle: Handle,
        offset: usize,
        len: usize,
        size: usize,
    },
}

impl PoolError {
    /// A session cannot exist without its backing storage. Callers typically
    /// abort the process on this class of error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PoolError::BackingStorage { .. })
    }
}

/// Block directory invariant violations found by an audit.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    #[error("Directory has no blocks")]
    EmptyDirectory,

    #[error("Block at index {index} has zero size")]
    ZeroSized { index: usize },

    #[error("Block at index {index} starts at {found}, expected {expected}")]
    Misaligned {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("Block at index {index} runs past the end of a {capacity} byte pool")]
    OutOfBounds { index: usize, capacity: usize },

    #[error("Blocks cover {covered} bytes, pool capacity is {capacity}")]
    CapacityMismatch { covered: usize, capacity: usize },

    #[error("Adjacent free blocks at offsets {first} and {second} were not coalesced")]
    UncoalescedNeighbours { first: usize, second: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_backing_storage_is_fatal() {
        assert!(PoolError::BackingStorage { size: 1 }.is_fatal());
        assert!(!PoolError::ZeroCapacity.is_fatal());
        assert!(!PoolError::Exhausted {
            requested: 8,
            largest_free: 4
        }
        .is_fatal());
    }

    #[test]
    fn exhausted_message_names_sizes() {
        let err = PoolError::Exhausted {
            requested: 40,
            largest_free: 24,
        };
        assert_eq!(
            err.to_string(),
            "Pool exhausted: requested 40 bytes, largest free block is 24 bytes"
        );
    }
}
