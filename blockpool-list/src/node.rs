//! In-arena node layout.
//!
//! ```text
//! offset 0..2   value  (u16, little endian)
//! offset 2..8   padding
//! offset 8..16  next   (u64 arena offset, little endian, u64::MAX = none)
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use blockpool_core::{Handle, PoolAllocator, PoolError};

/// Bytes requested from the pool for every node.
pub const NODE_SIZE: usize = 16;

// The pool answers `Ok(None)` only to zero-sized requests.
const _: () = assert!(NODE_SIZE > 0);

const VALUE_OFFSET: usize = 0;
const NEXT_OFFSET: usize = 8;
const NIL: u64 = u64::MAX;

/// Identity of one list instance. Node offsets are only meaningful
/// together with the list that issued them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ListId(u64);

impl ListId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Reference to a list node: the handle of its pool block, tagged with the
/// list it belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeRef {
    list: ListId,
    handle: Handle,
}

impl NodeRef {
    pub fn handle(self) -> Handle {
        self.handle
    }

    pub(crate) fn belongs_to(self, list: ListId) -> bool {
        self.list == list
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.handle.fmt(f)
    }
}

fn encode_next(next: Option<NodeRef>) -> [u8; 8] {
    next.map_or(NIL, |node| node.handle.offset() as u64).to_le_bytes()
}

/// Allocates a node block for `list`.
pub(crate) fn allocate(pool: &PoolAllocator, list: ListId) -> Result<NodeRef, PoolError> {
    match pool.allocate(NODE_SIZE)? {
        Some(handle) => Ok(NodeRef { list, handle }),
        // Unreachable for a non-zero NODE_SIZE; reported as a full pool.
        None => Err(PoolError::Exhausted {
            requested: NODE_SIZE,
            largest_free: 0,
        }),
    }
}

pub(crate) fn release(pool: &PoolAllocator, node: NodeRef) -> Result<(), PoolError> {
    pool.free(node.handle).map(|_| ())
}

pub(crate) fn write(
    pool: &PoolAllocator,
    node: NodeRef,
    value: u16,
    next: Option<NodeRef>,
) -> Result<(), PoolError> {
    let mut bytes = [0u8; NODE_SIZE];
    bytes[VALUE_OFFSET..VALUE_OFFSET + 2].copy_from_slice(&value.to_le_bytes());
    bytes[NEXT_OFFSET..].copy_from_slice(&encode_next(next));
    pool.write(node.handle, 0, &bytes)
}

pub(crate) fn set_next(
    pool: &PoolAllocator,
    node: NodeRef,
    next: Option<NodeRef>,
) -> Result<(), PoolError> {
    pool.write(node.handle, NEXT_OFFSET, &encode_next(next))
}

pub(crate) fn value(pool: &PoolAllocator, node: NodeRef) -> Result<u16, PoolError> {
    let mut bytes = [0u8; 2];
    pool.read(node.handle, VALUE_OFFSET, &mut bytes)?;
    Ok(u16::from_le_bytes(bytes))
}

pub(crate) fn next(pool: &PoolAllocator, node: NodeRef) -> Result<Option<NodeRef>, PoolError> {
    let mut bytes = [0u8; 8];
    pool.read(node.handle, NEXT_OFFSET, &mut bytes)?;
    let raw = u64::from_le_bytes(bytes);
    Ok((raw != NIL).then(|| NodeRef {
        list: node.list,
        handle: Handle::from_offset(raw as usize),
    }))
}
