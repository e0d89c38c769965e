//! ## blockpool-core::alloc::directory
//! **Block metadata chain**
//!
//! The directory partitions the arena into blocks kept in ascending address
//! order. Records live in a slab addressed by [`BlockId`]; records destroyed
//! by coalescing are tombstoned and their slots recycled by later splits, so
//! a link never points at freed memory.
//!
//! Invariants checked by [`Directory::audit`]:
//! - the first block starts at offset 0,
//! - every block ends exactly where its successor starts,
//! - block sizes are non-zero and sum to the arena capacity,
//! - optionally, no two neighbouring blocks are both free.

use serde::Serialize;

use crate::error::AuditError;

/// Stable index of a block record inside the directory slab.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockId(usize);

/// Metadata for one contiguous sub-range of the arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub start: usize,
    pub size: usize,
    pub available: bool,
    next: Option<BlockId>,
}

/// Read-only view of a block, as exposed to callers inspecting a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BlockInfo {
    pub start: usize,
    pub size: usize,
    pub available: bool,
}

impl From<&Block> for BlockInfo {
    fn from(block: &Block) -> Self {
        Self {
            start: block.start,
            size: block.size,
            available: block.available,
        }
    }
}

/// Result of looking a block up by its start offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Located {
    pub id: BlockId,
    pub prev: Option<BlockId>,
}

/// Ordered chain of block records covering the whole arena.
#[derive(Debug)]
pub struct Directory {
    slots: Vec<Option<Block>>,
    vacant: Vec<usize>,
    head: BlockId,
    capacity: usize,
    len: usize,
}

impl Directory {
    /// Creates a directory holding a single free block spanning `capacity`
    /// bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Some(Block {
                start: 0,
                size: capacity,
                available: true,
                next: None,
            })],
            vacant: Vec::new(),
            head: BlockId(0),
            capacity,
            len: 1,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live block records.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the record for `id`.
    ///
    /// # Panics
    ///
    /// If `id` was released. Ids obtained from the chain are always live.
    #[inline]
    pub fn get(&self, id: BlockId) -> &Block {
        self.slots[id.0]
            .as_ref()
            .expect("block id refers to a released record")
    }

    #[inline]
    fn get_mut(&mut self, id: BlockId) -> &mut Block {
        self.slots[id.0]
            .as_mut()
            .expect("block id refers to a released record")
    }

    /// Iterates the chain in ascending address order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            directory: self,
            cursor: Some(self.head),
        }
    }

    /// First free block, in address order, able to hold `size` bytes.
    pub fn first_fit(&self, size: usize) -> Option<BlockId> {
        self.iter()
            .find(|(_, block)| block.available && block.size >= size)
            .map(|(id, _)| id)
    }

    /// Finds the block starting at `start`, together with its predecessor.
    pub fn locate(&self, start: usize) -> Option<Located> {
        let mut prev = None;
        for (id, block) in self.iter() {
            if block.start == start {
                return Some(Located { id, prev });
            }
            if block.start > start {
                break;
            }
            prev = Some(id);
        }
        None
    }

    /// Shrinks `id` to `head_size` bytes and links a new free block covering
    /// the remainder directly after it. Returns the remainder's id, or `None`
    /// when `head_size` does not leave a non-empty head and remainder.
    pub fn split(&mut self, id: BlockId, head_size: usize) -> Option<BlockId> {
        let (start, size, next) = {
            let block = self.get(id);
            (block.start, block.size, block.next)
        };
        if head_size == 0 || head_size >= size {
            return None;
        }

        let remainder = self.insert(Block {
            start: start + head_size,
            size: size - head_size,
            available: true,
            next,
        });

        let block = self.get_mut(id);
        block.size = head_size;
        block.next = Some(remainder);
        Some(remainder)
    }

    /// Merges the successor of `id` into it when that successor is free.
    /// The absorbed record is released. Returns whether a merge happened.
    pub fn absorb_next(&mut self, id: BlockId) -> bool {
        let Some(next_id) = self.get(id).next else {
            return false;
        };
        if !self.get(next_id).available {
            return false;
        }

        let absorbed = self.release(next_id);
        let block = self.get_mut(id);
        block.size += absorbed.size;
        block.next = absorbed.next;
        true
    }

    pub fn set_available(&mut self, id: BlockId, available: bool) {
        self.get_mut(id).available = available;
    }

    /// Size of the largest free block, or zero when everything is in use.
    pub fn largest_free(&self) -> usize {
        self.iter()
            .filter(|(_, block)| block.available)
            .map(|(_, block)| block.size)
            .max()
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> Vec<BlockInfo> {
        self.iter().map(|(_, block)| BlockInfo::from(block)).collect()
    }

    /// Verifies the partition invariants. When `require_coalesced` is set,
    /// neighbouring free blocks are reported as a violation too.
    pub fn audit(&self, require_coalesced: bool) -> Result<(), AuditError> {
        if self.is_empty() {
            return Err(AuditError::EmptyDirectory);
        }

        let mut expected = 0;
        let mut prev_free: Option<usize> = None;
        let mut seen = 0;
        for (index, (_, block)) in self.iter().enumerate() {
            if block.size == 0 {
                return Err(AuditError::ZeroSized { index });
            }
            if block.start != expected {
                return Err(AuditError::Misaligned {
                    index,
                    expected,
                    found: block.start,
                });
            }
            let end = block
                .start
                .checked_add(block.size)
                .filter(|end| *end <= self.capacity)
                .ok_or(AuditError::OutOfBounds {
                    index,
                    capacity: self.capacity,
                })?;
            if require_coalesced && block.available {
                if let Some(first) = prev_free {
                    return Err(AuditError::UncoalescedNeighbours {
                        first,
                        second: block.start,
                    });
                }
            }
            prev_free = block.available.then_some(block.start);
            expected = end;
            seen += 1;
        }

        if expected != self.capacity || seen != self.len {
            return Err(AuditError::CapacityMismatch {
                covered: expected,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    fn insert(&mut self, block: Block) -> BlockId {
        self.len += 1;
        match self.vacant.pop() {
            Some(slot) => {
                self.slots[slot] = Some(block);
                BlockId(slot)
            }
            None => {
                self.slots.push(Some(block));
                BlockId(self.slots.len() - 1)
            }
        }
    }

    fn release(&mut self, id: BlockId) -> Block {
        let block = self.slots[id.0]
            .take()
            .expect("block id refers to a released record");
        self.vacant.push(id.0);
        self.len -= 1;
        block
    }
}

/// Chain iterator returned by [`Directory::iter`].
pub struct Iter<'a> {
    directory: &'a Directory,
    cursor: Option<BlockId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (BlockId, &'a Block);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let block = self.directory.get(id);
        self.cursor = block.next;
        Some((id, block))
    }
}
