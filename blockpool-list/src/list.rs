use std::fmt;
use std::sync::Arc;

use blockpool_config::BlockpoolConfig;
use blockpool_core::{PoolAllocator, PoolError};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::node::{self, ListId, NodeRef};
use crate::ListError;

/// Singly-linked list of `u16` values whose nodes are allocated from a
/// [`PoolAllocator`].
///
/// Every operation holds the list lock for its whole duration and calls into
/// the pool while holding it. The pool never calls back into the list, so
/// the two locks are always taken in list-then-pool order.
pub struct SequenceList {
    id: ListId,
    pool: Arc<PoolAllocator>,
    head: Mutex<Option<NodeRef>>,
}

impl SequenceList {
    /// Creates an empty list on an existing pool session.
    pub fn new(pool: Arc<PoolAllocator>) -> Self {
        Self {
            id: ListId::next(),
            pool,
            head: Mutex::new(None),
        }
    }

    /// Creates an empty list backed by a fresh pool of `capacity` bytes.
    pub fn with_pool_size(capacity: usize) -> Result<Self, ListError> {
        let pool = PoolAllocator::with_capacity(capacity).map_err(ListError::Session)?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// Creates an empty list backed by a fresh pool sized by
    /// `config.list.pool_capacity` and tuned by `config.pool`.
    pub fn from_config(config: &BlockpoolConfig) -> Result<Self, ListError> {
        let pool = PoolAllocator::with_options(
            config.list.pool_capacity,
            config.pool.allocator_options(),
        )
        .map_err(ListError::Session)?;
        Ok(Self::new(Arc::new(pool)))
    }

    pub fn pool(&self) -> &Arc<PoolAllocator> {
        &self.pool
    }

    /// Appends `value` at the end of the list.
    pub fn push_back(&self, value: u16) -> Result<NodeRef, ListError> {
        let mut head = self.head.lock();
        let tail = match *head {
            Some(first) => Some(self.last(first)?),
            None => None,
        };

        let created = self.create(value, None)?;
        match tail {
            Some(tail) => node::set_next(&self.pool, tail, Some(created)).map_err(corrupted)?,
            None => *head = Some(created),
        }
        Ok(created)
    }

    /// Inserts `value` directly after `anchor`.
    pub fn insert_after(&self, anchor: NodeRef, value: u16) -> Result<NodeRef, ListError> {
        let head = self.head.lock();
        if !anchor.belongs_to(self.id) || !self.contains(*head, anchor)? {
            warn!(%anchor, "Insert after a node outside the list");
            return Err(ListError::AnchorNotFound(anchor));
        }

        let following = node::next(&self.pool, anchor).map_err(corrupted)?;
        let created = self.create(value, following)?;
        node::set_next(&self.pool, anchor, Some(created)).map_err(corrupted)?;
        Ok(created)
    }

    /// Inserts `value` directly before `anchor`, scanning for its
    /// predecessor.
    pub fn insert_before(&self, anchor: NodeRef, value: u16) -> Result<NodeRef, ListError> {
        let mut head = self.head.lock();
        let Some(first) = *head else {
            return Err(ListError::AnchorNotFound(anchor));
        };
        if !anchor.belongs_to(self.id) {
            warn!(%anchor, "Insert before a node of another list");
            return Err(ListError::AnchorNotFound(anchor));
        }

        if first == anchor {
            let created = self.create(value, Some(anchor))?;
            *head = Some(created);
            return Ok(created);
        }

        let mut current = first;
        loop {
            match node::next(&self.pool, current).map_err(corrupted)? {
                Some(next) if next == anchor => break,
                Some(next) => current = next,
                None => {
                    warn!(%anchor, "Insert before a node outside the list");
                    return Err(ListError::AnchorNotFound(anchor));
                }
            }
        }

        let created = self.create(value, Some(anchor))?;
        node::set_next(&self.pool, current, Some(created)).map_err(corrupted)?;
        Ok(created)
    }

    /// Removes the first node holding `value`. Returns `false` when no node
    /// matches.
    pub fn remove(&self, value: u16) -> Result<bool, ListError> {
        let mut head = self.head.lock();
        let mut prev: Option<NodeRef> = None;
        let mut cursor = *head;

        while let Some(current) = cursor {
            let following = node::next(&self.pool, current).map_err(corrupted)?;
            if node::value(&self.pool, current).map_err(corrupted)? == value {
                match prev {
                    Some(prev) => {
                        node::set_next(&self.pool, prev, following).map_err(corrupted)?
                    }
                    None => *head = following,
                }
                node::release(&self.pool, current).map_err(corrupted)?;
                debug!(value, node = %current, "Node removed");
                return Ok(true);
            }
            prev = Some(current);
            cursor = following;
        }
        Ok(false)
    }

    /// First node holding `value`.
    pub fn find(&self, value: u16) -> Result<Option<NodeRef>, ListError> {
        let head = self.head.lock();
        let mut cursor = *head;
        while let Some(current) = cursor {
            if node::value(&self.pool, current).map_err(corrupted)? == value {
                return Ok(Some(current));
            }
            cursor = node::next(&self.pool, current).map_err(corrupted)?;
        }
        Ok(None)
    }

    /// Value stored in `node`.
    pub fn get(&self, node: NodeRef) -> Result<u16, ListError> {
        let _head = self.head.lock();
        self.check_owned(node)?;
        node::value(&self.pool, node).map_err(corrupted)
    }

    pub fn len(&self) -> Result<usize, ListError> {
        Ok(self.values()?.len())
    }

    pub fn is_empty(&self) -> bool {
        self.head.lock().is_none()
    }

    /// All values in list order.
    pub fn values(&self) -> Result<Vec<u16>, ListError> {
        let head = self.head.lock();
        self.collect(*head, None)
    }

    /// Values from `start` (the head when `None`) through `end` inclusive.
    /// Stops at the end of the list when `end` is never reached.
    pub fn range(&self, start: Option<NodeRef>, end: NodeRef) -> Result<Vec<u16>, ListError> {
        let head = self.head.lock();
        if let Some(start) = start {
            self.check_owned(start)?;
        }
        self.check_owned(end)?;
        self.collect(start.or(*head), Some(end))
    }

    /// Frees every node, then tears down the pool session backing the list.
    ///
    /// The pool is torn down even when a broken link stops the walk early;
    /// nodes past the break are reclaimed with the arena and the link error
    /// is reported afterwards.
    pub fn teardown(&self) -> Result<(), ListError> {
        let mut head = self.head.lock();

        let mut nodes = Vec::new();
        let mut broken = None;
        let mut cursor = *head;
        while let Some(current) = cursor {
            match node::next(&self.pool, current) {
                Ok(next) => {
                    nodes.push(current);
                    cursor = next;
                }
                Err(err) => {
                    warn!(node = %current, %err, "List link broken during teardown");
                    broken = Some(err);
                    break;
                }
            }
        }

        for current in &nodes {
            if let Err(err) = node::release(&self.pool, *current) {
                warn!(node = %current, %err, "Failed to release list node");
                broken.get_or_insert(err);
            }
        }
        *head = None;
        debug!(released = nodes.len(), "List nodes released");

        self.pool.teardown().map_err(ListError::Session)?;
        broken.map_or(Ok(()), |err| Err(corrupted(err)))
    }

    fn create(&self, value: u16, next: Option<NodeRef>) -> Result<NodeRef, ListError> {
        let created = node::allocate(&self.pool, self.id).map_err(|source| {
            warn!(value, %source, "Failed to allocate list node");
            ListError::Allocation { value, source }
        })?;

        if let Err(err) = node::write(&self.pool, created, value, next) {
            if let Err(release_err) = node::release(&self.pool, created) {
                warn!(node = %created, %release_err, "Failed to release unwritten list node");
            }
            return Err(corrupted(err));
        }
        Ok(created)
    }

    fn check_owned(&self, node: NodeRef) -> Result<(), ListError> {
        if node.belongs_to(self.id) {
            Ok(())
        } else {
            Err(ListError::AnchorNotFound(node))
        }
    }

    fn last(&self, first: NodeRef) -> Result<NodeRef, ListError> {
        let mut current = first;
        while let Some(next) = node::next(&self.pool, current).map_err(corrupted)? {
            current = next;
        }
        Ok(current)
    }

    fn contains(&self, head: Option<NodeRef>, target: NodeRef) -> Result<bool, ListError> {
        let mut cursor = head;
        while let Some(current) = cursor {
            if current == target {
                return Ok(true);
            }
            cursor = node::next(&self.pool, current).map_err(corrupted)?;
        }
        Ok(false)
    }

    fn collect(&self, from: Option<NodeRef>, end: Option<NodeRef>) -> Result<Vec<u16>, ListError> {
        let mut values = Vec::new();
        let mut cursor = from;
        while let Some(current) = cursor {
            values.push(node::value(&self.pool, current).map_err(corrupted)?);
            if Some(current) == end {
                break;
            }
            cursor = node::next(&self.pool, current).map_err(corrupted)?;
        }
        Ok(values)
    }
}

fn corrupted(err: PoolError) -> ListError {
    ListError::Corrupted(err)
}

impl fmt::Display for SequenceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.values() {
            Ok(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            Err(err) => write!(f, "<{}>", err),
        }
    }
}

impl fmt::Debug for SequenceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceList")
            .field("id", &self.id)
            .field("head", &*self.head.lock())
            .field("pool", &self.pool.capacity())
            .finish()
    }
}
