use blockpool_core::PoolError;
use thiserror::Error;

use crate::NodeRef;

/// Errors reported by [`crate::SequenceList`] operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ListError {
    /// The pool could not provide a node; the list is unchanged.
    #[error("Failed to allocate node for value {value}: {source}")]
    Allocation { value: u16, source: PoolError },

    /// The positioning node is not part of this list.
    #[error("Anchor node {0} is not part of the list")]
    AnchorNotFound(NodeRef),

    /// Creating or tearing down the backing pool session failed.
    #[error("Pool session error: {0}")]
    Session(PoolError),

    /// A node link could not be followed, e.g. after the pool was torn down
    /// underneath the list.
    #[error("List structure is inconsistent: {0}")]
    Corrupted(PoolError),
}
