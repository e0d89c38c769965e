//! # Blockpool List
//!
//! Ordered sequence of `u16` values whose nodes live inside a
//! [`blockpool_core::PoolAllocator`] arena. Each node is a fixed
//! [`NODE_SIZE`]-byte block holding its value and the arena offset of its
//! successor.
//!
//! ```
//! use blockpool_list::SequenceList;
//!
//! let list = SequenceList::with_pool_size(1024)?;
//! list.push_back(1)?;
//! let three = list.push_back(3)?;
//! list.insert_before(three, 2)?;
//! assert_eq!(list.to_string(), "[1, 2, 3]");
//! list.teardown()?;
//! # Ok::<(), blockpool_list::ListError>(())
//! ```

mod error;
mod list;
mod node;

pub use error::ListError;
pub use list::SequenceList;
pub use node::{NodeRef, NODE_SIZE};
