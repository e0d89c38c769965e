//! # blockpool-core
//!
//! Manual memory management over a single fixed-size byte arena.
//!
//! A [`PoolAllocator`] session hands out sub-ranges of its arena through
//! allocate/free/resize without touching the global heap per call. Block
//! metadata lives in an index-addressed directory next to the arena, and a
//! single lock serializes every operation on a session.
//!
//! ### Key Submodules:
//! - `alloc`: Arena, block directory, allocator session and statistics
//! - `error`: Allocator and audit error types
//!
//! ```
//! use blockpool_core::prelude::*;
//!
//! let pool = PoolAllocator::with_capacity(1024)?;
//! let handle = pool.allocate(64)?.expect("non-zero request");
//! pool.write(handle, 0, b"hello")?;
//! let handle = pool.resize(Some(handle), 512)?.expect("non-zero request");
//! pool.free(handle)?;
//! # Ok::<(), PoolError>(())
//! ```

pub mod alloc;
pub mod error;

pub mod prelude {
    pub use crate::alloc::*;
    pub use crate::error::*;
}

pub use alloc::{AllocatorOptions, Handle, PoolAllocator};
pub use error::{AuditError, PoolError};
