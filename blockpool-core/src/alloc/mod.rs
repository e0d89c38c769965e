//! ## blockpool-core::alloc
//! **Fixed-arena pool allocator**
//!
//! ### Key Submodules:
//! - `arena/`: Fixed-capacity backing storage, reserved once per session
//! - `directory/`: Ordered chain of block records partitioning the arena
//! - `pool/`: The allocator session: first-fit allocate, free with coalescing, resize
//! - `stats/`: Operation counters and point-in-time pool statistics

pub(crate) mod arena;
pub(crate) mod directory;
pub mod pool;
pub mod stats;

pub use directory::BlockInfo;
pub use pool::{
    AllocatorOptions, CoalescePolicy, DoubleFreePolicy, Handle, PoolAllocator, Release,
    DEFAULT_SPLIT_OVERHEAD,
};
pub use stats::{MemoryStats, PoolStats};
