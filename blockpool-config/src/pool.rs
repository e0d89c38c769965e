//! Pool allocator and list container configuration.
//!
//! Sizes accept either plain byte counts or human-friendly strings such as
//! `"64KiB"` or `"1MiB"`.

use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use blockpool_core::alloc::{
    AllocatorOptions, CoalescePolicy, DoubleFreePolicy, PoolAllocator, DEFAULT_SPLIT_OVERHEAD,
};
use blockpool_core::PoolError;

/// Allocator session parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct PoolConfig {
    /// Arena capacity in bytes.
    #[validate(range(min = 1, max = 1073741824))]
    #[serde(default = "default_capacity", deserialize_with = "deserialize_size")]
    pub capacity: usize,

    /// Bytes a free block must exceed a request by before it is split.
    #[validate(range(max = 4096))]
    #[serde(default = "default_split_overhead")]
    pub split_overhead: usize,

    /// Neighbour merging on free (forward, bidirectional).
    #[serde(default)]
    pub coalesce: CoalescePolicy,

    /// Double free reporting (ignore, reject).
    #[serde(default)]
    pub double_free: DoubleFreePolicy,
}

fn default_capacity() -> usize {
    1048576
}

fn default_split_overhead() -> usize {
    DEFAULT_SPLIT_OVERHEAD
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            split_overhead: default_split_overhead(),
            coalesce: CoalescePolicy::default(),
            double_free: DoubleFreePolicy::default(),
        }
    }
}

impl PoolConfig {
    pub fn allocator_options(&self) -> AllocatorOptions {
        AllocatorOptions {
            split_overhead: self.split_overhead,
            coalesce: self.coalesce,
            double_free: self.double_free,
        }
    }

    /// Creates and initializes an allocator session from this configuration.
    pub fn build(&self) -> Result<PoolAllocator, PoolError> {
        PoolAllocator::with_options(self.capacity, self.allocator_options())
    }
}

/// Ordered-sequence container parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct ListConfig {
    /// Capacity of the pool backing the list nodes (at least one 16-byte node).
    #[validate(range(min = 16, max = 1073741824))]
    #[serde(default = "default_list_capacity", deserialize_with = "deserialize_size")]
    pub pool_capacity: usize,
}

fn default_list_capacity() -> usize {
    65536
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            pool_capacity: default_list_capacity(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Num(usize),
    Str(String),
}

/// Custom deserializer to allow human-friendly sizes (e.g. "1MiB") or direct numbers.
fn deserialize_size<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    match SizeValue::deserialize(deserializer)? {
        SizeValue::Num(n) => Ok(n),
        SizeValue::Str(s) => parse_size(&s).map_err(serde::de::Error::custom),
    }
}

pub(crate) fn parse_size(raw: &str) -> Result<usize, String> {
    let s = raw.trim();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (num_part, unit_part) = s.split_at(split);

    let number: f64 = num_part
        .parse()
        .map_err(|_| format!("Invalid size: {raw:?}"))?;
    let multiplier = match unit_part.trim().to_lowercase().as_str() {
        "" | "b" => 1.0,
        "kb" | "kib" => 1024.0,
        "mb" | "mib" => 1024.0 * 1024.0,
        "gb" | "gib" => 1024.0 * 1024.0 * 1024.0,
        other => return Err(format!("Unknown size unit: {other:?}")),
    };
    Ok((number * multiplier) as usize)
}
