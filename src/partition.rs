//! Equal contiguous partitioning of a logical array across ranks.

use crate::error::{Error, Result};
use std::ops::Range;

/// Split of a logical array of `len` elements into `group_size` equal,
/// contiguous, disjoint shards. Shard `i` owns `[i * shard_size, (i + 1) * shard_size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    len: usize,
    group_size: i32,
    shard_size: usize,
}

impl Partition {
    /// Partition for the scan engine.
    ///
    /// `len` must be a positive power of two, at least `group_size`, and
    /// divisible by it, so every shard is itself a power-of-two tree.
    pub fn for_scan(len: usize, group_size: i32) -> Result<Self> {
        check_group_size(group_size)?;
        if len == 0 {
            return Err(Error::EmptyInput);
        }
        if !len.is_power_of_two() {
            return Err(Error::NotPowerOfTwo(len));
        }
        if len < group_size as usize {
            return Err(Error::FewerElementsThanRanks { len, group_size });
        }
        Self::even(len, group_size)
    }

    /// Partition for the histogram engine. Only divisibility is required.
    pub fn for_histogram(len: usize, group_size: i32) -> Result<Self> {
        check_group_size(group_size)?;
        Self::even(len, group_size)
    }

    fn even(len: usize, group_size: i32) -> Result<Self> {
        let groups = group_size as usize;
        if len % groups != 0 {
            return Err(Error::NotDivisible { len, group_size });
        }
        Ok(Partition {
            len,
            group_size,
            shard_size: len / groups,
        })
    }

    /// Length of the logical array.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the logical array is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of shards.
    pub fn group_size(&self) -> i32 {
        self.group_size
    }

    /// Elements per shard.
    pub fn shard_size(&self) -> usize {
        self.shard_size
    }

    /// Logical index range owned by `rank`.
    pub fn shard_range(&self, rank: i32) -> Range<usize> {
        debug_assert!((0..self.group_size).contains(&rank));
        let start = rank as usize * self.shard_size;
        start..start + self.shard_size
    }

    /// All shard ranges, in rank order.
    pub fn shards(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.group_size).map(move |rank| self.shard_range(rank))
    }
}

fn check_group_size(group_size: i32) -> Result<()> {
    if group_size < 1 {
        return Err(Error::InvalidGroupSize(group_size));
    }
    Ok(())
}
