//! Blocks of the partitioned address space
//!
//! A block is a contiguous run of units that is either free or owned by
//! exactly one process.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a simulated process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(pub u32);

impl From<u32> for ProcessId {
    fn from(id: u32) -> Self {
        ProcessId(id)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who a block belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    Free,
    Process(ProcessId),
}

/// A contiguous range of units in the address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Starting unit offset
    pub start: u32,
    /// Number of units (always positive)
    pub size: u32,
    pub owner: Owner,
}

impl Block {
    pub fn free(start: u32, size: u32) -> Self {
        Block {
            start,
            size,
            owner: Owner::Free,
        }
    }

    /// One past the last unit covered by this block
    pub fn end(&self) -> u32 {
        self.start + self.size
    }

    pub fn is_free(&self) -> bool {
        self.owner == Owner::Free
    }

    pub fn owned_by(&self, pid: ProcessId) -> bool {
        self.owner == Owner::Process(pid)
    }

    /// Check if this block is directly followed by `next`
    pub fn precedes(&self, next: &Block) -> bool {
        self.end() == next.start
    }

    /// Check if this block can satisfy a request of `units`
    pub fn fits(&self, units: u32) -> bool {
        self.is_free() && self.size >= units
    }

    pub fn handle(&self) -> BlockHandle {
        BlockHandle(self.start)
    }
}

/// Stable locator for an owned block
///
/// Only free blocks are ever split or merged, so the start offset of an owned
/// block does not move for as long as it stays owned. Resolving a handle
/// always re-checks ownership, so a handle that outlives its allocation
/// fails to resolve instead of pointing at someone else's block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockHandle(u32);

impl BlockHandle {
    pub fn start(&self) -> u32 {
        self.0
    }
}
