//! Block ledger: the ordered partition of the address space
//!
//! Blocks are kept in a B-tree keyed by start offset, which keeps them in
//! address order and lets neighbours be found without walking a list.
//! At rest the ledger always satisfies:
//! - the first block starts at 0 and the last one ends at [`TOTAL_UNITS`]
//! - every block ends where the next one starts
//! - no two neighbouring blocks are both free
//! - a process owns at most one block

use crate::core::block::{Block, BlockHandle, Owner, ProcessId};
use crate::core::error::{PartitionError, Result};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Size of the simulated address space in units (256 KB of 2 KB units)
pub const TOTAL_UNITS: u32 = 128;

/// Size of one unit in kilobytes
pub const UNIT_SIZE_KB: u32 = 2;

/// Smallest request the allocator accepts
pub const MIN_REQUEST: u32 = 3;

/// Largest request the allocator accepts
pub const MAX_REQUEST: u32 = 10;

#[derive(Debug, Clone)]
pub struct BlockLedger {
    /// Every block, free or owned, indexed by start offset
    blocks: BTreeMap<u32, Block>,
}

impl BlockLedger {
    /// Create a ledger holding one free block over the whole address space
    pub fn new() -> Self {
        let mut blocks = BTreeMap::new();
        blocks.insert(0, Block::free(0, TOTAL_UNITS));
        BlockLedger { blocks }
    }

    /// Drop every block and start over with a single free block
    pub fn reset(&mut self) {
        self.blocks.clear();
        self.blocks.insert(0, Block::free(0, TOTAL_UNITS));
    }

    /// Blocks in address order
    pub fn iter(&self) -> impl Iterator<Item = &Block> + '_ {
        self.blocks.values()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Carve `units` out of the free block at `handle` and give it to `owner`
    ///
    /// An exact fit is handed over in place. Otherwise the block shrinks to
    /// `units` and the remainder becomes a new free block right after it.
    /// The returned handle points at the owned block.
    pub fn split(&mut self, handle: BlockHandle, units: u32, owner: ProcessId) -> Result<BlockHandle> {
        let block = self.blocks.get_mut(&handle.start()).ok_or_else(|| {
            PartitionError::CorruptLedger(format!("no block starts at {}", handle.start()))
        })?;

        if !block.is_free() {
            return Err(PartitionError::CorruptLedger(format!(
                "block at {} is already owned",
                block.start
            )));
        }
        if block.size < units {
            return Err(PartitionError::InsufficientSpace {
                requested: units,
                examined: 0,
            });
        }

        block.owner = Owner::Process(owner);
        if block.size == units {
            return Ok(handle);
        }

        let remainder = Block::free(block.start + units, block.size - units);
        block.size = units;
        self.blocks.insert(remainder.start, remainder);

        debug!(
            "Split block at {}: {} units to process {}, {} units left free at {}",
            handle.start(),
            units,
            owner,
            remainder.size,
            remainder.start
        );

        Ok(handle)
    }

    /// Resolve `handle` to the block owned by `pid`
    pub fn locate_by_owner(&self, handle: BlockHandle, pid: ProcessId) -> Result<&Block> {
        self.blocks
            .get(&handle.start())
            .filter(|block| block.owned_by(pid))
            .ok_or(PartitionError::UnknownProcess(pid))
    }

    /// Mark the block owned by `pid` as free without merging it
    pub fn release(&mut self, handle: BlockHandle, pid: ProcessId) -> Result<Block> {
        let block = self
            .blocks
            .get_mut(&handle.start())
            .filter(|block| block.owned_by(pid))
            .ok_or(PartitionError::UnknownProcess(pid))?;

        block.owner = Owner::Free;
        Ok(*block)
    }

    /// Merge every run of neighbouring free blocks into one block
    ///
    /// Single left-to-right pass; after a merge the same block is checked
    /// again against its new neighbour. Returns the number of merges.
    pub fn coalesce_adjacent_free(&mut self) -> usize {
        let mut merges = 0;
        let mut cursor = self.blocks.keys().next().copied();

        while let Some(start) = cursor {
            let current = match self.blocks.get(&start) {
                Some(block) => *block,
                None => break,
            };
            let next = match self.blocks.get(&current.end()) {
                Some(block) => *block,
                None => break,
            };

            if current.is_free() && next.is_free() {
                self.blocks.remove(&next.start);
                if let Some(block) = self.blocks.get_mut(&start) {
                    block.size += next.size;
                }
                merges += 1;
            } else {
                cursor = Some(next.start);
            }
        }

        if merges > 0 {
            debug!("Coalesced {} free block pair(s)", merges);
        }

        merges
    }

    /// Total free units across all free blocks
    pub fn free_units(&self) -> u32 {
        self.iter().filter(|b| b.is_free()).map(|b| b.size).sum()
    }

    /// Size of the largest free block, 0 when nothing is free
    pub fn largest_free(&self) -> u32 {
        self.iter()
            .filter(|b| b.is_free())
            .map(|b| b.size)
            .max()
            .unwrap_or(0)
    }

    /// Verify the partition invariants
    pub fn check_invariants(&self) -> Result<()> {
        let corrupt = |msg: String| Err(PartitionError::CorruptLedger(msg));

        let mut expected_start = 0u32;
        let mut previous_free = false;
        let mut owners = HashSet::new();

        for (&key, block) in &self.blocks {
            if key != block.start {
                return corrupt(format!("block at {} indexed under {}", block.start, key));
            }
            if block.start != expected_start {
                return corrupt(format!(
                    "gap or overlap: expected block at {}, found {}",
                    expected_start, block.start
                ));
            }
            if block.size == 0 {
                return corrupt(format!("empty block at {}", block.start));
            }

            match block.owner {
                Owner::Free => {
                    if previous_free {
                        return corrupt(format!("uncoalesced free block at {}", block.start));
                    }
                    previous_free = true;
                }
                Owner::Process(pid) => {
                    if !owners.insert(pid) {
                        return corrupt(format!("process {} owns more than one block", pid));
                    }
                    previous_free = false;
                }
            }

            expected_start = block.end();
        }

        if expected_start != TOTAL_UNITS {
            return corrupt(format!(
                "ledger ends at {}, expected {}",
                expected_start, TOTAL_UNITS
            ));
        }

        Ok(())
    }
}

impl Default for BlockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(ledger: &BlockLedger) -> BlockHandle {
        ledger.iter().next().unwrap().handle()
    }

    #[test]
    fn test_new_ledger() {
        let ledger = BlockLedger::new();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.free_units(), TOTAL_UNITS);
        assert_eq!(ledger.largest_free(), TOTAL_UNITS);
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn test_split_leaves_free_remainder() {
        let mut ledger = BlockLedger::new();
        let handle = ledger.split(first(&ledger), 5, ProcessId(1)).unwrap();

        let blocks: Vec<Block> = ledger.iter().copied().collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], Block { start: 0, size: 5, owner: Owner::Process(ProcessId(1)) });
        assert_eq!(blocks[1], Block::free(5, 123));
        assert_eq!(handle.start(), 0);
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn test_split_exact_fit_whole_space() {
        let mut ledger = BlockLedger::new();
        ledger.split(first(&ledger), TOTAL_UNITS, ProcessId(7)).unwrap();

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.free_units(), 0);
        assert!(ledger.iter().next().unwrap().owned_by(ProcessId(7)));
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn test_split_rejects_owned_or_small_block() {
        let mut ledger = BlockLedger::new();
        let handle = ledger.split(first(&ledger), 5, ProcessId(1)).unwrap();

        assert!(matches!(
            ledger.split(handle, 3, ProcessId(2)),
            Err(PartitionError::CorruptLedger(_))
        ));

        let tail = ledger.iter().nth(1).unwrap().handle();
        assert!(matches!(
            ledger.split(tail, TOTAL_UNITS, ProcessId(2)),
            Err(PartitionError::InsufficientSpace { .. })
        ));
    }

    #[test]
    fn test_release_and_coalesce() {
        let mut ledger = BlockLedger::new();
        let a = ledger.split(first(&ledger), 5, ProcessId(1)).unwrap();
        let tail = ledger.iter().nth(1).unwrap().handle();
        let b = ledger.split(tail, 4, ProcessId(2)).unwrap();
        assert_eq!(ledger.len(), 3);

        ledger.release(a, ProcessId(1)).unwrap();
        assert_eq!(ledger.coalesce_adjacent_free(), 0);
        assert_eq!(ledger.len(), 3);

        ledger.release(b, ProcessId(2)).unwrap();
        assert_eq!(ledger.coalesce_adjacent_free(), 2);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.coalesce_adjacent_free(), 0);
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn test_locate_checks_owner() {
        let mut ledger = BlockLedger::new();
        let handle = ledger.split(first(&ledger), 5, ProcessId(1)).unwrap();

        assert_eq!(ledger.locate_by_owner(handle, ProcessId(1)).unwrap().size, 5);
        assert!(matches!(
            ledger.locate_by_owner(handle, ProcessId(2)),
            Err(PartitionError::UnknownProcess(ProcessId(2)))
        ));

        ledger.release(handle, ProcessId(1)).unwrap();
        assert!(ledger.locate_by_owner(handle, ProcessId(1)).is_err());
        assert!(ledger.release(handle, ProcessId(1)).is_err());
    }

    #[test]
    fn test_check_invariants_detects_uncoalesced_run() {
        let mut ledger = BlockLedger::new();
        let handle = ledger.split(first(&ledger), 5, ProcessId(1)).unwrap();
        ledger.release(handle, ProcessId(1)).unwrap();

        assert!(matches!(
            ledger.check_invariants(),
            Err(PartitionError::CorruptLedger(_))
        ));
        ledger.coalesce_adjacent_free();
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn test_reset() {
        let mut ledger = BlockLedger::new();
        ledger.split(first(&ledger), 5, ProcessId(1)).unwrap();
        ledger.reset();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.free_units(), TOTAL_UNITS);
    }
}
