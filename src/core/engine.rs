//! Allocator engine
//!
//! Owns one [`BlockLedger`] and the process index, and drives a single
//! [`PlacementStrategy`]. Every failing request leaves both untouched.

use crate::core::block::{Block, BlockHandle, ProcessId};
use crate::core::error::{PartitionError, Result};
use crate::core::fragmentation::{self, FragmentationReport};
use crate::core::ledger::{BlockLedger, MAX_REQUEST, MIN_REQUEST};
use crate::core::strategy::PlacementStrategy;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Returned by the integer facade when a request fails
pub const FAILURE: i32 = -1;

/// Returned by [`Allocator::deallocate_mem`] on success
pub const DEALLOCATED: i32 = 1;

#[derive(Debug, Clone)]
pub struct Allocator {
    strategy: PlacementStrategy,
    ledger: BlockLedger,
    /// Live processes and the block each one owns
    index: HashMap<ProcessId, BlockHandle>,
}

impl Allocator {
    /// Create an allocator with the whole address space free
    pub fn new(strategy: PlacementStrategy) -> Self {
        info!("Creating {} allocator", strategy);

        Allocator {
            strategy,
            ledger: BlockLedger::new(),
            index: HashMap::new(),
        }
    }

    pub fn first_fit() -> Self {
        Self::new(PlacementStrategy::FirstFit)
    }

    pub fn best_fit() -> Self {
        Self::new(PlacementStrategy::BestFit)
    }

    pub fn strategy(&self) -> PlacementStrategy {
        self.strategy
    }

    /// Give `units` contiguous units to `pid`
    ///
    /// Returns the number of blocks the strategy examined.
    pub fn allocate(&mut self, pid: ProcessId, units: u32) -> Result<usize> {
        if !(MIN_REQUEST..=MAX_REQUEST).contains(&units) {
            return Err(PartitionError::InvalidSize {
                requested: units,
                min: MIN_REQUEST,
                max: MAX_REQUEST,
            });
        }

        // A process holds at most one block
        if self.index.contains_key(&pid) {
            return Err(PartitionError::DuplicateProcess(pid));
        }

        let selection = self.strategy.select(&self.ledger, units);
        let candidate = match selection.candidate {
            Some(handle) => handle,
            None => {
                warn!(
                    "{}: denied {} units to process {} after examining {} blocks",
                    self.strategy, units, pid, selection.examined
                );
                return Err(PartitionError::InsufficientSpace {
                    requested: units,
                    examined: selection.examined,
                });
            }
        };

        let handle = self.ledger.split(candidate, units, pid)?;
        self.index.insert(pid, handle);

        debug!(
            "{}: allocated {} units at {} to process {} ({} blocks examined)",
            self.strategy,
            units,
            handle.start(),
            pid,
            selection.examined
        );

        Ok(selection.examined)
    }

    /// Free the block owned by `pid` and merge neighbouring free blocks
    pub fn deallocate(&mut self, pid: ProcessId) -> Result<()> {
        let handle = *self
            .index
            .get(&pid)
            .ok_or(PartitionError::UnknownProcess(pid))?;

        let block = self.ledger.release(handle, pid)?;
        self.index.remove(&pid);
        self.ledger.coalesce_adjacent_free();

        debug!(
            "{}: freed {} units at {} from process {}",
            self.strategy, block.size, block.start, pid
        );

        Ok(())
    }

    /// Integer facade over [`Allocator::allocate`]: blocks examined, or -1
    pub fn allocate_mem(&mut self, pid: ProcessId, units: u32) -> i32 {
        match self.allocate(pid, units) {
            Ok(examined) => i32::try_from(examined).unwrap_or(i32::MAX),
            Err(_) => FAILURE,
        }
    }

    /// Integer facade over [`Allocator::deallocate`]: 1, or -1
    pub fn deallocate_mem(&mut self, pid: ProcessId) -> i32 {
        match self.deallocate(pid) {
            Ok(()) => DEALLOCATED,
            Err(_) => FAILURE,
        }
    }

    /// Number of free blocks of 1 or 2 units
    pub fn fragment_count(&self) -> usize {
        fragmentation::fragment_count(&self.ledger)
    }

    pub fn fragmentation_report(&self) -> FragmentationReport {
        FragmentationReport::from_ledger(&self.ledger)
    }

    /// Blocks in address order
    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.ledger.iter()
    }

    /// The block currently owned by `pid`
    pub fn owner_block(&self, pid: ProcessId) -> Result<&Block> {
        let handle = self
            .index
            .get(&pid)
            .ok_or(PartitionError::UnknownProcess(pid))?;
        self.ledger.locate_by_owner(*handle, pid)
    }

    pub fn is_allocated(&self, pid: ProcessId) -> bool {
        self.index.contains_key(&pid)
    }

    /// Live processes in ascending id order
    pub fn processes(&self) -> Vec<ProcessId> {
        let mut pids: Vec<ProcessId> = self.index.keys().copied().collect();
        pids.sort_unstable();
        pids
    }

    pub fn process_count(&self) -> usize {
        self.index.len()
    }

    pub fn allocated_units(&self) -> u32 {
        self.blocks().filter(|b| !b.is_free()).map(|b| b.size).sum()
    }

    /// Release every block and forget every process
    pub fn reset(&mut self) {
        info!(
            "{}: resetting allocator ({} live processes)",
            self.strategy,
            self.index.len()
        );
        self.ledger.reset();
        self.index.clear();
    }

    /// Verify ledger invariants and that the index agrees with the ledger
    pub fn check_consistency(&self) -> Result<()> {
        self.ledger.check_invariants()?;

        for (&pid, &handle) in &self.index {
            self.ledger.locate_by_owner(handle, pid).map_err(|_| {
                PartitionError::CorruptLedger(format!(
                    "index entry for process {} does not resolve",
                    pid
                ))
            })?;
        }

        let owned = self.blocks().filter(|b| !b.is_free()).count();
        if owned != self.index.len() {
            return Err(PartitionError::CorruptLedger(format!(
                "{} owned blocks but {} indexed processes",
                owned,
                self.index.len()
            )));
        }

        Ok(())
    }
}
