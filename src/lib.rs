//! # partition-sim - Contiguous Memory Partitioning Simulator
//!
//! Models dynamic partitioning of a fixed 128-unit address space (256 KB in
//! 2 KB units) with two placement strategies:
//!
//! - **First-fit**: take the lowest-addressed free block that is large enough
//! - **Best-fit**: take the smallest free block that is large enough
//!
//! Allocation splits a free block, deallocation frees the owner's block and
//! coalesces neighbouring free blocks. Free blocks of 1 or 2 units can never
//! satisfy a request (the minimum is 3) and are reported as fragments.
//!
//! ## Quick Start
//!
//! ```rust
//! use partition_sim::{Allocator, ProcessId, Result};
//!
//! # fn main() -> Result<()> {
//! let mut alloc = Allocator::first_fit();
//!
//! // Returns how many blocks the strategy examined
//! let examined = alloc.allocate(ProcessId(1), 5)?;
//! assert_eq!(examined, 1);
//!
//! alloc.deallocate(ProcessId(1))?;
//! assert_eq!(alloc.fragment_count(), 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Layout
//!
//! - [`core::ledger`](crate::core::ledger) - ordered partition of the address space, split and coalesce
//! - [`core::strategy`](crate::core::strategy) - first-fit and best-fit selection
//! - [`core::engine`](crate::core::engine) - allocator engine and the `-1`/`1` integer facade
//! - [`core::fragmentation`](crate::core::fragmentation) - fragment counting
//! - [`stats`] - per-strategy statistics
//! - [`render`] - human and JSON views of the ledger
//! - [`simulation`] - workload configuration and driver

pub mod core;
pub mod render;
pub mod simulation;
pub mod stats;

pub use crate::core::{
    block::{Block, BlockHandle, Owner, ProcessId},
    engine::{Allocator, DEALLOCATED, FAILURE},
    error::{PartitionError, Result},
    fragmentation::{fragment_count, FragmentationReport},
    ledger::{BlockLedger, MAX_REQUEST, MIN_REQUEST, TOTAL_UNITS, UNIT_SIZE_KB},
    strategy::{PlacementStrategy, Selection},
};
pub use render::LayoutView;
pub use simulation::{Request, Simulation, SimulationConfig, StrategyReport, WorkloadGenerator};
pub use stats::Statistics;
