//! Per-strategy statistics
//!
//! Consumes the outcome of each request and keeps running totals for:
//! - average fragment count per request
//! - average number of blocks examined per allocation request
//! - percentage of allocation requests that were denied

use crate::core::error::{PartitionError, Result};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub allocation_requests: u64,
    pub successful_allocations: u64,
    pub denied_allocations: u64,
    /// Blocks examined across every allocation request that reached a strategy
    pub blocks_examined: u64,
    pub deallocation_requests: u64,
    pub failed_deallocations: u64,
    /// Sum of fragment samples
    pub fragments: u64,
    /// Number of fragment samples
    pub samples: u64,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one allocation request
    ///
    /// A denied search still counts the blocks it examined. A request
    /// rejected before the search (bad size, duplicate process) counts as
    /// denied with nothing examined.
    pub fn record_allocation(&mut self, outcome: &Result<usize>) {
        self.allocation_requests += 1;

        match outcome {
            Ok(examined) => {
                self.successful_allocations += 1;
                self.blocks_examined += *examined as u64;
            }
            Err(PartitionError::InsufficientSpace { examined, .. }) => {
                self.denied_allocations += 1;
                self.blocks_examined += *examined as u64;
            }
            Err(_) => {
                self.denied_allocations += 1;
            }
        }
    }

    /// Record the outcome of one deallocation request
    pub fn record_deallocation(&mut self, outcome: &Result<()>) {
        self.deallocation_requests += 1;
        if outcome.is_err() {
            self.failed_deallocations += 1;
        }
    }

    /// Record the fragment count observed after a request
    pub fn record_fragments(&mut self, count: usize) {
        self.fragments += count as u64;
        self.samples += 1;
    }

    pub fn average_fragments(&self) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        self.fragments as f64 / self.samples as f64
    }

    pub fn average_examined(&self) -> f64 {
        if self.allocation_requests == 0 {
            return 0.0;
        }
        self.blocks_examined as f64 / self.allocation_requests as f64
    }

    pub fn denial_percentage(&self) -> f64 {
        if self.allocation_requests == 0 {
            return 0.0;
        }
        self.denied_allocations as f64 * 100.0 / self.allocation_requests as f64
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Allocation requests:       {}", self.allocation_requests)?;
        writeln!(f, "  Successful allocations:    {}", self.successful_allocations)?;
        writeln!(f, "  Deallocation requests:     {}", self.deallocation_requests)?;
        writeln!(f, "  Average fragments:         {:.4}", self.average_fragments())?;
        writeln!(f, "  Average blocks examined:   {:.4}", self.average_examined())?;
        write!(f, "  Allocation denials:        {:.2}%", self.denial_percentage())
    }
}
