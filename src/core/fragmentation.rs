//! Fragmentation accounting
//!
//! A fragment is a free block too small to satisfy any valid request, i.e. a
//! free block of 1 or 2 units. Counting is a pure read of the current
//! partition; since deallocation always coalesces, the count already reflects
//! maximal merging.

use crate::core::ledger::{BlockLedger, MIN_REQUEST};
use serde::{Deserialize, Serialize};

/// Count free blocks smaller than the minimum request size
pub fn fragment_count(ledger: &BlockLedger) -> usize {
    ledger
        .iter()
        .filter(|block| block.is_free() && block.size < MIN_REQUEST)
        .count()
}

/// Snapshot of how the free space is spread over the ledger
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FragmentationReport {
    /// Free blocks of 1 or 2 units
    pub fragments: usize,
    pub free_blocks: usize,
    pub free_units: u32,
    pub largest_free: u32,
    /// 1 - largest_free / free_units; 0.0 when nothing is free
    pub external_ratio: f64,
}

impl FragmentationReport {
    pub fn from_ledger(ledger: &BlockLedger) -> Self {
        let free_units = ledger.free_units();
        let largest_free = ledger.largest_free();

        let external_ratio = if free_units == 0 {
            0.0
        } else {
            1.0 - (largest_free as f64 / free_units as f64)
        };

        FragmentationReport {
            fragments: fragment_count(ledger),
            free_blocks: ledger.iter().filter(|b| b.is_free()).count(),
            free_units,
            largest_free,
            external_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::ProcessId;
    use crate::core::ledger::TOTAL_UNITS;

    #[test]
    fn test_fresh_ledger_has_no_fragments() {
        let ledger = BlockLedger::new();
        assert_eq!(fragment_count(&ledger), 0);

        let report = FragmentationReport::from_ledger(&ledger);
        assert_eq!(report.free_blocks, 1);
        assert_eq!(report.free_units, TOTAL_UNITS);
        assert_eq!(report.external_ratio, 0.0);
    }

    #[test]
    fn test_small_tail_counts_as_fragment() {
        let mut ledger = BlockLedger::new();
        let head = ledger.iter().next().unwrap().handle();
        ledger.split(head, TOTAL_UNITS - 2, ProcessId(1)).unwrap();

        assert_eq!(fragment_count(&ledger), 1);
        // Pure read
        assert_eq!(fragment_count(&ledger), 1);

        let report = FragmentationReport::from_ledger(&ledger);
        assert_eq!(report.fragments, 1);
        assert_eq!(report.largest_free, 2);
    }

    #[test]
    fn test_three_unit_hole_is_not_a_fragment() {
        let mut ledger = BlockLedger::new();
        let head = ledger.iter().next().unwrap().handle();
        ledger.split(head, TOTAL_UNITS - 3, ProcessId(1)).unwrap();

        assert_eq!(fragment_count(&ledger), 0);
    }

    #[test]
    fn test_external_ratio_with_two_holes() {
        let mut ledger = BlockLedger::new();
        let head = ledger.iter().next().unwrap().handle();
        let a = ledger.split(head, 10, ProcessId(1)).unwrap();
        let tail = ledger.iter().last().unwrap().handle();
        ledger.split(tail, 10, ProcessId(2)).unwrap();
        ledger.release(a, ProcessId(1)).unwrap();

        // Free: 10 at 0 and 108 at 20
        let report = FragmentationReport::from_ledger(&ledger);
        assert_eq!(report.free_blocks, 2);
        assert_eq!(report.free_units, 118);
        assert_eq!(report.largest_free, 108);
        assert!((report.external_ratio - (1.0 - 108.0 / 118.0)).abs() < 1e-9);
    }
}
