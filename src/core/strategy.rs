//! Placement strategies
//!
//! - First-fit: walk blocks in address order and stop at the first free block
//!   that is large enough
//! - Best-fit: walk the whole ledger and keep the smallest free block that is
//!   large enough (earliest one wins a tie)
//!
//! Both report how many blocks they looked at, which the engine hands back to
//! the caller as the cost of the request.

use crate::core::block::BlockHandle;
use crate::core::error::PartitionError;
use crate::core::ledger::BlockLedger;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementStrategy {
    FirstFit,
    BestFit,
}

/// Result of a placement search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Chosen free block, if any was large enough
    pub candidate: Option<BlockHandle>,
    /// Number of blocks visited during the search
    pub examined: usize,
}

impl PlacementStrategy {
    pub const ALL: [PlacementStrategy; 2] = [PlacementStrategy::FirstFit, PlacementStrategy::BestFit];

    /// Pick a free block of at least `units` from `ledger`
    pub fn select(&self, ledger: &BlockLedger, units: u32) -> Selection {
        match self {
            PlacementStrategy::FirstFit => first_fit(ledger, units),
            PlacementStrategy::BestFit => best_fit(ledger, units),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PlacementStrategy::FirstFit => "First Fit",
            PlacementStrategy::BestFit => "Best Fit",
        }
    }
}

fn first_fit(ledger: &BlockLedger, units: u32) -> Selection {
    let mut examined = 0;

    for block in ledger.iter() {
        examined += 1;
        if block.fits(units) {
            return Selection {
                candidate: Some(block.handle()),
                examined,
            };
        }
    }

    Selection {
        candidate: None,
        examined,
    }
}

fn best_fit(ledger: &BlockLedger, units: u32) -> Selection {
    let mut examined = 0;
    let mut best: Option<(u32, BlockHandle)> = None;

    for block in ledger.iter() {
        examined += 1;
        if !block.fits(units) {
            continue;
        }
        // Strict comparison keeps the lowest address on ties
        if best.map_or(true, |(size, _)| block.size < size) {
            best = Some((block.size, block.handle()));
        }
    }

    Selection {
        candidate: best.map(|(_, handle)| handle),
        examined,
    }
}

impl fmt::Display for PlacementStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlacementStrategy {
    type Err = PartitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first-fit" | "first_fit" | "firstfit" | "first" => Ok(PlacementStrategy::FirstFit),
            "best-fit" | "best_fit" | "bestfit" | "best" => Ok(PlacementStrategy::BestFit),
            _ => Err(PartitionError::InvalidStrategy(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::ProcessId;

    /// [F 0:6][P1 6:3][F 9:4][P3 13:3][F 16:112]
    fn holey_ledger() -> BlockLedger {
        let mut ledger = BlockLedger::new();
        let sizes = [6, 3, 4, 3];
        let mut handles = Vec::new();
        for (pid, units) in sizes.iter().enumerate() {
            let tail = ledger.iter().last().unwrap().handle();
            handles.push(ledger.split(tail, *units, ProcessId(pid as u32)).unwrap());
        }
        ledger.release(handles[0], ProcessId(0)).unwrap();
        ledger.release(handles[2], ProcessId(2)).unwrap();
        ledger.coalesce_adjacent_free();
        ledger
    }

    #[test]
    fn test_first_fit_stops_early() {
        let ledger = holey_ledger();
        assert_eq!(ledger.len(), 5);

        let selection = PlacementStrategy::FirstFit.select(&ledger, 4);
        assert_eq!(selection.candidate.unwrap().start(), 0);
        assert_eq!(selection.examined, 1);
    }

    #[test]
    fn test_best_fit_scans_everything() {
        let ledger = holey_ledger();

        let selection = PlacementStrategy::BestFit.select(&ledger, 4);
        assert_eq!(selection.candidate.unwrap().start(), 9);
        assert_eq!(selection.examined, ledger.len());
    }

    #[test]
    fn test_no_candidate() {
        let ledger = holey_ledger();

        for strategy in PlacementStrategy::ALL {
            let selection = strategy.select(&ledger, 200);
            assert!(selection.candidate.is_none());
            assert_eq!(selection.examined, ledger.len());
        }
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!("first-fit".parse::<PlacementStrategy>().unwrap(), PlacementStrategy::FirstFit);
        assert_eq!("BestFit".parse::<PlacementStrategy>().unwrap(), PlacementStrategy::BestFit);
        assert!(matches!(
            "worst-fit".parse::<PlacementStrategy>(),
            Err(PartitionError::InvalidStrategy(_))
        ));
    }
}
