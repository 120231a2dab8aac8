//! Workload driver
//!
//! Generates random allocate/deallocate request streams and replays the same
//! stream against one allocator per placement strategy, so the strategies
//! can be compared on identical input.

use crate::core::block::ProcessId;
use crate::core::engine::Allocator;
use crate::core::error::{PartitionError, Result};
use crate::core::fragmentation::FragmentationReport;
use crate::core::ledger::{MAX_REQUEST, MIN_REQUEST, TOTAL_UNITS};
use crate::core::strategy::PlacementStrategy;
use crate::stats::Statistics;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Workload settings, usually loaded from a TOML file
///
/// ```toml
/// requests = 10000
/// allocate_probability = 0.5
/// seed = 42
/// strategies = ["first-fit", "best-fit"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of requests in the generated stream
    pub requests: usize,
    /// Chance that a request allocates when some process is live
    pub allocate_probability: f64,
    /// RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
    pub strategies: Vec<PlacementStrategy>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            requests: 10_000,
            allocate_probability: 0.5,
            seed: None,
            strategies: PlacementStrategy::ALL.to_vec(),
        }
    }
}

impl SimulationConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("Loading simulation config from {:?}", path.as_ref());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.allocate_probability) {
            return Err(PartitionError::InvalidConfig(format!(
                "allocate_probability {} is outside 0.0..=1.0",
                self.allocate_probability
            )));
        }
        if self.strategies.is_empty() {
            return Err(PartitionError::InvalidConfig(
                "at least one strategy is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// One request in a workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Allocate { pid: ProcessId, units: u32 },
    Deallocate { pid: ProcessId },
}

/// Random request source
///
/// Tracks the processes it has asked to allocate so deallocations always
/// name one of them. Whether a given allocator actually granted the
/// allocation is not known here; if it did not, the deallocation fails
/// against that allocator with `UnknownProcess`.
pub struct WorkloadGenerator {
    rng: StdRng,
    allocate_probability: f64,
    next_pid: u32,
    live: Vec<ProcessId>,
}

impl WorkloadGenerator {
    pub fn new(seed: Option<u64>, allocate_probability: f64) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        WorkloadGenerator {
            rng,
            allocate_probability,
            next_pid: 0,
            live: Vec::new(),
        }
    }

    pub fn next_request(&mut self) -> Request {
        if self.live.is_empty() || self.rng.gen_bool(self.allocate_probability) {
            let pid = ProcessId(self.next_pid);
            self.next_pid += 1;
            self.live.push(pid);
            Request::Allocate {
                pid,
                units: self.rng.gen_range(MIN_REQUEST..=MAX_REQUEST),
            }
        } else {
            let idx = self.rng.gen_range(0..self.live.len());
            Request::Deallocate {
                pid: self.live.swap_remove(idx),
            }
        }
    }

    pub fn generate(&mut self, count: usize) -> Vec<Request> {
        (0..count).map(|_| self.next_request()).collect()
    }
}

/// One allocation made while filling memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FillStep {
    pub pid: ProcessId,
    pub units: u32,
    pub examined: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillReport {
    pub steps: Vec<FillStep>,
    pub total_units: u32,
    pub fragments: usize,
}

/// Allocate random sizes until the next one would overrun the address
/// space or an allocation is denied
///
/// Process ids are handed out from `first_pid` upward.
pub fn fill_until_full<R: Rng>(allocator: &mut Allocator, rng: &mut R, first_pid: u32) -> FillReport {
    let mut steps = Vec::new();
    let mut total_units = 0;
    let mut pid = first_pid;

    while total_units < TOTAL_UNITS {
        let units = rng.gen_range(MIN_REQUEST..=MAX_REQUEST);
        if total_units + units > TOTAL_UNITS {
            break;
        }

        match allocator.allocate(ProcessId(pid), units) {
            Ok(examined) => {
                steps.push(FillStep {
                    pid: ProcessId(pid),
                    units,
                    examined,
                });
                total_units += units;
                pid = match pid.checked_add(1) {
                    Some(next) => next,
                    None => {
                        debug!("Fill stopped: process ids exhausted at {}", pid);
                        break;
                    }
                };
            }
            Err(err) => {
                debug!("Fill stopped at process {}: {}", pid, err);
                break;
            }
        }
    }

    FillReport {
        steps,
        total_units,
        fragments: allocator.fragment_count(),
    }
}

/// Outcome of replaying a workload against one strategy
#[derive(Debug, Clone, Serialize)]
pub struct StrategyReport {
    pub strategy: PlacementStrategy,
    pub statistics: Statistics,
    pub final_fragmentation: FragmentationReport,
}

pub struct Simulation;

impl Simulation {
    /// Generate one request stream and replay it once per strategy
    pub fn run(config: &SimulationConfig) -> Result<Vec<StrategyReport>> {
        config.validate()?;

        let requests = WorkloadGenerator::new(config.seed, config.allocate_probability)
            .generate(config.requests);

        info!(
            "Replaying {} requests against {} strategies",
            requests.len(),
            config.strategies.len()
        );

        Ok(config
            .strategies
            .iter()
            .map(|&strategy| Self::replay(strategy, &requests))
            .collect())
    }

    /// Feed `requests` to a fresh allocator using `strategy`
    pub fn replay(strategy: PlacementStrategy, requests: &[Request]) -> StrategyReport {
        let mut allocator = Allocator::new(strategy);
        let mut statistics = Statistics::new();

        for request in requests {
            match *request {
                Request::Allocate { pid, units } => {
                    let outcome = allocator.allocate(pid, units);
                    statistics.record_allocation(&outcome);
                }
                Request::Deallocate { pid } => {
                    let outcome = allocator.deallocate(pid);
                    statistics.record_deallocation(&outcome);
                }
            }
            statistics.record_fragments(allocator.fragment_count());
        }

        info!(
            "{}: {} requests, {:.2}% allocations denied",
            strategy,
            requests.len(),
            statistics.denial_percentage()
        );

        StrategyReport {
            strategy,
            statistics,
            final_fragmentation: allocator.fragmentation_report(),
        }
    }
}
