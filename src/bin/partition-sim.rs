//! Partition simulator
//!
//! Replays a random allocate/deallocate workload against first-fit and
//! best-fit allocators and prints their statistics.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use partition_sim::simulation::fill_until_full;
use partition_sim::{
    render::layout_json, Allocator, LayoutView, PlacementStrategy, Simulation, SimulationConfig,
    TOTAL_UNITS, UNIT_SIZE_KB,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "partition-sim")]
#[command(about = "Contiguous memory partitioning simulator (first-fit vs best-fit)")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay one random request stream against each strategy
    Run {
        /// TOML config file
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,

        /// Number of requests (overrides config)
        #[arg(short = 'n', long)]
        requests: Option<usize>,

        /// RNG seed (overrides config)
        #[arg(short = 's', long)]
        seed: Option<u64>,

        /// Strategy to run, repeatable (overrides config)
        #[arg(long = "strategy")]
        strategies: Vec<String>,

        /// Print reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fill a fresh allocator with random requests and print its layout
    Fill {
        /// Placement strategy (first-fit, best-fit)
        #[arg(long, default_value = "first-fit")]
        strategy: String,

        /// RNG seed
        #[arg(short = 's', long)]
        seed: Option<u64>,

        /// First process id to hand out
        #[arg(long, default_value = "10")]
        first_pid: u32,

        /// Print layout as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Filter from `RUST_LOG` directives, or `info` when unset or unparsable
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .init();

    let args = Args::parse();

    info!(
        "Address space: {} units of {} KB",
        TOTAL_UNITS, UNIT_SIZE_KB
    );

    match args.command {
        Command::Run {
            config,
            requests,
            seed,
            strategies,
            json,
        } => {
            let mut config = match config {
                Some(path) => SimulationConfig::from_file(&path)
                    .with_context(|| format!("loading config {:?}", path))?,
                None => SimulationConfig::default(),
            };

            if let Some(requests) = requests {
                config.requests = requests;
            }
            if seed.is_some() {
                config.seed = seed;
            }
            if !strategies.is_empty() {
                config.strategies = strategies
                    .iter()
                    .map(|s| s.parse::<PlacementStrategy>())
                    .collect::<Result<_, _>>()?;
            }

            let reports = Simulation::run(&config)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in &reports {
                    println!("{}:", report.strategy);
                    println!("{}", report.statistics);
                    println!();
                }
            }
        }

        Command::Fill {
            strategy,
            seed,
            first_pid,
            json,
        } => {
            let strategy: PlacementStrategy = strategy.parse()?;
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };

            let mut allocator = Allocator::new(strategy);
            let report = fill_until_full(&mut allocator, &mut rng, first_pid);

            if let Err(err) = allocator.check_consistency() {
                bail!("ledger inconsistent after fill: {}", err);
            }

            if json {
                println!("{}", layout_json(&allocator)?);
            } else {
                for step in &report.steps {
                    println!(
                        "Process {} allocated {} units, blocks examined: {}",
                        step.pid, step.units, step.examined
                    );
                }
                println!("Total memory allocated: {} units", report.total_units);
                print!("{}", LayoutView::new(strategy.name(), &allocator));
                println!("Final fragment count: {}", report.fragments);
            }
        }
    }

    Ok(())
}
