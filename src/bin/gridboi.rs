use std::path::PathBuf;

use bellman::dynamic::VerifyScope;
use bellman::problems::GridBoi;
use bellman::{ValueIteration, ValueIterationConfig};
use clap::Parser;

/// Solves Grid-Boi on a `width x height` grid and writes the policy to disk.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    #[arg(long, default_value_t = 5)]
    width: usize,

    #[arg(long, default_value_t = 5)]
    height: usize,

    /// Maximum number of sweeps
    #[arg(long, default_value_t = 2000)]
    iterations: usize,

    /// Stop once every state moves by less than this in one sweep
    #[arg(long, default_value_t = 1e-4)]
    tolerance: f64,

    /// Solution file, one row per state
    #[arg(long, default_value = "gridboi.sol")]
    output: PathBuf,

    /// Randomly chosen state-action pairs to check before solving; 0 checks all
    #[arg(long, default_value_t = 256)]
    verify_pairs: usize,

    /// Seed for choosing the checked pairs
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> bellman::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let grid = GridBoi::new(args.width, args.height)?;
    let verify = match args.verify_pairs {
        0 => VerifyScope::Full,
        pairs => VerifyScope::Sampled {
            pairs,
            seed: args.seed,
        },
    };
    let config = ValueIterationConfig {
        verify,
        ..ValueIterationConfig::default()
    };

    let mut solver = ValueIteration::with_config(&grid, config)?;
    let outcome = solver.improve(args.iterations, args.tolerance);
    if !outcome.converged() {
        log::warn!(
            "stopped after {} sweeps with max delta {}",
            outcome.iterations,
            outcome.max_delta
        );
    }

    solver.record_solution_with(&args.output, &grid.solution_layout())
}
