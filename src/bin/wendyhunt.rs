use std::path::PathBuf;

use bellman::problems::wendy_hunt;
use bellman::ValueIteration;
use clap::Parser;

/// Solves the three-state Wendy-Hunt problem and prints the policy.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Maximum number of sweeps
    #[arg(long, default_value_t = 2000)]
    iterations: usize,

    /// Stop once every state moves by less than this in one sweep
    #[arg(long, default_value_t = 1e-4)]
    tolerance: f64,

    /// Also write the solution as CSV
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> bellman::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let mut solver = ValueIteration::new(wendy_hunt()?)?;
    let outcome = solver.improve(args.iterations, args.tolerance);
    if !outcome.converged() {
        log::warn!(
            "stopped after {} sweeps with max delta {}",
            outcome.iterations,
            outcome.max_delta
        );
    }

    solver.print_solution();
    if let Some(path) = args.output {
        solver.record_solution(path)?;
    }
    Ok(())
}
