//! # SLICESIM Driver
//!
//! Runs one simulation from the command line.
//!
//! ```text
//! slicesim -n 2000 -o trajectory.txt -s summary.txt --workers 8
//! slicesim --config run.toml --seed 42
//! ```
//!
//! Command-line flags override values from the TOML file. Log verbosity is
//! controlled with `RUST_LOG` (default `info`).

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::error;
use tracing_subscriber::EnvFilter;

use slicesim_core::{
    append_summary, Binning, OutOfRange, ShortRange, SimConfig, SimResult, Simulation, SnapshotSink,
    TextSnapshot,
};

#[derive(Parser, Debug)]
#[command(name = "slicesim", version, about = "Parallel slice-decomposed particle simulation")]
struct Cli {
    /// Number of particles.
    #[arg(short = 'n')]
    particles: Option<usize>,

    /// Write a trajectory snapshot to this file.
    #[arg(short = 'o')]
    output: Option<PathBuf>,

    /// Append "<n> <seconds>" to this summary file.
    #[arg(short = 's')]
    summary: Option<PathBuf>,

    /// Number of steps.
    #[arg(long)]
    steps: Option<usize>,

    /// Size of the worker pool.
    #[arg(long)]
    workers: Option<usize>,

    /// Override the derived slice count.
    #[arg(long)]
    slices: Option<usize>,

    /// Seed for particle initialization.
    #[arg(long)]
    seed: Option<u64>,

    /// Slice assignment formula.
    #[arg(long, value_enum)]
    binning: Option<BinningArg>,

    /// What to do with particles outside the slice range.
    #[arg(long, value_enum)]
    out_of_range: Option<OutOfRangeArg>,

    /// Snapshot every k-th step.
    #[arg(long)]
    snapshot_every: Option<usize>,

    /// TOML run file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BinningArg {
    Natural,
    Legacy,
}

impl From<BinningArg> for Binning {
    fn from(arg: BinningArg) -> Self {
        match arg {
            BinningArg::Natural => Self::Natural,
            BinningArg::Legacy => Self::Legacy,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutOfRangeArg {
    Clamp,
    Reject,
}

impl From<OutOfRangeArg> for OutOfRange {
    fn from(arg: OutOfRangeArg) -> Self {
        match arg {
            OutOfRangeArg::Clamp => Self::Clamp,
            OutOfRangeArg::Reject => Self::Reject,
        }
    }
}

impl Cli {
    fn resolve(&self) -> SimResult<SimConfig> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_path(path)?,
            None => SimConfig::default(),
        };
        if let Some(particles) = self.particles {
            config.particles = particles;
        }
        if let Some(steps) = self.steps {
            config.steps = steps;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if self.slices.is_some() {
            config.slices = self.slices;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(binning) = self.binning {
            config.binning = binning.into();
        }
        if let Some(policy) = self.out_of_range {
            config.out_of_range = policy.into();
        }
        if let Some(every) = self.snapshot_every {
            config.snapshot_every = every;
        }
        config.validate()?;
        Ok(config)
    }
}

fn run(cli: &Cli) -> SimResult<()> {
    let config = cli.resolve()?;
    let mut sim = Simulation::new(config)?;
    let law = ShortRange::new(sim.domain().size());

    let mut snapshot = match &cli.output {
        Some(path) => Some(TextSnapshot::new(BufWriter::new(File::create(path)?), sim.domain().size())),
        None => None,
    };
    let report = sim.run(&law, snapshot.as_mut().map(|s| s as &mut dyn SnapshotSink))?;
    if let Some(snapshot) = snapshot {
        snapshot.finish()?;
    }

    let seconds = report.elapsed.as_secs_f64();
    println!("n = {}, simulation time = {seconds} seconds", sim.domain().particles());
    println!(
        "step time: min {} us, avg {} us, max {} us over {} steps",
        report.timings.min_step_us, report.timings.avg_step_us, report.timings.max_step_us, report.steps
    );
    if report.clamped > 0 {
        println!("{} particle positions clamped into the slice range", report.clamped);
    }

    if let Some(path) = &cli.summary {
        append_summary(path, sim.domain().particles(), seconds)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "simulation failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from(["slicesim", "-n", "40", "--workers", "2", "--binning", "legacy", "--seed", "5"]);
        let config = cli.resolve().unwrap();
        assert_eq!(config.particles, 40);
        assert_eq!(config.workers, 2);
        assert_eq!(config.binning, Binning::Legacy);
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.steps, 1000);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let cli = Cli::parse_from(["slicesim", "--workers", "0"]);
        assert!(cli.resolve().is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
