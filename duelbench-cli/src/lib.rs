#![warn(missing_docs)]
//! DuelBench CLI Library
//!
//! Process controllers, the sampling engine and the command line front end.
//! Use `duelbench_cli::run()` in a main function to get the full `duelbench`
//! experience:
//!
//! ```ignore
//! fn main() -> std::process::ExitCode {
//!     match duelbench_cli::run() {
//!         Ok(outcome) => std::process::ExitCode::from(outcome.exit_code()),
//!         Err(_) => std::process::ExitCode::FAILURE,
//!     }
//! }
//! ```

mod config;
mod controller;
mod engine;
mod report;

pub use config::*;
pub use controller::{
    BareProcess, ControllerError, HarnessProcess, ProcessController, ProcessHandle, ProcessState,
    build_controller,
};
pub use engine::{
    BenchmarkReport, BenchmarkState, EngineError, Group, GroupSummary, RunOutcome, SamplingEngine,
};
pub use report::{format_human_output, format_seconds};

use clap::Parser;
use duelbench_core::Workload;
use duelbench_stats::SummaryMethod;
use std::path::PathBuf;

/// DuelBench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "duelbench")]
#[command(
    author,
    version,
    about = "DuelBench - decide which of two commands is faster"
)]
pub struct Cli {
    /// Command line of the first workload
    pub command_a: String,

    /// Command line of the second workload
    pub command_b: String,

    /// Significance threshold for Welch's t-test
    #[arg(long)]
    pub pvalue: Option<f64>,

    /// Discarded warm-up iterations per workload
    #[arg(long, visible_alias = "warmup")]
    pub burnin: Option<u64>,

    /// Never stop before this many trials
    #[arg(long)]
    pub min_trials: Option<u32>,

    /// Never run more than this many trials
    #[arg(long)]
    pub max_trials: Option<u32>,

    /// Iterations per workload per trial
    #[arg(long)]
    pub iters_per_trial: Option<u64>,

    /// Run the commands directly instead of as protocol workers
    #[arg(long, conflicts_with = "harness")]
    pub bare: bool,

    /// Run the commands as protocol workers (overrides `strategy = "bare"`)
    #[arg(long)]
    pub harness: bool,

    /// Exit with status 2 when no significant difference is found
    #[arg(long)]
    pub fail_on_divergence: bool,

    /// Central tendency used to name the faster workload: mean or median
    #[arg(long)]
    pub summary: Option<SummaryMethod>,

    /// Configuration file (default: discover duel.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log every protocol exchange
    #[arg(long)]
    pub debug: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Layer the command-line flags over `config`
    pub fn apply(&self, config: &mut SamplingConfig) {
        if let Some(pvalue) = self.pvalue {
            config.pvalue_threshold = pvalue;
        }
        if let Some(burnin) = self.burnin {
            config.burn_in_count = burnin;
        }
        if let Some(min_trials) = self.min_trials {
            config.min_trials = min_trials;
        }
        if let Some(max_trials) = self.max_trials {
            config.max_trials = max_trials;
        }
        if let Some(iters) = self.iters_per_trial {
            config.iters_per_trial = iters;
        }
        if self.bare {
            config.strategy = Strategy::Bare;
        } else if self.harness {
            config.strategy = Strategy::Harness;
        }
        if let Some(summary) = self.summary {
            config.summary_method = summary;
        }
        config.fail_on_divergence |= self.fail_on_divergence;
        config.debug |= self.debug;
    }

    /// Resolve the effective sampling configuration: defaults, then the
    /// config file, then flags.
    pub fn sampling_config(&self) -> Result<SamplingConfig, ConfigError> {
        let file = match &self.config {
            Some(path) => Some(DuelConfig::load(path)?),
            None => DuelConfig::discover()?,
        };
        let mut config = match file {
            Some(file) => file.to_sampling_config()?,
            None => SamplingConfig::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }
}

/// Run the DuelBench CLI with the process arguments.
///
/// # Returns
/// The run's outcome, to be mapped onto the exit status with
/// [`RunOutcome::exit_code`].
pub fn run() -> anyhow::Result<RunOutcome> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the DuelBench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<RunOutcome> {
    // Initialize logging
    let filter = if cli.verbose {
        "duelbench=debug"
    } else {
        "duelbench=info"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = cli.sampling_config()?;
    tracing::debug!(?config, "Resolved sampling configuration");

    let workloads = vec![
        Workload::command(cli.command_a),
        Workload::command(cli.command_b),
    ];
    let engine = SamplingEngine::new(config, workloads)?;
    let report = engine.run()?;

    print!("{}", format_human_output(&report));
    Ok(report.outcome)
}
