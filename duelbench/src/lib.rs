#![warn(missing_docs)]
//! # DuelBench
//!
//! Decide which of two workloads is faster, and stop measuring as soon as
//! the answer is statistically clear.
//!
//! - **Sequential testing**: after every trial a Welch's t-test compares the
//!   two sample sets; sampling stops once p drops below the threshold
//! - **Two strategies**: run a shell command directly (bare), or drive a
//!   long-lived worker over a line protocol on stdin/stdout (harness)
//! - **Worker-side timing**: harness workers may report their own
//!   measurements with `VALUE`/`VALUES`
//!
//! ## Writing a worker
//!
//! ```no_run
//! use duelbench::{IterationUnit, WorkerMain};
//!
//! fn main() -> std::process::ExitCode {
//!     WorkerMain::serve(IterationUnit::plain(|| {
//!         let _ = (0..10_000u64).sum::<u64>();
//!     }))
//! }
//! ```
//!
//! ## Comparing from code
//!
//! ```no_run
//! use duelbench::{SamplingConfig, SamplingEngine, Strategy, Workload};
//!
//! let config = SamplingConfig {
//!     strategy: Strategy::Bare,
//!     ..Default::default()
//! };
//! let engine = SamplingEngine::new(
//!     config,
//!     vec![Workload::command("sleep 0.01"), Workload::command("sleep 0.02")],
//! )?;
//! let report = engine.run()?;
//! println!("{}", duelbench::format_human_output(&report));
//! # Ok::<(), duelbench::EngineError>(())
//! ```

// Re-export worker-side types
pub use duelbench_core::{
    BatchOutput, IterationUnit, ReturnMode, WorkerError, WorkerExit, WorkerMain, WorkerState,
    Workload,
};

// Re-export protocol types
pub use duelbench_ipc::{Command, ProtocolError, Response};

// Re-export stats
pub use duelbench_stats::{
    GroupStatistics, SummaryMethod, WelchTTest, mean, median, summarize, welch_t_test,
};

// Re-export controllers, engine and CLI entry point
pub use duelbench_cli::{
    BareProcess, BenchmarkReport, BenchmarkState, ConfigError, ControllerError, DuelConfig,
    EngineError, Group, HarnessProcess, ProcessController, ProcessHandle, ProcessState,
    RunOutcome, SamplingConfig, SamplingEngine, Strategy, format_human_output, run,
};
