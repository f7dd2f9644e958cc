#![warn(missing_docs)]
//! DuelBench Core - Worker Runtime
//!
//! This crate provides the pieces a benchmarked program links against:
//! - `WorkerMain`, the command loop serving `ITERS`/`QUIT` over stdin/stdout
//! - `IterationUnit`, the registered unit of work and its return mode
//! - `Workload`, the descriptor of what a controller runs

mod unit;
mod worker;
mod workload;

pub use unit::{BatchOutput, IterationUnit, ReturnMode};
pub use worker::{WorkerError, WorkerExit, WorkerMain, WorkerState};
pub use workload::Workload;
