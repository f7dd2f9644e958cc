//! Harness worker that reports its own per-iteration timings (`VALUES`).
//!
//! Usage: `loop_worker [COUNT]`: each iteration sums COUNT integers
//! (default 10000).

use duelbench::{IterationUnit, WorkerMain};
use std::hint::black_box;
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    let count = match std::env::args().nth(1).map(|arg| arg.parse::<u64>()) {
        None => 10_000,
        Some(Ok(count)) => count,
        Some(Err(e)) => {
            eprintln!("loop_worker: invalid count: {}", e);
            return ExitCode::FAILURE;
        }
    };
    WorkerMain::serve(IterationUnit::per_iteration(move || {
        let start = Instant::now();
        black_box((0..black_box(count)).sum::<u64>());
        start.elapsed().as_secs_f64()
    }))
}
