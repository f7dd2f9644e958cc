//! Harness worker that times whole batches itself (`VALUE`).
//!
//! Usage: `batch_worker [MICROS]`: each iteration sleeps MICROS
//! microseconds (default 500).

use duelbench::{IterationUnit, WorkerMain};
use std::process::ExitCode;
use std::time::{Duration, Instant};

fn main() -> ExitCode {
    let micros = match std::env::args().nth(1).map(|arg| arg.parse::<u64>()) {
        None => 500,
        Some(Ok(micros)) => micros,
        Some(Err(e)) => {
            eprintln!("batch_worker: invalid duration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let pause = Duration::from_micros(micros);
    WorkerMain::serve(IterationUnit::per_batch(move |n| {
        let start = Instant::now();
        for _ in 0..n {
            std::thread::sleep(pause);
        }
        start.elapsed()
    }))
}
