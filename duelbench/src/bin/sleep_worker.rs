//! Harness worker that sleeps for a fixed time per iteration.
//!
//! Usage: `sleep_worker [MILLIS]` (default 1).

use duelbench::{IterationUnit, WorkerMain};
use std::process::ExitCode;
use std::time::Duration;

fn main() -> ExitCode {
    let millis = match std::env::args().nth(1).map(|arg| arg.parse::<u64>()) {
        None => 1,
        Some(Ok(millis)) => millis,
        Some(Err(e)) => {
            eprintln!("sleep_worker: invalid duration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let pause = Duration::from_millis(millis);
    WorkerMain::serve(IterationUnit::plain(move || std::thread::sleep(pause)))
}
