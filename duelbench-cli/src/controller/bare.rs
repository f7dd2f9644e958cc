//! Bare strategy: the workload runs synchronously inside the controller.

use super::{ControllerError, ProcessController, ProcessHandle};
use duelbench_core::Workload;
use std::process::{Command, Stdio};
use std::time::Instant;
use tracing::{debug, error};

/// In-process controller. One measurement per batch: wall-clock seconds
/// around all `n` iterations.
pub struct BareProcess {
    workload: Workload,
    handle: ProcessHandle,
    debug: bool,
}

impl BareProcess {
    /// Wrap a workload. `debug` logs every batch.
    pub fn new(workload: Workload, debug: bool) -> Self {
        Self {
            handle: ProcessHandle::new(workload.label()),
            workload,
            debug,
        }
    }

    fn run_batch(&mut self, n: u64) -> Result<(), ControllerError> {
        match &mut self.workload {
            Workload::Callable(f) => {
                for _ in 0..n {
                    f();
                }
            }
            Workload::ShellCommand(command_line) => {
                for _ in 0..n {
                    let status = Command::new("sh")
                        .arg("-c")
                        .arg(command_line.as_str())
                        .stdin(Stdio::null())
                        .stdout(Stdio::null())
                        .stderr(Stdio::inherit())
                        .status()
                        .map_err(ControllerError::Spawn)?;

                    if !status.success() {
                        return Err(ControllerError::ProcessFailure(format!(
                            "`{}` exited with {}",
                            command_line, status
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

impl ProcessController for BareProcess {
    fn start(&mut self) -> Result<(), ControllerError> {
        Ok(())
    }

    fn run_iterations(&mut self, n: u64) -> Result<Vec<f64>, ControllerError> {
        self.handle.begin_batch(n)?;
        if self.debug {
            debug!(workload = %self.handle.label(), iterations = n, "Running bare batch");
        }

        let start = Instant::now();
        if let Err(e) = self.run_batch(n) {
            self.handle.fail();
            error!(workload = %self.handle.label(), "Bare workload failed: {}", e);
            return Err(e);
        }
        let measurements = [start.elapsed().as_secs_f64()];

        self.handle.succeed(&measurements);
        Ok(measurements.to_vec())
    }

    fn quit(&mut self) -> Result<(), ControllerError> {
        self.handle.terminate();
        Ok(())
    }

    fn kill(&mut self) -> Result<(), ControllerError> {
        self.handle.terminate();
        Ok(())
    }

    fn handle(&self) -> &ProcessHandle {
        &self.handle
    }
}
