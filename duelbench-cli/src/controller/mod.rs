//! Process Controllers
//!
//! Two interchangeable ways of running one group's workload:
//!
//! - [`BareProcess`] runs it synchronously inside the controller and times
//!   the whole batch.
//! - [`HarnessProcess`] spawns it as a child process and drives it over the
//!   line protocol on the child's stdin/stdout.
//!
//! Both track a [`ProcessHandle`] whose state only moves forward:
//!
//! ```text
//! Spawned ─▶ Running ─▶ Succeeded ─▶ Running ─▶ ...
//!                  └──▶ Failed
//! (any) ─────────────────────────────────────▶ Terminated
//! ```

mod bare;
mod harness;

pub use bare::BareProcess;
pub use harness::HarnessProcess;

use crate::config::{ConfigError, Strategy};
use duelbench_core::Workload;
use duelbench_ipc::{FrameError, ProtocolError};
use thiserror::Error;

/// Failures of one controller. All of them are fatal to that workload.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The child process (or a bare shell command) could not be launched
    #[error("Failed to spawn workload: {0}")]
    Spawn(#[source] std::io::Error),

    /// Reading from or writing to the worker's pipes failed
    #[error("IPC error: {0}")]
    Io(#[from] std::io::Error),

    /// The worker sent a malformed status line
    #[error("Worker protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    /// `NOT OK` from a worker, or a non-zero exit from a bare command
    #[error("Workload failed: {0}")]
    ProcessFailure(String),

    /// Output ceiling crossed without a status marker
    #[error("Worker wrote {bytes} bytes without a status marker")]
    Exhaustion {
        /// Unmarked bytes seen when the ceiling was crossed
        bytes: usize,
    },

    /// End of stream while waiting for a reply
    #[error("Worker exited before replying")]
    WorkerExited,

    /// A batch was requested from a failed or torn-down instance
    #[error("Controller is {state:?} and cannot run iterations")]
    NotRunnable {
        /// State at the time of the request
        state: ProcessState,
    },

    /// A harness batch was requested before `start`
    #[error("Controller was not started")]
    NotStarted,
}

impl From<FrameError> for ControllerError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Io(io) => ControllerError::Io(io),
            FrameError::EndOfStream => ControllerError::WorkerExited,
        }
    }
}

/// Lifecycle of one workload instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Created (and for the harness, launched) but no batch run yet
    Spawned,
    /// A batch is in flight
    Running,
    /// Last batch produced measurements
    Succeeded,
    /// Last batch failed; the instance cannot run again
    Failed,
    /// Torn down
    Terminated,
}

/// Bookkeeping shared by both strategies
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    label: String,
    state: ProcessState,
    last_run: Vec<f64>,
    last_iters: u64,
    pid: Option<u32>,
}

impl ProcessHandle {
    /// Fresh handle in the `Spawned` state
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: ProcessState::Spawned,
            last_run: Vec::new(),
            last_iters: 0,
            pid: None,
        }
    }

    /// Command line, or `<callable>`
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current lifecycle state
    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Measurements from the last successful batch
    pub fn last_run(&self) -> &[f64] {
        &self.last_run
    }

    /// Iteration count of the last requested batch
    pub fn last_iters(&self) -> u64 {
        self.last_iters
    }

    /// OS process id, harness only
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub(crate) fn set_pid(&mut self, pid: u32) {
        self.pid = Some(pid);
    }

    /// Enter `Running` for a batch of `n`. Only a fresh or succeeded
    /// instance may run.
    pub(crate) fn begin_batch(&mut self, n: u64) -> Result<(), ControllerError> {
        match self.state {
            ProcessState::Spawned | ProcessState::Succeeded => {
                self.state = ProcessState::Running;
                self.last_iters = n;
                Ok(())
            }
            state => Err(ControllerError::NotRunnable { state }),
        }
    }

    pub(crate) fn succeed(&mut self, measurements: &[f64]) {
        debug_assert_eq!(self.state, ProcessState::Running);
        self.last_run = measurements.to_vec();
        self.state = ProcessState::Succeeded;
    }

    pub(crate) fn fail(&mut self) {
        if self.state != ProcessState::Terminated {
            self.state = ProcessState::Failed;
        }
    }

    pub(crate) fn terminate(&mut self) {
        self.state = ProcessState::Terminated;
    }
}

/// Common capability set of both strategies
pub trait ProcessController {
    /// Prepare the workload; the harness launches its child here
    fn start(&mut self) -> Result<(), ControllerError>;

    /// Run a batch of `n` iterations and return its measurements in seconds
    /// (or whatever unit the worker reports).
    fn run_iterations(&mut self, n: u64) -> Result<Vec<f64>, ControllerError>;

    /// Ask the workload to exit. Does not wait for it.
    fn quit(&mut self) -> Result<(), ControllerError>;

    /// Tear the workload down unconditionally. Idempotent.
    fn kill(&mut self) -> Result<(), ControllerError>;

    /// Lifecycle bookkeeping of this instance
    fn handle(&self) -> &ProcessHandle;
}

/// Build the controller for one workload under the configured strategy.
///
/// Callables only run bare: they never cross a process boundary.
pub fn build_controller(
    strategy: Strategy,
    workload: Workload,
    debug: bool,
) -> Result<Box<dyn ProcessController>, ConfigError> {
    match (strategy, workload) {
        (Strategy::Bare, workload) => Ok(Box::new(BareProcess::new(workload, debug))),
        (Strategy::Harness, Workload::ShellCommand(command)) => {
            Ok(Box::new(HarnessProcess::new(command, debug)))
        }
        (Strategy::Harness, Workload::Callable(_)) => Err(ConfigError::CallableInHarness),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_lifecycle() {
        let mut handle = ProcessHandle::new("true");
        assert_eq!(handle.state(), ProcessState::Spawned);

        handle.begin_batch(5).unwrap();
        assert_eq!(handle.state(), ProcessState::Running);
        assert_eq!(handle.last_iters(), 5);

        handle.succeed(&[0.5]);
        assert_eq!(handle.last_run(), &[0.5]);

        handle.begin_batch(2).unwrap();
        handle.fail();
        assert_eq!(handle.state(), ProcessState::Failed);
        assert!(matches!(
            handle.begin_batch(1),
            Err(ControllerError::NotRunnable {
                state: ProcessState::Failed
            })
        ));

        handle.terminate();
        assert!(matches!(
            handle.begin_batch(1),
            Err(ControllerError::NotRunnable {
                state: ProcessState::Terminated
            })
        ));
        handle.fail();
        assert_eq!(handle.state(), ProcessState::Terminated);
    }

    #[test]
    fn test_callable_rejected_under_harness() {
        let result = build_controller(Strategy::Harness, Workload::callable(|| {}), false);
        assert!(matches!(result, Err(ConfigError::CallableInHarness)));

        let bare = build_controller(Strategy::Bare, Workload::callable(|| {}), false).unwrap();
        assert_eq!(bare.handle().label(), "<callable>");
    }
}
