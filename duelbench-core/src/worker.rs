//! Worker Process Entry Point
//!
//! Handles the worker side of the controller-worker architecture.
//!
//! A benchmarked program registers exactly one [`IterationUnit`], constructs a
//! single [`WorkerMain`] over its stdin/stdout and hands control to it. The
//! controller then drives it with `ITERS <n>` and `QUIT` lines.

use crate::unit::IterationUnit;
use duelbench_ipc::{Command, FrameError, LineReader, LineWriter, ProtocolError};
use std::io::{Read, Write};
use std::process::ExitCode;
use thiserror::Error;

/// Errors that end the worker loop
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Reading commands or writing replies failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The controller sent an invalid command
    #[error("{0}")]
    Protocol(#[from] ProtocolError),
}

impl From<FrameError> for WorkerError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Io(io) => WorkerError::Io(io),
            FrameError::EndOfStream => WorkerError::Io(std::io::ErrorKind::UnexpectedEof.into()),
        }
    }
}

/// Lifecycle of the worker loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Blocked on the next command
    AwaitingCommand,
    /// Running the iteration unit
    Executing,
    /// Loop has ended
    Terminated,
}

/// Why the worker loop ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Controller sent `QUIT`
    Quit,
    /// Controller closed our input without sending `QUIT`
    InputClosed,
}

/// Worker main loop
pub struct WorkerMain<R: Read, W: Write> {
    reader: LineReader<R>,
    writer: LineWriter<W>,
    unit: IterationUnit,
    state: WorkerState,
    batches_served: u64,
}

impl WorkerMain<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Create the process's worker over stdin/stdout.
    pub fn stdio(unit: IterationUnit) -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout(), unit)
    }

    /// Serve the controller until `QUIT` and map the result to an exit code.
    ///
    /// Intended as the whole body of a worker binary's `main`:
    ///
    /// ```no_run
    /// use duelbench_core::{IterationUnit, WorkerMain};
    ///
    /// fn main() -> std::process::ExitCode {
    ///     WorkerMain::serve(IterationUnit::plain(|| {
    ///         std::thread::sleep(std::time::Duration::from_millis(1));
    ///     }))
    /// }
    /// ```
    pub fn serve(unit: IterationUnit) -> ExitCode {
        match Self::stdio(unit).run() {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("duelbench worker: {}", e);
                ExitCode::FAILURE
            }
        }
    }
}

impl<R: Read, W: Write> WorkerMain<R, W> {
    /// Create a worker over an arbitrary command stream and reply sink
    pub fn new(reader: R, writer: W, unit: IterationUnit) -> Self {
        Self {
            reader: LineReader::new(reader),
            writer: LineWriter::new(writer),
            unit,
            state: WorkerState::AwaitingCommand,
            batches_served: 0,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Number of `ITERS` commands answered so far
    pub fn batches_served(&self) -> u64 {
        self.batches_served
    }

    /// Process commands until `QUIT`, end of input, or a protocol violation.
    ///
    /// Every complete line surfaced by a read is handled before blocking
    /// again, so commands arriving together are never lost.
    pub fn run(&mut self) -> Result<WorkerExit, WorkerError> {
        let result = self.command_loop();
        self.state = WorkerState::Terminated;
        result
    }

    fn command_loop(&mut self) -> Result<WorkerExit, WorkerError> {
        loop {
            let chunk = match self.reader.read_chunk() {
                Ok(chunk) => chunk,
                Err(FrameError::EndOfStream) => return Ok(WorkerExit::InputClosed),
                Err(e) => return Err(e.into()),
            };

            for line in &chunk.lines {
                match Command::parse(line)? {
                    Command::Quit => return Ok(WorkerExit::Quit),
                    Command::Iters(n) => {
                        self.state = WorkerState::Executing;
                        let response = self.unit.execute(n);
                        self.writer.send(&response)?;
                        self.batches_served += 1;
                        self.state = WorkerState::AwaitingCommand;
                    }
                }
            }
        }
    }

    /// Consume the worker and return the reply sink
    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }
}
