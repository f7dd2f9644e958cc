//! Harness strategy: the workload is an external program speaking the line
//! protocol on its stdin/stdout.

use super::{ControllerError, ProcessController, ProcessHandle, ProcessState};
use duelbench_ipc::{Command, LineReader, LineWriter, MAX_UNMARKED_OUTPUT, Response};
use std::os::unix::process::CommandExt;
use std::process::{Child, ChildStdin, ChildStdout, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Time a child gets to exit after SIGTERM before it is SIGKILLed
const TERM_GRACE: Duration = Duration::from_millis(50);

/// Send a signal to the child's whole process group, so `sh -c` wrappers
/// do not leave the real workload behind.
fn signal_group(pid: u32, signal: libc::c_int) -> Result<(), std::io::Error> {
    let ret = unsafe { libc::kill(-(pid as libc::pid_t), signal) };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn is_alive(child: &mut Child) -> bool {
    matches!(child.try_wait(), Ok(None))
}

/// Out-of-process controller. Both pipe ends belong to this controller
/// alone; they are never shared with the sibling group.
pub struct HarnessProcess {
    command_line: String,
    child: Option<Child>,
    reader: Option<LineReader<ChildStdout>>,
    writer: Option<LineWriter<ChildStdin>>,
    handle: ProcessHandle,
    debug: bool,
}

impl HarnessProcess {
    /// Describe a harness worker. Nothing is spawned until [`start`].
    ///
    /// [`start`]: ProcessController::start
    pub fn new(command_line: impl Into<String>, debug: bool) -> Self {
        let command_line = command_line.into();
        Self {
            handle: ProcessHandle::new(command_line.clone()),
            command_line,
            child: None,
            reader: None,
            writer: None,
            debug,
        }
    }

    /// Send `ITERS n` and block until a terminal marker, EOF or the output
    /// ceiling.
    fn exchange(&mut self, n: u64) -> Result<Vec<f64>, ControllerError> {
        let (Some(reader), Some(writer)) = (self.reader.as_mut(), self.writer.as_mut()) else {
            return Err(ControllerError::NotStarted);
        };
        let pid = self.handle.pid().unwrap_or_default();

        let command = Command::Iters(n);
        if self.debug {
            debug!(pid, %command, "Sending command");
        }
        let sent_at = Instant::now();
        writer.send(&command)?;

        let mut ignored_bytes = 0usize;
        loop {
            let chunk = reader.read_chunk()?;
            if self.debug {
                debug!(pid, bytes = chunk.bytes_read, lines = ?chunk.lines, "Worker output");
            }

            for line in &chunk.lines {
                match Response::parse(line)? {
                    Some(Response::Ok) => return Ok(vec![sent_at.elapsed().as_secs_f64()]),
                    Some(Response::Value(value)) => return Ok(vec![value]),
                    Some(Response::Values(values)) => return Ok(values),
                    Some(Response::NotOk) => {
                        return Err(ControllerError::ProcessFailure(format!(
                            "worker {} reported NOT OK",
                            pid
                        )));
                    }
                    None => ignored_bytes += line.len() + 1,
                }
            }

            let unmarked = ignored_bytes + reader.pending_len();
            if unmarked > MAX_UNMARKED_OUTPUT {
                return Err(ControllerError::Exhaustion { bytes: unmarked });
            }
        }
    }
}

impl ProcessController for HarnessProcess {
    fn start(&mut self) -> Result<(), ControllerError> {
        if self.child.is_some() || self.handle.state() != ProcessState::Spawned {
            return Ok(());
        }

        let mut child = std::process::Command::new("sh")
            .arg("-c")
            .arg(&self.command_line)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .process_group(0)
            .spawn()
            .map_err(ControllerError::Spawn)?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ControllerError::Spawn(std::io::Error::other(
                "child pipes were not captured",
            )));
        };

        self.handle.set_pid(child.id());
        if self.debug {
            debug!(pid = child.id(), command = %self.command_line, "Spawned worker");
        }
        self.writer = Some(LineWriter::new(stdin));
        self.reader = Some(LineReader::new(stdout));
        self.child = Some(child);
        Ok(())
    }

    fn run_iterations(&mut self, n: u64) -> Result<Vec<f64>, ControllerError> {
        self.handle.begin_batch(n)?;

        match self.exchange(n) {
            Ok(measurements) => {
                self.handle.succeed(&measurements);
                Ok(measurements)
            }
            Err(e) => {
                self.handle.fail();
                error!(
                    pid = self.handle.pid().unwrap_or_default(),
                    "Killing worker after failed iterations: {}", e
                );
                if let Err(kill_err) = self.kill() {
                    warn!("Failed to kill worker: {}", kill_err);
                }
                Err(e)
            }
        }
    }

    fn quit(&mut self) -> Result<(), ControllerError> {
        if let Some(writer) = self.writer.as_mut() {
            if self.debug {
                debug!(pid = self.handle.pid().unwrap_or_default(), "Sending QUIT");
            }
            writer.send(&Command::Quit)?;
        }
        self.handle.terminate();
        Ok(())
    }

    fn kill(&mut self) -> Result<(), ControllerError> {
        // Closing our pipe ends lets a well-behaved worker see EOF and exit.
        self.writer = None;
        self.reader = None;

        if let Some(mut child) = self.child.take() {
            let pid = child.id();
            if is_alive(&mut child) {
                let _ = signal_group(pid, libc::SIGTERM);
                let deadline = Instant::now() + TERM_GRACE;
                while is_alive(&mut child) && Instant::now() < deadline {
                    std::thread::sleep(Duration::from_millis(5));
                }
                if is_alive(&mut child) {
                    let _ = signal_group(pid, libc::SIGKILL);
                    let _ = child.kill();
                }
            }
            let reaped = child.wait();
            self.handle.terminate();
            reaped?;
        }

        self.handle.terminate();
        Ok(())
    }

    fn handle(&self) -> &ProcessHandle {
        &self.handle
    }
}

impl Drop for HarnessProcess {
    fn drop(&mut self) {
        if self.child.is_some() {
            let _ = self.kill();
        }
    }
}
