//! Workload Descriptors
//!
//! What a controller runs for one group, decided once at configuration time.

use std::fmt;

/// One side of an A/B comparison
pub enum Workload {
    /// A shell command line, run through `sh -c`
    ShellCommand(String),
    /// An in-process closure; only valid for the bare strategy
    Callable(Box<dyn FnMut()>),
}

impl Workload {
    /// Describe a shell command workload
    pub fn command(command_line: impl Into<String>) -> Self {
        Workload::ShellCommand(command_line.into())
    }

    /// Describe an in-process workload
    pub fn callable<F>(f: F) -> Self
    where
        F: FnMut() + 'static,
    {
        Workload::Callable(Box::new(f))
    }

    /// Whether this workload can only run inside the controller's process
    pub fn is_callable(&self) -> bool {
        matches!(self, Workload::Callable(_))
    }

    /// Short label for logs and reports
    pub fn label(&self) -> String {
        match self {
            Workload::ShellCommand(command) => command.clone(),
            Workload::Callable(_) => "<callable>".to_string(),
        }
    }
}

impl fmt::Debug for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Workload::ShellCommand(command) => f.debug_tuple("ShellCommand").field(command).finish(),
            Workload::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

impl From<&str> for Workload {
    fn from(command_line: &str) -> Self {
        Workload::command(command_line)
    }
}

impl From<String> for Workload {
    fn from(command_line: String) -> Self {
        Workload::ShellCommand(command_line)
    }
}
