//! Iteration Units
//!
//! The unit of work a worker executes for each `ITERS` command, tagged with
//! how its results are reported back.

use duelbench_ipc::Response;
use std::time::Duration;

/// How the registered unit reports measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnMode {
    /// Results are discarded; the controller times the batch itself
    None,
    /// Each call returns one measurement
    PerIteration,
    /// One call receives the iteration count and measures the whole batch
    PerBatch,
}

/// Result of a per-batch unit: a single value or one value per iteration
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutput {
    /// Reported as `VALUE <x>`
    Single(f64),
    /// Reported as `VALUES <array>`
    Many(Vec<f64>),
}

impl From<f64> for BatchOutput {
    fn from(value: f64) -> Self {
        BatchOutput::Single(value)
    }
}

impl From<Duration> for BatchOutput {
    fn from(value: Duration) -> Self {
        BatchOutput::Single(value.as_secs_f64())
    }
}

impl From<Vec<f64>> for BatchOutput {
    fn from(values: Vec<f64>) -> Self {
        BatchOutput::Many(values)
    }
}

impl From<Vec<Duration>> for BatchOutput {
    fn from(values: Vec<Duration>) -> Self {
        BatchOutput::Many(values.iter().map(Duration::as_secs_f64).collect())
    }
}

/// The single unit of work registered with a worker
pub enum IterationUnit {
    /// Run n times, discard results, reply `OK`
    Plain(Box<dyn FnMut()>),
    /// Run n times, reply `VALUES` with every returned value
    PerIteration(Box<dyn FnMut() -> f64>),
    /// Call once with n, reply `VALUES` or `VALUE` depending on the output
    PerBatch(Box<dyn FnMut(u64) -> BatchOutput>),
}

impl IterationUnit {
    /// Register a unit whose results are discarded
    pub fn plain<F>(f: F) -> Self
    where
        F: FnMut() + 'static,
    {
        IterationUnit::Plain(Box::new(f))
    }

    /// Register a unit that returns its own measurement on every call
    pub fn per_iteration<F>(f: F) -> Self
    where
        F: FnMut() -> f64 + 'static,
    {
        IterationUnit::PerIteration(Box::new(f))
    }

    /// Register a unit that runs a whole batch of `n` iterations per call
    pub fn per_batch<F, O>(mut f: F) -> Self
    where
        F: FnMut(u64) -> O + 'static,
        O: Into<BatchOutput>,
    {
        IterationUnit::PerBatch(Box::new(move |n| f(n).into()))
    }

    /// The return mode declared at registration
    pub fn return_mode(&self) -> ReturnMode {
        match self {
            IterationUnit::Plain(_) => ReturnMode::None,
            IterationUnit::PerIteration(_) => ReturnMode::PerIteration,
            IterationUnit::PerBatch(_) => ReturnMode::PerBatch,
        }
    }

    /// Execute `n` iterations and build the reply marker.
    pub fn execute(&mut self, n: u64) -> Response {
        match self {
            IterationUnit::Plain(f) => {
                for _ in 0..n {
                    std::hint::black_box(f());
                }
                Response::Ok
            }
            IterationUnit::PerIteration(f) => {
                Response::Values((0..n).map(|_| std::hint::black_box(f())).collect())
            }
            IterationUnit::PerBatch(f) => match f(n) {
                BatchOutput::Single(value) => Response::Value(value),
                BatchOutput::Many(values) => Response::Values(values),
            },
        }
    }
}

impl std::fmt::Debug for IterationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IterationUnit")
            .field("return_mode", &self.return_mode())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_plain_runs_n_times() {
        let calls = Rc::new(Cell::new(0u64));
        let counter = Rc::clone(&calls);
        let mut unit = IterationUnit::plain(move || counter.set(counter.get() + 1));

        for n in [1, 2, 7, 100] {
            calls.set(0);
            assert_eq!(unit.execute(n), Response::Ok);
            assert_eq!(calls.get(), n);
        }
    }

    #[test]
    fn test_per_iteration_collects_in_order() {
        let mut next = 0.0;
        let mut unit = IterationUnit::per_iteration(move || {
            next += 1.0;
            next
        });
        assert_eq!(unit.execute(3), Response::Values(vec![1.0, 2.0, 3.0]));
        assert_eq!(unit.return_mode(), ReturnMode::PerIteration);
    }

    #[test]
    fn test_per_batch_single_and_many() {
        let mut single = IterationUnit::per_batch(|n| n as f64 * 0.5);
        assert_eq!(single.execute(4), Response::Value(2.0));

        let mut many = IterationUnit::per_batch(|n| vec![0.25; n as usize]);
        assert_eq!(many.execute(2), Response::Values(vec![0.25, 0.25]));
        assert_eq!(many.return_mode(), ReturnMode::PerBatch);
    }

    #[test]
    fn test_per_batch_receives_count_once() {
        let seen = Rc::new(Cell::new(0u64));
        let record = Rc::clone(&seen);
        let mut unit = IterationUnit::per_batch(move |n| {
            record.set(record.get() + n);
            Duration::from_millis(1)
        });
        assert_eq!(unit.execute(5), Response::Value(0.001));
        assert_eq!(seen.get(), 5);
    }
}
