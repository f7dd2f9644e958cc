//! Sampling Engine
//!
//! Drives both groups through burn-in and a sequence of trials, testing
//! after every trial whether the groups differ and stopping as soon as they
//! do. A fixed trial count is either too short to see a real difference or
//! wastes time on an obvious one, so the loop tests sequentially between a
//! `min_trials` floor and a `max_trials` ceiling.
//!
//! ```text
//! start both ─▶ burn-in ─▶ ┌─ trial: run A, run B, append both ─┐
//!                          │  Welch's test once > 2 samples      │
//!                          └─ p < threshold && trials >= min? ──┘
//!                                       │ yes / max reached
//!                                       ▼
//!                          quit + kill both ─▶ BenchmarkReport
//! ```

use crate::config::{ConfigError, SamplingConfig};
use crate::controller::{ControllerError, ProcessController, build_controller};
use duelbench_core::Workload;
use duelbench_stats::{GroupStatistics, SummaryMethod, summarize, welch_t_test};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Reasons a run is aborted
#[derive(Debug, Error)]
pub enum EngineError {
    /// Rejected before anything was started
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// One group's controller failed mid-run
    #[error("{group} failed: {source}")]
    Controller {
        /// Group whose workload failed
        group: Group,
        /// What went wrong
        source: ControllerError,
    },
}

/// One of the two compared groups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    /// First command line
    A,
    /// Second command line
    B,
}

impl Group {
    /// Both groups, in execution order
    pub const BOTH: [Group; 2] = [Group::A, Group::B];

    /// Position in per-group arrays (0 or 1)
    pub fn index(self) -> usize {
        match self {
            Group::A => 0,
            Group::B => 1,
        }
    }

    /// The opposing group
    pub fn other(self) -> Group {
        match self {
            Group::A => Group::B,
            Group::B => Group::A,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group {}", self.index() + 1)
    }
}

/// Accumulated samples and test history of one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkState {
    /// One sample set per group, indexed by [`Group::index`]
    pub samples: [Vec<f64>; 2],
    /// p-value of every trial that was eligible for testing
    pub p_history: Vec<f64>,
    /// Completed trials
    pub trial_index: u32,
}

impl BenchmarkState {
    /// Append one trial's batches. Both groups always advance together.
    fn record_trial(&mut self, batch_a: Vec<f64>, batch_b: Vec<f64>) {
        self.samples[0].extend(batch_a);
        self.samples[1].extend(batch_b);
        self.trial_index += 1;
    }

    /// Welch's test needs more than two samples in at least one group
    pub fn eligible_for_test(&self) -> bool {
        self.samples.iter().any(|s| s.len() > 2)
    }

    /// Most recent p-value, if any trial was eligible
    pub fn latest_p_value(&self) -> Option<f64> {
        self.p_history.last().copied()
    }

    /// Sample set of one group
    pub fn samples_for(&self, group: Group) -> &[f64] {
        &self.samples[group.index()]
    }
}

/// How the run should be reported to whoever gates on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Normal completion
    Completed,
    /// `fail_on_divergence` was set and no significant difference was found
    NoSignificantDifference,
}

impl RunOutcome {
    /// Process exit status for this outcome
    pub fn exit_code(self) -> u8 {
        match self {
            RunOutcome::Completed => 0,
            RunOutcome::NoSignificantDifference => 2,
        }
    }
}

/// Per-group line of the report
#[derive(Debug, Clone)]
pub struct GroupSummary {
    /// Workload label
    pub label: String,
    /// Summary of every collected sample
    pub stats: GroupStatistics,
}

/// Final summary and verdict of one run
#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    /// Raw samples and p-value history
    pub state: BenchmarkState,
    /// Indexed by [`Group::index`]
    pub groups: [GroupSummary; 2],
    /// Central tendency used to pick `faster`
    pub summary_method: SummaryMethod,
    /// Threshold the run was tested against
    pub pvalue_threshold: f64,
    /// Group with the lower central tendency
    pub faster: Group,
    /// Slower central value over faster; `None` when the faster one is 0
    pub speed_ratio: Option<f64>,
    /// Last recorded p-value; `None` when no trial was eligible
    pub final_p_value: Option<f64>,
    /// `final_p_value` is below the threshold
    pub significant: bool,
    /// Stop rule fired before `max_trials` was exhausted
    pub stopped_early: bool,
    /// Verdict mapped onto the exit status
    pub outcome: RunOutcome,
}

impl BenchmarkReport {
    /// Summary of one group
    pub fn group(&self, group: Group) -> &GroupSummary {
        &self.groups[group.index()]
    }
}

/// Owns both controllers for the duration of one run
pub struct SamplingEngine {
    config: SamplingConfig,
    controllers: [Box<dyn ProcessController>; 2],
    state: BenchmarkState,
}

impl SamplingEngine {
    /// Validate the configuration and bind exactly two workloads.
    ///
    /// Nothing is started until [`run`](Self::run).
    pub fn new(config: SamplingConfig, workloads: Vec<Workload>) -> Result<Self, EngineError> {
        config.validate()?;
        let [a, b]: [Workload; 2] = workloads
            .try_into()
            .map_err(|w: Vec<Workload>| ConfigError::WorkloadCount(w.len()))?;

        let controllers = [
            build_controller(config.strategy, a, config.debug)?,
            build_controller(config.strategy, b, config.debug)?,
        ];
        Self::with_controllers(config, controllers)
    }

    /// Use pre-built controllers instead of building them from the strategy
    pub fn with_controllers(
        config: SamplingConfig,
        controllers: [Box<dyn ProcessController>; 2],
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            controllers,
            state: BenchmarkState::default(),
        })
    }

    /// Validated configuration of this run
    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// Run burn-in and the trial loop, then tear both workloads down.
    ///
    /// Teardown happens on every path, including errors.
    pub fn run(mut self) -> Result<BenchmarkReport, EngineError> {
        let sampled = self.sample();
        self.teardown();
        let stop_rule_fired = sampled?;
        Ok(self.into_report(stop_rule_fired))
    }

    fn controller(&mut self, group: Group) -> &mut dyn ProcessController {
        self.controllers[group.index()].as_mut()
    }

    fn run_group(&mut self, group: Group, n: u64) -> Result<Vec<f64>, EngineError> {
        self.controller(group)
            .run_iterations(n)
            .map_err(|source| EngineError::Controller { group, source })
    }

    /// Returns whether the stop rule fired
    fn sample(&mut self) -> Result<bool, EngineError> {
        for group in Group::BOTH {
            self.controller(group)
                .start()
                .map_err(|source| EngineError::Controller { group, source })?;
        }

        if self.config.burn_in_count > 0 {
            info!(
                "Beginning {} iterations of burn-in for each workload",
                self.config.burn_in_count
            );
            for group in Group::BOTH {
                self.run_group(group, self.config.burn_in_count)?;
            }
        }

        info!("Beginning sampling");
        for _ in 0..self.config.max_trials {
            let batch_a = self.run_group(Group::A, self.config.iters_per_trial)?;
            let batch_b = self.run_group(Group::B, self.config.iters_per_trial)?;
            self.state.record_trial(batch_a, batch_b);

            if self.state.eligible_for_test() {
                let test = welch_t_test(&self.state.samples[0], &self.state.samples[1]);
                self.state.p_history.push(test.p_value);
                info!(
                    trial = self.state.trial_index,
                    p_value = test.p_value,
                    t = test.t_statistic,
                    "Welch's t-test"
                );
            } else {
                debug!(trial = self.state.trial_index, "Too few samples to test");
            }

            if self.should_stop() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn should_stop(&self) -> bool {
        self.state
            .latest_p_value()
            .is_some_and(|p| p < self.config.pvalue_threshold)
            && self.state.trial_index >= self.config.min_trials
    }

    fn teardown(&mut self) {
        for group in Group::BOTH {
            let controller = self.controller(group);
            if let Err(e) = controller.quit() {
                debug!(%group, "QUIT not delivered: {}", e);
            }
            if let Err(e) = controller.kill() {
                warn!(%group, "Failed to kill workload: {}", e);
            }
        }
    }

    fn into_report(self, stop_rule_fired: bool) -> BenchmarkReport {
        let method = self.config.summary_method;
        let groups = Group::BOTH.map(|group| GroupSummary {
            label: self.controllers[group.index()].handle().label().to_string(),
            stats: summarize(self.state.samples_for(group)),
        });

        let central = groups.each_ref().map(|g| method.central(&g.stats));
        let faster = if central[0] <= central[1] {
            Group::A
        } else {
            Group::B
        };
        let fast = central[faster.index()];
        let slow = central[faster.other().index()];
        let speed_ratio = (fast > 0.0).then(|| slow / fast);

        let final_p_value = self.state.latest_p_value();
        let significant = final_p_value.is_some_and(|p| p < self.config.pvalue_threshold);
        let outcome = if self.config.fail_on_divergence && !significant {
            RunOutcome::NoSignificantDifference
        } else {
            RunOutcome::Completed
        };

        BenchmarkReport {
            stopped_early: stop_rule_fired && self.state.trial_index < self.config.max_trials,
            state: self.state,
            groups,
            summary_method: method,
            pvalue_threshold: self.config.pvalue_threshold,
            faster,
            speed_ratio,
            final_p_value,
            significant,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Strategy;
    use crate::controller::{ProcessHandle, ProcessState};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Event log shared between scripted controllers
    type Log = Rc<RefCell<Vec<String>>>;

    /// Controller replaying a fixed list of batches
    struct Scripted {
        name: &'static str,
        batches: VecDeque<Result<Vec<f64>, ()>>,
        handle: ProcessHandle,
        log: Log,
    }

    impl Scripted {
        fn boxed(
            name: &'static str,
            batches: Vec<Result<Vec<f64>, ()>>,
            log: &Log,
        ) -> Box<dyn ProcessController> {
            Box::new(Self {
                name,
                batches: batches.into(),
                handle: ProcessHandle::new(name),
                log: Rc::clone(log),
            })
        }
    }

    impl ProcessController for Scripted {
        fn start(&mut self) -> Result<(), ControllerError> {
            self.log.borrow_mut().push(format!("{} start", self.name));
            Ok(())
        }

        fn run_iterations(&mut self, n: u64) -> Result<Vec<f64>, ControllerError> {
            self.handle.begin_batch(n)?;
            self.log.borrow_mut().push(format!("{} iters {}", self.name, n));
            match self.batches.pop_front() {
                Some(Ok(batch)) => {
                    self.handle.succeed(&batch);
                    Ok(batch)
                }
                _ => {
                    self.handle.fail();
                    Err(ControllerError::ProcessFailure("scripted".to_string()))
                }
            }
        }

        fn quit(&mut self) -> Result<(), ControllerError> {
            self.log.borrow_mut().push(format!("{} quit", self.name));
            Ok(())
        }

        fn kill(&mut self) -> Result<(), ControllerError> {
            self.log.borrow_mut().push(format!("{} kill", self.name));
            self.handle.terminate();
            Ok(())
        }

        fn handle(&self) -> &ProcessHandle {
            &self.handle
        }
    }

    fn config(min_trials: u32, max_trials: u32, pvalue_threshold: f64) -> SamplingConfig {
        SamplingConfig {
            pvalue_threshold,
            burn_in_count: 0,
            min_trials,
            max_trials,
            iters_per_trial: 1,
            strategy: Strategy::Bare,
            ..Default::default()
        }
    }

    fn constant(value: f64, trials: usize) -> Vec<Result<Vec<f64>, ()>> {
        (0..trials).map(|i| Ok(vec![value + i as f64 * 1e-4])).collect()
    }

    #[test]
    fn test_stops_once_significant_after_min_trials() {
        let log = Log::default();
        let engine = SamplingEngine::with_controllers(
            config(4, 10, 0.01),
            [
                Scripted::boxed("a", constant(1.0, 10), &log),
                Scripted::boxed("b", constant(2.0, 10), &log),
            ],
        )
        .unwrap();

        let report = engine.run().unwrap();
        // Significant from trial 3 on, but the floor holds until trial 4
        assert_eq!(report.state.trial_index, 4);
        assert_eq!(report.state.p_history.len(), 2);
        assert!(report.stopped_early);
        assert!(report.significant);
        assert_eq!(report.faster, Group::A);
        assert!((report.speed_ratio.unwrap() - 2.0).abs() < 0.01);
        assert_eq!(report.outcome, RunOutcome::Completed);
    }

    #[test]
    fn test_runs_to_max_without_difference() {
        let log = Log::default();
        let same: Vec<_> = [1.0, 1.2, 0.9, 1.1, 1.0, 0.8]
            .iter()
            .map(|&x| Ok(vec![x]))
            .collect();
        let mut engine_config = config(1, 6, 0.05);
        engine_config.fail_on_divergence = true;
        let engine = SamplingEngine::with_controllers(
            engine_config,
            [
                Scripted::boxed("a", same.clone(), &log),
                Scripted::boxed("b", same, &log),
            ],
        )
        .unwrap();

        let report = engine.run().unwrap();
        assert_eq!(report.state.trial_index, 6);
        assert_eq!(report.state.p_history.len(), 4);
        assert!(!report.stopped_early);
        assert!(!report.significant);
        assert_eq!(report.outcome, RunOutcome::NoSignificantDifference);
        assert_eq!(report.outcome.exit_code(), 2);
    }

    #[test]
    fn test_burn_in_then_trials_then_teardown() {
        let log = Log::default();
        let mut engine_config = config(1, 2, 0.05);
        engine_config.burn_in_count = 5;
        engine_config.iters_per_trial = 3;
        let engine = SamplingEngine::with_controllers(
            engine_config,
            [
                Scripted::boxed("a", constant(1.0, 3), &log),
                Scripted::boxed("b", constant(1.0, 3), &log),
            ],
        )
        .unwrap();

        let report = engine.run().unwrap();
        assert_eq!(report.state.trial_index, 2);
        // Burn-in results are discarded
        assert_eq!(report.state.samples[0].len(), 2);
        assert!(report.state.p_history.is_empty());
        assert_eq!(report.final_p_value, None);
        assert_eq!(
            *log.borrow(),
            vec![
                "a start", "b start", "a iters 5", "b iters 5", "a iters 3", "b iters 3",
                "a iters 3", "b iters 3", "a quit", "a kill", "b quit", "b kill",
            ]
        );
    }

    #[test]
    fn test_failure_aborts_and_still_tears_down() {
        let log = Log::default();
        let engine = SamplingEngine::with_controllers(
            config(1, 10, 0.05),
            [
                Scripted::boxed("a", constant(1.0, 10), &log),
                Scripted::boxed("b", vec![Ok(vec![1.0]), Err(())], &log),
            ],
        )
        .unwrap();

        let err = engine.run().unwrap_err();
        assert!(matches!(
            err,
            EngineError::Controller {
                group: Group::B,
                ..
            }
        ));
        let log = log.borrow();
        assert!(log.contains(&"a kill".to_string()));
        assert!(log.contains(&"b kill".to_string()));
    }

    #[test]
    fn test_samples_advance_together() {
        let log = Log::default();
        let per_iteration: Vec<_> = (0..5).map(|_| Ok(vec![0.5, 0.6, 0.7])).collect();
        let engine = SamplingEngine::with_controllers(
            config(5, 5, 0.05),
            [
                Scripted::boxed("a", per_iteration, &log),
                Scripted::boxed("b", constant(0.6, 5), &log),
            ],
        )
        .unwrap();

        let report = engine.run().unwrap();
        assert_eq!(report.state.trial_index, 5);
        assert_eq!(report.state.samples[0].len(), 15);
        assert_eq!(report.state.samples[1].len(), 5);
        // Group A already holds 3 samples after trial 1
        assert_eq!(report.state.p_history.len(), 5);
    }

    #[test]
    fn test_median_picks_faster_group() {
        let log = Log::default();
        let a: Vec<_> = [1.0, 1.0, 100.0].iter().map(|&x| Ok(vec![x])).collect();
        let b: Vec<_> = [5.0, 5.0, 5.0].iter().map(|&x| Ok(vec![x])).collect();
        let mut engine_config = config(3, 3, 0.05);
        engine_config.summary_method = SummaryMethod::Median;
        let engine = SamplingEngine::with_controllers(
            engine_config,
            [
                Scripted::boxed("a", a, &log),
                Scripted::boxed("b", b, &log),
            ],
        )
        .unwrap();

        let report = engine.run().unwrap();
        assert_eq!(report.faster, Group::A);
        assert_eq!(report.speed_ratio, Some(5.0));
        assert_eq!(report.group(Group::B).stats.mean, 5.0);
    }

    #[test]
    fn test_rejects_wrong_workload_count() {
        let result = SamplingEngine::new(
            SamplingConfig::default(),
            vec![Workload::command("true")],
        );
        assert!(matches!(
            result,
            Err(EngineError::Config(ConfigError::WorkloadCount(1)))
        ));
    }

    #[test]
    fn test_rejects_invalid_config_before_start() {
        let log = Log::default();
        let result = SamplingEngine::with_controllers(
            config(9, 3, 0.05),
            [
                Scripted::boxed("a", vec![], &log),
                Scripted::boxed("b", vec![], &log),
            ],
        );
        assert!(matches!(
            result,
            Err(EngineError::Config(ConfigError::InvalidProperty { .. }))
        ));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_teardown_terminates_both_handles() {
        let log = Log::default();
        let mut engine = SamplingEngine::with_controllers(
            config(1, 1, 0.05),
            [
                Scripted::boxed("a", constant(1.0, 1), &log),
                Scripted::boxed("b", constant(1.0, 1), &log),
            ],
        )
        .unwrap();
        assert!(!engine.sample().unwrap());
        engine.teardown();
        for group in Group::BOTH {
            assert_eq!(
                engine.controllers[group.index()].handle().state(),
                ProcessState::Terminated
            );
        }
    }
}
