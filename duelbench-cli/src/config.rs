//! Configuration loading from duel.toml
//!
//! Sampling parameters can be specified in a `duel.toml` file in the project
//! root. The file is discovered by walking up from the current directory;
//! command-line flags override anything it sets.

use duelbench_stats::{SummaryMethod, UnknownSummaryMethod};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Name of the configuration file looked up by [`DuelConfig::discover`]
pub const CONFIG_FILE_NAME: &str = "duel.toml";

/// Misconfiguration, detected before any workload starts
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Anything other than two workloads was supplied
    #[error("Exactly two workloads are required, got {0}")]
    WorkloadCount(usize),

    /// A sampling parameter is out of range
    #[error("Invalid value for {name}: {reason}")]
    InvalidProperty {
        /// Configuration key
        name: &'static str,
        /// What is wrong with the value
        reason: String,
    },

    /// `summary` is neither `mean` nor `median`
    #[error(transparent)]
    UnknownSummaryMethod(#[from] UnknownSummaryMethod),

    /// `strategy` is neither `bare` nor `harness`
    #[error("Unknown strategy: {0} (expected bare or harness)")]
    UnknownStrategy(String),

    /// In-process callables cannot be run as a harness child
    #[error("Callable workloads can only run under the bare strategy")]
    CallableInHarness,

    /// The configuration file could not be read or parsed
    #[error("Failed to load {}: {reason}", .path.display())]
    Load {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O or TOML error
        reason: String,
    },
}

/// How workloads are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Synchronously inside the controller
    Bare,
    /// As a child process speaking the line protocol
    #[default]
    Harness,
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bare" => Ok(Strategy::Bare),
            "harness" => Ok(Strategy::Harness),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Bare => write!(f, "bare"),
            Strategy::Harness => write!(f, "harness"),
        }
    }
}

/// Validated parameters of one sampling run. Fixed before any workload
/// is started.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    /// Stop once Welch's p-value falls below this
    pub pvalue_threshold: f64,
    /// Discarded warm-up iterations per group (0 skips burn-in)
    pub burn_in_count: u64,
    /// Never stop before this many trials
    pub min_trials: u32,
    /// Never run more than this many trials
    pub max_trials: u32,
    /// Iterations per group per trial
    pub iters_per_trial: u64,
    /// How workloads are executed
    pub strategy: Strategy,
    /// Central tendency used to name the faster group
    pub summary_method: SummaryMethod,
    /// Report [`crate::RunOutcome::NoSignificantDifference`] when no
    /// significant difference is found
    pub fail_on_divergence: bool,
    /// Log every protocol exchange
    pub debug: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            pvalue_threshold: 0.05,
            burn_in_count: 10,
            min_trials: 1,
            max_trials: 20,
            iters_per_trial: 10,
            strategy: Strategy::default(),
            summary_method: SummaryMethod::default(),
            fail_on_divergence: false,
            debug: false,
        }
    }
}

impl SamplingConfig {
    /// Validate configuration values, returning the first error found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = self.pvalue_threshold;
        if !(p > 0.0 && p <= 1.0) {
            return Err(ConfigError::InvalidProperty {
                name: "pvalue",
                reason: format!("{} is not in (0, 1]", p),
            });
        }
        if self.max_trials == 0 {
            return Err(ConfigError::InvalidProperty {
                name: "max_trials",
                reason: "must be > 0".to_string(),
            });
        }
        if self.min_trials > self.max_trials {
            return Err(ConfigError::InvalidProperty {
                name: "min_trials",
                reason: format!(
                    "min_trials ({}) must be <= max_trials ({})",
                    self.min_trials, self.max_trials
                ),
            });
        }
        if self.iters_per_trial == 0 {
            return Err(ConfigError::InvalidProperty {
                name: "iters_per_trial",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

/// DuelBench configuration file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DuelConfig {
    /// Sampling configuration
    #[serde(default)]
    pub sampling: SamplingSection,
}

/// `[sampling]` table of `duel.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingSection {
    /// Significance threshold
    #[serde(default = "default_pvalue")]
    pub pvalue: f64,
    /// Burn-in iterations (alias: warmup)
    #[serde(default = "default_burnin", alias = "warmup")]
    pub burnin: u64,
    /// Trial floor
    #[serde(default = "default_min_trials")]
    pub min_trials: u32,
    /// Trial ceiling
    #[serde(default = "default_max_trials")]
    pub max_trials: u32,
    /// Iterations per workload per trial
    #[serde(default = "default_iters_per_trial")]
    pub iters_per_trial: u64,
    /// "bare" or "harness"
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// "mean" or "median"
    #[serde(default = "default_summary")]
    pub summary: String,
    /// Exit with status 2 when no significant difference is found
    #[serde(default)]
    pub fail_on_divergence: bool,
    /// Log every protocol exchange
    #[serde(default)]
    pub debug: bool,
}

impl Default for SamplingSection {
    fn default() -> Self {
        Self {
            pvalue: default_pvalue(),
            burnin: default_burnin(),
            min_trials: default_min_trials(),
            max_trials: default_max_trials(),
            iters_per_trial: default_iters_per_trial(),
            strategy: default_strategy(),
            summary: default_summary(),
            fail_on_divergence: false,
            debug: false,
        }
    }
}

fn default_pvalue() -> f64 {
    0.05
}
fn default_burnin() -> u64 {
    10
}
fn default_min_trials() -> u32 {
    1
}
fn default_max_trials() -> u32 {
    20
}
fn default_iters_per_trial() -> u64 {
    10
}
fn default_strategy() -> String {
    "harness".to_string()
}
fn default_summary() -> String {
    "mean".to_string()
}

impl DuelConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let load_error = |reason: String| ConfigError::Load {
            path: path.to_path_buf(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        toml::from_str(&content).map_err(|e| load_error(e.to_string()))
    }

    /// Discover `duel.toml` by walking up from the current directory.
    ///
    /// A file that exists but fails to parse is an error, not a silent
    /// fallback to defaults.
    pub fn discover() -> Result<Option<Self>, ConfigError> {
        let Ok(start) = std::env::current_dir() else {
            return Ok(None);
        };
        Self::discover_from(&start)
    }

    /// Discover `duel.toml` starting at `dir` and walking up
    pub fn discover_from(dir: &Path) -> Result<Option<Self>, ConfigError> {
        let mut dir = dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.is_file() {
                return Self::load(&config_path).map(Some);
            }
            if !dir.pop() {
                return Ok(None);
            }
        }
    }

    /// Turn the file's values into a [`SamplingConfig`].
    ///
    /// Names are checked here; ranges are not, since command-line flags may
    /// still be layered on top. Call [`SamplingConfig::validate`] on the
    /// final result.
    pub fn to_sampling_config(&self) -> Result<SamplingConfig, ConfigError> {
        let section = &self.sampling;
        Ok(SamplingConfig {
            pvalue_threshold: section.pvalue,
            burn_in_count: section.burnin,
            min_trials: section.min_trials,
            max_trials: section.max_trials,
            iters_per_trial: section.iters_per_trial,
            strategy: section.strategy.parse()?,
            summary_method: section.summary.parse()?,
            fail_on_divergence: section.fail_on_divergence,
            debug: section.debug,
        })
    }
}
