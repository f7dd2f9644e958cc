#![warn(missing_docs)]
//! DuelBench Statistical Engine
//!
//! Deliberately small: one hypothesis test and two summary statistics.
//! - Welch's two-sample t-test (unequal variances), two-tailed
//! - Mean and median summarizers

mod summary;
mod welch;

pub use summary::{
    GroupStatistics, SummaryMethod, UnknownSummaryMethod, mean, median, std_dev, summarize,
};
pub use welch::{WelchTTest, welch_t_test};

/// Minimum samples per group before Welch's test is informative
pub const MIN_SAMPLES_FOR_TEST: usize = 2;
