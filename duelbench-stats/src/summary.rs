//! Summary Statistics
//!
//! Central tendency of one group's samples. Unlike a full benchmarking
//! summary there is no outlier rejection: every trial counts.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Arithmetic mean; 0.0 for an empty slice
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Median: middle element for odd sizes, average of the two central
/// elements for even sizes; 0.0 for an empty slice
pub fn median(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Sample standard deviation (n-1 denominator); 0.0 below two samples
pub fn std_dev(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let mean = mean(samples);
    let variance =
        samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (samples.len() - 1) as f64;
    variance.sqrt()
}

/// Per-group summary reported at the end of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupStatistics {
    /// Number of samples
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Median
    pub median: f64,
    /// Sample standard deviation
    pub std_dev: f64,
}

/// Summarize one group's samples
pub fn summarize(samples: &[f64]) -> GroupStatistics {
    GroupStatistics {
        count: samples.len(),
        mean: mean(samples),
        median: median(samples),
        std_dev: std_dev(samples),
    }
}

impl GroupStatistics {
    /// Coefficient of variation in percent
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean == 0.0 {
            0.0
        } else {
            (self.std_dev / self.mean) * 100.0
        }
    }
}

/// Central tendency used to pick the faster group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryMethod {
    /// Arithmetic mean
    #[default]
    Mean,
    /// Median
    Median,
}

impl SummaryMethod {
    /// Pick this method's value out of a summary
    pub fn central(self, stats: &GroupStatistics) -> f64 {
        match self {
            SummaryMethod::Mean => stats.mean,
            SummaryMethod::Median => stats.median,
        }
    }
}

/// Summary method name that is neither `mean` nor `median`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown summary method: {0} (expected mean or median)")]
pub struct UnknownSummaryMethod(pub String);

impl FromStr for SummaryMethod {
    type Err = UnknownSummaryMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean" | "average" => Ok(SummaryMethod::Mean),
            "median" => Ok(SummaryMethod::Median),
            other => Err(UnknownSummaryMethod(other.to_string())),
        }
    }
}

impl fmt::Display for SummaryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryMethod::Mean => write!(f, "mean"),
            SummaryMethod::Median => write!(f, "median"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_summarize() {
        let stats = summarize(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(stats.count, 8);
        assert!((stats.mean - 5.0).abs() < 1e-12);
        assert!((stats.median - 4.5).abs() < 1e-12);
        assert!((stats.std_dev - 2.138_089_935).abs() < 1e-6);
    }

    #[test]
    fn test_zero_variance_cv() {
        let stats = summarize(&[100.0; 5]);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.coefficient_of_variation(), 0.0);
    }

    #[test]
    fn test_summary_method_parse() {
        assert_eq!("mean".parse::<SummaryMethod>(), Ok(SummaryMethod::Mean));
        assert_eq!("Median".parse::<SummaryMethod>(), Ok(SummaryMethod::Median));
        assert!("mode".parse::<SummaryMethod>().is_err());
    }

    #[test]
    fn test_summary_method_central() {
        let stats = summarize(&[1.0, 2.0, 9.0]);
        assert_eq!(SummaryMethod::Mean.central(&stats), 4.0);
        assert_eq!(SummaryMethod::Median.central(&stats), 2.0);
    }
}
