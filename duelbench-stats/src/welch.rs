//! Welch's t-test
//!
//! Two-sample comparison of means without assuming equal variances, with
//! Welch–Satterthwaite degrees of freedom. The p-value is two-tailed: the
//! probability of a mean difference at least this large if both groups
//! share the same true mean.

use crate::MIN_SAMPLES_FOR_TEST;
use crate::summary::mean;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Result of Welch's t-test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WelchTTest {
    /// t statistic, positive when the first group's mean is larger
    pub t_statistic: f64,
    /// Welch–Satterthwaite degrees of freedom (0.0 when undefined)
    pub degrees_of_freedom: f64,
    /// Two-tailed p-value in [0, 1], never NaN
    pub p_value: f64,
}

impl WelchTTest {
    fn no_evidence() -> Self {
        Self {
            t_statistic: 0.0,
            degrees_of_freedom: 0.0,
            p_value: 1.0,
        }
    }

    /// Whether the difference is significant at `threshold`
    pub fn is_significant(&self, threshold: f64) -> bool {
        self.p_value < threshold
    }
}

/// Unbiased sample variance around a known mean
fn variance(samples: &[f64], mean: f64) -> f64 {
    samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (samples.len() - 1) as f64
}

/// Run Welch's two-sample t-test.
///
/// Degenerate inputs resolve to a defined result instead of NaN:
/// - fewer than two samples in either group: p = 1
/// - zero combined standard error (both groups constant): p = 1 when the
///   means are equal, p = 0 when they differ
pub fn welch_t_test(sample_a: &[f64], sample_b: &[f64]) -> WelchTTest {
    if sample_a.len() < MIN_SAMPLES_FOR_TEST || sample_b.len() < MIN_SAMPLES_FOR_TEST {
        return WelchTTest::no_evidence();
    }

    let n_a = sample_a.len() as f64;
    let n_b = sample_b.len() as f64;
    let mean_a = mean(sample_a);
    let mean_b = mean(sample_b);
    let se_a = variance(sample_a, mean_a) / n_a;
    let se_b = variance(sample_b, mean_b) / n_b;

    let standard_error = (se_a + se_b).sqrt();
    if !standard_error.is_finite() {
        return WelchTTest::no_evidence();
    }
    // Only exactly constant groups skip the t distribution; a tiny non-zero
    // standard error is still ordinary noise.
    if standard_error == 0.0 {
        let equal = mean_a == mean_b;
        return WelchTTest {
            t_statistic: if equal { 0.0 } else { (mean_a - mean_b).signum() * f64::INFINITY },
            degrees_of_freedom: 0.0,
            p_value: if equal { 1.0 } else { 0.0 },
        };
    }

    let t_statistic = (mean_a - mean_b) / standard_error;
    let degrees_of_freedom =
        (se_a + se_b).powi(2) / (se_a.powi(2) / (n_a - 1.0) + se_b.powi(2) / (n_b - 1.0));

    let p_value = StudentsT::new(0.0, 1.0, degrees_of_freedom)
        .map(|dist| 2.0 * dist.sf(t_statistic.abs()))
        .unwrap_or(1.0);

    WelchTTest {
        t_statistic,
        degrees_of_freedom,
        p_value: if p_value.is_nan() { 1.0 } else { p_value.clamp(0.0, 1.0) },
    }
}
