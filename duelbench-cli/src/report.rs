//! Human-readable summary of a finished run

use crate::engine::{BenchmarkReport, Group};

/// Format seconds with a unit that keeps 2-4 significant digits visible
pub fn format_seconds(seconds: f64) -> String {
    let abs = seconds.abs();
    if abs >= 1.0 {
        format!("{:.3} s", seconds)
    } else if abs >= 1e-3 {
        format!("{:.3} ms", seconds * 1e3)
    } else if abs >= 1e-6 {
        format!("{:.3} µs", seconds * 1e6)
    } else {
        format!("{:.1} ns", seconds * 1e9)
    }
}

/// Format a [`BenchmarkReport`] for the terminal
pub fn format_human_output(report: &BenchmarkReport) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("DuelBench Results\n");
    output.push_str(&"=".repeat(60));
    output.push_str("\n\n");

    for group in Group::BOTH {
        let summary = report.group(group);
        let stats = &summary.stats;
        output.push_str(&format!("{} ({})\n", group, summary.label));
        output.push_str(&format!(
            "    mean: {}  median: {}  std dev: {} ({:.1}%)  samples: {}\n",
            format_seconds(stats.mean),
            format_seconds(stats.median),
            format_seconds(stats.std_dev),
            stats.coefficient_of_variation(),
            stats.count
        ));
    }
    output.push('\n');

    output.push_str("Verdict\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "  Trials: {}{}\n",
        report.state.trial_index,
        if report.stopped_early {
            " (stopped early)"
        } else {
            ""
        }
    ));
    match report.final_p_value {
        Some(p) => output.push_str(&format!(
            "  p-value: {:.6} (threshold {})\n",
            p, report.pvalue_threshold
        )),
        None => output.push_str("  p-value: n/a (too few samples)\n"),
    }

    let faster = report.faster;
    let by = report.summary_method;
    if report.significant {
        match report.speed_ratio {
            Some(ratio) => output.push_str(&format!(
                "  {} is {:.3}x faster than {} (by {})\n",
                faster,
                ratio,
                faster.other(),
                by
            )),
            None => output.push_str(&format!("  {} is faster (by {})\n", faster, by)),
        }
    } else {
        output.push_str("  No significant difference\n");
        if let Some(ratio) = report.speed_ratio {
            output.push_str(&format!(
                "  {} appears {:.3}x faster (by {}), not significant\n",
                faster, ratio, by
            ));
        }
    }

    output
}
