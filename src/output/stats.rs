//! Run statistics
//!
//! Aggregates job reports into a summary printed at the end of a run.

use crate::crawler::JobReport;
use crate::state::JobOutcome;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Aggregate view of a finished run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Jobs that reached a terminal state
    pub jobs: usize,

    /// Jobs that reached the control target
    pub succeeded: usize,

    /// Abandoned jobs per reason
    pub abandoned: BTreeMap<&'static str, usize>,

    /// Jobs that errored out or whose worker stopped
    pub worker_failures: usize,

    /// Crawl tool runs started
    pub invocations: u64,

    /// Successful folders found already on disk
    pub resumed_folders: u64,

    /// Lines appended to the error ledger
    pub ledger_lines: u64,

    /// Dataset rows dropped by the site filter
    pub dropped_rows: usize,
}

impl RunSummary {
    /// Builds a summary from the reports of a run
    pub fn from_reports(
        started_at: DateTime<Utc>,
        reports: &[JobReport],
        worker_failures: usize,
        ledger_lines: u64,
        dropped_rows: usize,
    ) -> Self {
        let mut succeeded = 0;
        let mut abandoned = BTreeMap::new();
        let mut invocations = 0u64;
        let mut resumed_folders = 0u64;

        for report in reports {
            match &report.outcome {
                JobOutcome::Success { .. } => succeeded += 1,
                JobOutcome::Abandoned(reason) => {
                    *abandoned.entry(reason.as_str()).or_insert(0) += 1;
                }
            }
            invocations += u64::from(report.invocations());
            resumed_folders += report
                .stages
                .iter()
                .map(|s| u64::from(s.resumed))
                .sum::<u64>();
        }

        Self {
            started_at,
            finished_at: Utc::now(),
            jobs: reports.len(),
            succeeded,
            abandoned,
            worker_failures,
            invocations,
            resumed_folders,
            ledger_lines,
            dropped_rows,
        }
    }

    pub fn abandoned_total(&self) -> usize {
        self.abandoned.values().sum()
    }

    /// Percentage of finished jobs that reached the control target
    pub fn success_rate(&self) -> f64 {
        if self.jobs == 0 {
            0.0
        } else {
            (self.succeeded as f64 / self.jobs as f64) * 100.0
        }
    }
}

/// Prints a run summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("=== Sweep Summary ===\n");

    println!("Overview:");
    println!("  Started: {}", summary.started_at.to_rfc3339());
    println!("  Finished: {}", summary.finished_at.to_rfc3339());
    println!(
        "  Duration: {}s",
        (summary.finished_at - summary.started_at).num_seconds()
    );
    println!("  Sites finished: {}", summary.jobs);
    println!("  Crawler invocations: {}", summary.invocations);
    println!("  Folders reused from earlier runs: {}", summary.resumed_folders);
    println!();

    if !summary.abandoned.is_empty() {
        println!("Abandoned Sites ({}):", summary.abandoned_total());
        let mut reasons: Vec<_> = summary.abandoned.iter().collect();
        reasons.sort_by(|a, b| b.1.cmp(a.1));
        for (reason, count) in reasons {
            println!("  {}: {}", reason, count);
        }
        println!();
    }

    if summary.worker_failures > 0 {
        println!("Worker failures: {}", summary.worker_failures);
    }
    if summary.ledger_lines > 0 {
        println!("Error ledger lines written: {}", summary.ledger_lines);
    }
    if summary.dropped_rows > 0 {
        println!("Dataset rows dropped by site filter: {}", summary.dropped_rows);
    }

    println!(
        "Success Rate: {:.1}% ({} / {} sites reached the control target)",
        summary.success_rate(),
        summary.succeeded,
        summary.jobs
    );
}
