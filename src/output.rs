//! CLI output formatting for build passes.
//!
//! Output is **job-centric**: a pass is reported as the list of jobs it ran,
//! identified by their names (`photo: content/2023/a.jpg`, `page: index`),
//! with failures always shown and successes only in detailed mode.
//!
//! # Output Format
//!
//! ## Default
//!
//! ```text
//! Failed
//! 001 photo: content/2023/bad.jpg
//!     error resizing 'content/2023/bad.jpg': 'magick' exited with exit status: 1: ...
//!
//! Ran 5 jobs in 1.24s: 3 changed, 1 unchanged, 1 failed
//! ```
//!
//! ## Detailed (`--verbose`)
//!
//! ```text
//! Jobs
//! 001 static assets: unchanged (1ms)
//! 002 photo: content/2023/a.jpg: changed (830ms)
//! 003 photo: content/2023/bad.jpg: failed (12ms)
//! ...
//! ```
//!
//! # Architecture
//!
//! [`format_outcome`] returns `Vec<String>` for testability and
//! [`print_outcome`] writes it to stdout. Watch mode routes the same lines
//! through `tracing` with [`log_outcome`] instead. Format functions are pure:
//! no I/O, no side effects.

use crate::scheduler::{JobOutcome, OutcomeSet};
use std::time::Duration;
use tracing::{error, info};

// ============================================================================
// Helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Milliseconds below one second, seconds with two decimals above.
fn format_duration(d: Duration) -> String {
    if d < Duration::from_secs(1) {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}

fn status(outcome: &JobOutcome) -> &'static str {
    match (&outcome.error, outcome.changed) {
        (Some(_), _) => "failed",
        (None, true) => "changed",
        (None, false) => "unchanged",
    }
}

// ============================================================================
// Outcome sets
// ============================================================================

/// One-line summary of a pass.
///
/// ```text
/// Ran 5 jobs in 1.24s: 3 changed, 1 unchanged, 1 failed
/// ```
pub fn format_summary(set: &OutcomeSet) -> String {
    let failed = set.error_count();
    let changed = set.changed_count();
    let unchanged = set.len().saturating_sub(changed + failed);
    format!(
        "Ran {} jobs in {}: {} changed, {} unchanged, {} failed",
        set.len(),
        format_duration(set.duration),
        changed,
        unchanged,
        failed
    )
}

/// Failed jobs with their errors, in registration order.
pub fn format_failures(set: &OutcomeSet) -> Vec<String> {
    let mut lines = Vec::new();
    let failed = set.outcomes.iter().filter_map(|o| o.error.as_ref().map(|e| (o, e)));
    for (pos, (outcome, err)) in failed.enumerate() {
        if pos == 0 {
            lines.push("Failed".to_string());
        }
        lines.push(format!("{} {}", format_index(pos + 1), outcome.name));
        lines.push(format!("{}{}", indent(1), err));
    }
    lines
}

/// Every job with its status and duration.
pub fn format_jobs(set: &OutcomeSet) -> Vec<String> {
    if set.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["Jobs".to_string()];
    for (pos, outcome) in set.outcomes.iter().enumerate() {
        lines.push(format!(
            "{} {}: {} ({})",
            format_index(pos + 1),
            outcome.name,
            status(outcome),
            format_duration(outcome.duration)
        ));
    }
    lines
}

/// The full report for a pass: job list (when `detailed`), failures, summary.
pub fn format_outcome(set: &OutcomeSet, detailed: bool) -> Vec<String> {
    let mut lines = Vec::new();
    if detailed {
        lines.extend(format_jobs(set));
    }
    let failures = format_failures(set);
    if !failures.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.extend(failures);
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format_summary(set));
    lines
}

pub fn print_outcome(set: &OutcomeSet, detailed: bool) {
    for line in format_outcome(set, detailed) {
        println!("{}", line);
    }
}

/// Report a pass through `tracing`: one `error!` per failed job, then the
/// summary at INFO.
pub fn log_outcome(set: &OutcomeSet) {
    for outcome in &set.outcomes {
        if let Some(err) = &outcome.error {
            error!("{}: {}", outcome.name, err);
        }
    }
    info!("{}", format_summary(set));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobError;
    use std::io;
    use std::path::PathBuf;

    fn outcome(name: &str, changed: bool, error: Option<JobError>, ms: u64) -> JobOutcome {
        JobOutcome {
            name: name.to_string(),
            changed,
            error,
            duration: Duration::from_millis(ms),
        }
    }

    fn io_error(path: &str) -> JobError {
        JobError::io(PathBuf::from(path), io::Error::new(io::ErrorKind::NotFound, "gone"))
    }

    fn sample() -> OutcomeSet {
        OutcomeSet {
            outcomes: vec![
                outcome("static assets", false, None, 1),
                outcome("photo: src/a.jpg", true, None, 830),
                outcome("photo: src/bad.jpg", false, Some(io_error("src/bad.jpg")), 12),
                outcome("page: index", true, None, 3),
                outcome("robots.txt", false, None, 0),
            ],
            duration: Duration::from_millis(1240),
        }
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn format_duration_switches_units() {
        assert_eq!(format_duration(Duration::from_millis(0)), "0ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(1240)), "1.24s");
        assert_eq!(format_duration(Duration::from_secs(75)), "75.00s");
    }

    // =========================================================================
    // Outcome formatting
    // =========================================================================

    #[test]
    fn summary_counts_each_status() {
        assert_eq!(
            format_summary(&sample()),
            "Ran 5 jobs in 1.24s: 2 changed, 2 unchanged, 1 failed"
        );
    }

    #[test]
    fn summary_of_empty_set() {
        assert_eq!(
            format_summary(&OutcomeSet::default()),
            "Ran 0 jobs in 0ms: 0 changed, 0 unchanged, 0 failed"
        );
    }

    #[test]
    fn failures_name_job_and_error() {
        let lines = format_failures(&sample());
        assert_eq!(
            lines,
            vec![
                "Failed".to_string(),
                "001 photo: src/bad.jpg".to_string(),
                "    IO error on 'src/bad.jpg': gone".to_string(),
            ]
        );
    }

    #[test]
    fn no_failures_no_section() {
        let set = OutcomeSet {
            outcomes: vec![outcome("robots.txt", true, None, 1)],
            duration: Duration::from_millis(5),
        };
        assert!(format_failures(&set).is_empty());
        assert_eq!(
            format_outcome(&set, false),
            vec!["Ran 1 jobs in 5ms: 1 changed, 0 unchanged, 0 failed"]
        );
    }

    #[test]
    fn jobs_list_status_and_duration() {
        let lines = format_jobs(&sample());
        assert_eq!(lines[0], "Jobs");
        assert_eq!(lines[1], "001 static assets: unchanged (1ms)");
        assert_eq!(lines[2], "002 photo: src/a.jpg: changed (830ms)");
        assert_eq!(lines[3], "003 photo: src/bad.jpg: failed (12ms)");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn outcome_default_shows_failures_then_summary() {
        let lines = format_outcome(&sample(), false);
        assert_eq!(lines.first().map(String::as_str), Some("Failed"));
        assert_eq!(lines[lines.len() - 2], "");
        assert!(lines.last().unwrap().starts_with("Ran 5 jobs"));
        assert!(!lines.iter().any(|l| l == "Jobs"));
    }

    #[test]
    fn outcome_detailed_lists_every_job() {
        let lines = format_outcome(&sample(), true);
        assert_eq!(lines[0], "Jobs");
        let failed_at = lines.iter().position(|l| l == "Failed").unwrap();
        assert_eq!(lines[failed_at - 1], "");
        assert!(lines.last().unwrap().starts_with("Ran 5 jobs"));
    }
}
