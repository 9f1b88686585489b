//! Bounded-concurrency job executor.
//!
//! [`run`] executes every job of a pass exactly once on a dedicated
//! [rayon](https://docs.rs/rayon) pool of `concurrency` threads. Each job is
//! its own unit of work in the pool (`with_max_len(1)`), so idle workers keep
//! pulling jobs until none are left, even when individual jobs block for a
//! long time on an external process.
//!
//! ## Failure policy
//!
//! Fail-soft, collect-all-errors. A failing job never cancels or skips another
//! one, and a job that panics is recorded as [`JobError::Panicked`] instead of
//! tearing down the pool. The scheduler passes job errors through untouched:
//! whatever context the job attached is what the caller sees.
//!
//! ## Outcomes
//!
//! The returned [`OutcomeSet`] keeps one [`JobOutcome`] per job, in
//! registration order, so logs stay deterministic regardless of which worker
//! finished first.

use crate::job::{Job, JobError};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("concurrency must be at least 1 (got {0})")]
    InvalidConcurrency(usize),
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Result of running a single job.
#[derive(Debug)]
pub struct JobOutcome {
    pub name: String,
    /// Whether the job (re)wrote any output. Always `false` for failed jobs.
    pub changed: bool,
    pub error: Option<JobError>,
    pub duration: Duration,
}

impl JobOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregated result of one pass: every job's outcome, in registration order.
#[derive(Debug, Default)]
pub struct OutcomeSet {
    pub outcomes: Vec<JobOutcome>,
    /// Wall-clock time for the whole run.
    pub duration: Duration,
}

impl OutcomeSet {
    /// Every error encountered, in registration order.
    pub fn errors(&self) -> impl Iterator<Item = &JobError> {
        self.outcomes.iter().filter_map(|o| o.error.as_ref())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(JobOutcome::is_ok)
    }

    pub fn any_changed(&self) -> bool {
        self.outcomes.iter().any(|o| o.changed)
    }

    pub fn changed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.changed).count()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn into_errors(self) -> Vec<JobError> {
        self.outcomes.into_iter().filter_map(|o| o.error).collect()
    }
}

/// Run every job once with at most `concurrency` jobs in flight.
///
/// An empty job list returns an empty [`OutcomeSet`] without starting any
/// worker. `concurrency == 0` is rejected before anything runs.
pub fn run(jobs: Vec<Job>, concurrency: usize) -> Result<OutcomeSet, ScheduleError> {
    if concurrency == 0 {
        return Err(ScheduleError::InvalidConcurrency(concurrency));
    }
    if jobs.is_empty() {
        debug!("No jobs to run");
        return Ok(OutcomeSet::default());
    }

    let started = Instant::now();
    let workers = concurrency.min(jobs.len());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("gal-worker-{i}"))
        .build()?;

    info!("Running {} jobs on {} workers", jobs.len(), workers);

    let outcomes: Vec<JobOutcome> = pool.install(|| {
        jobs.into_par_iter()
            .with_max_len(1)
            .map(execute)
            .collect()
    });

    let set = OutcomeSet {
        outcomes,
        duration: started.elapsed(),
    };
    debug!(
        "Finished {} jobs in {:.2?} ({} changed, {} failed)",
        set.len(),
        set.duration,
        set.changed_count(),
        set.error_count()
    );
    Ok(set)
}

fn execute(job: Job) -> JobOutcome {
    let (name, action) = job.into_parts();
    debug!("Job started: {}", name);
    let started = Instant::now();

    let result = panic::catch_unwind(AssertUnwindSafe(action)).unwrap_or_else(|payload| {
        Err(JobError::Panicked {
            job: name.clone(),
            message: panic_message(payload.as_ref()),
        })
    });
    let duration = started.elapsed();

    match result {
        Ok(changed) => {
            debug!("Job finished: {} ({:.2?}, changed: {})", name, duration, changed);
            JobOutcome {
                name,
                changed,
                error: None,
                duration,
            }
        }
        Err(e) => {
            debug!("Job failed: {}: {}", name, e);
            JobOutcome {
                name,
                changed: false,
                error: Some(e),
                duration,
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
