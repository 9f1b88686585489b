//! Jobs and the per-pass job registry.
//!
//! A [`Job`] is a named, zero-argument unit of build work: resize one photo,
//! render the index page, mirror the static assets. Its action runs at most
//! once and reports whether it (re)wrote any output. That `changed` flag is
//! what incremental builds key off; a job that found everything up to date
//! returns `Ok(false)`.
//!
//! Jobs are collected into a [`JobRegistry`] while a pass discovers its work.
//! Once every job is known the registry is [drained](JobRegistry::drain) and
//! handed to the [scheduler](crate::scheduler) in one piece, so a pass either
//! runs every job it registered or none of them.
//!
//! ## Naming
//!
//! Job names are only used for diagnostics, but they embed the path the job
//! operates on (`photo: content/2023/a.jpg`). Two jobs with the same name are
//! not rejected; they point at a discovery bug, and the walker tests check for
//! them.

use crate::imaging::BackendError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A failure inside a single job.
///
/// Every variant names the file or job it was working on, so an error is
/// actionable on its own without the rest of the outcome set.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("IO error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error resizing '{}': {source}", .path.display())]
    Imaging {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error("job '{job}' panicked: {message}")]
    Panicked { job: String, message: String },
}

impl JobError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// What a job action returns: `Ok(changed)` or the failure.
pub type JobResult = Result<bool, JobError>;

type Action = Box<dyn FnOnce() -> JobResult + Send>;

/// A named unit of work, executed at most once.
pub struct Job {
    name: String,
    action: Action,
}

impl Job {
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> JobResult + Send + 'static,
    {
        Self {
            name: name.into(),
            action: Box::new(action),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Consume the job and run its action on the current thread.
    pub fn run(self) -> JobResult {
        (self.action)()
    }

    pub(crate) fn into_parts(self) -> (String, Action) {
        (self.name, self.action)
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("name", &self.name).finish()
    }
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("job '{0}' registered after the registry was drained")]
    Sealed(String),
}

/// Collects the jobs of one build pass, in registration order.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Vec<Job>,
    sealed: bool,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job. Fails only once the registry has been drained.
    pub fn register<F>(&mut self, name: impl Into<String>, action: F) -> Result<(), RegistryError>
    where
        F: FnOnce() -> JobResult + Send + 'static,
    {
        let name = name.into();
        if self.sealed {
            return Err(RegistryError::Sealed(name));
        }
        self.jobs.push(Job::new(name, action));
        Ok(())
    }

    /// Take every registered job and seal the registry.
    pub fn drain(&mut self) -> Vec<Job> {
        self.sealed = true;
        std::mem::take(&mut self.jobs)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Names of the registered jobs, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.jobs.iter().map(Job::name).collect()
    }
}
