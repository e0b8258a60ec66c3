use std::fmt;

use thiserror::Error;

use crate::core::data::iteration_grid::IterationGridError;
use crate::core::data::run_parameters::{Backend, Precision, RunParametersError};
use crate::core::data::viewport::ViewportError;
use crate::core::fractals::mandelbrot::errors::KernelError;

/// Rejected configuration, reported synchronously by the offending call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("cannot reconfigure the grid while a run is in progress")]
    RunInProgress,

    #[error("{backend} backend with {precision} precision is not supported on this machine")]
    BackendUnsupported { backend: Backend, precision: Precision },

    #[error(transparent)]
    Viewport(#[from] ViewportError),

    #[error(transparent)]
    Parameters(#[from] RunParametersError),

    #[error(transparent)]
    Grid(#[from] IterationGridError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkerFailureKind {
    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error("panicked: {0}")]
    Panicked(String),

    #[error("failed to start: {0}")]
    SpawnFailed(String),
}

/// A fault recorded at a worker boundary during a run.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("worker {worker}: {kind}")]
pub struct WorkerFailure {
    pub worker: usize,
    pub kind: WorkerFailureKind,
}

/// Every failure recorded during one run, ordered by the time each was
/// recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateFailure {
    failures: Vec<WorkerFailure>,
}

impl AggregateFailure {
    #[must_use]
    pub fn new(failures: Vec<WorkerFailure>) -> Self {
        Self { failures }
    }

    #[must_use]
    pub fn failures(&self) -> &[WorkerFailure] {
        &self.failures
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Indices of the workers that failed, sorted and deduplicated.
    #[must_use]
    pub fn workers(&self) -> Vec<usize> {
        let mut workers: Vec<usize> = self.failures.iter().map(|failure| failure.worker).collect();
        workers.sort_unstable();
        workers.dedup();
        workers
    }
}

impl fmt::Display for AggregateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} worker failure(s)", self.failures.len())?;

        for (i, failure) in self.failures.iter().enumerate() {
            let separator = if i == 0 { ": " } else { "; " };
            write!(f, "{separator}{failure}")?;
        }

        Ok(())
    }
}

impl std::error::Error for AggregateFailure {}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputeError {
    #[error("a run is already in progress")]
    AlreadyRunning,

    #[error("run failed with {0}")]
    WorkersFailed(AggregateFailure),
}

/// How a run that recorded no failures ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// Abort was requested; cells not yet reached keep their previous values.
    Aborted,
}
