use parking_lot::Mutex;
use tracing::warn;

use crate::core::actions::cancellation::{CancelToken, CancellationFlag};
use crate::core::actions::compute_grid::errors::{ComputeError, WorkerFailure};

#[derive(Debug, Default)]
struct ControlState {
    running: bool,
    failures: Vec<WorkerFailure>,
}

/// Run state, recorded failures and the abort flag, all changed under one
/// mutex.
#[derive(Debug, Default)]
pub(crate) struct RunControl {
    state: Mutex<ControlState>,
    cancel: CancellationFlag,
}

impl RunControl {
    /// `Idle -> Running`. Clears failures left by the previous run.
    pub(crate) fn begin_run(&self) -> Result<ActiveRun<'_>, ComputeError> {
        let mut state = self.state.lock();

        if state.running {
            return Err(ComputeError::AlreadyRunning);
        }

        state.running = true;
        state.failures.clear();

        Ok(ActiveRun {
            control: self,
            finished: false,
        })
    }

    pub(crate) fn record_failure(&self, failure: WorkerFailure) {
        warn!(worker = failure.worker, error = %failure.kind, "worker failed");

        self.state.lock().failures.push(failure);
    }

    #[must_use]
    pub(crate) fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub(crate) fn request_abort(&self) {
        let _state = self.state.lock();
        self.cancel.set();
    }

    pub(crate) fn reset_abort(&self) {
        let _state = self.state.lock();
        self.cancel.clear();
    }

    #[must_use]
    pub(crate) fn is_abort_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[must_use]
    pub(crate) fn cancel_flag(&self) -> &CancellationFlag {
        &self.cancel
    }

    fn end_run(&self) -> Vec<WorkerFailure> {
        let mut state = self.state.lock();
        state.running = false;

        std::mem::take(&mut state.failures)
    }
}

/// Marks a run in flight. Returns the control to `Idle` when finished or
/// dropped, including on unwind.
#[derive(Debug)]
pub(crate) struct ActiveRun<'a> {
    control: &'a RunControl,
    finished: bool,
}

impl ActiveRun<'_> {
    /// `Running -> Idle`, handing back every failure recorded during the run.
    pub(crate) fn finish(mut self) -> Vec<WorkerFailure> {
        self.finished = true;
        self.control.end_run()
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.control.end_run();
        }
    }
}
