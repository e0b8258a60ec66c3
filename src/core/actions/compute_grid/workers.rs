use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use tracing::debug;

use crate::core::actions::compute_grid::errors::{WorkerFailure, WorkerFailureKind};
use crate::core::actions::compute_grid::ports::kernel::CpuKernel;
use crate::core::actions::compute_grid::run_control::RunControl;
use crate::core::data::iteration_grid::IterationGrid;
use crate::core::fractals::mandelbrot::errors::KernelError;
use crate::core::util::pixel_to_complex_coords::ViewportMapping;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Runs `work` on the current thread, recording a returned error or a panic
/// against `worker` instead of propagating it.
pub(crate) fn run_isolated<F>(worker: usize, control: &RunControl, work: F)
where
    F: FnOnce() -> Result<(), KernelError>,
{
    let kind = match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(Ok(())) => return,
        Ok(Err(err)) => WorkerFailureKind::Kernel(err),
        Err(payload) => WorkerFailureKind::Panicked(panic_message(payload.as_ref())),
    };

    control.record_failure(WorkerFailure { worker, kind });
}

/// Starts one scoped thread per non-empty row set, worker `i` owning rows
/// `i, i + n, ...`, and joins them all before returning. `n` never exceeds the
/// row count.
pub(crate) fn run_cpu_workers(
    grid: &mut IterationGrid,
    worker_count: usize,
    kernel: CpuKernel,
    mapping: &ViewportMapping,
    max_iterations: u32,
    control: &RunControl,
) {
    let assignments = grid.interleaved_scanlines(worker_count);
    let cancel = control.cancel_flag();

    thread::scope(|scope| {
        let handles: Vec<_> = assignments
            .into_iter()
            .enumerate()
            .filter_map(|(worker, mut scanlines)| {
                let spawned = thread::Builder::new()
                    .name(format!("escape-grid-worker-{worker}"))
                    .spawn_scoped(scope, move || {
                        debug!(worker, rows = scanlines.len(), "worker started");
                        run_isolated(worker, control, || {
                            kernel(&mut scanlines, mapping, max_iterations, cancel)
                        });
                    });

                match spawned {
                    Ok(handle) => Some((worker, handle)),
                    Err(err) => {
                        control.record_failure(WorkerFailure {
                            worker,
                            kind: WorkerFailureKind::SpawnFailed(err.to_string()),
                        });
                        None
                    }
                }
            })
            .collect();

        for (worker, handle) in handles {
            if let Err(payload) = handle.join() {
                control.record_failure(WorkerFailure {
                    worker,
                    kind: WorkerFailureKind::Panicked(panic_message(payload.as_ref())),
                });
            }
        }
    });
}
