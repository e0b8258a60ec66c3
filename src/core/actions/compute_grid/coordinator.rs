use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info};

use crate::core::actions::compute_grid::errors::{
    AggregateFailure, ComputeError, ConfigError, RunOutcome, WorkerFailure, WorkerFailureKind,
};
use crate::core::actions::compute_grid::ports::kernel::{KernelSelection, select_kernel};
use crate::core::actions::compute_grid::run_control::RunControl;
use crate::core::actions::compute_grid::workers::run_cpu_workers;
use crate::core::data::capabilities::Capabilities;
use crate::core::data::complex::Complex;
use crate::core::data::iteration_grid::IterationGrid;
use crate::core::data::run_parameters::{Backend, Precision, RunParameters};
use crate::core::data::viewport::Viewport;
use crate::core::fractals::mandelbrot::errors::{GpuError, KernelError};
use crate::core::util::calculate_gpu_bands::BatchBudget;
use crate::core::util::pixel_to_complex_coords::ViewportMapping;

#[cfg(feature = "gpu")]
use crate::core::actions::compute_grid::workers::run_isolated;
#[cfg(feature = "gpu")]
use crate::core::fractals::mandelbrot::kernels::gpu::context::GpuContext;

/// Settings a coordinator starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    pub viewport: Viewport,
    pub parameters: RunParameters,
    /// Open a GPU device at construction. Without one the GPU backend is
    /// reported unsupported.
    pub probe_gpu: bool,
    pub gpu_budget: BatchBudget,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            parameters: RunParameters::default(),
            probe_gpu: cfg!(feature = "gpu"),
            gpu_budget: BatchBudget::default(),
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct Settings {
    width: usize,
    height: usize,
    viewport: Viewport,
    parameters: RunParameters,
}

/// Owns the iteration grid and runs escape-time computations over it.
///
/// Shared by reference (typically through an `Arc`): one thread calls
/// [`compute`](Self::compute) while others may call
/// [`request_abort`](Self::request_abort) or query state.
pub struct ComputeCoordinator {
    settings: RwLock<Settings>,
    grid: Mutex<IterationGrid>,
    control: RunControl,
    capabilities: Capabilities,
    #[cfg(feature = "gpu")]
    gpu: Option<Mutex<GpuContext>>,
}

impl ComputeCoordinator {
    pub fn new(width: usize, height: usize) -> Result<Self, ConfigError> {
        Self::with_config(width, height, CoordinatorConfig::default())
    }

    pub fn with_config(width: usize, height: usize, config: CoordinatorConfig) -> Result<Self, ConfigError> {
        let grid = IterationGrid::new(width, height)?;
        let cpu = Capabilities::detect_cpu();

        #[cfg(feature = "gpu")]
        let (capabilities, gpu) = if config.probe_gpu {
            match GpuContext::probe(config.gpu_budget) {
                Ok(context) => {
                    let info = context.info().clone();
                    (cpu.with_gpu(Some(info)), Some(Mutex::new(context)))
                }
                Err(err) => {
                    tracing::warn!(%err, "GPU backend unavailable");
                    (cpu, None)
                }
            }
        } else {
            (cpu, None)
        };

        #[cfg(not(feature = "gpu"))]
        let capabilities = cpu;

        let parameters = config.parameters;
        if !capabilities.supports(parameters.backend(), parameters.precision()) {
            return Err(ConfigError::BackendUnsupported {
                backend: parameters.backend(),
                precision: parameters.precision(),
            });
        }

        debug!(width, height, ?capabilities, "compute coordinator created");

        Ok(Self {
            settings: RwLock::new(Settings {
                width,
                height,
                viewport: config.viewport,
                parameters,
            }),
            grid: Mutex::new(grid),
            control: RunControl::default(),
            capabilities,
            #[cfg(feature = "gpu")]
            gpu,
        })
    }

    /// Computes every cell of the grid with the current settings.
    ///
    /// Blocks until every worker has joined. Worker faults do not stop sibling
    /// workers; they are collected and returned together as
    /// [`ComputeError::WorkersFailed`]. Rows owned by a failed worker are left
    /// in an unspecified state.
    pub fn compute(&self) -> Result<RunOutcome, ComputeError> {
        let run = self.control.begin_run()?;
        let settings = *self.settings.read();
        let parameters = settings.parameters;
        let selection = select_kernel(parameters.backend(), parameters.precision());

        debug!(
            width = settings.width,
            height = settings.height,
            backend = %parameters.backend(),
            precision = %parameters.precision(),
            max_iterations = parameters.max_iterations(),
            workers = parameters.worker_count(),
            "run started"
        );

        {
            let mut grid = self.grid.lock();
            let mapping = ViewportMapping::new(grid.width(), grid.height(), &settings.viewport);

            match selection {
                KernelSelection::Cpu(kernel) => run_cpu_workers(
                    &mut grid,
                    parameters.worker_count(),
                    kernel,
                    &mapping,
                    parameters.max_iterations(),
                    &self.control,
                ),
                KernelSelection::Gpu(precision) => {
                    self.run_gpu(&mut grid, &mapping, parameters.max_iterations(), precision);
                }
            }
        }

        let failures = run.finish();
        if !failures.is_empty() {
            return Err(ComputeError::WorkersFailed(AggregateFailure::new(failures)));
        }

        let outcome = if self.control.is_abort_requested() {
            RunOutcome::Aborted
        } else {
            RunOutcome::Completed
        };

        info!(?outcome, "run finished");

        Ok(outcome)
    }

    #[cfg(feature = "gpu")]
    fn run_gpu(&self, grid: &mut IterationGrid, mapping: &ViewportMapping, max_iterations: u32, precision: Precision) {
        let Some(gpu) = &self.gpu else {
            self.control.record_failure(gpu_unavailable());
            return;
        };

        let width = grid.width();
        let height = grid.height();
        let cells = grid.as_mut_slice();
        let control = &self.control;

        std::thread::scope(|scope| {
            let spawned = std::thread::Builder::new()
                .name("escape-grid-gpu".to_string())
                .spawn_scoped(scope, move || {
                    run_isolated(0, control, || {
                        gpu.lock()
                            .compute(
                                cells,
                                width,
                                height,
                                mapping,
                                max_iterations,
                                precision,
                                control.cancel_flag(),
                            )
                            .map_err(Into::into)
                    });
                });

            match spawned {
                Ok(handle) => {
                    if handle.join().is_err() {
                        control.record_failure(WorkerFailure {
                            worker: 0,
                            kind: WorkerFailureKind::Panicked("GPU dispatch thread panicked".to_string()),
                        });
                    }
                }
                Err(err) => control.record_failure(WorkerFailure {
                    worker: 0,
                    kind: WorkerFailureKind::SpawnFailed(err.to_string()),
                }),
            }
        });
    }

    #[cfg(not(feature = "gpu"))]
    fn run_gpu(&self, _grid: &mut IterationGrid, _mapping: &ViewportMapping, _max_iterations: u32, _precision: Precision) {
        self.control.record_failure(gpu_unavailable());
    }

    /// Asks the in-flight run, if any, to stop. The flag stays set until
    /// [`reset_abort`](Self::reset_abort).
    pub fn request_abort(&self) {
        self.control.request_abort();
    }

    /// Clears the abort flag. Call only after the aborted run has returned,
    /// otherwise the run may not observe the abort.
    pub fn reset_abort(&self) {
        self.control.reset_abort();
    }

    #[must_use]
    pub fn is_abort_requested(&self) -> bool {
        self.control.is_abort_requested()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.control.is_running()
    }

    /// Replaces the grid with a zeroed one of the new dimensions.
    pub fn resize(&self, width: usize, height: usize) -> Result<(), ConfigError> {
        if self.control.is_running() {
            return Err(ConfigError::RunInProgress);
        }

        let grid = IterationGrid::new(width, height)?;

        *self.grid.lock() = grid;

        let mut settings = self.settings.write();
        settings.width = width;
        settings.height = height;

        debug!(width, height, "grid resized");

        Ok(())
    }

    /// Read access to the grid. Blocks while a run is writing it.
    pub fn grid(&self) -> MutexGuard<'_, IterationGrid> {
        self.grid.lock()
    }

    #[must_use]
    pub fn snapshot(&self) -> IterationGrid {
        self.grid.lock().clone()
    }

    #[must_use]
    pub fn dimensions(&self) -> (usize, usize) {
        let settings = self.settings.read();
        (settings.width, settings.height)
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.settings.read().viewport
    }

    #[must_use]
    pub fn parameters(&self) -> RunParameters {
        self.settings.read().parameters
    }

    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    #[must_use]
    pub fn is_supported(&self, backend: Backend, precision: Precision) -> bool {
        self.capabilities.supports(backend, precision)
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.settings.write().viewport = viewport;
    }

    pub fn set_max_iterations(&self, max_iterations: u32) -> Result<(), ConfigError> {
        self.settings.write().parameters.set_max_iterations(max_iterations)?;
        Ok(())
    }

    /// Adds `delta` to the iteration cap, never going below one.
    pub fn adjust_max_iterations(&self, delta: i64) -> u32 {
        let mut settings = self.settings.write();
        settings.parameters.adjust_max_iterations(delta);
        settings.parameters.max_iterations()
    }

    pub fn set_thread_count(&self, thread_count: usize) -> Result<(), ConfigError> {
        self.settings.write().parameters.set_thread_count(thread_count)?;
        Ok(())
    }

    pub fn set_backend(&self, backend: Backend) -> Result<(), ConfigError> {
        let mut settings = self.settings.write();
        self.ensure_supported(backend, settings.parameters.precision())?;
        settings.parameters.set_backend(backend);
        Ok(())
    }

    pub fn set_precision(&self, precision: Precision) -> Result<(), ConfigError> {
        let mut settings = self.settings.write();
        self.ensure_supported(settings.parameters.backend(), precision)?;
        settings.parameters.set_precision(precision);
        Ok(())
    }

    /// Complex coordinate of a pixel under the current grid size and
    /// viewport.
    #[must_use]
    pub fn map_pixel(&self, pixel_x: usize, pixel_y: usize) -> Complex<f64> {
        let settings = self.settings.read();

        ViewportMapping::new(settings.width, settings.height, &settings.viewport).map(pixel_x, pixel_y)
    }

    /// Moves the viewport centre to the coordinate under a pixel.
    pub fn recenter_on_pixel(&self, pixel_x: usize, pixel_y: usize) -> Result<Viewport, ConfigError> {
        let mut settings = self.settings.write();
        let centre = ViewportMapping::new(settings.width, settings.height, &settings.viewport).map(pixel_x, pixel_y);

        settings.viewport = settings.viewport.recentred(centre.real, centre.imag)?;
        Ok(settings.viewport)
    }

    /// Multiplies the zoom by `factor`; values above one zoom in.
    pub fn zoom_by(&self, factor: f64) -> Result<Viewport, ConfigError> {
        let mut settings = self.settings.write();

        settings.viewport = settings.viewport.zoomed(factor)?;
        Ok(settings.viewport)
    }

    fn ensure_supported(&self, backend: Backend, precision: Precision) -> Result<(), ConfigError> {
        if self.capabilities.supports(backend, precision) {
            Ok(())
        } else {
            Err(ConfigError::BackendUnsupported { backend, precision })
        }
    }
}

fn gpu_unavailable() -> WorkerFailure {
    WorkerFailure {
        worker: 0,
        kind: WorkerFailureKind::Kernel(KernelError::Gpu(GpuError::NoAdapter)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fractals::mandelbrot::algorithm::escape_time;
    use crate::core::fractals::mandelbrot::errors::KernelError;
    use std::sync::Arc;
    use std::thread;

    fn far_viewport() -> Viewport {
        Viewport::new(10.0, 10.0, 1.0).unwrap()
    }

    fn coordinator(width: usize, height: usize, viewport: Viewport, parameters: RunParameters) -> ComputeCoordinator {
        ComputeCoordinator::with_config(
            width,
            height,
            CoordinatorConfig {
                viewport,
                parameters,
                probe_gpu: false,
                gpu_budget: BatchBudget::default(),
            },
        )
        .unwrap()
    }

    fn params(max_iterations: u32, precision: Precision, backend: Backend, threads: usize) -> RunParameters {
        RunParameters::new(max_iterations, precision, backend, threads).unwrap()
    }

    #[test]
    fn test_new_rejects_overflowing_dimensions() {
        let result = ComputeCoordinator::with_config(
            usize::MAX,
            3,
            CoordinatorConfig {
                probe_gpu: false,
                ..CoordinatorConfig::default()
            },
        );

        assert!(matches!(result, Err(ConfigError::Grid(_))));
    }

    #[test]
    fn test_compute_matches_escape_time_and_is_idempotent() {
        let coordinator = coordinator(
            31,
            17,
            Viewport::default(),
            params(200, Precision::Double, Backend::Simd128, 3),
        );

        assert_eq!(coordinator.compute(), Ok(RunOutcome::Completed));
        let first = coordinator.snapshot();

        for (row, col) in [(0, 0), (8, 15), (16, 30), (8, 12)] {
            assert_eq!(
                first.get(row, col),
                Some(escape_time(coordinator.map_pixel(col, row), 200))
            );
        }

        assert_eq!(coordinator.compute(), Ok(RunOutcome::Completed));
        assert_eq!(*coordinator.grid(), first);
    }

    #[test]
    fn test_huge_thread_count_computes_every_row() {
        let coordinator = coordinator(9, 5, far_viewport(), params(20, Precision::Double, Backend::Scalar, 1));
        coordinator.set_thread_count(usize::MAX).unwrap();

        assert_eq!(coordinator.compute(), Ok(RunOutcome::Completed));
        assert!(coordinator.grid().as_slice().iter().all(|&cell| cell == 1));
    }

    #[test]
    fn test_resize_then_compute_writes_every_cell() {
        let coordinator = coordinator(4, 4, far_viewport(), params(20, Precision::Double, Backend::Scalar, 2));

        coordinator.compute().unwrap();
        coordinator.resize(7, 5).unwrap();

        assert_eq!(coordinator.dimensions(), (7, 5));
        assert!(coordinator.grid().as_slice().iter().all(|&cell| cell == 0));

        coordinator.compute().unwrap();

        let grid = coordinator.grid();
        assert_eq!((grid.width(), grid.height()), (7, 5));
        assert!(grid.as_slice().iter().all(|&cell| cell == 1));
    }

    #[test]
    fn test_worker_failures_are_aggregated() {
        let overflowing = Viewport::new(1.0e39, 0.0, 1.0).unwrap();
        let coordinator = coordinator(6, 6, overflowing, params(20, Precision::Single, Backend::Scalar, 3));

        let Err(ComputeError::WorkersFailed(aggregate)) = coordinator.compute() else {
            panic!("expected an aggregate failure");
        };

        assert_eq!(aggregate.workers(), vec![0, 1, 2]);
        assert!(aggregate.failures().iter().all(|failure| matches!(
            failure.kind,
            WorkerFailureKind::Kernel(KernelError::NonFiniteCoordinate { .. })
        )));
        assert!(!coordinator.is_running());

        coordinator.set_viewport(Viewport::default());
        assert_eq!(coordinator.compute(), Ok(RunOutcome::Completed));
    }

    #[test]
    fn test_abort_before_compute_leaves_grid_untouched() {
        let coordinator = coordinator(5, 5, far_viewport(), params(20, Precision::Single, Backend::Simd128, 2));

        coordinator.request_abort();
        assert!(coordinator.is_abort_requested());
        assert_eq!(coordinator.compute(), Ok(RunOutcome::Aborted));
        assert!(coordinator.grid().as_slice().iter().all(|&cell| cell == 0));

        coordinator.reset_abort();
        assert_eq!(coordinator.compute(), Ok(RunOutcome::Completed));
        assert!(coordinator.grid().as_slice().iter().all(|&cell| cell == 1));
    }

    #[test]
    fn test_concurrent_compute_is_rejected_and_abort_joins() {
        // Every pixel is interior, so each row costs width * max_iterations steps.
        let interior = Viewport::new(-0.2, 0.0, 1000.0).unwrap();
        let coordinator = Arc::new(coordinator(
            4,
            10_000,
            interior,
            params(2_000_000, Precision::Double, Backend::Scalar, 1),
        ));

        let runner = {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || coordinator.compute())
        };

        while !coordinator.is_running() {
            thread::yield_now();
        }

        assert_eq!(coordinator.compute(), Err(ComputeError::AlreadyRunning));
        assert_eq!(coordinator.resize(2, 2), Err(ConfigError::RunInProgress));

        coordinator.request_abort();

        assert_eq!(runner.join().unwrap(), Ok(RunOutcome::Aborted));
        assert!(!coordinator.is_running());

        coordinator.reset_abort();
        assert!(!coordinator.is_abort_requested());
    }

    #[test]
    fn test_gpu_backend_unsupported_without_device() {
        let coordinator = coordinator(4, 4, Viewport::default(), RunParameters::default());

        assert!(!coordinator.is_supported(Backend::Gpu, Precision::Single));
        assert_eq!(
            coordinator.set_backend(Backend::Gpu),
            Err(ConfigError::BackendUnsupported {
                backend: Backend::Gpu,
                precision: Precision::Double
            })
        );
        assert_eq!(coordinator.parameters().backend(), Backend::Scalar);

        let rejected = ComputeCoordinator::with_config(
            4,
            4,
            CoordinatorConfig {
                parameters: params(10, Precision::Single, Backend::Gpu, 1),
                probe_gpu: false,
                ..CoordinatorConfig::default()
            },
        );
        assert!(matches!(rejected, Err(ConfigError::BackendUnsupported { .. })));
    }

    #[test]
    fn test_setters_validate() {
        let coordinator = coordinator(4, 4, Viewport::default(), RunParameters::default());

        assert!(matches!(coordinator.set_max_iterations(0), Err(ConfigError::Parameters(_))));
        assert!(matches!(coordinator.set_thread_count(0), Err(ConfigError::Parameters(_))));
        assert!(matches!(coordinator.zoom_by(0.0), Err(ConfigError::Viewport(_))));

        coordinator.set_backend(Backend::Simd128).unwrap();
        coordinator.set_precision(Precision::Single).unwrap();
        coordinator.set_thread_count(5).unwrap();

        let parameters = coordinator.parameters();
        assert_eq!(parameters.backend(), Backend::Simd128);
        assert_eq!(parameters.precision(), Precision::Single);
        assert_eq!(parameters.thread_count(), 5);
    }

    #[test]
    fn test_navigation_helpers() {
        let coordinator = coordinator(64, 64, Viewport::default(), RunParameters::default());

        let centred = coordinator.recenter_on_pixel(32, 32).unwrap();
        assert_eq!((centred.offset_x(), centred.offset_y()), (-0.75, 0.0));

        let corner = coordinator.recenter_on_pixel(0, 0).unwrap();
        assert_eq!((corner.offset_x(), corner.offset_y()), (-1.75, -1.0));

        assert_eq!(coordinator.zoom_by(2.0).unwrap().zoom(), 2.0);
        assert_eq!(coordinator.map_pixel(0, 0).imag, -1.5);

        assert_eq!(coordinator.adjust_max_iterations(1000), 2001);
        assert_eq!(coordinator.adjust_max_iterations(-5000), 1);
    }
}
