mod controllers;
mod core;

pub use crate::controllers::cli::args::{BackendArg, CliArgs, PrecisionArg};
pub use crate::controllers::cli::run_cli;
pub use crate::controllers::cli::summary::GridSummary;

pub use crate::core::actions::cancellation::{CancelToken, CancellationFlag, NeverCancel};
pub use crate::core::actions::compute_grid::coordinator::{ComputeCoordinator, CoordinatorConfig};
pub use crate::core::actions::compute_grid::errors::{
    AggregateFailure, ComputeError, ConfigError, RunOutcome, WorkerFailure, WorkerFailureKind,
};
pub use crate::core::actions::compute_grid::ports::kernel::{CpuKernel, KernelSelection, select_kernel};
pub use crate::core::data::capabilities::{Capabilities, GpuInfo};
pub use crate::core::data::complex::Complex;
pub use crate::core::data::iteration_grid::{IterationGrid, IterationGridError, Scanline};
pub use crate::core::data::real::Real;
pub use crate::core::data::run_parameters::{
    Backend, DEFAULT_MAX_ITERATIONS, Precision, RunParameters, RunParametersError,
};
pub use crate::core::data::viewport::{Viewport, ViewportError};
pub use crate::core::fractals::mandelbrot::algorithm::{escape_time, fold_escape_count};
pub use crate::core::fractals::mandelbrot::errors::{GpuError, KernelError};
pub use crate::core::fractals::mandelbrot::kernels::lanes::LaneGroup;
pub use crate::core::fractals::mandelbrot::kernels::scalar::compute_scalar;
pub use crate::core::fractals::mandelbrot::kernels::simd::compute_simd;
pub use crate::core::util::calculate_gpu_bands::{
    BLOCK_HEIGHT, BLOCK_WIDTH, BatchBudget, BatchBudgetError, calculate_band_rows,
    max_pixels_per_batch, row_bands,
};
pub use crate::core::util::interleaved_rows::interleaved_rows;
pub use crate::core::util::pixel_to_complex_coords::{Mapping, ViewportMapping, pixel_to_complex_coords};

#[cfg(feature = "gpu")]
pub use crate::core::fractals::mandelbrot::kernels::gpu::context::GpuContext;
