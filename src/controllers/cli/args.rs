use clap::{Parser, ValueEnum};

use crate::core::data::run_parameters::{Backend, DEFAULT_MAX_ITERATIONS, Precision};
use crate::core::data::viewport::{DEFAULT_OFFSET_X, DEFAULT_OFFSET_Y, DEFAULT_ZOOM};

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum PrecisionArg {
    Single,
    Double,
}

impl From<PrecisionArg> for Precision {
    fn from(arg: PrecisionArg) -> Self {
        match arg {
            PrecisionArg::Single => Precision::Single,
            PrecisionArg::Double => Precision::Double,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Scalar,
    Simd128,
    Simd256,
    Gpu,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Scalar => Backend::Scalar,
            BackendArg::Simd128 => Backend::Simd128,
            BackendArg::Simd256 => Backend::Simd256,
            BackendArg::Gpu => Backend::Gpu,
        }
    }
}

/// Compute a Mandelbrot escape-time grid and report timing.
#[derive(Debug, Clone, Parser)]
#[command(name = "escape-grid", version, about, long_about = None)]
pub struct CliArgs {
    /// Grid width in pixels
    #[arg(long, default_value_t = 1024)]
    pub width: usize,

    /// Grid height in pixels
    #[arg(long, default_value_t = 768)]
    pub height: usize,

    /// Real coordinate of the viewport centre
    #[arg(long, default_value_t = DEFAULT_OFFSET_X, allow_hyphen_values = true)]
    pub offset_x: f64,

    /// Imaginary coordinate of the viewport centre
    #[arg(long, default_value_t = DEFAULT_OFFSET_Y, allow_hyphen_values = true)]
    pub offset_y: f64,

    #[arg(long, default_value_t = DEFAULT_ZOOM)]
    pub zoom: f64,

    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: u32,

    #[arg(long, value_enum, default_value_t = PrecisionArg::Double)]
    pub precision: PrecisionArg,

    /// Defaults to the widest vector backend this CPU supports
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Worker threads for CPU backends (defaults to available parallelism)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Skip probing for a GPU adapter
    #[arg(long)]
    pub no_gpu: bool,

    /// Number of consecutive runs to time
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,
}
