use thiserror::Error;

use crate::core::data::run_parameters::Precision;

/// Fault raised inside a kernel during a run. The coordinator records these
/// per worker instead of propagating them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    #[error("row {row} maps to a non-finite coordinate in {precision} precision")]
    NonFiniteCoordinate { row: usize, precision: Precision },

    #[error("gpu kernel failed: {0}")]
    Gpu(#[from] GpuError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpuError {
    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("failed to create GPU device: {0}")]
    DeviceCreation(String),

    #[error("failed to compile {precision} precision shader: {message}")]
    ShaderCompilation { precision: Precision, message: String },

    #[error("GPU adapter does not support double precision shaders")]
    DoublePrecisionUnsupported,

    #[error("failed to allocate {bytes} bytes of device memory: {message}")]
    Allocation { bytes: u64, message: String },

    #[error("grid of {width}x{height} exceeds the device dispatch limits")]
    GridTooLarge { width: usize, height: usize },

    #[error("failed to read back device memory: {0}")]
    BufferMapping(String),
}
