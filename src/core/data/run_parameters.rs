use std::fmt;
use std::num::NonZeroUsize;

use thiserror::Error;

pub const DEFAULT_MAX_ITERATIONS: u32 = 1001;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum RunParametersError {
    #[error("Maximum iterations must be greater than zero")]
    ZeroMaxIterations,
    #[error("thread count cannot be less than one")]
    ZeroThreadCount,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Precision {
    Single,
    #[default]
    Double,
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Double => write!(f, "double"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Backend {
    #[default]
    Scalar,
    Simd128,
    /// 8 single or 4 double lanes per step. The vector instructions are
    /// chosen at compile time: without `-C target-feature=+avx` each step
    /// runs as two 128-bit halves, with identical results.
    Simd256,
    Gpu,
}

impl Backend {
    /// Lanes processed per inner step, or `None` for backends that are not
    /// lane based.
    #[must_use]
    pub fn lanes(&self, precision: Precision) -> Option<usize> {
        match (self, precision) {
            (Self::Simd128, Precision::Single) => Some(4),
            (Self::Simd128, Precision::Double) => Some(2),
            (Self::Simd256, Precision::Single) => Some(8),
            (Self::Simd256, Precision::Double) => Some(4),
            (Self::Scalar | Self::Gpu, _) => None,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => write!(f, "scalar"),
            Self::Simd128 => write!(f, "simd128"),
            Self::Simd256 => write!(f, "simd256"),
            Self::Gpu => write!(f, "gpu"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RunParameters {
    max_iterations: u32,
    precision: Precision,
    backend: Backend,
    thread_count: usize,
}

impl RunParameters {
    pub fn new(
        max_iterations: u32,
        precision: Precision,
        backend: Backend,
        thread_count: usize,
    ) -> Result<Self, RunParametersError> {
        if max_iterations == 0 {
            return Err(RunParametersError::ZeroMaxIterations);
        }

        if thread_count == 0 {
            return Err(RunParametersError::ZeroThreadCount);
        }

        Ok(Self {
            max_iterations,
            precision,
            backend,
            thread_count,
        })
    }

    #[must_use]
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    #[must_use]
    pub fn precision(&self) -> Precision {
        self.precision
    }

    #[must_use]
    pub fn backend(&self) -> Backend {
        self.backend
    }

    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Number of workers a run starts. The GPU backend always dispatches from
    /// a single thread regardless of the configured thread count.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        match self.backend {
            Backend::Gpu => 1,
            _ => self.thread_count,
        }
    }

    pub fn set_max_iterations(&mut self, max_iterations: u32) -> Result<(), RunParametersError> {
        if max_iterations == 0 {
            return Err(RunParametersError::ZeroMaxIterations);
        }

        self.max_iterations = max_iterations;
        Ok(())
    }

    /// Adds `delta` to the iteration cap, saturating so the cap never drops
    /// below one.
    pub fn adjust_max_iterations(&mut self, delta: i64) {
        let adjusted = i64::from(self.max_iterations).saturating_add(delta);

        self.max_iterations = adjusted.clamp(1, i64::from(u32::MAX)) as u32;
    }

    pub fn set_precision(&mut self, precision: Precision) {
        self.precision = precision;
    }

    pub fn set_backend(&mut self, backend: Backend) {
        self.backend = backend;
    }

    pub fn set_thread_count(&mut self, thread_count: usize) -> Result<(), RunParametersError> {
        if thread_count == 0 {
            return Err(RunParametersError::ZeroThreadCount);
        }

        self.thread_count = thread_count;
        Ok(())
    }
}

impl Default for RunParameters {
    fn default() -> Self {
        let thread_count = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);

        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            precision: Precision::default(),
            backend: Backend::default(),
            thread_count,
        }
    }
}
