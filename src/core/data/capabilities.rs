use crate::core::data::run_parameters::{Backend, Precision};

/// Adapter reported by the GPU probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuInfo {
    pub name: String,
    pub driver: String,
    pub supports_f64: bool,
}

/// Which backends this machine can run, probed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub simd128: bool,
    pub simd256: bool,
    pub gpu: Option<GpuInfo>,
}

impl Capabilities {
    /// Probes the CPU only; the GPU entry is filled in by whoever owns the
    /// device.
    #[must_use]
    pub fn detect_cpu() -> Self {
        Self {
            simd128: true,
            simd256: has_256_bit_vectors(),
            gpu: None,
        }
    }

    #[must_use]
    pub fn with_gpu(mut self, gpu: Option<GpuInfo>) -> Self {
        self.gpu = gpu;
        self
    }

    #[must_use]
    pub fn supports(&self, backend: Backend, precision: Precision) -> bool {
        match backend {
            Backend::Scalar => true,
            Backend::Simd128 => self.simd128,
            Backend::Simd256 => self.simd256,
            Backend::Gpu => match (&self.gpu, precision) {
                (None, _) => false,
                (Some(_), Precision::Single) => true,
                (Some(gpu), Precision::Double) => gpu.supports_f64,
            },
        }
    }

    /// Widest CPU vector backend available.
    #[must_use]
    pub fn preferred_cpu_backend(&self) -> Backend {
        if self.simd256 {
            Backend::Simd256
        } else if self.simd128 {
            Backend::Simd128
        } else {
            Backend::Scalar
        }
    }
}

// Reports whether the CPU has AVX registers. Whether the 256-bit kernels use
// them depends on the target features the crate was built with.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn has_256_bit_vectors() -> bool {
    std::arch::is_x86_feature_detected!("avx")
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
fn has_256_bit_vectors() -> bool {
    false
}
