use wide::{f32x4, f32x8, f64x2, f64x4};

use crate::core::actions::cancellation::CancellationFlag;
use crate::core::data::iteration_grid::Scanline;
use crate::core::data::run_parameters::{Backend, Precision};
use crate::core::fractals::mandelbrot::errors::KernelError;
use crate::core::fractals::mandelbrot::kernels::scalar::compute_scalar;
use crate::core::fractals::mandelbrot::kernels::simd::compute_simd;
use crate::core::util::pixel_to_complex_coords::ViewportMapping;

/// A CPU kernel run by one worker over the scanlines it owns.
pub type CpuKernel = fn(
    &mut [Scanline<'_>],
    &ViewportMapping,
    u32,
    &CancellationFlag,
) -> Result<(), KernelError>;

/// Kernel resolved once per run from `(backend, precision)`.
#[derive(Debug, Copy, Clone)]
pub enum KernelSelection {
    Cpu(CpuKernel),
    Gpu(Precision),
}

#[must_use]
pub fn select_kernel(backend: Backend, precision: Precision) -> KernelSelection {
    match (backend, precision) {
        (Backend::Scalar, Precision::Single) => KernelSelection::Cpu(compute_scalar::<f32, CancellationFlag>),
        (Backend::Scalar, Precision::Double) => KernelSelection::Cpu(compute_scalar::<f64, CancellationFlag>),
        (Backend::Simd128, Precision::Single) => KernelSelection::Cpu(compute_simd::<f32x4, CancellationFlag>),
        (Backend::Simd128, Precision::Double) => KernelSelection::Cpu(compute_simd::<f64x2, CancellationFlag>),
        (Backend::Simd256, Precision::Single) => KernelSelection::Cpu(compute_simd::<f32x8, CancellationFlag>),
        (Backend::Simd256, Precision::Double) => KernelSelection::Cpu(compute_simd::<f64x4, CancellationFlag>),
        (Backend::Gpu, precision) => KernelSelection::Gpu(precision),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::iteration_grid::IterationGrid;
    use crate::core::data::viewport::Viewport;

    fn run(selection: KernelSelection) -> IterationGrid {
        let KernelSelection::Cpu(kernel) = selection else {
            panic!("expected a CPU kernel");
        };

        let mut grid = IterationGrid::new(13, 7).unwrap();
        let mapping = ViewportMapping::new(13, 7, &Viewport::default());
        let cancel = CancellationFlag::new();

        for mut scanlines in grid.interleaved_scanlines(2) {
            kernel(&mut scanlines, &mapping, 100, &cancel).unwrap();
        }

        grid
    }

    #[test]
    fn test_cpu_backends_select_agreeing_kernels() {
        for precision in [Precision::Single, Precision::Double] {
            let expected = run(select_kernel(Backend::Scalar, precision));

            assert_eq!(run(select_kernel(Backend::Simd128, precision)), expected);
            assert_eq!(run(select_kernel(Backend::Simd256, precision)), expected);
        }
    }

    #[test]
    fn test_gpu_backend_keeps_precision() {
        assert!(matches!(
            select_kernel(Backend::Gpu, Precision::Double),
            KernelSelection::Gpu(Precision::Double)
        ));
        assert!(matches!(
            select_kernel(Backend::Gpu, Precision::Single),
            KernelSelection::Gpu(Precision::Single)
        ));
    }
}
