use crate::core::actions::cancellation::CancelToken;
use crate::core::data::complex::Complex;
use crate::core::data::iteration_grid::Scanline;
use crate::core::data::real::Real;
use crate::core::fractals::mandelbrot::algorithm::{check_row_coordinates, escape_time};
use crate::core::fractals::mandelbrot::errors::KernelError;
use crate::core::util::pixel_to_complex_coords::ViewportMapping;

/// Fills every cell of `scanlines` one pixel at a time in precision `T`.
///
/// `cancel` is polled before every pixel; once it fires the kernel returns
/// early and the remaining cells are left untouched.
pub fn compute_scalar<T: Real, C: CancelToken>(
    scanlines: &mut [Scanline<'_>],
    mapping: &ViewportMapping,
    max_iterations: u32,
    cancel: &C,
) -> Result<(), KernelError> {
    let mapping = mapping.at_precision::<T>();

    for scanline in scanlines.iter_mut() {
        if cancel.is_cancelled() {
            return Ok(());
        }

        check_row_coordinates(&mapping, scanline.y, scanline.cells.len())?;

        let imag = mapping.imag(scanline.y);

        for (x, cell) in scanline.cells.iter_mut().enumerate() {
            // The row poll above covers pixel 0.
            if x > 0 && cancel.is_cancelled() {
                return Ok(());
            }

            let c = Complex {
                real: mapping.real(x),
                imag,
            };

            *cell = escape_time(c, max_iterations);
        }
    }

    Ok(())
}
