use crate::core::data::complex::Complex;
use crate::core::data::real::Real;
use crate::core::fractals::mandelbrot::errors::KernelError;
use crate::core::util::pixel_to_complex_coords::Mapping;

/// Converts the number of escape checks a point survived into its grid value.
///
/// A point that survives all `max_iterations` checks is interior and folds to
/// `0`; otherwise the value is the 1-based index of the check that saw
/// `|z|² > 4`. Every backend finishes through this function.
///
/// Values therefore lie in `[0, max_iterations]`, not `[0, max_iterations - 1]`:
/// a point escaping on the first check reports `1` even when
/// `max_iterations == 1`, and an escape on the last check reports
/// `max_iterations`.
#[inline]
#[must_use]
pub const fn fold_escape_count(survived: u32, max_iterations: u32) -> u32 {
    if survived >= max_iterations {
        0
    } else {
        survived + 1
    }
}

/// Escape-time count of `c` under `z ← z² + c`, `z₀ = 0`.
#[inline]
#[must_use]
pub fn escape_time<T: Real>(c: Complex<T>, max_iterations: u32) -> u32 {
    // z₁ = 0² + c
    let mut z = c;
    let mut survived = 0;

    while survived < max_iterations {
        if z.magnitude_squared() > T::ESCAPE_RADIUS_SQUARED {
            break;
        }

        z = z * z + c;
        survived += 1;
    }

    fold_escape_count(survived, max_iterations)
}

/// Rejects rows whose coordinates overflow the kernel precision. The map is
/// affine in x, so finite endpoints imply a finite row.
pub(crate) fn check_row_coordinates<T: Real>(
    mapping: &Mapping<T>,
    y: usize,
    width: usize,
) -> Result<(), KernelError> {
    if width == 0 {
        return Ok(());
    }

    let first = mapping.map(0, y);
    let last = mapping.map(width - 1, y);

    if first.is_finite() && last.is_finite() {
        Ok(())
    } else {
        Err(KernelError::NonFiniteCoordinate {
            row: y,
            precision: T::PRECISION,
        })
    }
}
