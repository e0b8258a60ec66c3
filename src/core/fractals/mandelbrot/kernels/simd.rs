use crate::core::actions::cancellation::CancelToken;
use crate::core::data::iteration_grid::Scanline;
use crate::core::data::real::Real;
use crate::core::fractals::mandelbrot::algorithm::{check_row_coordinates, fold_escape_count};
use crate::core::fractals::mandelbrot::errors::KernelError;
use crate::core::fractals::mandelbrot::kernels::lanes::LaneGroup;
use crate::core::util::pixel_to_complex_coords::ViewportMapping;

/// Number of escape checks each lane survives, at most `max_iterations`.
///
/// Lanes leave the active mask for good once `|z|² > 4`; the loop stops as soon
/// as no lane is active.
#[inline]
fn survived_checks<L: LaneGroup>(c_real: L, c_imag: L, max_iterations: u32) -> L::Counter {
    let limit = L::splat(<L::Real as Real>::ESCAPE_RADIUS_SQUARED);
    let mut z_real = c_real;
    let mut z_imag = c_imag;
    let mut active = L::all_lanes();
    let mut survived = L::zero_counter();

    for _ in 0..max_iterations {
        let real_squared = z_real * z_real;
        let imag_squared = z_imag * z_imag;

        active = active & (real_squared + imag_squared).within(limit);
        if !active.any_lane() {
            break;
        }

        survived = L::count_lanes(survived, active);

        let cross = z_real * z_imag;
        z_imag = cross + cross + c_imag;
        z_real = real_squared - imag_squared + c_real;
    }

    survived
}

/// Fills every cell of `scanlines` one lane group at a time.
///
/// Produces exactly the values of the scalar kernel at the same precision.
/// The trailing group of a row may extend past the row end; those lanes are
/// computed and discarded. `cancel` is polled before every lane group.
pub fn compute_simd<L: LaneGroup, C: CancelToken>(
    scanlines: &mut [Scanline<'_>],
    mapping: &ViewportMapping,
    max_iterations: u32,
    cancel: &C,
) -> Result<(), KernelError> {
    let mapping = mapping.at_precision::<L::Real>();

    for scanline in scanlines.iter_mut() {
        if cancel.is_cancelled() {
            return Ok(());
        }

        check_row_coordinates(&mapping, scanline.y, scanline.cells.len())?;

        let c_imag = L::splat(mapping.imag(scanline.y));

        for (group_index, group) in scanline.cells.chunks_mut(L::LANES).enumerate() {
            if group_index > 0 && cancel.is_cancelled() {
                return Ok(());
            }

            let group_x = group_index * L::LANES;
            let c_real = L::from_fn(|lane| mapping.real(group_x + lane));

            let survived = survived_checks(c_real, c_imag, max_iterations);

            for (cell, count) in group.iter_mut().zip(L::lane_counts(survived)) {
                *cell = fold_escape_count(count, max_iterations);
            }
        }
    }

    Ok(())
}
