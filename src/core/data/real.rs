use std::fmt::Debug;
use std::ops::{Add, Mul, Sub};

use crate::core::data::run_parameters::Precision;

/// Floating point type a kernel iterates in.
///
/// Implemented for `f32` (single precision) and `f64` (double precision).
/// Precision changes only the arithmetic type, never the algorithm.
pub trait Real:
    Copy
    + Debug
    + PartialOrd
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + 'static
{
    const ESCAPE_RADIUS_SQUARED: Self;
    const PRECISION: Precision;

    fn from_f64(value: f64) -> Self;

    fn from_index(index: usize) -> Self;

    fn is_finite(self) -> bool;
}

impl Real for f32 {
    const ESCAPE_RADIUS_SQUARED: Self = 4.0;
    const PRECISION: Precision = Precision::Single;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn from_index(index: usize) -> Self {
        index as f32
    }

    #[inline]
    fn is_finite(self) -> bool {
        f32::is_finite(self)
    }
}

impl Real for f64 {
    const ESCAPE_RADIUS_SQUARED: Self = 4.0;
    const PRECISION: Precision = Precision::Double;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn from_index(index: usize) -> Self {
        index as f64
    }

    #[inline]
    fn is_finite(self) -> bool {
        f64::is_finite(self)
    }
}
