use std::ops::{Add, BitAnd, Mul, Sub};

use wide::{CmpLe, f32x4, f32x8, f64x2, f64x4, i32x4, i32x8, i64x2, i64x4};

use crate::core::data::real::Real;

/// A fixed-width group of lanes iterated in lock step.
///
/// Comparisons yield all-ones/all-zeros lane masks in the vector type itself;
/// `Counter` is the same-width integer vector the masks are counted into.
pub trait LaneGroup:
    Copy + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self> + BitAnd<Output = Self>
{
    type Real: Real;
    type Counter: Copy;

    const LANES: usize;

    fn splat(value: Self::Real) -> Self;

    fn from_fn<F: FnMut(usize) -> Self::Real>(lane_value: F) -> Self;

    /// Mask with every lane set.
    fn all_lanes() -> Self;

    /// Mask of lanes where `self <= limit`. NaN lanes are cleared.
    fn within(self, limit: Self) -> Self;

    fn any_lane(self) -> bool;

    fn zero_counter() -> Self::Counter;

    /// Adds one to every counter whose lane is set in `mask`.
    fn count_lanes(counter: Self::Counter, mask: Self) -> Self::Counter;

    fn lane_counts(counter: Self::Counter) -> impl Iterator<Item = u32>;
}

macro_rules! impl_lane_group {
    ($vector:ty, $counter:ty, $real:ty, $int:ty, $lanes:literal) => {
        impl LaneGroup for $vector {
            type Real = $real;
            type Counter = $counter;

            const LANES: usize = $lanes;

            #[inline]
            fn splat(value: $real) -> Self {
                <$vector>::splat(value)
            }

            #[inline]
            fn from_fn<F: FnMut(usize) -> $real>(lane_value: F) -> Self {
                bytemuck::cast(std::array::from_fn::<$real, $lanes, F>(lane_value))
            }

            #[inline]
            fn all_lanes() -> Self {
                bytemuck::cast([-1 as $int; $lanes])
            }

            #[inline]
            fn within(self, limit: Self) -> Self {
                self.cmp_le(limit)
            }

            #[inline]
            fn any_lane(self) -> bool {
                self.move_mask() != 0
            }

            #[inline]
            fn zero_counter() -> $counter {
                bytemuck::Zeroable::zeroed()
            }

            // A set lane is -1 once reinterpreted as an integer.
            #[inline]
            fn count_lanes(counter: $counter, mask: Self) -> $counter {
                counter - bytemuck::cast::<$vector, $counter>(mask)
            }

            #[inline]
            fn lane_counts(counter: $counter) -> impl Iterator<Item = u32> {
                bytemuck::cast::<$counter, [$int; $lanes]>(counter)
                    .into_iter()
                    .map(|count| count as u32)
            }
        }
    };
}

impl_lane_group!(f32x4, i32x4, f32, i32, 4);
impl_lane_group!(f64x2, i64x2, f64, i64, 2);
impl_lane_group!(f32x8, i32x8, f32, i32, 8);
impl_lane_group!(f64x4, i64x4, f64, i64, 4);
