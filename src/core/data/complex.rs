use std::ops::{Add, Mul};

use crate::core::data::real::Real;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Complex<T> {
    pub real: T,
    pub imag: T,
}

impl<T: Real> Complex<T> {
    #[must_use]
    pub fn magnitude_squared(&self) -> T {
        self.real * self.real + self.imag * self.imag
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.real.is_finite() && self.imag.is_finite()
    }
}

impl<T: Real> Add for Complex<T> {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            real: self.real + other.real,
            imag: self.imag + other.imag,
        }
    }
}

// Squaring through this keeps the imaginary part as `re*im + im*re`, which is
// bit-identical to the `t + t` doubling the vector and GPU kernels use.
impl<T: Real> Mul for Complex<T> {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Self {
            real: self.real * other.real - self.imag * other.imag,
            imag: self.real * other.imag + self.imag * other.real,
        }
    }
}
