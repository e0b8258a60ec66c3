pub mod lanes;
pub mod scalar;
pub mod simd;

#[cfg(feature = "gpu")]
pub mod gpu;
