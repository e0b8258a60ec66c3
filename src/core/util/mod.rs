pub mod calculate_gpu_bands;
pub mod interleaved_rows;
pub mod pixel_to_complex_coords;
