use bytemuck::{Pod, Zeroable};

use crate::core::data::real::Real;
use crate::core::data::run_parameters::Precision;
use crate::core::util::pixel_to_complex_coords::ViewportMapping;

const SHADER_TEMPLATE: &str = include_str!("escape_time.wgsl");
const REAL_PLACEHOLDER: &str = "REAL";

/// Largest uniform block, the double precision layout.
pub(crate) const UNIFORM_BUFFER_SIZE: u64 = 48;

#[must_use]
pub(crate) fn shader_source(precision: Precision) -> String {
    let real = match precision {
        Precision::Single => "f32",
        Precision::Double => "f64",
    };

    SHADER_TEMPLATE.replace(REAL_PLACEHOLDER, real)
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct GridHeader {
    width: u32,
    height: u32,
    row_offset: u32,
    max_iterations: u32,
}

/// Per-band uniform values, laid out to match `GridUniforms` in the shader.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct GridUniforms {
    pub width: u32,
    pub height: u32,
    pub row_offset: u32,
    pub max_iterations: u32,
    pub precision: Precision,
    pub mapping: ViewportMapping,
}

impl GridUniforms {
    /// Bytes for the uniform buffer. Coefficients are narrowed to the run
    /// precision the same way the CPU kernels narrow them.
    #[must_use]
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let header = GridHeader {
            width: self.width,
            height: self.height,
            row_offset: self.row_offset,
            max_iterations: self.max_iterations,
        };

        let mut bytes = bytemuck::bytes_of(&header).to_vec();

        match self.precision {
            Precision::Single => bytes.extend_from_slice(bytemuck::cast_slice(&self.coefficients::<f32>())),
            Precision::Double => bytes.extend_from_slice(bytemuck::cast_slice(&self.coefficients::<f64>())),
        }

        bytes
    }

    fn coefficients<T: Real>(&self) -> [T; 4] {
        let mapping = self.mapping.at_precision::<T>();

        [
            mapping.start_x(),
            mapping.start_y(),
            mapping.scale(),
            T::ESCAPE_RADIUS_SQUARED,
        ]
    }
}
