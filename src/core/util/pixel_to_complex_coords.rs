use crate::core::data::complex::Complex;
use crate::core::data::real::Real;
use crate::core::data::viewport::Viewport;

/// Pixel-to-plane affine map for one grid size and viewport.
///
/// The coefficients are derived once in double precision; every backend
/// narrows them with [`ViewportMapping::at_precision`] and evaluates
/// `start + pixel * scale` in its own precision, so all kernels see the same
/// coordinate for the same pixel.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewportMapping {
    start_x: f64,
    start_y: f64,
    scale: f64,
}

impl ViewportMapping {
    #[must_use]
    pub fn new(width: usize, height: usize, viewport: &Viewport) -> Self {
        let width = width as f64;
        let height = height as f64;
        let zoom = viewport.zoom();

        Self {
            start_x: -(width / (height * zoom)) + viewport.offset_x(),
            start_y: -1.0 / zoom + viewport.offset_y(),
            scale: 2.0 / (height * zoom),
        }
    }

    #[must_use]
    pub fn start_x(&self) -> f64 {
        self.start_x
    }

    #[must_use]
    pub fn start_y(&self) -> f64 {
        self.start_y
    }

    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[must_use]
    pub fn at_precision<T: Real>(&self) -> Mapping<T> {
        Mapping {
            start_x: T::from_f64(self.start_x),
            start_y: T::from_f64(self.start_y),
            scale: T::from_f64(self.scale),
        }
    }

    #[must_use]
    pub fn map(&self, pixel_x: usize, pixel_y: usize) -> Complex<f64> {
        self.at_precision::<f64>().map(pixel_x, pixel_y)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mapping<T> {
    start_x: T,
    start_y: T,
    scale: T,
}

impl<T: Real> Mapping<T> {
    #[inline]
    #[must_use]
    pub fn real(&self, pixel_x: usize) -> T {
        self.start_x + T::from_index(pixel_x) * self.scale
    }

    #[inline]
    #[must_use]
    pub fn imag(&self, pixel_y: usize) -> T {
        self.start_y + T::from_index(pixel_y) * self.scale
    }

    #[inline]
    #[must_use]
    pub fn map(&self, pixel_x: usize, pixel_y: usize) -> Complex<T> {
        Complex {
            real: self.real(pixel_x),
            imag: self.imag(pixel_y),
        }
    }

    #[must_use]
    pub fn start_x(&self) -> T {
        self.start_x
    }

    #[must_use]
    pub fn start_y(&self) -> T {
        self.start_y
    }

    #[must_use]
    pub fn scale(&self) -> T {
        self.scale
    }
}

/// Complex-plane coordinate of pixel `(pixel_x, pixel_y)` on a
/// `width`x`height` grid. Row 0 is the top edge at `offset_y - 1 / zoom`.
#[must_use]
pub fn pixel_to_complex_coords(
    pixel_x: usize,
    pixel_y: usize,
    width: usize,
    height: usize,
    viewport: &Viewport,
) -> Complex<f64> {
    ViewportMapping::new(width, height, viewport).map(pixel_x, pixel_y)
}
