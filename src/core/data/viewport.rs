use thiserror::Error;

pub const DEFAULT_OFFSET_X: f64 = -0.75;
pub const DEFAULT_OFFSET_Y: f64 = 0.0;
pub const DEFAULT_ZOOM: f64 = 1.0;

#[derive(Debug, Copy, Clone, PartialEq, Error)]
pub enum ViewportError {
    #[error("viewport offset must be finite: ({x}, {y})")]
    NonFiniteOffset { x: f64, y: f64 },
    #[error("viewport zoom must be a finite value greater than zero: {0}")]
    InvalidZoom(f64),
}

/// Affine view onto the complex plane.
///
/// The visible half-height is `1 / zoom` around `(offset_x, offset_y)`; the
/// horizontal extent follows the grid's aspect ratio.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    offset_x: f64,
    offset_y: f64,
    zoom: f64,
}

impl Viewport {
    pub fn new(offset_x: f64, offset_y: f64, zoom: f64) -> Result<Self, ViewportError> {
        if !offset_x.is_finite() || !offset_y.is_finite() {
            return Err(ViewportError::NonFiniteOffset {
                x: offset_x,
                y: offset_y,
            });
        }

        if !zoom.is_finite() || zoom <= 0.0 {
            return Err(ViewportError::InvalidZoom(zoom));
        }

        Ok(Self {
            offset_x,
            offset_y,
            zoom,
        })
    }

    #[must_use]
    pub fn offset_x(&self) -> f64 {
        self.offset_x
    }

    #[must_use]
    pub fn offset_y(&self) -> f64 {
        self.offset_y
    }

    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Same zoom, new centre.
    pub fn recentred(&self, offset_x: f64, offset_y: f64) -> Result<Self, ViewportError> {
        Self::new(offset_x, offset_y, self.zoom)
    }

    /// Multiplies the zoom by `factor` (`> 1` zooms in).
    pub fn zoomed(&self, factor: f64) -> Result<Self, ViewportError> {
        Self::new(self.offset_x, self.offset_y, self.zoom * factor)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset_x: DEFAULT_OFFSET_X,
            offset_y: DEFAULT_OFFSET_Y,
            zoom: DEFAULT_ZOOM,
        }
    }
}
