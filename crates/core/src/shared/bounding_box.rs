use serde::{Deserialize, Serialize};

use super::frame::Dimensions;

/// Axis-aligned face box in pixel coordinates of the frame it was detected in.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Maps a box detected on a `from`-sized frame onto a `to`-sized surface.
    ///
    /// Returns the box unchanged when `from` has a zero dimension.
    pub fn scale(&self, from: Dimensions, to: Dimensions) -> BoundingBox {
        if from.is_empty() {
            return *self;
        }
        let sx = to.width as f64 / from.width as f64;
        let sy = to.height as f64 / from.height as f64;
        BoundingBox {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
        }
    }

    /// Intersects the box with `[0, width) x [0, height)`.
    ///
    /// A box entirely outside the surface collapses to zero size at the
    /// nearest edge.
    pub fn clamp_to(&self, dims: Dimensions) -> BoundingBox {
        let max_x = dims.width as f64;
        let max_y = dims.height as f64;
        let x1 = self.x.clamp(0.0, max_x);
        let y1 = self.y.clamp(0.0, max_y);
        let x2 = (self.x + self.width).clamp(0.0, max_x);
        let y2 = (self.y + self.height).clamp(0.0, max_y);
        BoundingBox {
            x: x1,
            y: y1,
            width: (x2 - x1).max(0.0),
            height: (y2 - y1).max(0.0),
        }
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}
