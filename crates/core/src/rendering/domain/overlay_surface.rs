use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Dimensions;

/// Placement of a face label, in surface pixels.
///
/// The label hangs below the box with its top-left corner at (`x`, `y`).
/// When that would run past the bottom of the surface it sits on top of the
/// box instead, its bottom edge at `box_top`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextAnchor {
    pub x: f64,
    pub y: f64,
    pub box_top: f64,
}

impl TextAnchor {
    pub fn below(bbox: &BoundingBox) -> Self {
        Self {
            x: bbox.x,
            y: bbox.bottom(),
            box_top: bbox.y,
        }
    }

    /// Top edge of a label `label_height` tall on a surface `surface_height`
    /// tall.
    pub fn label_top(&self, label_height: f64, surface_height: f64) -> f64 {
        if self.y + label_height <= surface_height {
            self.y
        } else {
            (self.box_top - label_height).max(0.0)
        }
    }
}

/// Drawing primitives of a 2D annotation surface.
pub trait DrawContext {
    /// Erases everything previously drawn.
    fn clear(&mut self);

    fn draw_box(&mut self, bbox: &BoundingBox);

    fn draw_text(&mut self, text: &str, anchor: TextAnchor);
}

/// A drawable overlay sized to match the frame source.
///
/// `context` returns `None` while no drawing context is available (e.g. the
/// surface has not been sized yet); callers treat that as "skip drawing".
pub trait OverlaySurface: Send {
    fn resize(&mut self, dimensions: Dimensions);

    fn dimensions(&self) -> Dimensions;

    fn context(&mut self) -> Option<&mut dyn DrawContext>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_label_top_below_box_when_it_fits() {
        let anchor = TextAnchor::below(&BoundingBox::new(10.0, 20.0, 40.0, 40.0));
        assert_relative_eq!(anchor.label_top(20.0, 100.0), 60.0);
        assert_relative_eq!(anchor.label_top(40.0, 100.0), 60.0);
    }

    #[test]
    fn test_label_top_above_box_at_bottom_edge() {
        let anchor = TextAnchor::below(&BoundingBox::new(10.0, 60.0, 40.0, 40.0));
        assert_relative_eq!(anchor.label_top(20.0, 100.0), 40.0);
    }

    #[test]
    fn test_label_top_clamped_to_surface() {
        let anchor = TextAnchor::below(&BoundingBox::new(0.0, 5.0, 40.0, 95.0));
        assert_relative_eq!(anchor.label_top(20.0, 100.0), 0.0);
    }
}
