use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use thiserror::Error;

use crate::rendering::domain::overlay_surface::{DrawContext, OverlaySurface, TextAnchor};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::config::DetectorConfig;
use crate::shared::frame::{Dimensions, Frame};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Box outline thickness in pixels.
const BOX_THICKNESS: u32 = 2;

/// Padding around label text inside its background bar.
const LABEL_PADDING: u32 = 2;

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("failed to read font {path}: {source}")]
    FontIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid font file {0}")]
    InvalidFont(String),
    #[error("failed to save overlay: {0}")]
    Save(#[from] image::ImageError),
    #[error("overlay is {overlay:?} but frame is {frame:?}")]
    SizeMismatch {
        overlay: Dimensions,
        frame: Dimensions,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayStyle {
    pub box_color: Rgba<u8>,
    pub text_color: Rgba<u8>,
    pub label_scale: f32,
}

impl OverlayStyle {
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self {
            box_color: Rgba(config.box_color),
            text_color: Rgba(config.text_color),
            label_scale: config.label_scale,
        }
    }
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self::from_config(&DetectorConfig::default())
    }
}

/// Shared view of a [`RasterOverlaySurface`]'s pixels.
///
/// Stays readable after the surface itself has been boxed and handed to the
/// pipeline.
#[derive(Clone, Debug)]
pub struct OverlayCanvas {
    pixels: Arc<Mutex<RgbaImage>>,
}

impl OverlayCanvas {
    fn new() -> Self {
        Self {
            pixels: Arc::new(Mutex::new(RgbaImage::new(0, 0))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RgbaImage> {
        self.pixels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn dimensions(&self) -> Dimensions {
        let pixels = self.lock();
        Dimensions::new(pixels.width(), pixels.height())
    }

    pub fn snapshot(&self) -> RgbaImage {
        self.lock().clone()
    }

    /// Blends the overlay over `frame`, which must have the overlay's size.
    pub fn composite_onto(&self, frame: &Frame) -> Result<RgbaImage, SurfaceError> {
        let overlay = self.snapshot();
        let overlay_dims = Dimensions::new(overlay.width(), overlay.height());
        let mismatch = || SurfaceError::SizeMismatch {
            overlay: overlay_dims,
            frame: frame.dimensions(),
        };
        if frame.dimensions() != overlay_dims {
            return Err(mismatch());
        }
        let base = frame.to_rgb_image().ok_or_else(mismatch)?;
        let mut composed = DynamicImage::ImageRgb8(base).to_rgba8();
        image::imageops::overlay(&mut composed, &overlay, 0, 0);
        Ok(composed)
    }

    pub fn save_composite(&self, frame: &Frame, path: &Path) -> Result<(), SurfaceError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(image::ImageError::IoError)?;
            }
        }
        self.composite_onto(frame)?.save(path)?;
        Ok(())
    }
}

/// Transparent RGBA overlay rasterised with `imageproc`.
///
/// Labels are drawn as a filled bar in the box colour; the text itself is
/// only rendered when a font has been supplied.
pub struct RasterOverlaySurface {
    canvas: OverlayCanvas,
    style: OverlayStyle,
    font: Option<FontVec>,
}

impl RasterOverlaySurface {
    /// Creates an unsized surface; it has no drawing context until `resize`.
    pub fn new(style: OverlayStyle) -> Self {
        Self {
            canvas: OverlayCanvas::new(),
            style,
            font: None,
        }
    }

    pub fn with_font_file(mut self, path: &Path) -> Result<Self, SurfaceError> {
        let bytes = std::fs::read(path).map_err(|source| SurfaceError::FontIo {
            path: path.display().to_string(),
            source,
        })?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|_| SurfaceError::InvalidFont(path.display().to_string()))?;
        self.font = Some(font);
        Ok(self)
    }

    pub fn canvas(&self) -> OverlayCanvas {
        self.canvas.clone()
    }

    fn label_width(&self, text: &str) -> u32 {
        match &self.font {
            Some(font) => text_size(PxScale::from(self.style.label_scale), font, text).0,
            // Rough monospace estimate so the bar is still meaningful without a font.
            None => (text.chars().count() as f32 * self.style.label_scale * 0.55) as u32,
        }
    }

    /// Converts a box to a pixel rect clipped to the canvas, or `None` if
    /// nothing of it is visible.
    fn pixel_rect(&self, bbox: &BoundingBox) -> Option<Rect> {
        let clamped = bbox.clamp_to(self.dimensions());
        if clamped.is_degenerate() {
            return None;
        }
        let w = clamped.width.round().max(1.0) as u32;
        let h = clamped.height.round().max(1.0) as u32;
        Some(Rect::at(clamped.x.round() as i32, clamped.y.round() as i32).of_size(w, h))
    }
}

impl OverlaySurface for RasterOverlaySurface {
    fn resize(&mut self, dimensions: Dimensions) {
        *self.canvas.lock() =
            RgbaImage::from_pixel(dimensions.width, dimensions.height, TRANSPARENT);
    }

    fn dimensions(&self) -> Dimensions {
        self.canvas.dimensions()
    }

    fn context(&mut self) -> Option<&mut dyn DrawContext> {
        if self.dimensions().is_empty() {
            None
        } else {
            Some(self as &mut dyn DrawContext)
        }
    }
}

impl DrawContext for RasterOverlaySurface {
    fn clear(&mut self) {
        for pixel in self.canvas.lock().pixels_mut() {
            *pixel = TRANSPARENT;
        }
    }

    fn draw_box(&mut self, bbox: &BoundingBox) {
        let Some(rect) = self.pixel_rect(bbox) else {
            return;
        };
        let mut canvas = self.canvas.lock();
        draw_hollow_rect_mut(&mut *canvas, rect, self.style.box_color);
        for inset in 1..BOX_THICKNESS as i32 {
            let w = rect.width() as i32 - 2 * inset;
            let h = rect.height() as i32 - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let inner = Rect::at(rect.left() + inset, rect.top() + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(&mut *canvas, inner, self.style.box_color);
        }
    }

    fn draw_text(&mut self, text: &str, anchor: TextAnchor) {
        let height = (self.style.label_scale.ceil() as u32 + 2 * LABEL_PADDING) as f64;
        let top = anchor.label_top(height, self.dimensions().height as f64);
        let bar = BoundingBox::new(
            anchor.x,
            top,
            (self.label_width(text) + 2 * LABEL_PADDING) as f64,
            height,
        );
        let Some(rect) = self.pixel_rect(&bar) else {
            return;
        };
        let mut canvas = self.canvas.lock();
        draw_filled_rect_mut(&mut *canvas, rect, self.style.box_color);

        if let Some(font) = &self.font {
            draw_text_mut(
                &mut *canvas,
                self.style.text_color,
                rect.left() + LABEL_PADDING as i32,
                rect.top() + LABEL_PADDING as i32,
                PxScale::from(self.style.label_scale),
                font,
                text,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sized_surface(w: u32, h: u32) -> RasterOverlaySurface {
        let mut surface = RasterOverlaySurface::new(OverlayStyle::default());
        surface.resize(Dimensions::new(w, h));
        surface
    }

    fn is_box_color(surface: &RasterOverlaySurface, x: u32, y: u32) -> bool {
        *surface.canvas().snapshot().get_pixel(x, y) == surface.style.box_color
    }

    #[test]
    fn test_unsized_surface_has_no_context() {
        let mut surface = RasterOverlaySurface::new(OverlayStyle::default());
        assert!(surface.context().is_none());
    }

    #[test]
    fn test_resize_creates_transparent_canvas() {
        let surface = sized_surface(40, 30);
        assert_eq!(surface.dimensions(), Dimensions::new(40, 30));
        assert!(surface.canvas().snapshot().pixels().all(|p| *p == TRANSPARENT));
    }

    #[test]
    fn test_draw_box_outlines_only() {
        let mut surface = sized_surface(50, 50);
        surface.draw_box(&BoundingBox::new(10.0, 10.0, 20.0, 20.0));

        assert!(is_box_color(&surface, 10, 10));
        assert!(is_box_color(&surface, 29, 29));
        assert!(is_box_color(&surface, 11, 15)); // second outline ring
        assert!(!is_box_color(&surface, 20, 20)); // interior untouched
    }

    #[test]
    fn test_box_outside_canvas_is_ignored() {
        let mut surface = sized_surface(20, 20);
        surface.draw_box(&BoundingBox::new(100.0, 100.0, 10.0, 10.0));
        assert!(surface.canvas().snapshot().pixels().all(|p| *p == TRANSPARENT));
    }

    #[test]
    fn test_label_bar_drawn_without_font() {
        let mut surface = sized_surface(200, 100);
        surface.draw_text(
            "male_1 (age 30)",
            TextAnchor::below(&BoundingBox::new(5.0, 10.0, 30.0, 30.0)),
        );
        assert!(is_box_color(&surface, 6, 41));
        assert!(!is_box_color(&surface, 6, 9));
    }

    #[test]
    fn test_label_flips_above_box_touching_bottom_edge() {
        let mut surface = sized_surface(200, 100);
        // Box spans y 40..100; a 20px bar below it would be off the canvas.
        surface.draw_text(
            "female_1 (age 25)",
            TextAnchor::below(&BoundingBox::new(5.0, 40.0, 60.0, 60.0)),
        );
        assert!(is_box_color(&surface, 6, 21));
        assert!(is_box_color(&surface, 6, 39));
        assert!(!is_box_color(&surface, 6, 41));
        assert!(!is_box_color(&surface, 6, 99));
    }

    #[test]
    fn test_label_above_box_stops_at_top_edge() {
        let mut surface = sized_surface(200, 30);
        surface.draw_text(
            "male_1 (age 30)",
            TextAnchor::below(&BoundingBox::new(5.0, 5.0, 30.0, 25.0)),
        );
        assert!(is_box_color(&surface, 6, 0));
        assert!(is_box_color(&surface, 6, 19));
        assert!(!is_box_color(&surface, 6, 21));
    }

    #[test]
    fn test_clear_erases_drawing() {
        let mut surface = sized_surface(50, 50);
        surface.draw_box(&BoundingBox::new(5.0, 5.0, 10.0, 10.0));
        DrawContext::clear(&mut surface);
        assert!(surface.canvas().snapshot().pixels().all(|p| *p == TRANSPARENT));
    }

    #[test]
    fn test_composite_keeps_frame_where_transparent() {
        let mut surface = sized_surface(4, 4);
        surface.draw_box(&BoundingBox::new(0.0, 0.0, 2.0, 2.0));
        let frame = Frame::new(vec![200u8; 4 * 4 * 3], 4, 4, 0);

        let composed = surface.canvas().composite_onto(&frame).unwrap();

        assert_eq!(composed.get_pixel(3, 3).0, [200, 200, 200, 255]);
        assert_eq!(*composed.get_pixel(0, 0), surface.style.box_color);
    }

    #[test]
    fn test_composite_size_mismatch() {
        let surface = sized_surface(4, 4);
        let frame = Frame::new(vec![0u8; 2 * 2 * 3], 2, 2, 0);
        assert!(matches!(
            surface.canvas().composite_onto(&frame),
            Err(SurfaceError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_save_composite_writes_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("annotated.png");
        let surface = sized_surface(8, 6);
        let frame = Frame::new(vec![10u8; 8 * 6 * 3], 8, 6, 0);

        surface.canvas().save_composite(&frame, &path).unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!(img.width(), 8);
        assert_eq!(img.height(), 6);
    }

    #[test]
    fn test_invalid_font_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("font.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        let result = RasterOverlaySurface::new(OverlayStyle::default()).with_font_file(&path);
        assert!(matches!(result, Err(SurfaceError::InvalidFont(_))));
    }
}
