use std::sync::{Arc, Mutex, PoisonError};

use crate::rendering::domain::overlay_surface::{DrawContext, OverlaySurface, TextAnchor};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Dimensions;

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCall {
    Clear,
    Box(BoundingBox),
    Text(String, TextAnchor),
}

/// Shared view of the calls a [`RecordingSurface`] has received.
///
/// Stays readable after the surface itself has been boxed and handed to the
/// pipeline.
#[derive(Clone, Debug, Default)]
pub struct DrawJournal {
    calls: Arc<Mutex<Vec<DrawCall>>>,
}

impl DrawJournal {
    pub fn calls(&self) -> Vec<DrawCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn boxes(&self) -> Vec<BoundingBox> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DrawCall::Box(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DrawCall::Text(t, _) => Some(t),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: DrawCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

/// Headless surface that records draw calls instead of rasterising them.
pub struct RecordingSurface {
    dimensions: Dimensions,
    available: bool,
    journal: DrawJournal,
}

impl RecordingSurface {
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            available: true,
            journal: DrawJournal::default(),
        }
    }

    /// A surface whose drawing context can never be obtained.
    pub fn unavailable() -> Self {
        Self {
            dimensions: Dimensions::default(),
            available: false,
            journal: DrawJournal::default(),
        }
    }

    pub fn journal(&self) -> DrawJournal {
        self.journal.clone()
    }
}

impl OverlaySurface for RecordingSurface {
    fn resize(&mut self, dimensions: Dimensions) {
        self.dimensions = dimensions;
    }

    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    fn context(&mut self) -> Option<&mut dyn DrawContext> {
        if self.available {
            Some(self as &mut dyn DrawContext)
        } else {
            None
        }
    }
}

impl DrawContext for RecordingSurface {
    fn clear(&mut self) {
        self.journal.push(DrawCall::Clear);
    }

    fn draw_box(&mut self, bbox: &BoundingBox) {
        self.journal.push(DrawCall::Box(*bbox));
    }

    fn draw_text(&mut self, text: &str, anchor: TextAnchor) {
        self.journal.push(DrawCall::Text(text.to_string(), anchor));
    }
}
