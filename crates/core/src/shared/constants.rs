use std::time::Duration;

/// Live cadence: one detection cycle every half second.
pub const DETECTION_INTERVAL: Duration = Duration::from_millis(500);

/// Expressions whose dominant probability falls below this are not labelled.
pub const MIN_EXPRESSION_PROBABILITY: f64 = 0.05;

/// Upload size limit for still images (5 MiB).
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png"];

/// Default label text height in pixels.
pub const DEFAULT_LABEL_SCALE: f32 = 16.0;
