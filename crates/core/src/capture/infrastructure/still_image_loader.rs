use std::path::Path;

use thiserror::Error;

use crate::shared::config::DetectorConfig;
use crate::shared::constants::{ALLOWED_IMAGE_TYPES, MAX_IMAGE_BYTES};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("file size {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
    #[error("file type not supported ({0}); please upload a JPEG or PNG")]
    UnsupportedType(String),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

/// Validates and decodes a single uploaded still image.
///
/// The type check looks at the file's leading bytes, not its extension.
pub struct StillImageLoader {
    max_bytes: u64,
}

impl StillImageLoader {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(config.max_image_bytes)
    }

    pub fn load(&self, path: &Path) -> Result<Frame, UploadError> {
        let size = std::fs::metadata(path)?.len();
        self.check_size(size)?;
        let bytes = std::fs::read(path)?;
        self.decode(&bytes)
    }

    pub fn load_bytes(&self, bytes: &[u8]) -> Result<Frame, UploadError> {
        self.check_size(bytes.len() as u64)?;
        self.decode(bytes)
    }

    /// Returns the detected MIME type if it is one we accept.
    pub fn detect_type(bytes: &[u8]) -> Result<&'static str, UploadError> {
        let mime = image::guess_format(bytes)
            .map(|format| format.to_mime_type())
            .unwrap_or("application/octet-stream");
        if ALLOWED_IMAGE_TYPES.contains(&mime) {
            Ok(mime)
        } else {
            Err(UploadError::UnsupportedType(mime.to_string()))
        }
    }

    fn check_size(&self, size: u64) -> Result<(), UploadError> {
        if size > self.max_bytes {
            return Err(UploadError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Frame, UploadError> {
        let mime = Self::detect_type(bytes)?;
        log::debug!("Decoding {mime} upload ({} bytes)", bytes.len());
        let image = image::load_from_memory(bytes)?.to_rgb8();
        Ok(Frame::from_rgb_image(image, 0))
    }
}

impl Default for StillImageLoader {
    fn default() -> Self {
        Self::new(MAX_IMAGE_BYTES)
    }
}
