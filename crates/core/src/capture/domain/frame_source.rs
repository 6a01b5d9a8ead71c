use std::path::PathBuf;

use thiserror::Error;

use crate::shared::frame::{Dimensions, Frame};

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("no image frames found in {0}")]
    Empty(PathBuf),
}

/// A live feed of frames with fixed pixel dimensions.
///
/// `grab` returns `Ok(None)` once the feed has ended; that is not an error.
pub trait FrameSource: Send {
    fn dimensions(&self) -> Dimensions;

    fn grab(&mut self) -> Result<Option<Frame>, CaptureError>;
}
