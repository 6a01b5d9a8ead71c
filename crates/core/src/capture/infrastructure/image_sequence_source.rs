use std::path::{Path, PathBuf};

use image::imageops::FilterType;

use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::{Dimensions, Frame};

/// Plays a directory of still images back as a live feed.
///
/// Files are taken in name order. The first image fixes the feed's
/// dimensions; later images of a different size are resized to match.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
    dimensions: Dimensions,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path) -> Result<Self, CaptureError> {
        let entries = std::fs::read_dir(dir).map_err(|source| CaptureError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_image_file(path))
            .collect();
        paths.sort();

        let first = paths
            .first()
            .ok_or_else(|| CaptureError::Empty(dir.to_path_buf()))?;
        let (width, height) =
            image::image_dimensions(first).map_err(|source| CaptureError::Decode {
                path: first.clone(),
                source,
            })?;

        log::info!(
            "Opened image sequence {} ({} frames, {width}x{height})",
            dir.display(),
            paths.len()
        );

        Ok(Self {
            paths,
            next: 0,
            dimensions: Dimensions::new(width, height),
        })
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageSequenceSource {
    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    fn grab(&mut self) -> Result<Option<Frame>, CaptureError> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        // Advance first so an undecodable file is skipped on the next grab.
        let index = self.next;
        self.next += 1;

        let mut image = image::open(path)
            .map_err(|source| CaptureError::Decode {
                path: path.clone(),
                source,
            })?
            .to_rgb8();

        let Dimensions { width, height } = self.dimensions;
        if image.dimensions() != (width, height) {
            log::debug!(
                "Resizing {} from {:?} to {width}x{height}",
                path.display(),
                image.dimensions()
            );
            image = image::imageops::resize(&image, width, height, FilterType::Triangle);
        }

        Ok(Some(Frame::from_rgb_image(image, index)))
    }
}
