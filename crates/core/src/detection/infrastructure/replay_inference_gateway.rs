use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::detection::domain::face_result::RawFaceResult;
use crate::detection::domain::inference_gateway::{
    InferenceError, InferenceGateway, ModelLoadError,
};
use crate::shared::frame::Frame;

/// On-disk layout of a recording: `frames[i]` holds the faces of frame `i`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recording {
    pub frames: Vec<Vec<RawFaceResult>>,
}

impl Recording {
    fn validate(&self) -> Result<(), ModelLoadError> {
        for (index, faces) in self.frames.iter().enumerate() {
            for face in faces {
                face.validate().map_err(|e| {
                    ModelLoadError::Parse(format!("frame {index}: {e}"))
                })?;
            }
        }
        Ok(())
    }
}

enum RecordingSource {
    File(PathBuf),
    Memory(Recording),
}

/// Replays recorded face results by frame index.
///
/// Stands in for a live model: `load` reads and validates the recording
/// once, `detect` looks up `frame.index()` and returns an empty list for
/// frames the recording does not cover.
pub struct ReplayInferenceGateway {
    source: RecordingSource,
    loaded: OnceLock<Recording>,
    latency: Option<Duration>,
}

impl ReplayInferenceGateway {
    pub fn from_file(path: &Path) -> Self {
        Self {
            source: RecordingSource::File(path.to_path_buf()),
            loaded: OnceLock::new(),
            latency: None,
        }
    }

    pub fn from_recording(recording: Recording) -> Self {
        Self {
            source: RecordingSource::Memory(recording),
            loaded: OnceLock::new(),
            latency: None,
        }
    }

    /// Delays every `detect` call, approximating model inference time.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    async fn read_recording(&self) -> Result<Recording, ModelLoadError> {
        match &self.source {
            RecordingSource::File(path) => {
                let json = tokio::fs::read_to_string(path).await?;
                serde_json::from_str(&json).map_err(|e| {
                    ModelLoadError::Parse(format!("{}: {e}", path.display()))
                })
            }
            RecordingSource::Memory(recording) => Ok(recording.clone()),
        }
    }
}

#[async_trait]
impl InferenceGateway for ReplayInferenceGateway {
    async fn load(&self) -> Result<(), ModelLoadError> {
        if self.is_loaded() {
            return Ok(());
        }
        let recording = self.read_recording().await?;
        recording.validate()?;
        log::debug!("Loaded recording with {} frame(s)", recording.frames.len());
        // A concurrent load may have won the race; both parsed the same data.
        let _ = self.loaded.set(recording);
        Ok(())
    }

    async fn detect(&self, frame: &Frame) -> Result<Vec<RawFaceResult>, InferenceError> {
        let recording = self.loaded.get().ok_or(InferenceError::NotLoaded)?;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(recording
            .frames
            .get(frame.index())
            .cloned()
            .unwrap_or_default())
    }
}
