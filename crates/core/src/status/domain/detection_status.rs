use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What just happened in the model lifecycle or a detection cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionOutcome {
    ModelLoading,
    ModelLoaded,
    ModelLoadFailed,
    DetectionStarted,
    FacesDetected(usize),
    NoFacesDetected,
    DetectionError,
    ImageLoadFailed,
}

impl DetectionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            DetectionOutcome::ModelLoaded
                | DetectionOutcome::DetectionStarted
                | DetectionOutcome::FacesDetected(_)
        )
    }

    pub fn message(&self) -> String {
        match self {
            DetectionOutcome::ModelLoading => "Loading face detection models...".into(),
            DetectionOutcome::ModelLoaded => "Models loaded successfully".into(),
            DetectionOutcome::ModelLoadFailed => "Failed to load face detection models".into(),
            DetectionOutcome::DetectionStarted => "Face detection started".into(),
            DetectionOutcome::FacesDetected(n) => format!("Detected {n} face(s)"),
            DetectionOutcome::NoFacesDetected => "No faces detected in the image".into(),
            DetectionOutcome::DetectionError => "Error during face detection".into(),
            DetectionOutcome::ImageLoadFailed => "Failed to upload image".into(),
        }
    }

    /// Model-lifecycle outcomes carry their own readiness flag; everything
    /// else inherits the last known one.
    pub(crate) fn model_loaded_override(&self) -> Option<bool> {
        match self {
            DetectionOutcome::ModelLoading | DetectionOutcome::ModelLoadFailed => Some(false),
            DetectionOutcome::ModelLoaded => Some(true),
            _ => None,
        }
    }
}

/// Published, human-readable outcome record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionStatus {
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_model_loaded: Option<bool>,
}

impl DetectionStatus {
    pub fn new(
        outcome: DetectionOutcome,
        timestamp: DateTime<Utc>,
        is_model_loaded: Option<bool>,
    ) -> Self {
        Self {
            success: outcome.is_success(),
            message: outcome.message(),
            timestamp,
            is_model_loaded,
        }
    }
}
