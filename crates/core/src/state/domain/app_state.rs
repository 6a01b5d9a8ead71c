use serde::{Deserialize, Serialize};

use crate::aggregate::domain::session_aggregate::GenderCount;
use crate::status::domain::detection_status::DetectionStatus;

/// Application-wide state shared between the pipeline and its front end.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub is_streaming: bool,
    pub image_source: Option<String>,
    pub detection_status: Option<DetectionStatus>,
    pub gender_count: GenderCount,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AppAction {
    StartWebcam,
    StopWebcam,
    SetImageSource(Option<String>),
    SetDetectionStatus(DetectionStatus),
    ClearDetectionStatus,
    SetGenderCount(GenderCount),
}

impl AppAction {
    /// Short tag used when logging dispatched actions.
    pub fn name(&self) -> &'static str {
        match self {
            AppAction::StartWebcam => "start_webcam",
            AppAction::StopWebcam => "stop_webcam",
            AppAction::SetImageSource(_) => "set_image_source",
            AppAction::SetDetectionStatus(_) => "set_detection_status",
            AppAction::ClearDetectionStatus => "clear_detection_status",
            AppAction::SetGenderCount(_) => "set_gender_count",
        }
    }
}

pub fn reduce(state: &AppState, action: &AppAction) -> AppState {
    let mut next = state.clone();
    match action {
        AppAction::StartWebcam => next.is_streaming = true,
        AppAction::StopWebcam => next.is_streaming = false,
        AppAction::SetImageSource(source) => next.image_source = source.clone(),
        AppAction::SetDetectionStatus(status) => next.detection_status = Some(status.clone()),
        AppAction::ClearDetectionStatus => next.detection_status = None,
        AppAction::SetGenderCount(count) => next.gender_count = *count,
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::domain::detection_status::DetectionOutcome;
    use chrono::{DateTime, Utc};

    fn status() -> DetectionStatus {
        DetectionStatus::new(
            DetectionOutcome::FacesDetected(1),
            DateTime::<Utc>::UNIX_EPOCH,
            Some(true),
        )
    }

    #[test]
    fn test_initial_state() {
        let state = AppState::default();
        assert!(!state.is_streaming);
        assert!(state.image_source.is_none());
        assert!(state.detection_status.is_none());
        assert_eq!(state.gender_count, GenderCount::new(0, 0));
    }

    #[test]
    fn test_streaming_toggles() {
        let started = reduce(&AppState::default(), &AppAction::StartWebcam);
        assert!(started.is_streaming);
        let stopped = reduce(&started, &AppAction::StopWebcam);
        assert!(!stopped.is_streaming);
    }

    #[test]
    fn test_status_set_and_cleared() {
        let with_status = reduce(&AppState::default(), &AppAction::SetDetectionStatus(status()));
        assert_eq!(with_status.detection_status, Some(status()));
        let cleared = reduce(&with_status, &AppAction::ClearDetectionStatus);
        assert!(cleared.detection_status.is_none());
    }

    #[test]
    fn test_reduce_leaves_input_untouched() {
        let before = AppState::default();
        let after = reduce(&before, &AppAction::SetGenderCount(GenderCount::new(2, 3)));
        assert_eq!(before.gender_count, GenderCount::default());
        assert_eq!(after.gender_count, GenderCount::new(2, 3));
    }

    #[test]
    fn test_image_source_replaced() {
        let state = reduce(
            &AppState::default(),
            &AppAction::SetImageSource(Some("photo.png".into())),
        );
        assert_eq!(state.image_source.as_deref(), Some("photo.png"));
        let state = reduce(&state, &AppAction::SetImageSource(None));
        assert!(state.image_source.is_none());
    }
}
