use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::state::domain::app_state::AppAction;
use crate::state::domain::state_store::StateStore;

use super::detection_status::{DetectionOutcome, DetectionStatus};

/// Turns outcomes into [`DetectionStatus`] records and publishes them.
///
/// Remembers the last model-readiness flag so that cycle outcomes report
/// whether the model was ready when they ran.
pub struct StatusReporter {
    store: Arc<dyn StateStore>,
    model_loaded: Option<bool>,
}

impl StatusReporter {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            model_loaded: None,
        }
    }

    pub fn report(&mut self, outcome: DetectionOutcome) -> DetectionStatus {
        self.report_at(outcome, Utc::now())
    }

    pub fn report_at(&mut self, outcome: DetectionOutcome, now: DateTime<Utc>) -> DetectionStatus {
        if let Some(flag) = outcome.model_loaded_override() {
            self.model_loaded = Some(flag);
        }
        let status = DetectionStatus::new(outcome, now, self.model_loaded);
        log::debug!("Status: {}", status.message);
        self.store
            .dispatch(AppAction::SetDetectionStatus(status.clone()));
        status
    }

    pub fn clear(&self) {
        self.store.dispatch(AppAction::ClearDetectionStatus);
    }

    pub fn model_loaded(&self) -> Option<bool> {
        self.model_loaded
    }
}
