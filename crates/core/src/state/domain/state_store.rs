use super::app_state::{AppAction, AppState};

/// Outward publish / inward read boundary to the application state.
///
/// The pipeline only ever dispatches actions; it reads a snapshot once, when
/// a live session starts, to pick up the carried-over gender count.
pub trait StateStore: Send + Sync {
    fn dispatch(&self, action: AppAction);

    fn snapshot(&self) -> AppState;
}
