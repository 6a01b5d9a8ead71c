pub mod app_state;
pub mod state_store;
