pub mod detection_status;
pub mod status_reporter;
