pub mod cycle_logger;
pub mod detection_cycle;
pub mod detection_scheduler;
