pub mod session_aggregate;
