pub mod aggregate;
pub mod capture;
pub mod detection;
pub mod pipeline;
pub mod rendering;
pub mod shared;
pub mod state;
pub mod status;
