pub mod raster_overlay_surface;
pub mod recording_surface;
