pub mod image_sequence_source;
pub mod still_image_loader;
