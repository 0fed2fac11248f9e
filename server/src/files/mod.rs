//! Uploaded image storage.

pub mod image;

pub use image::{ImageError, ImageMetadata, ImageService, MAX_IMAGE_SIZE};
