//! Resource handling for the rigsheet export pipeline.
//!
//! - [`MediaResolver`]: maps stored media URLs to files under a media root
//! - [`ImageCache`]: resized, re-oriented JPEG copies of source images, cached on disk

mod error;
mod filesystem;
mod image_cache;

pub use error::CacheError;
pub use filesystem::MediaResolver;
pub use image_cache::{
    DEFAULT_IMAGE_DPI, DEFAULT_IMAGE_QUALITY, ImageCache, ImageInfo, ImagePreprocessResult,
    load_oriented, probe, target_pixels_for_bounds,
};
