//! Shared helpers for unit tests. Compiled only under `cfg(test)`.

use image::{DynamicImage, Rgb, RgbImage};
use std::path::Path;

/// An in-memory photo-like gradient image.
pub(crate) fn synthetic_photo(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    DynamicImage::ImageRgb8(img)
}

/// Write a small valid JPEG with the given dimensions.
pub(crate) fn write_synthetic_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    synthetic_photo(width, height).save(path).unwrap();
}
