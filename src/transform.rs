//! The per-variant transform: cover-crop, color adjust, composite, encode.
//!
//! [`transform`] takes one decoded source and one catalog spec and writes
//! one JPEG under `{root}/{W}x{H}/{base}_{label}_{stamp}.jpg`. The source
//! buffer is shared read-only across all variants of an image, so the
//! transform never mutates it; every step works on its own resized copy.
//!
//! The fixed color adjustment (brightness x1.1, saturation x1.2) is part
//! of the product look and deliberately not configurable per request.

use crate::catalog::VariantSpec;
use crate::watermark;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Uniform brightness multiplier applied to every variant.
const BRIGHTNESS: f32 = 1.1;
/// Uniform saturation multiplier applied to every variant.
const SATURATION: f32 = 1.2;

/// JPEG quality for retina variants (larger files, denser pixels).
const RETINA_QUALITY: u8 = 80;
/// JPEG quality for base variants.
const BASE_QUALITY: u8 = 90;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Process-wide sequence folded into output filenames so that two variants
/// written in the same millisecond still get distinct names.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Millisecond timestamp plus a monotonically increasing sequence.
pub(crate) fn unique_stamp() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{millis}-{seq}")
}

/// Apply the fixed color adjustment in place: per-channel brightness
/// multiply, then chroma scaled around the pixel's BT.601 luma.
///
/// Alpha is untouched. Channels clamp to [0, 255].
pub fn adjust_colors(image: &mut RgbaImage, brightness: f32, saturation: f32) {
    for pixel in image.pixels_mut() {
        let Rgba([r, g, b, a]) = *pixel;
        let r = r as f32 * brightness;
        let g = g as f32 * brightness;
        let b = b as f32 * brightness;

        let luma = 0.299 * r + 0.587 * g + 0.114 * b;
        let adjust = |c: f32| (luma + (c - luma) * saturation).clamp(0.0, 255.0).round() as u8;

        *pixel = Rgba([adjust(r), adjust(g), adjust(b), a]);
    }
}

/// Transform one (source, spec) pair into an output file.
///
/// Steps:
/// 1. cover-fit: scale and center-crop to exactly `spec.width x spec.height`;
/// 2. fixed color adjustment;
/// 3. if the spec wants a watermark and an overlay is available, composite
///    it alpha-over at the bottom-right corner. A `None` overlay (renderer
///    failed upstream) skips the composite — the variant still succeeds;
/// 4. JPEG encode at the spec's quality tier;
/// 5. write under the spec's `{W}x{H}` folder, creating directories.
pub fn transform(
    decoded: &DynamicImage,
    base_name: &str,
    spec: &VariantSpec,
    overlay: Option<&RgbaImage>,
    output_root: &Path,
) -> Result<PathBuf, TransformError> {
    let resized = decoded.resize_to_fill(spec.width, spec.height, FilterType::Lanczos3);
    let mut canvas = resized.to_rgba8();
    adjust_colors(&mut canvas, BRIGHTNESS, SATURATION);

    if spec.watermark {
        if let Some(mark) = overlay {
            let x = spec.width.saturating_sub(mark.width()) as i64;
            let y = spec.height.saturating_sub(mark.height()) as i64;
            image::imageops::overlay(&mut canvas, mark, x, y);
        }
    }

    let size_dir = output_root.join(format!("{}x{}", spec.width, spec.height));
    std::fs::create_dir_all(&size_dir)?;
    let output_path = size_dir.join(format!(
        "{}_{}_{}.jpg",
        base_name,
        spec.size_label,
        unique_stamp()
    ));

    let quality = if spec.retina {
        RETINA_QUALITY
    } else {
        BASE_QUALITY
    };
    let file = std::fs::File::create(&output_path)?;
    let writer = BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(writer, quality);
    // JPEG has no alpha channel; flatten before encoding.
    let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
    rgb.write_with_encoder(encoder)
        .map_err(|e| TransformError::Encode(e.to_string()))?;

    Ok(output_path)
}

/// Expected watermark overlay dimensions for a spec, used by the batch
/// processor to render each distinct overlay exactly once.
pub fn overlay_key(spec: &VariantSpec) -> (u32, bool) {
    (spec.width, spec.retina)
}
