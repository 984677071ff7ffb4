//! Watermark text normalization and overlay rendering.
//!
//! The overlay is rasterized text on a fixed 500x100 logical canvas
//! (white, 50% alpha, 48px), then scaled down to the variant's overlay
//! width — half the target width for retina variants, 30% otherwise —
//! preserving aspect ratio. The overlay lives entirely in memory as an
//! [`RgbaImage`], so there is no temporary file to release and concurrent
//! renders cannot collide on disk.
//!
//! Rendering needs a TTF/OTF font. The renderer loads it from a configured
//! path or falls back to a short list of common system locations; when no
//! font is available the transformer logs the failure and produces
//! un-watermarked output rather than failing the variant.

use ab_glyph::{FontVec, PxScale};
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Logical canvas the text is laid out on before scaling.
pub const CANVAS_WIDTH: u32 = 500;
pub const CANVAS_HEIGHT: u32 = 100;

const FONT_SIZE: f32 = 48.0;
const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 128]);

/// Fallback font locations tried when no font path is configured.
const DEFAULT_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
];

#[derive(Error, Debug)]
pub enum WatermarkError {
    #[error("failed to read font {path}: {source}")]
    FontRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("font {path} could not be parsed")]
    FontParse { path: PathBuf },
    #[error("no usable watermark font found in default locations")]
    NoDefaultFont,
}

/// Normalize watermark text: trim, then prepend the copyright sign unless
/// the trimmed text already starts with one.
///
/// Idempotent — normalizing twice yields the same string. Shared by every
/// caller that touches watermark text; nothing else prepends the sign.
pub fn normalize(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with('©') {
        trimmed.to_string()
    } else {
        format!("© {trimmed}")
    }
}

/// Width of the overlay for a given target width.
///
/// Retina variants get a proportionally larger mark (half the target
/// width); base variants get 30%. Never returns zero.
pub fn overlay_width(target_width: u32, retina: bool) -> u32 {
    let w = if retina {
        target_width / 2
    } else {
        target_width * 3 / 10
    };
    w.max(1)
}

/// Rasterizes normalized watermark text into in-memory overlays.
pub struct Renderer {
    font: FontVec,
}

impl Renderer {
    /// Load the renderer from an explicit font file.
    pub fn from_font_file(path: &Path) -> Result<Self, WatermarkError> {
        let bytes = std::fs::read(path).map_err(|source| WatermarkError::FontRead {
            path: path.to_path_buf(),
            source,
        })?;
        let font = FontVec::try_from_vec(bytes).map_err(|_| WatermarkError::FontParse {
            path: path.to_path_buf(),
        })?;
        Ok(Self { font })
    }

    /// Load from the configured path if given, otherwise try the default
    /// system font locations in order.
    pub fn from_config(font_path: Option<&Path>) -> Result<Self, WatermarkError> {
        if let Some(path) = font_path {
            return Self::from_font_file(path);
        }
        for candidate in DEFAULT_FONT_CANDIDATES {
            let path = Path::new(candidate);
            if path.is_file() {
                if let Ok(renderer) = Self::from_font_file(path) {
                    return Ok(renderer);
                }
            }
        }
        Err(WatermarkError::NoDefaultFont)
    }

    /// Render `text` as an overlay sized for a variant of `target_width`.
    ///
    /// The text is centered on the logical canvas, then the canvas is
    /// scaled to [`overlay_width`] with the matching proportional height
    /// (fit inside, aspect preserved).
    pub fn render(&self, text: &str, target_width: u32, retina: bool) -> RgbaImage {
        let mut canvas = RgbaImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, Rgba([0, 0, 0, 0]));
        let scale = PxScale::from(FONT_SIZE);

        let (text_w, text_h) = text_size(scale, &self.font, text);
        let x = CANVAS_WIDTH.saturating_sub(text_w) / 2;
        let y = CANVAS_HEIGHT.saturating_sub(text_h) / 2;
        draw_text_mut(
            &mut canvas,
            TEXT_COLOR,
            x as i32,
            y as i32,
            scale,
            &self.font,
            text,
        );

        let out_w = overlay_width(target_width, retina);
        let out_h = ((CANVAS_HEIGHT as f64 * out_w as f64 / CANVAS_WIDTH as f64).round() as u32)
            .max(1);
        image::imageops::resize(&canvas, out_w, out_h, FilterType::Lanczos3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_prepends_copyright_sign() {
        assert_eq!(normalize("Acme"), "© Acme");
    }

    #[test]
    fn normalize_trims_whitespace() {
        assert_eq!(normalize("  Acme  "), "© Acme");
    }

    #[test]
    fn normalize_keeps_existing_sign() {
        assert_eq!(normalize("© Acme"), "© Acme");
        assert_eq!(normalize("  © Acme "), "© Acme");
        assert_eq!(normalize("©Acme"), "©Acme");
    }

    #[test]
    fn normalize_is_idempotent() {
        for input in ["Acme", " Acme Studios ", "© Already", "©tight"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input {input:?}");
            assert!(once.starts_with('©'));
        }
    }

    #[test]
    fn overlay_width_base_is_thirty_percent() {
        assert_eq!(overlay_width(1920, false), 576);
        assert_eq!(overlay_width(400, false), 120);
    }

    #[test]
    fn overlay_width_retina_is_half() {
        assert_eq!(overlay_width(3840, true), 1920);
        assert_eq!(overlay_width(800, true), 400);
    }

    #[test]
    fn overlay_width_never_zero() {
        assert_eq!(overlay_width(1, false), 1);
        assert_eq!(overlay_width(1, true), 1);
    }

    #[test]
    fn missing_font_file_errors() {
        let err = Renderer::from_font_file(Path::new("/nonexistent/font.ttf"));
        assert!(matches!(err, Err(WatermarkError::FontRead { .. })));
    }

    #[test]
    fn bogus_font_data_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("fake.ttf");
        std::fs::write(&path, b"not a font at all").unwrap();
        let err = Renderer::from_font_file(&path);
        assert!(matches!(err, Err(WatermarkError::FontParse { .. })));
    }

    #[test]
    fn render_produces_scaled_overlay_when_font_available() {
        // Only runs where a default system font exists; the pipeline
        // itself treats a missing font as a logged skip.
        let Ok(renderer) = Renderer::from_config(None) else {
            return;
        };
        let overlay = renderer.render("© Acme", 1920, false);
        assert_eq!(overlay.width(), 576);
        assert_eq!(overlay.height(), 115); // 100 * 576/500, rounded

        let retina = renderer.render("© Acme", 3840, true);
        assert_eq!(retina.width(), 1920);
        assert_eq!(retina.height(), 384);
    }
}
