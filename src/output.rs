//! CLI output formatting for batch runs.
//!
//! Two surfaces:
//!
//! - [`format_event`] renders one progress event as it arrives. Events come
//!   from parallel workers, so every event formats to self-contained lines
//!   that read sensibly in any interleaving — source-level lines flush left,
//!   per-variant lines indented and prefixed with their source name.
//! - [`format_outcome`] renders the final per-image summary once the batch
//!   has finished, in input order.
//!
//! ```text
//! Processing 2 images x 4 variants
//!     photo.jpg hero: 1920x1080/photo_1920x1080_1712-0.jpg
//!     photo.jpg card: 400x300/photo_400x300_1712-1.jpg
//! corrupt.jpg: failed: failed to decode /tmp/corrupt.jpg
//!
//! photo.jpg (horizontal): 4/4 variants
//! corrupt.jpg: failed: failed to decode /tmp/corrupt.jpg
//! Wrote 4 files under /tmp/processed_images/2026-08-23/1712-2
//! ```
//!
//! Each formatter is a pure function returning `Vec<String>` for
//! testability; `print_*` wrappers write to stdout.

use crate::process::{BatchOutcome, ImageResult, ProcessEvent, VariantResult};
use std::path::Path;

/// Render one progress event as display lines.
pub fn format_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::BatchStarted { sources, variants } => {
            vec![format!("Processing {sources} images x {variants} variants")]
        }
        ProcessEvent::SourceDecoded { name, orientation } => {
            vec![format!("{name}: decoded ({orientation})")]
        }
        ProcessEvent::SourceFailed { name, error } => {
            vec![format!("{name}: failed: {error}")]
        }
        ProcessEvent::VariantWritten {
            name,
            variant,
            path,
        } => {
            vec![format!("    {name} {variant}: {}", short_path(path))]
        }
        ProcessEvent::VariantFailed {
            name,
            variant,
            error,
        } => {
            vec![format!("    {name} {variant}: failed: {error}")]
        }
        ProcessEvent::WatermarkUnavailable { error } => {
            vec![format!("Watermark disabled: {error}")]
        }
        ProcessEvent::SourceCleaned { name } => {
            vec![format!("{name}: temp upload removed")]
        }
        ProcessEvent::CleanupFailed { path, error } => {
            vec![format!("Cleanup failed for {}: {error}", path.display())]
        }
        ProcessEvent::TimedOut => {
            vec!["Timeout reached, remaining variants skipped".to_string()]
        }
        ProcessEvent::ArchiveBuilt { path } => {
            vec![format!("Archive: {}", path.display())]
        }
        ProcessEvent::ArchiveFailed { error } => {
            vec![format!("Archive failed: {error}")]
        }
    }
}

/// Render the final batch summary, one line per image plus a totals line.
pub fn format_outcome(outcome: &BatchOutcome) -> Vec<String> {
    let mut lines: Vec<String> = outcome.images.iter().map(image_summary).collect();

    let written: usize = outcome
        .images
        .iter()
        .map(|image| {
            image
                .variants
                .values()
                .filter(|v| v.is_success())
                .count()
        })
        .sum();
    let suffix = if outcome.timed_out { " (timed out)" } else { "" };
    lines.push(format!(
        "Wrote {written} files under {}{suffix}",
        outcome.output_root.display()
    ));
    lines
}

/// One summary line per image: name, orientation, success ratio or error.
fn image_summary(image: &ImageResult) -> String {
    if let Some(error) = &image.error {
        return format!("{}: failed: {error}", image.original_name);
    }
    let ok = image
        .variants
        .values()
        .filter(|v| v.is_success())
        .count();
    let orientation = image
        .orientation
        .map(|o| o.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "{} ({orientation}): {ok}/{} variants",
        image.original_name,
        image.variants.len()
    )
}

/// Show output paths relative to their size folder; full paths are in the
/// JSON result for anything that needs them.
fn short_path(path: &Path) -> String {
    let mut tail: Vec<String> = path
        .iter()
        .rev()
        .take(2)
        .map(|c| c.to_string_lossy().into_owned())
        .collect();
    tail.reverse();
    tail.join("/")
}

pub fn print_event(event: &ProcessEvent) {
    for line in format_event(event) {
        println!("{}", line);
    }
}

pub fn print_outcome(outcome: &BatchOutcome) {
    for line in format_outcome(outcome) {
        println!("{}", line);
    }
}

/// Did every attempted variant of every image succeed?
///
/// Drives the CLI exit code: partial output is still exit 1 so scripts
/// notice, even though the result JSON carries the detail.
pub fn outcome_is_clean(outcome: &BatchOutcome) -> bool {
    !outcome.timed_out
        && outcome.images.iter().all(|image| {
            image.error.is_none() && image.variants.values().all(VariantResult::is_success)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::Orientation;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn success(path: &str) -> VariantResult {
        VariantResult::Success {
            path: PathBuf::from(path),
        }
    }

    fn sample_outcome() -> BatchOutcome {
        let mut good_variants = BTreeMap::new();
        good_variants.insert(
            "hero".to_string(),
            success("/out/1920x1080/photo_1920x1080_1-0.jpg"),
        );
        good_variants.insert(
            "card".to_string(),
            VariantResult::Failure {
                error: "disk full".to_string(),
            },
        );

        BatchOutcome {
            images: vec![
                ImageResult {
                    original_name: "photo.jpg".to_string(),
                    orientation: Some(Orientation::Horizontal),
                    variants: good_variants,
                    error: None,
                },
                ImageResult {
                    original_name: "corrupt.jpg".to_string(),
                    orientation: None,
                    variants: BTreeMap::new(),
                    error: Some("failed to decode corrupt.jpg".to_string()),
                },
            ],
            output_root: PathBuf::from("/out"),
            timed_out: false,
        }
    }

    #[test]
    fn event_batch_started() {
        let lines = format_event(&ProcessEvent::BatchStarted {
            sources: 3,
            variants: 4,
        });
        assert_eq!(lines, vec!["Processing 3 images x 4 variants"]);
    }

    #[test]
    fn event_variant_written_shows_size_folder_and_file() {
        let lines = format_event(&ProcessEvent::VariantWritten {
            name: "photo.jpg".to_string(),
            variant: "hero".to_string(),
            path: PathBuf::from("/store/2026-08-23/1-0/1920x1080/photo_1920x1080_2-1.jpg"),
        });
        assert_eq!(
            lines,
            vec!["    photo.jpg hero: 1920x1080/photo_1920x1080_2-1.jpg"]
        );
    }

    #[test]
    fn event_variant_failed_is_indented_with_error() {
        let lines = format_event(&ProcessEvent::VariantFailed {
            name: "photo.jpg".to_string(),
            variant: "card".to_string(),
            error: "disk full".to_string(),
        });
        assert_eq!(lines, vec!["    photo.jpg card: failed: disk full"]);
    }

    #[test]
    fn outcome_summary_counts_and_errors() {
        let lines = format_outcome(&sample_outcome());
        assert_eq!(
            lines,
            vec![
                "photo.jpg (horizontal): 1/2 variants",
                "corrupt.jpg: failed: failed to decode corrupt.jpg",
                "Wrote 1 files under /out",
            ]
        );
    }

    #[test]
    fn outcome_summary_flags_timeout() {
        let mut outcome = sample_outcome();
        outcome.timed_out = true;
        let last = format_outcome(&outcome).pop().unwrap();
        assert_eq!(last, "Wrote 1 files under /out (timed out)");
    }

    #[test]
    fn clean_outcome_requires_full_success() {
        assert!(!outcome_is_clean(&sample_outcome()));

        let mut variants = BTreeMap::new();
        variants.insert("hero".to_string(), success("/out/h.jpg"));
        let clean = BatchOutcome {
            images: vec![ImageResult {
                original_name: "photo.jpg".to_string(),
                orientation: Some(Orientation::Horizontal),
                variants,
                error: None,
            }],
            output_root: PathBuf::from("/out"),
            timed_out: false,
        };
        assert!(outcome_is_clean(&clean));

        let mut timed = clean.clone();
        timed.timed_out = true;
        assert!(!outcome_is_clean(&timed));
    }
}
