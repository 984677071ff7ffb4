//! Batch orchestration: sources x catalog → structured results.
//!
//! The processor owns the request lifecycle described by the per-source
//! state machine: `Uploaded → Decoded → {per variant: Selected → Resized →
//! (Watermarked | Skipped) → Encoded → Written}* → TempCleaned`. Failures
//! are caught at the smallest granularity that still allows forward
//! progress:
//!
//! - a variant transform failure is recorded in that variant's slot and
//!   never aborts sibling variants or sibling sources;
//! - a source decode failure marks the whole image failed and skips its
//!   variant loop; the batch continues;
//! - an IO fault on the shared output root aborts the batch.
//!
//! Nothing retries automatically. Sources and variants run on the rayon
//! pool; variants of one source share the decoded buffer read-only and
//! write disjoint files. Watermark overlays are rendered once per distinct
//! (width, retina) pair before the parallel loop starts.
//!
//! Progress is reported as typed [`ProcessEvent`]s over an optional mpsc
//! channel; the `output` module renders them for the CLI.

use crate::archive::{self, ArchiveError};
use crate::catalog::{CatalogError, VariantCatalog, VariantSpec};
use crate::config::PipelineConfig;
use crate::orientation::{self, Orientation, OrientationFilter};
use crate::transform;
use crate::watermark::{self, Renderer};
use image::{DynamicImage, ImageReader, RgbaImage};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("no source images supplied")]
    NoSources,
    #[error("watermark text is required")]
    EmptyWatermark,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One uploaded source as handed over by the boundary layer.
#[derive(Debug, Clone)]
pub struct SourceUpload {
    /// The name the file was uploaded under; keys the result entry.
    pub original_name: String,
    /// Where the readable image data lives.
    pub path: PathBuf,
    /// Delete `path` once this source's variant loop has finished,
    /// success or failure. Set for per-request temp copies.
    pub remove_after: bool,
}

impl SourceUpload {
    /// A source the caller keeps (no cleanup), named after its file name.
    pub fn keep(path: PathBuf) -> Self {
        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            original_name,
            path,
            remove_after: false,
        }
    }
}

/// Result of one (source, variant) pair — a tagged union, never a panic
/// or an exception crossing the orchestration boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VariantResult {
    Success { path: PathBuf },
    Failure { error: String },
}

impl VariantResult {
    pub fn is_success(&self) -> bool {
        matches!(self, VariantResult::Success { .. })
    }
}

/// Per-image entry in the batch result, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct ImageResult {
    pub original_name: String,
    /// Derived orientation; absent when the source failed to decode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    /// One slot per attempted variant, keyed by catalog name. Variants
    /// excluded by the orientation filter are omitted, not marked skipped.
    pub variants: BTreeMap<String, VariantResult>,
    /// Whole-image failure (decode); set only when the source itself
    /// failed, in which case `variants` is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate result of a batch run. JSON-serializable for the boundary.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub images: Vec<ImageResult>,
    /// Scratch root the variants were written under.
    pub output_root: PathBuf,
    /// Set when the deadline cut the batch short; completed variant
    /// results are still present, unstarted ones are omitted.
    pub timed_out: bool,
}

/// A batch run plus its archive step. The archive failing does not
/// invalidate the per-image results.
#[derive(Debug)]
pub struct ArchivedOutcome {
    pub batch: BatchOutcome,
    pub archive: Result<PathBuf, ArchiveError>,
}

/// Typed progress events, sent over an optional channel as work proceeds.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    BatchStarted { sources: usize, variants: usize },
    SourceDecoded { name: String, orientation: Orientation },
    SourceFailed { name: String, error: String },
    VariantWritten { name: String, variant: String, path: PathBuf },
    VariantFailed { name: String, variant: String, error: String },
    WatermarkUnavailable { error: String },
    SourceCleaned { name: String },
    CleanupFailed { path: PathBuf, error: String },
    TimedOut,
    ArchiveBuilt { path: PathBuf },
    ArchiveFailed { error: String },
}

/// Orchestrates a batch against an immutable config and catalog.
pub struct BatchProcessor {
    config: PipelineConfig,
    catalog: VariantCatalog,
    events: Option<Sender<ProcessEvent>>,
}

impl BatchProcessor {
    /// Validate the configured catalog and build a processor.
    pub fn new(config: PipelineConfig) -> Result<Self, CatalogError> {
        let catalog = config.build_catalog()?;
        Ok(Self {
            config,
            catalog,
            events: None,
        })
    }

    /// Attach a progress event channel.
    pub fn with_events(mut self, events: Sender<ProcessEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn catalog(&self) -> &VariantCatalog {
        &self.catalog
    }

    fn emit(&self, event: ProcessEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// Run a batch, writing under a fresh dated scratch root.
    ///
    /// Validation happens before the root is created, so a rejected
    /// request leaves no empty scratch directory behind.
    pub fn run(
        &self,
        sources: &[SourceUpload],
        watermark_text: &str,
        filter: OrientationFilter,
    ) -> Result<BatchOutcome, BatchError> {
        validate_request(sources, watermark_text)?;
        let output_root = self.create_output_root()?;
        self.run_in(&output_root, sources, watermark_text, filter)
    }

    /// Run a batch into a caller-provided output root.
    ///
    /// The root must already exist; `run` is the common entry point, this
    /// one exists for callers (and tests) that manage scratch space
    /// themselves.
    pub fn run_in(
        &self,
        output_root: &Path,
        sources: &[SourceUpload],
        watermark_text: &str,
        filter: OrientationFilter,
    ) -> Result<BatchOutcome, BatchError> {
        validate_request(sources, watermark_text)?;

        let text = watermark::normalize(watermark_text);
        let selected = self.catalog.select(filter);
        self.emit(ProcessEvent::BatchStarted {
            sources: sources.len(),
            variants: selected.len(),
        });

        let overlays = self.render_overlays(&text, &selected);
        let deadline = self
            .config
            .timeout_secs
            .map(|secs| Instant::now() + Duration::from_secs(secs));
        let timed_out = AtomicBool::new(false);

        let images: Vec<ImageResult> = sources
            .par_iter()
            .map(|source| {
                self.process_source(source, &selected, &overlays, output_root, deadline, &timed_out)
            })
            .collect();

        Ok(BatchOutcome {
            images,
            output_root: output_root.to_path_buf(),
            timed_out: timed_out.load(Ordering::Relaxed),
        })
    }

    /// Run a batch, then assemble the scratch tree into a single zip.
    ///
    /// The archive step is a full barrier: it starts only after every
    /// (source, variant) pair has finished. On success the scratch root
    /// is deleted; the archive file is the caller's to delete after
    /// delivery. An archive failure leaves the batch results valid.
    pub fn run_archived(
        &self,
        sources: &[SourceUpload],
        watermark_text: &str,
        filter: OrientationFilter,
    ) -> Result<ArchivedOutcome, BatchError> {
        let batch = self.run(sources, watermark_text, filter)?;

        let archive_path = batch.output_root.with_extension("zip");
        let archive = archive::build(&batch.output_root, &archive_path);
        match &archive {
            Ok(path) => {
                self.emit(ProcessEvent::ArchiveBuilt { path: path.clone() });
                if let Err(e) = std::fs::remove_dir_all(&batch.output_root) {
                    self.emit(ProcessEvent::CleanupFailed {
                        path: batch.output_root.clone(),
                        error: e.to_string(),
                    });
                }
            }
            Err(e) => self.emit(ProcessEvent::ArchiveFailed {
                error: e.to_string(),
            }),
        }

        Ok(ArchivedOutcome { batch, archive })
    }

    /// Create `{storage_root}/{YYYY-MM-DD}/{stamp}` for this batch.
    fn create_output_root(&self) -> Result<PathBuf, BatchError> {
        let date = chrono::Local::now().format("%Y-%m-%d").to_string();
        let root = self
            .config
            .storage_root
            .join(date)
            .join(transform::unique_stamp());
        std::fs::create_dir_all(&root)?;
        Ok(root)
    }

    /// Render each distinct overlay size exactly once, up front.
    ///
    /// Renderer failure (usually no usable font) downgrades to an event:
    /// the batch proceeds and produces un-watermarked variants.
    fn render_overlays(
        &self,
        text: &str,
        selected: &[&VariantSpec],
    ) -> HashMap<(u32, bool), RgbaImage> {
        let needed: HashSet<(u32, bool)> = selected
            .iter()
            .filter(|spec| spec.watermark)
            .map(|spec| transform::overlay_key(spec))
            .collect();
        if needed.is_empty() {
            return HashMap::new();
        }

        let renderer = match Renderer::from_config(self.config.font_path.as_deref()) {
            Ok(renderer) => renderer,
            Err(e) => {
                self.emit(ProcessEvent::WatermarkUnavailable {
                    error: e.to_string(),
                });
                return HashMap::new();
            }
        };

        needed
            .into_iter()
            .map(|(width, retina)| ((width, retina), renderer.render(text, width, retina)))
            .collect()
    }

    fn process_source(
        &self,
        source: &SourceUpload,
        selected: &[&VariantSpec],
        overlays: &HashMap<(u32, bool), RgbaImage>,
        output_root: &Path,
        deadline: Option<Instant>,
        timed_out: &AtomicBool,
    ) -> ImageResult {
        let decoded = match decode_source(&source.path) {
            Ok(decoded) => decoded,
            Err(error) => {
                self.emit(ProcessEvent::SourceFailed {
                    name: source.original_name.clone(),
                    error: error.clone(),
                });
                self.cleanup_source(source);
                return ImageResult {
                    original_name: source.original_name.clone(),
                    orientation: None,
                    variants: BTreeMap::new(),
                    error: Some(error),
                };
            }
        };

        let family = orientation::classify(decoded.width(), decoded.height());
        self.emit(ProcessEvent::SourceDecoded {
            name: source.original_name.clone(),
            orientation: family,
        });

        let base_name = Path::new(&source.original_name)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.original_name.clone());

        let variants: BTreeMap<String, VariantResult> = selected
            .par_iter()
            .filter_map(|spec| {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    if !timed_out.swap(true, Ordering::Relaxed) {
                        self.emit(ProcessEvent::TimedOut);
                    }
                    return None;
                }
                let overlay = if spec.watermark {
                    overlays.get(&transform::overlay_key(spec))
                } else {
                    None
                };
                let result =
                    match transform::transform(&decoded, &base_name, spec, overlay, output_root) {
                        Ok(path) => {
                            self.emit(ProcessEvent::VariantWritten {
                                name: source.original_name.clone(),
                                variant: spec.name.clone(),
                                path: path.clone(),
                            });
                            VariantResult::Success { path }
                        }
                        Err(e) => {
                            let error = e.to_string();
                            self.emit(ProcessEvent::VariantFailed {
                                name: source.original_name.clone(),
                                variant: spec.name.clone(),
                                error: error.clone(),
                            });
                            VariantResult::Failure { error }
                        }
                    };
                Some((spec.name.clone(), result))
            })
            .collect();

        self.cleanup_source(source);

        ImageResult {
            original_name: source.original_name.clone(),
            orientation: Some(family),
            variants,
            error: None,
        }
    }

    /// Remove the per-request temp upload once its variant loop is done.
    fn cleanup_source(&self, source: &SourceUpload) {
        if !source.remove_after {
            return;
        }
        match std::fs::remove_file(&source.path) {
            Ok(()) => self.emit(ProcessEvent::SourceCleaned {
                name: source.original_name.clone(),
            }),
            Err(e) => self.emit(ProcessEvent::CleanupFailed {
                path: source.path.clone(),
                error: e.to_string(),
            }),
        }
    }
}

fn validate_request(sources: &[SourceUpload], watermark_text: &str) -> Result<(), BatchError> {
    if sources.is_empty() {
        return Err(BatchError::NoSources);
    }
    if watermark_text.trim().is_empty() {
        return Err(BatchError::EmptyWatermark);
    }
    Ok(())
}

/// Decode one source image, probing the real format from its bytes rather
/// than trusting the uploaded extension.
fn decode_source(path: &Path) -> Result<DynamicImage, String> {
    ImageReader::open(path)
        .map_err(|e| format!("failed to open {}: {e}", path.display()))?
        .with_guessed_format()
        .map_err(|e| format!("failed to probe {}: {e}", path.display()))?
        .decode()
        .map_err(|e| format!("failed to decode {}: {e}", path.display()))
}
