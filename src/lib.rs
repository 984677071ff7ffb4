//! # Derivia
//!
//! A batch image derivation pipeline. One run takes a set of source photos
//! and produces a fixed catalog of product-ready JPEG derivatives: resized,
//! cover-cropped, color-graded, and watermarked, one output file per
//! (source, variant) pair, optionally packed into a single zip archive.
//!
//! # Architecture: One Batch, Fanned Out
//!
//! A batch flows through a fixed sequence with two fan-out points:
//!
//! ```text
//! validate → select variants (orientation filter, once per batch)
//!          → render watermark overlays (once per distinct size)
//!          → per source (parallel): decode → classify
//!              → per variant (parallel): resize → grade → composite → encode
//!          → collect results (input order) → [archive]
//! ```
//!
//! Failure is contained at the smallest useful unit: a broken variant
//! occupies its result slot without touching siblings, a broken source
//! fails alone with an empty variant map, and only a fault on the shared
//! output root aborts the batch. The outcome is always a plain value —
//! callers branch on data, not on caught panics.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`catalog`] | Variant specifications: the stock catalog, validation, orientation selection |
//! | [`orientation`] | Aspect-ratio classification and the request-level orientation filter |
//! | [`watermark`] | Text normalization and overlay rendering (fixed canvas, scaled per target) |
//! | [`transform`] | The per-variant transform: cover-crop, color grade, composite, JPEG encode |
//! | [`process`] | Batch orchestration: parallel fan-out, failure isolation, timeout, cleanup |
//! | [`archive`] | Zip assembly of a finished output tree |
//! | [`config`] | The immutable [`config::PipelineConfig`] and its TOML loading |
//! | [`output`] | CLI output formatting for progress events and batch summaries |
//!
//! # Design Decisions
//!
//! ## Results Are Data
//!
//! Every per-image and per-variant outcome is a serializable value
//! ([`process::BatchOutcome`] down to [`process::VariantResult`]). The CLI
//! prints it and exits nonzero on partial failure; embedding callers get
//! the same structure as JSON. Nothing about a single bad upload is
//! exceptional enough to unwind a batch.
//!
//! ## Fixed Look, Injected Config
//!
//! The color grade (brightness x1.1, saturation x1.2), the watermark
//! canvas, and the quality tiers are product constants. Everything
//! deployment-shaped — storage root, font, thread cap, timeout, and the
//! catalog itself — lives in one immutable [`config::PipelineConfig`]
//! handed to the processor at construction. No globals, so tests run
//! against tiny synthetic catalogs in temp dirs.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, Lanczos3 resampling, compositing, and JPEG encoding all come
//! from the `image`/`imageproc` stack. No ImageMagick, no system codecs;
//! the binary is self-contained.

pub mod archive;
pub mod catalog;
pub mod config;
pub mod orientation;
pub mod output;
pub mod process;
pub mod transform;
pub mod watermark;

#[cfg(test)]
pub(crate) mod test_helpers;
