//! Pipeline configuration.
//!
//! All tunables live in one immutable [`PipelineConfig`] value handed to
//! the batch processor at construction — there are no global mutable
//! catalog or base-path constants. Tests inject a minimal synthetic
//! catalog; production uses the stock one.
//!
//! The config round-trips through TOML so deployments can pin a custom
//! catalog, storage root, font, thread cap, or timeout in a file:
//!
//! ```toml
//! storage_root = "/var/tmp/processed_images"
//! font_path = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"
//! threads = 4
//! timeout_secs = 120
//!
//! [[catalog]]
//! name = "hero"
//! width = 1920
//! height = 1080
//! retina = false
//! watermark = true
//! size_label = "1920x1080"
//! family = "horizontal"
//! ```

use crate::catalog::{self, CatalogError, VariantCatalog, VariantSpec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Immutable configuration for a batch processor instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Root directory batches write their dated scratch trees under.
    pub storage_root: PathBuf,
    /// Explicit watermark font. `None` falls back to common system fonts.
    pub font_path: Option<PathBuf>,
    /// Worker thread cap. `None` uses all available cores.
    pub threads: Option<usize>,
    /// Hard per-batch timeout. `None` disables the deadline.
    pub timeout_secs: Option<u64>,
    /// The variant catalog, validated when the processor is built.
    pub catalog: Vec<VariantSpec>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            storage_root: std::env::temp_dir().join("processed_images"),
            font_path: None,
            threads: None,
            timeout_secs: None,
            catalog: catalog::stock_specs(),
        }
    }
}

impl PipelineConfig {
    /// Load from a TOML file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate the configured specs into an immutable catalog.
    pub fn build_catalog(&self) -> Result<VariantCatalog, CatalogError> {
        VariantCatalog::new(self.catalog.clone())
    }
}

/// Number of worker threads to use.
///
/// - `None` → all available cores
/// - `Some(n)` → `min(n, cores)` (users can constrain down, not up)
pub fn effective_threads(config: &PipelineConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.threads.map(|n| n.min(cores).max(1)).unwrap_or(cores)
}

/// The stock config rendered as documented TOML, for `derivia gen-config`.
pub fn stock_config_toml() -> String {
    let stock = PipelineConfig::default();
    let body = toml::to_string_pretty(&stock).unwrap_or_default();
    format!(
        "# derivia pipeline configuration\n\
         #\n\
         # storage_root: batches write {{date}}/{{stamp}}/{{WxH}}/ trees here\n\
         # font_path:    TTF/OTF used for the watermark overlay (optional)\n\
         # threads:      worker cap, at most the machine's core count\n\
         # timeout_secs: hard batch deadline; completed variants still return\n\
         # catalog:      one [[catalog]] table per variant\n\n{body}"
    )
}
