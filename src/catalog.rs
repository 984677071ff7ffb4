//! The variant catalog — a data-driven table of output specifications.
//!
//! Every derivative the pipeline can produce is described by a
//! [`VariantSpec`] row: target box, retina flag, watermark flag, and the
//! human-readable size label. All of these are *stored* fields, not
//! computed at output time — deriving the label from raw dimensions with
//! ad hoc branching is exactly the class of label-mismatch bug this table
//! exists to eliminate.
//!
//! The catalog is validated once at construction and immutable afterwards.
//! Selection is a pure subset operation over the stored orientation family.

use crate::orientation::{self, Orientation, OrientationFilter};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("duplicate variant name '{0}' in catalog")]
    DuplicateName(String),
    #[error("variant '{0}' has a zero dimension")]
    ZeroDimension(String),
    #[error("variant '{name}' is stored as {stored} but {width}x{height} classifies as {derived}")]
    FamilyMismatch {
        name: String,
        stored: Orientation,
        derived: Orientation,
        width: u32,
        height: u32,
    },
    #[error("variant '{0}' has an empty size label")]
    EmptyLabel(String),
}

/// One row of the catalog: a named output specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSpec {
    /// Unique key for this variant within the catalog (e.g. `hero`).
    pub name: String,
    /// Exact output width in pixels.
    pub width: u32,
    /// Exact output height in pixels.
    pub height: u32,
    /// Higher-density variant of a base size. Drives encode quality (80
    /// instead of 90) and the watermark overlay scale.
    pub retina: bool,
    /// Whether the watermark overlay is composited onto this variant.
    pub watermark: bool,
    /// Canonical label used in output filenames: `"1920x1080"` for base
    /// sizes, `"1920x1080@2x"` for retina (base dimensions + marker).
    pub size_label: String,
    /// Orientation family, stored so selection never re-derives it.
    pub family: Orientation,
}

impl VariantSpec {
    /// Build a base (non-retina) spec with the conventional label.
    pub fn base(name: &str, width: u32, height: u32, watermark: bool) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            retina: false,
            watermark,
            size_label: format!("{width}x{height}"),
            family: orientation::classify(width, height),
        }
    }

    /// Build the retina (@2x) counterpart of a base size: double the
    /// dimensions, label of the base size plus the `@2x` marker.
    pub fn retina_of(name: &str, base_width: u32, base_height: u32, watermark: bool) -> Self {
        Self {
            name: name.to_string(),
            width: base_width * 2,
            height: base_height * 2,
            retina: true,
            watermark,
            size_label: format!("{base_width}x{base_height}@2x"),
            family: orientation::classify(base_width, base_height),
        }
    }
}

/// Immutable, validated registry of variant specs. Fixed at startup.
#[derive(Debug, Clone)]
pub struct VariantCatalog {
    specs: Vec<VariantSpec>,
}

impl VariantCatalog {
    /// Validate and seal a set of specs.
    ///
    /// Rejects duplicate names, zero dimensions, empty labels, and specs
    /// whose stored family disagrees with their own dimensions.
    pub fn new(specs: Vec<VariantSpec>) -> Result<Self, CatalogError> {
        let mut seen = std::collections::HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.name.as_str()) {
                return Err(CatalogError::DuplicateName(spec.name.clone()));
            }
            if spec.width == 0 || spec.height == 0 {
                return Err(CatalogError::ZeroDimension(spec.name.clone()));
            }
            if spec.size_label.is_empty() {
                return Err(CatalogError::EmptyLabel(spec.name.clone()));
            }
            let derived = orientation::classify(spec.width, spec.height);
            if derived != spec.family {
                return Err(CatalogError::FamilyMismatch {
                    name: spec.name.clone(),
                    stored: spec.family,
                    derived,
                    width: spec.width,
                    height: spec.height,
                });
            }
        }
        Ok(Self { specs })
    }

    /// The production catalog: horizontal hero/card pairs (the classic
    /// 1920x1080 / 400x300 set with @2x counterparts), their vertical
    /// mirrors, and a square tile pair. Every entry is watermarked.
    pub fn stock() -> Self {
        Self::new(stock_specs()).expect("stock catalog is valid by construction")
    }

    /// Select the subset of specs matching the requested orientation.
    ///
    /// `Both` returns the full catalog; `Square` returns only
    /// square-family specs.
    pub fn select(&self, filter: OrientationFilter) -> Vec<&VariantSpec> {
        self.specs
            .iter()
            .filter(|spec| filter.matches(spec.family))
            .collect()
    }

    /// All specs, in catalog order.
    pub fn specs(&self) -> &[VariantSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// The stock spec table. Kept as data so [`VariantCatalog::stock`] and the
/// generated config file share one source of truth.
pub fn stock_specs() -> Vec<VariantSpec> {
    vec![
        VariantSpec::base("hero", 1920, 1080, true),
        VariantSpec::retina_of("heroRetina", 1920, 1080, true),
        VariantSpec::base("card", 400, 300, true),
        VariantSpec::retina_of("cardRetina", 400, 300, true),
        VariantSpec::base("portrait", 1080, 1920, true),
        VariantSpec::retina_of("portraitRetina", 1080, 1920, true),
        VariantSpec::base("cardPortrait", 300, 400, true),
        VariantSpec::retina_of("cardPortraitRetina", 300, 400, true),
        VariantSpec::base("tile", 1080, 1080, true),
        VariantSpec::retina_of("tileRetina", 1080, 1080, true),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_catalog_validates() {
        let catalog = VariantCatalog::stock();
        assert_eq!(catalog.len(), 10);
    }

    #[test]
    fn stock_labels_are_stored_not_derived() {
        let catalog = VariantCatalog::stock();
        let by_name = |name: &str| {
            catalog
                .specs()
                .iter()
                .find(|s| s.name == name)
                .unwrap_or_else(|| panic!("missing {name}"))
        };

        assert_eq!(by_name("hero").size_label, "1920x1080");
        assert_eq!(by_name("heroRetina").size_label, "1920x1080@2x");
        // The retina card keeps the *base* size in its label even though
        // its output box is 800x600 — stored data, no width branching.
        assert_eq!(by_name("cardRetina").size_label, "400x300@2x");
        assert_eq!(by_name("cardRetina").width, 800);
        assert_eq!(by_name("tileRetina").size_label, "1080x1080@2x");
    }

    #[test]
    fn stock_retina_specs_double_their_base() {
        let catalog = VariantCatalog::stock();
        for (base, retina) in [
            ("hero", "heroRetina"),
            ("card", "cardRetina"),
            ("portrait", "portraitRetina"),
            ("cardPortrait", "cardPortraitRetina"),
            ("tile", "tileRetina"),
        ] {
            let b = catalog.specs().iter().find(|s| s.name == base).unwrap();
            let r = catalog.specs().iter().find(|s| s.name == retina).unwrap();
            assert!(!b.retina);
            assert!(r.retina);
            assert_eq!(r.width, b.width * 2);
            assert_eq!(r.height, b.height * 2);
            assert_eq!(r.size_label, format!("{}@2x", b.size_label));
            assert_eq!(r.family, b.family);
        }
    }

    #[test]
    fn select_horizontal_returns_only_horizontal_family() {
        let catalog = VariantCatalog::stock();
        let selected = catalog.select(OrientationFilter::Horizontal);
        let names: Vec<&str> = selected.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["hero", "heroRetina", "card", "cardRetina"]);
    }

    #[test]
    fn select_vertical_returns_only_vertical_family() {
        let catalog = VariantCatalog::stock();
        let selected = catalog.select(OrientationFilter::Vertical);
        assert!(selected.iter().all(|s| s.family == Orientation::Vertical));
        assert_eq!(selected.len(), 4);
    }

    #[test]
    fn select_square_is_its_own_family() {
        let catalog = VariantCatalog::stock();
        let names: Vec<&str> = catalog
            .select(OrientationFilter::Square)
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["tile", "tileRetina"]);
    }

    #[test]
    fn select_both_returns_full_catalog() {
        let catalog = VariantCatalog::stock();
        assert_eq!(catalog.select(OrientationFilter::Both).len(), catalog.len());
    }

    #[test]
    fn selection_is_exact_for_every_filter() {
        // The selected subset equals exactly the entries whose family
        // matches — no more, no fewer.
        let catalog = VariantCatalog::stock();
        for filter in [
            OrientationFilter::Horizontal,
            OrientationFilter::Vertical,
            OrientationFilter::Square,
            OrientationFilter::Both,
        ] {
            let selected: Vec<&str> = catalog
                .select(filter)
                .iter()
                .map(|s| s.name.as_str())
                .collect();
            let expected: Vec<&str> = catalog
                .specs()
                .iter()
                .filter(|s| filter.matches(s.family))
                .map(|s| s.name.as_str())
                .collect();
            assert_eq!(selected, expected, "filter {filter}");
        }
    }

    #[test]
    fn duplicate_name_rejected() {
        let specs = vec![
            VariantSpec::base("thumb", 100, 80, false),
            VariantSpec::base("thumb", 200, 160, false),
        ];
        assert!(matches!(
            VariantCatalog::new(specs),
            Err(CatalogError::DuplicateName(name)) if name == "thumb"
        ));
    }

    #[test]
    fn zero_dimension_rejected() {
        let mut spec = VariantSpec::base("bad", 100, 80, false);
        spec.height = 0;
        assert!(matches!(
            VariantCatalog::new(vec![spec]),
            Err(CatalogError::ZeroDimension(_))
        ));
    }

    #[test]
    fn family_mismatch_rejected() {
        let mut spec = VariantSpec::base("lying", 400, 300, false);
        spec.family = Orientation::Vertical;
        assert!(matches!(
            VariantCatalog::new(vec![spec]),
            Err(CatalogError::FamilyMismatch { .. })
        ));
    }

    #[test]
    fn empty_catalog_is_valid() {
        let catalog = VariantCatalog::new(Vec::new()).unwrap();
        assert!(catalog.is_empty());
        assert!(catalog.select(OrientationFilter::Both).is_empty());
    }
}
