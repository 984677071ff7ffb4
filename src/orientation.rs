//! Orientation classification and request filtering.
//!
//! Every source image and every catalog entry belongs to exactly one
//! orientation family, derived from a strict width-vs-height comparison.
//! The same three families drive catalog selection: a request carries an
//! [`OrientationFilter`] and only variants of the matching family are
//! generated (`both` selects the full catalog).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Orientation family of an image or a variant spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
    Square,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Horizontal => write!(f, "horizontal"),
            Orientation::Vertical => write!(f, "vertical"),
            Orientation::Square => write!(f, "square"),
        }
    }
}

/// Classify dimensions into an orientation family using strict comparison.
///
/// Pure function, no I/O:
/// - width > height → `Horizontal`
/// - height > width → `Vertical`
/// - equal → `Square`
pub fn classify(width: u32, height: u32) -> Orientation {
    if width > height {
        Orientation::Horizontal
    } else if height > width {
        Orientation::Vertical
    } else {
        Orientation::Square
    }
}

/// Which orientation families a request wants generated.
///
/// `Both` is the default and selects the entire catalog; `Square` selects
/// only square-family specs (it is its own family, not part of "both sides").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrientationFilter {
    Horizontal,
    Vertical,
    Square,
    #[default]
    Both,
}

impl OrientationFilter {
    /// Whether a spec of the given family survives this filter.
    pub fn matches(self, family: Orientation) -> bool {
        match self {
            OrientationFilter::Both => true,
            OrientationFilter::Horizontal => family == Orientation::Horizontal,
            OrientationFilter::Vertical => family == Orientation::Vertical,
            OrientationFilter::Square => family == Orientation::Square,
        }
    }
}

impl fmt::Display for OrientationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrientationFilter::Horizontal => write!(f, "horizontal"),
            OrientationFilter::Vertical => write!(f, "vertical"),
            OrientationFilter::Square => write!(f, "square"),
            OrientationFilter::Both => write!(f, "both"),
        }
    }
}

impl FromStr for OrientationFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "horizontal" => Ok(OrientationFilter::Horizontal),
            "vertical" => Ok(OrientationFilter::Vertical),
            "square" => Ok(OrientationFilter::Square),
            "both" => Ok(OrientationFilter::Both),
            other => Err(format!(
                "unknown orientation filter '{other}' (expected horizontal, vertical, square, or both)"
            )),
        }
    }
}
