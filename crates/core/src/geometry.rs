//! Rectangles in inches and the unit conversions the readers need.

use serde::{Deserialize, Serialize};

/// English Metric Units per inch (OOXML positions).
pub const EMU_PER_INCH: f64 = 914_400.0;

/// Master units per inch (legacy PPT anchors).
pub const MASTER_UNITS_PER_INCH: f64 = 576.0;

/// Convert an EMU value to inches.
pub fn emu_to_inches(emu: i64) -> f64 {
    emu as f64 / EMU_PER_INCH
}

/// Convert a legacy master-unit value to inches.
pub fn master_units_to_inches(units: i32) -> f64 {
    units as f64 / MASTER_UNITS_PER_INCH
}

/// An axis-aligned rectangle given by its two corners, in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Rect {
    /// Create a rectangle from its corners.
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Create a rectangle from a top-left origin and a size.
    pub fn from_origin_size(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self::new(left, top, left + width, top + height)
    }

    /// Strict open-interval overlap test.
    ///
    /// Rectangles that only share an edge (or a corner) do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x_min < other.x_max
            && self.x_max > other.x_min
            && self.y_min < other.y_max
            && self.y_max > other.y_min
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "X:{:.2}~{:.2}, Y:{:.2}~{:.2}",
            self.x_min, self.x_max, self.y_min, self.y_max
        )
    }
}
