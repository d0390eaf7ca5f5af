//! Coordinate transformation between viewport pixels, document space and PDF space
//!
//! Annotations are stored in document space: unscaled page units with a
//! top-left origin and y growing downward. Only rendering multiplies by the
//! zoom scale, so changing zoom never rewrites stored positions.

use serde::{Deserialize, Serialize};

use crate::config::ZoomConfig;

/// A pointer location in viewport pixels (e.g. `clientX`/`clientY`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportPoint {
    pub x: f64,
    pub y: f64,
}

impl ViewportPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A page-local point in document space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DocPoint {
    pub x: f64,
    pub y: f64,
}

impl DocPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Clamp both axes to be non-negative
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.max(0.0),
            y: self.y.max(0.0),
        }
    }

    pub fn offset_from(self, origin: DocPoint) -> DocPoint {
        DocPoint::new(self.x - origin.x, self.y - origin.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocSize {
    pub width: f64,
    pub height: f64,
}

impl DocSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Bounding rectangle of a DOM element in viewport pixels
/// (the shape of `getBoundingClientRect()`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Convert a viewport point to document space relative to `element`
pub fn to_document_space(point: ViewportPoint, element: &ElementRect, scale: f64) -> DocPoint {
    DocPoint {
        x: (point.x - element.left) / scale,
        y: (point.y - element.top) / scale,
    }
}

/// Convert a document-space point back to viewport pixels
pub fn to_viewport_space(point: DocPoint, element: &ElementRect, scale: f64) -> ViewportPoint {
    ViewportPoint {
        x: element.left + point.x * scale,
        y: element.top + point.y * scale,
    }
}

/// Scale a document-space length to pixels (for sizing rendered boxes)
pub fn to_viewport_length(length: f64, scale: f64) -> f64 {
    length * scale
}

/// PDF-space y of the bottom edge of a box whose top sits at document `y`.
/// PDF origin is bottom-left, document origin is top-left.
pub fn pdf_y(page_height: f64, y: f64, height: f64) -> f64 {
    page_height - y - height
}

/// Zoom level, clamped to the configured bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Zoom {
    scale: f64,
    #[serde(skip)]
    bounds: ZoomConfig,
    /// Decimal places kept after each change, enough to land exactly on
    /// `initial + k * step`
    #[serde(skip)]
    decimals: i32,
}

impl Zoom {
    pub fn new(bounds: ZoomConfig) -> Self {
        Self {
            scale: bounds.initial.clamp(bounds.min, bounds.max),
            decimals: decimals(bounds.step).max(decimals(bounds.initial)).max(1),
            bounds,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn set(&mut self, scale: f64) {
        // Rounding keeps repeated steps from drifting
        let factor = 10f64.powi(self.decimals);
        let rounded = (scale * factor).round() / factor;
        self.scale = rounded.clamp(self.bounds.min, self.bounds.max);
    }

    pub fn zoom_in(&mut self) {
        self.set(self.scale + self.bounds.step);
    }

    pub fn zoom_out(&mut self) {
        self.set(self.scale - self.bounds.step);
    }

    pub fn reset(&mut self) {
        self.scale = self.bounds.initial.clamp(self.bounds.min, self.bounds.max);
    }

    /// Rounded percentage, e.g. 150 for 1.5x
    pub fn percent(&self) -> u32 {
        (self.scale * 100.0).round() as u32
    }
}

/// Fewest decimal places (up to 6) that represent `value` exactly
fn decimals(value: f64) -> i32 {
    (0..6)
        .find(|&d| {
            let scaled = value * 10f64.powi(d);
            (scaled - scaled.round()).abs() < 1e-9
        })
        .unwrap_or(6)
}

impl Default for Zoom {
    fn default() -> Self {
        Self::new(ZoomConfig::default())
    }
}
