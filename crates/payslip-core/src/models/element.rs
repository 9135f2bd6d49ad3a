//! Positioned text produced by OCR or native text extraction.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in page coordinates (origin top-left, y grows down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn min_x(&self) -> f32 {
        self.x
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn min_y(&self) -> f32 {
        self.y
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    /// Smallest rectangle covering both rectangles.
    pub fn union(&self, other: &Rect) -> Rect {
        let min_x = self.min_x().min(other.min_x());
        let min_y = self.min_y().min(other.min_y());
        let max_x = self.max_x().max(other.max_x());
        let max_y = self.max_y().max(other.max_y());
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Check if the horizontal extents of two rectangles intersect.
    pub fn overlaps_horizontally(&self, other: &Rect) -> bool {
        self.min_x() < other.max_x() && other.min_x() < self.max_x()
    }
}

/// A unit of recognized text with its position and confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    /// Recognized text content.
    pub text: String,

    /// Bounding box in page coordinates.
    #[serde(alias = "boundingBox")]
    pub bbox: Rect,

    /// Zero-based page index.
    #[serde(default, alias = "pageIndex")]
    pub page: usize,

    /// Recognition confidence (0.0 - 1.0). Native text is 1.0.
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

impl TextElement {
    pub fn new(text: impl Into<String>, bbox: Rect, page: usize, confidence: f32) -> Self {
        Self {
            text: text.into(),
            bbox,
            page,
            confidence,
        }
    }

    /// Whether the element carries any non-whitespace text.
    pub fn is_usable(&self) -> bool {
        !self.text.trim().is_empty()
    }
}
