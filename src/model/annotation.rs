//! Bounding box annotation type.

use serde::{Deserialize, Serialize};

use crate::constants::UNLABELED;
use crate::geometry::Rect;

/// A labelled, axis-aligned box in display coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxAnnotation {
    /// Top-left X coordinate
    pub x: f64,
    /// Top-left Y coordinate
    pub y: f64,
    /// Width of the box
    pub width: f64,
    /// Height of the box
    pub height: f64,
    /// Label name; need not match a defined label.
    pub label: String,
    /// Model confidence, present on boxes merged from an assist service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl BoxAnnotation {
    /// Create a new box with the given geometry and label.
    pub fn new(rect: Rect, label: impl Into<String>) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            label: label.into(),
            confidence: None,
        }
    }

    /// Create a box labelled [`UNLABELED`].
    pub fn unlabeled(rect: Rect) -> Self {
        Self::new(rect, UNLABELED)
    }

    pub fn with_confidence(mut self, confidence: Option<f64>) -> Self {
        self.confidence = confidence;
        self
    }

    /// The box geometry.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Overwrite the box geometry, keeping label and confidence.
    pub fn set_rect(&mut self, rect: Rect) {
        self.x = rect.x;
        self.y = rect.y;
        self.width = rect.width;
        self.height = rect.height;
    }
}

/// A box in original-image pixel coordinates, as supplied by datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginalBox {
    pub rect: Rect,
    pub label: String,
}

impl OriginalBox {
    pub fn new(rect: Rect, label: impl Into<String>) -> Self {
        Self {
            rect,
            label: label.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_round_trip() {
        let mut b = BoxAnnotation::new(Rect::new(1.0, 2.0, 3.0, 4.0), "car");
        assert_eq!(b.rect(), Rect::new(1.0, 2.0, 3.0, 4.0));

        b.set_rect(Rect::new(5.0, 6.0, -7.0, 8.0));
        assert_eq!(b.x, 5.0);
        assert_eq!(b.width, -7.0);
        assert_eq!(b.label, "car");
    }

    #[test]
    fn test_unlabeled() {
        let b = BoxAnnotation::unlabeled(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(b.label, "unlabeled");
        assert!(b.confidence.is_none());
    }
}
