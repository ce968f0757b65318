//! Per-image record: source, dimensions, scale and boxes.

use serde::{Deserialize, Serialize};

use crate::geometry::{self, Bounds};
use crate::model::{BoxAnnotation, OriginalBox};

/// Stable identifier for an image; indices shift when images are removed.
pub type ImageId = u64;

/// Whether the pixel data of an image has finished decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecodeStatus {
    /// Waiting for the decoder; dimensions are unknown.
    #[default]
    Pending,
    /// Dimensions known and interaction allowed.
    Ready,
}

/// One loaded image and its boxes (display space).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Stable identifier assigned by the store.
    pub id: ImageId,
    /// Where the image came from (path, URL, data reference).
    pub source_ref: String,
    /// File name used for exports.
    pub filename: String,
    pub original_width: u32,
    pub original_height: u32,
    /// Original-to-display factor, always positive and finite.
    pub scale_ratio: f64,
    /// Boxes in display coordinates.
    pub boxes: Vec<BoxAnnotation>,
    #[serde(default)]
    pub status: DecodeStatus,
    /// Boxes in original coordinates waiting for decode to learn the scale.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_boxes: Vec<OriginalBox>,
}

impl ImageRecord {
    /// Create a record whose pixels have not been decoded yet.
    pub fn pending(source_ref: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            id: 0,
            source_ref: source_ref.into(),
            filename: filename.into(),
            original_width: 0,
            original_height: 0,
            scale_ratio: 1.0,
            boxes: Vec::new(),
            status: DecodeStatus::Pending,
            pending_boxes: Vec::new(),
        }
    }

    /// Create a decoded record, computing the scale ratio from the display cap.
    pub fn decoded(
        source_ref: impl Into<String>,
        filename: impl Into<String>,
        width: u32,
        height: u32,
        max_display: Bounds,
    ) -> Self {
        let mut record = Self::pending(source_ref, filename);
        record.apply_dimensions(width, height, max_display);
        record
    }

    /// Attach original-space boxes to be converted once the image is decoded.
    pub fn with_pending_boxes(mut self, boxes: Vec<OriginalBox>) -> Self {
        self.pending_boxes = boxes;
        self
    }

    /// Record decoded dimensions, derive the scale and mark the image ready.
    ///
    /// Pending original-space boxes are left in place; see
    /// [`ImageRecord::take_pending_boxes`].
    pub fn apply_dimensions(&mut self, width: u32, height: u32, max_display: Bounds) {
        self.original_width = width;
        self.original_height = height;
        self.scale_ratio = geometry::compute_scale_ratio(
            f64::from(width),
            f64::from(height),
            max_display.width,
            max_display.height,
        );
        self.status = DecodeStatus::Ready;
    }

    /// Remove and return the boxes waiting for the scale to be known.
    pub fn take_pending_boxes(&mut self) -> Vec<OriginalBox> {
        std::mem::take(&mut self.pending_boxes)
    }

    pub fn is_ready(&self) -> bool {
        self.status == DecodeStatus::Ready
    }

    /// Size of the display canvas: original size times scale, rounded.
    pub fn display_bounds(&self) -> Bounds {
        Bounds::new(
            (f64::from(self.original_width) * self.scale_ratio).round(),
            (f64::from(self.original_height) * self.scale_ratio).round(),
        )
    }
}
