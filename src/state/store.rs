//! Annotation store: images, their boxes, the shared label set and the
//! current-image pointer.
//!
//! Boxes of the current image are always reached through the store
//! ([`AnnotationStore::current_boxes`], [`AnnotationStore::boxes_of`]), never
//! through a cached reference, so removal or navigation cannot leave a stale
//! working set behind.

use thiserror::Error;

use crate::color_utils;
use crate::config::{AnnotatorConfig, LabelFallback};
use crate::constants::{DEFAULT_LABEL_COLOR, DEFAULT_MIN_BOX_SIZE, UNLABELED};
use crate::geometry::Rect;
use crate::model::{BoxAnnotation, ImageId, ImageRecord, Label};

/// Errors raised by store mutations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// No image is selected
    #[error("No current image")]
    NoCurrentImage,

    /// Box extent below the configured floor
    #[error("Box {width}x{height} is smaller than the minimum size {min_size}")]
    BoxTooSmall {
        width: f64,
        height: f64,
        min_size: f64,
    },

    /// A label with the same name (ignoring case) exists
    #[error("Label already exists: {name}")]
    DuplicateLabel { name: String },

    /// Label name is empty after trimming
    #[error("Label name is empty")]
    EmptyLabelName,

    /// No label with this name
    #[error("Label not found: {name}")]
    LabelNotFound { name: String },

    /// Image or box index outside the collection
    #[error("{kind} index {index} out of range (len {len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },
}

impl StoreError {
    /// Create an out-of-range error and log it; these indicate a caller bug.
    pub fn out_of_range(kind: &'static str, index: usize, len: usize) -> Self {
        log::error!("{} index {} out of range (len {})", kind, index, len);
        Self::IndexOutOfRange { kind, index, len }
    }

    /// Validation failures are expected user-level rejections.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NoCurrentImage
                | Self::BoxTooSmall { .. }
                | Self::DuplicateLabel { .. }
                | Self::EmptyLabelName
        )
    }
}

/// Ordered images, shared labels and the current-image pointer.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    images: Vec<ImageRecord>,
    labels: Vec<Label>,
    current: Option<usize>,
    next_id: ImageId,
    min_box_size: f64,
    label_fallback: LabelFallback,
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_BOX_SIZE, LabelFallback::default())
    }
}

impl AnnotationStore {
    /// Create an empty store.
    pub fn new(min_box_size: f64, label_fallback: LabelFallback) -> Self {
        Self {
            images: Vec::new(),
            labels: Vec::new(),
            current: None,
            next_id: 1,
            min_box_size,
            label_fallback,
        }
    }

    /// Create an empty store using the configured size floor and fallback policy.
    pub fn from_config(config: &AnnotatorConfig) -> Self {
        Self::new(config.min_box_size, config.label_fallback)
    }

    pub fn min_box_size(&self) -> f64 {
        self.min_box_size
    }

    // ========================================================================
    // Images
    // ========================================================================

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn image(&self, index: usize) -> Option<&ImageRecord> {
        self.images.get(index)
    }

    pub fn image_mut(&mut self, index: usize) -> Option<&mut ImageRecord> {
        self.images.get_mut(index)
    }

    /// Index of the image with the given id.
    pub fn find_image(&self, id: ImageId) -> Option<usize> {
        self.images.iter().position(|img| img.id == id)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_image(&self) -> Option<&ImageRecord> {
        self.current.and_then(|i| self.images.get(i))
    }

    /// Boxes of the current image; empty when nothing is selected.
    pub fn current_boxes(&self) -> &[BoxAnnotation] {
        self.current_image()
            .map(|img| img.boxes.as_slice())
            .unwrap_or(&[])
    }

    pub fn boxes_of(&self, index: usize) -> Option<&[BoxAnnotation]> {
        self.images.get(index).map(|img| img.boxes.as_slice())
    }

    /// Total number of boxes across all images.
    pub fn total_boxes(&self) -> usize {
        self.images.iter().map(|img| img.boxes.len()).sum()
    }

    /// Append an image, assigning it a fresh id. The first image becomes current.
    pub fn add_image(&mut self, mut record: ImageRecord) -> ImageId {
        record.id = self.next_id;
        self.next_id += 1;
        let id = record.id;

        log::debug!("Added image {} ({})", record.filename, id);
        self.images.push(record);
        if self.images.len() == 1 {
            self.current = Some(0);
        }
        id
    }

    pub fn set_current_image(&mut self, index: usize) -> Result<(), StoreError> {
        if index >= self.images.len() {
            return Err(StoreError::out_of_range("image", index, self.images.len()));
        }
        self.current = Some(index);
        log::debug!("Current image: {} ({})", index, self.images[index].filename);
        Ok(())
    }

    /// Remove an image, keeping the current pointer valid.
    ///
    /// Removing the current image selects the image that shifts into its
    /// slot, else the new last image, else nothing.
    pub fn remove_image(&mut self, index: usize) -> Result<ImageRecord, StoreError> {
        if index >= self.images.len() {
            return Err(StoreError::out_of_range("image", index, self.images.len()));
        }
        let removed = self.images.remove(index);
        let len = self.images.len();

        self.current = match self.current {
            _ if len == 0 => None,
            Some(cur) if cur == index => Some(index.min(len - 1)),
            Some(cur) if cur > index => Some(cur - 1),
            other => other,
        };

        log::info!(
            "Removed image {} ({} boxes), {} remaining",
            removed.filename,
            removed.boxes.len(),
            len
        );
        Ok(removed)
    }

    /// Remove every image and label.
    pub fn clear(&mut self) {
        self.images.clear();
        self.labels.clear();
        self.current = None;
    }

    // ========================================================================
    // Boxes
    // ========================================================================

    /// Append a box to the current image, returning its index.
    pub fn add_box(&mut self, annotation: BoxAnnotation) -> Result<usize, StoreError> {
        let index = self.current.ok_or(StoreError::NoCurrentImage)?;
        self.add_box_to(index, annotation)
    }

    /// Append a box to the image at `image_index`, returning the box index.
    pub fn add_box_to(
        &mut self,
        image_index: usize,
        annotation: BoxAnnotation,
    ) -> Result<usize, StoreError> {
        let len = self.images.len();
        let min_size = self.min_box_size;
        let image = self
            .images
            .get_mut(image_index)
            .ok_or_else(|| StoreError::out_of_range("image", image_index, len))?;

        if !(annotation.width >= min_size && annotation.height >= min_size) {
            log::debug!(
                "Rejected box {}x{} below minimum size {}",
                annotation.width,
                annotation.height,
                min_size
            );
            return Err(StoreError::BoxTooSmall {
                width: annotation.width,
                height: annotation.height,
                min_size,
            });
        }

        image.boxes.push(annotation);
        Ok(image.boxes.len() - 1)
    }

    /// Set the label of a box on the current image. Dangling names are allowed.
    pub fn update_box_label(&mut self, index: usize, label: &str) -> Result<(), StoreError> {
        let annotation = self.current_box_mut(index)?;
        annotation.label = label.to_string();
        log::debug!("Box {} label -> {}", index, label);
        Ok(())
    }

    /// Overwrite the geometry of a box on the current image without validation.
    pub fn set_box_rect(&mut self, index: usize, rect: Rect) -> Result<(), StoreError> {
        self.current_box_mut(index)?.set_rect(rect);
        Ok(())
    }

    /// Remove a box from the current image.
    pub fn remove_box(&mut self, index: usize) -> Result<BoxAnnotation, StoreError> {
        let image_index = self.current.ok_or(StoreError::NoCurrentImage)?;
        let boxes = &mut self.images[image_index].boxes;
        if index >= boxes.len() {
            return Err(StoreError::out_of_range("box", index, boxes.len()));
        }
        let removed = boxes.remove(index);
        log::info!("Deleted box {} ({})", index, removed.label);
        Ok(removed)
    }

    fn current_box_mut(&mut self, index: usize) -> Result<&mut BoxAnnotation, StoreError> {
        let image_index = self.current.ok_or(StoreError::NoCurrentImage)?;
        let boxes = &mut self.images[image_index].boxes;
        let len = boxes.len();
        boxes
            .get_mut(index)
            .ok_or_else(|| StoreError::out_of_range("box", index, len))
    }

    // ========================================================================
    // Labels
    // ========================================================================

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn find_label(&self, name: &str) -> Option<&Label> {
        self.labels.iter().find(|l| l.matches(name))
    }

    /// Position of a label by exact name; this is the YOLO class index.
    pub fn label_index(&self, name: &str) -> Option<usize> {
        self.labels.iter().position(|l| l.name == name)
    }

    /// Label for newly drawn boxes: the first label, or `"unlabeled"`.
    pub fn default_label(&self) -> &str {
        self.labels
            .first()
            .map(|l| l.name.as_str())
            .unwrap_or(UNLABELED)
    }

    /// Display color for a box label; dangling labels get the default color.
    pub fn label_color(&self, name: &str) -> &str {
        self.labels
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.color.as_str())
            .unwrap_or(DEFAULT_LABEL_COLOR)
    }

    /// Add a label. A color is generated when none is given.
    pub fn add_label(&mut self, name: &str, color: Option<&str>) -> Result<&Label, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyLabelName);
        }
        if self.find_label(name).is_some() {
            return Err(StoreError::DuplicateLabel {
                name: name.to_string(),
            });
        }

        let color = match color {
            Some(c) => c.to_string(),
            None => color_utils::random_label_color(),
        };
        log::info!("Added label {} ({})", name, color);
        self.labels.push(Label::new(name, color));
        Ok(&self.labels[self.labels.len() - 1])
    }

    /// Remove a label and relabel every box that used it, on every image.
    ///
    /// Returns the ids of the images whose boxes changed.
    pub fn remove_label(&mut self, name: &str) -> Result<Vec<ImageId>, StoreError> {
        let position = self
            .labels
            .iter()
            .position(|l| l.matches(name))
            .ok_or_else(|| StoreError::LabelNotFound {
                name: name.to_string(),
            })?;
        let removed = self.labels.remove(position);

        let fallback = match self.label_fallback {
            LabelFallback::Unlabeled => UNLABELED.to_string(),
            LabelFallback::FirstRemaining => self.default_label().to_string(),
        };

        let mut affected = Vec::new();
        let mut updated = 0;
        for image in &mut self.images {
            let mut touched = false;
            for annotation in image.boxes.iter_mut().filter(|b| b.label == removed.name) {
                annotation.label = fallback.clone();
                touched = true;
                updated += 1;
            }
            if touched {
                affected.push(image.id);
            }
        }

        log::info!(
            "Removed label {}: {} boxes on {} images relabeled to {}",
            removed.name,
            updated,
            affected.len(),
            fallback
        );
        Ok(affected)
    }

    /// Replace the label set with the given names, in order.
    ///
    /// Empty and duplicate names are skipped. Boxes are left untouched.
    pub fn replace_labels<S: AsRef<str>>(&mut self, names: &[S]) {
        self.labels.clear();
        for name in names {
            if let Err(e) = self.add_label(name.as_ref(), None) {
                log::warn!("Skipping label {:?}: {}", name.as_ref(), e);
            }
        }
    }
}
