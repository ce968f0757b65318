//! Generic JSON format implementation.
//!
//! One document holds the label set and, per image, its boxes as integer
//! corner coordinates in original image pixels:
//!
//! ```json
//! {
//!   "labels": [{ "name": "car", "color": "#FF0000" }],
//!   "annotations_by_image": [{
//!     "filename": "a.jpg", "width": 1280, "height": 960,
//!     "boxes": [{ "x_min": 200, "y_min": 200, "x_max": 400, "y_max": 400, "label": "car" }]
//!   }]
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::UNLABELED;
use crate::format::error::FormatError;
use crate::format::traits::{
    AnnotationFormat, ExportOptions, ExportResult, ExportedFile, FormatWarning, ImportOptions,
    ImportResult,
};
use crate::geometry::{self, Rect};
use crate::model::{BoxAnnotation, ImageRecord};
use crate::state::{AnnotationStore, StoreError};

/// Top-level generic JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericDocument {
    #[serde(default)]
    pub labels: Vec<LabelEntry>,
    pub annotations_by_image: Vec<ImageAnnotations>,
}

/// A label and its color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEntry {
    pub name: String,
    pub color: String,
}

/// Boxes of one image in original pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnnotations {
    #[serde(alias = "image_filename")]
    pub filename: String,
    #[serde(alias = "image_width")]
    pub width: u32,
    #[serde(alias = "image_height")]
    pub height: u32,
    #[serde(default)]
    pub boxes: Vec<BoxEntry>,
}

/// A box as integer corners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxEntry {
    #[serde(deserialize_with = "rounded")]
    pub x_min: i64,
    #[serde(deserialize_with = "rounded")]
    pub y_min: i64,
    #[serde(deserialize_with = "rounded")]
    pub x_max: i64,
    #[serde(deserialize_with = "rounded")]
    pub y_max: i64,
    #[serde(default = "unlabeled")]
    pub label: String,
}

fn unlabeled() -> String {
    UNLABELED.to_string()
}

/// Accept integer or fractional coordinates, rounding the latter.
fn rounded<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = f64::deserialize(deserializer)?;
    Ok(value.round() as i64)
}

/// Convert a display-space box to clamped integer corners in original space.
///
/// Returns `None` when the clamped extent is zero or negative.
pub fn to_original_corners(annotation: &BoxAnnotation, image: &ImageRecord) -> Option<BoxEntry> {
    let scale = image.scale_ratio;
    let max_w = i64::from(image.original_width);
    let max_h = i64::from(image.original_height);

    let round = |v: f64| geometry::to_original(v, scale).round() as i64;
    let x_min = round(annotation.x).clamp(0, max_w);
    let y_min = round(annotation.y).clamp(0, max_h);
    let x_max = round(annotation.x + annotation.width).min(max_w).max(x_min);
    let y_max = round(annotation.y + annotation.height).min(max_h).max(y_min);

    if x_max <= x_min || y_max <= y_min {
        return None;
    }

    let label = if annotation.label.is_empty() {
        unlabeled()
    } else {
        annotation.label.clone()
    };
    Some(BoxEntry {
        x_min,
        y_min,
        x_max,
        y_max,
        label,
    })
}

/// Build the generic document for every decoded image in the store.
pub fn build_document(store: &AnnotationStore, result: &mut ExportResult) -> GenericDocument {
    let labels = store
        .labels()
        .iter()
        .map(|l| LabelEntry {
            name: l.name.clone(),
            color: l.color.clone(),
        })
        .collect();

    let mut annotations_by_image = Vec::with_capacity(store.len());
    for image in store.images() {
        if !image.is_ready() {
            result.add_warning(
                FormatWarning::warning("Image not decoded yet, skipped").with_image(&image.filename),
            );
            result.images_skipped += 1;
            continue;
        }

        let mut boxes = Vec::with_capacity(image.boxes.len());
        for annotation in &image.boxes {
            match to_original_corners(annotation, image) {
                Some(entry) => boxes.push(entry),
                None => {
                    log::warn!(
                        "Filtering out zero-area box after clamping for image {}: {:?}",
                        image.filename,
                        annotation
                    );
                    result.add_warning(
                        FormatWarning::warning("Dropped zero-area box after clamping")
                            .with_image(&image.filename),
                    );
                    result.boxes_skipped += 1;
                }
            }
        }

        result.annotations_exported += boxes.len();
        result.images_exported += 1;
        annotations_by_image.push(ImageAnnotations {
            filename: image.filename.clone(),
            width: image.original_width,
            height: image.original_height,
            boxes,
        });
    }

    GenericDocument {
        labels,
        annotations_by_image,
    }
}

/// Default export file name, `annotations_<unix millis>.json`.
pub fn timestamped_file_name() -> String {
    let millis = web_time::SystemTime::now()
        .duration_since(web_time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("annotations_{}.json", millis)
}

/// Generic JSON format.
///
/// Supports:
/// - Label names and colors
/// - Bounding boxes as integer corners in original pixels
/// - Import back into display space
pub struct GenericJsonFormat;

impl AnnotationFormat for GenericJsonFormat {
    fn id(&self) -> &'static str {
        "json"
    }

    fn display_name(&self) -> &'static str {
        "Generic JSON"
    }

    fn extensions(&self) -> &[&'static str] {
        &["json"]
    }

    fn supports_per_image(&self) -> bool {
        false
    }

    fn export(
        &self,
        store: &AnnotationStore,
        options: &ExportOptions,
    ) -> Result<ExportResult, FormatError> {
        if store.is_empty() {
            return Err(FormatError::NoImages);
        }
        if store.total_boxes() == 0 {
            log::warn!("No annotations have been made, exporting empty structure");
        }

        let mut result = ExportResult::new();
        let document = build_document(store, &mut result);
        let json = serde_json::to_string_pretty(&document)?;

        let name = options
            .file_name
            .clone()
            .unwrap_or_else(timestamped_file_name);
        result
            .files
            .push(ExportedFile::new(name, "application/json", json));

        log::info!(
            "Exported {} images with {} annotations ({} boxes dropped)",
            result.images_exported,
            result.annotations_exported,
            result.boxes_skipped
        );
        Ok(result)
    }

    fn import(
        &self,
        content: &str,
        store: &mut AnnotationStore,
        options: &ImportOptions,
    ) -> Result<ImportResult, FormatError> {
        let document: GenericDocument = serde_json::from_str(content)?;
        let mut result = ImportResult::default();

        if !options.merge {
            store.clear();
        }

        for label in &document.labels {
            match store.add_label(&label.name, Some(label.color.as_str())) {
                Ok(_) => result.labels_imported += 1,
                Err(e) => result
                    .warnings
                    .push(FormatWarning::warning(format!("Label skipped: {}", e))),
            }
        }

        for entry in document.annotations_by_image {
            let record = ImageRecord::decoded(
                entry.filename.as_str(),
                entry.filename.as_str(),
                entry.width,
                entry.height,
                options.max_display,
            );
            let scale = record.scale_ratio;
            store.add_image(record);
            let index = store.len() - 1;

            for b in &entry.boxes {
                let rect = Rect::new(
                    b.x_min as f64,
                    b.y_min as f64,
                    (b.x_max - b.x_min) as f64,
                    (b.y_max - b.y_min) as f64,
                )
                .map(|v| geometry::to_display(v, scale));

                match store.add_box_to(index, BoxAnnotation::new(rect, b.label.as_str())) {
                    Ok(_) => result.annotations_imported += 1,
                    Err(e @ StoreError::BoxTooSmall { .. }) => result.warnings.push(
                        FormatWarning::warning(format!("Box skipped: {}", e))
                            .with_image(&entry.filename),
                    ),
                    Err(e) => return Err(FormatError::invalid_format(e.to_string())),
                }
            }
            result.images_imported += 1;
        }

        log::info!(
            "Imported {} images with {} annotations and {} labels",
            result.images_imported,
            result.annotations_imported,
            result.labels_imported
        );
        Ok(result)
    }
}
