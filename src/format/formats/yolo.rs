//! YOLO TXT format implementation.
//!
//! Implements the YOLO annotation format, which uses one text file per image
//! with normalized bounding box coordinates:
//!
//! ```text
//! <class_index> <x_center> <y_center> <width> <height>
//! ```
//!
//! Class indices are positions in the label list.

use std::collections::{HashMap, HashSet};

use crate::format::error::FormatError;
use crate::format::traits::{
    AnnotationFormat, ExportOptions, ExportResult, ExportedFile, FormatWarning,
};
use crate::geometry::{self, Rect};
use crate::model::{BoxAnnotation, ImageRecord, OriginalBox};
use crate::state::AnnotationStore;

/// YOLO TXT format.
///
/// Supports:
/// - Bounding boxes only (normalized center coordinates)
/// - Per-image annotation files
///
/// Boxes whose label is not defined are skipped with a warning, as are
/// boxes that normalize to a zero or invalid extent.
pub struct YoloFormat;

impl AnnotationFormat for YoloFormat {
    fn id(&self) -> &'static str {
        "yolo"
    }

    fn display_name(&self) -> &'static str {
        "YOLO (TXT)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["txt"]
    }

    fn supports_per_image(&self) -> bool {
        true
    }

    fn export(
        &self,
        store: &AnnotationStore,
        _options: &ExportOptions,
    ) -> Result<ExportResult, FormatError> {
        if store.labels().is_empty() {
            return Err(FormatError::no_labels("YOLO"));
        }
        if store.is_empty() {
            return Err(FormatError::NoImages);
        }

        let class_index: HashMap<&str, usize> = store
            .labels()
            .iter()
            .enumerate()
            .map(|(idx, l)| (l.name.as_str(), idx))
            .collect();
        log::debug!("Label map for YOLO export: {:?}", class_index);

        let mut result = ExportResult::new();
        let mut written: HashSet<String> = HashSet::new();

        for image in store.images() {
            // Images that never had boxes are neither exported nor skipped
            if image.boxes.is_empty() {
                continue;
            }

            let mut content = String::new();
            let mut valid = 0;
            for annotation in &image.boxes {
                let Some(&class_idx) = class_index.get(annotation.label.as_str()) else {
                    log::warn!(
                        "Skipping box: label {:?} not defined (image {})",
                        annotation.label,
                        image.filename
                    );
                    result.add_warning(
                        FormatWarning::warning(format!(
                            "Label '{}' not defined, box skipped",
                            annotation.label
                        ))
                        .with_image(&image.filename),
                    );
                    result.boxes_skipped += 1;
                    continue;
                };

                match yolo_line(class_idx, annotation, image) {
                    Some(line) => {
                        content.push_str(&line);
                        content.push('\n');
                        valid += 1;
                    }
                    None => {
                        log::error!(
                            "Invalid YOLO values for box {:?} in image {} ({}x{}), skipping",
                            annotation,
                            image.filename,
                            image.original_width,
                            image.original_height
                        );
                        result.add_warning(
                            FormatWarning::error("Box has invalid normalized extent, skipped")
                                .with_image(&image.filename),
                        );
                        result.boxes_skipped += 1;
                    }
                }
            }

            if valid > 0 {
                let name = format!("{}.txt", base_name(&image.filename));
                if !written.insert(name.clone()) {
                    log::warn!("{} is produced by more than one image ({})", name, image.filename);
                    result.add_warning(
                        FormatWarning::warning(format!(
                            "Label file '{}' shared with another image",
                            name
                        ))
                        .with_image(&image.filename),
                    );
                }
                result.files.push(ExportedFile::new(name, "text/plain", content));
                result.images_exported += 1;
                result.annotations_exported += valid;
            } else {
                log::warn!(
                    "No valid YOLO annotations for image {} (all {} boxes skipped)",
                    image.filename,
                    image.boxes.len()
                );
                result.images_skipped += 1;
            }
        }

        log::info!(
            "Exported {} YOLO files with {} annotations ({} images skipped, {} boxes skipped)",
            result.images_exported,
            result.annotations_exported,
            result.images_skipped,
            result.boxes_skipped
        );
        Ok(result)
    }
}

/// Format one box as a YOLO line, or `None` if the image has no usable
/// dimensions or the normalized extent is zero, negative or NaN.
pub fn yolo_line(class_idx: usize, annotation: &BoxAnnotation, image: &ImageRecord) -> Option<String> {
    if image.original_width == 0 || image.original_height == 0 {
        return None;
    }
    let img_w = f64::from(image.original_width);
    let img_h = f64::from(image.original_height);

    let o = annotation
        .rect()
        .map(|v| geometry::to_original(v, image.scale_ratio));
    let cx = (o.x + o.width / 2.0) / img_w;
    let cy = (o.y + o.height / 2.0) / img_h;
    let nw = o.width / img_w;
    let nh = o.height / img_h;

    let [cx, cy, nw, nh] = [cx, cy, nw, nh].map(|v| v.clamp(0.0, 1.0));
    if [cx, cy, nw, nh].iter().any(|v| v.is_nan()) || nw <= 0.0 || nh <= 0.0 {
        return None;
    }

    Some(format!(
        "{} {:.6} {:.6} {:.6} {:.6}",
        class_idx, cx, cy, nw, nh
    ))
}

/// File name without its last extension; names without a usable stem are
/// returned whole.
fn base_name(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(i) if i > 0 => &filename[..i],
        _ => filename,
    }
}

/// Parse a YOLO label file into boxes in original pixel coordinates.
///
/// Class ids index into `class_names`; ids past the end become `class_<id>`.
/// Boxes are clamped to the image. Malformed lines are skipped.
pub fn parse_yolo_labels(
    content: &str,
    image_width: u32,
    image_height: u32,
    class_names: &[String],
) -> Vec<OriginalBox> {
    let img_w = f64::from(image_width);
    let img_h = f64::from(image_height);

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let parsed = parse_yolo_line(line);
            if parsed.is_none() {
                log::warn!("Skipping malformed YOLO line: {:?}", line);
            }
            parsed
        })
        .filter_map(|(class_id, cx, cy, w, h)| {
            let width = w * img_w;
            let height = h * img_h;
            let x = ((cx - w / 2.0) * img_w).max(0.0);
            let y = ((cy - h / 2.0) * img_h).max(0.0);
            let width = width.min(img_w - x);
            let height = height.min(img_h - y);
            if width <= 0.0 || height <= 0.0 {
                return None;
            }

            let label = class_names
                .get(class_id)
                .cloned()
                .unwrap_or_else(|| format!("class_{}", class_id));
            Some(OriginalBox::new(Rect::new(x, y, width, height), label))
        })
        .collect()
}

/// Parse a single line into `(class_id, cx, cy, w, h)`.
fn parse_yolo_line(line: &str) -> Option<(usize, f64, f64, f64, f64)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 5 {
        return None;
    }

    let class_id: usize = parts[0].parse().ok()?;
    let cx: f64 = parts[1].parse().ok()?;
    let cy: f64 = parts[2].parse().ok()?;
    let w: f64 = parts[3].parse().ok()?;
    let h: f64 = parts[4].parse().ok()?;
    if [cx, cy, w, h].iter().any(|v| !v.is_finite()) {
        return None;
    }

    Some((class_id, cx, cy, w, h))
}
