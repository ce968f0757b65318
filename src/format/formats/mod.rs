//! Annotation format implementations.

mod generic_json;
mod yolo;

#[cfg(test)]
mod tests;

pub use generic_json::{
    BoxEntry, GenericDocument, GenericJsonFormat, ImageAnnotations, LabelEntry,
    to_original_corners,
};
pub use yolo::{YoloFormat, parse_yolo_labels, yolo_line};
