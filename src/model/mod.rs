//! Data models for the annotation engine.

mod annotation;
mod image;
mod label;

pub use annotation::{BoxAnnotation, OriginalBox};
pub use image::{DecodeStatus, ImageId, ImageRecord};
pub use label::Label;
