//! annobox - bounding-box annotation engine
//!
//! Owns per-image box collections in display space, converts them to and
//! from original image pixels, runs the draw/resize gesture machine and
//! exports generic JSON or YOLO labels. Decoding, model assist, datasets and
//! downloads are reached through the traits in [`services`].

pub mod color_utils;
pub mod config;
pub mod constants;
pub mod format;
pub mod geometry;
pub mod model;
pub mod services;
pub mod state;

pub use config::AnnotatorConfig;
pub use state::{AnnotationStore, Session, SessionError};
