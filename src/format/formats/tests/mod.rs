//! Unit tests for annotation format implementations.
//!
//! These tests verify the exact output of each exporter and the
//! export/import round trip.

mod yolo_tests;

use crate::geometry::{Bounds, Rect};
use crate::model::{BoxAnnotation, ImageRecord};
use crate::state::AnnotationStore;

/// Display cap used throughout the format tests.
fn cap() -> Bounds {
    Bounds::new(640.0, 480.0)
}

/// Store with one decoded image and the given labels.
fn store_with_image(filename: &str, width: u32, height: u32, labels: &[&str]) -> AnnotationStore {
    let mut store = AnnotationStore::default();
    for (i, name) in labels.iter().enumerate() {
        store
            .add_label(name, Some(["#FF0000", "#00FF00", "#0000FF"][i % 3]))
            .unwrap();
    }
    store.add_image(ImageRecord::decoded(filename, filename, width, height, cap()));
    store
}

fn add_box(store: &mut AnnotationStore, x: f64, y: f64, w: f64, h: f64, label: &str) {
    store
        .add_box(BoxAnnotation::new(Rect::new(x, y, w, h), label))
        .unwrap();
}
