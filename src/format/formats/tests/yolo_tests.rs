//! Tests for the YOLO format.

use super::{add_box, store_with_image};
use crate::format::error::FormatError;
use crate::format::formats::{YoloFormat, parse_yolo_labels};
use crate::format::traits::{AnnotationFormat, ExportOptions};
use crate::geometry::Rect;
use crate::model::ImageRecord;
use crate::state::AnnotationStore;

#[test]
fn test_yolo_format_metadata() {
    let format = YoloFormat;

    assert_eq!(format.id(), "yolo");
    assert_eq!(format.display_name(), "YOLO (TXT)");
    assert!(format.extensions().contains(&"txt"));
    assert!(format.supports_per_image(), "YOLO uses per-image files");
}

#[test]
fn test_yolo_exact_line() {
    // 200x100 fits the display cap, so display == original
    let mut store = store_with_image("img.png", 200, 100, &["thing"]);
    add_box(&mut store, 10.0, 10.0, 100.0, 50.0, "thing");

    let result = YoloFormat.export(&store, &ExportOptions::default()).unwrap();

    assert_eq!(result.files.len(), 1);
    let file = &result.files[0];
    assert_eq!(file.name, "img.txt");
    assert_eq!(file.mime, "text/plain");
    assert_eq!(file.content, "0 0.300000 0.350000 0.500000 0.500000\n");
    assert_eq!(result.annotations_exported, 1);
}

#[test]
fn test_yolo_class_index_follows_label_order() {
    let mut store = store_with_image("a.jpg", 640, 480, &["person", "car", "bicycle"]);
    add_box(&mut store, 0.0, 0.0, 64.0, 48.0, "bicycle");
    add_box(&mut store, 320.0, 240.0, 64.0, 48.0, "person");

    let result = YoloFormat.export(&store, &ExportOptions::default()).unwrap();
    let lines: Vec<&str> = result.files[0].content.lines().collect();
    assert_eq!(
        lines,
        [
            "2 0.050000 0.050000 0.100000 0.100000",
            "0 0.550000 0.550000 0.100000 0.100000"
        ]
    );
}

#[test]
fn test_yolo_requires_labels() {
    let mut store = store_with_image("a.jpg", 640, 480, &[]);
    add_box(&mut store, 0.0, 0.0, 64.0, 48.0, "person");

    let err = YoloFormat.export(&store, &ExportOptions::default()).unwrap_err();
    assert!(matches!(err, FormatError::NoLabels { .. }));
}

#[test]
fn test_yolo_requires_images() {
    let mut store = AnnotationStore::default();
    store.add_label("person", None).unwrap();

    let err = YoloFormat.export(&store, &ExportOptions::default()).unwrap_err();
    assert!(matches!(err, FormatError::NoImages));
}

#[test]
fn test_yolo_unknown_label_skipped_and_counted() {
    let mut store = store_with_image("a.jpg", 640, 480, &["person"]);
    add_box(&mut store, 0.0, 0.0, 64.0, 48.0, "person");
    add_box(&mut store, 10.0, 10.0, 64.0, 48.0, "ghost");

    // Second image only has an undefined label
    store.add_image(ImageRecord::decoded("b.jpg", "b.jpg", 640, 480, super::cap()));
    store.set_current_image(1).unwrap();
    add_box(&mut store, 10.0, 10.0, 64.0, 48.0, "ghost");

    // Third image has no boxes at all
    store.add_image(ImageRecord::decoded("c.jpg", "c.jpg", 640, 480, super::cap()));

    let result = YoloFormat.export(&store, &ExportOptions::default()).unwrap();

    assert_eq!(result.files.len(), 1);
    assert_eq!(result.files[0].name, "a.txt");
    assert_eq!(result.files[0].content.lines().count(), 1);
    assert_eq!(result.boxes_skipped, 2);
    assert_eq!(result.images_skipped, 1, "empty images are not counted");
    assert_eq!(result.images_exported, 1);
    assert!(result.has_warnings());
}

#[test]
fn test_yolo_clamps_normalized_values() {
    let mut store = store_with_image("edge.jpg", 100, 100, &["x"]);
    // Extends past the right edge: center and width still clamp into [0, 1]
    add_box(&mut store, 50.0, 0.0, 200.0, 100.0, "x");

    let result = YoloFormat.export(&store, &ExportOptions::default()).unwrap();
    assert_eq!(
        result.files[0].content,
        "0 1.000000 0.500000 1.000000 1.000000\n"
    );
}

#[test]
fn test_yolo_inverted_box_skipped() {
    let mut store = store_with_image("flip.jpg", 200, 100, &["car"]);
    add_box(&mut store, 10.0, 10.0, 40.0, 30.0, "car");
    // Geometry overwritten without normalization
    store
        .set_box_rect(0, Rect::new(50.0, 10.0, -20.0, 30.0))
        .unwrap();

    let result = YoloFormat.export(&store, &ExportOptions::default()).unwrap();
    assert!(result.files.is_empty());
    assert_eq!(result.boxes_skipped, 1);
    assert_eq!(result.images_skipped, 1);
    assert_eq!(result.images_exported, 0);
    assert!(result.has_errors());
}

#[test]
fn test_yolo_image_without_dimensions_skipped() {
    let mut store = store_with_image("zero.jpg", 0, 100, &["car"]);
    add_box(&mut store, 10.0, 10.0, 40.0, 30.0, "car");

    let result = YoloFormat.export(&store, &ExportOptions::default()).unwrap();
    assert!(result.files.is_empty());
    assert_eq!(result.boxes_skipped, 1);
    assert_eq!(result.images_skipped, 1);
    assert_eq!(result.annotations_exported, 0);
}

#[test]
fn test_yolo_shared_file_name_warns() {
    let mut store = store_with_image("a.jpg", 640, 480, &["car"]);
    add_box(&mut store, 0.0, 0.0, 64.0, 48.0, "car");
    store.add_image(ImageRecord::decoded("a.png", "a.png", 640, 480, super::cap()));
    store.set_current_image(1).unwrap();
    add_box(&mut store, 320.0, 240.0, 64.0, 48.0, "car");

    let result = YoloFormat.export(&store, &ExportOptions::default()).unwrap();
    let names: Vec<&str> = result.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["a.txt", "a.txt"]);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].image.as_deref(), Some("a.png"));
    assert!(!result.has_errors());
}

#[test]
fn test_yolo_file_name_keeps_inner_dots() {
    let mut store = store_with_image("frame.0001.png", 640, 480, &["x"]);
    add_box(&mut store, 0.0, 0.0, 10.0, 10.0, "x");

    let result = YoloFormat.export(&store, &ExportOptions::default()).unwrap();
    assert!(result.file("frame.0001.txt").is_some());
}

#[test]
fn test_parse_yolo_labels_to_pixels() {
    let names = vec!["person".to_string(), "car".to_string()];
    let content = "0 0.5 0.5 0.25 0.5\n\n1 0.1 0.1 0.4 0.4\n7 0.5 0.5 0.1 0.1\nbad line\n";

    let boxes = parse_yolo_labels(content, 200, 100, &names);
    assert_eq!(boxes.len(), 3);

    assert_eq!(boxes[0].label, "person");
    assert_eq!(boxes[0].rect, Rect::new(75.0, 25.0, 50.0, 50.0));

    // Top-left clamped to 0, extent kept
    assert_eq!(boxes[1].label, "car");
    assert_eq!(boxes[1].rect.x, 0.0);
    assert_eq!(boxes[1].rect.y, 0.0);
    assert!((boxes[1].rect.width - 80.0).abs() < 1e-9);

    assert_eq!(boxes[2].label, "class_7");
}
