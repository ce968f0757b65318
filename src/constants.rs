//! Global constants for the annotation engine

/// Maximum display width; larger images are downscaled to fit.
pub const DEFAULT_MAX_DISPLAY_WIDTH: f64 = 640.0;

/// Maximum display height; larger images are downscaled to fit.
pub const DEFAULT_MAX_DISPLAY_HEIGHT: f64 = 480.0;

/// Minimum width/height (display pixels) of a committed box.
pub const DEFAULT_MIN_BOX_SIZE: f64 = 5.0;

/// Side length of the square hit region around each corner handle.
pub const DEFAULT_HANDLE_SIZE: f64 = 8.0;

/// Label given to boxes that have no defined label.
pub const UNLABELED: &str = "unlabeled";

/// Color used when rendering a box whose label is not defined.
pub const DEFAULT_LABEL_COLOR: &str = "#FF0000";

/// YIQ brightness band for generated label colors.
pub const MIN_LABEL_BRIGHTNESS: f64 = 40.0;
pub const MAX_LABEL_BRIGHTNESS: f64 = 220.0;

/// Brightness at or above which black text is used on a label color.
pub const CONTRAST_THRESHOLD: f64 = 128.0;

/// Image file extensions recognised when scanning folders and datasets.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "tif", "webp"];
