//! Label data model shared by every image.

use serde::{Deserialize, Serialize};

use crate::color_utils;

/// A label with a display color (`#RRGGBB`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Display name, unique case-insensitively
    pub name: String,
    /// Color used for boxes carrying this label
    pub color: String,
}

impl Label {
    /// Create a new label with the given name and color.
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }

    /// Case-insensitive name comparison used for uniqueness checks.
    pub fn matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    /// Black or white, whichever reads better on this label's color.
    pub fn text_color(&self) -> &'static str {
        color_utils::contrast_text_color(&self.color)
    }
}
