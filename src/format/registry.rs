//! Format registry for discovering and accessing annotation formats.

use std::collections::HashMap;

use crate::format::error::FormatError;
use crate::format::formats::{GenericJsonFormat, YoloFormat};
use crate::format::traits::AnnotationFormat;

/// Registry of available annotation formats.
///
/// All built-in formats are registered automatically on creation.
pub struct FormatRegistry {
    formats: HashMap<&'static str, Box<dyn AnnotationFormat>>,
}

impl FormatRegistry {
    /// Create a new registry with all built-in formats registered.
    pub fn new() -> Self {
        let mut registry = Self {
            formats: HashMap::new(),
        };

        registry.register(Box::new(GenericJsonFormat));
        registry.register(Box::new(YoloFormat));

        registry
    }

    /// Register a format implementation.
    pub fn register(&mut self, format: Box<dyn AnnotationFormat>) {
        self.formats.insert(format.id(), format);
    }

    /// Get a format by its ID.
    pub fn get(&self, id: &str) -> Option<&dyn AnnotationFormat> {
        self.formats.get(id).map(|f| f.as_ref())
    }

    /// Get a format by its ID, failing with [`FormatError::UnknownFormat`].
    pub fn require(&self, id: &str) -> Result<&dyn AnnotationFormat, FormatError> {
        self.get(id).ok_or_else(|| FormatError::UnknownFormat { id: id.to_string() })
    }

    /// Get all format IDs, sorted.
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.formats.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}
