//! Trait definitions for annotation format implementations.

use crate::constants::{DEFAULT_MAX_DISPLAY_HEIGHT, DEFAULT_MAX_DISPLAY_WIDTH};
use crate::format::error::FormatError;
use crate::geometry::Bounds;
use crate::state::AnnotationStore;

/// Trait for annotation format import/export implementations.
///
/// Formats read boxes from the store in display space and convert them to
/// original image pixels themselves. Exports produce named payloads; writing
/// them somewhere is the caller's concern (see [`crate::services::DownloadSink`]).
pub trait AnnotationFormat: Send + Sync {
    /// Unique identifier for this format (e.g., "json", "yolo").
    fn id(&self) -> &'static str;

    /// Human-readable name for UI display.
    fn display_name(&self) -> &'static str;

    /// File extensions this format uses.
    fn extensions(&self) -> &[&'static str];

    /// Whether export produces one file per image (vs a single project file).
    fn supports_per_image(&self) -> bool;

    /// Export every image in the store.
    fn export(
        &self,
        store: &AnnotationStore,
        options: &ExportOptions,
    ) -> Result<ExportResult, FormatError>;

    /// Import annotations from file content into the store.
    fn import(
        &self,
        _content: &str,
        _store: &mut AnnotationStore,
        _options: &ImportOptions,
    ) -> Result<ImportResult, FormatError> {
        Err(FormatError::UnsupportedOperation(format!(
            "{} import",
            self.display_name()
        )))
    }
}

/// Options for export operations.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Output file name for single-file formats; a timestamped name is used
    /// when unset.
    pub file_name: Option<String>,
}

impl ExportOptions {
    /// Create new export options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output file name.
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }
}

/// Options for import operations.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Display cap used to derive each imported image's scale ratio.
    pub max_display: Bounds,

    /// Whether to merge with existing data or replace.
    pub merge: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            max_display: Bounds::new(DEFAULT_MAX_DISPLAY_WIDTH, DEFAULT_MAX_DISPLAY_HEIGHT),
            merge: false,
        }
    }
}

impl ImportOptions {
    /// Create new import options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the display cap.
    pub fn max_display(mut self, bounds: Bounds) -> Self {
        self.max_display = bounds;
        self
    }

    /// Set merge mode (true = merge with existing, false = replace).
    pub fn merge(mut self, merge: bool) -> Self {
        self.merge = merge;
        self
    }
}

/// A named payload ready to hand to a download sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub name: String,
    pub mime: &'static str,
    pub content: String,
}

impl ExportedFile {
    pub fn new(name: impl Into<String>, mime: &'static str, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime,
            content: content.into(),
        }
    }
}

/// Result of an export operation.
#[derive(Debug, Default)]
pub struct ExportResult {
    /// Payloads produced.
    pub files: Vec<ExportedFile>,

    /// Number of images exported.
    pub images_exported: usize,

    /// Number of boxes exported.
    pub annotations_exported: usize,

    /// Boxes dropped (unknown label, zero extent after clamping, bad dimensions).
    pub boxes_skipped: usize,

    /// Images that had boxes but produced no output.
    pub images_skipped: usize,

    /// Warnings generated during export (e.g., skipped boxes).
    pub warnings: Vec<FormatWarning>,
}

impl ExportResult {
    /// Create a new export result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a warning to the result.
    pub fn add_warning(&mut self, warning: FormatWarning) {
        self.warnings.push(warning);
    }

    /// Check if there were any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if there were any errors (severe warnings).
    pub fn has_errors(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w.severity, WarningSeverity::Error))
    }

    /// Find a produced file by name.
    pub fn file(&self, name: &str) -> Option<&ExportedFile> {
        self.files.iter().find(|f| f.name == name)
    }
}

/// Result of an import operation.
#[derive(Debug, Default)]
pub struct ImportResult {
    pub images_imported: usize,
    pub annotations_imported: usize,
    pub labels_imported: usize,
    pub warnings: Vec<FormatWarning>,
}

/// Warning generated during format conversion.
#[derive(Debug, Clone)]
pub struct FormatWarning {
    /// File name of the image this warning relates to (if applicable).
    pub image: Option<String>,

    /// Human-readable warning message.
    pub message: String,

    /// Severity level of the warning.
    pub severity: WarningSeverity,
}

impl FormatWarning {
    /// Create a new warning.
    pub fn new(message: impl Into<String>, severity: WarningSeverity) -> Self {
        Self {
            image: None,
            message: message.into(),
            severity,
        }
    }

    /// Create a warning-level warning.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Warning)
    }

    /// Create an error-level warning.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Error)
    }

    /// Set the image this warning relates to.
    pub fn with_image(mut self, filename: impl Into<String>) -> Self {
        self.image = Some(filename.into());
        self
    }
}

/// Severity level for format warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    /// Warning that something was skipped or modified.
    Warning,
    /// Error that may affect data integrity.
    Error,
}
