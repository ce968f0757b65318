//! Error types for annotation format operations.

use thiserror::Error;

/// Errors that can occur during annotation format operations.
#[derive(Error, Debug)]
pub enum FormatError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid format structure or content
    #[error("Invalid format: {message}")]
    InvalidFormat {
        /// Description of the format error
        message: String,
    },

    /// Nothing to export
    #[error("No images loaded to export annotations for")]
    NoImages,

    /// The format derives class ids from labels and none are defined
    #[error("Define labels before exporting in {format} format")]
    NoLabels {
        /// The format requiring labels
        format: String,
    },

    /// Unknown format id
    #[error("Unknown format: {id}")]
    UnknownFormat {
        /// The requested id
        id: String,
    },

    /// Operation not supported by this format
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl FormatError {
    /// Create an invalid format error with a message.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Create a missing-labels error for the given format.
    pub fn no_labels(format: impl Into<String>) -> Self {
        Self::NoLabels {
            format: format.into(),
        }
    }
}
