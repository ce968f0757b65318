//! Annotation format import/export system.
//!
//! Formats implement the [`AnnotationFormat`] trait and are looked up through
//! the [`FormatRegistry`].
//!
//! ## Supported Formats
//!
//! - **Generic JSON**: labels plus per-image integer corners in original pixels
//! - **YOLO TXT**: per-image normalized center boxes, class index = label position
//!
//! Proposal ingestion ([`ingest_proposals`]) is the inbound path for boxes
//! produced by assist services.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use annobox::format::{FormatRegistry, ExportOptions};
//!
//! let registry = FormatRegistry::new();
//! let format = registry.require("yolo")?;
//! let result = format.export(&store, &ExportOptions::default())?;
//! ```

mod error;
pub mod formats;
mod proposals;
mod registry;
mod traits;

pub use error::FormatError;
pub use formats::parse_yolo_labels;
pub use proposals::{IngestSummary, Proposal, ingest_proposals};
pub use registry::FormatRegistry;
pub use traits::{
    AnnotationFormat, ExportOptions, ExportResult, ExportedFile, FormatWarning, ImportOptions,
    ImportResult, WarningSeverity,
};
