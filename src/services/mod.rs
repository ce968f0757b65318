//! Collaborators the engine talks to through capability traits.
//!
//! The engine never decodes pixels, calls models or touches the filesystem
//! directly. It asks an [`ImageDecoder`] for dimensions, an
//! [`AssistService`] for proposals, a [`DatasetProvider`] for pre-annotated
//! images and hands export payloads to a [`DownloadSink`].

mod dataset;
mod native_decoder;
mod sink;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::IMAGE_EXTENSIONS;
use crate::format::{ExportResult, Proposal};
use crate::model::{ImageId, OriginalBox};

pub use dataset::DirectoryDataset;
pub use native_decoder::NativeDecoderThread;
pub use sink::{DirectorySink, MemorySink, SavedPayload};

// ============================================================================
// Image decoding
// ============================================================================

/// Where the pixels of an image come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A file on disk.
    Path(PathBuf),
    /// Encoded image bytes (PNG, JPEG, ...).
    Bytes(Vec<u8>),
}

/// Errors that can occur while decoding an image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The image could not be read
    #[error("IO error: {0}")]
    Io(String),

    /// The bytes are not a supported image
    #[error("Image decode error: {0}")]
    Image(String),
}

impl From<std::io::Error> for DecodeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<image::ImageError> for DecodeError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e.to_string())
    }
}

/// Completion of one decode request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    Decoded {
        id: ImageId,
        width: u32,
        height: u32,
    },
    Failed {
        id: ImageId,
        error: DecodeError,
    },
}

impl DecodeOutcome {
    pub fn id(&self) -> ImageId {
        match self {
            Self::Decoded { id, .. } | Self::Failed { id, .. } => *id,
        }
    }
}

/// Asynchronous image decoder yielding pixel dimensions.
pub trait ImageDecoder {
    /// Queue an image for decoding. Results arrive through [`ImageDecoder::poll`].
    fn request_decode(&mut self, id: ImageId, source: ImageSource);

    /// Take one completed result, if any. Non-blocking.
    fn poll(&mut self) -> Option<DecodeOutcome>;

    /// Number of requests without a result yet.
    fn pending_count(&self) -> usize;
}

// ============================================================================
// Assist
// ============================================================================

/// Which model an assist operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistKind {
    /// Fixed-class detector.
    Detector,
    /// Open-vocabulary detector prompted with the current label names.
    OpenVocabulary,
}

impl AssistKind {
    pub fn name(&self) -> &'static str {
        match self {
            AssistKind::Detector => "detector",
            AssistKind::OpenVocabulary => "open-vocabulary",
        }
    }

    /// Whether predictions need the label names as prompts.
    pub fn needs_labels(&self) -> bool {
        matches!(self, AssistKind::OpenVocabulary)
    }
}

/// Input for one prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistRequest {
    /// Image the proposals will be merged into.
    pub image_id: ImageId,
    /// Source reference of the image (path or URL).
    pub source_ref: String,
    /// Class prompts for open-vocabulary models; empty otherwise.
    pub classes: Vec<String>,
}

/// Errors reported by an assist service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssistError {
    /// The model is not loaded on the service side
    #[error("{} model is not loaded", .kind.name())]
    NotReady { kind: AssistKind },

    /// Any other service failure
    #[error("Assist service error: {0}")]
    Service(String),

    /// Open-vocabulary prediction without label names
    #[error("Define labels before requesting open-vocabulary proposals")]
    NoLabels,
}

/// Remote model service producing box proposals in original image pixels.
pub trait AssistService {
    /// Ask the service to load the model for `kind`.
    fn load_model(&mut self, kind: AssistKind) -> Result<(), AssistError>;

    /// Run the model on one image.
    fn predict(
        &mut self,
        kind: AssistKind,
        request: &AssistRequest,
    ) -> Result<Vec<Proposal>, AssistError>;
}

// ============================================================================
// Datasets
// ============================================================================

/// One image of a dataset with its existing boxes in original pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetItem {
    pub source: PathBuf,
    pub filename: String,
    pub boxes: Vec<OriginalBox>,
}

/// A loaded dataset split.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// Class names in class-id order.
    pub class_names: Vec<String>,
    pub items: Vec<DatasetItem>,
}

/// Errors that can occur while loading a dataset.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// I/O error reading the dataset
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed data.yaml
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Dataset directory missing
    #[error("Dataset not found: {path:?}")]
    NotFound { path: PathBuf },

    /// Requested split missing
    #[error("Split '{split}' not found in {path:?}")]
    SplitNotFound { split: String, path: PathBuf },
}

/// Source of pre-annotated images.
pub trait DatasetProvider {
    /// Load a dataset, optionally restricted to one split.
    fn load(&self, dataset: &str, split: Option<&str>) -> Result<Dataset, DatasetError>;
}

// ============================================================================
// Download sink
// ============================================================================

/// Destination for exported payloads.
pub trait DownloadSink {
    /// Save a named payload.
    fn save(&mut self, name: &str, mime: &str, bytes: &[u8]) -> std::io::Result<()>;
}

/// Hand every file of an export result to a sink. Returns the number saved.
///
/// Files sharing a name are all handed over in order, so the sink keeps
/// the last one; each repeat is logged.
pub fn save_export(sink: &mut dyn DownloadSink, result: &ExportResult) -> std::io::Result<usize> {
    let mut seen: HashSet<&str> = HashSet::new();
    for file in &result.files {
        if !seen.insert(file.name.as_str()) {
            log::warn!("{} saved more than once, earlier content is replaced", file.name);
        }
        sink.save(&file.name, file.mime, file.content.as_bytes())?;
    }
    Ok(result.files.len())
}

/// Check if a path has a supported image extension.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
