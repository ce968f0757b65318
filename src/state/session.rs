//! Session: the engine context owned by the front end.
//!
//! Holds the store, the interaction machine and the assist busy flags, and
//! runs the decode and assist lifecycles against the service traits. While
//! any assist operation is in flight, editing, navigation and tool switches
//! are rejected with [`SessionError::Busy`].

use std::collections::HashSet;

use thiserror::Error;

use crate::config::AnnotatorConfig;
use crate::format::{
    ExportOptions, ExportResult, FormatError, FormatRegistry, ImportOptions, ImportResult,
    IngestSummary, Proposal, ingest_proposals,
};
use crate::model::{ImageId, ImageRecord, Label};
use crate::services::{
    AssistError, AssistKind, AssistRequest, AssistService, DatasetError, DatasetProvider,
    DecodeError, DecodeOutcome, DownloadSink, ImageDecoder, ImageSource, save_export,
};
use crate::state::interaction::{InteractionMachine, InteractionOutcome, PointerEvent, Tool};
use crate::state::store::{AnnotationStore, StoreError};

/// Assist operation kinds that hold a busy flag while in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssistOp {
    LoadModel,
    Predict,
}

impl AssistOp {
    pub fn name(&self) -> &'static str {
        match self {
            AssistOp::LoadModel => "model loading",
            AssistOp::Predict => "prediction",
        }
    }
}

/// Errors surfaced by session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Assist(#[from] AssistError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image failed to decode and was removed
    #[error("Failed to load image {filename}: {error}")]
    Decode { filename: String, error: DecodeError },

    /// An assist operation is in flight
    #[error("Busy: {operation} in progress")]
    Busy { operation: String },

    /// The current image has not finished decoding
    #[error("Image {image_id} is still loading")]
    ImageNotReady { image_id: ImageId },

    /// A result arrived for an image that no longer exists
    #[error("Image {image_id} no longer exists")]
    StaleRequest { image_id: ImageId },
}

/// Engine context: store, interaction machine, config and assist state.
pub struct Session {
    config: AnnotatorConfig,
    store: AnnotationStore,
    interaction: InteractionMachine,
    registry: FormatRegistry,
    busy: HashSet<(AssistOp, AssistKind)>,
    loaded_models: HashSet<AssistKind>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(AnnotatorConfig::default())
    }
}

impl Session {
    pub fn new(config: AnnotatorConfig) -> Self {
        Self {
            store: AnnotationStore::from_config(&config),
            interaction: InteractionMachine::new(config.handle_size),
            registry: FormatRegistry::new(),
            busy: HashSet::new(),
            loaded_models: HashSet::new(),
            config,
        }
    }

    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn interaction(&self) -> &InteractionMachine {
        &self.interaction
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    // ========================================================================
    // Busy gating
    // ========================================================================

    pub fn is_busy(&self) -> bool {
        !self.busy.is_empty()
    }

    /// Whether a specific assist operation is in flight.
    pub fn is_busy_with(&self, op: AssistOp, kind: AssistKind) -> bool {
        self.busy.contains(&(op, kind))
    }

    pub fn is_model_loaded(&self, kind: AssistKind) -> bool {
        self.loaded_models.contains(&kind)
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        match self.busy.iter().next() {
            Some((op, kind)) => {
                log::debug!("Rejected while {} {} is in flight", kind.name(), op.name());
                Err(SessionError::Busy {
                    operation: format!("{} {}", kind.name(), op.name()),
                })
            }
            None => Ok(()),
        }
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Feed a pointer event to the interaction machine.
    pub fn pointer(&mut self, event: PointerEvent) -> Result<InteractionOutcome, SessionError> {
        self.ensure_idle()?;
        Ok(self.interaction.handle_event(&mut self.store, event)?)
    }

    pub fn set_tool(&mut self, tool: Tool) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.interaction.set_tool(tool);
        Ok(())
    }

    /// Make the image at `index` current. Any gesture is abandoned.
    pub fn navigate(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.store.set_current_image(index)?;
        self.interaction.reset();
        Ok(())
    }

    /// Move to the next image, wrapping around.
    pub fn next_image(&mut self) -> Result<(), SessionError> {
        match self.store.current_index() {
            Some(cur) => self.navigate((cur + 1) % self.store.len()),
            None => Err(StoreError::NoCurrentImage.into()),
        }
    }

    /// Move to the previous image, wrapping around.
    pub fn previous_image(&mut self) -> Result<(), SessionError> {
        match self.store.current_index() {
            Some(cur) => {
                let len = self.store.len();
                self.navigate((cur + len - 1) % len)
            }
            None => Err(StoreError::NoCurrentImage.into()),
        }
    }

    pub fn remove_image(&mut self, index: usize) -> Result<ImageRecord, SessionError> {
        self.ensure_idle()?;
        self.remove_image_unchecked(index)
    }

    fn remove_image_unchecked(&mut self, index: usize) -> Result<ImageRecord, SessionError> {
        let before = self.store.current_image().map(|img| img.id);
        let removed = self.store.remove_image(index)?;
        if self.store.current_image().map(|img| img.id) != before {
            self.interaction.reset();
        }
        Ok(removed)
    }

    /// Delete a box of the current image.
    pub fn remove_box(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.store.remove_box(index)?;
        self.interaction.box_removed(index);
        Ok(())
    }

    /// Delete the box grabbed in edit mode.
    pub fn remove_selected_box(&mut self) -> Result<bool, SessionError> {
        match self.interaction.selected_box() {
            Some(index) => self.remove_box(index).map(|()| true),
            None => Ok(false),
        }
    }

    pub fn update_box_label(&mut self, index: usize, label: &str) -> Result<(), SessionError> {
        self.ensure_idle()?;
        Ok(self.store.update_box_label(index, label)?)
    }

    pub fn add_label(&mut self, name: &str, color: Option<&str>) -> Result<&Label, SessionError> {
        Ok(self.store.add_label(name, color)?)
    }

    /// Remove a label, relabeling its boxes on every image.
    pub fn remove_label(&mut self, name: &str) -> Result<Vec<ImageId>, SessionError> {
        self.ensure_idle()?;
        Ok(self.store.remove_label(name)?)
    }

    // ========================================================================
    // Image decoding
    // ========================================================================

    /// Add an image that still has to be decoded and queue the decode.
    pub fn add_image_source(
        &mut self,
        source: ImageSource,
        filename: &str,
        decoder: &mut dyn ImageDecoder,
    ) -> ImageId {
        let source_ref = match &source {
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Bytes(_) => filename.to_string(),
        };
        let id = self.store.add_image(ImageRecord::pending(source_ref, filename));
        decoder.request_decode(id, source);
        id
    }

    /// Apply one decode result.
    ///
    /// A failed decode removes the record; the store reselects a neighbour
    /// and the failure is returned.
    pub fn apply_decode(&mut self, outcome: DecodeOutcome) -> Result<ImageId, SessionError> {
        let id = outcome.id();
        let index = self
            .store
            .find_image(id)
            .ok_or(SessionError::StaleRequest { image_id: id })?;

        match outcome {
            DecodeOutcome::Decoded { width, height, .. } => {
                let max_display = self.config.max_display();
                let pending = match self.store.image_mut(index) {
                    Some(image) => {
                        image.apply_dimensions(width, height, max_display);
                        image.take_pending_boxes()
                    }
                    None => Vec::new(),
                };

                // Dataset boxes get the same rounding, clamping and size
                // floor as proposals.
                if !pending.is_empty() {
                    let proposals: Vec<Proposal> = pending.iter().map(Proposal::from).collect();
                    let summary = ingest_proposals(
                        &mut self.store,
                        index,
                        &proposals,
                        self.config.unknown_label_policy,
                    )?;
                    let dropped = summary.invalid + summary.too_small;
                    if dropped > 0 {
                        log::warn!("Dropped {} of {} stored boxes", dropped, pending.len());
                    }
                }

                if let Some(image) = self.store.image(index) {
                    log::info!(
                        "Loaded image {} ({}x{}, scale {:.4}, {} boxes)",
                        image.filename,
                        width,
                        height,
                        image.scale_ratio,
                        image.boxes.len()
                    );
                }
                Ok(id)
            }
            DecodeOutcome::Failed { error, .. } => {
                let removed = self.remove_image_unchecked(index)?;
                log::error!("Failed to load image {}: {}", removed.filename, error);
                Err(SessionError::Decode {
                    filename: removed.filename,
                    error,
                })
            }
        }
    }

    /// Apply every result the decoder has ready. Returns the number of
    /// images that became ready.
    pub fn pump_decoder(&mut self, decoder: &mut dyn ImageDecoder) -> usize {
        let mut ready = 0;
        while let Some(outcome) = decoder.poll() {
            match self.apply_decode(outcome) {
                Ok(_) => ready += 1,
                Err(e) => log::warn!("{}", e),
            }
        }
        ready
    }

    /// Load a dataset: its classes replace the label set and its images are
    /// queued for decoding with their boxes attached.
    pub fn load_dataset(
        &mut self,
        provider: &dyn DatasetProvider,
        dataset: &str,
        split: Option<&str>,
        decoder: &mut dyn ImageDecoder,
    ) -> Result<usize, SessionError> {
        self.ensure_idle()?;
        let loaded = provider.load(dataset, split)?;

        self.interaction.reset();
        self.store.replace_labels(&loaded.class_names);

        let count = loaded.items.len();
        for item in loaded.items {
            let record = ImageRecord::pending(item.source.display().to_string(), item.filename)
                .with_pending_boxes(item.boxes);
            let id = self.store.add_image(record);
            decoder.request_decode(id, ImageSource::Path(item.source));
        }

        log::info!(
            "Queued {} images from dataset {} ({} labels)",
            count,
            dataset,
            self.store.labels().len()
        );
        Ok(count)
    }

    // ========================================================================
    // Assist
    // ========================================================================

    /// Mark a model load as in flight.
    pub fn begin_load_model(&mut self, kind: AssistKind) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.busy.insert((AssistOp::LoadModel, kind));
        log::info!("Loading {} model", kind.name());
        Ok(())
    }

    /// Complete a model load started with [`Session::begin_load_model`].
    pub fn finish_load_model(
        &mut self,
        kind: AssistKind,
        result: Result<(), AssistError>,
    ) -> Result<(), SessionError> {
        self.busy.remove(&(AssistOp::LoadModel, kind));
        match result {
            Ok(()) => {
                self.loaded_models.insert(kind);
                log::info!("{} model loaded", kind.name());
                Ok(())
            }
            Err(e) => {
                self.loaded_models.remove(&kind);
                log::error!("Loading {} model failed: {}", kind.name(), e);
                Err(e.into())
            }
        }
    }

    /// Start a prediction on the current image and return the request to
    /// send to the assist service.
    pub fn begin_predict(&mut self, kind: AssistKind) -> Result<AssistRequest, SessionError> {
        self.ensure_idle()?;
        if kind.needs_labels() && self.store.labels().is_empty() {
            return Err(AssistError::NoLabels.into());
        }
        let image = self
            .store
            .current_image()
            .ok_or(StoreError::NoCurrentImage)?;
        if !image.is_ready() {
            return Err(SessionError::ImageNotReady { image_id: image.id });
        }

        let request = AssistRequest {
            image_id: image.id,
            source_ref: image.source_ref.clone(),
            classes: if kind.needs_labels() {
                self.store.labels().iter().map(|l| l.name.clone()).collect()
            } else {
                Vec::new()
            },
        };

        self.interaction.reset();
        self.busy.insert((AssistOp::Predict, kind));
        log::info!("Requesting {} proposals for {}", kind.name(), request.source_ref);
        Ok(request)
    }

    /// Merge a prediction result into the image the request was made for.
    pub fn finish_predict(
        &mut self,
        kind: AssistKind,
        request: &AssistRequest,
        result: Result<Vec<Proposal>, AssistError>,
    ) -> Result<IngestSummary, SessionError> {
        self.busy.remove(&(AssistOp::Predict, kind));

        let proposals = match result {
            Ok(proposals) => proposals,
            Err(e) => {
                if matches!(e, AssistError::NotReady { .. }) {
                    log::warn!("{} model not loaded on the service, reload required", kind.name());
                    self.loaded_models.remove(&kind);
                } else {
                    log::error!("{} prediction failed: {}", kind.name(), e);
                }
                return Err(e.into());
            }
        };

        let index = self.store.find_image(request.image_id).ok_or_else(|| {
            log::warn!(
                "Dropping {} proposals for removed image {}",
                proposals.len(),
                request.image_id
            );
            SessionError::StaleRequest {
                image_id: request.image_id,
            }
        })?;

        Ok(ingest_proposals(
            &mut self.store,
            index,
            &proposals,
            self.config.unknown_label_policy,
        )?)
    }

    /// Load a model through `service`, blocking until it answers.
    pub fn run_load_model(
        &mut self,
        service: &mut dyn AssistService,
        kind: AssistKind,
    ) -> Result<(), SessionError> {
        self.begin_load_model(kind)?;
        let result = service.load_model(kind);
        self.finish_load_model(kind, result)
    }

    /// Predict on the current image through `service`, blocking until it answers.
    pub fn run_predict(
        &mut self,
        service: &mut dyn AssistService,
        kind: AssistKind,
    ) -> Result<IngestSummary, SessionError> {
        let request = self.begin_predict(kind)?;
        let result = service.predict(kind, &request);
        self.finish_predict(kind, &request, result)
    }

    // ========================================================================
    // Import / export
    // ========================================================================

    pub fn export(
        &self,
        format_id: &str,
        options: &ExportOptions,
    ) -> Result<ExportResult, SessionError> {
        Ok(self.registry.require(format_id)?.export(&self.store, options)?)
    }

    /// Export and hand every payload to `sink`.
    pub fn export_to(
        &self,
        format_id: &str,
        options: &ExportOptions,
        sink: &mut dyn DownloadSink,
    ) -> Result<ExportResult, SessionError> {
        let result = self.export(format_id, options)?;
        let saved = save_export(sink, &result)?;
        log::info!("Saved {} {} files", saved, format_id);
        Ok(result)
    }

    /// Import annotations, replacing the store unless `merge` is set.
    pub fn import(
        &mut self,
        format_id: &str,
        content: &str,
        merge: bool,
    ) -> Result<ImportResult, SessionError> {
        self.ensure_idle()?;
        let options = ImportOptions::new()
            .max_display(self.config.max_display())
            .merge(merge);
        let result = self
            .registry
            .require(format_id)?
            .import(content, &mut self.store, &options)?;
        self.interaction.reset();
        Ok(result)
    }
}
