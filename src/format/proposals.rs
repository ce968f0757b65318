//! Merging model proposals into the store.
//!
//! Assist services return boxes as corners in original image pixels. They
//! are scaled to display space, rounded, clamped to the canvas and filtered
//! by the minimum box size before being added like drawn boxes.

use serde::{Deserialize, Serialize};

use crate::config::UnknownLabelPolicy;
use crate::constants::UNLABELED;
use crate::geometry::{self, Rect};
use crate::model::{BoxAnnotation, OriginalBox};
use crate::state::{AnnotationStore, StoreError};

/// A box proposed by an assist service, in original image pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl Proposal {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64, label: &str) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
            label: Some(label.to_string()),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

impl From<&OriginalBox> for Proposal {
    fn from(b: &OriginalBox) -> Self {
        Self::new(b.rect.x, b.rect.y, b.rect.right(), b.rect.bottom(), &b.label)
    }
}

/// Counts from one merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub added: usize,
    /// Non-finite or non-positive extent in original space
    pub invalid: usize,
    /// Below the minimum size before or after clamping
    pub too_small: usize,
    /// Labels seen that were not in the label set, in first-seen order
    pub unknown_labels: Vec<String>,
}

/// Add proposals to the image at `image_index`.
pub fn ingest_proposals(
    store: &mut AnnotationStore,
    image_index: usize,
    proposals: &[Proposal],
    policy: UnknownLabelPolicy,
) -> Result<IngestSummary, StoreError> {
    let image = store
        .image(image_index)
        .ok_or_else(|| StoreError::out_of_range("image", image_index, store.len()))?;
    let scale = image.scale_ratio;
    let canvas = image.display_bounds();
    let min_size = store.min_box_size();

    let mut summary = IngestSummary::default();

    for proposal in proposals {
        let corners = [proposal.x_min, proposal.y_min, proposal.x_max, proposal.y_max];
        if corners.iter().any(|v| !v.is_finite()) {
            log::warn!("Skipping proposal with non-numeric coordinates: {:?}", proposal);
            summary.invalid += 1;
            continue;
        }
        let original = Rect::new(
            proposal.x_min,
            proposal.y_min,
            proposal.x_max - proposal.x_min,
            proposal.y_max - proposal.y_min,
        );
        if original.width <= 0.0 || original.height <= 0.0 {
            log::warn!("Skipping proposal with zero or negative extent: {:?}", proposal);
            summary.invalid += 1;
            continue;
        }

        let display = original.map(|v| geometry::to_display(v, scale).round());
        if !display.meets_min_size(min_size) {
            log::warn!(
                "Skipping proposal {:?}: too small on canvas ({}x{})",
                proposal.label,
                display.width,
                display.height
            );
            summary.too_small += 1;
            continue;
        }

        let x = display.x.max(0.0);
        let y = display.y.max(0.0);
        let clamped = Rect::new(
            x,
            y,
            display.right().min(canvas.width) - x,
            display.bottom().min(canvas.height) - y,
        );
        if !clamped.meets_min_size(min_size) {
            log::warn!(
                "Skipping proposal {:?} after clamping: too small",
                proposal.label
            );
            summary.too_small += 1;
            continue;
        }

        let label = proposal
            .label
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(UNLABELED);
        if label != UNLABELED && store.label_index(label).is_none() {
            handle_unknown_label(store, label, policy, &mut summary);
        }

        let annotation = BoxAnnotation::new(clamped, label).with_confidence(proposal.confidence);
        store.add_box_to(image_index, annotation)?;
        summary.added += 1;
    }

    if summary.added > 0 {
        log::info!("Added {} proposed boxes", summary.added);
    } else {
        log::info!("No proposed boxes met the criteria");
    }
    Ok(summary)
}

fn handle_unknown_label(
    store: &mut AnnotationStore,
    label: &str,
    policy: UnknownLabelPolicy,
    summary: &mut IngestSummary,
) {
    if !summary.unknown_labels.iter().any(|l| l == label) {
        summary.unknown_labels.push(label.to_string());
    }
    match policy {
        UnknownLabelPolicy::LogOnly => {
            log::warn!("Proposal label {:?} is not defined; keeping box with it", label);
        }
        UnknownLabelPolicy::AutoAdd => {
            if let Err(e) = store.add_label(label, None) {
                log::warn!("Could not add proposal label {:?}: {}", label, e);
            }
        }
    }
}
