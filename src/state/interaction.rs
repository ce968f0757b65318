//! Pointer-driven draw and resize gestures.
//!
//! The machine tracks the active tool and an in-progress gesture and turns
//! pointer events into store mutations. Every pointer position is clamped to
//! the current image's display canvas before use.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_HANDLE_SIZE;
use crate::geometry::{self, Bounds, Handle, Point, Rect};
use crate::model::BoxAnnotation;
use crate::state::store::{AnnotationStore, StoreError};

/// The active annotation tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Drag to draw new boxes.
    #[default]
    Draw,
    /// Drag corner handles to resize existing boxes.
    Edit,
}

/// Gesture in progress.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// Drawing a new box from `anchor` to `current`.
    Drawing { anchor: Point, current: Point },
    /// Dragging a corner of an existing box.
    ResizingHandle {
        box_index: usize,
        handle: Handle,
        /// Box geometry when the drag began; the opposite corner stays here.
        original: Rect,
    },
}

/// A pointer event in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up(Point),
    /// Pointer left the canvas.
    Leave,
}

/// What a pointer event did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionOutcome {
    /// The event had no effect.
    Ignored,
    /// Drawing started or moved; the rectangle is the live preview.
    Preview(Rect),
    /// A drawn box was added to the current image.
    Committed { box_index: usize },
    /// A drawing was dropped (too small or pointer left the canvas).
    Discarded,
    /// A handle was grabbed.
    ResizeStarted { box_index: usize, handle: Handle },
    /// Live, possibly inverted geometry was written to the box.
    Resized { box_index: usize, rect: Rect },
    /// The resize finished and the box was normalized.
    ResizeFinished { box_index: usize, rect: Rect },
    /// Edit-mode click missed every handle.
    SelectionCleared,
}

/// Tool and gesture state for the current image.
#[derive(Debug, Clone)]
pub struct InteractionMachine {
    tool: Tool,
    gesture: Gesture,
    selected: Option<usize>,
    handle_size: f64,
}

impl Default for InteractionMachine {
    fn default() -> Self {
        Self::new(DEFAULT_HANDLE_SIZE)
    }
}

impl InteractionMachine {
    pub fn new(handle_size: f64) -> Self {
        Self {
            tool: Tool::default(),
            gesture: Gesture::Idle,
            selected: None,
            handle_size,
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// Index of the box grabbed in edit mode, if any.
    pub fn selected_box(&self) -> Option<usize> {
        self.selected
    }

    /// Switch tool, abandoning any gesture in progress.
    pub fn set_tool(&mut self, tool: Tool) {
        if self.gesture != Gesture::Idle {
            log::debug!("Tool switch abandons {:?}", self.gesture);
        }
        self.tool = tool;
        self.reset();
        log::debug!("Tool: {:?}", tool);
    }

    /// Drop any gesture and selection.
    pub fn reset(&mut self) {
        self.gesture = Gesture::Idle;
        self.selected = None;
    }

    /// Live rectangle of the box being drawn.
    pub fn preview(&self) -> Option<Rect> {
        match self.gesture {
            Gesture::Drawing { anchor, current } => Some(Rect::from_corners(anchor, current)),
            _ => None,
        }
    }

    /// Keep gesture and selection indices valid after a box is deleted.
    pub fn box_removed(&mut self, index: usize) {
        if let Gesture::ResizingHandle { box_index, .. } = &mut self.gesture {
            if *box_index == index {
                log::debug!("Resized box {} deleted, gesture reset", index);
                self.gesture = Gesture::Idle;
            } else if *box_index > index {
                *box_index -= 1;
            }
        }
        self.selected = match self.selected {
            Some(sel) if sel == index => None,
            Some(sel) if sel > index => Some(sel - 1),
            other => other,
        };
    }

    /// Handle under the pointer in edit mode, for cursor feedback.
    pub fn hover_handle(&self, store: &AnnotationStore, point: Point) -> Option<(usize, Handle)> {
        if self.tool != Tool::Edit || self.gesture != Gesture::Idle {
            return None;
        }
        let bounds = canvas_bounds(store)?;
        self.hit_test(store.current_boxes(), bounds.clamp_point(point))
    }

    /// Topmost handle hit: last box first, tl/tr/bl/br within a box.
    fn hit_test(&self, boxes: &[BoxAnnotation], point: Point) -> Option<(usize, Handle)> {
        boxes.iter().enumerate().rev().find_map(|(i, b)| {
            geometry::hit_handle(&b.rect(), point, self.handle_size).map(|h| (i, h))
        })
    }

    /// Apply one pointer event to the store.
    ///
    /// Events are ignored when there is no current image or it has not
    /// finished decoding.
    pub fn handle_event(
        &mut self,
        store: &mut AnnotationStore,
        event: PointerEvent,
    ) -> Result<InteractionOutcome, StoreError> {
        let Some(bounds) = canvas_bounds(store) else {
            return Ok(InteractionOutcome::Ignored);
        };
        let clamp = |p: Point| bounds.clamp_point(p);
        log::trace!("{:?} in {:?} ({:?})", event, self.gesture, self.tool);

        match (event, self.gesture) {
            (PointerEvent::Down(p), Gesture::Idle) => Ok(self.pointer_down(store, clamp(p))),

            (PointerEvent::Move(p), Gesture::Drawing { anchor, .. }) => {
                let current = clamp(p);
                self.gesture = Gesture::Drawing { anchor, current };
                Ok(InteractionOutcome::Preview(Rect::from_corners(anchor, current)))
            }

            (PointerEvent::Up(p), Gesture::Drawing { anchor, .. }) => {
                self.gesture = Gesture::Idle;
                self.finish_drawing(store, Rect::from_corners(anchor, clamp(p)))
            }

            (PointerEvent::Leave, Gesture::Drawing { .. }) => {
                log::debug!("Pointer left canvas, drawing discarded");
                self.gesture = Gesture::Idle;
                Ok(InteractionOutcome::Discarded)
            }

            (
                PointerEvent::Move(p),
                Gesture::ResizingHandle {
                    box_index,
                    handle,
                    original,
                },
            ) => {
                let p = clamp(p);
                let rect = geometry::compute_resized_box(original, handle, p.x, p.y);
                store.set_box_rect(box_index, rect)?;
                Ok(InteractionOutcome::Resized { box_index, rect })
            }

            (
                PointerEvent::Up(p),
                Gesture::ResizingHandle {
                    box_index,
                    handle,
                    original,
                },
            ) => {
                let p = clamp(p);
                let live = geometry::compute_resized_box(original, handle, p.x, p.y);
                self.finish_resize(store, box_index, live, bounds)
            }

            (PointerEvent::Leave, Gesture::ResizingHandle { box_index, .. }) => {
                let live = store
                    .current_boxes()
                    .get(box_index)
                    .map(BoxAnnotation::rect)
                    .ok_or_else(|| {
                        StoreError::out_of_range("box", box_index, store.current_boxes().len())
                    })?;
                self.finish_resize(store, box_index, live, bounds)
            }

            _ => Ok(InteractionOutcome::Ignored),
        }
    }

    fn pointer_down(&mut self, store: &AnnotationStore, point: Point) -> InteractionOutcome {
        match self.tool {
            Tool::Draw => {
                self.gesture = Gesture::Drawing {
                    anchor: point,
                    current: point,
                };
                log::debug!("Drawing started at ({:.1}, {:.1})", point.x, point.y);
                InteractionOutcome::Preview(Rect::from_corners(point, point))
            }
            Tool::Edit => match self.hit_test(store.current_boxes(), point) {
                Some((box_index, handle)) => {
                    let original = store.current_boxes()[box_index].rect();
                    self.gesture = Gesture::ResizingHandle {
                        box_index,
                        handle,
                        original,
                    };
                    self.selected = Some(box_index);
                    log::debug!("Resize started on box {} handle {}", box_index, handle.name());
                    InteractionOutcome::ResizeStarted { box_index, handle }
                }
                None => {
                    self.selected = None;
                    InteractionOutcome::SelectionCleared
                }
            },
        }
    }

    fn finish_drawing(
        &mut self,
        store: &mut AnnotationStore,
        rect: Rect,
    ) -> Result<InteractionOutcome, StoreError> {
        if !rect.meets_min_size(store.min_box_size()) {
            log::debug!(
                "Drawn box {:.1}x{:.1} below minimum size, discarded",
                rect.width,
                rect.height
            );
            return Ok(InteractionOutcome::Discarded);
        }
        let label = store.default_label().to_string();
        let box_index = store.add_box(BoxAnnotation::new(rect, label.as_str()))?;
        log::info!(
            "Box added: ({:.0}, {:.0}) {:.0}x{:.0} [{}]",
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            label
        );
        Ok(InteractionOutcome::Committed { box_index })
    }

    fn finish_resize(
        &mut self,
        store: &mut AnnotationStore,
        box_index: usize,
        live: Rect,
        bounds: Bounds,
    ) -> Result<InteractionOutcome, StoreError> {
        self.reset();
        let rect = geometry::normalize_box(live, bounds, store.min_box_size());
        store.set_box_rect(box_index, rect)?;
        log::debug!("Resize finished on box {}: {:?}", box_index, rect);
        Ok(InteractionOutcome::ResizeFinished { box_index, rect })
    }
}

/// Display canvas of the current image, if it is ready for interaction.
fn canvas_bounds(store: &AnnotationStore) -> Option<Bounds> {
    store
        .current_image()
        .filter(|img| img.is_ready())
        .map(|img| img.display_bounds())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ImageRecord;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn store_640() -> AnnotationStore {
        let mut store = AnnotationStore::default();
        store.add_image(ImageRecord::decoded(
            "a.jpg",
            "a.jpg",
            640,
            480,
            Bounds::new(640.0, 480.0),
        ));
        store
    }

    fn draw(m: &mut InteractionMachine, s: &mut AnnotationStore, a: Point, b: Point) {
        m.handle_event(s, PointerEvent::Down(a)).unwrap();
        m.handle_event(s, PointerEvent::Move(b)).unwrap();
        m.handle_event(s, PointerEvent::Up(b)).unwrap();
    }

    #[test]
    fn test_draw_commits_with_unlabeled() {
        let mut store = store_640();
        let mut m = InteractionMachine::default();

        m.handle_event(&mut store, PointerEvent::Down(p(200.0, 200.0)))
            .unwrap();
        let preview = m
            .handle_event(&mut store, PointerEvent::Move(p(100.0, 150.0)))
            .unwrap();
        assert_eq!(
            preview,
            InteractionOutcome::Preview(Rect::new(100.0, 150.0, 100.0, 50.0))
        );
        assert_eq!(m.preview(), Some(Rect::new(100.0, 150.0, 100.0, 50.0)));
        assert!(store.current_boxes().is_empty());

        let out = m
            .handle_event(&mut store, PointerEvent::Up(p(100.0, 150.0)))
            .unwrap();
        assert_eq!(out, InteractionOutcome::Committed { box_index: 0 });
        assert_eq!(*m.gesture(), Gesture::Idle);
        assert_eq!(store.current_boxes()[0].label, "unlabeled");
        assert_eq!(store.current_boxes()[0].rect(), Rect::new(100.0, 150.0, 100.0, 50.0));
    }

    #[test]
    fn test_draw_uses_first_label() {
        let mut store = store_640();
        store.add_label("car", None).unwrap();
        store.add_label("bus", None).unwrap();
        let mut m = InteractionMachine::default();
        draw(&mut m, &mut store, p(10.0, 10.0), p(50.0, 50.0));
        assert_eq!(store.current_boxes()[0].label, "car");
    }

    #[test]
    fn test_draw_too_small_discarded() {
        let mut store = store_640();
        let mut m = InteractionMachine::default();
        m.handle_event(&mut store, PointerEvent::Down(p(10.0, 10.0)))
            .unwrap();
        let out = m
            .handle_event(&mut store, PointerEvent::Up(p(13.0, 40.0)))
            .unwrap();
        assert_eq!(out, InteractionOutcome::Discarded);
        assert!(store.current_boxes().is_empty());
    }

    #[test]
    fn test_draw_clamps_to_canvas() {
        let mut store = store_640();
        let mut m = InteractionMachine::default();
        draw(&mut m, &mut store, p(-30.0, 400.0), p(700.0, 900.0));
        assert_eq!(store.current_boxes()[0].rect(), Rect::new(0.0, 400.0, 640.0, 80.0));
    }

    #[test]
    fn test_leave_discards_drawing() {
        let mut store = store_640();
        let mut m = InteractionMachine::default();
        m.handle_event(&mut store, PointerEvent::Down(p(10.0, 10.0)))
            .unwrap();
        m.handle_event(&mut store, PointerEvent::Move(p(90.0, 90.0)))
            .unwrap();
        let out = m.handle_event(&mut store, PointerEvent::Leave).unwrap();
        assert_eq!(out, InteractionOutcome::Discarded);
        assert!(store.current_boxes().is_empty());
        assert!(m.preview().is_none());
    }

    #[test]
    fn test_resize_live_then_normalize() {
        let mut store = store_640();
        let mut m = InteractionMachine::default();
        draw(&mut m, &mut store, p(100.0, 100.0), p(150.0, 150.0));
        m.set_tool(Tool::Edit);

        let out = m
            .handle_event(&mut store, PointerEvent::Down(p(101.0, 99.0)))
            .unwrap();
        assert_eq!(
            out,
            InteractionOutcome::ResizeStarted {
                box_index: 0,
                handle: Handle::TopLeft
            }
        );
        assert_eq!(m.selected_box(), Some(0));

        // Drag top-left past the bottom-right corner
        m.handle_event(&mut store, PointerEvent::Move(p(200.0, 180.0)))
            .unwrap();
        let live = store.current_boxes()[0].rect();
        assert!(live.width < 0.0 && live.height < 0.0);

        let out = m
            .handle_event(&mut store, PointerEvent::Up(p(200.0, 180.0)))
            .unwrap();
        let expected = Rect::new(150.0, 150.0, 50.0, 30.0);
        assert_eq!(
            out,
            InteractionOutcome::ResizeFinished {
                box_index: 0,
                rect: expected
            }
        );
        assert_eq!(store.current_boxes()[0].rect(), expected);
        assert_eq!(m.selected_box(), None);
    }

    #[test]
    fn test_leave_finishes_resize() {
        let mut store = store_640();
        let mut m = InteractionMachine::default();
        draw(&mut m, &mut store, p(100.0, 100.0), p(150.0, 150.0));
        m.set_tool(Tool::Edit);

        m.handle_event(&mut store, PointerEvent::Down(p(150.0, 150.0)))
            .unwrap();
        m.handle_event(&mut store, PointerEvent::Move(p(102.0, 130.0)))
            .unwrap();
        m.handle_event(&mut store, PointerEvent::Leave).unwrap();

        let r = store.current_boxes()[0].rect();
        assert_eq!(r, Rect::new(100.0, 100.0, 5.0, 30.0));
        assert_eq!(*m.gesture(), Gesture::Idle);
    }

    #[test]
    fn test_topmost_box_wins_hit_test() {
        let mut store = store_640();
        let mut m = InteractionMachine::default();
        draw(&mut m, &mut store, p(100.0, 100.0), p(200.0, 200.0));
        draw(&mut m, &mut store, p(100.0, 100.0), p(300.0, 300.0));
        m.set_tool(Tool::Edit);

        assert_eq!(
            m.hover_handle(&store, p(100.0, 100.0)),
            Some((1, Handle::TopLeft))
        );
        let out = m
            .handle_event(&mut store, PointerEvent::Down(p(100.0, 100.0)))
            .unwrap();
        assert_eq!(
            out,
            InteractionOutcome::ResizeStarted {
                box_index: 1,
                handle: Handle::TopLeft
            }
        );
    }

    #[test]
    fn test_edit_miss_clears_selection() {
        let mut store = store_640();
        let mut m = InteractionMachine::default();
        draw(&mut m, &mut store, p(100.0, 100.0), p(200.0, 200.0));
        m.set_tool(Tool::Edit);
        let out = m
            .handle_event(&mut store, PointerEvent::Down(p(400.0, 400.0)))
            .unwrap();
        assert_eq!(out, InteractionOutcome::SelectionCleared);
        assert_eq!(*m.gesture(), Gesture::Idle);
    }

    #[test]
    fn test_tool_switch_resets_gesture() {
        let mut store = store_640();
        let mut m = InteractionMachine::default();
        m.handle_event(&mut store, PointerEvent::Down(p(10.0, 10.0)))
            .unwrap();
        m.set_tool(Tool::Edit);
        assert_eq!(*m.gesture(), Gesture::Idle);

        // Stale up after the switch does nothing
        let out = m
            .handle_event(&mut store, PointerEvent::Up(p(100.0, 100.0)))
            .unwrap();
        assert_eq!(out, InteractionOutcome::Ignored);
        assert!(store.current_boxes().is_empty());
    }

    #[test]
    fn test_pending_image_ignores_events() {
        let mut store = AnnotationStore::default();
        store.add_image(ImageRecord::pending("x.jpg", "x.jpg"));
        let mut m = InteractionMachine::default();
        let out = m
            .handle_event(&mut store, PointerEvent::Down(p(10.0, 10.0)))
            .unwrap();
        assert_eq!(out, InteractionOutcome::Ignored);
        assert_eq!(*m.gesture(), Gesture::Idle);
    }

    #[test]
    fn test_box_removed_adjusts_gesture() {
        let mut store = store_640();
        let mut m = InteractionMachine::default();
        draw(&mut m, &mut store, p(10.0, 10.0), p(50.0, 50.0));
        draw(&mut m, &mut store, p(100.0, 100.0), p(200.0, 200.0));
        m.set_tool(Tool::Edit);
        m.handle_event(&mut store, PointerEvent::Down(p(200.0, 200.0)))
            .unwrap();
        assert_eq!(m.selected_box(), Some(1));

        m.box_removed(0);
        assert_eq!(m.selected_box(), Some(0));
        assert!(matches!(
            m.gesture(),
            Gesture::ResizingHandle { box_index: 0, .. }
        ));

        m.box_removed(0);
        assert_eq!(m.selected_box(), None);
        assert_eq!(*m.gesture(), Gesture::Idle);
    }

    #[test]
    fn test_finalized_boxes_stay_inside_canvas() {
        let mut store = store_640();
        let mut m = InteractionMachine::default();
        draw(&mut m, &mut store, p(600.0, 440.0), p(630.0, 470.0));
        m.set_tool(Tool::Edit);
        m.handle_event(&mut store, PointerEvent::Down(p(600.0, 440.0)))
            .unwrap();
        m.handle_event(&mut store, PointerEvent::Move(p(638.0, 478.0)))
            .unwrap();
        m.handle_event(&mut store, PointerEvent::Up(p(638.0, 478.0)))
            .unwrap();

        let r = store.current_boxes()[0].rect();
        assert!(r.width >= 5.0 && r.height >= 5.0);
        assert!(r.x >= 0.0 && r.y >= 0.0);
        assert!(r.right() <= 640.0 && r.bottom() <= 480.0);
    }
}
