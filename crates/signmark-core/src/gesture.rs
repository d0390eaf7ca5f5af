//! Drag/click disambiguation for placed annotations
//!
//! A press on an annotation starts as a potential drag. It becomes a drag once
//! the pointer travels past the threshold on either axis; a release before
//! that is a click and opens the annotation's editor.

use serde::Serialize;

use crate::annotation::AnnotationId;
use crate::coords::{to_document_space, DocPoint, ElementRect, ViewportPoint};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    PotentialDrag {
        id: AnnotationId,
        /// Pointer position relative to the annotation's top-left, document space
        offset: DocPoint,
        /// Raw pointer position at press time, viewport pixels
        start: ViewportPoint,
    },
    Dragging {
        id: AnnotationId,
        offset: DocPoint,
        start: ViewportPoint,
    },
}

impl Default for DragState {
    fn default() -> Self {
        DragState::Idle
    }
}

/// A position write-back produced while dragging
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Move {
    pub id: AnnotationId,
    pub position: DocPoint,
}

/// What a release resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Nothing was pressed
    None,
    /// Never crossed the threshold: open the editor
    Click(AnnotationId),
    /// Drag finished; position already written back
    Moved(AnnotationId),
}

impl DragState {
    /// Active annotation, if a press is in progress
    pub fn target(&self) -> Option<AnnotationId> {
        match self {
            DragState::Idle => None,
            DragState::PotentialDrag { id, .. } | DragState::Dragging { id, .. } => Some(*id),
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, DragState::Dragging { .. })
    }

    /// Press on an annotation currently at `annotation_position`
    pub fn pointer_down(
        id: AnnotationId,
        pointer: ViewportPoint,
        annotation_position: DocPoint,
        page_rect: &ElementRect,
        scale: f64,
    ) -> DragState {
        let pointer_doc = to_document_space(pointer, page_rect, scale);
        DragState::PotentialDrag {
            id,
            offset: pointer_doc.offset_from(annotation_position),
            start: pointer,
        }
    }

    /// Pointer moved. Returns the next state and, once dragging, the new position.
    pub fn pointer_move(
        self,
        pointer: ViewportPoint,
        page_rect: &ElementRect,
        scale: f64,
        threshold_px: f64,
    ) -> (DragState, Option<Move>) {
        let (id, offset, start) = match self {
            DragState::Idle => return (self, None),
            DragState::PotentialDrag { id, offset, start } => {
                let dx = (pointer.x - start.x).abs();
                let dy = (pointer.y - start.y).abs();
                if dx <= threshold_px && dy <= threshold_px {
                    return (self, None);
                }
                (id, offset, start)
            }
            DragState::Dragging { id, offset, start } => (id, offset, start),
        };

        let pointer_doc = to_document_space(pointer, page_rect, scale);
        let position = pointer_doc.offset_from(offset).clamped();
        (
            DragState::Dragging { id, offset, start },
            Some(Move { id, position }),
        )
    }

    /// Pointer released; always returns to `Idle`
    pub fn pointer_up(self) -> (DragState, Release) {
        let release = match self {
            DragState::Idle => Release::None,
            DragState::PotentialDrag { id, .. } => Release::Click(id),
            DragState::Dragging { id, .. } => Release::Moved(id),
        };
        (DragState::Idle, release)
    }
}

/// Tracks the single hovered annotation, which is the only one showing a
/// delete control
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Hover {
    hovered: Option<AnnotationId>,
}

impl Hover {
    pub fn enter(&mut self, id: AnnotationId) {
        self.hovered = Some(id);
    }

    /// Leaving a box that is no longer the hovered one does nothing
    pub fn leave(&mut self, id: AnnotationId) {
        if self.hovered == Some(id) {
            self.hovered = None;
        }
    }

    pub fn clear(&mut self) {
        self.hovered = None;
    }

    pub fn hovered(&self) -> Option<AnnotationId> {
        self.hovered
    }

    pub fn shows_delete(&self, id: AnnotationId) -> bool {
        self.hovered == Some(id)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: a drag by (dx, dy) pixels at scale s moves by (dx/s, dy/s), clamped at 0
        #[test]
        fn drag_delta_scales_with_zoom(
            s in 0.5f64..=3.0,
            x in 0.0f64..500.0,
            y in 0.0f64..700.0,
            dx in -400.0f64..400.0,
            dy in -400.0f64..400.0,
        ) {
            prop_assume!(dx.abs() > 3.01 || dy.abs() > 3.01);
            let page = ElementRect::new(40.0, -300.0, 612.0 * s, 792.0 * s);
            let start = ViewportPoint::new(page.left + (x + 5.0) * s, page.top + (y + 5.0) * s);

            let state = DragState::pointer_down(1, start, DocPoint::new(x, y), &page, s);
            let end = ViewportPoint::new(start.x + dx, start.y + dy);
            let (state, mv) = state.pointer_move(end, &page, s, 3.0);
            let mv = mv.expect("crossed threshold");

            let expected_x = (x + dx / s).max(0.0);
            let expected_y = (y + dy / s).max(0.0);
            prop_assert!((mv.position.x - expected_x).abs() < 1e-6);
            prop_assert!((mv.position.y - expected_y).abs() < 1e-6);
            prop_assert_eq!(state.pointer_up().1, Release::Moved(1));
        }

        /// Property: total movement within 3px on both axes is a click with no move
        #[test]
        fn jitter_is_click(
            dx in -3.0f64..=3.0,
            dy in -3.0f64..=3.0,
        ) {
            let page = ElementRect::new(0.0, 0.0, 612.0, 792.0);
            let start = ViewportPoint::new(200.0, 200.0);
            let state = DragState::pointer_down(9, start, DocPoint::new(190.0, 190.0), &page, 1.0);
            let (state, mv) =
                state.pointer_move(ViewportPoint::new(200.0 + dx, 200.0 + dy), &page, 1.0, 3.0);
            prop_assert!(mv.is_none());
            prop_assert_eq!(state.pointer_up().1, Release::Click(9));
        }
    }
}
