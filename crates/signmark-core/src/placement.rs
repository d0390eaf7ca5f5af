//! Placement controller
//!
//! Holds the active tool and turns the next click on the page into
//! annotation(s) plus a request to open the matching editor.

use serde::Serialize;

use crate::annotation::{Annotation, AnnotationId, AnnotationSet, MarkKind};
use crate::config::MarkSizes;
use crate::coords::{to_document_space, ElementRect, ViewportPoint};
use crate::notify::Notification;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cursor {
    Default,
    Crosshair,
}

/// Which editor should open after an interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorRequest {
    Ink { id: AnnotationId, kind: MarkKind },
    Text { id: AnnotationId },
}

impl EditorRequest {
    pub fn for_annotation(annotation: &Annotation) -> Self {
        match annotation.kind() {
            MarkKind::Text => EditorRequest::Text { id: annotation.id },
            kind => EditorRequest::Ink {
                id: annotation.id,
                kind,
            },
        }
    }
}

/// Result of a qualifying placement click
#[derive(Debug, Clone)]
pub struct Placement {
    pub annotations: AnnotationSet,
    pub created: Vec<Annotation>,
    pub editor: EditorRequest,
    pub notification: Notification,
}

/// Inputs a placement click needs from the rest of the editor
#[derive(Debug, Clone, Copy)]
pub struct PlacementContext<'a> {
    /// Bounding rect of the rendered PDF page element (not the scroll container)
    pub page_rect: ElementRect,
    pub scale: f64,
    pub current_page: u32,
    pub page_count: u32,
    pub sizes: &'a MarkSizes,
}

#[derive(Debug, Clone, Default)]
pub struct PlacementController {
    active: Option<MarkKind>,
}

impl PlacementController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<MarkKind> {
        self.active
    }

    pub fn is_placing(&self) -> bool {
        self.active.is_some()
    }

    pub fn cursor(&self) -> Cursor {
        if self.is_placing() {
            Cursor::Crosshair
        } else {
            Cursor::Default
        }
    }

    /// Enter placement mode for `kind`
    pub fn activate(&mut self, kind: MarkKind) -> Notification {
        self.active = Some(kind);
        let target = match kind {
            MarkKind::Text => "text box",
            other => other.as_str(),
        };
        Notification::info(format!("Click where you want to place the {}", target))
    }

    pub fn cancel(&mut self) {
        self.active = None;
    }

    /// Handle a click on the document surface.
    ///
    /// Returns `None` when no tool is active; such clicks only dismiss.
    /// `base_id` is only consumed when a placement happens.
    pub fn place(
        &mut self,
        click: ViewportPoint,
        ctx: PlacementContext<'_>,
        annotations: &AnnotationSet,
        base_id: impl FnOnce(u64) -> AnnotationId,
    ) -> Option<Placement> {
        let kind = self.active.take()?;
        let position = to_document_space(click, &ctx.page_rect, ctx.scale);

        let span = match kind {
            MarkKind::Initial => ctx.page_count as u64,
            _ => 0,
        };
        let base = base_id(span);

        let (annotations, created) = annotations.create(
            kind,
            ctx.current_page,
            position,
            ctx.page_count,
            base,
            ctx.sizes,
        );

        // An initial on a zero-page document creates nothing to edit
        let first = created.first()?;
        let editor = EditorRequest::for_annotation(first);

        let notification = match kind {
            MarkKind::Signature => Notification::info("Signature placed"),
            MarkKind::Initial => {
                Notification::info(format!("Initials placed on {} pages", created.len()))
            }
            MarkKind::Text => Notification::info("Text box placed"),
        };

        tracing::debug!(
            kind = %kind,
            x = position.x,
            y = position.y,
            count = created.len(),
            "placed annotation"
        );

        Some(Placement {
            annotations,
            created,
            editor,
            notification,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::DocPoint;
    use pretty_assertions::assert_eq;

    fn ctx(sizes: &MarkSizes) -> PlacementContext<'_> {
        PlacementContext {
            page_rect: ElementRect::new(100.0, 200.0, 918.0, 1188.0),
            scale: 1.5,
            current_page: 2,
            page_count: 3,
            sizes,
        }
    }

    #[test]
    fn test_click_without_tool_is_noop() {
        let sizes = MarkSizes::default();
        let mut controller = PlacementController::new();
        let set = AnnotationSet::new();
        let result = controller.place(ViewportPoint::new(10.0, 10.0), ctx(&sizes), &set, |_| 1);
        assert!(result.is_none());
        assert_eq!(controller.cursor(), Cursor::Default);
    }

    #[test]
    fn test_activate_sets_crosshair_and_hint() {
        let mut controller = PlacementController::new();
        let note = controller.activate(MarkKind::Text);
        assert_eq!(controller.cursor(), Cursor::Crosshair);
        assert_eq!(note.message, "Click where you want to place the text box");

        let note = controller.activate(MarkKind::Signature);
        assert_eq!(note.message, "Click where you want to place the signature");
        controller.cancel();
        assert!(!controller.is_placing());
    }

    #[test]
    fn test_signature_placement() {
        let sizes = MarkSizes::default();
        let mut controller = PlacementController::new();
        controller.activate(MarkKind::Signature);

        let placement = controller
            .place(
                ViewportPoint::new(250.0, 350.0),
                ctx(&sizes),
                &AnnotationSet::new(),
                |span| {
                    assert_eq!(span, 0);
                    42
                },
            )
            .unwrap();

        assert_eq!(placement.created.len(), 1);
        let a = &placement.created[0];
        assert_eq!(a.page, 2);
        assert_eq!(a.position, DocPoint::new(100.0, 100.0));
        assert_eq!(
            placement.editor,
            EditorRequest::Ink {
                id: 42,
                kind: MarkKind::Signature
            }
        );
        assert!(!controller.is_placing());
    }

    #[test]
    fn test_initial_placement_fans_out_and_edits_first() {
        let sizes = MarkSizes::default();
        let mut controller = PlacementController::new();
        controller.activate(MarkKind::Initial);

        let placement = controller
            .place(
                ViewportPoint::new(130.0, 230.0),
                ctx(&sizes),
                &AnnotationSet::new(),
                |span| {
                    assert_eq!(span, 3);
                    1000
                },
            )
            .unwrap();

        assert_eq!(placement.annotations.len(), 3);
        assert_eq!(
            placement.editor,
            EditorRequest::Ink {
                id: 1001,
                kind: MarkKind::Initial
            }
        );
        assert_eq!(placement.notification.message, "Initials placed on 3 pages");
    }

    #[test]
    fn test_text_placement_opens_text_editor() {
        let sizes = MarkSizes::default();
        let mut controller = PlacementController::new();
        controller.activate(MarkKind::Text);
        let placement = controller
            .place(
                ViewportPoint::new(100.0, 200.0),
                ctx(&sizes),
                &AnnotationSet::new(),
                |_| 5,
            )
            .unwrap();
        assert_eq!(placement.editor, EditorRequest::Text { id: 5 });
        assert_eq!(placement.created[0].mark.text(), Some(""));
        assert_eq!(placement.created[0].position, DocPoint::new(0.0, 0.0));
    }
}
