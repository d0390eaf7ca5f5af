//! Editor session: the one explicit application state
//!
//! Every user interaction the page forwards lands on an `AppState` method.
//! Methods validate the engine gate first, mutate state, and push at most one
//! notification. The page re-renders from `snapshot()`.

use serde::Serialize;

use crate::annotation::{Annotation, AnnotationId, AnnotationPatch, AnnotationSet, MarkKind};
use crate::capture::{EnterKey, InkPad, TextPad};
use crate::clock::{Clock, SystemClock};
use crate::config::EditorConfig;
use crate::coords::{ElementRect, ViewportPoint, Zoom};
use crate::document::{open_file, DocumentInfo, LoadedDocument};
use crate::error::SignError;
use crate::export::{flatten, ExportArtifact};
use crate::gesture::{DragState, Hover, Release};
use crate::ids::IdAllocator;
use crate::notify::{Notification, NotificationChannel};
use crate::placement::{Cursor, EditorRequest, PlacementContext, PlacementController};

/// One-shot gate for the rendering engine the page loads asynchronously
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum EngineState {
    Loading,
    Ready,
    Failed(String),
}

/// Open editor, with its scratch pad
#[derive(Debug, Clone)]
pub enum Modal {
    None,
    Ink {
        id: AnnotationId,
        kind: MarkKind,
        pad: InkPad,
    },
    Text {
        id: AnnotationId,
        pad: TextPad,
    },
}

/// Last saved ink per kind, offered again when a fresh mark is opened
#[derive(Debug, Clone, Default)]
struct RememberedMarks {
    signature: Option<String>,
    initial: Option<String>,
}

impl RememberedMarks {
    fn get(&self, kind: MarkKind) -> Option<&str> {
        match kind {
            MarkKind::Signature => self.signature.as_deref(),
            MarkKind::Initial => self.initial.as_deref(),
            MarkKind::Text => None,
        }
    }

    fn remember(&mut self, kind: MarkKind, content: &str) {
        match kind {
            MarkKind::Signature => self.signature = Some(content.to_string()),
            MarkKind::Initial => self.initial = Some(content.to_string()),
            MarkKind::Text => {}
        }
    }
}

pub struct AppState {
    config: EditorConfig,
    clock: Box<dyn Clock>,
    engine: EngineState,
    document: Option<LoadedDocument>,
    current_page: u32,
    zoom: Zoom,
    annotations: AnnotationSet,
    placement: PlacementController,
    drag: DragState,
    hover: Hover,
    modal: Modal,
    notifications: NotificationChannel,
    remembered: RememberedMarks,
    ids: IdAllocator,
}

impl AppState {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock))
    }

    pub fn with_clock(config: EditorConfig, clock: Box<dyn Clock>) -> Self {
        Self {
            zoom: Zoom::new(config.zoom),
            notifications: NotificationChannel::new(config.notification_ttl_ms),
            config,
            clock,
            engine: EngineState::Loading,
            document: None,
            current_page: 1,
            annotations: AnnotationSet::new(),
            placement: PlacementController::new(),
            drag: DragState::Idle,
            hover: Hover::default(),
            modal: Modal::None,
            remembered: RememberedMarks::default(),
            ids: IdAllocator::new(),
        }
    }

    fn notify(&mut self, notification: Notification) {
        let now = self.clock.now_ms();
        self.notifications.push(notification, now);
    }

    /// Expire the visible notification if its time is up
    pub fn tick(&mut self) {
        let now = self.clock.now_ms();
        self.notifications.tick(now);
    }

    pub fn dismiss_notification(&mut self) {
        self.notifications.dismiss();
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    // Engine gate

    pub fn engine_ready(&mut self) {
        if self.engine == EngineState::Loading {
            tracing::info!("rendering engine ready");
            self.engine = EngineState::Ready;
        }
    }

    pub fn engine_failed(&mut self, reason: impl Into<String>) {
        if self.engine != EngineState::Loading {
            return;
        }
        let reason = reason.into();
        tracing::warn!(%reason, "rendering engine failed to load");
        self.notify(Notification::danger(
            SignError::EditorInitFailure(reason.clone()).to_string(),
        ));
        self.engine = EngineState::Failed(reason);
    }

    pub fn engine(&self) -> &EngineState {
        &self.engine
    }

    fn ensure_ready(&self) -> Result<(), SignError> {
        match &self.engine {
            EngineState::Ready => Ok(()),
            EngineState::Loading => Err(SignError::EditorNotReady),
            EngineState::Failed(reason) => Err(SignError::EditorInitFailure(reason.clone())),
        }
    }

    fn ensure_document(&self) -> Result<&LoadedDocument, SignError> {
        self.ensure_ready()?;
        self.document.as_ref().ok_or(SignError::NoDocument)
    }

    // Document

    /// Load a user-selected file. Failures change nothing but the notification.
    pub fn open_file(
        &mut self,
        name: &str,
        media_type: &str,
        bytes: Vec<u8>,
    ) -> Result<DocumentInfo, SignError> {
        self.ensure_ready()?;
        match open_file(name, media_type, bytes) {
            Ok(document) => {
                let info = document.info().clone();
                self.clear_editing();
                self.document = Some(document);
                self.current_page = 1;
                self.notify(Notification::success("PDF loaded successfully"));
                Ok(info)
            }
            Err(err) => {
                tracing::warn!(error = %err, name, "rejected file");
                let message = match &err {
                    SignError::InvalidFileType(_) => "Please select a valid PDF file".to_string(),
                    other => other.to_string(),
                };
                self.notify(Notification::danger(message));
                Err(err)
            }
        }
    }

    pub fn document(&self) -> Option<&DocumentInfo> {
        self.document.as_ref().map(LoadedDocument::info)
    }

    pub fn page_count(&self) -> u32 {
        self.document.as_ref().map_or(0, LoadedDocument::page_count)
    }

    /// Drop the document and every annotation; zoom returns to its default
    pub fn reset(&mut self) {
        self.clear_editing();
        self.document = None;
        self.current_page = 1;
        self.zoom.reset();
        tracing::info!("document reset");
    }

    fn clear_editing(&mut self) {
        self.annotations = self.annotations.clear();
        self.placement.cancel();
        self.drag = DragState::Idle;
        self.hover.clear();
        self.modal = Modal::None;
    }

    // Navigation and zoom

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Move by `step` pages; steps that leave `1..=page_count` are ignored
    pub fn navigate(&mut self, step: i64) {
        let target = self.current_page as i64 + step;
        if target >= 1 && target <= self.page_count().max(1) as i64 {
            self.current_page = target as u32;
        }
    }

    pub fn next_page(&mut self) {
        self.navigate(1);
    }

    pub fn prev_page(&mut self) {
        self.navigate(-1);
    }

    pub fn zoom(&self) -> &Zoom {
        &self.zoom
    }

    pub fn zoom_in(&mut self) {
        self.zoom.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.zoom.zoom_out();
    }

    pub fn set_zoom(&mut self, scale: f64) {
        self.zoom.set(scale);
    }

    // Placement

    pub fn activate_tool(&mut self, kind: MarkKind) -> Result<(), SignError> {
        self.ensure_document()?;
        let hint = self.placement.activate(kind);
        self.notify(hint);
        Ok(())
    }

    pub fn cancel_tool(&mut self) {
        self.placement.cancel();
    }

    /// Click on the rendered page. Places a mark when a tool is active.
    pub fn canvas_click(
        &mut self,
        click: ViewportPoint,
        page_rect: ElementRect,
    ) -> Result<Option<EditorRequest>, SignError> {
        let page_count = self.ensure_document()?.page_count();
        let ctx = PlacementContext {
            page_rect,
            scale: self.zoom.scale(),
            current_page: self.current_page,
            page_count,
            sizes: &self.config.sizes,
        };
        let ids = &mut self.ids;
        let now = self.clock.now_ms();
        let Some(placement) =
            self.placement
                .place(click, ctx, &self.annotations, |span| ids.next_base_at(now, span))
        else {
            return Ok(None);
        };

        self.annotations = placement.annotations;
        self.notify(placement.notification);
        self.open_editor(placement.editor);
        Ok(Some(placement.editor))
    }

    // Existing annotations

    pub fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }

    pub fn pointer_down(
        &mut self,
        id: AnnotationId,
        pointer: ViewportPoint,
        page_rect: ElementRect,
    ) -> Result<(), SignError> {
        self.ensure_document()?;
        let annotation = self
            .annotations
            .get(id)
            .ok_or(SignError::UnknownAnnotation(id))?;
        self.drag = DragState::pointer_down(
            id,
            pointer,
            annotation.position,
            &page_rect,
            self.zoom.scale(),
        );
        tracing::debug!(id, "pointer down on annotation");
        Ok(())
    }

    pub fn pointer_move(&mut self, pointer: ViewportPoint, page_rect: ElementRect) {
        let was_dragging = self.drag.is_dragging();
        let (next, moved) = self.drag.pointer_move(
            pointer,
            &page_rect,
            self.zoom.scale(),
            self.config.drag_threshold_px,
        );
        self.drag = next;
        if next.is_dragging() && !was_dragging {
            tracing::debug!(id = ?next.target(), "drag started");
        }

        if let Some(mv) = moved {
            match self
                .annotations
                .update(mv.id, &AnnotationPatch::position(mv.position))
            {
                Ok(updated) => self.annotations = updated,
                Err(err) => {
                    // The target went away mid-drag
                    tracing::warn!(error = %err, "dropping drag");
                    self.drag = DragState::Idle;
                }
            }
        }
    }

    /// Release. A press that never became a drag opens the annotation's editor.
    pub fn pointer_up(&mut self) -> Release {
        let (next, release) = self.drag.pointer_up();
        self.drag = next;
        if let Release::Click(id) = release {
            if let Some(annotation) = self.annotations.get(id) {
                let request = EditorRequest::for_annotation(annotation);
                self.open_editor(request);
            }
        }
        release
    }

    pub fn double_click(&mut self, id: AnnotationId) {
        if let Some(annotation) = self.annotations.get(id) {
            if annotation.kind() == MarkKind::Text {
                self.open_editor(EditorRequest::Text { id });
            }
        }
    }

    pub fn hover_enter(&mut self, id: AnnotationId) {
        self.hover.enter(id);
    }

    pub fn hover_leave(&mut self, id: AnnotationId) {
        self.hover.leave(id);
    }

    /// Remove one annotation via its delete control
    pub fn delete(&mut self, id: AnnotationId) -> Result<Annotation, SignError> {
        let (next, removed) = self.annotations.delete(id);
        let removed = removed.ok_or(SignError::UnknownAnnotation(id))?;
        self.annotations = next;
        self.hover.leave(id);
        if self.modal_target() == Some(id) {
            self.modal = Modal::None;
        }
        self.notify(Notification::warning(format!(
            "{} field removed",
            removed.kind().title()
        )));
        Ok(removed)
    }

    // Capture

    fn open_editor(&mut self, request: EditorRequest) {
        self.modal = match request {
            EditorRequest::Ink { id, kind } => {
                let prior = self
                    .annotations
                    .get(id)
                    .and_then(|a| a.mark.content())
                    .or_else(|| self.remembered.get(kind));
                let pad = match prior {
                    Some(uri) => InkPad::with_prior(&self.config.ink, uri).unwrap_or_else(|err| {
                        tracing::warn!(error = %err, "prior ink unreadable, opening blank pad");
                        InkPad::new(&self.config.ink)
                    }),
                    None => InkPad::new(&self.config.ink),
                };
                Modal::Ink { id, kind, pad }
            }
            EditorRequest::Text { id } => {
                let current = self
                    .annotations
                    .get(id)
                    .and_then(|a| a.mark.text())
                    .unwrap_or_default();
                Modal::Text {
                    id,
                    pad: TextPad::new(current),
                }
            }
        };
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    fn modal_target(&self) -> Option<AnnotationId> {
        match &self.modal {
            Modal::None => None,
            Modal::Ink { id, .. } | Modal::Text { id, .. } => Some(*id),
        }
    }

    /// The open ink pad, if any
    pub fn ink_pad(&mut self) -> Option<&mut InkPad> {
        match &mut self.modal {
            Modal::Ink { pad, .. } => Some(pad),
            _ => None,
        }
    }

    /// The open text pad, if any
    pub fn text_pad(&mut self) -> Option<&mut TextPad> {
        match &mut self.modal {
            Modal::Text { pad, .. } => Some(pad),
            _ => None,
        }
    }

    /// Enter pressed in the text editor; commits when it should
    pub fn text_enter(&mut self, shift: bool) -> Result<bool, SignError> {
        match self.text_pad().map(|pad| pad.enter(shift)) {
            Some(EnterKey::Commit) => self.save_modal(),
            _ => Ok(false),
        }
    }

    /// Commit the open editor. Returns `false` when there was nothing savable.
    pub fn save_modal(&mut self) -> Result<bool, SignError> {
        match std::mem::replace(&mut self.modal, Modal::None) {
            Modal::None => Ok(false),
            Modal::Ink { id, kind, pad } => {
                if !pad.can_save() {
                    self.notify(Notification::warning(format!(
                        "Please draw your {} first",
                        kind.as_str()
                    )));
                    self.modal = Modal::Ink { id, kind, pad };
                    return Ok(false);
                }
                let content = pad.save()?;
                self.annotations = match kind {
                    MarkKind::Initial => self.annotations.broadcast_content(kind, &content),
                    _ => self
                        .annotations
                        .update(id, &AnnotationPatch::content(content.clone()))?,
                };
                self.remembered.remember(kind, &content);
                self.notify(Notification::success(format!(
                    "{} created successfully",
                    kind.title()
                )));
                Ok(true)
            }
            Modal::Text { id, pad } => {
                if !pad.can_save() {
                    self.modal = Modal::Text { id, pad };
                    return Ok(false);
                }
                self.annotations = self
                    .annotations
                    .update(id, &AnnotationPatch::text(pad.text()))?;
                Ok(true)
            }
        }
    }

    /// Close the editor without touching the annotation
    pub fn cancel_modal(&mut self) {
        self.modal = Modal::None;
    }

    // Export

    /// Flatten every annotation into a copy of the loaded PDF.
    ///
    /// Runs to completion under `&mut self`, so exports never overlap.
    pub fn export(&mut self) -> Result<ExportArtifact, SignError> {
        let document = self.ensure_document()?;
        let result =
            flatten(document.bytes(), &self.annotations, &self.config.text).map_err(SignError::from);

        match result {
            Ok(bytes) => {
                tracing::info!(size = bytes.len(), "export complete");
                self.notify(Notification::success("PDF saved successfully!"));
                Ok(ExportArtifact::new(self.config.download_filename.clone(), bytes))
            }
            Err(err) => {
                tracing::warn!(error = %err, "export failed");
                self.notify(Notification::danger("Failed to save PDF"));
                Err(err)
            }
        }
    }

    // Rendering

    pub fn notification(&self) -> Option<&Notification> {
        self.notifications.current()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let page_annotations = self
            .annotations
            .list_for_page(self.current_page)
            .into_iter()
            .cloned()
            .collect();
        let modal = match &self.modal {
            Modal::None => ModalView::None,
            Modal::Ink { id, kind, pad } => ModalView::Ink {
                id: *id,
                kind: *kind,
                can_save: pad.can_save(),
                width: pad.width(),
                height: pad.height(),
            },
            Modal::Text { id, pad } => ModalView::Text {
                id: *id,
                text: pad.text().to_string(),
                can_save: pad.can_save(),
            },
        };

        SessionSnapshot {
            engine: self.engine.clone(),
            document: self.document().cloned(),
            current_page: self.current_page,
            page_count: self.page_count(),
            zoom: self.zoom.scale(),
            zoom_percent: self.zoom.percent(),
            tool: self.placement.active(),
            cursor: self.placement.cursor(),
            annotations: page_annotations,
            annotation_count: self.annotations.len(),
            hovered: self.hover.hovered(),
            dragging: self.drag.target().filter(|_| self.drag.is_dragging()),
            modal,
            notification: self.notifications.current().cloned(),
            notification_seq: self.notifications.sequence(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModalView {
    None,
    #[serde(rename_all = "camelCase")]
    Ink {
        id: AnnotationId,
        kind: MarkKind,
        can_save: bool,
        width: u32,
        height: u32,
    },
    #[serde(rename_all = "camelCase")]
    Text {
        id: AnnotationId,
        text: String,
        can_save: bool,
    },
}

/// Everything the page needs to render one frame
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub engine: EngineState,
    pub document: Option<DocumentInfo>,
    pub current_page: u32,
    pub page_count: u32,
    pub zoom: f64,
    pub zoom_percent: u32,
    pub tool: Option<MarkKind>,
    pub cursor: Cursor,
    /// Current page only, in paint order
    pub annotations: Vec<Annotation>,
    pub annotation_count: usize,
    pub hovered: Option<AnnotationId>,
    pub dragging: Option<AnnotationId>,
    pub modal: ModalView,
    pub notification: Option<Notification>,
    pub notification_seq: u64,
}
