//! Stateful signing session exposed to JavaScript
//!
//! All editor state lives in Rust. The page forwards DOM events with the
//! rendered page element, then re-renders from `snapshot()`.

use signmark_core::annotation::MarkKind;
use signmark_core::coords::{to_viewport_length, to_viewport_space, ElementRect, ViewportPoint};
use signmark_core::gesture::Release;
use signmark_core::placement::EditorRequest;
use signmark_core::{AppState, EditorConfig, SignError};
use wasm_bindgen::prelude::*;
use web_sys::{Element, MouseEvent};

use crate::download::trigger_download;

fn to_js(err: SignError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn page_rect(page: &Element) -> ElementRect {
    let rect = page.get_bounding_client_rect();
    ElementRect::new(rect.left(), rect.top(), rect.width(), rect.height())
}

fn pointer(event: &MouseEvent) -> ViewportPoint {
    ViewportPoint::new(event.client_x() as f64, event.client_y() as f64)
}

fn parse_kind(kind: &str) -> Result<MarkKind, JsValue> {
    MarkKind::parse(kind).ok_or_else(|| JsValue::from_str(&format!("Unknown mark kind: {}", kind)))
}

fn serialize<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[wasm_bindgen]
pub struct SignSession {
    state: AppState,
}

#[wasm_bindgen]
impl SignSession {
    /// Create a session. `config_json` may be a partial config or omitted.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<SignSession, JsValue> {
        let config = match config_json {
            Some(json) => EditorConfig::from_json(&json).map_err(to_js)?,
            None => EditorConfig::default(),
        };
        Ok(Self {
            state: AppState::new(config),
        })
    }

    /// The page's renderer finished loading
    #[wasm_bindgen(js_name = engineReady)]
    pub fn engine_ready(&mut self) {
        self.state.engine_ready();
    }

    #[wasm_bindgen(js_name = engineFailed)]
    pub fn engine_failed(&mut self, reason: &str) {
        self.state.engine_failed(reason);
    }

    /// Load a selected file. Returns document info on success.
    #[wasm_bindgen(js_name = openFile)]
    pub fn open_file(&mut self, name: &str, media_type: &str, bytes: &[u8]) -> Result<JsValue, JsValue> {
        let info = self
            .state
            .open_file(name, media_type, bytes.to_vec())
            .map_err(to_js)?;
        serialize(&info)
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }

    #[wasm_bindgen(getter, js_name = pageCount)]
    pub fn page_count(&self) -> u32 {
        self.state.page_count()
    }

    #[wasm_bindgen(getter, js_name = currentPage)]
    pub fn current_page(&self) -> u32 {
        self.state.current_page()
    }

    #[wasm_bindgen(js_name = nextPage)]
    pub fn next_page(&mut self) {
        self.state.next_page();
    }

    #[wasm_bindgen(js_name = prevPage)]
    pub fn prev_page(&mut self) {
        self.state.prev_page();
    }

    #[wasm_bindgen(getter)]
    pub fn scale(&self) -> f64 {
        self.state.zoom().scale()
    }

    #[wasm_bindgen(js_name = zoomIn)]
    pub fn zoom_in(&mut self) {
        self.state.zoom_in();
    }

    #[wasm_bindgen(js_name = zoomOut)]
    pub fn zoom_out(&mut self) {
        self.state.zoom_out();
    }

    #[wasm_bindgen(js_name = setZoom)]
    pub fn set_zoom(&mut self, scale: f64) {
        self.state.set_zoom(scale);
    }

    /// Enter placement mode for "signature", "initial" or "text"
    #[wasm_bindgen(js_name = activateTool)]
    pub fn activate_tool(&mut self, kind: &str) -> Result<(), JsValue> {
        let kind = parse_kind(kind)?;
        self.state.activate_tool(kind).map_err(to_js)
    }

    #[wasm_bindgen(js_name = cancelTool)]
    pub fn cancel_tool(&mut self) {
        self.state.cancel_tool();
    }

    /// Click on the page element. Returns the editor to open ("ink", "text")
    /// or undefined when nothing was placed.
    #[wasm_bindgen(js_name = canvasClick)]
    pub fn canvas_click(&mut self, event: &MouseEvent, page: &Element) -> Result<Option<String>, JsValue> {
        let request = self
            .state
            .canvas_click(pointer(event), page_rect(page))
            .map_err(to_js)?;
        Ok(request.map(|r| editor_name(&r).to_string()))
    }

    /// Press on an annotation box. Stops the event so the page does not
    /// also treat it as a placement click.
    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, id: f64, event: &MouseEvent, page: &Element) -> Result<(), JsValue> {
        event.stop_propagation();
        self.state
            .pointer_down(id as u64, pointer(event), page_rect(page))
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, event: &MouseEvent, page: &Element) {
        self.state.pointer_move(pointer(event), page_rect(page));
    }

    /// Returns "click", "moved" or undefined
    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self) -> Option<String> {
        match self.state.pointer_up() {
            Release::None => None,
            Release::Click(_) => Some("click".to_string()),
            Release::Moved(_) => Some("moved".to_string()),
        }
    }

    #[wasm_bindgen(js_name = doubleClick)]
    pub fn double_click(&mut self, id: f64) {
        self.state.double_click(id as u64);
    }

    #[wasm_bindgen(js_name = hoverEnter)]
    pub fn hover_enter(&mut self, id: f64) {
        self.state.hover_enter(id as u64);
    }

    #[wasm_bindgen(js_name = hoverLeave)]
    pub fn hover_leave(&mut self, id: f64) {
        self.state.hover_leave(id as u64);
    }

    /// Delete control on the hovered annotation. Stops the event so the
    /// press never reaches the drag or editor handlers underneath.
    pub fn delete(&mut self, id: f64, event: &MouseEvent) -> Result<(), JsValue> {
        event.stop_propagation();
        self.state.delete(id as u64).map(|_| ()).map_err(to_js)
    }

    /// Viewport box `[left, top, width, height]` for drawing an annotation
    #[wasm_bindgen(js_name = annotationRect)]
    pub fn annotation_rect(&self, id: f64, page: &Element) -> Option<Vec<f64>> {
        let annotation = self.state.annotations().get(id as u64)?;
        let scale = self.state.zoom().scale();
        let origin = to_viewport_space(annotation.position, &page_rect(page), scale);
        Some(vec![
            origin.x,
            origin.y,
            to_viewport_length(annotation.size.width, scale),
            to_viewport_length(annotation.size.height, scale),
        ])
    }

    // Ink pad, canvas-local pixel coordinates

    #[wasm_bindgen(js_name = inkDown)]
    pub fn ink_down(&mut self, x: f64, y: f64) {
        if let Some(pad) = self.state.ink_pad() {
            pad.pointer_down(x, y);
        }
    }

    #[wasm_bindgen(js_name = inkMove)]
    pub fn ink_move(&mut self, x: f64, y: f64) {
        if let Some(pad) = self.state.ink_pad() {
            pad.pointer_move(x, y);
        }
    }

    /// Pointer released or left the canvas
    #[wasm_bindgen(js_name = inkUp)]
    pub fn ink_up(&mut self) {
        if let Some(pad) = self.state.ink_pad() {
            pad.pointer_up();
        }
    }

    #[wasm_bindgen(js_name = inkClear)]
    pub fn ink_clear(&mut self) {
        if let Some(pad) = self.state.ink_pad() {
            pad.clear();
        }
    }

    /// Current pad contents as a PNG data URI, for painting a pre-loaded mark
    #[wasm_bindgen(js_name = inkPreview)]
    pub fn ink_preview(&mut self) -> Result<Option<String>, JsValue> {
        match self.state.ink_pad() {
            Some(pad) => pad
                .save()
                .map(Some)
                .map_err(|e| JsValue::from_str(&e.to_string())),
            None => Ok(None),
        }
    }

    // Text pad

    #[wasm_bindgen(js_name = setText)]
    pub fn set_text(&mut self, text: &str) {
        if let Some(pad) = self.state.text_pad() {
            pad.set_text(text);
        }
    }

    /// Enter in the text editor. Returns true when it committed the edit.
    #[wasm_bindgen(js_name = textEnter)]
    pub fn text_enter(&mut self, shift: bool) -> Result<bool, JsValue> {
        self.state.text_enter(shift).map_err(to_js)
    }

    /// Save the open editor. Returns false when there was nothing to save.
    #[wasm_bindgen(js_name = saveModal)]
    pub fn save_modal(&mut self) -> Result<bool, JsValue> {
        self.state.save_modal().map_err(to_js)
    }

    #[wasm_bindgen(js_name = cancelModal)]
    pub fn cancel_modal(&mut self) {
        self.state.cancel_modal();
    }

    /// Flatten the annotations and download the result
    #[wasm_bindgen(js_name = exportPdf)]
    pub fn export_pdf(&mut self) -> Result<(), JsValue> {
        let artifact = self.state.export().map_err(to_js)?;
        trigger_download(&artifact)
    }

    /// Flatten without downloading; returns the PDF bytes
    #[wasm_bindgen(js_name = exportBytes)]
    pub fn export_bytes(&mut self) -> Result<Vec<u8>, JsValue> {
        Ok(self.state.export().map_err(to_js)?.bytes)
    }

    /// Call periodically; expires the visible notification
    pub fn tick(&mut self) {
        self.state.tick();
    }

    #[wasm_bindgen(js_name = dismissNotification)]
    pub fn dismiss_notification(&mut self) {
        self.state.dismiss_notification();
    }

    /// Render state for the current frame
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        serialize(&self.state.snapshot())
    }

    /// Render state as a JSON string, for logging and test harnesses
    #[wasm_bindgen(js_name = snapshotJson)]
    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state.snapshot()).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// All annotations on every page, as JSON
    #[wasm_bindgen(js_name = annotationsJson)]
    pub fn annotations_json(&self) -> Result<String, JsValue> {
        self.state
            .annotations()
            .to_json()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

fn editor_name(request: &EditorRequest) -> &'static str {
    match request {
        EditorRequest::Ink { .. } => "ink",
        EditorRequest::Text { .. } => "text",
    }
}
