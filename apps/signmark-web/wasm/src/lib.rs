//! WASM bindings for the SignMark annotation editor
//!
//! All editor state is held in Rust by `SignSession`; JavaScript renders
//! PDF pages, forwards DOM events and paints snapshots.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { SignSession, readFile } from './pkg/signmark_wasm.js';
//!
//! await init();
//! const session = new SignSession();
//! await loadRenderer().then(() => session.engineReady(), e => session.engineFailed(String(e)));
//!
//! const bytes = await readFile(input.files[0]);
//! session.openFile(file.name, file.type, bytes);
//! session.activateTool("signature");
//! pageEl.onclick = (e) => session.canvasClick(e, pageEl);
//! render(session.snapshot());
//! session.exportPdf();
//! ```

pub mod download;
pub mod logging;
pub mod session;

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

pub use session::SignSession;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    logging::init(tracing::Level::INFO);
    web_sys::console::log_1(&"SignMark WASM initialized".into());
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Read a selected file into bytes for `SignSession.openFile`
#[wasm_bindgen(js_name = readFile)]
pub async fn read_file(file: web_sys::File) -> Result<js_sys::Uint8Array, JsValue> {
    let buffer = JsFuture::from(file.array_buffer()).await?;
    Ok(js_sys::Uint8Array::new(&buffer))
}

/// Get page count from PDF bytes
#[wasm_bindgen]
pub fn get_page_count(bytes: &[u8]) -> Result<u32, JsValue> {
    signmark_core::get_page_count(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}


#[cfg(target_arch = "wasm32")]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_session_rejects_tool_before_engine_ready() {
        let mut session = SignSession::new(None).unwrap();
        assert!(session.activate_tool("signature").is_err());
    }

    #[wasm_bindgen_test]
    fn test_unknown_kind_is_error() {
        let mut session = SignSession::new(None).unwrap();
        session.engine_ready();
        assert!(session.activate_tool("stamp").is_err());
    }

    #[wasm_bindgen_test]
    fn test_delete_control_stops_propagation() {
        let mut session = SignSession::new(None).unwrap();
        session.engine_ready();
        let event = web_sys::MouseEvent::new("click").unwrap();
        // Nothing is placed, so the delete itself fails
        assert!(session.delete(1.0, &event).is_err());
        assert!(event.cancel_bubble());
    }

    #[wasm_bindgen_test]
    fn test_page_count_rejects_garbage() {
        assert!(get_page_count(&[0u8; 64]).is_err());
    }
}
