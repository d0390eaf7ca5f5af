//! Browser download trigger for exported documents

use signmark_core::ExportArtifact;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Url};

/// Hand the bytes to the browser as a file download.
///
/// Creates a Blob and an object URL, clicks a detached anchor carrying the
/// filename, then revokes the URL.
pub fn trigger_download(artifact: &ExportArtifact) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let array = js_sys::Uint8Array::from(artifact.bytes.as_slice());
    let parts = js_sys::Array::of1(&array);
    let options = BlobPropertyBag::new();
    options.set_type(artifact.media_type);
    let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;

    let url = Url::create_object_url_with_blob(&blob)?;
    let anchor: HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
    anchor.set_href(&url);
    anchor.set_download(&artifact.filename);
    anchor.click();
    Url::revoke_object_url(&url)?;

    tracing::info!(filename = %artifact.filename, size = artifact.bytes.len(), "download triggered");
    Ok(())
}
