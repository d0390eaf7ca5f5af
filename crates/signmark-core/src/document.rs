//! Uploaded document intake
//!
//! Checks the declared media type, then validates the bytes enough to know
//! the page count before anything in the editor changes.

use lopdf::Document;
use serde::Serialize;

use crate::error::SignError;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Facts about a loaded PDF, exposed to the page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    pub name: String,
    pub page_count: u32,
    /// Header version, e.g. "1.7"
    pub version: String,
    pub encrypted: bool,
    pub size_bytes: usize,
    pub title: Option<String>,
}

/// The original bytes plus what validation learned about them
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    bytes: Vec<u8>,
    info: DocumentInfo,
}

impl LoadedDocument {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn info(&self) -> &DocumentInfo {
        &self.info
    }

    pub fn page_count(&self) -> u32 {
        self.info.page_count
    }
}

/// Accept a user-selected file. Only `application/pdf` is considered.
pub fn open_file(name: &str, media_type: &str, bytes: Vec<u8>) -> Result<LoadedDocument, SignError> {
    if !media_type.eq_ignore_ascii_case(PDF_MEDIA_TYPE) {
        let got = if media_type.is_empty() { name } else { media_type };
        return Err(SignError::InvalidFileType(got.to_string()));
    }

    if bytes.len() < 8 {
        return Err(SignError::DocumentLoad(
            "file too small to be a valid PDF".to_string(),
        ));
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err(SignError::DocumentLoad(
            "missing %PDF- header".to_string(),
        ));
    }

    let document = Document::load_mem(&bytes).map_err(|e| SignError::DocumentLoad(e.to_string()))?;
    let page_count = document.get_pages().len() as u32;
    if page_count == 0 {
        return Err(SignError::DocumentLoad("PDF has no pages".to_string()));
    }

    let info = DocumentInfo {
        name: name.to_string(),
        page_count,
        version: header_version(&bytes),
        encrypted: document.is_encrypted(),
        size_bytes: bytes.len(),
        title: title(&document),
    };
    tracing::info!(name, page_count, size = info.size_bytes, "document loaded");

    Ok(LoadedDocument { bytes, info })
}

fn header_version(bytes: &[u8]) -> String {
    std::str::from_utf8(&bytes[5..8])
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|_| "1.4".to_string())
}

fn title(document: &Document) -> Option<String> {
    let info_id = document.trailer.get(b"Info").ok()?.as_reference().ok()?;
    let title = document
        .get_dictionary(info_id)
        .ok()?
        .get(b"Title")
        .ok()?
        .as_str()
        .ok()?;
    let title = String::from_utf8_lossy(title).into_owned();
    (!title.is_empty()).then_some(title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testing::sample_pdf;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_open_valid_pdf() {
        let doc = open_file("lease.pdf", "application/pdf", sample_pdf(3, 612, 792)).unwrap();
        assert_eq!(doc.page_count(), 3);
        assert_eq!(doc.info().name, "lease.pdf");
        assert_eq!(doc.info().version, "1.7");
        assert!(!doc.info().encrypted);
    }

    #[test]
    fn test_rejects_non_pdf_media_type() {
        let err = open_file("photo.png", "image/png", vec![0; 32]).unwrap_err();
        assert!(matches!(err, SignError::InvalidFileType(ref t) if t == "image/png"));
    }

    #[test]
    fn test_rejects_pdf_bytes_with_wrong_type() {
        let err = open_file("doc.pdf", "", sample_pdf(1, 612, 792)).unwrap_err();
        assert!(matches!(err, SignError::InvalidFileType(ref t) if t == "doc.pdf"));
    }

    #[test]
    fn test_html_declared_as_pdf_fails_to_load() {
        let html = b"<!DOCTYPE html><html><body>Not a PDF</body></html>".to_vec();
        assert!(matches!(
            open_file("x.pdf", "application/pdf", html),
            Err(SignError::DocumentLoad(_))
        ));
    }

    #[test]
    fn test_truncated_pdf_fails_to_load() {
        assert!(matches!(
            open_file("x.pdf", "application/pdf", b"%PDF-1.7\n%%EOF".to_vec()),
            Err(SignError::DocumentLoad(_))
        ));
    }
}
