//! Annotation placement, capture and flattening for PDF signing
//!
//! The engine is pure Rust and holds no browser types. A page forwards DOM
//! events into [`session::AppState`] and renders from its snapshots; the
//! export step burns the annotations into a copy of the original PDF.

pub mod annotation;
pub mod capture;
pub mod clock;
pub mod config;
pub mod coords;
pub mod document;
pub mod error;
pub mod export;
pub mod font;
pub mod gesture;
pub mod ids;
pub mod notify;
pub mod pdf;
pub mod placement;
pub mod raster;
pub mod session;

pub use annotation::{Annotation, AnnotationId, AnnotationPatch, AnnotationSet, Mark, MarkKind};
pub use config::EditorConfig;
pub use coords::{DocPoint, DocSize, ElementRect, ViewportPoint, Zoom};
pub use error::{ExportError, SignError};
pub use export::{flatten, ExportArtifact};
pub use session::{AppState, SessionSnapshot};

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, ExportError> {
    Ok(pdf::PdfDocument::load(bytes)?.page_count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        let bytes = pdf::testing::sample_pdf(5, 612, 792);
        assert_eq!(get_page_count(&bytes).unwrap(), 5);
    }

    #[test]
    fn test_page_count_rejects_garbage() {
        assert!(get_page_count(&[0u8; 100]).is_err());
    }
}
