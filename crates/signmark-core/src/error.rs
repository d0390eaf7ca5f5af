use thiserror::Error;

use crate::annotation::MarkKind;

#[derive(Error, Debug)]
pub enum SignError {
    #[error("Please select a valid PDF file (got {0})")]
    InvalidFileType(String),

    #[error("Failed to load PDF capabilities: {0}")]
    EditorInitFailure(String),

    #[error("Failed to load PDF document: {0}")]
    DocumentLoad(String),

    #[error("Failed to save PDF: {0}")]
    ExportFailure(#[from] ExportError),

    #[error("Annotation {0} not found")]
    UnknownAnnotation(u64),

    #[error("Annotation {id} is a {kind} mark and cannot hold that content")]
    KindMismatch { id: u64, kind: MarkKind },

    #[error("No document is open")]
    NoDocument,

    #[error("Editor is still loading")]
    EditorNotReady,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Failures inside the flatten pipeline. Any of these aborts the whole export.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Page {0} does not exist in the document")]
    PageNotFound(u32),

    #[error("Invalid image data URI: {0}")]
    DataUri(String),

    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    #[error("Failed to write PDF: {0}")]
    Serialize(String),
}
