pub mod document;
pub mod format;
pub mod pdfium;
pub mod sanitize;
pub mod types;

pub use document::*;
pub use format::*;
pub use sanitize::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("PDFium library unavailable: {0}")]
    PdfiumUnavailable(String),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("PDF is password-protected")]
    PdfEncrypted,

    #[error("Text encoding error: {0}")]
    EncodingError(String),

    #[error("Document has no pages")]
    EmptyDocument,

    #[error("Unsupported format for extraction")]
    UnsupportedFormat,
}
