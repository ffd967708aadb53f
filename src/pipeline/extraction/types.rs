use serde::Serialize;

use super::format::FileCategory;
use super::ExtractionError;

/// Plain text recovered from an uploaded document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedText {
    pub category: FileCategory,
    pub text: String,
    pub page_count: usize,
}

impl ExtractedText {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Document-to-text abstraction (allows mocking for tests)
pub trait TextExtractor: Send + Sync {
    fn extract(
        &self,
        bytes: &[u8],
        declared_content_type: Option<&str>,
    ) -> Result<ExtractedText, ExtractionError>;
}
