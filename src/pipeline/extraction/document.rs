use super::format::{detect_category, FileCategory};
use super::pdfium::extract_pdf_pages;
use super::sanitize::sanitize_extracted_text;
use super::types::{ExtractedText, TextExtractor};
use super::ExtractionError;

/// Stand-in text for image uploads. No OCR is performed; the narrative
/// provider is told it is looking at an image.
pub const IMAGE_NOTICE: &str = "This is a blood report image. Analysis based on visual content.";

/// Extractor for uploaded reports: PDF text layer, UTF-8 text, or the
/// image notice. The format is sniffed from the bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentTextExtractor;

impl TextExtractor for DocumentTextExtractor {
    fn extract(
        &self,
        bytes: &[u8],
        declared_content_type: Option<&str>,
    ) -> Result<ExtractedText, ExtractionError> {
        let category = detect_category(bytes, declared_content_type);

        tracing::debug!(
            category = category.as_str(),
            declared = declared_content_type.unwrap_or("none"),
            size = bytes.len(),
            "Extracting report text"
        );

        let (text, page_count) = match category {
            FileCategory::Pdf => {
                let pages = extract_pdf_pages(bytes)?;
                let page_count = pages.len();
                let text = pages
                    .iter()
                    .map(|p| sanitize_extracted_text(p))
                    .filter(|p| !p.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                (text, page_count)
            }

            FileCategory::PlainText => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| ExtractionError::EncodingError(e.to_string()))?;
                (sanitize_extracted_text(text), 1)
            }

            FileCategory::Image => (IMAGE_NOTICE.to_string(), 1),

            FileCategory::Unsupported => return Err(ExtractionError::UnsupportedFormat),
        };

        tracing::info!(
            category = category.as_str(),
            pages = page_count,
            text_length = text.len(),
            "Report text extracted"
        );

        Ok(ExtractedText {
            category,
            text,
            page_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_decoded_and_sanitized() {
        let bytes = "  Glucose: 95 mg/dL \n\n\nHemoglobin\x00: 14.5 g/dL\n".as_bytes();
        let result = DocumentTextExtractor.extract(bytes, Some("text/plain")).unwrap();

        assert_eq!(result.category, FileCategory::PlainText);
        assert_eq!(result.text, "Glucose: 95 mg/dL\nHemoglobin: 14.5 g/dL");
        assert_eq!(result.page_count, 1);
        assert!(!result.is_blank());
    }

    #[test]
    fn image_yields_notice() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00];
        let result = DocumentTextExtractor.extract(&png, Some("image/png")).unwrap();

        assert_eq!(result.category, FileCategory::Image);
        assert_eq!(result.text, IMAGE_NOTICE);
    }

    #[test]
    fn unsupported_binary_is_rejected() {
        let bytes = [0x00, 0x01, 0x02, 0xFF, 0xFE];
        let result = DocumentTextExtractor.extract(&bytes, Some("application/zip"));
        assert!(matches!(result, Err(ExtractionError::UnsupportedFormat)));
    }

    #[test]
    fn whitespace_only_text_is_blank() {
        let result = DocumentTextExtractor.extract(b"   \n\t \n", None).unwrap();
        assert!(result.is_blank());
    }
}
