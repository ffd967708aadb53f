use std::path::Path;

use serde::{Deserialize, Serialize};

/// Broad file categories an upload can fall into
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FileCategory {
    Pdf,
    Image,
    PlainText,
    Unsupported,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::PlainText => "plain_text",
            Self::Unsupported => "unsupported",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// Detect the category from magic bytes, not from the client's declared
/// content type.
///
/// When the bytes are inconclusive, an `image/*` declared type is trusted
/// so that image formats without a listed signature still get the image path.
pub fn detect_category(bytes: &[u8], declared_content_type: Option<&str>) -> FileCategory {
    match bytes {
        // PDF: starts with %PDF
        [0x25, 0x50, 0x44, 0x46, ..] => FileCategory::Pdf,
        // JPEG: starts with FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => FileCategory::Image,
        // PNG: starts with 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => FileCategory::Image,
        // TIFF: little-endian (49 49 2A 00) or big-endian (4D 4D 00 2A)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => FileCategory::Image,
        // HEIC/HEIF: "ftyp" at offset 4
        _ if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" => FileCategory::Image,
        _ if is_likely_text(bytes) => FileCategory::PlainText,
        _ if declared_content_type.is_some_and(|ct| ct.starts_with("image/")) => {
            FileCategory::Image
        }
        _ => FileCategory::Unsupported,
    }
}

/// Valid UTF-8 (in the first 4 KiB) and mostly printable.
fn is_likely_text(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(4096)];
    if head.is_empty() {
        return false;
    }

    let text = match std::str::from_utf8(head) {
        Ok(t) => t,
        // A multi-byte char cut at the 4 KiB boundary is still text.
        Err(e) if e.error_len().is_none() && e.valid_up_to() > 0 => {
            match std::str::from_utf8(&head[..e.valid_up_to()]) {
                Ok(t) => t,
                Err(_) => return false,
            }
        }
        Err(_) => return false,
    };

    // At least 80% printable characters (or whitespace)
    let total = text.chars().count();
    let printable = text
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .count();
    printable as f64 / total.max(1) as f64 > 0.80
}

/// Sanitize a client-supplied filename: strip path components, limit length.
pub fn sanitize_filename(original: &str) -> String {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("report");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .take(255)
        .collect();

    if clean.is_empty() {
        "report".to_string()
    } else {
        clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_pdf() {
        assert_eq!(detect_category(b"%PDF-1.7\n...", None), FileCategory::Pdf);
    }

    #[test]
    fn detects_jpeg_png_tiff() {
        assert_eq!(
            detect_category(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00], None),
            FileCategory::Image
        );
        assert_eq!(
            detect_category(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A], None),
            FileCategory::Image
        );
        assert_eq!(
            detect_category(&[0x49, 0x49, 0x2A, 0x00, 0x08], None),
            FileCategory::Image
        );
    }

    #[test]
    fn detects_heic_brand() {
        let mut bytes = vec![0x00, 0x00, 0x00, 0x18];
        bytes.extend_from_slice(b"ftypheic");
        assert_eq!(detect_category(&bytes, None), FileCategory::Image);
    }

    #[test]
    fn detects_plain_text() {
        assert_eq!(
            detect_category("Glucose: 95 mg/dL\nT4: 8 μg/dL".as_bytes(), None),
            FileCategory::PlainText
        );
    }

    #[test]
    fn magic_bytes_override_declared_type() {
        assert_eq!(
            detect_category(b"%PDF-1.4", Some("text/plain")),
            FileCategory::Pdf
        );
        assert_eq!(
            detect_category(b"Glucose: 95", Some("application/pdf")),
            FileCategory::PlainText
        );
    }

    #[test]
    fn declared_image_type_used_for_unknown_binary() {
        let bytes = [0x00, 0x01, 0x02, 0x03, 0xFE];
        assert_eq!(detect_category(&bytes, Some("image/webp")), FileCategory::Image);
        assert_eq!(detect_category(&bytes, None), FileCategory::Unsupported);
    }

    #[test]
    fn binary_and_empty_are_unsupported() {
        assert_eq!(detect_category(&[0x00, 0x01, 0x02, 0xFF], None), FileCategory::Unsupported);
        assert_eq!(detect_category(&[], None), FileCategory::Unsupported);
        assert!(!FileCategory::Unsupported.is_supported());
    }

    #[test]
    fn text_split_inside_multibyte_char_is_still_text() {
        let mut text = "a".repeat(4095);
        text.push('μ');
        assert_eq!(detect_category(text.as_bytes(), None), FileCategory::PlainText);
    }

    #[test]
    fn sanitize_filename_strips_paths() {
        assert_eq!(sanitize_filename("../../etc/report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("labs.pdf"), "labs.pdf");
        assert_eq!(sanitize_filename(""), "report");
    }
}
