//! PDF text-layer extraction via Google PDFium.
//!
//! Only the embedded text layer is read; nothing is rendered. A scanned PDF
//! therefore yields empty pages, which the analyzer reports as having no
//! extractable text.
//!
//! Each call loads a fresh `Pdfium` instance because the upstream type is
//! `!Send`. The OS caches `dlopen`/`LoadLibrary`, so repeat loads are cheap.

use pdfium_render::prelude::*;
use tracing::debug;

use super::ExtractionError;

/// Load the PDFium dynamic library.
///
/// Discovery order:
/// 1. `PDFIUM_DYNAMIC_LIB_PATH` env var (explicit path)
/// 2. Alongside the running executable, or in `<exe_dir>/pdfium/lib`
/// 3. System library search paths
pub(crate) fn load_pdfium() -> Result<Pdfium, ExtractionError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        debug!(path = %path, "Loading PDFium from env var");
        let bindings = Pdfium::bind_to_library(&path).map_err(|e| {
            ExtractionError::PdfiumUnavailable(format!("Failed to load PDFium from {path}: {e}"))
        })?;
        return Ok(Pdfium::new(bindings));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            let candidates = [
                exe_dir.to_path_buf(),
                exe_dir.join("pdfium").join("lib"),
            ];

            for dir in &candidates {
                let lib_path = Pdfium::pdfium_platform_library_name_at_path(
                    dir.to_string_lossy().as_ref(),
                );
                if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                    debug!(dir = %dir.display(), "Loaded PDFium from candidate directory");
                    return Ok(Pdfium::new(bindings));
                }
            }
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        ExtractionError::PdfiumUnavailable(format!(
            "PDFium library not found. Set PDFIUM_DYNAMIC_LIB_PATH or install PDFium: {e}"
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

/// Map PDF load errors, singling out password-protected documents.
pub(crate) fn map_load_error(e: PdfiumError) -> ExtractionError {
    let msg = format!("{e}");
    let lower = msg.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        ExtractionError::PdfEncrypted
    } else {
        ExtractionError::PdfParsing(format!("Failed to load PDF: {msg}"))
    }
}

/// Read the text layer of every page, in page order.
pub fn extract_pdf_pages(pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
    let pdfium = load_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(pdf_bytes, None)
        .map_err(map_load_error)?;

    let page_count = document.pages().len() as usize;
    if page_count == 0 {
        return Err(ExtractionError::EmptyDocument);
    }

    let pages: Vec<String> = document
        .pages()
        .iter()
        .map(|page| page.text().map(|t| t.all()).unwrap_or_default())
        .collect();

    debug!(
        pages = page_count,
        text_length = pages.iter().map(String::len).sum::<usize>(),
        "Read PDF text layer"
    );

    Ok(pages)
}
