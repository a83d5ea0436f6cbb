//! Raw-text fallback using the `pdf-extract` crate.
//!
//! Used when the extraction service gave up on a file. `pdf-extract` returns
//! all pages as one string with form feeds between pages; without form feeds
//! the whole text is treated as page 1.

use std::path::Path;

use crate::references::chunker::PageText;
use crate::references::error::{ReferenceError, ReferenceResult};

/// Extract per-page text from a PDF file.
pub fn extract_pages(path: &Path) -> ReferenceResult<Vec<PageText>> {
    let data = std::fs::read(path)?;
    extract_pages_from_mem(&data).map_err(|message| ReferenceError::MalformedArtifact {
        path: path.display().to_string(),
        message,
    })
}

/// Extract per-page text from PDF bytes.
pub fn extract_pages_from_mem(data: &[u8]) -> Result<Vec<PageText>, String> {
    // pdf-extract panics on some malformed inputs; one bad upload must not
    // take the batch down with it.
    let text = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(data))
        .map_err(|_| "pdf text extraction panicked".to_string())?
        .map_err(|e| e.to_string())?;

    Ok(split_pages(&text))
}

/// Split extracted text on form feeds into 1-based pages. Blank pages keep
/// their number but carry no text.
pub fn split_pages(text: &str) -> Vec<PageText> {
    text.split('\x0C')
        .enumerate()
        .map(|(i, page)| PageText::new(i as u32 + 1, page.trim()))
        .collect()
}
