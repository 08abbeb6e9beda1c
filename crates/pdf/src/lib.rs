use thiserror::Error;

use folio_core::{DocumentError, HierarchyError};

pub mod convert;
pub mod document;
pub mod images;
pub mod merge;
pub mod outline;
pub mod raster;

pub use convert::Converter;
pub use document::LopdfDocument;
pub use merge::AppendedPages;
pub use raster::Rasterizer;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Conversion failed: {0}")]
    Conversion(String),
    #[error("Rasterizer error: {0}")]
    Rasterizer(String),
    #[error("Invalid outline: {0}")]
    Outline(#[from] HierarchyError),
}

impl From<lopdf::Error> for PdfError {
    fn from(e: lopdf::Error) -> Self {
        PdfError::Parse(e.to_string())
    }
}

impl From<PdfError> for DocumentError {
    fn from(e: PdfError) -> Self {
        match e {
            PdfError::Outline(h) => DocumentError::Hierarchy(h),
            PdfError::Rasterizer(msg) => DocumentError::Render(msg),
            other => DocumentError::Backend(other.to_string()),
        }
    }
}

/// Best-effort decoding of raw PDF string bytes into a Rust `String`.
///
/// Handles three cases in order:
/// 1. UTF-16BE with BOM (`\xFE\xFF` prefix) -- strips BOM and decodes.
/// 2. Valid UTF-8 -- returned as-is.
/// 3. Fallback to Latin-1 (ISO 8859-1) -- each byte mapped to its Unicode
///    code point.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if let Some(payload) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let code_units: Vec<u16> = payload
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        return String::from_utf16_lossy(&code_units);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    bytes.iter().map(|&b| b as char).collect()
}

/// Encode a text string for a PDF string object: plain bytes when ASCII,
/// UTF-16BE with a BOM otherwise.
pub fn encode_text(text: &str) -> Vec<u8> {
    if text.is_ascii() {
        return text.as_bytes().to_vec();
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}
