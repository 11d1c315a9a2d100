//! PDF signature sniffing, base64 payload decoding, and text-layer extraction.
//!
//! This is the single place that knows what a PDF looks like, whether it
//! arrives as raw bytes or as base64 text.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use docrouter_shared::{DocRouterError, Result};
use lopdf::Document;

/// The 4-byte magic header every PDF starts with.
pub const PDF_MAGIC: &[u8] = b"%PDF";

/// Base64 encoding of `%PDF-`, the prefix of any base64-encoded PDF.
pub const BASE64_PDF_PREFIX: &str = "JVBERi";

/// Number of base64 characters decoded when sniffing (a multiple of 4).
const SNIFF_CHARS: usize = 96;

/// True when `bytes` start with the PDF magic header (leading whitespace ignored).
pub fn has_pdf_magic(bytes: &[u8]) -> bool {
    bytes.trim_ascii_start().starts_with(PDF_MAGIC)
}

/// True when `text` is base64 that decodes to something starting with `%PDF`.
pub fn looks_like_base64_pdf(text: &str) -> bool {
    let payload = clean_base64(strip_data_url(text));
    if payload.starts_with(BASE64_PDF_PREFIX) {
        return true;
    }
    if payload.len() < 8 {
        return false;
    }

    let end = payload.len().min(SNIFF_CHARS) / 4 * 4;
    match STANDARD.decode(&payload[..end]) {
        Ok(decoded) => decoded.starts_with(PDF_MAGIC),
        Err(_) => false,
    }
}

/// Decode a base64 payload, accepting a `data:...;base64,` prefix and embedded whitespace.
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    let payload = clean_base64(strip_data_url(text));
    if payload.is_empty() {
        return Err(DocRouterError::Extraction("empty base64 payload".into()));
    }
    STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| DocRouterError::Extraction(format!("invalid base64: {e}")))
}

/// Resolve PDF bytes from content that is either raw PDF or base64 text.
///
/// Tried in order: raw magic header, then base64 decoding.
pub fn pdf_bytes(content: &[u8]) -> Result<Vec<u8>> {
    if has_pdf_magic(content) {
        return Ok(content.to_vec());
    }

    let text = std::str::from_utf8(content)
        .map_err(|_| DocRouterError::Extraction("not a PDF and not base64 text".into()))?;
    let decoded = decode_base64(text)?;
    if !has_pdf_magic(&decoded) {
        return Err(DocRouterError::Extraction(
            "decoded payload is not a PDF (missing %PDF header)".into(),
        ));
    }
    Ok(decoded)
}

/// Extract the text layer of every page, joined with spaces.
///
/// Pages whose text cannot be decoded are skipped; a document where no page
/// yields text is an error.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| DocRouterError::Extraction(format!("PDF parsing failed: {e}")))?;

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    if page_numbers.is_empty() {
        return Err(DocRouterError::Extraction("PDF has no pages".into()));
    }

    let mut parts = Vec::with_capacity(page_numbers.len());
    for page in &page_numbers {
        match doc.extract_text(&[*page]) {
            Ok(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    parts.push(text.to_string());
                }
            }
            Err(e) => tracing::debug!(page, error = %e, "skipping page without text layer"),
        }
    }

    if parts.is_empty() {
        return Err(DocRouterError::Extraction(format!(
            "no text layer found in {} page(s)",
            page_numbers.len()
        )));
    }

    Ok(parts.join(" "))
}

fn strip_data_url(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.starts_with("data:") {
        if let Some(idx) = trimmed.find(";base64,") {
            return &trimmed[idx + ";base64,".len()..];
        }
    }
    trimmed
}

fn clean_base64(text: &str) -> String {
    text.chars().filter(|c| !c.is_ascii_whitespace()).collect()
}
