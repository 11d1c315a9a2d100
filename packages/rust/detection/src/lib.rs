//! Format detection and text extraction for docrouter.
//!
//! Documents arrive as a file path, inline text, or raw bytes, with no
//! declared content type. [`FormatDetector`] decides PDF / JSON / Email from an
//! ordered list of [`FormatSignal`]s, and [`extract_text`] turns the document
//! into plain text for classification.

mod extract;
mod input;
pub mod pdf;
mod signals;

pub use extract::{extract_text, extraction_placeholder, try_extract_text};
pub use input::{DocumentInput, MAX_DOCUMENT_SIZE, Probe};
pub use signals::{
    DefaultSignal, EmailHeaderSignal, ExtensionSignal, FormatDetector, FormatSignal,
    JsonContentSignal, PdfSignatureSignal, SourceHintSignal, detect_format,
};
