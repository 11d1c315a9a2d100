//! Format-specific processing agents.
//!
//! Each agent receives the classified document's text, produces a result,
//! and merges its own namespaced keys into the thread's context.

mod email;
mod json;
mod pdf;

pub use email::{CONTENT_CHARS, EmailAgent, EmailRecord};
pub use json::{JsonAgent, RAW_INPUT_CHARS};
pub use pdf::PdfAgent;

/// How agent fields were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    Llm,
    Regex,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Regex => "regex",
        }
    }
}
