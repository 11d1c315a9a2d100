//! Format signals and the detector that runs them in precedence order.
//!
//! Signals are tried cheapest/most reliable first; `DefaultSignal` is the
//! always-last fallback, so detection never fails.

use docrouter_shared::DocumentFormat;

use crate::input::{DocumentInput, Probe};
use crate::pdf;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// One piece of evidence about a document's format.
pub trait FormatSignal: Send + Sync {
    /// Return the format this signal recognizes, or `None` to pass.
    fn detect(&self, probe: &Probe) -> Option<DocumentFormat>;

    /// Signal name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// Explicit file extension on the source hint, then on the input path.
pub struct ExtensionSignal;

impl ExtensionSignal {
    fn format_for(ext: &str) -> Option<DocumentFormat> {
        match ext {
            "pdf" => Some(DocumentFormat::Pdf),
            "json" => Some(DocumentFormat::Json),
            "eml" | "txt" | "email" => Some(DocumentFormat::Email),
            _ => None,
        }
    }
}

impl FormatSignal for ExtensionSignal {
    fn detect(&self, probe: &Probe) -> Option<DocumentFormat> {
        probe
            .hint_extension()
            .and_then(|ext| Self::format_for(&ext))
            .or_else(|| {
                probe
                    .path_extension
                    .as_deref()
                    .and_then(Self::format_for)
            })
    }

    fn name(&self) -> &str {
        "extension"
    }
}

/// Text that starts like JSON, parses, and is longer than `{}` / `[]`.
pub struct JsonContentSignal;

impl FormatSignal for JsonContentSignal {
    fn detect(&self, probe: &Probe) -> Option<DocumentFormat> {
        let text = probe.text.as_deref()?.trim();
        if !starts_like_json(text) || text.len() <= 2 {
            return None;
        }
        serde_json::from_str::<serde_json::Value>(text)
            .ok()
            .map(|_| DocumentFormat::Json)
    }

    fn name(&self) -> &str {
        "json-content"
    }
}

/// Raw `%PDF` magic bytes, or base64 text that decodes to them.
pub struct PdfSignatureSignal;

impl FormatSignal for PdfSignatureSignal {
    fn detect(&self, probe: &Probe) -> Option<DocumentFormat> {
        if probe.raw.as_deref().is_some_and(pdf::has_pdf_magic) {
            return Some(DocumentFormat::Pdf);
        }
        let text = probe.text.as_deref()?;
        if pdf::has_pdf_magic(text.as_bytes()) || pdf::looks_like_base64_pdf(text) {
            return Some(DocumentFormat::Pdf);
        }
        None
    }

    fn name(&self) -> &str {
        "pdf-signature"
    }
}

/// Email header markers or an `@`, in text that does not look like JSON.
pub struct EmailHeaderSignal;

const EMAIL_MARKERS: &[&str] = &["From:", "To:", "Subject:", "Date:", "Message-ID:", "@"];

impl FormatSignal for EmailHeaderSignal {
    fn detect(&self, probe: &Probe) -> Option<DocumentFormat> {
        let text = probe.text.as_deref()?;
        if starts_like_json(text.trim_start()) {
            return None;
        }
        EMAIL_MARKERS
            .iter()
            .any(|marker| text.contains(marker))
            .then_some(DocumentFormat::Email)
    }

    fn name(&self) -> &str {
        "email-headers"
    }
}

/// Substrings of the source label (`inbox-email`, `partner-api`).
pub struct SourceHintSignal;

impl FormatSignal for SourceHintSignal {
    fn detect(&self, probe: &Probe) -> Option<DocumentFormat> {
        let hint = probe.hint.to_ascii_lowercase();
        if hint.contains("email") {
            Some(DocumentFormat::Email)
        } else if hint.contains("json") || hint.contains("api") {
            Some(DocumentFormat::Json)
        } else {
            None
        }
    }

    fn name(&self) -> &str {
        "source-hint"
    }
}

/// Always matches: unclassifiable input is treated as email/text.
pub struct DefaultSignal;

impl FormatSignal for DefaultSignal {
    fn detect(&self, _probe: &Probe) -> Option<DocumentFormat> {
        Some(DocumentFormat::Email)
    }

    fn name(&self) -> &str {
        "default"
    }
}

fn starts_like_json(text: &str) -> bool {
    text.starts_with('{') || text.starts_with('[')
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Holds format signals in precedence order. First match wins.
pub struct FormatDetector {
    signals: Vec<Box<dyn FormatSignal>>,
}

impl FormatDetector {
    /// Detector with all built-in signals (extension first, default last).
    pub fn new() -> Self {
        Self {
            signals: vec![
                Box::new(ExtensionSignal),
                Box::new(JsonContentSignal),
                Box::new(PdfSignatureSignal),
                Box::new(EmailHeaderSignal),
                Box::new(SourceHintSignal),
                Box::new(DefaultSignal),
            ],
        }
    }

    /// Decide the format of `input`. Never fails; defaults to Email.
    pub fn detect(&self, input: &DocumentInput, source_hint: &str) -> DocumentFormat {
        let probe = Probe::new(input, source_hint);
        self.detect_probe(&probe)
    }

    /// Run the signals over an already-built probe.
    pub fn detect_probe(&self, probe: &Probe) -> DocumentFormat {
        for signal in &self.signals {
            if let Some(format) = signal.detect(probe) {
                tracing::debug!(signal = signal.name(), %format, "format detected");
                return format;
            }
        }
        DocumentFormat::Email
    }
}

impl Default for FormatDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience wrapper over a default [`FormatDetector`].
pub fn detect_format(input: &DocumentInput, source_hint: &str) -> DocumentFormat {
    FormatDetector::new().detect(input, source_hint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    fn detect_text(text: &str, hint: &str) -> DocumentFormat {
        detect_format(&DocumentInput::text(text), hint)
    }

    #[test]
    fn extension_wins_over_content() {
        let json = r#"{"order": {"id": "1"}}"#;
        assert_eq!(detect_text(json, "scan.pdf"), DocumentFormat::Pdf);
        assert_eq!(detect_text("From: a@b.c", "payload.JSON"), DocumentFormat::Json);
        assert_eq!(detect_text(json, "message.eml"), DocumentFormat::Email);
        assert_eq!(detect_text("%PDF-1.4", "notes.txt"), DocumentFormat::Email);
        assert_eq!(detect_text("", "mail.email"), DocumentFormat::Email);
    }

    #[test]
    fn path_extension_used_when_hint_has_none() {
        let input = DocumentInput::path("/nonexistent/inbox/order.json");
        assert_eq!(detect_format(&input, "upload"), DocumentFormat::Json);
    }

    #[test]
    fn well_formed_json_text_is_json() {
        assert_eq!(detect_text(r#"{"id": "12345"}"#, "inbox"), DocumentFormat::Json);
        assert_eq!(detect_text("  [1, 2, 3]\n", "inbox"), DocumentFormat::Json);
    }

    #[test]
    fn trivial_or_broken_json_falls_through() {
        // `{}` is too short to count as JSON content; no other signal applies.
        assert_eq!(detect_text("{}", "inbox"), DocumentFormat::Email);
        assert_eq!(detect_text("{}", "partner-api"), DocumentFormat::Json);
        // Starts like JSON but does not parse: only the default applies.
        assert_eq!(detect_text("{ from: a@b.c", "inbox"), DocumentFormat::Email);
    }

    #[test]
    fn base64_pdf_is_pdf() {
        let encoded = STANDARD.encode(b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog >>\nendobj");
        assert_eq!(detect_text(&encoded, "upload"), DocumentFormat::Pdf);
    }

    #[test]
    fn raw_pdf_bytes_are_pdf() {
        let input = DocumentInput::bytes(b"%PDF-1.4\n\xff\xfe binary".to_vec());
        assert_eq!(detect_format(&input, "upload"), DocumentFormat::Pdf);
    }

    #[test]
    fn email_headers_are_email() {
        let text = "From: buyer@example.com\nSubject: Quote please\n\nHello";
        assert_eq!(detect_text(text, "inbox"), DocumentFormat::Email);
        assert_eq!(detect_text("contact me at jo@example.com", "api"), DocumentFormat::Email);
    }

    #[test]
    fn source_hint_breaks_ties() {
        assert_eq!(detect_text("plain words", "partner-api"), DocumentFormat::Json);
        assert_eq!(detect_text("plain words", "json-feed"), DocumentFormat::Json);
        assert_eq!(detect_text("plain words", "Email-Gateway"), DocumentFormat::Email);
    }

    #[test]
    fn default_is_email() {
        assert_eq!(detect_text("plain words", "upload"), DocumentFormat::Email);
        let input = DocumentInput::bytes(vec![0x00, 0x9f, 0x92, 0x96]);
        assert_eq!(detect_format(&input, ""), DocumentFormat::Email);
    }
}
