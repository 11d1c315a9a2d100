//! Text extraction: turn a document of a known format into plain text.
//!
//! [`extract_text`] never fails. Decode errors become a bracketed placeholder
//! so that every document still reaches intent classification.

use docrouter_shared::{DocumentFormat, Result};
use tracing::instrument;

use crate::input::DocumentInput;
use crate::pdf;

/// Extract text, degrading to a placeholder describing the failure.
#[instrument(skip_all, fields(format = %format))]
pub fn extract_text(input: &DocumentInput, format: DocumentFormat) -> String {
    match try_extract_text(input, format) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "text extraction failed, using placeholder");
            extraction_placeholder(format, &e.to_string(), input.size())
        }
    }
}

/// Extract text, surfacing the underlying error.
pub fn try_extract_text(input: &DocumentInput, format: DocumentFormat) -> Result<String> {
    match format {
        DocumentFormat::Pdf => {
            let content = input.read_bytes()?;
            let bytes = pdf::pdf_bytes(&content)?;
            pdf::extract_pdf_text(&bytes)
        }
        DocumentFormat::Json => {
            let text = input.read_text()?;
            Ok(canonical_json(&text))
        }
        DocumentFormat::Email | DocumentFormat::Unknown => {
            Ok(input.read_text()?.into_owned())
        }
    }
}

/// Pretty-printed JSON when `text` parses, otherwise `text` unchanged.
fn canonical_json(text: &str) -> String {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| text.to_string())
}

/// Text standing in for a document whose extraction failed.
pub fn extraction_placeholder(format: DocumentFormat, reason: &str, size: u64) -> String {
    format!("[{format} extraction failed: {reason}] ({size} bytes)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::tests::make_test_pdf;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn pdf_bytes_extract_text() {
        let input = DocumentInput::bytes(make_test_pdf("Invoice INV042 Amount 120"));
        let text = extract_text(&input, DocumentFormat::Pdf);
        assert!(text.contains("INV042"), "got: {text}");
    }

    #[test]
    fn base64_pdf_text_extracts() {
        let encoded = STANDARD.encode(make_test_pdf("Request for quotation"));
        let input = DocumentInput::text(format!("data:application/pdf;base64,{encoded}"));
        let text = try_extract_text(&input, DocumentFormat::Pdf).unwrap();
        assert!(text.contains("quotation"), "got: {text}");
    }

    #[test]
    fn corrupt_pdf_yields_placeholder() {
        let input = DocumentInput::text("this is not a pdf at all");
        let text = extract_text(&input, DocumentFormat::Pdf);
        assert!(text.starts_with("[PDF extraction failed:"), "got: {text}");
        assert!(text.ends_with("(24 bytes)"), "got: {text}");
    }

    #[test]
    fn missing_file_yields_placeholder() {
        let input = DocumentInput::path("/nonexistent/dir/scan.pdf");
        let text = extract_text(&input, DocumentFormat::Pdf);
        assert!(text.starts_with("[PDF extraction failed:"));
        assert!(text.ends_with("(0 bytes)"));
    }

    #[test]
    fn json_is_pretty_printed_when_valid() {
        let input = DocumentInput::text(r#"{"id":"1","total":5}"#);
        let text = extract_text(&input, DocumentFormat::Json);
        assert_eq!(text, "{\n  \"id\": \"1\",\n  \"total\": 5\n}");

        let input = DocumentInput::text("{broken");
        assert_eq!(extract_text(&input, DocumentFormat::Json), "{broken");
    }

    #[test]
    fn email_bytes_are_decoded_lossily() {
        let input = DocumentInput::bytes(b"Subject: hi \xff there".to_vec());
        let text = extract_text(&input, DocumentFormat::Email);
        assert!(text.starts_with("Subject: hi "));
        assert!(text.ends_with(" there"));
    }
}
