//! Invoice and RFQ fields pulled from PDF text.

use std::sync::LazyLock;

use docrouter_shared::{ExtractedData, Intent};
use regex::Regex;
use serde_json::Value;

/// Value recorded when a textual field is not found.
pub const UNKNOWN: &str = "Unknown";

static INVOICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Invoice\s*#?\s*(\w+)").expect("valid regex"));

static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Amount\s*[:$]?\s*\$?([\d,.]+)").expect("valid regex"));

static DOLLAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\s*([\d,.]+)").expect("valid regex"));

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Date\s*[:.]?\s*(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})").expect("valid regex")
});

static RFQ_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)RFQ\s*#?\s*(\w+)").expect("valid regex"));

static DEADLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Deadline\s*[:.]?\s*(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})").expect("valid regex")
});

/// Deterministic field extraction for the document's intent.
///
/// Invoices yield `invoice_number`, `amount`, `date`; RFQs yield
/// `rfq_number`, `deadline`; other intents yield nothing.
pub fn extract_document_fields(text: &str, intent: Intent) -> ExtractedData {
    let mut data = ExtractedData::new();
    match intent {
        Intent::Invoice => {
            data.insert("invoice_number".into(), first_capture(&INVOICE_RE, text).into());
            data.insert("amount".into(), Value::from(extract_amount(text)));
            data.insert("date".into(), first_capture(&DATE_RE, text).into());
        }
        Intent::Rfq => {
            data.insert("rfq_number".into(), first_capture(&RFQ_RE, text).into());
            data.insert("deadline".into(), first_capture(&DEADLINE_RE, text).into());
        }
        Intent::Complaint | Intent::Regulation | Intent::GeneralInquiry => {}
    }
    data
}

/// Amount after an `Amount` label, else the first dollar figure, else 0.
pub fn extract_amount(text: &str) -> f64 {
    [&*AMOUNT_RE, &*DOLLAR_RE]
        .into_iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| parse_money(&caps[1]))
        .unwrap_or(0.0)
}

fn first_capture(re: &Regex, text: &str) -> String {
    re.captures(text)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// `1,250.00` -> 1250.0. Trailing sentence punctuation is ignored.
fn parse_money(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    cleaned.trim_end_matches('.').parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn invoice_fields() {
        let data = extract_document_fields(
            "Invoice #INV001 Date: 01/01/2023 Amount: $500.00",
            Intent::Invoice,
        );
        assert_eq!(data["invoice_number"], json!("INV001"));
        assert_eq!(data["amount"], json!(500.0));
        assert_eq!(data["date"], json!("01/01/2023"));
    }

    #[test]
    fn invoice_fields_missing() {
        let data = extract_document_fields("nothing useful here", Intent::Invoice);
        assert_eq!(data["invoice_number"], json!(UNKNOWN));
        assert_eq!(data["amount"], json!(0.0));
        assert_eq!(data["date"], json!(UNKNOWN));
    }

    #[test]
    fn amount_falls_back_to_dollar_figure() {
        assert_eq!(extract_amount("Total due: $1,250.75."), 1250.75);
        assert_eq!(extract_amount("AMOUNT 42"), 42.0);
        assert_eq!(extract_amount("Amount: ..."), 0.0);
    }

    #[test]
    fn rfq_fields() {
        let data = extract_document_fields(
            "RFQ #Q77 for bolts. Deadline: 15-03-2024",
            Intent::Rfq,
        );
        assert_eq!(data["rfq_number"], json!("Q77"));
        assert_eq!(data["deadline"], json!("15-03-2024"));
    }

    #[test]
    fn other_intents_are_empty() {
        assert!(extract_document_fields("Invoice #1", Intent::Complaint).is_empty());
        assert!(extract_document_fields("Invoice #1", Intent::GeneralInquiry).is_empty());
    }
}
