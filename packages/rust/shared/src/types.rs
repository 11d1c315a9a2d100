//! Core domain types for docrouter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Open, insertion-ordered mapping used for `extracted_data` and agent payloads.
pub type ExtractedData = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// ThreadId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper correlating every processing step for one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub Uuid);

impl ThreadId {
    /// Generate a new time-sortable thread identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ThreadId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// DocumentFormat
// ---------------------------------------------------------------------------

/// Container format of a submitted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentFormat {
    #[serde(rename = "PDF")]
    Pdf,
    #[serde(rename = "JSON")]
    Json,
    Email,
    /// Only recorded for degraded contexts whose classification failed.
    Unknown,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Json => "JSON",
            Self::Email => "Email",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Intent
// ---------------------------------------------------------------------------

/// Business intent of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    Invoice,
    #[serde(rename = "RFQ")]
    Rfq,
    Complaint,
    Regulation,
    #[serde(rename = "General Inquiry")]
    GeneralInquiry,
}

impl Intent {
    /// Every intent, in the order offered to the classifier.
    pub const ALL: [Intent; 5] = [
        Intent::Invoice,
        Intent::Rfq,
        Intent::Complaint,
        Intent::Regulation,
        Intent::GeneralInquiry,
    ];

    /// Wire label, identical to the serde representation.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Invoice => "Invoice",
            Self::Rfq => "RFQ",
            Self::Complaint => "Complaint",
            Self::Regulation => "Regulation",
            Self::GeneralInquiry => "General Inquiry",
        }
    }

    /// Parse a label case-insensitively. Unknown labels yield `None`, never a guess.
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim();
        Self::ALL
            .into_iter()
            .find(|intent| intent.label().eq_ignore_ascii_case(wanted))
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// ProcessingContext
// ---------------------------------------------------------------------------

/// Per-document processing trace kept in the context store.
///
/// Identity fields are fixed at creation; only `extracted_data` grows, one
/// namespaced key at a time, through [`ProcessingContext::merge`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingContext {
    thread_id: ThreadId,
    source: String,
    #[serde(rename = "type")]
    format: DocumentFormat,
    intent: Intent,
    #[serde(default)]
    extracted_data: ExtractedData,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProcessingContext {
    /// Create a fresh context with a newly generated thread id.
    pub fn new(
        source: impl Into<String>,
        format: DocumentFormat,
        intent: Intent,
        extracted_data: ExtractedData,
    ) -> Self {
        let now = Utc::now();
        Self {
            thread_id: ThreadId::new(),
            source: source.into(),
            format,
            intent,
            extracted_data,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn thread_id(&self) -> &ThreadId {
        &self.thread_id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    pub fn extracted_data(&self) -> &ExtractedData {
        &self.extracted_data
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Insert each key of `partial`, replacing same-named keys, and refresh `updated_at`.
    pub fn merge(&mut self, partial: ExtractedData) {
        for (key, value) in partial {
            self.extracted_data.insert(key, value);
        }
        self.updated_at = Utc::now();
    }
}

// ---------------------------------------------------------------------------
// CanonicalOrderRecord
// ---------------------------------------------------------------------------

/// Canonical order shape every JSON document is normalized into.
///
/// Field names are wire-visible and must not change.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CanonicalOrderRecord {
    /// Empty when no identifier could be found (always paired with an anomaly).
    pub order_id: String,
    pub customer_name: String,
    pub items: Vec<Value>,
    pub total_amount: f64,
    /// Non-fatal validation findings, in discovery order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rfq_specific: Option<Value>,
    /// Full original input, retained for manual review of unknown shapes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_structure: Option<Value>,
    /// Elements of a top-level array that were not normalized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_items_count: Option<usize>,
}

impl CanonicalOrderRecord {
    /// Empty record carrying a single anomaly.
    pub fn degraded(anomaly: impl Into<String>) -> Self {
        Self {
            anomalies: vec![anomaly.into()],
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn thread_id_roundtrip() {
        let id = ThreadId::new();
        let s = id.to_string();
        let parsed: ThreadId = s.parse().expect("parse ThreadId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn format_and_intent_wire_labels() {
        assert_eq!(serde_json::to_value(DocumentFormat::Pdf).unwrap(), json!("PDF"));
        assert_eq!(serde_json::to_value(DocumentFormat::Email).unwrap(), json!("Email"));
        assert_eq!(
            serde_json::to_value(Intent::GeneralInquiry).unwrap(),
            json!("General Inquiry")
        );
        let parsed: Intent = serde_json::from_value(json!("RFQ")).unwrap();
        assert_eq!(parsed, Intent::Rfq);
    }

    #[test]
    fn intent_from_label_is_strict() {
        assert_eq!(Intent::from_label("invoice"), Some(Intent::Invoice));
        assert_eq!(Intent::from_label(" general inquiry "), Some(Intent::GeneralInquiry));
        assert_eq!(Intent::from_label("Refund"), None);
        assert_eq!(Intent::from_label(""), None);
    }

    #[test]
    fn context_merge_adds_keys_without_replacing_map() {
        let mut initial = ExtractedData::new();
        initial.insert("raw_text".into(), json!("hello"));
        let mut ctx = ProcessingContext::new("upload.txt", DocumentFormat::Email, Intent::Rfq, initial);
        let created = ctx.updated_at();

        let mut partial = ExtractedData::new();
        partial.insert("email_extracted_data".into(), json!({"sender": "a@b.c"}));
        ctx.merge(partial);

        assert_eq!(ctx.extracted_data().len(), 2);
        assert_eq!(ctx.extracted_data()["raw_text"], json!("hello"));
        assert!(ctx.updated_at() >= created);
        assert_eq!(ctx.intent(), Intent::Rfq);
        assert_eq!(ctx.format(), DocumentFormat::Email);
    }

    #[test]
    fn context_serializes_format_as_type() {
        let ctx = ProcessingContext::new("api", DocumentFormat::Json, Intent::Invoice, ExtractedData::new());
        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(value["type"], json!("JSON"));
        assert_eq!(value["intent"], json!("Invoice"));
        let back: ProcessingContext = serde_json::from_value(value).unwrap();
        assert_eq!(back, ctx);
    }

    #[test]
    fn record_omits_empty_optional_keys() {
        let record = CanonicalOrderRecord {
            order_id: "12345".into(),
            customer_name: "Jane Smith".into(),
            items: vec![json!("Product X")],
            total_amount: 10.0,
            ..Default::default()
        };
        let value = serde_json::to_value(&record).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["order_id", "customer_name", "items", "total_amount"]);

        let degraded = CanonicalOrderRecord::degraded("Empty array provided");
        let value = serde_json::to_value(&degraded).unwrap();
        assert_eq!(value["anomalies"], json!(["Empty array provided"]));
    }
}
