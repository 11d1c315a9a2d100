//! Sender, subject, and urgency pulled from email text.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static FROM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"From:\s*([^\n]+)").expect("valid regex"));

static SUBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Subject:\s*([^\n]+)").expect("valid regex"));

const HIGH_URGENCY: &[&str] = &["urgent", "asap", "immediately", "rush"];
const MEDIUM_URGENCY: &[&str] = &["soon", "quickly", "priority"];

/// How quickly an email asks to be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    /// Parse `High`/`Medium`/`Low` case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Fields a CRM needs from an inbound email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailFields {
    pub sender: String,
    pub subject: String,
    pub urgency: Urgency,
    pub sentiment: String,
    pub key_entities: Vec<String>,
}

/// Deterministic extraction from raw email text.
pub fn extract_email_fields(text: &str) -> EmailFields {
    EmailFields {
        sender: header(&FROM_RE, text).unwrap_or_else(|| "unknown".into()),
        subject: header(&SUBJECT_RE, text).unwrap_or_else(|| "No subject".into()),
        urgency: classify_urgency(text),
        sentiment: "Neutral".into(),
        key_entities: Vec::new(),
    }
}

/// Keyword urgency: any high marker wins over medium markers.
pub fn classify_urgency(text: &str) -> Urgency {
    let lower = text.to_lowercase();
    if HIGH_URGENCY.iter().any(|w| lower.contains(w)) {
        Urgency::High
    } else if MEDIUM_URGENCY.iter().any(|w| lower.contains(w)) {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

fn header(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|v| !v.is_empty())
}
