use std::sync::Arc;
use std::time::Duration;

use docrouter_fields::{EmailFields, Urgency, extract_email_fields};
use docrouter_shared::{ExtractedData, ThreadId};
use docrouter_storage::ContextRecorder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::ExtractionMethod;
use crate::llm::LlmCapability;
use crate::text::prefix;

/// Characters of the email body copied into the CRM record.
pub const CONTENT_CHARS: usize = 500;

const EXTRACTION_HINT: &str = "email fields: sender, subject, urgency (High, Medium or Low), \
                               sentiment, key_entities (list of strings)";

/// CRM-ready view of an inbound email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailRecord {
    pub sender: String,
    pub subject: String,
    pub content: String,
    pub urgency: Urgency,
    pub sentiment: String,
    pub key_entities: Vec<String>,
}

/// Sender, subject, urgency, and sentiment extraction from email text.
pub struct EmailAgent {
    llm: Option<Arc<dyn LlmCapability>>,
    timeout: Duration,
    recorder: Arc<ContextRecorder>,
}

impl EmailAgent {
    pub fn new(
        llm: Option<Arc<dyn LlmCapability>>,
        timeout: Duration,
        recorder: Arc<ContextRecorder>,
    ) -> Self {
        Self {
            llm,
            timeout,
            recorder,
        }
    }

    #[instrument(skip_all, fields(thread_id = %thread_id))]
    pub async fn process(&self, thread_id: &ThreadId, text: &str) -> EmailRecord {
        let fallback = extract_email_fields(text);
        let (fields, method) = match self.llm_fields(text).await {
            Some(llm) => (overlay(fallback, &llm), ExtractionMethod::Llm),
            None => (fallback, ExtractionMethod::Regex),
        };
        debug!(method = method.as_str(), urgency = ?fields.urgency, "email fields extracted");

        let record = EmailRecord {
            sender: fields.sender,
            subject: fields.subject,
            content: prefix(text, CONTENT_CHARS).to_string(),
            urgency: fields.urgency,
            sentiment: fields.sentiment,
            key_entities: fields.key_entities,
        };

        let mut partial = ExtractedData::new();
        match serde_json::to_value(&record) {
            Ok(value) => {
                partial.insert("email_extracted_data".into(), value);
            }
            Err(e) => warn!(error = %e, "email record not serializable"),
        }
        partial.insert("email_content_length".into(), text.chars().count().into());
        self.recorder.merge(thread_id, partial).await;

        record
    }

    async fn llm_fields(&self, text: &str) -> Option<ExtractedData> {
        let llm = self.llm.as_ref()?;
        match tokio::time::timeout(self.timeout, llm.extract(text, EXTRACTION_HINT)).await {
            Ok(Ok(fields)) => Some(fields),
            Ok(Err(e)) => {
                warn!(error = %e, "llm extraction failed, using regex fields");
                None
            }
            Err(_) => {
                warn!("llm extraction timed out, using regex fields");
                None
            }
        }
    }
}

/// LLM values win where present and well-typed; regex values fill the gaps.
fn overlay(mut base: EmailFields, llm: &ExtractedData) -> EmailFields {
    let text = |key: &str| {
        llm.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    if let Some(sender) = text("sender") {
        base.sender = sender;
    }
    if let Some(subject) = text("subject") {
        base.subject = subject;
    }
    if let Some(urgency) = text("urgency").as_deref().and_then(Urgency::from_label) {
        base.urgency = urgency;
    }
    if let Some(sentiment) = text("sentiment") {
        base.sentiment = sentiment;
    }
    if let Some(Value::Array(entities)) = llm.get("key_entities") {
        base.key_entities = entities
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }
    base
}
