use std::sync::Arc;
use std::time::Duration;

use docrouter_fields::extract_document_fields;
use docrouter_shared::{ExtractedData, Intent, ThreadId};
use docrouter_storage::ContextRecorder;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::ExtractionMethod;
use crate::llm::LlmCapability;

/// Invoice or RFQ field extraction from PDF text.
pub struct PdfAgent {
    llm: Option<Arc<dyn LlmCapability>>,
    timeout: Duration,
    recorder: Arc<ContextRecorder>,
}

impl PdfAgent {
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

    /// Extract fields for the thread's recorded intent (Invoice if the
    /// context is gone) and merge them into the context.
    #[instrument(skip_all, fields(thread_id = %thread_id))]
    pub async fn process(&self, thread_id: &ThreadId, text: &str) -> ExtractedData {
        let intent = match self.recorder.get(thread_id).await {
            Some(ctx) => ctx.intent(),
            None => Intent::Invoice,
        };

        let (fields, method) = match self.llm_fields(text, intent).await {
            Some(fields) => (fields, ExtractionMethod::Llm),
            None => (extract_document_fields(text, intent), ExtractionMethod::Regex),
        };
        debug!(intent = %intent, method = method.as_str(), fields = fields.len(), "pdf fields extracted");

        let mut partial = ExtractedData::new();
        partial.insert("pdf_extracted_data".into(), Value::Object(fields.clone()));
        partial.insert("pdf_text_length".into(), text.chars().count().into());
        partial.insert("pdf_extraction_method".into(), method.as_str().into());
        self.recorder.merge(thread_id, partial).await;

        fields
    }

    async fn llm_fields(&self, text: &str, intent: Intent) -> Option<ExtractedData> {
        let llm = self.llm.as_ref()?;
        let hint = match intent {
            Intent::Invoice => "invoice fields: invoice_number, amount, date",
            Intent::Rfq => "RFQ fields: rfq_number, deadline",
            _ => "key fields as a flat mapping",
        };
        match tokio::time::timeout(self.timeout, llm.extract(text, hint)).await {
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

#[cfg(test)]
mod tests {
    use super::*;
    use docrouter_shared::DocumentFormat;
    use serde_json::json;

    #[tokio::test]
    async fn regex_fallback_uses_recorded_intent() {
        let recorder = Arc::new(ContextRecorder::in_memory());
        let id = recorder
            .create("rfq.pdf", DocumentFormat::Pdf, Intent::Rfq, ExtractedData::new())
            .await;

        let agent = PdfAgent::new(None, Duration::from_secs(1), recorder.clone());
        let fields = agent.process(&id, "RFQ #R2024 Deadline: 12/31/2024").await;
        assert_eq!(fields["rfq_number"], json!("R2024"));
        assert_eq!(fields["deadline"], json!("12/31/2024"));

        let ctx = recorder.get(&id).await.unwrap();
        assert_eq!(ctx.extracted_data()["pdf_extraction_method"], json!("regex"));
        assert_eq!(ctx.extracted_data()["pdf_extracted_data"], json!(fields));
    }

    #[tokio::test]
    async fn missing_context_defaults_to_invoice() {
        let recorder = Arc::new(ContextRecorder::in_memory());
        let agent = PdfAgent::new(None, Duration::from_secs(1), recorder);
        let fields = agent
            .process(&ThreadId::new(), "Invoice #INV001 Date: 01/01/2023 Amount: $500.00")
            .await;
        assert_eq!(fields["invoice_number"], json!("INV001"));
        assert_eq!(fields["amount"], json!(500.0));
        assert_eq!(fields["date"], json!("01/01/2023"));
    }
}
