//! Classification step: detect the format, extract text, decide the intent,
//! and record the processing context.

use std::sync::Arc;

use docrouter_detection::{DocumentInput, FormatDetector, extraction_placeholder, try_extract_text};
use docrouter_shared::{DocumentFormat, ExtractedData, Intent, ThreadId};
use docrouter_storage::ContextRecorder;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::intent::{ClassificationMethod, IntentClassifier};
use crate::text::{prefix, sha256_hex};

/// Characters of extracted text kept in the context as `raw_text`.
pub const RAW_TEXT_CHARS: usize = 1000;

/// Confidence recorded for a context whose classification could not run.
pub const DEGRADED_CONFIDENCE: f64 = 0.1;

/// What the classification step decided for one document.
#[derive(Debug, Clone)]
pub struct Classification {
    pub thread_id: ThreadId,
    pub format: DocumentFormat,
    pub intent: Intent,
    pub confidence: f64,
    /// `None` for degraded contexts.
    pub method: Option<ClassificationMethod>,
    /// Full extracted text (or the extraction placeholder), handed to the routing agent.
    pub text: String,
    /// Diagnostic for degraded contexts.
    pub error: Option<String>,
    /// Why text extraction failed, when it did.
    pub extraction_error: Option<String>,
}

/// Format detection, text extraction, intent classification, and context creation.
pub struct ClassificationStep {
    detector: FormatDetector,
    intents: IntentClassifier,
    recorder: Arc<ContextRecorder>,
}

impl ClassificationStep {
    pub fn new(intents: IntentClassifier, recorder: Arc<ContextRecorder>) -> Self {
        Self {
            detector: FormatDetector::new(),
            intents,
            recorder,
        }
    }

    /// Classify `input` and record a context for it. Never fails.
    ///
    /// A document with no text gets a degraded `Unknown` context. A document
    /// whose extraction failed keeps its format but is not classified: the
    /// placeholder text describes the failure, not the document.
    #[instrument(skip_all, fields(source = source))]
    pub async fn classify(&self, input: &DocumentInput, source: &str) -> Classification {
        let format = self.detector.detect(input, source);
        let text = match try_extract_text(input, format) {
            Ok(text) => text,
            Err(e) => return self.record_unreadable(source, format, input, e.to_string()).await,
        };

        if text.trim().is_empty() {
            return self.record_degraded(source, format, text).await;
        }

        let decision = self.intents.classify(&text, &Intent::ALL).await;

        let mut data = ExtractedData::new();
        data.insert("raw_text".into(), prefix(&text, RAW_TEXT_CHARS).into());
        data.insert("classification_confidence".into(), decision.confidence.into());
        data.insert(
            "classification_reasoning".into(),
            Value::String(decision.rationale.clone()),
        );
        data.insert(
            "classification_method".into(),
            decision.method.as_str().into(),
        );
        data.insert("content_sha256".into(), sha256_hex(&text).into());

        let thread_id = self
            .recorder
            .create(source, format, decision.intent, data)
            .await;

        info!(
            %thread_id,
            format = %format,
            intent = %decision.intent,
            confidence = decision.confidence,
            method = decision.method.as_str(),
            "document classified"
        );

        Classification {
            thread_id,
            format,
            intent: decision.intent,
            confidence: decision.confidence,
            method: Some(decision.method),
            text,
            error: None,
            extraction_error: None,
        }
    }

    async fn record_unreadable(
        &self,
        source: &str,
        format: DocumentFormat,
        input: &DocumentInput,
        error: String,
    ) -> Classification {
        warn!(source, format = %format, error = %error, "text extraction failed, intent not classified");
        let placeholder = extraction_placeholder(format, &error, input.size());

        let mut data = ExtractedData::new();
        data.insert("raw_text".into(), prefix(&placeholder, RAW_TEXT_CHARS).into());
        data.insert("classification_confidence".into(), DEGRADED_CONFIDENCE.into());
        data.insert(
            "classification_reasoning".into(),
            "Text extraction failed; intent not classified".into(),
        );
        data.insert("classification_method".into(), "none".into());
        data.insert("extraction_error".into(), Value::String(error.clone()));

        let intent = Intent::GeneralInquiry;
        let thread_id = self.recorder.create(source, format, intent, data).await;

        Classification {
            thread_id,
            format,
            intent,
            confidence: DEGRADED_CONFIDENCE,
            method: None,
            text: placeholder,
            error: None,
            extraction_error: Some(error),
        }
    }

    async fn record_degraded(
        &self,
        source: &str,
        detected: DocumentFormat,
        text: String,
    ) -> Classification {
        let error = format!("no text could be extracted from {detected} document");
        warn!(source, detected = %detected, "{error}");

        let mut data = ExtractedData::new();
        data.insert("classification_confidence".into(), DEGRADED_CONFIDENCE.into());
        data.insert("error".into(), Value::String(error.clone()));

        let intent = Intent::GeneralInquiry;
        let thread_id = self
            .recorder
            .create(source, DocumentFormat::Unknown, intent, data)
            .await;

        Classification {
            thread_id,
            format: DocumentFormat::Unknown,
            intent,
            confidence: DEGRADED_CONFIDENCE,
            method: None,
            text,
            error: Some(error),
            extraction_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step() -> (ClassificationStep, Arc<ContextRecorder>) {
        let recorder = Arc::new(ContextRecorder::in_memory());
        (
            ClassificationStep::new(IntentClassifier::keyword_only(), recorder.clone()),
            recorder,
        )
    }

    #[tokio::test]
    async fn records_classification_details() {
        let (step, recorder) = step();
        let input = DocumentInput::text("From: ops@acme.test\nSubject: Payment\n\nInvoice attached.");
        let c = step.classify(&input, "inbox").await;

        assert_eq!(c.format, DocumentFormat::Email);
        assert_eq!(c.intent, Intent::Invoice);
        assert_eq!(c.method, Some(ClassificationMethod::Keyword));
        assert!(c.error.is_none());

        let ctx = recorder.get(&c.thread_id).await.expect("context recorded");
        let data = ctx.extracted_data();
        assert_eq!(ctx.source(), "inbox");
        assert_eq!(data["classification_method"], json!("keyword"));
        assert_eq!(data["classification_confidence"], json!(0.8));
        assert_eq!(data["content_sha256"], json!(sha256_hex(&c.text)));
        assert!(data["raw_text"].as_str().unwrap().starts_with("From:"));
    }

    #[tokio::test]
    async fn raw_text_is_truncated() {
        let (step, recorder) = step();
        let body = format!("Subject: notes\n\n{}", "x".repeat(5000));
        let c = step.classify(&DocumentInput::text(body), "notes.txt").await;
        let ctx = recorder.get(&c.thread_id).await.unwrap();
        assert_eq!(
            ctx.extracted_data()["raw_text"].as_str().unwrap().chars().count(),
            RAW_TEXT_CHARS
        );
        assert!(c.text.len() > RAW_TEXT_CHARS);
    }

    #[tokio::test]
    async fn failed_extraction_is_not_keyword_classified() {
        let (step, recorder) = step();
        let c = step.classify(&DocumentInput::text("garbage bytes"), "scan.pdf").await;

        assert_eq!(c.format, DocumentFormat::Pdf);
        assert_eq!(c.intent, Intent::GeneralInquiry);
        assert_eq!(c.confidence, DEGRADED_CONFIDENCE);
        assert!(c.method.is_none());
        assert!(c.text.starts_with("[PDF extraction failed:"), "got {}", c.text);
        assert!(c.extraction_error.is_some());

        let ctx = recorder.get(&c.thread_id).await.expect("context recorded");
        let data = ctx.extracted_data();
        assert_eq!(ctx.format(), DocumentFormat::Pdf);
        assert_eq!(ctx.intent(), Intent::GeneralInquiry);
        assert_eq!(data["classification_method"], json!("none"));
        assert!(data["extraction_error"].is_string());
        assert!(data["raw_text"].as_str().unwrap().starts_with("[PDF extraction failed:"));
    }

    #[tokio::test]
    async fn missing_file_is_not_a_complaint() {
        let (step, _) = step();
        let input = DocumentInput::path("/nonexistent/dir/complaint_error.eml");
        let c = step.classify(&input, "complaint_error.eml").await;
        assert_eq!(c.format, DocumentFormat::Email);
        assert_eq!(c.intent, Intent::GeneralInquiry);
        assert_eq!(c.confidence, DEGRADED_CONFIDENCE);
    }

    #[tokio::test]
    async fn empty_text_yields_degraded_context() {
        let (step, recorder) = step();
        let c = step.classify(&DocumentInput::text("   "), "api").await;

        assert_eq!(c.format, DocumentFormat::Unknown);
        assert_eq!(c.intent, Intent::GeneralInquiry);
        assert_eq!(c.confidence, DEGRADED_CONFIDENCE);
        assert!(c.method.is_none());
        assert!(c.error.is_some());

        let ctx = recorder.get(&c.thread_id).await.expect("degraded context recorded");
        assert_eq!(ctx.format(), DocumentFormat::Unknown);
        assert!(ctx.extracted_data().contains_key("error"));
    }
}
