//! End-to-end document pipeline: detect → extract → classify → record → route.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use docrouter_detection::DocumentInput;
use docrouter_shared::{
    AppConfig, CanonicalOrderRecord, DocumentFormat, ExtractedData, Intent, Result, ThreadId,
};
use docrouter_storage::{ContextRecorder, MemoryStore, open_recorder};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::agents::{EmailAgent, EmailRecord, JsonAgent, PdfAgent};
use crate::classifier::{Classification, ClassificationStep};
use crate::intent::IntentClassifier;
use crate::llm::{LlmCapability, OpenRouterClient};
use crate::results::write_result_log;

/// What the routing agent produced for a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AgentOutput {
    /// JSON documents: the canonical order record.
    Order(CanonicalOrderRecord),
    /// Emails: the CRM record.
    Email(EmailRecord),
    /// PDFs: extracted invoice or RFQ fields.
    Fields(ExtractedData),
    /// Documents no agent accepts (degraded classification).
    Unrouted { error: String },
}

/// Outcome of processing one document. Every call produces one.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingResult {
    pub thread_id: ThreadId,
    #[serde(rename = "type")]
    pub format: DocumentFormat,
    pub intent: Intent,
    pub confidence: f64,
    pub result: AgentOutput,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a document has been fully processed.
    fn done(&self, result: &ProcessingResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _result: &ProcessingResult) {}
}

/// Sequences classification and the format-specific agents.
pub struct Orchestrator {
    classification: ClassificationStep,
    pdf: PdfAgent,
    email: EmailAgent,
    json: JsonAgent,
    recorder: Arc<ContextRecorder>,
    llm_name: Option<String>,
    result_dir: Option<PathBuf>,
}

impl Orchestrator {
    /// Build from parts. `llm = None` runs every stage on its local fallback.
    pub fn new(
        llm: Option<Arc<dyn LlmCapability>>,
        timeout: Duration,
        recorder: Arc<ContextRecorder>,
    ) -> Self {
        let llm_name = llm.as_ref().map(|l| l.name().to_string());
        Self {
            classification: ClassificationStep::new(
                IntentClassifier::new(llm.clone(), timeout),
                recorder.clone(),
            ),
            pdf: PdfAgent::new(llm.clone(), timeout, recorder.clone()),
            email: EmailAgent::new(llm, timeout, recorder.clone()),
            json: JsonAgent::new(recorder.clone()),
            recorder,
            llm_name,
            result_dir: None,
        }
    }

    /// Build from config: opens the configured store (degrading to `fallback`)
    /// and an OpenRouter client when an API key is present.
    pub async fn from_config(config: &AppConfig, fallback: Arc<MemoryStore>) -> Result<Self> {
        let recorder = Arc::new(open_recorder(&config.store, fallback).await);
        let llm = OpenRouterClient::from_config(&config.llm)?
            .map(|client| Arc::new(client) as Arc<dyn LlmCapability>);
        if llm.is_none() {
            warn!(
                env = %config.llm.api_key_env,
                "no LLM API key set, using keyword and regex fallbacks"
            );
        }

        let orchestrator = Self::new(llm, config.llm.timeout(), recorder);
        Ok(if config.defaults.write_result_logs {
            orchestrator.with_result_logs(&config.defaults.output_dir)
        } else {
            orchestrator
        })
    }

    /// Write each result to `<dir>/<thread_id>.json`.
    pub fn with_result_logs(mut self, dir: impl Into<PathBuf>) -> Self {
        self.result_dir = Some(dir.into());
        self
    }

    /// Stop writing result logs.
    pub fn without_result_logs(mut self) -> Self {
        self.result_dir = None;
        self
    }

    pub fn recorder(&self) -> &Arc<ContextRecorder> {
        &self.recorder
    }

    /// Name of the configured LLM capability, if any.
    pub fn llm_name(&self) -> Option<&str> {
        self.llm_name.as_deref()
    }

    /// Process one document. Never fails.
    pub async fn process(&self, input: &DocumentInput, source: &str) -> ProcessingResult {
        self.process_with_progress(input, source, &SilentProgress).await
    }

    #[instrument(skip_all, fields(source = source))]
    pub async fn process_with_progress(
        &self,
        input: &DocumentInput,
        source: &str,
        progress: &dyn ProgressReporter,
    ) -> ProcessingResult {
        progress.phase("Classifying");
        let classification = self.classification.classify(input, source).await;

        progress.phase("Extracting");
        let result = self.route(&classification).await;

        let result = ProcessingResult {
            thread_id: classification.thread_id,
            format: classification.format,
            intent: classification.intent,
            confidence: classification.confidence,
            result,
            source: source.to_string(),
            timestamp: Utc::now(),
        };

        if let Some(dir) = &self.result_dir {
            if let Err(e) = write_result_log(dir, &result) {
                warn!(error = %e, "could not write result log");
            }
        }

        info!(
            thread_id = %result.thread_id,
            format = %result.format,
            intent = %result.intent,
            "document processed"
        );
        progress.done(&result);
        result
    }

    async fn route(&self, classification: &Classification) -> AgentOutput {
        let thread_id = &classification.thread_id;
        let text = classification.text.as_str();
        match classification.format {
            DocumentFormat::Pdf => AgentOutput::Fields(self.pdf.process(thread_id, text).await),
            DocumentFormat::Json => AgentOutput::Order(self.json.process(thread_id, text).await),
            DocumentFormat::Email => AgentOutput::Email(self.email.process(thread_id, text).await),
            DocumentFormat::Unknown => AgentOutput::Unrouted {
                error: classification
                    .error
                    .clone()
                    .unwrap_or_else(|| "unsupported document format".to_string()),
            },
        }
    }
}
