//! The LLM capability: intent classification and field extraction over an
//! OpenAI-compatible chat completions API (OpenRouter by default).
//!
//! Every failure (network, HTTP status, malformed body, off-list label) is an
//! `Err`; callers treat any error as "capability unavailable".

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use docrouter_shared::{DocRouterError, ExtractedData, Intent, LlmConfig, Result, llm_api_key};
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::text::prefix;

const USER_AGENT: &str = concat!("docrouter/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// An intent label chosen by the LLM, already validated against the candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmClassification {
    pub intent: Intent,
    pub confidence: f64,
    pub reasoning: String,
}

/// External language-model capability.
#[async_trait]
pub trait LlmCapability: Send + Sync {
    /// Name for tracing and health output.
    fn name(&self) -> &str;

    /// Pick one of `candidates` for `text`. Off-list answers are errors.
    async fn classify(&self, text: &str, candidates: &[Intent]) -> Result<LlmClassification>;

    /// Extract a flat mapping of fields described by `hint` from `text`.
    async fn extract(&self, text: &str, hint: &str) -> Result<ExtractedData>;
}

// ---------------------------------------------------------------------------
// OpenRouter client
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client for OpenRouter or any compatible endpoint.
pub struct OpenRouterClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    classify_chars: usize,
    extract_chars: usize,
}

impl OpenRouterClient {
    /// Build a client with an explicit key.
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let base = config.parsed_base_url()?;
        let endpoint = Url::parse(&format!(
            "{}/chat/completions",
            base.as_str().trim_end_matches('/')
        ))
        .map_err(|e| DocRouterError::config(format!("invalid llm endpoint: {e}")))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout() + Duration::from_secs(1))
            .build()
            .map_err(|e| DocRouterError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
            model: config.model.clone(),
            classify_chars: config.classify_chars,
            extract_chars: config.extract_chars,
        })
    }

    /// Build a client from config, reading the key from the configured env var.
    /// `Ok(None)` when no key is set.
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>> {
        match llm_api_key(config) {
            Some(key) => Self::new(config, key).map(Some),
            None => Ok(None),
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DocRouterError::Network(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocRouterError::Llm(format!("HTTP {status} from {}", self.endpoint)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| DocRouterError::Llm(format!("malformed completion body: {e}")))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| DocRouterError::Llm("completion has no content".into()))
    }
}

#[async_trait]
impl LlmCapability for OpenRouterClient {
    fn name(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn classify(&self, text: &str, candidates: &[Intent]) -> Result<LlmClassification> {
        let prompt = classification_prompt(prefix(text, self.classify_chars), candidates);
        let content = self.complete(&prompt).await?;
        let parsed = parse_classification(&content, candidates)?;
        debug!(intent = %parsed.intent, confidence = parsed.confidence, "llm classification");
        Ok(parsed)
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn extract(&self, text: &str, hint: &str) -> Result<ExtractedData> {
        let prompt = extraction_prompt(prefix(text, self.extract_chars), hint);
        let content = self.complete(&prompt).await?;
        match extract_json_object(&content)? {
            Value::Object(map) => Ok(map),
            other => Err(DocRouterError::Llm(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Prompts and response parsing
// ---------------------------------------------------------------------------

fn classification_prompt(text: &str, candidates: &[Intent]) -> String {
    let labels: Vec<&str> = candidates.iter().map(Intent::label).collect();
    format!(
        r#"Classify the following business document into exactly one of these categories: {labels}

Guidelines:
- "RFQ": requests for quotation, procurement requests, product inquiries
- "Complaint": service issues, dissatisfaction, problems
- "Invoice": billing documents, payment requests, financial statements
- "Regulation": compliance, policy, regulatory documents
- "General Inquiry": questions and general information requests

Document:
{text}

Respond ONLY with JSON in this exact format:
{{"intent": "<one category exactly as listed>", "confidence": 0.95, "reasoning": "<brief explanation>"}}"#,
        labels = labels.join(", "),
    )
}

fn extraction_prompt(text: &str, hint: &str) -> String {
    format!(
        r#"Extract {hint} from the document below.

Document:
{text}

Respond ONLY with a flat JSON object whose keys are the extracted field names."#
    )
}

/// First `{...}` span in a completion (models often wrap JSON in prose or fences).
pub(crate) fn extract_json_object(content: &str) -> Result<Value> {
    static OBJECT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

    let span = OBJECT_RE
        .find(content)
        .ok_or_else(|| DocRouterError::Llm("no JSON object in completion".into()))?;
    serde_json::from_str(span.as_str())
        .map_err(|e| DocRouterError::Llm(format!("invalid JSON in completion: {e}")))
}

fn parse_classification(content: &str, candidates: &[Intent]) -> Result<LlmClassification> {
    let value = extract_json_object(content)?;

    let label = value
        .get("intent")
        .and_then(Value::as_str)
        .ok_or_else(|| DocRouterError::Llm("completion has no intent label".into()))?;
    let intent = Intent::from_label(label)
        .filter(|intent| candidates.contains(intent))
        .ok_or_else(|| {
            DocRouterError::validation(format!("label '{label}' is not a candidate intent"))
        })?;

    let confidence = value
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(0.5)
        .clamp(0.0, 1.0);
    let reasoning = value
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(LlmClassification {
        intent,
        confidence,
        reasoning,
    })
}
