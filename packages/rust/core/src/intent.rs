//! Intent classification as an ordered cascade of strategies.
//!
//! The first strategy to succeed wins. The keyword strategy is pure and never
//! fails, so it always closes the cascade.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docrouter_shared::{DocRouterError, Intent, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::llm::LlmCapability;

/// Confidence of a keyword match.
pub const KEYWORD_CONFIDENCE: f64 = 0.8;

/// Confidence when no keyword matched and the default intent is used.
pub const DEFAULT_CONFIDENCE: f64 = 0.6;

/// Keyword sets in priority order: complaint, request, billing, regulatory.
const KEYWORD_RULES: [(Intent, &str, &[&str]); 4] = [
    (
        Intent::Complaint,
        "complaint indicators",
        &[
            "complaint", "dissatisfied", "problem", "issue", "error", "wrong", "bad", "terrible",
            "awful", "unacceptable",
        ],
    ),
    (
        Intent::Rfq,
        "request/inquiry indicators",
        &[
            "quote", "quotation", "rfq", "request", "inquiry", "product", "purchase", "buy",
            "pricing", "cost",
        ],
    ),
    (
        Intent::Invoice,
        "financial/billing indicators",
        &[
            "invoice", "bill", "payment", "charge", "amount", "total", "due", "paid", "$", "price",
        ],
    ),
    (
        Intent::Regulation,
        "regulatory indicators",
        &["regulation", "compliance", "policy", "rule", "law", "requirement"],
    ),
];

/// Which strategy produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationMethod {
    Llm,
    Keyword,
}

impl ClassificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Keyword => "keyword",
        }
    }
}

/// An intent with its confidence in `[0, 1]` and a human-readable rationale.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentDecision {
    pub intent: Intent,
    pub confidence: f64,
    pub rationale: String,
    pub method: ClassificationMethod,
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// One way of deciding an intent. `Err` hands over to the next strategy.
#[async_trait]
pub trait IntentStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(&self, text: &str, candidates: &[Intent]) -> Result<IntentDecision>;
}

/// Delegates to the LLM capability, bounded by a timeout.
pub struct LlmStrategy {
    llm: Arc<dyn LlmCapability>,
    timeout: Duration,
}

impl LlmStrategy {
    pub fn new(llm: Arc<dyn LlmCapability>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }
}

#[async_trait]
impl IntentStrategy for LlmStrategy {
    fn name(&self) -> &str {
        "llm"
    }

    async fn classify(&self, text: &str, candidates: &[Intent]) -> Result<IntentDecision> {
        let answer = tokio::time::timeout(self.timeout, self.llm.classify(text, candidates))
            .await
            .map_err(|_| {
                DocRouterError::Llm(format!("timed out after {}s", self.timeout.as_secs()))
            })??;

        // The capability validates labels, but a candidate list is a hard contract here.
        if !candidates.contains(&answer.intent) {
            return Err(DocRouterError::validation(format!(
                "label '{}' is not a candidate intent",
                answer.intent
            )));
        }

        Ok(IntentDecision {
            intent: answer.intent,
            confidence: answer.confidence.clamp(0.0, 1.0),
            rationale: answer.reasoning,
            method: ClassificationMethod::Llm,
        })
    }
}

/// Deterministic keyword scan. Never fails.
pub struct KeywordStrategy;

#[async_trait]
impl IntentStrategy for KeywordStrategy {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn classify(&self, text: &str, candidates: &[Intent]) -> Result<IntentDecision> {
        Ok(classify_by_keywords(text, candidates))
    }
}

/// Scan lower-cased `text` against the keyword sets in priority order.
///
/// The first category (among `candidates`) with any keyword present wins at
/// [`KEYWORD_CONFIDENCE`]; otherwise General Inquiry at [`DEFAULT_CONFIDENCE`].
pub fn classify_by_keywords(text: &str, candidates: &[Intent]) -> IntentDecision {
    let lower = text.to_lowercase();

    for (intent, label, keywords) in KEYWORD_RULES {
        if !candidates.contains(&intent) {
            continue;
        }
        if let Some(hit) = keywords.iter().find(|k| lower.contains(*k)) {
            return IntentDecision {
                intent,
                confidence: KEYWORD_CONFIDENCE,
                rationale: format!("Keyword-based: {label} (matched '{hit}')"),
                method: ClassificationMethod::Keyword,
            };
        }
    }

    IntentDecision {
        intent: Intent::GeneralInquiry,
        confidence: DEFAULT_CONFIDENCE,
        rationale: "Keyword-based: default classification".to_string(),
        method: ClassificationMethod::Keyword,
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Tries each strategy in order and commits to the first success.
pub struct IntentClassifier {
    strategies: Vec<Box<dyn IntentStrategy>>,
}

impl IntentClassifier {
    /// LLM first (when configured), keywords last.
    pub fn new(llm: Option<Arc<dyn LlmCapability>>, timeout: Duration) -> Self {
        let mut strategies: Vec<Box<dyn IntentStrategy>> = Vec::new();
        if let Some(llm) = llm {
            strategies.push(Box::new(LlmStrategy::new(llm, timeout)));
        }
        strategies.push(Box::new(KeywordStrategy));
        Self { strategies }
    }

    /// Keyword scan only.
    pub fn keyword_only() -> Self {
        Self::new(None, Duration::ZERO)
    }

    /// Custom cascade. A keyword strategy is appended if `strategies` could all fail.
    pub fn with_strategies(mut strategies: Vec<Box<dyn IntentStrategy>>) -> Self {
        if strategies.last().is_none_or(|s| s.name() != "keyword") {
            strategies.push(Box::new(KeywordStrategy));
        }
        Self { strategies }
    }

    /// Classify `text` into one of `candidates`. Never fails.
    pub async fn classify(&self, text: &str, candidates: &[Intent]) -> IntentDecision {
        for strategy in &self.strategies {
            match strategy.classify(text, candidates).await {
                Ok(decision) => {
                    debug!(
                        strategy = strategy.name(),
                        intent = %decision.intent,
                        confidence = decision.confidence,
                        "intent classified"
                    );
                    return decision;
                }
                Err(e) => warn!(strategy = strategy.name(), error = %e, "strategy failed, falling back"),
            }
        }
        classify_by_keywords(text, candidates)
    }
}
