//! Document classification and routing for docrouter.
//!
//! This crate ties together format detection, intent classification, context
//! recording, and the format-specific agents into one pipeline
//! ([`Orchestrator::process`]). Every stage that can call the LLM capability
//! has a deterministic local fallback, so processing never fails.

pub mod agents;
pub mod classifier;
pub mod intent;
pub mod llm;
pub mod pipeline;
pub mod results;
mod text;

pub use classifier::{Classification, ClassificationStep, DEGRADED_CONFIDENCE};
pub use intent::{
    ClassificationMethod, IntentClassifier, IntentDecision, IntentStrategy, KeywordStrategy,
    LlmStrategy, classify_by_keywords,
};
pub use llm::{LlmCapability, LlmClassification, OpenRouterClient};
pub use pipeline::{AgentOutput, Orchestrator, ProcessingResult, ProgressReporter, SilentProgress};
pub use results::write_result_log;
