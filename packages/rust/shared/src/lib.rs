//! Shared types, error model, and configuration for docrouter.
//!
//! This crate is the foundation depended on by all other docrouter crates.
//! It provides:
//! - [`DocRouterError`]: the unified error type
//! - Domain types ([`ThreadId`], [`DocumentFormat`], [`Intent`], [`ProcessingContext`],
//!   [`CanonicalOrderRecord`])
//! - Configuration ([`AppConfig`], [`LlmConfig`], [`StoreConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, LlmConfig, StoreBackend, StoreConfig, config_dir,
    config_file_path, init_config, llm_api_key, load_config, load_config_from,
};
pub use error::{DocRouterError, Result};
pub use types::{
    CanonicalOrderRecord, DocumentFormat, ExtractedData, Intent, ProcessingContext, ThreadId,
};
