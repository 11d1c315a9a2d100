//! Application configuration for docrouter.
//!
//! User config lives at `~/.docrouter/docrouter.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DocRouterError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docrouter.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docrouter";

// ---------------------------------------------------------------------------
// Config structs (matching docrouter.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// LLM capability settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Context store settings.
    #[serde(default)]
    pub store: StoreConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory receiving one `<thread_id>.json` result log per document.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Whether result logs are written at all.
    #[serde(default = "default_true")]
    pub write_result_logs: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            write_result_logs: true,
        }
    }
}

fn default_output_dir() -> String {
    "output_logs".into()
}
fn default_true() -> bool {
    true
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for classification and extraction.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the OpenAI-compatible chat completions API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Upper bound on a single LLM call before the local fallback takes over.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Number of leading characters sent for intent classification.
    #[serde(default = "default_classify_chars")]
    pub classify_chars: usize,

    /// Number of leading characters sent for field extraction.
    #[serde(default = "default_extract_chars")]
    pub extract_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            classify_chars: default_classify_chars(),
            extract_chars: default_extract_chars(),
        }
    }
}

impl LlmConfig {
    /// The configured timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parse and validate `base_url`.
    pub fn parsed_base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            DocRouterError::config(format!("invalid llm.base_url '{}': {e}", self.base_url))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(DocRouterError::config(format!(
                "llm.base_url must use http or https, got '{other}'"
            ))),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "google/gemini-2.0-flash-001".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_classify_chars() -> usize {
    1000
}
fn default_extract_chars() -> usize {
    2000
}

/// Which context store backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// libSQL file database with per-entry expiry.
    Libsql,
    /// Process-local map, lost on exit.
    Memory,
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend to open at startup.
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    /// Database path for the libSQL backend (`~` is expanded).
    #[serde(default = "default_store_path")]
    pub path: String,

    /// How long a context survives in an expiring store.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_store_path(),
            retention_secs: default_retention_secs(),
        }
    }
}

impl StoreConfig {
    /// Retention window as a [`Duration`].
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// Database path with a leading `~/` expanded to the home directory.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        match self.path.strip_prefix("~/") {
            Some(rest) => {
                let home = dirs::home_dir().ok_or_else(|| {
                    DocRouterError::config("could not determine home directory")
                })?;
                Ok(home.join(rest))
            }
            None => Ok(PathBuf::from(&self.path)),
        }
    }
}

fn default_backend() -> StoreBackend {
    StoreBackend::Libsql
}
fn default_store_path() -> String {
    "~/.docrouter/contexts.db".into()
}
fn default_retention_secs() -> u64 {
    3600
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docrouter/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocRouterError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docrouter/docrouter.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocRouterError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        DocRouterError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocRouterError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocRouterError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocRouterError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the LLM API key from the env var named in the config.
///
/// Returns `None` when the variable is unset or empty; callers then run
/// without an LLM capability and rely on the deterministic fallbacks.
pub fn llm_api_key(config: &LlmConfig) -> Option<String> {
    match std::env::var(&config.api_key_env) {
        Ok(val) if !val.trim().is_empty() => Some(val),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
        assert!(toml_str.contains("retention_secs = 3600"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.store.backend, StoreBackend::Libsql);
        assert_eq!(parsed.llm.timeout_secs, 30);
        assert_eq!(parsed.llm.api_key_env, "OPENROUTER_API_KEY");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[store]
backend = "memory"

[llm]
timeout_secs = 5
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.retention_secs, 3600);
        assert_eq!(config.llm.timeout(), Duration::from_secs(5));
        assert_eq!(config.llm.classify_chars, 1000);
        assert!(config.defaults.write_result_logs);
    }

    #[test]
    fn base_url_validation() {
        let mut llm = LlmConfig::default();
        assert!(llm.parsed_base_url().is_ok());

        llm.base_url = "ftp://example.com".into();
        let err = llm.parsed_base_url().unwrap_err();
        assert!(err.to_string().contains("http or https"));

        llm.base_url = "not a url".into();
        assert!(llm.parsed_base_url().is_err());
    }

    #[test]
    fn store_path_expands_home() {
        let store = StoreConfig::default();
        let path = store.resolved_path().expect("resolve");
        assert!(path.ends_with(".docrouter/contexts.db"));

        let store = StoreConfig {
            path: "/tmp/ctx.db".into(),
            ..StoreConfig::default()
        };
        assert_eq!(store.resolved_path().unwrap(), PathBuf::from("/tmp/ctx.db"));
    }

    #[test]
    fn missing_api_key_yields_none() {
        // Use a unique env var name to avoid interfering with other tests
        let llm = LlmConfig {
            api_key_env: "DR_TEST_NONEXISTENT_KEY_12345".into(),
            ..LlmConfig::default()
        };
        assert!(llm_api_key(&llm).is_none());
    }
}
