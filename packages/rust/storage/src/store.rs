//! The key-value contract every context backend implements, and the
//! process-local backend.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use docrouter_shared::{DocRouterError, Result};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A key-value store with optional per-entry expiry.
///
/// Writes are last-write-wins per key; no backend performs field-level merge.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Backend name for tracing and health output.
    fn backend(&self) -> &str;

    /// Whether `put` honors its `ttl` argument.
    fn expiring(&self) -> bool;

    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: &Value, ttl: Option<Duration>) -> Result<()>;

    /// Fetch the live value for `key`.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// All live keys, in ascending order.
    async fn list_keys(&self) -> Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Process-local map. Entries never expire and are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Value>>> {
        self.entries
            .lock()
            .map_err(|_| DocRouterError::Storage("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl ContextStore for MemoryStore {
    fn backend(&self) -> &str {
        "memory"
    }

    fn expiring(&self) -> bool {
        false
    }

    async fn put(&self, key: &str, value: &Value, _ttl: Option<Duration>) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}
