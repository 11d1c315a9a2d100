//! Per-document processing traces on top of a [`ContextStore`].

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use docrouter_shared::{DocumentFormat, ExtractedData, Intent, ProcessingContext, ThreadId};
use serde_json::Value;
use tracing::instrument;

use crate::store::{ContextStore, MemoryStore};

/// Creates and updates [`ProcessingContext`]s.
///
/// Writes go to the primary store; when a write fails the context is kept in
/// the injected process-local store instead, so callers never see an error.
pub struct ContextRecorder {
    store: Arc<dyn ContextStore>,
    fallback: Arc<MemoryStore>,
    retention: Duration,
}

impl ContextRecorder {
    pub fn new(store: Arc<dyn ContextStore>, fallback: Arc<MemoryStore>, retention: Duration) -> Self {
        Self {
            store,
            fallback,
            retention,
        }
    }

    /// Recorder over a single process-local store.
    pub fn in_memory() -> Self {
        let memory = Arc::new(MemoryStore::new());
        Self::new(memory.clone(), memory, Duration::ZERO)
    }

    /// Name of the primary backend.
    pub fn backend(&self) -> &str {
        self.store.backend()
    }

    /// Whether the primary backend expires entries.
    pub fn expiring(&self) -> bool {
        self.store.expiring()
    }

    /// Record a new context and return its freshly generated thread id.
    #[instrument(skip_all, fields(source = source, format = %format, intent = %intent))]
    pub async fn create(
        &self,
        source: &str,
        format: DocumentFormat,
        intent: Intent,
        data: ExtractedData,
    ) -> ThreadId {
        let context = ProcessingContext::new(source, format, intent, data);
        let thread_id = context.thread_id().clone();
        self.save(&context).await;
        tracing::info!(%thread_id, backend = self.backend(), "context created");
        thread_id
    }

    /// Merge `partial` into an existing context. `false` if the thread is unknown.
    #[instrument(skip_all, fields(thread_id = %thread_id))]
    pub async fn merge(&self, thread_id: &ThreadId, partial: ExtractedData) -> bool {
        let Some(mut context) = self.get(thread_id).await else {
            tracing::warn!("merge into unknown thread ignored");
            return false;
        };
        let keys: Vec<&str> = partial.keys().map(String::as_str).collect();
        tracing::debug!(?keys, "merging context data");

        context.merge(partial);
        self.save(&context).await;
        true
    }

    /// Look up a context, primary store first.
    pub async fn get(&self, thread_id: &ThreadId) -> Option<ProcessingContext> {
        let key = thread_id.to_string();
        let found = match self.store.get(&key).await {
            Ok(Some(value)) => Some(value),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "primary store read failed");
                None
            }
        };

        let value = match found {
            Some(value) => value,
            None => self.fallback.get(&key).await.ok().flatten()?,
        };
        decode(&key, value)
    }

    /// Thread ids known to either store, ascending.
    pub async fn list(&self) -> Vec<String> {
        let mut keys = BTreeSet::new();
        match self.store.list_keys().await {
            Ok(primary) => keys.extend(primary),
            Err(e) => tracing::warn!(error = %e, "primary store listing failed"),
        }
        if let Ok(local) = self.fallback.list_keys().await {
            keys.extend(local);
        }
        keys.into_iter().collect()
    }

    async fn save(&self, context: &ProcessingContext) {
        let key = context.thread_id().to_string();
        let value = match serde_json::to_value(context) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(error = %e, "context not serializable");
                return;
            }
        };

        let ttl = (self.store.expiring() && !self.retention.is_zero()).then_some(self.retention);
        if let Err(e) = self.store.put(&key, &value, ttl).await {
            tracing::warn!(error = %e, "primary store write failed, keeping context in memory");
            if let Err(e) = self.fallback.put(&key, &value, None).await {
                tracing::error!(error = %e, "fallback store write failed");
            }
        }
    }
}

fn decode(key: &str, value: Value) -> Option<ProcessingContext> {
    match serde_json::from_value(value) {
        Ok(context) => Some(context),
        Err(e) => {
            tracing::warn!(key, error = %e, "stored context has unexpected shape");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docrouter_shared::{DocRouterError, Result};
    use serde_json::json;

    /// Store whose every call fails, standing in for an unreachable backend.
    struct BrokenStore;

    #[async_trait]
    impl ContextStore for BrokenStore {
        fn backend(&self) -> &str {
            "broken"
        }
        fn expiring(&self) -> bool {
            true
        }
        async fn put(&self, _: &str, _: &Value, _: Option<Duration>) -> Result<()> {
            Err(DocRouterError::Storage("connection refused".into()))
        }
        async fn get(&self, _: &str) -> Result<Option<Value>> {
            Err(DocRouterError::Storage("connection refused".into()))
        }
        async fn list_keys(&self) -> Result<Vec<String>> {
            Err(DocRouterError::Storage("connection refused".into()))
        }
    }

    fn data(pairs: &[(&str, Value)]) -> ExtractedData {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[tokio::test]
    async fn create_get_merge() {
        let recorder = ContextRecorder::in_memory();
        let id = recorder
            .create(
                "order.json",
                DocumentFormat::Json,
                Intent::Rfq,
                data(&[("raw_text", json!("{...}"))]),
            )
            .await;

        assert!(
            recorder
                .merge(&id, data(&[("json_structure_type", json!("flat_order"))]))
                .await
        );

        let ctx = recorder.get(&id).await.expect("context exists");
        assert_eq!(ctx.source(), "order.json");
        assert_eq!(ctx.intent(), Intent::Rfq);
        assert_eq!(ctx.extracted_data()["raw_text"], json!("{...}"));
        assert_eq!(ctx.extracted_data()["json_structure_type"], json!("flat_order"));
        assert_eq!(recorder.list().await, [id.to_string()]);
    }

    #[tokio::test]
    async fn merge_unknown_thread_is_false() {
        let recorder = ContextRecorder::in_memory();
        assert!(!recorder.merge(&ThreadId::new(), ExtractedData::new()).await);
    }

    #[tokio::test]
    async fn distinct_documents_get_distinct_threads() {
        let recorder = ContextRecorder::in_memory();
        let a = recorder.create("a", DocumentFormat::Email, Intent::Complaint, ExtractedData::new()).await;
        let b = recorder.create("b", DocumentFormat::Email, Intent::Complaint, ExtractedData::new()).await;
        assert_ne!(a, b);
        assert_eq!(recorder.list().await.len(), 2);
    }

    #[tokio::test]
    async fn unreachable_store_falls_back_to_memory() {
        let fallback = Arc::new(MemoryStore::new());
        let recorder = ContextRecorder::new(
            Arc::new(BrokenStore),
            fallback.clone(),
            Duration::from_secs(3600),
        );

        let id = recorder
            .create("inbox", DocumentFormat::Email, Intent::Invoice, ExtractedData::new())
            .await;
        assert_eq!(fallback.len(), 1);

        assert!(recorder.merge(&id, data(&[("email_content_length", json!(42))])).await);
        let ctx = recorder.get(&id).await.expect("found in fallback");
        assert_eq!(ctx.extracted_data()["email_content_length"], json!(42));
        assert_eq!(recorder.list().await, [id.to_string()]);
    }

    #[tokio::test]
    async fn libsql_backend_round_trip() {
        let path = std::env::temp_dir().join(format!("dr_rec_{}.db", uuid::Uuid::now_v7()));
        let store = crate::LibsqlStore::open(&path).await.expect("open");
        let recorder = ContextRecorder::new(
            Arc::new(store),
            Arc::new(MemoryStore::new()),
            Duration::from_secs(3600),
        );
        assert!(recorder.expiring());

        let id = recorder
            .create("scan.pdf", DocumentFormat::Pdf, Intent::Invoice, ExtractedData::new())
            .await;
        assert!(recorder.merge(&id, data(&[("pdf_text_length", json!(120))])).await);

        let ctx = recorder.get(&id).await.expect("stored");
        assert_eq!(ctx.format(), DocumentFormat::Pdf);
        assert_eq!(ctx.extracted_data()["pdf_text_length"], json!(120));
    }
}
